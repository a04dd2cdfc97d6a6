use std::collections::HashSet;

use opencv::core::Mat;
use opencv::highgui;

use crate::display::domain::display_sink::DisplaySink;
use crate::shared::color_space::convert_color;
use crate::shared::frame::{Frame, PixelFormat};
use crate::shared::frame_mat::frame_to_mat;

/// Native window backed by OpenCV's HighGUI.
#[derive(Default)]
pub struct HighguiWindow {
    opened: HashSet<String>,
}

impl HighguiWindow {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DisplaySink for HighguiWindow {
    fn show(&mut self, title: &str, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if !self.opened.contains(title) {
            highgui::named_window(title, highgui::WINDOW_AUTOSIZE)?;
            self.opened.insert(title.to_string());
            log::debug!("Opened window \"{title}\"");
        }
        let mat = bgr_mat(frame)?;
        highgui::imshow(title, &mat)?;
        Ok(())
    }

    fn poll_key(&mut self, timeout_ms: u32) -> Result<Option<i32>, Box<dyn std::error::Error>> {
        let code = highgui::wait_key(wait_delay(timeout_ms))?;
        Ok(decode_key(code))
    }

    fn close_all(&mut self) {
        if self.opened.is_empty() {
            return;
        }
        if let Err(e) = highgui::destroy_all_windows() {
            log::warn!("Failed to close windows: {e}");
        }
        self.opened.clear();
    }
}

/// Copies a frame into a BGR `Mat`, the order HighGUI displays.
pub fn bgr_mat(frame: &Frame) -> Result<Mat, opencv::Error> {
    match frame.format() {
        PixelFormat::Bgr => frame_to_mat(frame),
        PixelFormat::Rgb => frame_to_mat(&convert_color(frame, PixelFormat::Bgr)),
    }
}

/// `wait_key` delay: at least 1 ms, since 0 blocks until a key arrives,
/// and never wrapped past `i32::MAX` into a negative (also blocking) value.
fn wait_delay(timeout_ms: u32) -> i32 {
    i32::try_from(timeout_ms.max(1)).unwrap_or(i32::MAX)
}

/// `wait_key` returns -1 on timeout; anything else is masked to the key byte.
fn decode_key(code: i32) -> Option<i32> {
    (code >= 0).then_some(code & 0xFF)
}
