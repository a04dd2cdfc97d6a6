use ndarray::s;

use crate::shared::frame::{Frame, PixelFormat};

/// Returns a copy of `frame` with its channels reordered to `target`.
///
/// BGR and RGB differ only in channel order, so conversion reverses the
/// channel axis. Converting to the frame's own format is a plain copy.
pub fn convert_color(frame: &Frame, target: PixelFormat) -> Frame {
    if frame.format() == target {
        return frame.clone();
    }

    let swapped: Vec<u8> = frame
        .as_ndarray()
        .slice(s![.., .., ..;-1])
        .iter()
        .copied()
        .collect();

    Frame::new(swapped, frame.width(), frame.height(), target, frame.index())
}
