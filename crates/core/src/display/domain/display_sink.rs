use crate::shared::frame::Frame;

/// On-screen window that presents frames and reports key presses.
pub trait DisplaySink {
    /// Shows the frame in the window named `title`, creating it on first use.
    fn show(&mut self, title: &str, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Services window events for up to `timeout_ms` and returns the
    /// pressed key code masked to its low byte, or `None` if no key arrived.
    fn poll_key(&mut self, timeout_ms: u32) -> Result<Option<i32>, Box<dyn std::error::Error>>;

    /// Destroys every window this sink opened.
    fn close_all(&mut self);
}
