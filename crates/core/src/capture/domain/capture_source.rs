use crate::shared::frame::Frame;

/// Yields successive frames from a camera or other live source.
///
/// `None` means the source could not produce a frame. The capture loop
/// treats that as terminal; implementations log the underlying cause.
pub trait CaptureSource {
    fn read_frame(&mut self) -> Option<Frame>;

    /// Releases the device. Subsequent reads return `None`.
    fn release(&mut self);
}
