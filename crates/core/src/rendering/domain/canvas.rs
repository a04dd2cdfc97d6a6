use crate::rendering::domain::drawing_style::{LineStyle, PointStyle};

/// Pixel position on a canvas.
pub type PixelPoint = (u32, u32);

/// Drawing surface for the overlay.
///
/// Implementations clip anything that falls outside `size()`.
pub trait Canvas {
    /// `(width, height)` in pixels.
    fn size(&self) -> (u32, u32);

    fn draw_point(
        &mut self,
        at: PixelPoint,
        style: &PointStyle,
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn draw_line(
        &mut self,
        from: PixelPoint,
        to: PixelPoint,
        style: &LineStyle,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
