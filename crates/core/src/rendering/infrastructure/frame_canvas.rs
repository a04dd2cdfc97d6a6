use opencv::core::{Mat, Point, Scalar};
use opencv::imgproc;

use crate::rendering::domain::canvas::{Canvas, PixelPoint};
use crate::rendering::domain::drawing_style::{BgrColor, LineStyle, PointStyle};
use crate::shared::frame::Frame;
use crate::shared::frame_mat::{copy_mat_into, frame_to_mat};

/// Canvas drawing into a frame with OpenCV's `imgproc` primitives.
///
/// Drawing happens on a Mat copy of the frame; [`FrameCanvas::finish`]
/// writes the result back. Colors are written in the frame's own channel
/// order and OpenCV clips everything to the frame.
pub struct FrameCanvas<'a> {
    frame: &'a mut Frame,
    mat: Mat,
}

impl<'a> FrameCanvas<'a> {
    pub fn new(frame: &'a mut Frame) -> Result<Self, opencv::Error> {
        let mat = frame_to_mat(frame)?;
        Ok(Self { frame, mat })
    }

    /// Copies everything drawn so far into the frame.
    pub fn finish(self) -> Result<(), opencv::Error> {
        copy_mat_into(&self.mat, self.frame)
    }

    fn scalar(&self, color: BgrColor) -> Scalar {
        let [c0, c1, c2] = color.bytes_for(self.frame.format());
        Scalar::new(c0 as f64, c1 as f64, c2 as f64, 0.0)
    }
}

fn cv_point(at: PixelPoint) -> Point {
    Point::new(at.0 as i32, at.1 as i32)
}

impl Canvas for FrameCanvas<'_> {
    fn size(&self) -> (u32, u32) {
        (self.frame.width(), self.frame.height())
    }

    fn draw_point(
        &mut self,
        at: PixelPoint,
        style: &PointStyle,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let center = cv_point(at);
        if let Some(border) = style.border {
            let color = self.scalar(border);
            imgproc::circle(
                &mut self.mat,
                center,
                i32::try_from(style.border_radius())?,
                color,
                style.thickness,
                imgproc::LINE_8,
                0,
            )?;
        }
        let color = self.scalar(style.color);
        imgproc::circle(
            &mut self.mat,
            center,
            i32::try_from(style.radius)?,
            color,
            style.thickness,
            imgproc::LINE_8,
            0,
        )?;
        Ok(())
    }

    fn draw_line(
        &mut self,
        from: PixelPoint,
        to: PixelPoint,
        style: &LineStyle,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let color = self.scalar(style.color);
        imgproc::line(
            &mut self.mat,
            cv_point(from),
            cv_point(to),
            color,
            i32::try_from(style.thickness.max(1))?,
            imgproc::LINE_8,
            0,
        )?;
        Ok(())
    }
}
