use crate::detection::domain::face_landmarks::{FaceLandmarks, Landmark};
use crate::rendering::domain::canvas::{Canvas, PixelPoint};
use crate::rendering::domain::drawing_style::DrawingStyle;
use crate::rendering::domain::mesh_topology::MeshTopology;

/// Draws face meshes onto a canvas.
///
/// Per face, every connection is drawn first and every landmark dot after,
/// so dots sit on top of lines. Landmarks outside the frame are not drawn,
/// nor are connections touching them or indices the face does not have.
pub struct OverlayRenderer {
    style: DrawingStyle,
}

impl OverlayRenderer {
    pub fn new(style: DrawingStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &DrawingStyle {
        &self.style
    }

    pub fn draw(
        &self,
        canvas: &mut dyn Canvas,
        faces: &[FaceLandmarks],
        topology: &MeshTopology,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let (width, height) = canvas.size();
        if width == 0 || height == 0 {
            return Ok(());
        }
        for face in faces {
            let pixels: Vec<Option<PixelPoint>> = face
                .points()
                .iter()
                .map(|lm| to_pixel(lm, width, height))
                .collect();

            for &(start, end) in topology.edges() {
                let from = pixels.get(start).copied().flatten();
                let to = pixels.get(end).copied().flatten();
                if let (Some(from), Some(to)) = (from, to) {
                    canvas.draw_line(from, to, &self.style.line)?;
                }
            }

            for point in pixels.iter().flatten() {
                canvas.draw_point(*point, &self.style.point)?;
            }
        }
        Ok(())
    }
}

/// Normalized coordinates to pixels, `None` when outside the frame.
///
/// `x = 1.0` maps to the last column rather than one past it.
pub fn to_pixel(landmark: &Landmark, width: u32, height: u32) -> Option<PixelPoint> {
    if !landmark.is_in_frame() {
        return None;
    }
    let px = ((landmark.x * width as f64).floor() as u32).min(width - 1);
    let py = ((landmark.y * height as f64).floor() as u32).min(height - 1);
    Some((px, py))
}
