/// Face landmark model (468 or 478 points) using ONNX Runtime via `ort`.
///
/// Runs on a square crop around one face and maps the regressed points
/// back to normalized frame coordinates.
use std::path::Path;

use crate::detection::domain::face_landmarks::{FaceLandmarks, Landmark};
use crate::detection::domain::face_stages::{LandmarkRegressor, RegressedFace, Roi};
use crate::shared::frame::Frame;

use super::math::sigmoid;
use super::onnx_session::{self, TensorLayout, UNIT_RANGE};

/// Fallback model input resolution when the model doesn't specify one.
const DEFAULT_INPUT_SIZE: u32 = 192;

/// Landmark model backed by an ONNX Runtime session.
pub struct OnnxLandmarkRegressor {
    session: ort::session::Session,
    layout: TensorLayout,
    input_size: u32,
}

impl OnnxLandmarkRegressor {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = onnx_session::load_session(model_path)?;
        let (layout, input_size) =
            onnx_session::input_geometry(&session, TensorLayout::Nhwc, DEFAULT_INPUT_SIZE);
        Ok(Self {
            session,
            layout,
            input_size,
        })
    }
}

impl LandmarkRegressor for OnnxLandmarkRegressor {
    fn regress(
        &mut self,
        frame: &Frame,
        roi: &Roi,
    ) -> Result<RegressedFace, Box<dyn std::error::Error>> {
        let rect = [roi.left(), roi.top(), roi.size, roi.size];
        let input_tensor = onnx_session::sample_rect(
            frame,
            rect,
            roi.rotation,
            self.input_size,
            self.layout,
            UNIT_RANGE,
        );

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // landmarks: [1, 1, 1, 1404] (x, y, z per point), presence: [1, 1, 1, 1] logit
        if outputs.len() < 2 {
            return Err(format!(
                "Landmark model expected 2 outputs, got {}",
                outputs.len()
            )
            .into());
        }
        let first = outputs[0].try_extract_array::<f32>()?;
        let second = outputs[1].try_extract_array::<f32>()?;
        let first = first.as_slice().ok_or("Cannot get landmark output slice")?;
        let second = second.as_slice().ok_or("Cannot get landmark output slice")?;
        let (coords, presence) = split_outputs(first, second)?;

        Ok(RegressedFace {
            landmarks: map_to_frame(coords, roi, self.input_size, frame.width(), frame.height()),
            presence: sigmoid(presence) as f64,
        })
    }
}

/// Identifies the coordinate tensor and the presence logit regardless of output order.
fn split_outputs<'a>(
    first: &'a [f32],
    second: &'a [f32],
) -> Result<(&'a [f32], f32), Box<dyn std::error::Error>> {
    let (coords, presence) = if first.len() >= second.len() {
        (first, second)
    } else {
        (second, first)
    };
    if coords.is_empty() || coords.len() % 3 != 0 {
        return Err(format!(
            "Landmark output length {} is not a multiple of 3",
            coords.len()
        )
        .into());
    }
    let logit = *presence.first().ok_or("Landmark model produced no presence score")?;
    Ok((coords, logit))
}

/// Maps `(x, y, z)` triples from crop pixels to normalized frame coordinates,
/// undoing the crop's rotation.
fn map_to_frame(
    coords: &[f32],
    roi: &Roi,
    input_size: u32,
    frame_width: u32,
    frame_height: u32,
) -> FaceLandmarks {
    let input = input_size as f64;
    let scale = roi.size / input;
    let fw = frame_width as f64;
    let fh = frame_height as f64;

    let points = coords
        .chunks_exact(3)
        .map(|p| {
            let [px, py] = roi.to_frame(p[0] as f64 / input, p[1] as f64 / input);
            Landmark::new(px / fw, py / fh, p[2] as f64 * scale / fw)
        })
        .collect();

    FaceLandmarks::new(points)
}
