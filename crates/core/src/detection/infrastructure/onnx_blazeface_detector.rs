/// BlazeFace face detector using ONNX Runtime via `ort`.
///
/// First stage of the face mesh detector: finds coarse face boxes that the
/// landmark stage then refines.
use std::path::Path;

use crate::detection::domain::face_stages::{FaceBox, FaceBoxDetector};
use crate::shared::frame::Frame;

use super::math::{nms, sigmoid};
use super::onnx_session::{self, TensorLayout, SIGNED_UNIT_RANGE};

/// BlazeFace short-range model input resolution.
const INPUT_SIZE: u32 = 128;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.3;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// Values per anchor in the regressor output: box (4) + 6 keypoints (12).
const REGRESSOR_STRIDE: usize = 16;

/// BlazeFace detector backed by an ONNX Runtime session.
pub struct OnnxBlazefaceDetector {
    session: ort::session::Session,
    layout: TensorLayout,
    confidence: f64,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBlazefaceDetector {
    /// Load a BlazeFace ONNX model. Boxes scoring below `confidence` are dropped.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = onnx_session::load_session(model_path)?;
        let (layout, _) = onnx_session::input_geometry(&session, TensorLayout::Nhwc, INPUT_SIZE);
        Ok(Self {
            session,
            layout,
            confidence,
            anchors: generate_anchors(),
        })
    }
}

impl FaceBoxDetector for OnnxBlazefaceDetector {
    fn detect_faces(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
        let square = letterbox(frame.width(), frame.height());
        let input_tensor = onnx_session::sample_rect(
            frame,
            square,
            0.0,
            INPUT_SIZE,
            self.layout,
            SIGNED_UNIT_RANGE,
        );

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // regressors: [1, 896, 16], classificators: [1, 896, 1]
        if outputs.len() < 2 {
            return Err(
                format!("BlazeFace model expected 2 outputs, got {}", outputs.len()).into(),
            );
        }
        let first = outputs[0].try_extract_array::<f32>()?;
        let second = outputs[1].try_extract_array::<f32>()?;
        let first = first.as_slice().ok_or("Cannot get BlazeFace output slice")?;
        let second = second.as_slice().ok_or("Cannot get BlazeFace output slice")?;
        let (regressors, scores) = if first.len() >= second.len() {
            (first, second)
        } else {
            (second, first)
        };

        let boxes = decode_boxes(
            regressors,
            scores,
            &self.anchors,
            self.confidence,
            square,
            frame.width(),
            frame.height(),
        );
        Ok(nms(boxes, NMS_IOU_THRESH))
    }
}

/// Square `[x, y, side, side]` centered on the frame and covering all of it,
/// so the model sees the frame padded rather than stretched.
fn letterbox(frame_width: u32, frame_height: u32) -> [f64; 4] {
    let fw = frame_width as f64;
    let fh = frame_height as f64;
    let side = fw.max(fh);
    [(fw - side) / 2.0, (fh - side) / 2.0, side, side]
}

/// Turns raw anchor outputs into frame-pixel boxes, dropping low scores.
///
/// Outputs are relative to the `square` the input was sampled from; boxes
/// are clamped to the frame.
fn decode_boxes(
    regressors: &[f32],
    scores: &[f32],
    anchors: &[[f32; 2]],
    confidence: f64,
    square: [f64; 4],
    frame_width: u32,
    frame_height: u32,
) -> Vec<FaceBox> {
    let fw = frame_width as f64;
    let fh = frame_height as f64;
    let [sx, sy, side, _] = square;
    let to_frame = |x: f32, y: f32| [sx + x as f64 * side, sy + y as f64 * side];
    let size = INPUT_SIZE as f32;
    let mut boxes = Vec::new();

    for (i, &raw_score) in scores.iter().enumerate().take(anchors.len()) {
        let score = sigmoid(raw_score);
        if (score as f64) < confidence {
            continue;
        }

        let offset = i * REGRESSOR_STRIDE;
        if offset + 4 > regressors.len() {
            break;
        }

        let anchor = anchors[i];
        let cx = anchor[0] + regressors[offset] / size;
        let cy = anchor[1] + regressors[offset + 1] / size;
        let w = regressors[offset + 2] / size;
        let h = regressors[offset + 3] / size;

        let [x1, y1] = to_frame(cx - w / 2.0, cy - h / 2.0);
        let [x2, y2] = to_frame(cx + w / 2.0, cy + h / 2.0);
        let eyes = (offset + 8 <= regressors.len()).then(|| {
            let eye = |k: usize| {
                to_frame(
                    anchor[0] + regressors[offset + 4 + 2 * k] / size,
                    anchor[1] + regressors[offset + 5 + 2 * k] / size,
                )
            };
            [eye(0), eye(1)]
        });

        boxes.push(FaceBox {
            x1: x1.max(0.0),
            y1: y1.max(0.0),
            x2: x2.min(fw),
            y2: y2.min(fh),
            score: score as f64,
            eyes,
        });
    }

    boxes
}

/// Generate BlazeFace anchors for the short-range model.
///
/// Two feature maps, 16×16 and 8×8, with 2 and 6 anchors per cell.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)]; // (stride, anchors_per_cell)
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, num) in &strides {
        let grid_size = INPUT_SIZE as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_generate_anchors_count() {
        // 16×16 grid × 2 anchors + 8×8 grid × 6 anchors = 512 + 384 = 896
        assert_eq!(generate_anchors().len(), NUM_ANCHORS);
    }

    #[test]
    fn test_anchors_in_unit_range() {
        for a in &generate_anchors() {
            assert!(a[0] > 0.0 && a[0] < 1.0);
            assert!(a[1] > 0.0 && a[1] < 1.0);
        }
    }

    #[test]
    fn test_decode_scales_to_frame_pixels() {
        let anchors = vec![[0.5, 0.5]];
        // Box centered on the anchor, 64/128 = half the input wide and tall.
        let mut regressors = vec![0.0f32; REGRESSOR_STRIDE];
        regressors[2] = 64.0;
        regressors[3] = 64.0;
        let boxes = decode_boxes(
            &regressors,
            &[5.0],
            &anchors,
            0.5,
            letterbox(200, 100),
            200,
            100,
        );

        // The 200x100 frame sits in a 200x200 square offset 50px upwards.
        assert_eq!(boxes.len(), 1);
        assert_relative_eq!(boxes[0].x1, 50.0, epsilon = 1e-4);
        assert_relative_eq!(boxes[0].y1, 0.0, epsilon = 1e-4);
        assert_relative_eq!(boxes[0].x2, 150.0, epsilon = 1e-4);
        assert_relative_eq!(boxes[0].y2, 100.0, epsilon = 1e-4);
        assert!(boxes[0].score > 0.99);
    }

    #[test]
    fn test_letterbox_pads_short_side() {
        assert_eq!(letterbox(640, 480), [0.0, -80.0, 640.0, 640.0]);
        assert_eq!(letterbox(480, 640), [-80.0, 0.0, 640.0, 640.0]);
        assert_eq!(letterbox(100, 100), [0.0, 0.0, 100.0, 100.0]);
    }

    #[test]
    fn test_decode_keeps_square_face_square_on_wide_frame() {
        let anchors = vec![[0.5, 0.5]];
        let mut regressors = vec![0.0f32; REGRESSOR_STRIDE];
        regressors[2] = 16.0;
        regressors[3] = 16.0;
        let boxes = decode_boxes(
            &regressors,
            &[5.0],
            &anchors,
            0.5,
            letterbox(640, 480),
            640,
            480,
        );

        assert_relative_eq!(boxes[0].width(), 80.0, epsilon = 1e-3);
        assert_relative_eq!(boxes[0].height(), 80.0, epsilon = 1e-3);
        assert_relative_eq!(boxes[0].y1, 200.0, epsilon = 1e-3);
    }

    #[test]
    fn test_decode_eye_keypoints() {
        let anchors = vec![[0.5, 0.5]];
        let mut regressors = vec![0.0f32; REGRESSOR_STRIDE];
        regressors[2] = 64.0;
        regressors[3] = 64.0;
        regressors[4] = -16.0;
        regressors[6] = 16.0;
        regressors[7] = 16.0;
        let boxes = decode_boxes(
            &regressors,
            &[5.0],
            &anchors,
            0.5,
            letterbox(128, 128),
            128,
            128,
        );

        let [right, left] = boxes[0].eyes.unwrap();
        assert_relative_eq!(right[0], 48.0, epsilon = 1e-4);
        assert_relative_eq!(right[1], 64.0, epsilon = 1e-4);
        assert_relative_eq!(left[0], 80.0, epsilon = 1e-4);
        assert_relative_eq!(left[1], 80.0, epsilon = 1e-4);
    }

    #[test]
    fn test_decode_drops_low_scores() {
        let anchors = vec![[0.5, 0.5], [0.25, 0.25]];
        let regressors = vec![1.0f32; REGRESSOR_STRIDE * 2];
        // sigmoid(0) = 0.5 < 0.6; sigmoid(2) ≈ 0.88
        let boxes = decode_boxes(
            &regressors,
            &[0.0, 2.0],
            &anchors,
            0.6,
            letterbox(100, 100),
            100,
            100,
        );
        assert_eq!(boxes.len(), 1);
        assert!(boxes[0].score > 0.8);
    }

    #[test]
    fn test_decode_clamps_to_frame() {
        let anchors = vec![[0.05, 0.95]];
        let mut regressors = vec![0.0f32; REGRESSOR_STRIDE];
        regressors[2] = 64.0;
        regressors[3] = 64.0;
        let boxes = decode_boxes(
            &regressors,
            &[5.0],
            &anchors,
            0.5,
            letterbox(100, 100),
            100,
            100,
        );
        assert_eq!(boxes[0].x1, 0.0);
        assert_relative_eq!(boxes[0].y2, 100.0);
    }
}
