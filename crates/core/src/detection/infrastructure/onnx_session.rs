//! Session construction and input tensor preparation shared by the
//! face detection and landmark models.

use std::path::Path;

use ndarray::Array4;

use crate::shared::frame::Frame;

/// Memory layout of an image input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
    /// `[1, 3, H, W]`
    Nchw,
    /// `[1, H, W, 3]`, as produced by TFLite conversions.
    Nhwc,
}

/// Value range pixel bytes are mapped onto.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputRange {
    pub low: f32,
    pub high: f32,
}

pub const UNIT_RANGE: InputRange = InputRange {
    low: 0.0,
    high: 1.0,
};

pub const SIGNED_UNIT_RANGE: InputRange = InputRange {
    low: -1.0,
    high: 1.0,
};

/// Loads an ONNX model with the platform's preferred execution providers.
pub fn load_session(
    model_path: &Path,
) -> Result<ort::session::Session, Box<dyn std::error::Error>> {
    let session = ort::session::Session::builder()?
        .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
        .with_intra_threads(1)?
        .with_execution_providers(preferred_execution_providers())?
        .commit_from_file(model_path)?;
    log::debug!("Loaded model {}", model_path.display());
    Ok(session)
}

/// Platform-specific accelerators. ONNX Runtime falls back to CPU when
/// a provider is unavailable.
fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

/// Reads the layout and square input size from the model's first input.
///
/// A 3 in position 1 means NCHW, a 3 in position 3 means NHWC. Dynamic or
/// unreadable shapes fall back to `default_layout` and `default_size`.
pub fn input_geometry(
    session: &ort::session::Session,
    default_layout: TensorLayout,
    default_size: u32,
) -> (TensorLayout, u32) {
    let dims: Option<Vec<i64>> = session.inputs().first().and_then(|input| {
        if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
            Some(shape.iter().copied().collect())
        } else {
            None
        }
    });
    geometry_from_dims(dims.as_deref(), default_layout, default_size)
}

fn geometry_from_dims(
    dims: Option<&[i64]>,
    default_layout: TensorLayout,
    default_size: u32,
) -> (TensorLayout, u32) {
    match dims {
        Some([_, 3, h, _]) if *h > 0 => (TensorLayout::Nchw, *h as u32),
        Some([_, h, _, 3]) if *h > 0 => (TensorLayout::Nhwc, *h as u32),
        _ => (default_layout, default_size),
    }
}

/// Samples the frame rectangle `[x, y, w, h]` (pixels, may extend past the
/// frame), turned by `rotation` radians about its center, onto a
/// `size × size` tensor using nearest-neighbour lookup.
///
/// Pixels outside the frame read as `range.low`. Channels are taken in the
/// frame's own byte order, so callers pass RGB frames for RGB models.
pub fn sample_rect(
    frame: &Frame,
    rect: [f64; 4],
    rotation: f64,
    size: u32,
    layout: TensorLayout,
    range: InputRange,
) -> Array4<f32> {
    let src = frame.as_ndarray();
    let fw = frame.width() as i64;
    let fh = frame.height() as i64;
    let s = size as usize;
    let [rx, ry, rw, rh] = rect;
    let (cx, cy) = (rx + rw / 2.0, ry + rh / 2.0);
    let (sin, cos) = rotation.sin_cos();
    let scale = (range.high - range.low) / 255.0;

    let mut tensor = match layout {
        TensorLayout::Nchw => Array4::<f32>::from_elem((1, 3, s, s), range.low),
        TensorLayout::Nhwc => Array4::<f32>::from_elem((1, s, s, 3), range.low),
    };

    for y in 0..s {
        let dy = ((y as f64 + 0.5) / s as f64 - 0.5) * rh;
        for x in 0..s {
            let dx = ((x as f64 + 0.5) / s as f64 - 0.5) * rw;
            let src_x = (cx + dx * cos - dy * sin).floor() as i64;
            let src_y = (cy + dx * sin + dy * cos).floor() as i64;
            if src_x < 0 || src_x >= fw || src_y < 0 || src_y >= fh {
                continue;
            }
            for c in 0..3 {
                let v = range.low + src[[src_y as usize, src_x as usize, c]] as f32 * scale;
                match layout {
                    TensorLayout::Nchw => tensor[[0, c, y, x]] = v,
                    TensorLayout::Nhwc => tensor[[0, y, x, c]] = v,
                }
            }
        }
    }

    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::frame::PixelFormat;
    use rstest::rstest;

    #[rstest]
    #[case::nchw(Some(&[1, 3, 192, 192][..]), TensorLayout::Nchw, 192)]
    #[case::nhwc(Some(&[1, 128, 128, 3][..]), TensorLayout::Nhwc, 128)]
    #[case::dynamic(Some(&[1, 3, -1, -1][..]), TensorLayout::Nhwc, 64)]
    #[case::unknown(None, TensorLayout::Nhwc, 64)]
    fn test_geometry_from_dims(
        #[case] dims: Option<&[i64]>,
        #[case] layout: TensorLayout,
        #[case] size: u32,
    ) {
        assert_eq!(
            geometry_from_dims(dims, TensorLayout::Nhwc, 64),
            (layout, size)
        );
    }

    #[test]
    fn test_sample_rect_shape_per_layout() {
        let frame = Frame::filled(20, 10, PixelFormat::Rgb, [0, 0, 0]);
        let rect = [0.0, 0.0, 20.0, 10.0];
        let nchw = sample_rect(&frame, rect, 0.0, 8, TensorLayout::Nchw, UNIT_RANGE);
        let nhwc = sample_rect(&frame, rect, 0.0, 8, TensorLayout::Nhwc, UNIT_RANGE);
        assert_eq!(nchw.shape(), &[1, 3, 8, 8]);
        assert_eq!(nhwc.shape(), &[1, 8, 8, 3]);
    }

    #[test]
    fn test_sample_rect_maps_range() {
        let frame = Frame::filled(4, 4, PixelFormat::Rgb, [255, 0, 255]);
        let t = sample_rect(
            &frame,
            [0.0, 0.0, 4.0, 4.0],
            0.0,
            2,
            TensorLayout::Nchw,
            SIGNED_UNIT_RANGE,
        );
        assert!((t[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
        assert!((t[[0, 1, 0, 0]] + 1.0).abs() < 1e-6);
        assert!((t[[0, 2, 1, 1]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sample_rect_outside_frame_reads_black() {
        let frame = Frame::filled(4, 4, PixelFormat::Rgb, [255, 255, 255]);
        // Left half of the rect lies outside the frame.
        let t = sample_rect(&frame, [-4.0, 0.0, 8.0, 4.0], 0.0, 2, TensorLayout::Nhwc, UNIT_RANGE);
        assert_eq!(t[[0, 0, 0, 0]], 0.0);
        assert!((t[[0, 0, 1, 0]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sample_rect_picks_nearest_source_pixel() {
        // 2x1 frame: left pixel red, right pixel blue.
        let frame = Frame::new(vec![255, 0, 0, 0, 0, 255], 2, 1, PixelFormat::Rgb, 0);
        let t = sample_rect(&frame, [0.0, 0.0, 2.0, 1.0], 0.0, 2, TensorLayout::Nhwc, UNIT_RANGE);
        assert!((t[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
        assert!((t[[0, 0, 1, 2]] - 1.0).abs() < 1e-6);
        assert_eq!(t[[0, 0, 1, 0]], 0.0);
    }

    #[test]
    fn test_sample_rect_rotation_turns_crop() {
        // 4x4 frame, top-left 2x2 quadrant white.
        let mut frame = Frame::filled(4, 4, PixelFormat::Rgb, [0, 0, 0]);
        for y in 0..2 {
            for x in 0..2 {
                let i = (y * 4 + x) * 3;
                frame.data_mut()[i..i + 3].copy_from_slice(&[255, 255, 255]);
            }
        }
        let rect = [0.0, 0.0, 4.0, 4.0];
        let upright = sample_rect(&frame, rect, 0.0, 2, TensorLayout::Nhwc, UNIT_RANGE);
        let turned = sample_rect(
            &frame,
            rect,
            std::f64::consts::FRAC_PI_2,
            2,
            TensorLayout::Nhwc,
            UNIT_RANGE,
        );
        assert!((upright[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
        // A quarter turn brings the white quadrant to the crop's bottom-left.
        assert_eq!(turned[[0, 0, 0, 0]], 0.0);
        assert!((turned[[0, 1, 0, 0]] - 1.0).abs() < 1e-6);
    }
}
