//! Byte copies between frames and OpenCV matrices.

use opencv::core::{Mat, Scalar, StsUnmatchedSizes, CV_8UC3};
use opencv::prelude::*;

use crate::shared::frame::Frame;

/// Copies a frame into a `CV_8UC3` Mat, keeping its channel order.
///
/// An empty frame gives an empty Mat.
pub fn frame_to_mat(frame: &Frame) -> Result<Mat, opencv::Error> {
    if frame.data().is_empty() {
        return Ok(Mat::default());
    }
    let mut mat = Mat::new_rows_cols_with_default(
        frame.height() as i32,
        frame.width() as i32,
        CV_8UC3,
        Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(frame.data());
    Ok(mat)
}

/// Overwrites the frame's pixels with a Mat of the same size.
pub fn copy_mat_into(mat: &Mat, frame: &mut Frame) -> Result<(), opencv::Error> {
    if frame.data().is_empty() {
        return Ok(());
    }
    let bytes = mat.data_bytes()?;
    if bytes.len() != frame.data().len() {
        return Err(opencv::Error::new(
            StsUnmatchedSizes,
            format!(
                "Mat holds {} bytes, frame needs {}",
                bytes.len(),
                frame.data().len()
            ),
        ));
    }
    frame.data_mut().copy_from_slice(bytes);
    Ok(())
}
