use std::path::Path;

use crate::detection::domain::detector_settings::{DetectionMode, DetectorSettings};
use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::detection::domain::face_stages::{FaceBoxDetector, LandmarkRegressor, Roi};
use crate::detection::domain::landmark_detector::LandmarkDetector;
use crate::shared::frame::Frame;

use super::math::bbox_iou;
use super::onnx_blazeface_detector::OnnxBlazefaceDetector;
use super::onnx_landmark_regressor::OnnxLandmarkRegressor;

/// A fresh detection overlapping a tracked region this much is the same face.
const SAME_FACE_IOU: f64 = 0.5;

/// Two-stage face mesh detector: face boxes first, then dense landmarks
/// inside a square region around each face.
///
/// In [`DetectionMode::StaticImage`] nothing survives between calls. In
/// [`DetectionMode::Tracking`] the regions derived from the last landmarks
/// seed the next frame and the box stage only runs to fill free slots.
pub struct FaceMeshDetector {
    face_detector: Box<dyn FaceBoxDetector>,
    regressor: Box<dyn LandmarkRegressor>,
    settings: DetectorSettings,
    tracked: Vec<Roi>,
}

impl FaceMeshDetector {
    pub fn new(
        face_detector: Box<dyn FaceBoxDetector>,
        regressor: Box<dyn LandmarkRegressor>,
        settings: DetectorSettings,
    ) -> Self {
        Self {
            face_detector,
            regressor,
            settings,
            tracked: Vec::new(),
        }
    }

    /// Builds the detector from BlazeFace and face landmark ONNX models.
    pub fn from_models(
        face_detector_model: &Path,
        landmark_model: &Path,
        settings: DetectorSettings,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let face_detector =
            OnnxBlazefaceDetector::new(face_detector_model, settings.min_detection_confidence)?;
        let regressor = OnnxLandmarkRegressor::new(landmark_model)?;
        Ok(Self::new(
            Box::new(face_detector),
            Box::new(regressor),
            settings,
        ))
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    /// Runs the box stage and keeps the `max_faces` best faces.
    fn detect_rois(&mut self, frame: &Frame) -> Result<Vec<Roi>, Box<dyn std::error::Error>> {
        let mut faces: Vec<_> = self
            .face_detector
            .detect_faces(frame)?
            .into_iter()
            .filter(|f| f.score >= self.settings.min_detection_confidence)
            .collect();
        faces.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        faces.truncate(self.settings.max_faces);
        Ok(faces.iter().map(Roi::from_face_box).collect())
    }

    fn tracking_rois(&mut self, frame: &Frame) -> Result<Vec<Roi>, Box<dyn std::error::Error>> {
        let mut rois = std::mem::take(&mut self.tracked);
        if rois.len() >= self.settings.max_faces {
            return Ok(rois);
        }
        for candidate in self.detect_rois(frame)? {
            if rois.len() >= self.settings.max_faces {
                break;
            }
            let duplicate = rois
                .iter()
                .any(|r| bbox_iou(&r.bbox(), &candidate.bbox()) > SAME_FACE_IOU);
            if !duplicate {
                rois.push(candidate);
            }
        }
        Ok(rois)
    }
}

impl LandmarkDetector for FaceMeshDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceLandmarks>, Box<dyn std::error::Error>> {
        let tracking = self.settings.mode == DetectionMode::Tracking;
        let rois = if tracking {
            self.tracking_rois(frame)?
        } else {
            self.detect_rois(frame)?
        };

        let mut faces = Vec::with_capacity(rois.len());
        for roi in &rois {
            let face = self.regressor.regress(frame, roi)?;
            if tracking {
                if face.presence < self.settings.min_tracking_confidence {
                    log::debug!("Lost tracked face (presence {:.2})", face.presence);
                    continue;
                }
                let next = Roi::from_landmarks(&face.landmarks, frame.width(), frame.height());
                self.tracked.extend(next);
            }
            faces.push(face.landmarks);
        }

        Ok(faces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_landmarks::Landmark;
    use crate::detection::domain::face_stages::{FaceBox, RegressedFace};
    use crate::shared::frame::PixelFormat;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    struct StubFaceDetector {
        boxes: Vec<FaceBox>,
        calls: Arc<Mutex<usize>>,
    }

    impl FaceBoxDetector for StubFaceDetector {
        fn detect_faces(
            &mut self,
            _frame: &Frame,
        ) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.boxes.clone())
        }
    }

    /// Returns a small triangle of landmarks inside the ROI with scripted presence.
    struct StubRegressor {
        presences: VecDeque<f64>,
        rois: Arc<Mutex<Vec<Roi>>>,
    }

    impl LandmarkRegressor for StubRegressor {
        fn regress(
            &mut self,
            frame: &Frame,
            roi: &Roi,
        ) -> Result<RegressedFace, Box<dyn std::error::Error>> {
            self.rois.lock().unwrap().push(*roi);
            let fw = frame.width() as f64;
            let fh = frame.height() as f64;
            let half = roi.size / 4.0;
            let landmarks = FaceLandmarks::new(vec![
                Landmark::new((roi.center_x - half) / fw, (roi.center_y - half) / fh, 0.0),
                Landmark::new((roi.center_x + half) / fw, (roi.center_y - half) / fh, 0.0),
                Landmark::new(roi.center_x / fw, (roi.center_y + half) / fh, 0.0),
            ]);
            Ok(RegressedFace {
                landmarks,
                presence: self.presences.pop_front().unwrap_or(1.0),
            })
        }
    }

    struct Harness {
        detector: FaceMeshDetector,
        box_calls: Arc<Mutex<usize>>,
        rois: Arc<Mutex<Vec<Roi>>>,
    }

    fn face_box(x1: f64, y1: f64, size: f64, score: f64) -> FaceBox {
        FaceBox {
            x1,
            y1,
            x2: x1 + size,
            y2: y1 + size,
            score,
            eyes: None,
        }
    }

    fn harness(boxes: Vec<FaceBox>, presences: Vec<f64>, settings: DetectorSettings) -> Harness {
        let box_calls = Arc::new(Mutex::new(0));
        let rois = Arc::new(Mutex::new(Vec::new()));
        let detector = FaceMeshDetector::new(
            Box::new(StubFaceDetector {
                boxes,
                calls: box_calls.clone(),
            }),
            Box::new(StubRegressor {
                presences: presences.into(),
                rois: rois.clone(),
            }),
            settings,
        );
        Harness {
            detector,
            box_calls,
            rois,
        }
    }

    fn frame() -> Frame {
        Frame::filled(640, 480, PixelFormat::Rgb, [0, 0, 0])
    }

    fn tracking() -> DetectorSettings {
        DetectorSettings {
            mode: DetectionMode::Tracking,
            ..DetectorSettings::default()
        }
    }

    // --- Static image mode ---

    #[test]
    fn test_no_faces_returns_empty() {
        let mut h = harness(vec![], vec![], DetectorSettings::default());
        assert!(h.detector.detect(&frame()).unwrap().is_empty());
        assert!(h.rois.lock().unwrap().is_empty());
    }

    #[test]
    fn test_static_mode_detects_every_frame() {
        let mut h = harness(
            vec![face_box(100.0, 100.0, 80.0, 0.9)],
            vec![],
            DetectorSettings::default(),
        );
        for _ in 0..3 {
            assert_eq!(h.detector.detect(&frame()).unwrap().len(), 1);
        }
        assert_eq!(*h.box_calls.lock().unwrap(), 3);
    }

    #[test]
    fn test_static_mode_ignores_tracking_confidence() {
        let settings = DetectorSettings {
            min_tracking_confidence: 0.99,
            ..DetectorSettings::default()
        };
        let mut h = harness(vec![face_box(100.0, 100.0, 80.0, 0.9)], vec![0.1], settings);
        assert_eq!(h.detector.detect(&frame()).unwrap().len(), 1);
    }

    #[test]
    fn test_boxes_below_detection_confidence_dropped() {
        let mut h = harness(
            vec![face_box(100.0, 100.0, 80.0, 0.59)],
            vec![],
            DetectorSettings::default(),
        );
        assert!(h.detector.detect(&frame()).unwrap().is_empty());
    }

    #[test]
    fn test_max_faces_keeps_highest_scores() {
        let settings = DetectorSettings {
            max_faces: 2,
            ..DetectorSettings::default()
        };
        let mut h = harness(
            vec![
                face_box(0.0, 0.0, 50.0, 0.7),
                face_box(200.0, 0.0, 50.0, 0.95),
                face_box(400.0, 0.0, 50.0, 0.8),
            ],
            vec![],
            settings,
        );
        assert_eq!(h.detector.detect(&frame()).unwrap().len(), 2);
        let rois = h.rois.lock().unwrap();
        assert_eq!(rois[0].center_x, 225.0);
        assert_eq!(rois[1].center_x, 425.0);
    }

    #[test]
    fn test_roi_derived_from_box() {
        let mut h = harness(
            vec![face_box(100.0, 60.0, 80.0, 0.9)],
            vec![],
            DetectorSettings::default(),
        );
        h.detector.detect(&frame()).unwrap();
        let roi = h.rois.lock().unwrap()[0];
        assert_eq!(roi.center_x, 140.0);
        assert_eq!(roi.center_y, 100.0);
        assert_eq!(roi.size, 120.0);
    }

    // --- Tracking mode ---

    #[test]
    fn test_tracking_skips_box_stage_while_face_tracked() {
        let mut h = harness(vec![face_box(100.0, 100.0, 80.0, 0.9)], vec![], tracking());
        for _ in 0..4 {
            assert_eq!(h.detector.detect(&frame()).unwrap().len(), 1);
        }
        assert_eq!(*h.box_calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_tracking_redetects_after_low_presence() {
        // Second frame's presence drops below the 0.6 tracking threshold.
        let mut h = harness(
            vec![face_box(100.0, 100.0, 80.0, 0.9)],
            vec![0.9, 0.3, 0.9],
            tracking(),
        );
        assert_eq!(h.detector.detect(&frame()).unwrap().len(), 1);
        assert!(h.detector.detect(&frame()).unwrap().is_empty());
        assert_eq!(h.detector.detect(&frame()).unwrap().len(), 1);
        assert_eq!(*h.box_calls.lock().unwrap(), 2);
    }

    #[test]
    fn test_tracking_follows_landmark_region() {
        let mut h = harness(vec![face_box(100.0, 100.0, 80.0, 0.9)], vec![], tracking());
        h.detector.detect(&frame()).unwrap();
        h.detector.detect(&frame()).unwrap();
        let rois = h.rois.lock().unwrap();
        // Stub landmarks span half the ROI, so the tracked ROI is 0.75x the first.
        assert_eq!(rois[0].size, 120.0);
        assert!((rois[1].size - 90.0).abs() < 1e-9);
    }
}
