pub mod face_mesh_detector;
pub mod math;
pub mod model_resolver;
pub mod onnx_blazeface_detector;
pub mod onnx_landmark_regressor;
pub mod onnx_session;
