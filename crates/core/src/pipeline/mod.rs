pub mod live_mesh_use_case;
pub mod mesh_settings;
pub mod pipeline_logger;
