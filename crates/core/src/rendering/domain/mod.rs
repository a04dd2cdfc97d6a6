pub mod canvas;
pub mod drawing_style;
pub mod mesh_topology;
pub mod overlay_renderer;
