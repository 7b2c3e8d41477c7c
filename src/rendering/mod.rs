pub mod mesh_buffers;
pub mod renderer;
pub mod texture;
