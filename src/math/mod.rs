mod bounds;
mod mat4;
mod quat;
mod vec3;

pub use bounds::Aabb;
pub use mat4::Mat4;
pub use quat::Quat;
pub use vec3::Vec3;
