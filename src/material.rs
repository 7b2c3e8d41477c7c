use crate::math::Vec3;

/// Flat-shaded material. No textures; the try-on pipeline bakes everything
/// into vertex colors.
#[derive(Clone, Debug)]
pub struct Material {
    pub base_color: Vec3,
    pub vertex_colors: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: Vec3::ONE,
            vertex_colors: false,
        }
    }
}
