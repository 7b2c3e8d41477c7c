use crate::math::{Mat4, Vec3};

/// Axis-aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Empty box; expanding it with any point yields that point.
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub const ZERO: Aabb = Aabb {
        min: Vec3::ZERO,
        max: Vec3::ZERO,
    };

    pub fn new(point1: Vec3, point2: Vec3) -> Aabb {
        Aabb {
            min: point1.min(point2),
            max: point1.max(point2),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    pub fn expand_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn expand_transformed_point(&mut self, matrix: &Mat4, point: Vec3) {
        self.expand_point(matrix.transform_point3(point));
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expanding_empty_box_yields_the_point() {
        let mut aabb = Aabb::EMPTY;
        aabb.expand_point(Vec3::new(1.0, -2.0, 3.0));
        assert_eq!(aabb.min, Vec3::new(1.0, -2.0, 3.0));
        assert_eq!(aabb.max, Vec3::new(1.0, -2.0, 3.0));
        assert!(!aabb.is_empty());
    }

    #[test]
    fn center_and_size() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(aabb.center(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(aabb.size(), Vec3::new(2.0, 4.0, 6.0));
    }
}
