use bytemuck::{Pod, Zeroable};

use crate::math::{Mat4, Vec3};

/// Unit quaternion representing a rotation, `w` last.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Quat = Quat::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Quat {
        let half = angle * 0.5;
        let s = half.sin();
        Quat::new(axis.x * s, axis.y * s, axis.z * s, half.cos())
    }

    pub fn dot(self, other: Quat) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn normalize(self) -> Quat {
        let length = self.length();
        if length > 0.0 {
            let inv = 1.0 / length;
            Quat::new(self.x * inv, self.y * inv, self.z * inv, self.w * inv)
        } else {
            Quat::IDENTITY
        }
    }

    /// Extracts the rotation from the upper 3x3 block of `m`, which must be a
    /// pure rotation (orthonormal basis columns).
    ///
    /// Branches on the matrix trace: the direct formula is only well
    /// conditioned when the trace is positive, so near 180-degree rotations
    /// the largest diagonal element picks one of three alternate forms.
    pub fn from_rotation_matrix(m: &Mat4) -> Quat {
        let m11 = m.get(0, 0);
        let m12 = m.get(0, 1);
        let m13 = m.get(0, 2);
        let m21 = m.get(1, 0);
        let m22 = m.get(1, 1);
        let m23 = m.get(1, 2);
        let m31 = m.get(2, 0);
        let m32 = m.get(2, 1);
        let m33 = m.get(2, 2);

        let trace = m11 + m22 + m33;

        if trace > 0.0 {
            let s = 0.5 / (trace + 1.0).sqrt();
            Quat::new(
                (m32 - m23) * s,
                (m13 - m31) * s,
                (m21 - m12) * s,
                0.25 / s,
            )
        } else if m11 > m22 && m11 > m33 {
            let s = 2.0 * (1.0 + m11 - m22 - m33).sqrt();
            Quat::new(
                0.25 * s,
                (m12 + m21) / s,
                (m13 + m31) / s,
                (m32 - m23) / s,
            )
        } else if m22 > m33 {
            let s = 2.0 * (1.0 + m22 - m11 - m33).sqrt();
            Quat::new(
                (m12 + m21) / s,
                0.25 * s,
                (m23 + m32) / s,
                (m13 - m31) / s,
            )
        } else {
            let s = 2.0 * (1.0 + m33 - m11 - m22).sqrt();
            Quat::new(
                (m13 + m31) / s,
                (m23 + m32) / s,
                0.25 * s,
                (m21 - m12) / s,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_axis_up_to_sign(q: Quat, axis: Vec3) {
        let v = Vec3::new(q.x, q.y, q.z).normalize();
        let aligned = v.dot(axis).abs();
        assert!(
            (aligned - 1.0).abs() < 1e-6,
            "expected rotation axis {:?}, got {:?}",
            axis,
            q
        );
    }

    #[test]
    fn identity_matrix_extracts_identity_quaternion() {
        let q = Quat::from_rotation_matrix(&Mat4::IDENTITY);
        assert_eq!(q, Quat::IDENTITY);
    }

    #[test]
    fn half_turn_about_each_axis_is_stable() {
        // The trace is -1 for these, which the naive formula cannot handle.
        for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
            let m = Mat4::compose(
                Vec3::ZERO,
                Quat::from_axis_angle(axis, std::f32::consts::PI),
                Vec3::ONE,
            );
            let q = Quat::from_rotation_matrix(&m);
            assert!(
                !q.x.is_nan() && !q.y.is_nan() && !q.z.is_nan() && !q.w.is_nan(),
                "NaN in extracted quaternion for axis {:?}",
                axis
            );
            assert!((q.length() - 1.0).abs() < 1e-5);
            assert_axis_up_to_sign(q, axis);
        }
    }

    #[test]
    fn from_axis_angle_is_unit_length() {
        let q = Quat::from_axis_angle(Vec3::new(0.6, 0.8, 0.0), 1.3);
        assert!((q.length() - 1.0).abs() < 1e-6);
    }
}
