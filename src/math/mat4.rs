use std::ops::Mul;

use bytemuck::{Pod, Zeroable};

use crate::math::{Quat, Vec3};

/// 4x4 affine matrix, column-major. Scene-graph transforms keep the last row
/// at (0, 0, 0, 1); only the projection matrix is non-affine.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Mat4 {
    cols: [[f32; 4]; 4],
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub fn from_cols_array(m: &[f32; 16]) -> Mat4 {
        let mut cols = [[0.0; 4]; 4];
        for c in 0..4 {
            for r in 0..4 {
                cols[c][r] = m[c * 4 + r];
            }
        }
        Mat4 { cols }
    }

    pub fn to_cols_array(&self) -> [f32; 16] {
        let mut out = [0.0; 16];
        for c in 0..4 {
            for r in 0..4 {
                out[c * 4 + r] = self.cols[c][r];
            }
        }
        out
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.cols[col][row]
    }

    pub fn col(&self, col: usize) -> Vec3 {
        Vec3::new(self.cols[col][0], self.cols[col][1], self.cols[col][2])
    }

    /// Builds the local matrix from translation, rotation and (possibly
    /// non-uniform) scale.
    pub fn compose(translation: Vec3, rotation: Quat, scale: Vec3) -> Mat4 {
        let Quat { x, y, z, w } = rotation;
        let (x2, y2, z2) = (x + x, y + y, z + z);
        let (xx, xy, xz) = (x * x2, x * y2, x * z2);
        let (yy, yz, zz) = (y * y2, y * z2, z * z2);
        let (wx, wy, wz) = (w * x2, w * y2, w * z2);

        Mat4 {
            cols: [
                [
                    (1.0 - (yy + zz)) * scale.x,
                    (xy + wz) * scale.x,
                    (xz - wy) * scale.x,
                    0.0,
                ],
                [
                    (xy - wz) * scale.y,
                    (1.0 - (xx + zz)) * scale.y,
                    (yz + wx) * scale.y,
                    0.0,
                ],
                [
                    (xz + wy) * scale.z,
                    (yz - wx) * scale.z,
                    (1.0 - (xx + yy)) * scale.z,
                    0.0,
                ],
                [translation.x, translation.y, translation.z, 1.0],
            ],
        }
    }

    /// Splits an affine matrix into translation, rotation and scale.
    ///
    /// Scale factors are the lengths of the first three basis columns; a
    /// negative determinant flips the x scale so mirrored transforms still
    /// yield a proper rotation. An axis with zero scale leaves the rotation
    /// undefined, in which case identity is returned with a warning.
    pub fn decompose(&self) -> (Vec3, Quat, Vec3) {
        let mut sx = self.col(0).length();
        let sy = self.col(1).length();
        let sz = self.col(2).length();

        if self.determinant() < 0.0 {
            sx = -sx;
        }

        let translation = self.col(3);
        let scale = Vec3::new(sx, sy, sz);

        if sx.abs() < f32::EPSILON || sy.abs() < f32::EPSILON || sz.abs() < f32::EPSILON {
            log::warn!("cannot extract rotation from zero-scale matrix, using identity");
            return (translation, Quat::IDENTITY, scale);
        }

        let mut rotation = *self;
        for r in 0..3 {
            rotation.cols[0][r] /= sx;
            rotation.cols[1][r] /= sy;
            rotation.cols[2][r] /= sz;
        }
        (translation, Quat::from_rotation_matrix(&rotation), scale)
    }

    pub fn transpose(&self) -> Mat4 {
        let mut out = Mat4::IDENTITY;
        for c in 0..4 {
            for r in 0..4 {
                out.cols[c][r] = self.cols[r][c];
            }
        }
        out
    }

    pub fn determinant(&self) -> f32 {
        let m = self.to_cols_array();

        let b00 = m[0] * m[5] - m[1] * m[4];
        let b01 = m[0] * m[6] - m[2] * m[4];
        let b02 = m[0] * m[7] - m[3] * m[4];
        let b03 = m[1] * m[6] - m[2] * m[5];
        let b04 = m[1] * m[7] - m[3] * m[5];
        let b05 = m[2] * m[7] - m[3] * m[6];
        let b06 = m[8] * m[13] - m[9] * m[12];
        let b07 = m[8] * m[14] - m[10] * m[12];
        let b08 = m[8] * m[15] - m[11] * m[12];
        let b09 = m[9] * m[14] - m[10] * m[13];
        let b10 = m[9] * m[15] - m[11] * m[13];
        let b11 = m[10] * m[15] - m[11] * m[14];

        b00 * b11 - b01 * b10 + b02 * b09 + b03 * b08 - b04 * b07 + b05 * b06
    }

    /// Inverts the matrix. A singular matrix is not a hard error: it degrades
    /// to identity with a diagnostic, so one bad transform cannot take down
    /// the frame loop.
    pub fn inverse(&self) -> Mat4 {
        let m = self.to_cols_array();

        let b00 = m[0] * m[5] - m[1] * m[4];
        let b01 = m[0] * m[6] - m[2] * m[4];
        let b02 = m[0] * m[7] - m[3] * m[4];
        let b03 = m[1] * m[6] - m[2] * m[5];
        let b04 = m[1] * m[7] - m[3] * m[5];
        let b05 = m[2] * m[7] - m[3] * m[6];
        let b06 = m[8] * m[13] - m[9] * m[12];
        let b07 = m[8] * m[14] - m[10] * m[12];
        let b08 = m[8] * m[15] - m[11] * m[12];
        let b09 = m[9] * m[14] - m[10] * m[13];
        let b10 = m[9] * m[15] - m[11] * m[13];
        let b11 = m[10] * m[15] - m[11] * m[14];

        let det = b00 * b11 - b01 * b10 + b02 * b09 + b03 * b08 - b04 * b07 + b05 * b06;
        if det.abs() < 1e-10 {
            log::warn!("matrix is not invertible (det ~ 0), falling back to identity");
            return Mat4::IDENTITY;
        }
        let inv = 1.0 / det;

        let out = [
            (m[5] * b11 - m[6] * b10 + m[7] * b09) * inv,
            (m[2] * b10 - m[1] * b11 - m[3] * b09) * inv,
            (m[13] * b05 - m[14] * b04 + m[15] * b03) * inv,
            (m[10] * b04 - m[9] * b05 - m[11] * b03) * inv,
            (m[6] * b08 - m[4] * b11 - m[7] * b07) * inv,
            (m[0] * b11 - m[2] * b08 + m[3] * b07) * inv,
            (m[14] * b02 - m[12] * b05 - m[15] * b01) * inv,
            (m[8] * b05 - m[10] * b02 + m[11] * b01) * inv,
            (m[4] * b10 - m[5] * b08 + m[7] * b06) * inv,
            (m[1] * b08 - m[0] * b10 - m[3] * b06) * inv,
            (m[12] * b04 - m[13] * b02 + m[15] * b00) * inv,
            (m[9] * b02 - m[8] * b04 - m[11] * b00) * inv,
            (m[5] * b07 - m[4] * b09 - m[6] * b06) * inv,
            (m[0] * b09 - m[1] * b07 + m[2] * b06) * inv,
            (m[13] * b01 - m[12] * b03 - m[14] * b00) * inv,
            (m[8] * b03 - m[9] * b01 + m[10] * b00) * inv,
        ];
        Mat4::from_cols_array(&out)
    }

    /// Transforms a point, assuming the matrix is affine.
    pub fn transform_point3(&self, p: Vec3) -> Vec3 {
        Vec3::new(
            self.cols[0][0] * p.x + self.cols[1][0] * p.y + self.cols[2][0] * p.z + self.cols[3][0],
            self.cols[0][1] * p.x + self.cols[1][1] * p.y + self.cols[2][1] * p.z + self.cols[3][1],
            self.cols[0][2] * p.x + self.cols[1][2] * p.y + self.cols[2][2] * p.z + self.cols[3][2],
        )
    }

    /// Right-handed perspective projection with WebGPU 0..1 clip depth.
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let f = 1.0 / (fov_y * 0.5).tan();
        let mut out = Mat4 {
            cols: [[0.0; 4]; 4],
        };
        out.cols[0][0] = f / aspect;
        out.cols[1][1] = f;
        out.cols[2][2] = far / (near - far);
        out.cols[2][3] = -1.0;
        out.cols[3][2] = near * far / (near - far);
        out
    }

    /// Orientation basis for an object at `eye` facing `target`, -Z forward.
    /// Rotation only; the caller keeps translation separate.
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let mut z = eye - target;
        if z.length_squared() == 0.0 {
            // eye and target coincide
            z = Vec3::Z;
        }
        z = z.normalize();

        let mut x = up.cross(z);
        if x.length_squared() == 0.0 {
            // up is parallel to the view direction; nudge off the pole
            z.z += 0.0001;
            z = z.normalize();
            x = up.cross(z);
        }
        x = x.normalize();
        let y = z.cross(x);

        Mat4 {
            cols: [
                [x.x, x.y, x.z, 0.0],
                [y.x, y.y, y.z, 0.0],
                [z.x, z.y, z.z, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }
}

impl Mul for Mat4 {
    type Output = Mat4;

    fn mul(self, rhs: Mat4) -> Mat4 {
        let mut out = Mat4 {
            cols: [[0.0; 4]; 4],
        };
        for c in 0..4 {
            for r in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += self.cols[k][r] * rhs.cols[c][k];
                }
                out.cols[c][r] = sum;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec_close(a: Vec3, b: Vec3, tolerance: f32) {
        assert!(
            (a - b).length() < tolerance,
            "expected {:?}, got {:?}",
            b,
            a
        );
    }

    #[test]
    fn compose_decompose_round_trips() {
        let translation = Vec3::new(1.5, -2.0, 7.25);
        let rotation = Quat::from_axis_angle(Vec3::new(0.0, 0.6, 0.8), 1.1).normalize();
        let scale = Vec3::new(2.0, 0.5, 3.0);

        let m = Mat4::compose(translation, rotation, scale);
        let (t, r, s) = m.decompose();

        assert_eq!(t, translation);
        assert_vec_close(s, scale, 1e-5);

        // Quaternions double-cover rotations; compare up to sign.
        let dot = r.dot(rotation).abs();
        assert!((dot - 1.0).abs() < 1e-5, "rotation mismatch: {:?}", r);
    }

    #[test]
    fn decompose_zero_scale_falls_back_to_identity_rotation() {
        let m = Mat4::compose(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_axis_angle(Vec3::Y, 0.5),
            Vec3::new(0.0, 1.0, 1.0),
        );
        let (t, r, _s) = m.decompose();
        assert_eq!(t, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(r, Quat::IDENTITY);
    }

    #[test]
    fn inverse_round_trips() {
        let m = Mat4::compose(
            Vec3::new(3.0, -1.0, 2.0),
            Quat::from_axis_angle(Vec3::X, 0.7),
            Vec3::new(1.0, 2.0, 0.5),
        );
        let restored = m * m.inverse();
        let identity = Mat4::IDENTITY.to_cols_array();
        for (a, b) in restored.to_cols_array().iter().zip(identity.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn singular_inverse_degrades_to_identity() {
        let mut zero_scale = Mat4::IDENTITY;
        zero_scale = zero_scale * Mat4::compose(Vec3::ZERO, Quat::IDENTITY, Vec3::ZERO);
        assert_eq!(zero_scale.inverse(), Mat4::IDENTITY);
    }

    #[test]
    fn transform_point_applies_translation_last() {
        let m = Mat4::compose(
            Vec3::new(10.0, 0.0, 0.0),
            Quat::IDENTITY,
            Vec3::splat(2.0),
        );
        assert_eq!(
            m.transform_point3(Vec3::new(1.0, 1.0, 1.0)),
            Vec3::new(12.0, 2.0, 2.0)
        );
    }

    #[test]
    fn look_at_faces_negative_z_toward_target() {
        let m = Mat4::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        // Basis z column points from target to eye.
        assert_vec_close(m.col(2), Vec3::Z, 1e-6);
        assert_vec_close(m.col(0), Vec3::X, 1e-6);
    }
}
