use glam::{Mat4, Quat, Vec3};

/// Builds a local matrix from TRS properties.
pub fn compose(translation: Vec3, rotation: Quat, scale: Vec3) -> Mat4 {
    Mat4::from_scale_rotation_translation(scale, rotation, translation)
}

/// Decomposes a matrix into TRS properties.
///
/// Scale is taken as the length of each basis column of the upper-left 3x3
/// block; the first axis is negated when the determinant is negative so that
/// reflections survive the round trip. The rotation is extracted from the
/// scale-normalized block with the standard trace-based branch selection,
/// picking the square-root pivot that avoids cancellation.
pub fn decompose(matrix: Mat4) -> (Vec3, Quat, Vec3) {
    let mut sx = matrix.x_axis.truncate().length();
    let sy = matrix.y_axis.truncate().length();
    let sz = matrix.z_axis.truncate().length();
    if matrix.determinant() < 0.0 {
        sx = -sx;
    }

    let translation = matrix.w_axis.truncate();

    let mut m = matrix.to_cols_array();
    let inv_sx = 1.0 / sx;
    let inv_sy = 1.0 / sy;
    let inv_sz = 1.0 / sz;
    for i in 0..3 {
        m[i] *= inv_sx;
        m[4 + i] *= inv_sy;
        m[8 + i] *= inv_sz;
    }

    let rotation = rotation_of(&m);
    (translation, rotation, Vec3::new(sx, sy, sz))
}

/// Quaternion from a column-major rotation matrix.
fn rotation_of(m: &[f32; 16]) -> Quat {
    let (m11, m12, m13) = (m[0], m[1], m[2]);
    let (m21, m22, m23) = (m[4], m[5], m[6]);
    let (m31, m32, m33) = (m[8], m[9], m[10]);
    let trace = m11 + m22 + m33;

    let (x, y, z, w);
    if trace > 0.0 {
        let s = (trace + 1.0).sqrt() * 2.0;
        w = 0.25 * s;
        x = (m23 - m32) / s;
        y = (m31 - m13) / s;
        z = (m12 - m21) / s;
    } else if m11 > m22 && m11 > m33 {
        let s = (1.0 + m11 - m22 - m33).sqrt() * 2.0;
        w = (m23 - m32) / s;
        x = 0.25 * s;
        y = (m12 + m21) / s;
        z = (m31 + m13) / s;
    } else if m22 > m33 {
        let s = (1.0 + m22 - m11 - m33).sqrt() * 2.0;
        w = (m31 - m13) / s;
        x = (m12 + m21) / s;
        y = 0.25 * s;
        z = (m23 + m32) / s;
    } else {
        let s = (1.0 + m33 - m11 - m22).sqrt() * 2.0;
        w = (m12 - m21) / s;
        x = (m31 + m13) / s;
        y = (m23 + m32) / s;
        z = 0.25 * s;
    }

    Quat::from_xyzw(x, y, z, w)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec3_eq(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-5, "{:?} != {:?}", a, b);
    }

    #[test]
    fn decompose_inverts_compose() {
        let translation = Vec3::new(1.0, -2.0, 3.0);
        let rotation = Quat::from_rotation_y(0.7) * Quat::from_rotation_x(-0.3);
        let scale = Vec3::new(2.0, 0.5, 1.5);

        let (t, r, s) = decompose(compose(translation, rotation, scale));
        assert_vec3_eq(translation, t);
        assert_vec3_eq(scale, s);
        assert!(r.dot(rotation).abs() > 1.0 - 1e-5);
    }

    #[test]
    fn decompose_preserves_reflection() {
        let matrix = compose(Vec3::ZERO, Quat::IDENTITY, Vec3::new(-2.0, 1.0, 1.0));
        let (_, _, s) = decompose(matrix);
        assert!(s.x < 0.0);
        assert_vec3_eq(Vec3::new(-2.0, 1.0, 1.0), s);
    }

    #[test]
    fn rotation_branches_cover_large_diagonals() {
        for quat in [
            Quat::from_rotation_x(std::f32::consts::PI - 0.01),
            Quat::from_rotation_y(std::f32::consts::PI - 0.01),
            Quat::from_rotation_z(std::f32::consts::PI - 0.01),
        ] {
            let (_, r, _) = decompose(compose(Vec3::ZERO, quat, Vec3::ONE));
            assert!(r.dot(quat).abs() > 1.0 - 1e-4);
        }
    }
}
