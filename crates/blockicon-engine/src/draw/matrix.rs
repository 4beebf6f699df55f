use glam::{Mat3, Mat4, Vec2, Vec3};

use crate::device::Size;

/// Half-depth of the orthographic view volume.
const DEPTH_RANGE: f32 = 10.0;

/// Isometric tilt around X, applied after the yaw.
const TILT_DEG: f32 = 30.0;
/// Isometric yaw around Y.
const YAW_DEG: f32 = 45.0;

/// Scale applied to every glint texture matrix.
pub const GLINT_TEXTURE_SCALE: f32 = 0.5;

/// One animated glint layer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GlintPass {
    /// Scroll period in milliseconds.
    pub period_ms: f64,
    /// Fixed rotation of the scrolled texture, in degrees.
    pub angle_deg: f32,
    /// Scroll direction along the rotated U axis.
    pub direction: f32,
}

/// The two glint layers, scrolling in opposite directions.
pub const GLINT_PASSES: [GlintPass; 2] = [
    GlintPass {
        period_ms: 3000.0,
        angle_deg: -50.0,
        direction: 1.0,
    },
    GlintPass {
        period_ms: 4873.0,
        angle_deg: 10.0,
        direction: -1.0,
    },
];

/// Orthographic projection covering `[-aspect, aspect] x [-1, 1]`.
pub fn projection(size: Size) -> Mat4 {
    let aspect = size.aspect();
    Mat4::orthographic_rh(-aspect, aspect, -1.0, 1.0, -DEPTH_RANGE, DEPTH_RANGE)
}

/// Uniform model scale for a base scale and a caller multiplier.
///
/// `1 / (base * (1 / multiplier))`: a multiplier of 1 yields `1 / base` and
/// larger multipliers grow the model proportionally.
pub fn effective_scale(base: f32, multiplier: f32) -> f32 {
    1.0 / (base * (1.0 / multiplier))
}

/// Model-view matrix: translate, scale (negated on Y when `flip`), then the
/// isometric tilt and yaw for 3D models.
pub fn model_view(translation: Vec3, scale: f32, flip: bool, is_3d: bool) -> Mat4 {
    let y = if flip { -scale } else { scale };
    let mut m = Mat4::from_translation(translation) * Mat4::from_scale(Vec3::new(scale, y, scale));
    if is_3d {
        m = m
            * Mat4::from_rotation_x(TILT_DEG.to_radians())
            * Mat4::from_rotation_y(YAW_DEG.to_radians());
    }
    m
}

/// Affine texture matrix of one glint layer at wall-clock `time_ms`.
///
/// The scroll offset is `(time % period) / period`, so the matrix repeats
/// every period.
pub fn glint_texture_matrix(time_ms: f64, pass: &GlintPass) -> Mat3 {
    let offset = ((time_ms % pass.period_ms) / pass.period_ms) as f32;
    Mat3::from_scale(Vec2::splat(GLINT_TEXTURE_SCALE))
        * Mat3::from_translation(Vec2::new(offset * pass.direction, 0.0))
        * Mat3::from_angle(pass.angle_deg.to_radians())
}

/// Packs a `Mat3` into WGSL `mat3x3` layout (16-byte column stride).
pub(crate) fn pack_mat3(m: Mat3) -> [[f32; 4]; 3] {
    let [a, b, c] = m.to_cols_array_2d();
    [
        [a[0], a[1], a[2], 0.0],
        [b[0], b[1], b[2], 0.0],
        [c[0], c[1], c[2], 0.0],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── scale ─────────────────────────────────────────────────────────────

    #[test]
    fn unit_multiplier_reproduces_base() {
        assert_eq!(effective_scale(1.6, 1.0), 1.0 / 1.6);
    }

    #[test]
    fn larger_multiplier_grows_model() {
        let base = 0.9;
        assert!(effective_scale(base, 2.0) > effective_scale(base, 1.0));
        assert!((effective_scale(base, 2.0) - 2.0 / base).abs() < 1e-6);
    }

    #[test]
    fn flip_negates_y_only() {
        let m = model_view(Vec3::ZERO, 0.5, true, false);
        assert_eq!(m.x_axis.x, 0.5);
        assert_eq!(m.y_axis.y, -0.5);
        assert_eq!(m.z_axis.z, 0.5);
    }

    #[test]
    fn translation_survives_rotation() {
        let m = model_view(Vec3::new(0.25, -0.5, 0.0), 1.0, false, true);
        assert_eq!(m.w_axis.truncate(), Vec3::new(0.25, -0.5, 0.0));
    }

    #[test]
    fn isometric_view_shows_top_left_and_right_faces() {
        let m = model_view(Vec3::ZERO, 1.0, false, true);
        // Face normals pointing towards the viewer have positive Z.
        assert!(m.transform_vector3(Vec3::Y).z > 0.0);
        assert!(m.transform_vector3(Vec3::NEG_X).z > 0.0);
        assert!(m.transform_vector3(Vec3::Z).z > 0.0);
        assert!(m.transform_vector3(Vec3::NEG_X).x < 0.0);
        assert!(m.transform_vector3(Vec3::Z).x > 0.0);
    }

    #[test]
    fn projection_follows_aspect() {
        let p = projection(Size::new(200, 100));
        let edge = p.project_point3(Vec3::new(2.0, 1.0, 0.0));
        assert!((edge.x - 1.0).abs() < 1e-6);
        assert!((edge.y - 1.0).abs() < 1e-6);
    }

    // ── glint ─────────────────────────────────────────────────────────────

    #[test]
    fn glint_is_deterministic() {
        for pass in &GLINT_PASSES {
            assert_eq!(
                glint_texture_matrix(1_700_000_000_123.0, pass),
                glint_texture_matrix(1_700_000_000_123.0, pass)
            );
        }
    }

    #[test]
    fn glint_repeats_every_period() {
        let [first, second] = GLINT_PASSES;
        let t = 1_700_000_000_500.0;
        assert_eq!(
            glint_texture_matrix(t, &first),
            glint_texture_matrix(t + 3000.0, &first)
        );
        assert_eq!(
            glint_texture_matrix(t, &second),
            glint_texture_matrix(t + 4873.0, &second)
        );
    }

    #[test]
    fn glint_layers_differ() {
        let [first, second] = GLINT_PASSES;
        assert_ne!(
            glint_texture_matrix(1000.0, &first),
            glint_texture_matrix(1000.0, &second)
        );
    }

    #[test]
    fn glint_offset_scrolls_with_time() {
        let [first, _] = GLINT_PASSES;
        let start = glint_texture_matrix(0.0, &first);
        let half = glint_texture_matrix(1500.0, &first);
        // Translation column moves by half a period times the texture scale.
        let dx = half.z_axis.x - start.z_axis.x;
        assert!((dx - 0.5 * GLINT_TEXTURE_SCALE).abs() < 1e-6);
    }

    #[test]
    fn glint_at_period_start_is_pure_rotation_scale() {
        let [first, _] = GLINT_PASSES;
        let m = glint_texture_matrix(0.0, &first);
        assert_eq!(m.z_axis, glam::Vec3::Z);
        let expected = Mat3::from_scale(Vec2::splat(0.5)) * Mat3::from_angle((-50f32).to_radians());
        assert!(m.abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn packed_mat3_pads_columns() {
        let packed = pack_mat3(Mat3::from_translation(Vec2::new(3.0, 4.0)));
        assert_eq!(packed[2], [3.0, 4.0, 1.0, 0.0]);
        assert_eq!(packed[0][3], 0.0);
    }
}
