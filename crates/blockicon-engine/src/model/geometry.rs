use super::kind::ModelKind;

/// CPU-side vertex data for one model kind.
///
/// Attributes are stored in separate streams, one entry per vertex.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Geometry {
    pub positions: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    /// Baked per-vertex brightness as an RGB multiplier.
    pub lighting: Vec<[f32; 3]>,
    pub indices: Vec<u16>,
}

// ── baked lighting ────────────────────────────────────────────────────────

const LIGHT_FULL: f32 = 1.0;
const LIGHT_TOP: f32 = 1.0;
const LIGHT_LEFT: f32 = 0.8;
const LIGHT_RIGHT: f32 = 0.6;
const LIGHT_BOTTOM: f32 = 0.5;

// ── skull layout ──────────────────────────────────────────────────────────

/// Head half-extent: 8 skin pixels span one model unit.
const HEAD: f32 = 0.5;
/// Hat layer half-extent, inflated by half a skin pixel on every side.
const HAT: f32 = 0.5625;
/// Horizontal offset of the hat layer in the skin.
const HAT_U: f32 = 32.0;
const SKIN_WIDTH: f32 = 64.0;

/// Texture rectangle in skin pixels: `(u0, v0, u1, v1)`, top-left origin.
type PixelRect = (f32, f32, f32, f32);

const SKULL_TOP: PixelRect = (8.0, 0.0, 16.0, 8.0);
const SKULL_BOTTOM: PixelRect = (16.0, 0.0, 24.0, 8.0);
const SKULL_RIGHT: PixelRect = (0.0, 8.0, 8.0, 16.0);
const SKULL_FRONT: PixelRect = (8.0, 8.0, 16.0, 16.0);
const SKULL_LEFT: PixelRect = (16.0, 8.0, 24.0, 16.0);
const SKULL_BACK: PixelRect = (24.0, 8.0, 32.0, 16.0);

/// Returns the vertex data for `kind`.
pub fn geometry(kind: ModelKind) -> Geometry {
    let mut b = Builder::default();
    match kind {
        ModelKind::Item => {
            b.quad(
                [[-1.0, 1.0, 0.0], [1.0, 1.0, 0.0], [1.0, -1.0, 0.0], [-1.0, -1.0, 0.0]],
                [0.0, 0.0, 1.0, 1.0],
                LIGHT_FULL,
            );
        }
        ModelKind::Cube => {
            let full = [0.0, 0.0, 1.0, 1.0];
            b.quad(top(1.0), full, LIGHT_TOP);
            b.quad(west(1.0), full, LIGHT_LEFT);
            b.quad(south(1.0), full, LIGHT_RIGHT);
        }
        ModelKind::SkullSkin => skull(&mut b, 64.0),
        ModelKind::SkullCompact => skull(&mut b, 32.0),
    }
    b.finish()
}

/// Nine rectangles: the far hat faces seen from inside, the three visible
/// head faces and the three visible hat faces.
fn skull(b: &mut Builder, skin_height: f32) {
    let uv = |rect: PixelRect, u_offset: f32| {
        [
            (rect.0 + u_offset) / SKIN_WIDTH,
            rect.1 / skin_height,
            (rect.2 + u_offset) / SKIN_WIDTH,
            rect.3 / skin_height,
        ]
    };

    b.quad(north(HAT), uv(SKULL_BACK, HAT_U), LIGHT_LEFT);
    b.quad(east(HAT), uv(SKULL_LEFT, HAT_U), LIGHT_RIGHT);
    b.quad(bottom(HAT), uv(SKULL_BOTTOM, HAT_U), LIGHT_BOTTOM);

    b.quad(top(HEAD), uv(SKULL_TOP, 0.0), LIGHT_TOP);
    b.quad(west(HEAD), uv(SKULL_RIGHT, 0.0), LIGHT_LEFT);
    b.quad(south(HEAD), uv(SKULL_FRONT, 0.0), LIGHT_RIGHT);

    b.quad(top(HAT), uv(SKULL_TOP, HAT_U), LIGHT_TOP);
    b.quad(west(HAT), uv(SKULL_RIGHT, HAT_U), LIGHT_LEFT);
    b.quad(south(HAT), uv(SKULL_FRONT, HAT_U), LIGHT_RIGHT);
}

// ── box faces ─────────────────────────────────────────────────────────────
//
// Corners are ordered top-left, top-right, bottom-right, bottom-left as seen
// from outside the box. After the isometric rotation +Y is on top, -X on the
// left and +Z on the right.

fn top(h: f32) -> [[f32; 3]; 4] {
    [[-h, h, -h], [h, h, -h], [h, h, h], [-h, h, h]]
}

fn bottom(h: f32) -> [[f32; 3]; 4] {
    [[-h, -h, h], [h, -h, h], [h, -h, -h], [-h, -h, -h]]
}

fn west(h: f32) -> [[f32; 3]; 4] {
    [[-h, h, -h], [-h, h, h], [-h, -h, h], [-h, -h, -h]]
}

fn east(h: f32) -> [[f32; 3]; 4] {
    [[h, h, h], [h, h, -h], [h, -h, -h], [h, -h, h]]
}

fn south(h: f32) -> [[f32; 3]; 4] {
    [[-h, h, h], [h, h, h], [h, -h, h], [-h, -h, h]]
}

fn north(h: f32) -> [[f32; 3]; 4] {
    [[h, h, -h], [-h, h, -h], [-h, -h, -h], [h, -h, -h]]
}

#[derive(Default)]
struct Builder {
    geo: Geometry,
}

impl Builder {
    /// Appends a textured quad. `uv` is `[u0, v0, u1, v1]`, mapped so
    /// `(u0, v0)` lands on the top-left corner.
    fn quad(&mut self, corners: [[f32; 3]; 4], uv: [f32; 4], light: f32) {
        let base = self.geo.positions.len() as u16;
        let [u0, v0, u1, v1] = uv;

        self.geo.positions.extend_from_slice(&corners);
        self.geo
            .tex_coords
            .extend_from_slice(&[[u0, v0], [u1, v0], [u1, v1], [u0, v1]]);
        self.geo.lighting.extend_from_slice(&[[light; 3]; 4]);
        self.geo
            .indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    fn finish(self) -> Geometry {
        self.geo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(kind: ModelKind) -> (usize, usize) {
        let g = geometry(kind);
        (g.positions.len(), g.indices.len())
    }

    #[test]
    fn vertex_counts_per_kind() {
        assert_eq!(counts(ModelKind::Item), (4, 6));
        assert_eq!(counts(ModelKind::Cube), (12, 18));
        assert_eq!(counts(ModelKind::SkullSkin), (36, 54));
        assert_eq!(counts(ModelKind::SkullCompact), (36, 54));
    }

    #[test]
    fn streams_have_matching_lengths() {
        for kind in ModelKind::ALL {
            let g = geometry(kind);
            assert_eq!(g.positions.len(), g.tex_coords.len(), "{kind:?}");
            assert_eq!(g.positions.len(), g.lighting.len(), "{kind:?}");
            assert!(g.indices.iter().all(|&i| (i as usize) < g.positions.len()));
        }
    }

    #[test]
    fn item_is_fully_lit() {
        let g = geometry(ModelKind::Item);
        assert!(g.lighting.iter().all(|l| *l == [1.0; 3]));
    }

    #[test]
    fn cube_faces_follow_top_left_right_brightness() {
        let g = geometry(ModelKind::Cube);
        let face = |i: usize| g.lighting[i * 4][0];
        assert!(face(0) > face(1));
        assert!(face(1) > face(2));
    }

    #[test]
    fn skull_uvs_stay_inside_texture() {
        for kind in [ModelKind::SkullSkin, ModelKind::SkullCompact] {
            let g = geometry(kind);
            for [u, v] in g.tex_coords {
                assert!((0.0..=1.0).contains(&u) && (0.0..=1.0).contains(&v), "{kind:?}");
            }
        }
    }

    #[test]
    fn compact_layout_doubles_vertical_coordinates() {
        let skin = geometry(ModelKind::SkullSkin);
        let compact = geometry(ModelKind::SkullCompact);
        for (s, c) in skin.tex_coords.iter().zip(&compact.tex_coords) {
            assert_eq!(s[0], c[0]);
            assert_eq!(s[1] * 2.0, c[1]);
        }
        assert_eq!(skin.positions, compact.positions);
    }

    #[test]
    fn skull_front_maps_face_region() {
        let g = geometry(ModelKind::SkullSkin);
        // Sixth quad is the head's front face.
        let first = 5 * 4;
        assert_eq!(g.tex_coords[first], [8.0 / 64.0, 8.0 / 64.0]);
        assert_eq!(g.tex_coords[first + 2], [16.0 / 64.0, 16.0 / 64.0]);
    }
}
