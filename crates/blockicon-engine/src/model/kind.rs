/// The fixed set of icon geometries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// Flat item sprite facing the viewer.
    Item,
    /// Block with its top, left and right faces visible.
    Cube,
    /// Skull bust textured from a 64x64 player skin.
    SkullSkin,
    /// Skull bust textured from a 64x32 skull texture.
    SkullCompact,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Item,
        ModelKind::Cube,
        ModelKind::SkullSkin,
        ModelKind::SkullCompact,
    ];

    /// Orthographic half-extent that frames the model.
    ///
    /// The padded variant leaves the margin a host game keeps around blocks in
    /// inventory slots. Items fill the slot either way.
    pub fn base_scale(self, padded: bool) -> f32 {
        match (self, padded) {
            (ModelKind::Item, _) => 1.0,
            (ModelKind::Cube, false) => 1.6,
            (ModelKind::Cube, true) => 1.6 * 16.0 / 10.0,
            (ModelKind::SkullSkin | ModelKind::SkullCompact, false) => 0.9,
            (ModelKind::SkullSkin | ModelKind::SkullCompact, true) => 0.9 * 16.0 / 10.0,
        }
    }

    /// Whether the isometric block rotation applies.
    pub fn is_3d(self) -> bool {
        !matches!(self, ModelKind::Item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_only_changes_3d_kinds() {
        for kind in ModelKind::ALL {
            let differs = kind.base_scale(true) != kind.base_scale(false);
            assert_eq!(differs, kind != ModelKind::Item, "{kind:?}");
        }
    }

    #[test]
    fn item_scale_is_unit() {
        assert_eq!(ModelKind::Item.base_scale(false), 1.0);
        assert_eq!(ModelKind::Item.base_scale(true), 1.0);
    }

    #[test]
    fn padded_scale_is_larger() {
        for kind in [ModelKind::Cube, ModelKind::SkullSkin, ModelKind::SkullCompact] {
            assert!(kind.base_scale(true) > kind.base_scale(false));
        }
    }
}
