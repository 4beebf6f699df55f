//! Icon shader program.
//!
//! One program per GPU context. The vertex stage applies projection and
//! model-view; the fragment stage samples through an affine texture matrix,
//! drops fully transparent texels and optionally applies baked lighting.

use crate::device::{GpuContext, ProgramId};
use crate::error::RenderError;

const ICON_WGSL: &str = include_str!("shaders/icon.wgsl");

pub const ATTR_POSITION: &str = "a_position";
pub const ATTR_TEX_COORD: &str = "a_tex_coord";
pub const ATTR_LIGHTING: &str = "a_lighting";

/// A built program plus its resolved attribute locations.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProgramInfo {
    pub program: ProgramId,
    pub position: u32,
    pub tex_coord: u32,
    pub lighting: u32,
}

/// Builds the icon program in `ctx` and resolves its attributes.
///
/// Build failures carry the backend's log text.
pub fn setup_program(ctx: &mut dyn GpuContext) -> Result<ProgramInfo, RenderError> {
    let program = ctx.create_program("blockicon icon shader", ICON_WGSL)?;
    let location = |name: &'static str| {
        ctx.attribute_location(program, name)
            .ok_or(RenderError::MissingAttribute(name))
    };

    Ok(ProgramInfo {
        program,
        position: location(ATTR_POSITION)?,
        tex_coord: location(ATTR_TEX_COORD)?,
        lighting: location(ATTR_LIGHTING)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_declares_every_attribute() {
        for name in [ATTR_POSITION, ATTR_TEX_COORD, ATTR_LIGHTING] {
            assert!(ICON_WGSL.contains(name), "{name}");
        }
    }

    #[test]
    fn shader_has_both_entry_points() {
        assert!(ICON_WGSL.contains("fn vs_main"));
        assert!(ICON_WGSL.contains("fn fs_main"));
    }
}
