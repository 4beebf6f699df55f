//! Per-frame drawing of one prepared model.

mod frame;
mod matrix;

pub use frame::{draw_frame, FrameParams};
pub use matrix::{
    effective_scale, glint_texture_matrix, model_view, projection, GlintPass, GLINT_PASSES,
    GLINT_TEXTURE_SCALE,
};
