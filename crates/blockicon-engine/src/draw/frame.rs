use glam::{Mat3, Vec3};

use crate::device::{
    AttributeFormat, BlendMode, DepthState, DrawCall, DrawUniforms, GpuContext, TextureId,
    VertexBinding,
};
use crate::model::Model;
use crate::program::ProgramInfo;

use super::matrix::{
    effective_scale, glint_texture_matrix, model_view, pack_mat3, projection, GLINT_PASSES,
};

/// Placement and timing of one model draw.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameParams {
    /// Use the model's inventory-slot scale.
    pub add_padding: bool,
    pub translation: [f32; 3],
    pub scale_multiplier: f32,
    /// Mirror vertically, for readback into a top-down pixel surface.
    pub flip: bool,
    /// Wall-clock milliseconds driving the glint animation.
    pub time_ms: f64,
}

impl Default for FrameParams {
    fn default() -> Self {
        Self {
            add_padding: false,
            translation: [0.0; 3],
            scale_multiplier: 1.0,
            flip: false,
            time_ms: 0.0,
        }
    }
}

/// Draws `model` with `texture` into the current frame of `ctx`.
///
/// The opaque pass is lit. With a glint texture, two additive unlit passes
/// follow that only touch pixels already covered by the model, after which
/// depth and blend state are back to the opaque defaults.
pub fn draw_frame(
    ctx: &mut dyn GpuContext,
    program: &ProgramInfo,
    model: &Model,
    texture: TextureId,
    glint: Option<TextureId>,
    params: &FrameParams,
) {
    let scale = effective_scale(model.base_scale(params.add_padding), params.scale_multiplier);
    let mut uniforms = DrawUniforms {
        projection: projection(ctx.size()).to_cols_array_2d(),
        model_view: model_view(
            Vec3::from_array(params.translation),
            scale,
            params.flip,
            model.is_3d,
        )
        .to_cols_array_2d(),
        texture_matrix: pack_mat3(Mat3::IDENTITY),
        lighting_active: 1,
        _pad: [0; 3],
    };

    let attributes = [
        VertexBinding {
            location: program.position,
            buffer: model.positions,
            format: AttributeFormat::Float3,
        },
        VertexBinding {
            location: program.tex_coord,
            buffer: model.tex_coords,
            format: AttributeFormat::Float2,
        },
        VertexBinding {
            location: program.lighting,
            buffer: model.lighting,
            format: AttributeFormat::Float3,
        },
    ];
    let mut call = DrawCall {
        program: program.program,
        attributes: &attributes,
        indices: model.indices,
        index_count: model.index_count,
        texture,
        uniforms,
    };
    ctx.draw(&call);

    let Some(glint) = glint else {
        return;
    };

    ctx.set_depth(DepthState::OVERLAY);
    ctx.set_blend(BlendMode::Additive);
    uniforms.lighting_active = 0;
    call.texture = glint;
    for pass in &GLINT_PASSES {
        uniforms.texture_matrix = pack_mat3(glint_texture_matrix(params.time_ms, pass));
        call.uniforms = uniforms;
        ctx.draw(&call);
    }
    ctx.set_depth(DepthState::OPAQUE);
    ctx.set_blend(BlendMode::Alpha);
}
