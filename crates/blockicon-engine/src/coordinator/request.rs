use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::device::{ContextId, TextureId};
use crate::draw::FrameParams;
use crate::error::RenderError;
use crate::model::ModelKind;
use crate::texture::TextureSource;

/// One model instance to draw: kind, texture, flags and placement.
///
/// Requests are owned by the caller (through a renderer's model list) and
/// carry their own preparation state. Changing the kind, texture or glint
/// flag discards that state; placement changes take effect next frame
/// without re-preparing.
///
/// A clone is a separate request with its own identity. It starts
/// unprepared and gets its own GPU resources.
pub struct RenderRequest {
    id: RequestId,
    kind: ModelKind,
    texture: TextureSource,
    enchanted: bool,
    in_inventory: bool,
    translation: [f32; 3],
    scale: f32,
    generation: u64,
    state: Preparation,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct RequestId(u64);

impl RequestId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Preparation {
    Unprepared,
    Prepared(Prepared),
    Failed(RenderError),
}

/// GPU resources resolved for a request on one context.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct Prepared {
    pub context: ContextId,
    pub kind: ModelKind,
    pub texture: TextureId,
    pub glint: Option<TextureId>,
}

/// Snapshot of what a preparation needs, taken before suspending.
#[derive(Debug, Clone)]
pub(crate) struct PrepareJob {
    pub request: RequestId,
    pub generation: u64,
    pub kind: ModelKind,
    pub texture: TextureSource,
    pub enchanted: bool,
}

/// What a render list does with a request this frame.
#[derive(Debug)]
pub(crate) enum Step {
    Draw(Prepared),
    Prepare(PrepareJob),
    Skip,
}

impl RenderRequest {
    pub fn new(kind: ModelKind, texture: impl Into<TextureSource>) -> Self {
        Self {
            id: RequestId::next(),
            kind,
            texture: texture.into(),
            enchanted: false,
            in_inventory: false,
            translation: [0.0; 3],
            scale: 1.0,
            generation: 0,
            state: Preparation::Unprepared,
        }
    }

    pub fn with_enchanted(mut self, enchanted: bool) -> Self {
        self.enchanted = enchanted;
        self
    }

    pub fn with_in_inventory(mut self, in_inventory: bool) -> Self {
        self.in_inventory = in_inventory;
        self
    }

    pub fn with_translation(mut self, translation: [f32; 3]) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn texture(&self) -> &TextureSource {
        &self.texture
    }

    pub fn enchanted(&self) -> bool {
        self.enchanted
    }

    pub fn in_inventory(&self) -> bool {
        self.in_inventory
    }

    pub fn translation(&self) -> [f32; 3] {
        self.translation
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn set_kind(&mut self, kind: ModelKind) {
        self.kind = kind;
        self.invalidate();
    }

    pub fn set_texture(&mut self, texture: impl Into<TextureSource>) {
        self.texture = texture.into();
        self.invalidate();
    }

    pub fn set_enchanted(&mut self, enchanted: bool) {
        if self.enchanted != enchanted {
            self.enchanted = enchanted;
            self.invalidate();
        }
    }

    pub fn set_in_inventory(&mut self, in_inventory: bool) {
        self.in_inventory = in_inventory;
    }

    pub fn set_translation(&mut self, translation: [f32; 3]) {
        self.translation = translation;
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    /// Whether the request has GPU resources on some context.
    pub fn is_prepared(&self) -> bool {
        matches!(self.state, Preparation::Prepared(_))
    }

    /// The error that made the last preparation fail, if any.
    ///
    /// Failed requests are skipped every frame until [`retry`](Self::retry).
    pub fn error(&self) -> Option<&RenderError> {
        match &self.state {
            Preparation::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Re-arms a failed request so the next frame prepares it again.
    pub fn retry(&mut self) {
        if matches!(self.state, Preparation::Failed(_)) {
            self.invalidate();
        }
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.state = Preparation::Unprepared;
    }

    pub(crate) fn step(&self, context: ContextId) -> Step {
        match &self.state {
            Preparation::Prepared(p) if p.context == context => Step::Draw(*p),
            Preparation::Failed(_) => Step::Skip,
            _ => Step::Prepare(PrepareJob {
                request: self.id,
                generation: self.generation,
                kind: self.kind,
                texture: self.texture.clone(),
                enchanted: self.enchanted,
            }),
        }
    }

    /// Stores the outcome of `job`. Returns the prepared resources when the
    /// outcome still applies, `None` when the request changed meanwhile.
    pub(crate) fn finish(
        &mut self,
        job: &PrepareJob,
        outcome: Result<Prepared, RenderError>,
    ) -> Option<Prepared> {
        if job.request != self.id || job.generation != self.generation {
            log::debug!("discarding stale preparation of {:?}", job.kind);
            return None;
        }
        match outcome {
            Ok(prepared) => {
                self.state = Preparation::Prepared(prepared);
                Some(prepared)
            }
            Err(err) => {
                log::warn!("skipping {:?} request: {err}", self.kind);
                self.state = Preparation::Failed(err);
                None
            }
        }
    }

    pub(crate) fn frame_params(&self, flip: bool, time_ms: f64) -> FrameParams {
        FrameParams {
            add_padding: self.in_inventory,
            translation: self.translation,
            scale_multiplier: self.scale,
            flip,
            time_ms,
        }
    }

    pub(crate) fn prepared(&self) -> Option<Prepared> {
        match self.state {
            Preparation::Prepared(p) => Some(p),
            _ => None,
        }
    }
}

impl Clone for RenderRequest {
    fn clone(&self) -> Self {
        Self {
            id: RequestId::next(),
            kind: self.kind,
            texture: self.texture.clone(),
            enchanted: self.enchanted,
            in_inventory: self.in_inventory,
            translation: self.translation,
            scale: self.scale,
            generation: 0,
            state: Preparation::Unprepared,
        }
    }
}

impl fmt::Debug for RenderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderRequest")
            .field("kind", &self.kind)
            .field("texture", &self.texture)
            .field("enchanted", &self.enchanted)
            .field("in_inventory", &self.in_inventory)
            .field("translation", &self.translation)
            .field("scale", &self.scale)
            .field("state", &self.state)
            .finish()
    }
}

impl From<RenderRequest> for Vec<RenderRequest> {
    fn from(request: RenderRequest) -> Self {
        vec![request]
    }
}
