use std::sync::Arc;

use crate::program::AnimationProgram;
use crate::types::TextureId;

/// Texture-space rectangle of an appearance, in normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvRect {
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

impl UvRect {
    pub const FULL: UvRect = UvRect { u0: 0.0, v0: 0.0, u1: 1.0, v1: 1.0 };
}

impl Default for UvRect {
    fn default() -> Self {
        UvRect::FULL
    }
}

/// A resolved per-frame visual: texture handle, pixel size, UV rectangle and
/// hotspot, as supplied by the image provider. An appearance may carry its
/// own animation program; applying such an appearance re-assigns (and
/// rewinds) the entity's program.
#[derive(Debug, Clone)]
pub struct Appearance {
    pub name: String,
    pub texture: TextureId,
    pub width: f32,
    pub height: f32,
    pub uv: UvRect,
    pub hotspot: (f32, f32),
    pub program: Option<Arc<AnimationProgram>>,
}

impl Appearance {
    pub fn new(name: impl Into<String>, texture: TextureId, width: f32, height: f32) -> Self {
        Self {
            name: name.into(),
            texture,
            width,
            height,
            uv: UvRect::FULL,
            hotspot: (0.0, 0.0),
            program: None,
        }
    }

    pub fn with_uv(mut self, uv: UvRect) -> Self {
        self.uv = uv;
        self
    }

    pub fn with_hotspot(mut self, hx: f32, hy: f32) -> Self {
        self.hotspot = (hx, hy);
        self
    }

    pub fn with_program(mut self, program: Arc<AnimationProgram>) -> Self {
        self.program = Some(program);
        self
    }
}

/// An externally supplied ordered list of appearances for index-based frame
/// selection.
#[derive(Debug, Clone, Default)]
pub struct FrameList {
    frames: Vec<Arc<Appearance>>,
}

impl FrameList {
    pub fn new(frames: Vec<Arc<Appearance>>) -> Self {
        Self { frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Appearance>> {
        self.frames.get(index)
    }
}
