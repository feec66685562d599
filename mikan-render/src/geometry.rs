use mikan_core::{AlphaCombine, Color, TextureId};

use crate::vertices::QuadVertex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimitiveKind {
    #[default]
    Triangles,
    Lines,
}

/// Immediate-mode emission target handed to geometry styles. Vertices and
/// indices accumulate here per sprite and are then streamed into the
/// current ring buffer; contiguous same-primitive geometry from the same
/// style ends up in one run.
#[derive(Debug, Default)]
pub struct GeometrySink {
    texture: TextureId,
    prim: PrimitiveKind,
    alpha: AlphaCombine,
    vertices: Vec<QuadVertex>,
    indices: Vec<u16>,
}

impl GeometrySink {
    pub(crate) fn reset(&mut self, alpha: AlphaCombine) {
        self.texture = TextureId(0);
        self.prim = PrimitiveKind::Triangles;
        self.alpha = alpha;
        self.vertices.clear();
        self.indices.clear();
    }

    pub fn set_texture(&mut self, texture: TextureId) {
        self.texture = texture;
    }

    pub fn set_primitive(&mut self, prim: PrimitiveKind) {
        self.prim = prim;
    }

    /// Emits one vertex and returns its index for use in `index` calls.
    pub fn vertex(&mut self, x: f32, y: f32, u: f32, v: f32, color: Color) -> u16 {
        let index = self.vertices.len() as u16;
        self.vertices.push(QuadVertex {
            position: [x, y],
            texcoord: [u, v],
            color: color.pack(self.alpha),
        });
        index
    }

    pub fn index(&mut self, index: u16) {
        self.indices.push(index);
    }

    pub fn triangle(&mut self, a: u16, b: u16, c: u16) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    pub fn line(&mut self, a: u16, b: u16) {
        self.indices.extend_from_slice(&[a, b]);
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub(crate) fn texture(&self) -> TextureId {
        self.texture
    }

    pub(crate) fn primitive(&self) -> PrimitiveKind {
        self.prim
    }

    pub(crate) fn vertices(&self) -> &[QuadVertex] {
        &self.vertices
    }

    pub(crate) fn indices(&self) -> &[u16] {
        &self.indices
    }
}
