use std::collections::{HashMap, HashSet};
use std::ops::Range;

use mikan_core::TextureId;

use crate::geometry::PrimitiveKind;
use crate::style::RenderStates;
use crate::vertices::QuadVertex;

/// Handle to one vertex/index buffer pair owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferPairId(pub u32);

/// The minimal capability set the packer needs from a graphics backend:
/// buffer upload, state toggles, texture binds, indexed draws, and a
/// consumption query for overrun detection. Everything else about the
/// backend is its own business.
pub trait GraphicsBackend {
    fn create_buffer_pair(&mut self, vertex_bytes: u64, index_bytes: u64) -> BufferPairId;

    /// Replaces the contents of a pair. This is the unmap step: the packer
    /// stages writes CPU-side and hands the whole range over at flush time.
    fn upload(&mut self, pair: BufferPairId, vertices: &[QuadVertex], indices: &[u16]);

    fn set_states(&mut self, states: &RenderStates);

    fn reset_states(&mut self);

    fn bind_texture(&mut self, texture: TextureId);

    fn draw_indexed(&mut self, pair: BufferPairId, prim: PrimitiveKind, indices: Range<u32>);

    /// Whether the GPU is done reading the pair's last submitted contents.
    /// Writing a pair for which this still returns false would corrupt
    /// in-flight data.
    fn pair_consumed(&self, pair: BufferPairId) -> bool {
        let _ = pair;
        true
    }
}

/// Everything the packer asked a backend to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CreateBufferPair(BufferPairId),
    Upload { pair: BufferPairId, vertices: usize, indices: usize },
    SetStates(RenderStates),
    ResetStates,
    BindTexture(TextureId),
    DrawIndexed { pair: BufferPairId, prim: PrimitiveKind, indices: Range<u32> },
}

/// Backend double that records calls and keeps the uploaded data around.
/// Used by the renderer tests; also handy as a dry-run backend.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub calls: Vec<BackendCall>,
    pub buffers: HashMap<BufferPairId, (Vec<QuadVertex>, Vec<u16>)>,
    /// Pairs reported as still in flight by `pair_consumed`.
    pub in_flight: HashSet<BufferPairId>,
    next_pair: u32,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total indices covered by draw calls, across all pairs.
    pub fn drawn_index_count(&self) -> usize {
        self.calls
            .iter()
            .map(|call| match call {
                BackendCall::DrawIndexed { indices, .. } => indices.len(),
                _ => 0,
            })
            .sum()
    }
}

impl GraphicsBackend for RecordingBackend {
    fn create_buffer_pair(&mut self, _vertex_bytes: u64, _index_bytes: u64) -> BufferPairId {
        let pair = BufferPairId(self.next_pair);
        self.next_pair += 1;
        self.buffers.insert(pair, (Vec::new(), Vec::new()));
        self.calls.push(BackendCall::CreateBufferPair(pair));
        pair
    }

    fn upload(&mut self, pair: BufferPairId, vertices: &[QuadVertex], indices: &[u16]) {
        self.calls.push(BackendCall::Upload {
            pair,
            vertices: vertices.len(),
            indices: indices.len(),
        });
        self.buffers.insert(pair, (vertices.to_vec(), indices.to_vec()));
    }

    fn set_states(&mut self, states: &RenderStates) {
        self.calls.push(BackendCall::SetStates(*states));
    }

    fn reset_states(&mut self) {
        self.calls.push(BackendCall::ResetStates);
    }

    fn bind_texture(&mut self, texture: TextureId) {
        self.calls.push(BackendCall::BindTexture(texture));
    }

    fn draw_indexed(&mut self, pair: BufferPairId, prim: PrimitiveKind, indices: Range<u32>) {
        self.calls.push(BackendCall::DrawIndexed { pair, prim, indices });
    }

    fn pair_consumed(&self, pair: BufferPairId) -> bool {
        !self.in_flight.contains(&pair)
    }
}
