use mikan_core::TextureId;

use crate::backend::{BufferPairId, GraphicsBackend};
use crate::geometry::PrimitiveKind;
use crate::style::RenderStates;
use crate::vertices::QuadVertex;

#[derive(Debug, Clone, Copy)]
pub struct RingConfig {
    /// Number of rotating vertex/index buffer pairs.
    pub buffers: usize,
    /// Vertex capacity of one buffer. Capped at 65536 so every index fits
    /// in a u16.
    pub vertex_capacity: u32,
    /// Index capacity of one buffer.
    pub index_capacity: u32,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self { buffers: 8, vertex_capacity: 16384, index_capacity: 24576 }
    }
}

/// A maximal contiguous range of sorted sprites sharing style, texture and
/// primitive type, resolved to a subrange of one buffer pair.
#[derive(Debug, Clone, PartialEq)]
pub struct StateRun {
    pub style: u32,
    pub states: RenderStates,
    pub prim: PrimitiveKind,
    pub texture: TextureId,
    pub buffer: BufferPairId,
    pub vertex_start: u32,
    pub vertex_count: u32,
    pub index_start: u32,
    pub index_count: u32,
}

struct Pair {
    id: BufferPairId,
    /// Sequence number of the last flush that submitted this pair for
    /// drawing; 0 means never submitted.
    mark: u64,
}

/// The rotating geometry writer. Exactly one buffer pair is being written
/// at a time; a flush uploads the staged data, draws the accumulated runs
/// and stamps the pair, and rotation moves on to the next pair. A pair that
/// comes around again while the GPU still owns it is an overrun: the ring
/// refuses to write over in-flight data and grows by one pair instead,
/// loudly.
pub struct BufferRing {
    config: RingConfig,
    pairs: Vec<Pair>,
    current: usize,
    sequence: u64,
    vertices: Vec<QuadVertex>,
    indices: Vec<u16>,
    pending: Vec<StateRun>,
    frame_runs: Vec<StateRun>,
    bound_style: Option<u32>,
    bound_texture: Option<TextureId>,
}

impl BufferRing {
    pub fn new(config: RingConfig) -> Self {
        let config = RingConfig {
            buffers: config.buffers.max(2),
            vertex_capacity: config.vertex_capacity.clamp(4, 65536),
            index_capacity: config.index_capacity.max(6),
        };
        Self {
            config,
            pairs: Vec::new(),
            current: 0,
            sequence: 0,
            vertices: Vec::new(),
            indices: Vec::new(),
            pending: Vec::new(),
            frame_runs: Vec::new(),
            bound_style: None,
            bound_texture: None,
        }
    }

    pub fn buffer_count(&self) -> usize {
        self.pairs.len()
    }

    /// Runs drawn by the most recently completed frame, in draw order.
    pub fn runs(&self) -> &[StateRun] {
        &self.frame_runs
    }

    pub fn begin_frame(&mut self, backend: &mut dyn GraphicsBackend) {
        if self.pairs.is_empty() {
            for _ in 0..self.config.buffers {
                let id = self.create_pair(backend);
                self.pairs.push(Pair { id, mark: 0 });
            }
        }
        self.frame_runs.clear();
        self.pending.clear();
        self.vertices.clear();
        self.indices.clear();
        self.bound_style = None;
        self.bound_texture = None;

        let pair = &self.pairs[self.current];
        if pair.mark != 0 && !backend.pair_consumed(pair.id) {
            self.grow_at_current(backend);
        }
    }

    /// Stages one batch of geometry into the current buffer, rotating first
    /// when it does not fit. Indices are relative to `vertices[0]` and are
    /// rebased while staging. Geometry from the same style/texture/primitive
    /// extends the open run instead of starting a new one.
    pub fn push(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        style: u32,
        states: RenderStates,
        prim: PrimitiveKind,
        texture: TextureId,
        vertices: &[QuadVertex],
        indices: &[u16],
    ) {
        if self.pairs.is_empty() {
            self.begin_frame(backend);
        }
        let vcap = self.config.vertex_capacity as usize;
        let icap = self.config.index_capacity as usize;
        if vertices.len() > vcap || indices.len() > icap {
            log::error!(
                "geometry of {} vertices / {} indices can never fit a {}x{} buffer, dropped",
                vertices.len(),
                indices.len(),
                vcap,
                icap
            );
            return;
        }
        if self.vertices.len() + vertices.len() > vcap
            || self.indices.len() + indices.len() > icap
        {
            self.flush(backend);
            self.rotate(backend);
        }

        let base = self.vertices.len() as u16;
        let vertex_start = self.vertices.len() as u32;
        let index_start = self.indices.len() as u32;
        self.vertices.extend_from_slice(vertices);
        self.indices.extend(indices.iter().map(|&i| i + base));

        if let Some(run) = self.pending.last_mut() {
            if run.style == style && run.texture == texture && run.prim == prim {
                run.vertex_count += vertices.len() as u32;
                run.index_count += indices.len() as u32;
                return;
            }
        }
        self.pending.push(StateRun {
            style,
            states,
            prim,
            texture,
            buffer: self.pairs[self.current].id,
            vertex_start,
            vertex_count: vertices.len() as u32,
            index_start,
            index_count: indices.len() as u32,
        });
    }

    /// Final flush of the frame. Always leaves the backend with style state
    /// torn down.
    pub fn end_frame(&mut self, backend: &mut dyn GraphicsBackend) {
        self.flush(backend);
        if self.pairs[self.current].mark != 0 {
            self.rotate(backend);
        }
        backend.reset_states();
        self.bound_style = None;
        self.bound_texture = None;
    }

    /// Uploads the staged data and draws the accumulated runs, binding
    /// style state and texture only when they change run-to-run.
    fn flush(&mut self, backend: &mut dyn GraphicsBackend) {
        if self.pending.is_empty() {
            return;
        }
        let pair = self.pairs[self.current].id;
        backend.upload(pair, &self.vertices, &self.indices);
        for i in 0..self.pending.len() {
            let run = self.pending[i].clone();
            if self.bound_style != Some(run.style) {
                backend.set_states(&run.states);
                self.bound_style = Some(run.style);
            }
            if self.bound_texture != Some(run.texture) {
                backend.bind_texture(run.texture);
                self.bound_texture = Some(run.texture);
            }
            backend.draw_indexed(pair, run.prim, run.index_start..run.index_start + run.index_count);
            self.frame_runs.push(run);
        }
        self.pending.clear();
        self.sequence += 1;
        self.pairs[self.current].mark = self.sequence;
    }

    fn rotate(&mut self, backend: &mut dyn GraphicsBackend) {
        self.vertices.clear();
        self.indices.clear();
        self.current = (self.current + 1) % self.pairs.len();
        let pair = &self.pairs[self.current];
        if pair.mark != 0 && !backend.pair_consumed(pair.id) {
            self.grow_at_current(backend);
        }
    }

    /// Overrun path: the writer caught up with a buffer the GPU still owns.
    /// Never write over it; insert a fresh pair in its place and report the
    /// condition, since hitting it at all means the ring is too small for
    /// the frame load.
    fn grow_at_current(&mut self, backend: &mut dyn GraphicsBackend) {
        log::error!(
            "buffer ring overrun: pair {:?} still in flight, growing ring to {} pairs",
            self.pairs[self.current].id,
            self.pairs.len() + 1
        );
        let id = self.create_pair(backend);
        self.pairs.insert(self.current, Pair { id, mark: 0 });
    }

    fn create_pair(&mut self, backend: &mut dyn GraphicsBackend) -> BufferPairId {
        backend.create_buffer_pair(
            self.config.vertex_capacity as u64 * std::mem::size_of::<QuadVertex>() as u64,
            self.config.index_capacity as u64 * 2,
        )
    }
}
