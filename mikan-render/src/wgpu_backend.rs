//! Reference `GraphicsBackend` over wgpu. Draw calls are recorded during
//! `post_render` and replayed into a render pass once the caller has one
//! open; buffer writes go through the queue immediately.
//!
//! Requires `wgpu::Features::PUSH_CONSTANTS` on the device (the sprite
//! transform is a vertex-stage push constant).

use std::collections::HashMap;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use glam::Mat4;

use mikan_core::TextureId;

use crate::backend::{BufferPairId, GraphicsBackend};
use crate::geometry::PrimitiveKind;
use crate::pipelines::{BindGroupLayouts, Pipelines, TextureBindGroup};
use crate::style::RenderStates;
use crate::vertices::QuadVertex;

struct GpuPair {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    /// Frame serial of the last write; consumed once the matching
    /// submission completes.
    fence: u64,
}

enum Recorded {
    States(RenderStates),
    Texture(TextureId),
    Draw { pair: u32, prim: PrimitiveKind, indices: Range<u32> },
}

pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    layouts: BindGroupLayouts,
    pipelines: Pipelines,
    linear_sampler: wgpu::Sampler,
    nearest_sampler: wgpu::Sampler,
    pairs: Vec<GpuPair>,
    // one bind group per filter mode, selected by the bound render states
    textures: HashMap<TextureId, (TextureBindGroup, TextureBindGroup)>,
    recorded: Vec<Recorded>,
    frame_serial: u64,
    consumed: Arc<AtomicU64>,
}

impl WgpuBackend {
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        target_format: wgpu::TextureFormat,
    ) -> Self {
        let layouts = BindGroupLayouts::new(&device);
        let pipelines = Pipelines::new(&device, &layouts, target_format);
        let linear_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("mikan_render.linear_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let nearest_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("mikan_render.nearest_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        Self {
            device,
            queue,
            layouts,
            pipelines,
            linear_sampler,
            nearest_sampler,
            pairs: Vec::new(),
            textures: HashMap::new(),
            recorded: Vec::new(),
            frame_serial: 0,
            consumed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Makes a texture view drawable under the given id. The id is what
    /// appearances carry and what runs bind.
    pub fn register_texture(&mut self, id: TextureId, view: &wgpu::TextureView) {
        let linear = TextureBindGroup::new(
            &self.device,
            &self.layouts,
            view,
            &self.linear_sampler,
            Some("mikan_render.texture_linear"),
        );
        let nearest = TextureBindGroup::new(
            &self.device,
            &self.layouts,
            view,
            &self.nearest_sampler,
            Some("mikan_render.texture_nearest"),
        );
        self.textures.insert(id, (linear, nearest));
    }

    pub fn unregister_texture(&mut self, id: TextureId) {
        self.textures.remove(&id);
    }

    /// Replays the recorded frame into an open render pass.
    pub fn render<'a>(&'a mut self, pass: &mut wgpu::RenderPass<'a>, transform: Mat4) {
        let recorded = std::mem::take(&mut self.recorded);
        let mut states = RenderStates::default();
        let mut texture: Option<TextureId> = None;
        let mut bound_pair: Option<u32> = None;

        for command in &recorded {
            match command {
                Recorded::States(next) => {
                    states = *next;
                    bound_pair = None;
                }
                Recorded::Texture(id) => texture = Some(*id),
                Recorded::Draw { pair, prim, indices } => {
                    let Some(gpu) = self.pairs.get(*pair as usize) else { continue };
                    let Some(id) = texture else { continue };
                    let Some((linear, nearest)) = self.textures.get(&id) else {
                        log::error!("draw against unregistered texture {:?}", id);
                        continue;
                    };
                    let bind_group = if states.filter { linear } else { nearest };
                    self.pipelines.select(&states, *prim).bind(pass, transform);
                    pass.set_bind_group(0, bind_group.raw(), &[]);
                    if bound_pair != Some(*pair) {
                        pass.set_vertex_buffer(0, gpu.vertex.slice(..));
                        pass.set_index_buffer(gpu.index.slice(..), wgpu::IndexFormat::Uint16);
                        bound_pair = Some(*pair);
                    }
                    pass.draw_indexed(indices.clone(), 0, 0..1);
                }
            }
        }
    }

    /// Call once per frame, after submitting the command encoder that ran
    /// `render`. Completion of that submission marks every buffer written
    /// this frame as consumed.
    pub fn frame_submitted(&mut self) {
        self.frame_serial += 1;
        let serial = self.frame_serial;
        for pair in &mut self.pairs {
            if pair.fence == u64::MAX {
                pair.fence = serial;
            }
        }
        let consumed = self.consumed.clone();
        self.queue.on_submitted_work_done(move || {
            consumed.fetch_max(serial, Ordering::AcqRel);
        });
    }
}

impl GraphicsBackend for WgpuBackend {
    fn create_buffer_pair(&mut self, vertex_bytes: u64, index_bytes: u64) -> BufferPairId {
        let vertex = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mikan_render.ring_vertex_buffer"),
            size: vertex_bytes.max(4),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let index = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mikan_render.ring_index_buffer"),
            size: index_bytes.max(4),
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let id = BufferPairId(self.pairs.len() as u32);
        self.pairs.push(GpuPair { vertex, index, fence: 0 });
        id
    }

    fn upload(&mut self, pair: BufferPairId, vertices: &[QuadVertex], indices: &[u16]) {
        let Some(gpu) = self.pairs.get_mut(pair.0 as usize) else { return };
        self.queue.write_buffer(&gpu.vertex, 0, bytemuck::cast_slice(vertices));
        self.queue.write_buffer(&gpu.index, 0, bytemuck::cast_slice(indices));
        // stamped with the real serial once the frame is submitted
        gpu.fence = u64::MAX;
    }

    fn set_states(&mut self, states: &RenderStates) {
        self.recorded.push(Recorded::States(*states));
    }

    fn reset_states(&mut self) {
        // the replay rebinds the pipeline on the next frame's first draw;
        // nothing to tear down between passes
    }

    fn bind_texture(&mut self, texture: TextureId) {
        self.recorded.push(Recorded::Texture(texture));
    }

    fn draw_indexed(&mut self, pair: BufferPairId, prim: PrimitiveKind, indices: Range<u32>) {
        self.recorded.push(Recorded::Draw { pair: pair.0, prim, indices });
    }

    fn pair_consumed(&self, pair: BufferPairId) -> bool {
        let Some(gpu) = self.pairs.get(pair.0 as usize) else { return true };
        if gpu.fence == 0 {
            return true;
        }
        if gpu.fence == u64::MAX {
            // written this frame but not yet submitted
            return false;
        }
        let _ = self.device.poll(wgpu::Maintain::Poll);
        self.consumed.load(Ordering::Acquire) >= gpu.fence
    }
}
