pub mod sprite;

pub use sprite::SpritePipeline;

use crate::geometry::PrimitiveKind;
use crate::style::{Blend, RenderStates};

pub struct BindGroupLayouts {
    pub texture: wgpu::BindGroupLayout,
}

impl BindGroupLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let texture = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mikan_render.texture_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        Self { texture }
    }
}

pub struct TextureBindGroup(wgpu::BindGroup);

impl TextureBindGroup {
    pub fn new(
        device: &wgpu::Device,
        layouts: &BindGroupLayouts,
        view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
        label: Option<&str>,
    ) -> Self {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label,
            layout: &layouts.texture,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });
        Self(bind_group)
    }

    pub fn raw(&self) -> &wgpu::BindGroup {
        &self.0
    }
}

/// One pipeline per blend mode and primitive topology; selection happens per
/// state run.
pub struct Pipelines {
    pub alpha: SpritePipeline,
    pub premultiplied: SpritePipeline,
    pub additive: SpritePipeline,
    pub alpha_lines: SpritePipeline,
    pub premultiplied_lines: SpritePipeline,
    pub additive_lines: SpritePipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        layouts: &BindGroupLayouts,
        target_format: wgpu::TextureFormat,
    ) -> Self {
        let triangles = wgpu::PrimitiveTopology::TriangleList;
        let lines = wgpu::PrimitiveTopology::LineList;
        Self {
            alpha: SpritePipeline::new(device, layouts, target_format, blend_state(Blend::Alpha), triangles),
            premultiplied: SpritePipeline::new(device, layouts, target_format, blend_state(Blend::Premultiplied), triangles),
            additive: SpritePipeline::new(device, layouts, target_format, blend_state(Blend::Additive), triangles),
            alpha_lines: SpritePipeline::new(device, layouts, target_format, blend_state(Blend::Alpha), lines),
            premultiplied_lines: SpritePipeline::new(device, layouts, target_format, blend_state(Blend::Premultiplied), lines),
            additive_lines: SpritePipeline::new(device, layouts, target_format, blend_state(Blend::Additive), lines),
        }
    }

    pub fn select(&self, states: &RenderStates, prim: PrimitiveKind) -> &SpritePipeline {
        match (states.blend, prim) {
            (Blend::Alpha, PrimitiveKind::Triangles) => &self.alpha,
            (Blend::Premultiplied, PrimitiveKind::Triangles) => &self.premultiplied,
            (Blend::Additive, PrimitiveKind::Triangles) => &self.additive,
            (Blend::Alpha, PrimitiveKind::Lines) => &self.alpha_lines,
            (Blend::Premultiplied, PrimitiveKind::Lines) => &self.premultiplied_lines,
            (Blend::Additive, PrimitiveKind::Lines) => &self.additive_lines,
        }
    }
}

fn blend_state(blend: Blend) -> wgpu::BlendState {
    match blend {
        Blend::Alpha => wgpu::BlendState::ALPHA_BLENDING,
        Blend::Premultiplied => wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
        Blend::Additive => wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        },
    }
}
