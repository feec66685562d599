use bytemuck::{Pod, Zeroable};

/// GPU-visible sprite vertex: position, texture coordinate and a packed
/// little-endian RGBA color. Matches the `Unorm8x4` color attribute of the
/// sprite pipeline.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub texcoord: [f32; 2],
    pub color: u32,
}

/// Index pattern of one quad, two CCW triangles over corners BL, BR, TR, TL.
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];
