pub mod backend;
pub mod batch;
pub mod geometry;
pub mod pipelines;
pub mod quad;
pub mod ring;
pub mod style;
pub mod vertices;
pub mod wgpu_backend;

pub use backend::{BackendCall, BufferPairId, GraphicsBackend, RecordingBackend};
pub use batch::{BatchConfig, RenderBatch, SpriteVisual};
pub use geometry::{GeometrySink, PrimitiveKind};
pub use quad::pack_sprite_quad;
pub use ring::{BufferRing, RingConfig, StateRun};
pub use style::{Blend, GeometryStyle, QuadStyle, RenderStates, Style};
pub use vertices::{QuadVertex, QUAD_INDICES};
pub use wgpu_backend::WgpuBackend;
