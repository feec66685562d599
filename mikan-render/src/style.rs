use std::fmt;
use std::sync::Arc;

use mikan_core::AlphaCombine;

use crate::batch::SpriteVisual;
use crate::geometry::GeometrySink;

/// Fixed-function blend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Blend {
    /// Straight source-alpha blending.
    #[default]
    Alpha,
    /// Premultiplied-alpha blending. With a `ZeroColor` packed color this
    /// renders additively.
    Premultiplied,
    /// Pure additive blending.
    Additive,
}

/// The small fixed-function state set a style toggles on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderStates {
    pub blend: Blend,
    pub filter: bool,
}

impl Default for RenderStates {
    fn default() -> Self {
        Self { blend: Blend::Alpha, filter: true }
    }
}

/// A style that renders the standard textured quad. The packer writes its
/// vertices; the style only contributes state and the alpha policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadStyle {
    /// Sort tie-break and run-coalescing key. Quad styles use small fixed
    /// ids.
    pub id: u32,
    pub alpha: AlphaCombine,
    pub states: RenderStates,
}

impl QuadStyle {
    pub const NORMAL: QuadStyle = QuadStyle {
        id: 1,
        alpha: AlphaCombine::Straight,
        states: RenderStates { blend: Blend::Alpha, filter: true },
    };

    /// Additive flash rendering: premultiplied color with zeroed alpha.
    pub const FLASH: QuadStyle = QuadStyle {
        id: 2,
        alpha: AlphaCombine::ZeroColor,
        states: RenderStates { blend: Blend::Premultiplied, filter: true },
    };
}

/// A style that builds its own geometry. Implementations emit vertices and
/// indices through the sink; the packer streams them like any other run.
/// Style ids of geometry styles must be unique per instance since runs are
/// never coalesced across distinct geometry styles.
pub trait GeometryStyle {
    fn style_id(&self) -> u32;

    fn states(&self) -> RenderStates {
        RenderStates::default()
    }

    fn alpha(&self) -> AlphaCombine {
        AlphaCombine::Straight
    }

    fn build(&self, sprite: &SpriteVisual, sink: &mut GeometrySink);
}

/// The closed style dispatch: every renderable is either a textured quad or
/// style-built geometry.
#[derive(Clone)]
pub enum Style {
    Quad(QuadStyle),
    Geometry(Arc<dyn GeometryStyle>),
}

impl Style {
    pub fn style_id(&self) -> u32 {
        match self {
            Style::Quad(q) => q.id,
            Style::Geometry(g) => g.style_id(),
        }
    }

    pub fn states(&self) -> RenderStates {
        match self {
            Style::Quad(q) => q.states,
            Style::Geometry(g) => g.states(),
        }
    }

    pub fn alpha(&self) -> AlphaCombine {
        match self {
            Style::Quad(q) => q.alpha,
            Style::Geometry(g) => g.alpha(),
        }
    }

    pub fn is_quad(&self) -> bool {
        matches!(self, Style::Quad(_))
    }
}

impl fmt::Debug for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Style::Quad(q) => f.debug_tuple("Quad").field(q).finish(),
            Style::Geometry(g) => f.debug_tuple("Geometry").field(&g.style_id()).finish(),
        }
    }
}
