pub mod command;
pub mod context;
pub mod engine;
pub mod image;
pub mod program;
pub mod sprite;
pub mod types;
pub mod value;

pub use command::{Command, Dest, FrameSelect};
pub use context::{EventSink, ResourceResolver, SoundPlayer, TickContext};
pub use engine::{SpriteEngine, SpriteId};
pub use image::{Appearance, FrameList, UvRect};
pub use program::AnimationProgram;
pub use sprite::Sprite;
pub use types::{
    wrap_angle, AlphaCombine, Color, CornerColors, OwnerId, SoundId, TextureId, ANGLE_FULL_TURN,
    SCALE_ONE,
};
pub use value::Value;
