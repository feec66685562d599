use std::sync::Arc;

use rand::RngCore;

use crate::image::Appearance;
use crate::program::AnimationProgram;
use crate::types::{OwnerId, SoundId};

/// Lookup capability of the external resource loader. Names are resolved
/// once, at load time; the interpreter never sees a name at tick time.
pub trait ResourceResolver {
    fn appearance(&self, name: &str) -> Option<Arc<Appearance>>;
    fn program(&self, name: &str) -> Option<Arc<AnimationProgram>>;
    fn sound(&self, name: &str) -> Option<SoundId>;
}

/// Externally supplied sound output for `Sound` commands.
pub trait SoundPlayer {
    fn play(&mut self, sound: SoundId);
}

/// Externally supplied game-logic callbacks: emitter spawning and
/// owner-object notification.
pub trait EventSink {
    fn emit(&mut self, name: &str, owner: OwnerId, x: f32, y: f32);
    fn notify(&mut self, owner: OwnerId, value: i32);
}

/// Per-tick bundle handed to `Command::execute`. Owned services live on the
/// engine; this only borrows them for the duration of one tick.
pub struct TickContext<'a> {
    pub rng: &'a mut dyn RngCore,
    pub audio: Option<&'a mut (dyn SoundPlayer + 'static)>,
    pub events: Option<&'a mut (dyn EventSink + 'static)>,
}

impl<'a> TickContext<'a> {
    pub fn new(rng: &'a mut dyn RngCore) -> Self {
        Self { rng, audio: None, events: None }
    }
}
