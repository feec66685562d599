use std::sync::Arc;

use rand::Rng;

use crate::context::{ResourceResolver, TickContext};
use crate::image::Appearance;
use crate::sprite::Sprite;
use crate::types::{wrap_angle, Color};
use crate::value::Value;

/// Jump destination. Symbolic labels are resolved into sequence indices by
/// `AnimationProgram::link`; a name that never resolved stays `Unresolved`
/// and degrades to a no-op advance when executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dest {
    Seq(usize),
    Unresolved(String),
}

/// Frame selection mode: an appearance resolved by name once at load time,
/// or an index into the sprite's externally supplied frame list.
#[derive(Debug, Clone)]
pub enum FrameSelect {
    Appearance(Arc<Appearance>),
    Index(Value),
}

/// One step of an animation program. Commands are immutable after load and
/// hold no per-instance state; everything mutable lives on the sprite they
/// act on.
#[derive(Debug, Clone)]
pub enum Command {
    /// Set or adjust the rotation angle, wrapped into a full turn.
    Angle { target: Value, duration: i32 },
    /// Set or adjust the position offset, per present field.
    Offset { x: Option<Value>, y: Option<Value>, z: Option<Value>, duration: i32 },
    /// Set or adjust the fixed-point scale, per present field.
    Scale { x: Option<Value>, y: Option<Value>, duration: i32 },
    /// Set or adjust alpha, clamped to 0..=255.
    Alpha { target: Value, duration: i32 },
    /// Overwrite per-corner colors; only corners present are touched.
    Color { corners: [Option<Color>; 4], duration: i32 },
    /// Select an appearance, by resolved resource or frame-list index.
    Frame { select: FrameSelect, duration: i32 },
    /// Hold the cursor for a fixed number of ticks.
    Delay { duration: i32 },
    /// Hold the cursor for a uniformly random number of ticks in [min, max].
    RandomDelay { min: i32, max: i32 },
    /// Marker; source of the program's label table.
    Label(String),
    Goto(Dest),
    /// Uniform choice over the (weight-expanded) destination list.
    RandomGoto(Vec<Dest>),
    /// While the sprite's loop counter is positive, decrement it and jump;
    /// once it reaches zero, fall through.
    Repeat(Dest),
    /// Store an opaque event id on the sprite.
    Event(i32),
    /// Set any subset of the sprite flags.
    Flags {
        visible: Option<bool>,
        active: Option<bool>,
        flash: Option<bool>,
        mirrored: Option<bool>,
        flipped: Option<bool>,
        paused: Option<bool>,
    },
    /// Call: push the return position and jump.
    Sub(Dest),
    /// Return from the most recent Sub.
    Return,
    /// Save the position after this command without jumping.
    PushSeq,
    /// Restore the most recently saved position.
    PopSeq,
    /// Play a sound resolved at load time; unresolved plays nothing.
    Sound { name: String, sound: Option<crate::types::SoundId> },
    /// Ask the event sink to spawn a named emitter at the sprite position.
    Emit { name: String },
    /// Owner-object callback through the event sink.
    Notify { value: i32 },
    /// Layer switch.
    Layer { layer: Option<Value>, sublayer: Option<Value> },
}

impl Command {
    /// Ticks this command holds the cursor for. Control commands are always
    /// zero-duration.
    pub fn duration(&self) -> i32 {
        match self {
            Command::Angle { duration, .. }
            | Command::Offset { duration, .. }
            | Command::Scale { duration, .. }
            | Command::Alpha { duration, .. }
            | Command::Color { duration, .. }
            | Command::Frame { duration, .. }
            | Command::Delay { duration } => *duration,
            _ => 0,
        }
    }

    /// Resolves a named appearance once, at creation time. An unknown name
    /// is logged and degrades the command to a plain delay.
    pub fn frame_named(resolver: &dyn ResourceResolver, name: &str, duration: i32) -> Command {
        match resolver.appearance(name) {
            Some(appearance) => {
                Command::Frame { select: FrameSelect::Appearance(appearance), duration }
            }
            None => {
                log::warn!("unknown appearance {:?}, frame command degrades to a delay", name);
                Command::Delay { duration }
            }
        }
    }

    /// Resolves a named sound once, at creation time. An unknown name is
    /// logged; the command then plays nothing.
    pub fn sound_named(resolver: &dyn ResourceResolver, name: &str) -> Command {
        let sound = resolver.sound(name);
        if sound.is_none() {
            log::warn!("unknown sound {:?}, command will play nothing", name);
        }
        Command::Sound { name: name.to_string(), sound }
    }

    /// Expands `n=` weights into repeated destination entries, matching the
    /// load-time representation the uniform pick runs over.
    pub fn random_goto_weighted(entries: Vec<(Dest, u32)>) -> Command {
        let mut dests = Vec::new();
        for (dest, weight) in entries {
            for _ in 0..weight.max(1) {
                dests.push(dest.clone());
            }
        }
        Command::RandomGoto(dests)
    }

    /// Executes one tick of this command against `sprite`. Returning true
    /// means the command is done and the next one should run immediately,
    /// within the same tick; returning false means this command still owns
    /// the tick.
    pub fn execute(&self, sprite: &mut Sprite, ctx: &mut TickContext) -> bool {
        match self {
            Command::Angle { target, duration } => duration_step(sprite, *duration, |s| {
                s.angle = wrap_angle(target.apply(s.angle));
            }),
            Command::Offset { x, y, z, duration } => duration_step(sprite, *duration, |s| {
                if let Some(x) = x {
                    s.ox = x.apply(s.ox as i32) as f32;
                }
                if let Some(y) = y {
                    s.oy = y.apply(s.oy as i32) as f32;
                }
                if let Some(z) = z {
                    s.oz = z.apply(s.oz as i32) as f32;
                }
            }),
            Command::Scale { x, y, duration } => duration_step(sprite, *duration, |s| {
                if let Some(x) = x {
                    s.scale_x = x.apply(s.scale_x);
                }
                if let Some(y) = y {
                    s.scale_y = y.apply(s.scale_y);
                }
            }),
            Command::Alpha { target, duration } => duration_step(sprite, *duration, |s| {
                s.alpha = target.apply(s.alpha as i32).clamp(0, 255) as u8;
            }),
            Command::Color { corners, duration } => duration_step(sprite, *duration, |s| {
                for (slot, corner) in s.corners.0.iter_mut().zip(corners.iter()) {
                    if let Some(color) = corner {
                        *slot = *color;
                    }
                }
            }),
            Command::Frame { select, duration } => {
                if sprite.tick <= 0 {
                    sprite.tick = 0;
                    let before = sprite.program.clone();
                    apply_frame(sprite, select, ctx);
                    // applying the appearance may have assigned (and rewound)
                    // a new program; that program now owns the cursor, so
                    // this command must not advance past it
                    if !same_program(&before, &sprite.program) {
                        return false;
                    }
                }
                finish_or_wait(sprite, *duration)
            }
            Command::Delay { duration } => duration_step(sprite, *duration, |_| {}),
            Command::RandomDelay { min, max } => {
                if sprite.tick <= 0 {
                    let (lo, hi) = if min <= max { (*min, *max) } else { (*max, *min) };
                    let rolled = ctx.rng.gen_range(lo..=hi).max(0);
                    if rolled == 0 {
                        sprite.advance();
                        return true;
                    }
                    sprite.tick = rolled;
                    return false;
                }
                sprite.tick -= 1;
                if sprite.tick == 0 {
                    sprite.advance();
                    return true;
                }
                false
            }
            Command::Label(_) => {
                sprite.advance();
                true
            }
            Command::Goto(dest) => {
                jump(sprite, dest);
                true
            }
            Command::RandomGoto(dests) => {
                if dests.is_empty() {
                    sprite.advance();
                } else {
                    let pick = ctx.rng.gen_range(0..dests.len());
                    jump(sprite, &dests[pick]);
                }
                true
            }
            Command::Repeat(dest) => {
                if sprite.loop_count > 0 {
                    sprite.loop_count -= 1;
                    jump(sprite, dest);
                } else {
                    sprite.advance();
                }
                true
            }
            Command::Event(id) => {
                sprite.event = *id;
                sprite.advance();
                true
            }
            Command::Flags { visible, active, flash, mirrored, flipped, paused } => {
                if let Some(v) = visible {
                    sprite.visible = *v;
                }
                if let Some(v) = active {
                    sprite.active = *v;
                }
                if let Some(v) = flash {
                    sprite.flash = *v;
                }
                if let Some(v) = mirrored {
                    sprite.mirrored = *v;
                }
                if let Some(v) = flipped {
                    sprite.flipped = *v;
                }
                if let Some(v) = paused {
                    sprite.paused = *v;
                }
                sprite.advance();
                true
            }
            Command::Sub(dest) => {
                if sprite.push_sequence() {
                    jump(sprite, dest);
                } else {
                    sprite.advance();
                }
                true
            }
            Command::Return | Command::PopSeq => {
                if !sprite.pop_sequence() {
                    sprite.advance();
                }
                true
            }
            Command::PushSeq => {
                sprite.push_sequence();
                sprite.advance();
                true
            }
            Command::Sound { sound, .. } => {
                if let (Some(sound), Some(audio)) = (sound, ctx.audio.as_deref_mut()) {
                    audio.play(*sound);
                }
                sprite.advance();
                true
            }
            Command::Emit { name } => {
                if let Some(events) = ctx.events.as_deref_mut() {
                    let x = sprite.x + sprite.ox;
                    let y = sprite.y + sprite.oy;
                    events.emit(name, sprite.owner, x, y);
                }
                sprite.advance();
                true
            }
            Command::Notify { value } => {
                if let Some(events) = ctx.events.as_deref_mut() {
                    events.notify(sprite.owner, *value);
                }
                sprite.advance();
                true
            }
            Command::Layer { layer, sublayer } => {
                if let Some(layer) = layer {
                    sprite.layer = layer.apply(sprite.layer);
                }
                if let Some(sublayer) = sublayer {
                    sprite.sublayer = sublayer.apply(sprite.sublayer);
                }
                sprite.advance();
                true
            }
        }
    }
}

/// The shared duration pattern: the entry action runs exactly once (a tick
/// of 0 or the -1 rewind state both mean "not yet entered"), then the
/// command holds the cursor until `duration` ticks have elapsed.
fn duration_step(sprite: &mut Sprite, duration: i32, apply: impl FnOnce(&mut Sprite)) -> bool {
    if sprite.tick <= 0 {
        sprite.tick = 0;
        apply(sprite);
    }
    finish_or_wait(sprite, duration)
}

fn finish_or_wait(sprite: &mut Sprite, duration: i32) -> bool {
    if sprite.tick >= duration {
        sprite.advance();
        return true;
    }
    sprite.tick += 1;
    false
}

fn jump(sprite: &mut Sprite, dest: &Dest) {
    match dest {
        Dest::Seq(index) => sprite.set_sequence(*index),
        Dest::Unresolved(name) => {
            log::warn!("jump to unknown label {:?}, skipping", name);
            sprite.advance();
        }
    }
}

fn apply_frame(sprite: &mut Sprite, select: &FrameSelect, ctx: &mut TickContext) {
    match select {
        FrameSelect::Appearance(appearance) => {
            sprite.apply_appearance(appearance.clone(), ctx);
        }
        FrameSelect::Index(value) => {
            let index = value.apply(sprite.frame);
            let Some(list) = sprite.frame_list.clone() else {
                log::warn!("frame index {} selected without a frame list", index);
                return;
            };
            match usize::try_from(index).ok().and_then(|i| list.get(i)) {
                Some(appearance) => {
                    sprite.frame = index;
                    sprite.apply_appearance(appearance.clone(), ctx);
                }
                None => {
                    log::warn!(
                        "frame index {} out of range for frame list of {}",
                        index,
                        list.len()
                    );
                }
            }
        }
    }
}

fn same_program(a: &Option<Arc<crate::program::AnimationProgram>>, b: &Option<Arc<crate::program::AnimationProgram>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}
