use std::sync::Arc;

use arrayvec::ArrayVec;

use crate::context::TickContext;
use crate::image::{Appearance, FrameList};
use crate::program::AnimationProgram;
use crate::types::{CornerColors, OwnerId};

/// Maximum depth of the per-sprite sequence call stack. Pushes beyond this
/// are logged and dropped.
pub const SEQUENCE_STACK_DEPTH: usize = 10;

type StackEntry = (Option<Arc<AnimationProgram>>, usize);

/// All mutable per-instance state: the visual fields read by the renderer
/// and the animation cursor mutated by commands. Commands themselves are
/// immutable and shared; everything they touch lives here.
#[derive(Debug, Clone, Default)]
pub struct Sprite {
    // visual state
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub ox: f32,
    pub oy: f32,
    pub oz: f32,
    /// Rotation in `[0, ANGLE_FULL_TURN)`.
    pub angle: i32,
    /// Fixed-point scale, `SCALE_ONE` = 1.0.
    pub scale_x: i32,
    pub scale_y: i32,
    pub alpha: u8,
    pub corners: CornerColors,
    pub layer: i32,
    pub sublayer: i32,
    pub y_sort_offset: f32,
    pub visible: bool,
    pub active: bool,
    pub flash: bool,
    pub mirrored: bool,
    pub flipped: bool,
    pub paused: bool,
    pub appearance: Option<Arc<Appearance>>,
    pub frame_list: Option<Arc<FrameList>>,
    /// Last frame-list index selected by a frame command.
    pub frame: i32,
    pub owner: OwnerId,

    // animation cursor
    pub program: Option<Arc<AnimationProgram>>,
    pub sequence: usize,
    pub tick: i32,
    pub loop_count: i32,
    pub event: i32,
    pub child_offset: (f32, f32),
    stack: ArrayVec<StackEntry, SEQUENCE_STACK_DEPTH>,

    // pool bookkeeping
    index: u32,
}

impl Sprite {
    /// Restores the default visual state for a freshly allocated slot:
    /// visible, active, opaque white, identity transform, no animation.
    pub(crate) fn reset(&mut self, owner: OwnerId, index: u32) {
        *self = Sprite {
            scale_x: crate::types::SCALE_ONE,
            scale_y: crate::types::SCALE_ONE,
            alpha: 255,
            corners: CornerColors::WHITE,
            visible: true,
            active: true,
            owner,
            index,
            ..Sprite::default()
        };
    }

    pub(crate) fn retire(&mut self) {
        let index = self.index;
        self.reset(OwnerId(0), index);
        self.visible = false;
        self.active = false;
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: u32) {
        self.index = index;
    }

    /// Assigns a program and rewinds it: the cursor is reset and the first
    /// command executes immediately, within this call, so its entry side
    /// effects are never one frame late.
    pub fn assign_program(&mut self, program: Arc<AnimationProgram>, ctx: &mut TickContext) {
        self.program = Some(program);
        self.sequence = 0;
        self.tick = -1;
        self.step(ctx);
    }

    /// Assigns a program without the immediate tick. Only meant for state
    /// restore, where the saved cursor is about to be written over the
    /// fresh one.
    pub fn assign_program_no_rewind(&mut self, program: Arc<AnimationProgram>) {
        self.program = Some(program);
        self.sequence = 0;
        self.tick = -1;
    }

    pub fn clear_program(&mut self) {
        self.program = None;
    }

    /// Overwrites the cursor position directly. This is also how running
    /// animations are cancelled.
    pub fn set_sequence(&mut self, sequence: usize) {
        self.sequence = sequence;
        self.tick = 0;
    }

    pub fn set_loop(&mut self, count: i32) {
        self.loop_count = count;
    }

    /// Saves `(program, sequence + 1)` so a later pop resumes after the
    /// current command. Returns false (and logs) when the stack is full.
    pub fn push_sequence(&mut self) -> bool {
        let entry = (self.program.clone(), self.sequence + 1);
        if self.stack.try_push(entry).is_err() {
            log::warn!(
                "sprite {}: sequence stack exceeds depth {}, push ignored",
                self.index,
                SEQUENCE_STACK_DEPTH
            );
            return false;
        }
        true
    }

    /// Restores the most recently pushed `(program, sequence)`. Returns
    /// false (and logs) on underflow.
    pub fn pop_sequence(&mut self) -> bool {
        match self.stack.pop() {
            Some((program, sequence)) => {
                self.program = program;
                self.sequence = sequence;
                self.tick = 0;
                true
            }
            None => {
                log::warn!("sprite {}: sequence stack underflow, pop ignored", self.index);
                false
            }
        }
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Moves the cursor to the next command. Shared by every command that
    /// completes.
    pub(crate) fn advance(&mut self) {
        self.sequence += 1;
        self.tick = 0;
    }

    /// Applies an appearance; if the appearance carries its own program the
    /// sprite's animation is re-assigned and rewound. Re-applying the
    /// program the sprite is already running is skipped, so an appearance
    /// that names its own program cannot recurse through the rewind.
    pub fn apply_appearance(&mut self, appearance: Arc<Appearance>, ctx: &mut TickContext) {
        let program = appearance.program.clone();
        self.appearance = Some(appearance);
        if let Some(program) = program {
            let already_running =
                self.program.as_ref().map_or(false, |current| Arc::ptr_eq(current, &program));
            if !already_running {
                self.assign_program(program, ctx);
            }
        }
    }

    /// The per-tick driver: executes the current command and cascades while
    /// commands report completion, all within this one tick. A sequence
    /// index outside the program is the valid terminal state and does
    /// nothing.
    pub fn step(&mut self, ctx: &mut TickContext) {
        loop {
            // re-read every iteration: a frame command may swap the program
            let Some(program) = self.program.clone() else { return };
            let Some(command) = program.command(self.sequence) else { return };
            if !command.execute(self, ctx) {
                return;
            }
        }
    }
}
