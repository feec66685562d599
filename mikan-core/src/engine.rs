use std::cell::{Ref, RefCell, RefMut};
use std::sync::Arc;

use anyhow::{bail, Result};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::context::{EventSink, SoundPlayer, TickContext};
use crate::program::AnimationProgram;
use crate::sprite::Sprite;
use crate::types::OwnerId;

/// Handle to a pooled sprite. Generations are per slot: whenever a slot's
/// occupant changes (deallocation, or a sprite moved in by the swap), the
/// slot generation is bumped, so a stale id resolves to `None` instead of
/// whichever sprite lives there now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpriteId {
    pub index: u32,
    pub generation: u32,
}

/// Owns every sprite and drives their animation cursors once per frame.
/// Also owns the services commands call out to (RNG, sound, events), so
/// nothing in the interpreter touches global state.
pub struct SpriteEngine {
    slots: Vec<RefCell<Sprite>>,
    generations: Vec<u32>,
    live: usize,
    rng: SmallRng,
    audio: Option<Box<dyn SoundPlayer>>,
    events: Option<Box<dyn EventSink>>,
}

impl SpriteEngine {
    pub fn new(capacity: usize) -> Self {
        Self::with_seed(capacity, rand::random())
    }

    pub fn with_seed(capacity: usize, seed: u64) -> Self {
        let capacity = capacity.max(1);
        let mut slots = Vec::new();
        slots.resize_with(capacity, || RefCell::new(Sprite::default()));
        Self {
            slots,
            generations: vec![0; capacity],
            live: 0,
            rng: SmallRng::seed_from_u64(seed),
            audio: None,
            events: None,
        }
    }

    pub fn set_sound_player(&mut self, audio: Box<dyn SoundPlayer>) {
        self.audio = Some(audio);
    }

    pub fn set_event_sink(&mut self, events: Box<dyn EventSink>) {
        self.events = Some(events);
    }

    pub fn live_count(&self) -> usize {
        self.live
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Takes the next free slot, growing the pool when exhausted, and
    /// resets it to the default visual state. An owner is mandatory.
    pub fn allocate(&mut self, owner: OwnerId) -> Result<SpriteId> {
        if owner.is_none() {
            bail!("sprite allocation requires a non-zero owner");
        }
        if self.live == self.slots.len() {
            let target = self.slots.len() * 2;
            log::debug!("sprite pool exhausted, growing to {}", target);
            self.slots.resize_with(target, || RefCell::new(Sprite::default()));
            self.generations.resize(target, 0);
        }
        let index = self.live;
        self.live += 1;
        self.slots[index].borrow_mut().reset(owner, index as u32);
        Ok(SpriteId { index: index as u32, generation: self.generations[index] })
    }

    /// Swap-removes in O(1): the last live slot moves into the freed
    /// position with its index field updated in place, the freed sprite is
    /// reset. Only the moved sprite's old id is invalidated beyond the
    /// deallocated one; both affected slots have their generation bumped.
    pub fn deallocate(&mut self, id: SpriteId) -> bool {
        let Some(index) = self.slot(id) else { return false };
        let last = self.live - 1;
        if index != last {
            self.slots.swap(index, last);
            self.slots[index].borrow_mut().set_index(index as u32);
            self.generations[index] = self.generations[index].wrapping_add(1);
        }
        {
            let mut freed = self.slots[last].borrow_mut();
            freed.set_index(last as u32);
            freed.retire();
        }
        self.generations[last] = self.generations[last].wrapping_add(1);
        self.live -= 1;
        true
    }

    pub fn get(&self, id: SpriteId) -> Option<Ref<'_, Sprite>> {
        self.slot(id).map(|index| self.slots[index].borrow())
    }

    pub fn get_mut(&self, id: SpriteId) -> Option<RefMut<'_, Sprite>> {
        self.slot(id).map(|index| self.slots[index].borrow_mut())
    }

    pub fn live_ids(&self) -> Vec<SpriteId> {
        (0..self.live)
            .map(|index| SpriteId {
                index: index as u32,
                generation: self.generations[index],
            })
            .collect()
    }

    /// Assigns and rewinds a program on a pooled sprite, using the engine's
    /// own services for the immediate first tick.
    pub fn assign_program(&mut self, id: SpriteId, program: Arc<AnimationProgram>) -> bool {
        let Some(index) = self.slot(id) else { return false };
        let Self { slots, rng, audio, events, .. } = self;
        let mut ctx = TickContext {
            rng,
            audio: audio.as_deref_mut(),
            events: events.as_deref_mut(),
        };
        slots[index].borrow_mut().assign_program(program, &mut ctx);
        true
    }

    /// Runs one animation tick over every live sprite, skipping inactive,
    /// paused and program-less ones.
    pub fn tick(&mut self) {
        let Self { slots, live, rng, audio, events, .. } = self;
        let mut ctx = TickContext {
            rng,
            audio: audio.as_deref_mut(),
            events: events.as_deref_mut(),
        };
        for slot in slots[..*live].iter() {
            let mut sprite = slot.borrow_mut();
            if !sprite.active || sprite.paused || sprite.program.is_none() {
                continue;
            }
            sprite.step(&mut ctx);
        }
    }

    fn slot(&self, id: SpriteId) -> Option<usize> {
        let index = id.index as usize;
        if index >= self.live {
            return None;
        }
        if self.generations[index] != id.generation {
            return None;
        }
        Some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;

    fn engine() -> SpriteEngine {
        SpriteEngine::with_seed(4, 1)
    }

    #[test]
    fn test_allocate_requires_owner() {
        let mut engine = engine();
        assert!(engine.allocate(OwnerId(0)).is_err());
        assert!(engine.allocate(OwnerId(1)).is_ok());
    }

    #[test]
    fn test_allocate_resets_visual_state() {
        let mut engine = engine();
        let id = engine.allocate(OwnerId(5)).unwrap();
        {
            let mut s = engine.get_mut(id).unwrap();
            s.alpha = 3;
            s.visible = false;
            s.angle = 123;
        }
        engine.deallocate(id);
        let id = engine.allocate(OwnerId(6)).unwrap();
        let s = engine.get(id).unwrap();
        assert_eq!(s.alpha, 255);
        assert!(s.visible);
        assert!(s.active);
        assert_eq!(s.angle, 0);
        assert_eq!(s.scale_x, crate::types::SCALE_ONE);
        assert_eq!(s.owner, OwnerId(6));
    }

    #[test]
    fn test_pool_grows_when_exhausted() {
        let mut engine = engine();
        let capacity = engine.capacity();
        for i in 0..capacity + 1 {
            engine.allocate(OwnerId(i as u64 + 1)).unwrap();
        }
        assert!(engine.capacity() > capacity);
        assert_eq!(engine.live_count(), capacity + 1);
    }

    #[test]
    fn test_count_and_index_integrity() {
        let mut engine = engine();
        let mut ids = Vec::new();
        for i in 0..6 {
            ids.push(engine.allocate(OwnerId(i + 1)).unwrap());
        }
        engine.deallocate(ids[5]);
        engine.deallocate(ids[2]);
        let extra = engine.allocate(OwnerId(100)).unwrap();
        engine.deallocate(ids[0]);

        // allocations minus deallocations
        assert_eq!(engine.live_count(), 7 - 3);
        for id in engine.live_ids() {
            let sprite = engine.get(id).unwrap();
            assert_eq!(sprite.index(), id.index, "stored index must match slot");
        }
        // the extra sprite was the last live slot and moved into slot 0
        assert!(engine.get(extra).is_none());
        let owners: Vec<_> = engine
            .live_ids()
            .into_iter()
            .map(|id| engine.get(id).unwrap().owner)
            .collect();
        assert!(owners.contains(&OwnerId(100)));
    }

    #[test]
    fn test_stale_id_is_rejected() {
        let mut engine = engine();
        let a = engine.allocate(OwnerId(1)).unwrap();
        let b = engine.allocate(OwnerId(2)).unwrap();
        engine.deallocate(a);
        // slot 0 is now occupied by the moved sprite; the old id must miss
        assert!(engine.get(a).is_none());
        // the moved sprite's old id pointed at the vacated last slot
        assert!(engine.get(b).is_none());
        // it is still reachable under its new position
        let moved = engine.live_ids()[0];
        assert_eq!(engine.get(moved).unwrap().owner, OwnerId(2));
    }

    #[test]
    fn test_tick_skips_paused_and_inactive() {
        let mut engine = engine();
        let running = engine.allocate(OwnerId(1)).unwrap();
        let paused = engine.allocate(OwnerId(2)).unwrap();
        let inactive = engine.allocate(OwnerId(3)).unwrap();

        let program =
            Arc::new(AnimationProgram::link(vec![Command::Delay { duration: 1000 }]).unwrap());
        for id in [running, paused, inactive] {
            engine.assign_program(id, program.clone());
        }
        engine.get_mut(paused).unwrap().paused = true;
        engine.get_mut(inactive).unwrap().active = false;

        let base = engine.get(running).unwrap().tick;
        engine.tick();
        assert!(engine.get(running).unwrap().tick > base);
        assert_eq!(engine.get(paused).unwrap().tick, base);
        assert_eq!(engine.get(inactive).unwrap().tick, base);
    }

    #[test]
    fn test_rewind_is_not_lazy() {
        let mut engine = engine();
        let id = engine.allocate(OwnerId(1)).unwrap();
        let program = Arc::new(
            AnimationProgram::link(vec![
                Command::Event(9),
                Command::Delay { duration: 4 },
            ])
            .unwrap(),
        );
        engine.assign_program(id, program);
        let sprite = engine.get(id).unwrap();
        // the first command already ran inside the assignment
        assert_eq!(sprite.event, 9);
        assert_eq!(sprite.sequence, 1);
    }
}
