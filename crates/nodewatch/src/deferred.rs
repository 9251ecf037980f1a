//! Deferred Settle Slot
//!
//! Holds at most one outstanding deferred task. Every re-arm or
//! invalidation bumps a generation counter; a task that fires with a stale
//! generation is ignored, so correctness never depends on the scheduler
//! honoring cancellation.

/// Generation counter - bumped on every arm or invalidation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    /// Get the next generation
    #[inline]
    pub const fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }
}

/// Single pending deferred task, keyed by generation
#[derive(Debug)]
pub(crate) struct DeferredSlot<T> {
    generation: Generation,
    task: Option<T>,
    armed: bool,
}

impl<T> DeferredSlot<T> {
    pub fn new() -> Self {
        Self {
            generation: Generation::default(),
            task: None,
            armed: false,
        }
    }

    /// Current generation
    #[inline]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Void any pending task and start a new generation
    ///
    /// Returns the scheduler handle of the voided task, if one was queued,
    /// so the caller can cancel it.
    pub fn invalidate(&mut self) -> Option<T> {
        self.generation = self.generation.next();
        self.armed = false;
        self.task.take()
    }

    /// Record `task` as the pending task for the current generation
    pub fn arm(&mut self, task: T) {
        self.task = Some(task);
        self.armed = true;
    }

    /// Called by a firing task; true if `generation` is still the live one
    pub fn fire(&mut self, generation: Generation) -> bool {
        if !self.armed || generation != self.generation {
            return false;
        }
        self.armed = false;
        self.task = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fire_current_generation() {
        let mut slot = DeferredSlot::new();
        slot.invalidate();
        let generation = slot.generation();
        slot.arm(1u32);

        assert!(slot.fire(generation));
        assert!(!slot.fire(generation), "fires once");
    }

    #[test]
    fn test_stale_generation_ignored() {
        let mut slot = DeferredSlot::new();
        slot.invalidate();
        let stale = slot.generation();
        slot.arm(1u32);

        assert_eq!(slot.invalidate(), Some(1));
        let live = slot.generation();
        slot.arm(2u32);

        assert!(!slot.fire(stale));
        assert!(slot.fire(live));
    }

    #[test]
    fn test_invalidate_without_task() {
        let mut slot: DeferredSlot<u32> = DeferredSlot::new();
        let before = slot.generation();
        assert_eq!(slot.invalidate(), None);
        assert!(slot.generation() > before);
    }
}
