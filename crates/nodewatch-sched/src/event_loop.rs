//! Event Loop Implementation
//!
//! Macrotask queue for deferred work and microtask queue for spawned work.
//!
//! A tick runs every macrotask that was queued when the tick began, draining
//! microtasks before the first one and after each one. Macrotasks deferred
//! during tick T, even from a microtask, run no earlier than tick T+1.

use crate::{LoopConfig, SchedulerError};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Handle to a deferred task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

/// Queue a task lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Runs on a later tick (cancellable)
    Deferred,
    /// Runs once the current unit of work yields
    Spawned,
}

/// Task in the event loop
struct Task {
    id: TaskId,
    kind: TaskKind,
    callback: Box<dyn FnOnce()>,
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct LoopState {
    /// Spawned background work
    microtasks: VecDeque<Task>,
    /// Deferred next-tick work
    macrotasks: VecDeque<Task>,
    /// Next task ID
    next_task_id: u64,
    /// Completed ticks
    tick: u64,
}

impl LoopState {
    fn push(&mut self, kind: TaskKind, callback: Box<dyn FnOnce()>) -> TaskId {
        let id = TaskId(self.next_task_id);
        self.next_task_id += 1;
        let task = Task { id, kind, callback };
        match kind {
            TaskKind::Deferred => self.macrotasks.push_back(task),
            TaskKind::Spawned => self.microtasks.push_back(task),
        }
        id
    }
}

/// Cooperative event loop
///
/// Cloning is cheap; all clones drive the same queues. Tasks are never run
/// while the loop's own state is borrowed, so a task may schedule or cancel
/// other tasks. Panics inside a task unwind out of [`EventLoop::run_tick`].
#[derive(Debug, Clone, Default)]
pub struct EventLoop {
    state: Rc<RefCell<LoopState>>,
    config: Rc<LoopConfig>,
}

impl EventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LoopConfig) -> Self {
        Self {
            state: Rc::default(),
            config: Rc::new(config),
        }
    }

    /// Queue `callback` for a later tick
    pub fn defer(&self, callback: impl FnOnce() + 'static) -> TaskId {
        self.state
            .borrow_mut()
            .push(TaskKind::Deferred, Box::new(callback))
    }

    /// Cancel a deferred task; no-op if it already ran or was cancelled
    pub fn cancel(&self, id: TaskId) {
        // Dropped outside the borrow: the closure may own handles to this loop.
        let removed: Option<Task> = {
            let mut state = self.state.borrow_mut();
            let position = state.macrotasks.iter().position(|task| task.id == id);
            position.and_then(|index| state.macrotasks.remove(index))
        };
        if removed.is_some() {
            tracing::trace!("Cancelled deferred task {:?}", id);
        }
    }

    /// Queue `callback` to run off the current call stack
    pub fn spawn(&self, callback: impl FnOnce() + 'static) {
        self.state
            .borrow_mut()
            .push(TaskKind::Spawned, Box::new(callback));
    }

    /// Run one tick; returns the number of tasks executed
    pub fn run_tick(&self) -> usize {
        // Ids are issued in order, so anything at or past the boundary was
        // queued during this tick.
        let boundary = TaskId(self.state.borrow().next_task_id);
        let mut executed = self.run_microtasks();

        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                match state.macrotasks.front() {
                    Some(task) if task.id < boundary => state.macrotasks.pop_front(),
                    _ => None,
                }
            };
            let Some(task) = next else {
                break;
            };
            (task.callback)();
            executed += 1;
            executed += self.run_microtasks();
        }

        let mut state = self.state.borrow_mut();
        state.tick += 1;
        tracing::trace!("Tick {} ran {} tasks", state.tick, executed);
        executed
    }

    /// Run ticks until both queues are empty
    ///
    /// Returns the total number of tasks executed, or an error if work is
    /// still pending after `max_ticks` ticks.
    pub fn run_until_idle(&self) -> Result<usize, SchedulerError> {
        let mut executed = 0;
        for _ in 0..self.config.max_ticks {
            if !self.has_pending_work() {
                return Ok(executed);
            }
            executed += self.run_tick();
        }
        if self.has_pending_work() {
            tracing::warn!("Event loop busy after {} ticks", self.config.max_ticks);
            return Err(SchedulerError::TickLimitExceeded {
                ticks: self.config.max_ticks,
            });
        }
        Ok(executed)
    }

    /// Drain the microtask queue, including microtasks queued meanwhile
    fn run_microtasks(&self) -> usize {
        let mut executed = 0;
        loop {
            let next = self.state.borrow_mut().microtasks.pop_front();
            let Some(task) = next else {
                return executed;
            };
            (task.callback)();
            executed += 1;
        }
    }

    /// Check if there's pending work
    pub fn has_pending_work(&self) -> bool {
        let state = self.state.borrow();
        !state.microtasks.is_empty() || !state.macrotasks.is_empty()
    }

    /// Number of queued tasks of either kind
    pub fn pending_tasks(&self) -> usize {
        let state = self.state.borrow();
        state.microtasks.len() + state.macrotasks.len()
    }

    /// Completed ticks
    pub fn current_tick(&self) -> u64 {
        self.state.borrow().tick
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }
}
