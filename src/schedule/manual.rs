use super::{FrameHandle, Scheduler, Task};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

/// Virtual clock for tests: timers run on [`ManualScheduler::advance`],
/// frames on [`ManualScheduler::run_frame`].
#[derive(Default)]
pub struct ManualScheduler {
    now_ms: Cell<u64>,
    seq: Cell<u64>,
    timers: RefCell<BTreeMap<(u64, u64), Task>>,
    next_frame: Cell<i32>,
    frames: RefCell<BTreeMap<i32, Task>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.borrow().len()
    }

    /// Moves the clock forward, running due timers in deadline order. Timers
    /// scheduled by a running timer fire in the same call when already due.
    pub fn advance(&self, ms: u64) {
        let target = self.now_ms.get() + ms;
        loop {
            let next = {
                let mut timers = self.timers.borrow_mut();
                match timers.keys().next().copied() {
                    Some(key) if key.0 <= target => timers.remove(&key).map(|t| (key.0, t)),
                    _ => None,
                }
            };
            let Some((due, task)) = next else {
                break;
            };
            self.now_ms.set(due.max(self.now_ms.get()));
            task();
        }
        self.now_ms.set(target);
    }

    /// Runs every frame callback requested before this call. Returns how many
    /// ran.
    pub fn run_frame(&self) -> usize {
        let due = std::mem::take(&mut *self.frames.borrow_mut());
        let count = due.len();
        for (_, task) in due {
            task();
        }
        count
    }
}

impl Scheduler for ManualScheduler {
    fn set_timeout(&self, delay_ms: u32, task: Task) {
        let seq = self.seq.get();
        self.seq.set(seq + 1);
        let due = self.now_ms.get() + u64::from(delay_ms);
        self.timers.borrow_mut().insert((due, seq), task);
    }

    fn request_frame(&self, task: Task) -> Option<FrameHandle> {
        let id = self.next_frame.get() + 1;
        self.next_frame.set(id);
        self.frames.borrow_mut().insert(id, task);
        Some(FrameHandle(id))
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.frames.borrow_mut().remove(&handle.0);
    }
}
