//! Timers and animation frames.
//!
//! Engines never touch `window` directly; they go through [`Scheduler`] so the
//! keep-alive burst, FLIP staging and autoscroll can be driven by a virtual
//! clock in tests.

use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

#[cfg(test)]
mod manual;
#[cfg(test)]
pub use manual::ManualScheduler;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(pub i32);

pub type Task = Box<dyn FnOnce()>;

pub trait Scheduler {
    fn set_timeout(&self, delay_ms: u32, task: Task);
    fn request_frame(&self, task: Task) -> Option<FrameHandle>;
    fn cancel_frame(&self, handle: FrameHandle);
}

/// `window.setTimeout` / `window.requestAnimationFrame`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WebScheduler;

impl Scheduler for WebScheduler {
    fn set_timeout(&self, delay_ms: u32, task: Task) {
        let Some(win) = web_sys::window() else {
            return;
        };
        let cb = Closure::once_into_js(move || task());
        let _ = win.set_timeout_with_callback_and_timeout_and_arguments_0(
            cb.as_ref().unchecked_ref(),
            delay_ms.min(i32::MAX as u32) as i32,
        );
    }

    fn request_frame(&self, task: Task) -> Option<FrameHandle> {
        let win = web_sys::window()?;
        let cb = Closure::once_into_js(move || task());
        win.request_animation_frame(cb.as_ref().unchecked_ref())
            .ok()
            .map(FrameHandle)
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        if let Some(win) = web_sys::window() {
            let _ = win.cancel_animation_frame(handle.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[test]
    fn test_timers_fire_in_deadline_order() {
        let sched = ManualScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for (delay, tag) in [(400u32, "c"), (0, "a"), (60, "b")] {
            let log = log.clone();
            sched.set_timeout(delay, Box::new(move || log.borrow_mut().push(tag)));
        }

        sched.advance(100);
        assert_eq!(*log.borrow(), vec!["a", "b"]);
        assert_eq!(sched.pending_timers(), 1);

        sched.advance(300);
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_cancelled_frame_never_runs() {
        let sched = ManualScheduler::new();
        let ran = Rc::new(Cell::new(false));
        let ran2 = ran.clone();
        let handle = sched
            .request_frame(Box::new(move || ran2.set(true)))
            .expect("frame");
        sched.cancel_frame(handle);
        assert_eq!(sched.run_frame(), 0);
        assert!(!ran.get());
    }
}
