//! Cancellable delayed tasks over an explicit clock
//!
//! Nothing here spawns threads or registers host timers. The owner polls
//! [`Scheduler::take_due`] from its event loop (or a test advances a
//! [`VirtualClock`]) and runs whatever came due.

use smallvec::SmallVec;
use std::cell::Cell;
use std::rc::Rc;

/// Monotonic millisecond time source
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Host clock: `performance.now()` in the browser, an `Instant` taken at
/// construction elsewhere
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    #[cfg(not(target_arch = "wasm32"))]
    origin: std::time::Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            origin: std::time::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    #[cfg(target_arch = "wasm32")]
    fn now_ms(&self) -> u64 {
        performance_now().unwrap_or_else(js_sys::Date::now) as u64
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// `performance.now()`, when the host exposes it
#[cfg(target_arch = "wasm32")]
fn performance_now() -> Option<f64> {
    use wasm_bindgen::{JsCast, JsValue};

    let performance = js_sys::Reflect::get(&js_sys::global(), &JsValue::from_str("performance")).ok()?;
    let now: js_sys::Function = js_sys::Reflect::get(&performance, &JsValue::from_str("now"))
        .ok()?
        .dyn_into()
        .ok()?;
    now.call0(&performance).ok()?.as_f64()
}

/// Manually advanced clock for tests and headless hosts.
///
/// Clones share the same time.
#[derive(Debug, Default, Clone)]
pub struct VirtualClock {
    now: Rc<Cell<u64>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get().saturating_add(ms));
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }
}

impl Clock for VirtualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

/// Handle to a scheduled task, used to cancel it or match it when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

#[derive(Debug, Clone, Copy)]
struct ScheduledTask {
    handle: TaskHandle,
    due_at: u64,
}

/// Queue of delayed tasks
pub struct Scheduler {
    clock: Box<dyn Clock>,
    tasks: SmallVec<[ScheduledTask; 2]>,
    next_id: u64,
}

impl Scheduler {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self {
            clock,
            tasks: SmallVec::new(),
            next_id: 1,
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Schedule a task to come due `delay_ms` from now
    pub fn schedule_after(&mut self, delay_ms: u64) -> TaskHandle {
        let handle = TaskHandle(self.next_id);
        self.next_id += 1;
        let due_at = self.now_ms().saturating_add(delay_ms);
        self.tasks.push(ScheduledTask { handle, due_at });
        tracing::trace!(task = handle.0, due_at, "scheduled task");
        handle
    }

    /// Cancel a task; returns false if it already fired or was cancelled
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.handle != handle);
        before != self.tasks.len()
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.tasks.iter().any(|task| task.handle == handle)
    }

    /// Earliest deadline among pending tasks
    pub fn next_deadline(&self) -> Option<u64> {
        self.tasks.iter().map(|task| task.due_at).min()
    }

    pub fn pending_count(&self) -> usize {
        self.tasks.len()
    }

    /// Remove and return every task due by now, earliest first
    pub fn take_due(&mut self) -> SmallVec<[TaskHandle; 2]> {
        let now = self.now_ms();
        let mut due: SmallVec<[ScheduledTask; 2]> =
            self.tasks.iter().filter(|task| task.due_at <= now).copied().collect();
        if due.is_empty() {
            return SmallVec::new();
        }
        self.tasks.retain(|task| task.due_at > now);
        due.sort_by_key(|task| (task.due_at, task.handle.0));
        due.into_iter().map(|task| task.handle).collect()
    }

    /// Cancel everything
    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> (Scheduler, VirtualClock) {
        let clock = VirtualClock::new();
        (Scheduler::new(Box::new(clock.clone())), clock)
    }

    #[test]
    fn test_task_fires_after_delay() {
        let (mut scheduler, clock) = scheduler();
        let handle = scheduler.schedule_after(300);

        clock.advance(299);
        assert!(scheduler.take_due().is_empty());
        assert!(scheduler.is_pending(handle));

        clock.advance(1);
        assert_eq!(scheduler.take_due().as_slice(), &[handle]);
        assert!(!scheduler.is_pending(handle));
        assert!(scheduler.take_due().is_empty());
    }

    #[test]
    fn test_cancel() {
        let (mut scheduler, clock) = scheduler();
        let handle = scheduler.schedule_after(10);
        assert!(scheduler.cancel(handle));
        assert!(!scheduler.cancel(handle));

        clock.advance(100);
        assert!(scheduler.take_due().is_empty());
    }

    #[test]
    fn test_due_order() {
        let (mut scheduler, clock) = scheduler();
        let late = scheduler.schedule_after(50);
        let early = scheduler.schedule_after(20);
        assert_eq!(scheduler.next_deadline(), Some(20));

        clock.advance(60);
        assert_eq!(scheduler.take_due().as_slice(), &[early, late]);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_clear() {
        let (mut scheduler, _clock) = scheduler();
        scheduler.schedule_after(1);
        scheduler.schedule_after(2);
        scheduler.clear();
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn test_system_clock_never_goes_back() {
        let clock = SystemClock::new();
        let first = clock.now_ms();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = clock.now_ms();
        assert!(second >= first + 1);
    }
}
