//! Module: supervisor
//! Responsibility: running the poller and reconciler as long-lived,
//! cooperatively cancellable background tasks.
//! Does not own: task logic. Tasks are plain closures driven on a fixed
//! interval; tests drive the same closures directly for determinism.

use parking_lot::{Condvar, Mutex};
use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
    thread::JoinHandle,
    time::Duration,
};

///
/// TaskSupervisor
///
/// Interval-driven background threads with a shared stop signal. Shutdown
/// wakes every sleeper and joins; a panicking tick is logged and the task
/// keeps its schedule.
///

pub struct TaskSupervisor {
    shared: Arc<Shared>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

#[derive(Default)]
struct Shared {
    stopped: Mutex<bool>,
    wakeup: Condvar,
}

impl Shared {
    // Sleep until the interval elapses or shutdown is signalled. Returns
    // false once stopped.
    fn sleep(&self, interval: Duration) -> bool {
        let mut stopped = self.stopped.lock();
        if *stopped {
            return false;
        }
        let _ = self.wakeup.wait_for(&mut stopped, interval);

        !*stopped
    }
}

impl TaskSupervisor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawn one named interval task. The first tick runs after one
    /// interval, not immediately.
    pub fn spawn(
        &self,
        name: impl Into<String>,
        interval_ms: u64,
        task: impl Fn() + Send + 'static,
    ) {
        let name = name.into();
        let shared = self.shared.clone();
        let interval = Duration::from_millis(interval_ms.max(1));

        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                while shared.sleep(interval) {
                    if let Err(payload) = catch_unwind(AssertUnwindSafe(&task)) {
                        let what = payload
                            .downcast_ref::<&str>()
                            .map_or("non-string panic", |s| *s);
                        log::error!("background task '{name}' panicked: {what}");
                    }
                }
            })
            .expect("spawning a named background thread cannot fail");

        self.handles.lock().push(handle);
    }

    /// Signal every task to stop and join them.
    pub fn shutdown(&self) {
        {
            let mut stopped = self.shared.stopped.lock();
            *stopped = true;
        }
        self.shared.wakeup.notify_all();

        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            if handle.join().is_err() {
                log::error!("background task panicked during shutdown");
            }
        }
    }
}

impl Default for TaskSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskSupervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

///
/// TESTS
///
