//! Store-level integration suites driven through the deterministic
//! harness: end-to-end write/read scenarios, lifecycle paths, repair and
//! polling behavior, concurrency, and property checks.

mod concurrency;
mod lifecycle;
mod poller;
mod properties;
mod reconciler;
mod scenarios;

/// Route `log` output through the test harness; repeat calls are no-ops.
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
