use std::panic::{catch_unwind, AssertUnwindSafe};

/// One-way status callback supplied by the presentation layer.
pub type ProgressFn<'a> = dyn Fn(&str) + Send + Sync + 'a;

/// Fire-and-forget wrapper around a [`ProgressFn`]. A panicking callback is
/// logged and otherwise ignored.
#[derive(Clone, Copy)]
pub struct Progress<'a> {
    callback: &'a ProgressFn<'a>,
}

impl<'a> Progress<'a> {
    pub fn new(callback: &'a ProgressFn<'a>) -> Self {
        Self { callback }
    }

    pub fn report(&self, message: &str) {
        log::info!("📣 {}", message);
        if catch_unwind(AssertUnwindSafe(|| (self.callback)(message))).is_err() {
            log::warn!("Progress callback panicked on '{}'; continuing", message);
        }
    }
}

/// Callback that drops every message.
pub fn silent(_message: &str) {}
