//! Per-thread reentrancy tracking for runtime callback handlers
//!
//! Callback code paths that call back into profiler-instrumented APIs
//! must not be measured again. Each callback thread owns one
//! [`ThreadContext`]; entering an internal region hands out an RAII
//! scope, and a nested attempt on the same context is refused.

use std::cell::Cell;

/// Per-thread profiler state. Not `Sync`; one per callback thread,
/// passed explicitly rather than kept in ambient thread-local storage.
#[derive(Debug, Default)]
pub struct ThreadContext {
    internal: Cell<bool>,
}

impl ThreadContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the thread is currently inside an internal region.
    pub fn is_internal(&self) -> bool {
        self.internal.get()
    }

    /// Enter an internal region, or `None` when already inside one.
    pub fn enter_internal(&self) -> Option<InternalScope<'_>> {
        if self.internal.get() {
            return None;
        }
        self.internal.set(true);
        Some(InternalScope { ctx: self })
    }
}

/// RAII guard marking the owning thread as internal until dropped
#[derive(Debug)]
pub struct InternalScope<'a> {
    ctx: &'a ThreadContext,
}

impl Drop for InternalScope<'_> {
    fn drop(&mut self) {
        self.ctx.internal.set(false);
    }
}
