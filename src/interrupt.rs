//! Per-worker cancellation flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable interrupt flag shared between a worker and whoever may cancel it.
///
/// Raising the flag alone does not wake a blocked waiter; the owner of the
/// queue must follow up with [`TaskQueue::wake_all`](crate::task_queue::TaskQueue::wake_all).
#[derive(Clone, Debug, Default)]
pub struct Interrupt {
    raised: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}
