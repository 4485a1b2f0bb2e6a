use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Shared flag that asks a running backup to stop at the next step boundary.
///
/// The online copy loop polls this between steps; the vacuum strategy is a
/// single engine statement and only observes cancellation once it returns.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
