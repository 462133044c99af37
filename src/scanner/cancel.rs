use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Run-wide cancellation flag, shared by the signal handler, the
/// orchestrator and running clones
#[derive(Clone, Default, Debug)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
