use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{ReclaimError, Result};

/// Cancellation token shared between a caller and a running scan or
/// duplicate search. Cloning shares the same flag.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once [`cancel`](Self::cancel) has been called
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ReclaimError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
