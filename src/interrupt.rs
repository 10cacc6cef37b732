// file: src/interrupt.rs
// description: cooperative ctrl-c handling shared by the resolver and the orchestrator
// reference: https://docs.rs/tokio/latest/tokio/signal/fn.ctrl_c.html

use crate::error::{Result, ZowieError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Pending-interrupt flag. Set from the signal listener, polled at safe points
/// so a channel write in progress always runs to completion.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a task that raises the flag on ctrl-c. Needs a running tokio runtime.
    pub fn listen(&self) {
        let flag = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("Received interrupt signal");
                flag.raise();
            }
        });
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_raised() {
            Err(ZowieError::Interrupted)
        } else {
            Ok(())
        }
    }
}
