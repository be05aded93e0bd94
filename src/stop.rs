//! Stop flag for one read-along section.
//!
//! Stopping a section halts its tick subscription and nothing else: ticks are
//! dropped while the flag is raised, committed highlights stay where they are,
//! and seeks, clears and snapshots keep working. The flag is shared, so a
//! signal handler or the section deck can stop playback without owning the
//! session.

use anyhow::{Result, bail};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::debug;

#[derive(Clone, Debug, Default)]
pub struct StopSignal {
    stopped: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            debug!("Read-along ticks stopped");
        }
    }

    pub fn resume(&self) {
        if self.stopped.swap(false, Ordering::AcqRel) {
            debug!("Read-along ticks resumed");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Fail a setup stage that should not start once the section was stopped.
    pub fn ensure_running(&self, stage: &'static str) -> Result<()> {
        if self.is_stopped() {
            bail!("read-along stopped before {stage}");
        }
        Ok(())
    }
}
