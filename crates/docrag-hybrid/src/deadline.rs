//! Per-query deadline, checked at step boundaries.
//!
//! Retrieval is a handful of pure in-memory computations; instead of async
//! cancellation the engine checks the deadline after each major step
//! (lexical search, dense search, fusion) and aborts with
//! `Error::Cancelled` before doing further wasted work.

use std::time::{Duration, Instant};

use docrag_core::error::{Error, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// No deadline; `check` always succeeds.
    pub fn none() -> Self {
        Self { at: None }
    }

    pub fn within(budget: Duration) -> Self {
        Self {
            at: Some(Instant::now() + budget),
        }
    }

    pub fn at(instant: Instant) -> Self {
        Self { at: Some(instant) }
    }

    /// Config convenience: 0 milliseconds disables the deadline.
    pub fn from_timeout_ms(ms: u64) -> Self {
        if ms == 0 {
            Self::none()
        } else {
            Self::within(Duration::from_millis(ms))
        }
    }

    pub fn expired(&self) -> bool {
        self.at.map_or(false, |at| Instant::now() >= at)
    }

    pub fn check(&self) -> Result<()> {
        if self.expired() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}
