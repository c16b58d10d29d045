//! Rate budget tracking.
//!
//! The platform reports, on every response, how many requests remain in the
//! current window and when the window resets. [`RateBudget`] keeps the latest
//! report and suspends request issuance once the remaining quota reaches a
//! safety floor, resuming only after the reported reset time. One instance is
//! shared by every worker that uses the same credential.

mod pacer;
mod registry;

pub use pacer::RequestPacer;
pub use registry::BudgetRegistry;

use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

const DEFAULT_JITTER: Duration = Duration::from_millis(1000);

#[derive(Debug, Default)]
struct BudgetState {
    remaining: Option<u32>,
    reset_at: Option<DateTime<Utc>>,
    /// Earliest instant new requests may be issued.
    resume_at: Option<Instant>,
}

/// Snapshot of the last observed quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetSnapshot {
    pub remaining: Option<u32>,
    pub reset_at: Option<DateTime<Utc>>,
}

/// Shared gate over the platform's request quota.
#[derive(Debug)]
pub struct RateBudget {
    state: Mutex<BudgetState>,
    floor: u32,
    max_jitter: Duration,
    pacer: Option<RequestPacer>,
}

impl RateBudget {
    /// Create a tracker that stops issuing at `floor` remaining requests.
    pub fn new(floor: u32) -> Self {
        Self {
            state: Mutex::new(BudgetState::default()),
            floor,
            max_jitter: DEFAULT_JITTER,
            pacer: None,
        }
    }

    /// Override the random delay added after a reset.
    pub fn with_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    /// Add local requests-per-second pacing.
    pub fn with_pacer(mut self, pacer: Option<RequestPacer>) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn floor(&self) -> u32 {
        self.floor
    }

    /// Whether a request may be issued right now.
    pub fn can_proceed(&self) -> bool {
        let state = self.lock();
        match state.resume_at {
            Some(resume_at) => Instant::now() >= resume_at,
            None => true,
        }
    }

    /// Record the quota reported by a response.
    pub fn record_response(&self, remaining: u32, reset_at: DateTime<Utc>) {
        let mut state = self.lock();
        state.remaining = Some(remaining);
        state.reset_at = Some(reset_at);

        if remaining > self.floor {
            state.resume_at = None;
            return;
        }

        let until_reset = (reset_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        let resume_at = Instant::now() + until_reset + self.jitter();
        // Concurrent responses may report the same window; keep the later deadline.
        state.resume_at = Some(match state.resume_at {
            Some(existing) if existing > resume_at => existing,
            _ => resume_at,
        });
        debug!(remaining, floor = self.floor, %reset_at, "rate budget at floor");
    }

    /// Suspend until the quota window has reset and pacing allows a request.
    pub async fn wait_if_needed(&self) {
        loop {
            let resume_at = self.lock().resume_at;
            match resume_at {
                Some(deadline) if Instant::now() < deadline => {
                    info!(
                        wait_secs = (deadline - Instant::now()).as_secs(),
                        "rate budget exhausted, waiting for reset"
                    );
                    sleep_until(deadline).await;
                }
                Some(deadline) => {
                    let mut state = self.lock();
                    if state.resume_at == Some(deadline) {
                        state.resume_at = None;
                        state.remaining = None;
                    }
                    break;
                }
                None => break,
            }
        }

        if let Some(pacer) = &self.pacer {
            pacer.wait().await;
        }
    }

    pub fn snapshot(&self) -> BudgetSnapshot {
        let state = self.lock();
        BudgetSnapshot {
            remaining: state.remaining,
            reset_at: state.reset_at,
        }
    }

    fn jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BudgetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
