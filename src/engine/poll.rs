//! Polling for transaction finality, with backoff, timeout and cancellation.

use crate::error::AbandonReason;
use crate::gateway::{NodeGateway, TransactionStatus};
use crate::{ClientError, Result, Step};
use std::future::pending;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Pacing between `getTransaction` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    /// Doubles after every transient result, capped at `max`.
    Exponential { initial: Duration, max: Duration },
}

impl Backoff {
    fn initial(&self) -> Duration {
        match self {
            Backoff::Fixed(d) => *d,
            Backoff::Exponential { initial, .. } => *initial,
        }
    }

    fn next(&self, current: Duration) -> Duration {
        match self {
            Backoff::Fixed(d) => *d,
            Backoff::Exponential { max, .. } => current.saturating_mul(2).min(*max),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub backoff: Backoff,
    /// Give up and report an unknown outcome after this long. `None` polls
    /// until a terminal status or cancellation.
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            backoff: Backoff::Fixed(Duration::from_secs(1)),
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Caller-held side of a cancellation signal.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

/// Cancellation signal observed by the engine at every suspension point.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    rx: Option<watch::Receiver<bool>>,
}

impl Cancellation {
    pub fn new() -> (CancelHandle, Self) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle(tx), Self { rx: Some(rx) })
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Resolves once cancellation is requested. A dropped handle means
    /// cancellation can no longer happen.
    pub async fn cancelled(&self) {
        let Some(rx) = &self.rx else {
            return pending().await;
        };
        let mut rx = rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return pending().await;
            }
        }
    }
}

/// Terminal status plus the number of `poll_status` calls made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollResult {
    pub status: TransactionStatus,
    pub attempts: u32,
}

/// Poll `hash` until the node reports `Success` or `Failed`.
///
/// The first poll happens immediately. `NotFound`/`Pending` lead to another
/// poll after the backoff delay. Timeout and cancellation end in
/// `UnknownOutcome`, since the transaction may still be applied.
pub async fn poll_until_final(
    gateway: &dyn NodeGateway,
    hash: &str,
    policy: &PollPolicy,
    cancel: &Cancellation,
) -> Result<PollResult> {
    let started = Instant::now();
    let deadline = policy.timeout.map(|t| started + t);
    let unknown = |reason| ClientError::UnknownOutcome {
        hash: hash.to_string(),
        reason,
    };

    let mut delay = policy.backoff.initial();
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(unknown(AbandonReason::Cancelled)),
            res = gateway.poll_status(hash) => res.map_err(|e| e.after_submit(Step::Poll, hash))?,
        };

        if status.is_terminal() {
            debug!(hash, attempts, "Transaction reached a terminal status");
            return Ok(PollResult { status, attempts });
        }
        debug!(hash, attempts, status = ?status, "Transaction not final yet");

        let mut wait = delay;
        if let Some(deadline) = deadline {
            let now = Instant::now();
            if now >= deadline {
                warn!(hash, attempts, "Gave up polling transaction");
                return Err(unknown(AbandonReason::Timeout(now - started)));
            }
            wait = wait.min(deadline - now);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(unknown(AbandonReason::Cancelled)),
            _ = sleep(wait) => {}
        }
        delay = policy.backoff.next(delay);
    }
}
