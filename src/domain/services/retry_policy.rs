//! Retry Policy
//!
//! 送信結果を分類し、待機・再試行・終了・中断を決定する

use rand::Rng;
use std::time::Duration;

use crate::domain::entities::outcome::{Outcome, Resolution};

pub const DEFAULT_MAX_TRANSIENT_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_RETRY_DELAY_MS: u64 = 1000;
pub const DEFAULT_MAX_RETRY_DELAY_MS: u64 = 32000;
pub const DEFAULT_THROTTLE_JITTER_MS: u64 = 500;

pub const REASON_RETRIES_EXHAUSTED: &str = "transient retries exhausted";

/// Retry configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_transient_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub throttle_jitter_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_transient_retries: DEFAULT_MAX_TRANSIENT_RETRIES,
            initial_delay_ms: DEFAULT_INITIAL_RETRY_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_RETRY_DELAY_MS,
            throttle_jitter_ms: DEFAULT_THROTTLE_JITTER_MS,
        }
    }
}

/// Per-record attempt counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptTracker {
    /// Transient retries consumed so far
    pub transient_retries: u32,
    /// Server-mandated waits; never limited
    pub throttled_waits: u32,
}

/// What to do after an attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Terminal for this record
    Done(Resolution),
    /// Attempt again after `delay`. `throttled` waits apply to every record.
    Wait { delay: Duration, throttled: bool },
    /// Abort the whole run
    Abort(String),
}

/// Calculate retry delay with exponential backoff
pub fn calculate_retry_delay(retry_count: u32, initial_delay_ms: u64, max_delay_ms: u64) -> u64 {
    let shift = retry_count.saturating_sub(1).min(31);
    std::cmp::min(initial_delay_ms.saturating_mul(1u64 << shift), max_delay_ms)
}

#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    settings: RetrySettings,
}

impl RetryPolicy {
    pub fn new(settings: RetrySettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RetrySettings {
        &self.settings
    }

    /// Classify an outcome for one record and advance its tracker
    pub fn decide(&self, outcome: &Outcome, tracker: &mut AttemptTracker) -> RetryDecision {
        match outcome {
            Outcome::Succeeded => RetryDecision::Done(Resolution::Succeeded),
            Outcome::AlreadyExists => RetryDecision::Done(Resolution::AlreadyPresent),
            Outcome::InvalidRemote(reason) => {
                RetryDecision::Done(Resolution::Rejected(reason.clone()))
            }
            Outcome::Throttled(retry_after) => {
                tracker.throttled_waits += 1;
                RetryDecision::Wait {
                    delay: retry_after.saturating_add(self.jitter()),
                    throttled: true,
                }
            }
            Outcome::TransientError(reason) => {
                if tracker.transient_retries >= self.settings.max_transient_retries {
                    return RetryDecision::Done(Resolution::RetriesExhausted(format!(
                        "{} after {} attempts: {}",
                        REASON_RETRIES_EXHAUSTED,
                        tracker.transient_retries + 1,
                        reason
                    )));
                }
                tracker.transient_retries += 1;
                let delay = calculate_retry_delay(
                    tracker.transient_retries,
                    self.settings.initial_delay_ms,
                    self.settings.max_delay_ms,
                );
                RetryDecision::Wait {
                    delay: Duration::from_millis(delay),
                    throttled: false,
                }
            }
            Outcome::FatalAuthError(reason) => RetryDecision::Abort(reason.clone()),
        }
    }

    fn jitter(&self) -> Duration {
        if self.settings.throttle_jitter_ms == 0 {
            return Duration::ZERO;
        }
        let ms = rand::thread_rng().gen_range(0..=self.settings.throttle_jitter_ms);
        Duration::from_millis(ms)
    }
}
