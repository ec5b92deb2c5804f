//! Retry policy declaration and backoff math.
//!
//! Generalized from a single "agent retry" concept to a per-
//! [`crate::plan::PlanStep`] retry budget (default budget 2, backoff
//! `250ms * 2^n` with +-20% jitter capped at 5s).

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Delay strategy between retry attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetryPolicy {
    Fixed {
        delay_ms: u64,
    },
    Linear {
        base_ms: u64,
    },
    /// Exponential backoff capped at `max_ms`, with optional uniform jitter
    /// in `[80%, 120%]` of the capped delay.
    ExponentialBackoff {
        base_ms: u64,
        max_ms: u64,
        jitter: bool,
    },
}

impl RetryPolicy {
    /// The default policy: `250ms * 2^n`, capped at 5s, jittered.
    pub fn step_default() -> Self {
        RetryPolicy::ExponentialBackoff {
            base_ms: 250,
            max_ms: 5_000,
            jitter: true,
        }
    }

    /// Returns the sleep duration before the given retry attempt (0-indexed).
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let ms = match self {
            RetryPolicy::Fixed { delay_ms } => *delay_ms,
            RetryPolicy::Linear { base_ms } => base_ms.saturating_mul((attempt + 1) as u64),
            RetryPolicy::ExponentialBackoff {
                base_ms,
                max_ms,
                jitter,
            } => {
                let exp = 1u64
                    .checked_shl(attempt as u32)
                    .and_then(|s| base_ms.checked_mul(s))
                    .unwrap_or(*max_ms);
                let capped = exp.min(*max_ms);
                if *jitter {
                    let low = capped.saturating_mul(4) / 5; // 80%
                    let high = capped.saturating_mul(6) / 5; // 120%
                    if high <= low {
                        capped
                    } else {
                        rand::thread_rng().gen_range(low..=high).min(*max_ms)
                    }
                } else {
                    capped
                }
            }
        };
        Duration::from_millis(ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::step_default()
    }
}

/// Total attempts and which policy governs the delay between them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts (1 = no retry). The default retry budget is 2
    /// *retries*, i.e. 3 attempts.
    pub max_attempts: usize,
    pub policy: RetryPolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            policy: RetryPolicy::step_default(),
        }
    }
}

impl RetryConfig {
    pub fn with_budget(retry_budget: usize) -> Self {
        Self {
            max_attempts: retry_budget + 1,
            policy: RetryPolicy::step_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_policy_delay_is_constant() {
        let p = RetryPolicy::Fixed { delay_ms: 500 };
        assert_eq!(p.delay_for(0), Duration::from_millis(500));
        assert_eq!(p.delay_for(5), Duration::from_millis(500));
    }

    #[test]
    fn linear_policy_scales_with_attempt() {
        let p = RetryPolicy::Linear { base_ms: 200 };
        assert_eq!(p.delay_for(0), Duration::from_millis(200));
        assert_eq!(p.delay_for(2), Duration::from_millis(600));
    }

    #[test]
    fn exponential_without_jitter_matches_closed_form() {
        let p = RetryPolicy::ExponentialBackoff {
            base_ms: 250,
            max_ms: 5_000,
            jitter: false,
        };
        assert_eq!(p.delay_for(0), Duration::from_millis(250));
        assert_eq!(p.delay_for(1), Duration::from_millis(500));
        assert_eq!(p.delay_for(4), Duration::from_millis(4_000));
        assert_eq!(p.delay_for(10), Duration::from_millis(5_000)); // capped
    }

    #[test]
    fn jitter_never_exceeds_the_cap() {
        let p = RetryPolicy::ExponentialBackoff {
            base_ms: 250,
            max_ms: 5_000,
            jitter: true,
        };
        for attempt in 0..12 {
            let delay = p.delay_for(attempt).as_millis();
            assert!(delay <= 5_000, "attempt {attempt}: delay {delay}ms > cap");
        }
    }

    #[test]
    fn with_budget_adds_one_for_the_initial_attempt() {
        let cfg = RetryConfig::with_budget(2);
        assert_eq!(cfg.max_attempts, 3);
    }
}
