// LogDigest - core/retry.rs
//
// Bounded retry policy, decoupled from whatever is being retried.
//
// The caller supplies the attempt (attempt number -> Result) and a classifier
// deciding, per error, whether another attempt is worthwhile. Attempts run
// strictly one after another.

use std::time::Duration;

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// The failure may be transient; try again if attempts remain.
    Retry,

    /// The failure is permanent; stop immediately.
    Abort,
}

/// Attempt cap and pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,

    /// Pause after a retryable failure, before the next attempt.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

/// Final result of a retried operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T, E> {
    /// An attempt succeeded; later attempts were not made.
    Succeeded { value: T, attempts: u32 },

    /// Every attempt failed with a retryable error.
    Exhausted { error: E, attempts: u32 },

    /// An attempt failed with an error classified as `Abort`.
    Aborted { error: E, attempts: u32 },
}

impl<T, E> RetryOutcome<T, E> {
    /// Number of attempts actually made.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::Aborted { attempts, .. } => *attempts,
        }
    }
}

/// Run `attempt` until it succeeds, the classifier aborts, or the attempt cap
/// is reached. `attempt` receives the 1-based attempt number.
pub fn run_with_retry<T, E, F, C>(policy: &RetryPolicy, mut attempt: F, classify: C) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Result<T, E>,
    C: Fn(&E) -> RetryDecision,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut n = 1;
    loop {
        match attempt(n) {
            Ok(value) => return RetryOutcome::Succeeded { value, attempts: n },
            Err(error) => {
                if classify(&error) == RetryDecision::Abort {
                    return RetryOutcome::Aborted { error, attempts: n };
                }
                if n >= max_attempts {
                    return RetryOutcome::Exhausted { error, attempts: n };
                }
                tracing::debug!(attempt = n, max_attempts, "Attempt failed, retrying");
                if !policy.delay.is_zero() {
                    std::thread::sleep(policy.delay);
                }
                n += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    enum TestErr {
        Timeout,
        Auth,
    }

    fn classify(e: &TestErr) -> RetryDecision {
        match e {
            TestErr::Timeout => RetryDecision::Retry,
            TestErr::Auth => RetryDecision::Abort,
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::ZERO)
    }

    #[test]
    fn test_first_success_short_circuits() {
        let mut calls = 0;
        let outcome = run_with_retry(
            &policy(),
            |_| {
                calls += 1;
                Ok::<_, TestErr>("sent")
            },
            classify,
        );
        assert_eq!(outcome, RetryOutcome::Succeeded { value: "sent", attempts: 1 });
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_succeeds_on_third_attempt() {
        let outcome = run_with_retry(
            &policy(),
            |n| if n < 3 { Err(TestErr::Timeout) } else { Ok(n) },
            classify,
        );
        assert_eq!(outcome, RetryOutcome::Succeeded { value: 3, attempts: 3 });
    }

    #[test]
    fn test_exhausts_after_cap() {
        let mut calls = 0;
        let outcome: RetryOutcome<(), _> = run_with_retry(
            &policy(),
            |_| {
                calls += 1;
                Err(TestErr::Timeout)
            },
            classify,
        );
        assert_eq!(outcome, RetryOutcome::Exhausted { error: TestErr::Timeout, attempts: 3 });
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_abort_stops_immediately() {
        let mut calls = 0;
        let outcome: RetryOutcome<(), _> = run_with_retry(
            &policy(),
            |_| {
                calls += 1;
                Err(TestErr::Auth)
            },
            classify,
        );
        assert_eq!(outcome.attempts(), 1);
        assert!(matches!(outcome, RetryOutcome::Aborted { error: TestErr::Auth, .. }));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_zero_max_attempts_still_tries_once() {
        let outcome: RetryOutcome<(), _> = run_with_retry(
            &RetryPolicy::new(0, Duration::ZERO),
            |_| Err(TestErr::Timeout),
            classify,
        );
        assert_eq!(outcome.attempts(), 1);
    }
}
