//! Retry executor for LLM calls.
//!
//! Attempts run strictly sequentially as an explicit state machine
//! (`Attempting → Waiting → Attempting → …`) so the wait schedule is a
//! property of the policy, not of scattered sleeps. The sleep function is
//! injected, which lets tests observe exact delays without real time passing.
//!
//! Client faults (classified 400/401/403) are re-raised immediately:
//! retrying a malformed request or a bad credential cannot succeed.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::llm_client::classify::classify_error;
use crate::llm_client::LlmError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry that follows `attempt` (1-based):
    /// `base_delay × 2^(attempt−1)`, i.e. 1s, 2s, 4s for the defaults.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * (1u32 << attempt.saturating_sub(1).min(31))
    }
}

enum RetryState {
    Attempting { attempt: u32 },
    Waiting { attempt: u32, delay: Duration },
}

/// Runs `op` under `policy`, sleeping with `tokio::time::sleep` between
/// attempts. Re-raises the final error when attempts are exhausted.
pub async fn run<T, Op, Fut>(policy: &RetryPolicy, op: Op) -> Result<T, LlmError>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    run_with_sleep(policy, op, tokio::time::sleep).await
}

/// Same as [`run`] but with an injected sleep function.
pub async fn run_with_sleep<T, Op, Fut, Sl, SlFut>(
    policy: &RetryPolicy,
    mut op: Op,
    mut sleep: Sl,
) -> Result<T, LlmError>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
    Sl: FnMut(Duration) -> SlFut,
    SlFut: Future<Output = ()>,
{
    let mut state = RetryState::Attempting { attempt: 1 };

    loop {
        match state {
            RetryState::Attempting { attempt } => match op().await {
                Ok(value) => {
                    debug!(attempt, "LLM attempt succeeded");
                    return Ok(value);
                }
                Err(error) => {
                    warn!(attempt, %error, "LLM attempt failed");

                    if classify_error(&error).kind.is_client_fault() {
                        return Err(error);
                    }
                    if attempt >= policy.max_attempts {
                        return Err(error);
                    }

                    state = RetryState::Waiting {
                        attempt,
                        delay: policy.delay_after(attempt),
                    };
                }
            },
            RetryState::Waiting { attempt, delay } => {
                debug!(delay_ms = delay.as_millis() as u64, "waiting before retry");
                sleep(delay).await;
                state = RetryState::Attempting {
                    attempt: attempt + 1,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::classify::{classify_error, ErrorKind};
    use std::sync::{Arc, Mutex};

    fn recording_sleep(
        sleeps: &Arc<Mutex<Vec<Duration>>>,
    ) -> impl FnMut(Duration) -> std::future::Ready<()> {
        let sleeps = sleeps.clone();
        move |d| {
            sleeps.lock().unwrap().push(d);
            std::future::ready(())
        }
    }

    /// Fails with `error_for(n)` until attempt `succeed_on`, then returns "ok".
    fn flaky_op(
        attempts: &Arc<Mutex<u32>>,
        succeed_on: u32,
        error_for: impl Fn(u32) -> LlmError + 'static,
    ) -> impl FnMut() -> std::future::Ready<Result<&'static str, LlmError>> {
        let attempts = attempts.clone();
        move || {
            let mut n = attempts.lock().unwrap();
            *n += 1;
            let result = if *n >= succeed_on {
                Ok("ok")
            } else {
                Err(error_for(*n))
            };
            std::future::ready(result)
        }
    }

    fn api_error(status: u16, message: &str) -> LlmError {
        LlmError::Api {
            status,
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_attempt_success_has_no_waits() {
        let attempts = Arc::new(Mutex::new(0));
        let sleeps = Arc::new(Mutex::new(Vec::new()));

        let result = run_with_sleep(
            &RetryPolicy::default(),
            flaky_op(&attempts, 1, |_| unreachable!()),
            recording_sleep(&sleeps),
        )
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(*attempts.lock().unwrap(), 1);
        assert!(sleeps.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transient_failures_then_success_waits_doubling() {
        // 503 twice, success on the third attempt: waits of 1000ms then 2000ms.
        let attempts = Arc::new(Mutex::new(0));
        let sleeps = Arc::new(Mutex::new(Vec::new()));

        let result = run_with_sleep(
            &RetryPolicy::default(),
            flaky_op(&attempts, 3, |_| api_error(503, "503 Service Unavailable")),
            recording_sleep(&sleeps),
        )
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(*attempts.lock().unwrap(), 3);
        assert_eq!(
            *sleeps.lock().unwrap(),
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );
    }

    #[tokio::test]
    async fn test_rate_limited_exhausts_attempts_and_reraises() {
        let attempts = Arc::new(Mutex::new(0));
        let sleeps = Arc::new(Mutex::new(Vec::new()));

        let result: Result<&str, _> = run_with_sleep(
            &RetryPolicy::default(),
            flaky_op(&attempts, u32::MAX, |_| api_error(429, "Too Many Requests")),
            recording_sleep(&sleeps),
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 429, .. }));
        assert_eq!(*attempts.lock().unwrap(), 3);
        // Waits happen between attempts only, never after the last one.
        assert_eq!(
            *sleeps.lock().unwrap(),
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );
    }

    #[tokio::test]
    async fn test_auth_error_makes_exactly_one_attempt() {
        let attempts = Arc::new(Mutex::new(0));
        let sleeps = Arc::new(Mutex::new(Vec::new()));

        let result: Result<&str, _> = run_with_sleep(
            &RetryPolicy::default(),
            flaky_op(&attempts, u32::MAX, |_| api_error(401, "Invalid API key")),
            recording_sleep(&sleeps),
        )
        .await;

        let err = result.unwrap_err();
        assert_eq!(classify_error(&err).status, 401);
        assert_eq!(*attempts.lock().unwrap(), 1);
        assert!(sleeps.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_api_key_message_without_status_is_terminal() {
        // No structured status; the "API key" substring alone marks it a client fault.
        let attempts = Arc::new(Mutex::new(0));
        let sleeps = Arc::new(Mutex::new(Vec::new()));

        let result: Result<&str, _> = run_with_sleep(
            &RetryPolicy::default(),
            flaky_op(&attempts, u32::MAX, |_| LlmError::Api {
                status: 500,
                message: "API key not valid".to_string(),
            }),
            recording_sleep(&sleeps),
        )
        .await;

        // Ordered rules: 500 has no status rule, but "API key" matches Auth.
        assert_eq!(classify_error(&result.unwrap_err()).kind, ErrorKind::Auth);
        assert_eq!(*attempts.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_error_is_treated_as_transient() {
        let attempts = Arc::new(Mutex::new(0));
        let sleeps = Arc::new(Mutex::new(Vec::new()));

        let result: Result<&str, _> = run_with_sleep(
            &RetryPolicy::default(),
            flaky_op(&attempts, u32::MAX, |_| LlmError::Api {
                status: 500,
                message: "unexpected token".to_string(),
            }),
            recording_sleep(&sleeps),
        )
        .await;

        let err = result.unwrap_err();
        assert_eq!(classify_error(&err).status, 500);
        assert_eq!(*attempts.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_single_attempt_policy_never_waits() {
        let policy = RetryPolicy {
            max_attempts: 1,
            base_delay: Duration::from_millis(1000),
        };
        let attempts = Arc::new(Mutex::new(0));
        let sleeps = Arc::new(Mutex::new(Vec::new()));

        let result: Result<&str, _> = run_with_sleep(
            &policy,
            flaky_op(&attempts, u32::MAX, |_| api_error(503, "503")),
            recording_sleep(&sleeps),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(*attempts.lock().unwrap(), 1);
        assert!(sleeps.lock().unwrap().is_empty());
    }

    #[test]
    fn test_delay_schedule_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(4000));
    }
}
