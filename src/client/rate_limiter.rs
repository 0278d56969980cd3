//! Rate Limiting
//!
//! Client-side admission control over a sliding 60 second window, with
//! retry and exponential backoff for too-many-requests failures.

use crate::config::RateLimitPolicy;
use crate::error::{Result, WacloudError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Length of the sliding admission window
pub const WINDOW: Duration = Duration::from_secs(60);

/// Upper bound on the window buffer allocated up front
const INITIAL_CAPACITY: usize = 1024;

/// Gates outbound calls through a sliding window and a retry policy.
///
/// Each limiter owns its own window; limiters never share state.
#[derive(Debug)]
pub struct RateLimiter {
    policy: RateLimitPolicy,

    /// Admission instants, oldest first. Calls in flight hold a reserved
    /// entry until they settle.
    admitted: Mutex<VecDeque<Instant>>,

    /// Wakes waiters when a reserved slot is given back
    released: Notify,
}

/// Retry bookkeeping for one logical call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    /// Too-many-requests failures seen so far
    pub failures: u32,

    /// Delay suggested by the provider on the latest failure
    pub retry_after: Option<Duration>,
}

impl RetryState {
    /// Record a too-many-requests failure
    pub fn record_failure(&mut self, error: &WacloudError) {
        self.failures += 1;
        self.retry_after = error.retry_after();
    }

    /// Delay before the next attempt: the provider's suggestion (or `base`)
    /// doubled for every earlier failure
    pub fn backoff_delay(&self, base: Duration) -> Duration {
        let seed = self.retry_after.unwrap_or(base);
        let exponent = self.failures.saturating_sub(1).min(31);
        seed.saturating_mul(1u32 << exponent)
    }
}

impl RateLimiter {
    /// Create a limiter; a ceiling of zero is rejected
    pub fn new(policy: RateLimitPolicy) -> Result<Self> {
        policy.validate()?;

        Ok(Self {
            admitted: Mutex::new(VecDeque::with_capacity(
                (policy.max_requests_per_minute as usize).min(INITIAL_CAPACITY),
            )),
            released: Notify::new(),
            policy,
        })
    }

    /// Get the policy
    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Number of admissions inside the current window, including calls
    /// still in flight
    pub fn admitted_in_window(&self) -> usize {
        let mut admitted = self.admitted.lock();
        prune(&mut admitted, Instant::now());
        admitted.len()
    }

    /// Run `operation` under admission control.
    ///
    /// Waits for room in the window, runs the call, and retries
    /// too-many-requests failures with backoff until the retry budget is
    /// spent. Other failures are returned on the first attempt.
    ///
    /// A slot is held from admission until the call settles and is given
    /// back if the attempt fails or is dropped, so only successful calls
    /// stay in the window.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retry = RetryState::default();

        loop {
            let slot = self.acquire().await;

            let err = match operation().await {
                Ok(value) => {
                    slot.commit();
                    return Ok(value);
                }
                Err(err) if err.is_too_many_requests() => err,
                Err(err) => return Err(err),
            };
            drop(slot);

            retry.record_failure(&err);

            if !self.policy.retry_on_too_many_requests || retry.failures > self.policy.max_retries
            {
                return Err(WacloudError::RateLimited {
                    attempts: retry.failures,
                    last: Box::new(err),
                });
            }

            let delay = retry.backoff_delay(self.policy.retry_delay());
            warn!(
                attempt = retry.failures,
                max_retries = self.policy.max_retries,
                ?delay,
                "Rate limited, backing off before retry"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Sleep until the window has room, then reserve a slot in the same
    /// critical section as the count check
    async fn acquire(&self) -> Slot<'_> {
        loop {
            let (wait, released) = {
                let mut admitted = self.admitted.lock();
                let now = Instant::now();
                prune(&mut admitted, now);

                if admitted.len() < self.policy.max_requests_per_minute as usize {
                    admitted.push_back(now);
                    return Slot {
                        limiter: self,
                        at: now,
                        committed: false,
                    };
                }

                let wait = admitted
                    .front()
                    .map(|oldest| WINDOW.saturating_sub(now.duration_since(*oldest)))
                    .unwrap_or_default();

                // Registered under the lock so a concurrent release is not missed
                (wait, self.released.notified())
            };

            if !wait.is_zero() {
                debug!(?wait, "Admission window full");
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = released => {}
                }
            }
        }
    }

    fn release(&self, at: Instant) {
        let mut admitted = self.admitted.lock();
        if let Some(pos) = admitted.iter().rposition(|t| *t == at) {
            admitted.remove(pos);
            drop(admitted);
            self.released.notify_waiters();
        }
    }
}

/// A reserved place in the admission window
struct Slot<'a> {
    limiter: &'a RateLimiter,
    at: Instant,
    committed: bool,
}

impl Slot<'_> {
    /// Keep the reservation as a recorded admission
    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.limiter.release(self.at);
        }
    }
}

/// Drop admissions that are at least one window old
fn prune(admitted: &mut VecDeque<Instant>, now: Instant) {
    while let Some(oldest) = admitted.front() {
        if now.duration_since(*oldest) >= WINDOW {
            admitted.pop_front();
        } else {
            break;
        }
    }
}

/// Parse a `Retry-After` value: plain seconds, or a duration string like
/// `"1m30s"`, `"2h"` or `"500ms"`
pub fn parse_retry_after(s: &str) -> Option<Duration> {
    let s = s.trim();

    if let Ok(secs) = s.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    // Handle milliseconds first
    if let Some(stripped) = s.strip_suffix("ms") {
        return stripped.parse::<u64>().ok().map(Duration::from_millis);
    }

    // Compound forms such as "1m30s" or "2h30m"
    if s.contains('h') || (s.contains('m') && s.contains('s')) {
        let mut total_secs = 0u64;
        let mut current_num = String::new();

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_num.push(c);
            } else if !current_num.is_empty() {
                if let Ok(n) = current_num.parse::<u64>() {
                    match c {
                        'h' => total_secs += n * 3600,
                        'm' => total_secs += n * 60,
                        's' => total_secs += n,
                        _ => {}
                    }
                }
                current_num.clear();
            }
        }

        if total_secs > 0 {
            return Some(Duration::from_secs(total_secs));
        }
    }

    if let Some(stripped) = s.strip_suffix('s') {
        return stripped
            .parse::<f64>()
            .ok()
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(Duration::from_secs_f64);
    }
    if let Some(stripped) = s.strip_suffix('m') {
        return stripped
            .parse::<u64>()
            .ok()
            .map(|mins| Duration::from_secs(mins * 60));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn policy(max_requests_per_minute: u32) -> RateLimitPolicy {
        RateLimitPolicy {
            max_requests_per_minute,
            ..Default::default()
        }
    }

    fn too_many_requests() -> WacloudError {
        WacloudError::Provider {
            status: 400,
            error: ProviderError::new("OAuthException", 4, "Application request limit reached"),
            retry_after: None,
        }
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after("7"), Some(Duration::from_secs(7)));
        assert_eq!(parse_retry_after("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_retry_after("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_retry_after("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_retry_after("1m30s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_retry_after("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_retry_after("soon"), None);
    }

    #[test]
    fn test_zero_ceiling_rejected() {
        let err = RateLimiter::new(policy(0)).unwrap_err();
        assert!(matches!(err, WacloudError::Config(_)));
    }

    #[test]
    fn test_backoff_delay_doubles() {
        let base = Duration::from_millis(1000);
        let mut state = RetryState::default();
        let err = too_many_requests();

        let mut delays = Vec::new();
        for _ in 0..3 {
            state.record_failure(&err);
            delays.push(state.backoff_delay(base));
        }

        assert_eq!(
            delays,
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(2000),
                Duration::from_millis(4000)
            ]
        );
    }

    #[test]
    fn test_backoff_seeded_by_provider_delay() {
        let err = WacloudError::Http {
            status: 429,
            body: String::new(),
            retry_after: Some(Duration::from_secs(3)),
        };
        let mut state = RetryState::default();
        state.record_failure(&err);
        state.record_failure(&err);

        assert_eq!(
            state.backoff_delay(Duration::from_millis(1000)),
            Duration::from_secs(6)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sliding_window_delays_call_over_ceiling() {
        let limiter = RateLimiter::new(policy(2)).unwrap();
        let start = Instant::now();

        let mut admitted_at = Vec::new();
        for _ in 0..3 {
            limiter
                .execute(|| async { Ok::<_, WacloudError>(()) })
                .await
                .unwrap();
            admitted_at.push(start.elapsed());
        }

        assert!(admitted_at[0] < Duration::from_secs(1));
        assert!(admitted_at[1] < Duration::from_secs(1));
        assert!(admitted_at[2] >= WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_over_ceiling_stays_pending_until_window_slides() {
        use tokio_test::{assert_pending, assert_ready_ok, task};

        let limiter = RateLimiter::new(policy(1)).unwrap();
        limiter
            .execute(|| async { Ok::<_, WacloudError>(()) })
            .await
            .unwrap();

        let mut blocked = task::spawn(limiter.execute(|| async { Ok::<_, WacloudError>(()) }));
        assert_pending!(blocked.poll());

        tokio::time::advance(WINDOW - Duration::from_secs(1)).await;
        assert_pending!(blocked.poll());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(blocked.is_woken());
        assert_ready_ok!(blocked.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_forgets_old_admissions() {
        let limiter = RateLimiter::new(policy(5)).unwrap();
        for _ in 0..3 {
            limiter
                .execute(|| async { Ok::<_, WacloudError>(()) })
                .await
                .unwrap();
        }
        assert_eq!(limiter.admitted_in_window(), 3);

        tokio::time::advance(WINDOW).await;
        assert_eq!(limiter.admitted_in_window(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_ceiling_and_backoff_schedule() {
        let limiter = RateLimiter::new(policy(250)).unwrap();
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let start = Instant::now();

        let result: Result<()> = limiter
            .execute(|| {
                let attempts = attempts.clone();
                async move {
                    attempts.lock().push(start.elapsed());
                    Err(too_many_requests())
                }
            })
            .await;

        let attempts = attempts.lock().clone();
        assert_eq!(attempts.len(), 4);

        // 1s, 2s, 4s between attempts
        let gaps: Vec<_> = attempts.windows(2).map(|w| w[1] - w[0]).collect();
        for (gap, expected) in gaps.iter().zip([1u64, 2, 4]) {
            let expected = Duration::from_secs(expected);
            assert!(*gap >= expected, "gap {:?} shorter than {:?}", gap, expected);
            assert!(*gap < expected + Duration::from_millis(50));
        }

        match result {
            Err(WacloudError::RateLimited { attempts, last }) => {
                assert_eq!(attempts, 4);
                assert_eq!(last.provider_error().map(|e| e.code), Some(4));
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_fails_immediately() {
        let limiter = RateLimiter::new(policy(250)).unwrap();
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<()> = limiter
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(WacloudError::Provider {
                        status: 401,
                        error: ProviderError::new("OAuthException", 190, "Invalid token"),
                        retry_after: None,
                    })
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(matches!(result, Err(WacloudError::Provider { .. })));
        assert_eq!(limiter.admitted_in_window(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_disabled_surfaces_first_rate_limit() {
        let limiter = RateLimiter::new(RateLimitPolicy {
            retry_on_too_many_requests: false,
            ..Default::default()
        })
        .unwrap();
        let calls = AtomicU32::new(0);

        let result: Result<()> = limiter
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(too_many_requests()) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            result,
            Err(WacloudError::RateLimited { attempts: 1, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_rate_limit() {
        let limiter = RateLimiter::new(policy(250)).unwrap();
        let calls = AtomicU32::new(0);

        let result = limiter
            .execute(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(too_many_requests())
                    } else {
                        Ok("wamid.123")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "wamid.123");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(limiter.admitted_in_window(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_calls_share_one_window() {
        let limiter = Arc::new(RateLimiter::new(policy(3)).unwrap());
        let start = Instant::now();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    limiter
                        .execute(|| async { Ok::<_, WacloudError>(()) })
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(limiter.admitted_in_window(), 3);

        limiter
            .execute(|| async { Ok::<_, WacloudError>(()) })
            .await
            .unwrap();
        assert!(start.elapsed() >= WINDOW);
    }

    /// Spawn `calls` concurrent executions whose operations note their
    /// start time and then take `busy` to finish
    fn spawn_busy_calls(
        limiter: &Arc<RateLimiter>,
        calls: usize,
        busy: Duration,
        start: Instant,
    ) -> (Vec<tokio::task::JoinHandle<Result<()>>>, Arc<Mutex<Vec<Duration>>>) {
        let started = Arc::new(Mutex::new(Vec::new()));

        let handles = (0..calls)
            .map(|_| {
                let limiter = limiter.clone();
                let started = started.clone();
                tokio::spawn(async move {
                    limiter
                        .execute(|| {
                            let started = started.clone();
                            async move {
                                started.lock().push(start.elapsed());
                                tokio::time::sleep(busy).await;
                                Ok::<_, WacloudError>(())
                            }
                        })
                        .await
                })
            })
            .collect();

        (handles, started)
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_calls_at_once_respect_ceiling() {
        let limiter = Arc::new(RateLimiter::new(policy(2)).unwrap());
        let start = Instant::now();

        let (handles, started) =
            spawn_busy_calls(&limiter, 3, Duration::from_millis(100), start);
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut started = started.lock().clone();
        started.sort();
        assert_eq!(started.len(), 3);
        assert!(started[0] < Duration::from_secs(1));
        assert!(started[1] < Duration::from_secs(1));
        assert!(started[2] >= WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_calls_occupy_the_window() {
        let limiter = Arc::new(RateLimiter::new(policy(2)).unwrap());
        let start = Instant::now();

        let (_handles, _) = spawn_busy_calls(&limiter, 2, Duration::from_secs(5), start);
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(10)).await;

        assert_eq!(limiter.admitted_in_window(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiters_woken_together_admit_only_ceiling() {
        let limiter = Arc::new(RateLimiter::new(policy(2)).unwrap());
        let start = Instant::now();

        // Fill the window at t=0, then queue four more behind it
        let (first, _) = spawn_busy_calls(&limiter, 2, Duration::from_millis(100), start);
        for handle in first {
            handle.await.unwrap().unwrap();
        }
        let (waiters, started) =
            spawn_busy_calls(&limiter, 4, Duration::from_millis(100), start);
        for handle in waiters {
            handle.await.unwrap().unwrap();
        }

        let mut started = started.lock().clone();
        started.sort();
        let in_first_slide = started
            .iter()
            .filter(|t| **t >= WINDOW && **t < WINDOW * 2)
            .count();
        assert_eq!(in_first_slide, 2);
        assert!(started[2] >= WINDOW * 2);
        assert!(started[3] >= WINDOW * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_call_gives_back_its_slot() {
        let limiter = Arc::new(RateLimiter::new(policy(1)).unwrap());
        let start = Instant::now();

        let failing = {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                limiter
                    .execute(|| async {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Err::<(), _>(WacloudError::Request("connection reset".to_string()))
                    })
                    .await
            })
        };
        tokio::task::yield_now().await;

        let (next, started) = spawn_busy_calls(&limiter, 1, Duration::ZERO, start);
        assert!(failing.await.unwrap().is_err());
        for handle in next {
            handle.await.unwrap().unwrap();
        }

        // Admitted as soon as the failed call released its slot
        assert!(started.lock()[0] < Duration::from_secs(1));
        assert_eq!(limiter.admitted_in_window(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_call_gives_back_its_slot() {
        let limiter = RateLimiter::new(policy(1)).unwrap();

        let cancelled = tokio::time::timeout(
            Duration::from_millis(10),
            limiter.execute(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, WacloudError>(())
            }),
        )
        .await;

        assert!(cancelled.is_err());
        assert_eq!(limiter.admitted_in_window(), 0);
    }

    #[test]
    fn test_huge_ceiling_does_not_preallocate() {
        let limiter = RateLimiter::new(policy(u32::MAX)).unwrap();
        assert_eq!(limiter.policy().max_requests_per_minute, u32::MAX);
        assert_eq!(limiter.admitted_in_window(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_limiters_do_not_share_state() {
        let a = RateLimiter::new(policy(1)).unwrap();
        let b = RateLimiter::new(policy(1)).unwrap();
        let start = Instant::now();

        a.execute(|| async { Ok::<_, WacloudError>(()) }).await.unwrap();
        b.execute(|| async { Ok::<_, WacloudError>(()) }).await.unwrap();

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(a.admitted_in_window(), 1);
        assert_eq!(b.admitted_in_window(), 1);
    }
}
