use std::time::Duration;

use thiserror::Error;

use crate::error::GenerationError;
use crate::spec::Spec;

use super::{ImageBytes, ImageGenerator};

/// Bounded retry with exponential backoff: delays of 1x, 2x, 4x the base
/// between consecutive cycles, none after the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay after the given failed cycle (0-based).
    pub fn delay_after(&self, cycle: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(cycle))
    }
}

/// Images from a successful run and how many cycles it took.
#[derive(Debug)]
pub struct Generated {
    pub images: Vec<ImageBytes>,
    pub cycles: u32,
}

/// Every cycle failed; carries the last error observed.
#[derive(Debug, Error)]
#[error("{last_error}")]
pub struct RetryExhausted {
    pub cycles: u32,
    pub last_error: GenerationError,
}

/// Calls `generator` until it succeeds or the policy runs out.
pub async fn generate_with_retry(
    generator: &dyn ImageGenerator,
    spec: &Spec,
    policy: &RetryPolicy,
) -> Result<Generated, RetryExhausted> {
    let max_attempts = policy.max_attempts.max(1);
    let mut cycle = 0;

    loop {
        match generator.generate(spec).await {
            Ok(images) => {
                return Ok(Generated {
                    images,
                    cycles: cycle + 1,
                })
            }
            Err(e) => {
                tracing::warn!(
                    spec_id = %spec.id,
                    cycle = cycle + 1,
                    max_attempts,
                    error = %e,
                    "Generation cycle failed"
                );
                if cycle + 1 >= max_attempts {
                    return Err(RetryExhausted {
                        cycles: cycle + 1,
                        last_error: e,
                    });
                }
            }
        }

        tokio::time::sleep(policy.delay_after(cycle)).await;
        cycle += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` calls, then succeeds.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ImageGenerator for Flaky {
        async fn generate(&self, _spec: &Spec) -> Result<Vec<ImageBytes>, GenerationError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures {
                Err(GenerationError::Empty {
                    provider: "flaky",
                })
            } else {
                Ok(vec![vec![n as u8]])
            }
        }
    }

    fn spec() -> Spec {
        Spec::new(0, "retry me", &Settings::default())
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(0), Duration::from_secs(1));
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_cycle_success() {
        let generator = Flaky::new(0);
        let start = tokio::time::Instant::now();
        let generated = generate_with_retry(&generator, &spec(), &RetryPolicy::default())
            .await
            .unwrap();
        assert_eq!(generated.cycles, 1);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_cycle() {
        let generator = Flaky::new(2);
        let start = tokio::time::Instant::now();
        let generated = generate_with_retry(&generator, &spec(), &RetryPolicy::default())
            .await
            .unwrap();
        assert_eq!(generated.cycles, 3);
        assert_eq!(generated.images, vec![vec![3u8]]);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_returns_last_error_without_trailing_sleep() {
        let generator = Flaky::new(10);
        let start = tokio::time::Instant::now();
        let err = generate_with_retry(&generator, &spec(), &RetryPolicy::default())
            .await
            .unwrap_err();
        assert_eq!(err.cycles, 3);
        assert_eq!(err.to_string(), "No images returned from flaky");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
        // 1s + 2s between cycles, nothing after the last
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let generator = Flaky::new(0);
        let policy = RetryPolicy {
            max_attempts: 0,
            base_delay: Duration::ZERO,
        };
        let generated = generate_with_retry(&generator, &spec(), &policy).await.unwrap();
        assert_eq!(generated.cycles, 1);
    }
}
