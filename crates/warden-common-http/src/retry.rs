// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Retry with exponential backoff for transient HTTP failures.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, warn};

/// Errors that know whether another attempt could succeed.
pub trait RetryableError {
	fn is_retryable(&self) -> bool;
}

impl RetryableError for reqwest::Error {
	fn is_retryable(&self) -> bool {
		if self.is_timeout() || self.is_connect() {
			return true;
		}
		self
			.status()
			.map(|status| status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error())
			.unwrap_or(false)
	}
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
	/// Total attempts including the first one.
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub backoff_factor: f64,
	pub jitter: bool,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_millis(200),
			max_delay: Duration::from_secs(5),
			backoff_factor: 2.0,
			jitter: true,
		}
	}
}

impl RetryConfig {
	/// Delay before attempt `attempt + 1`, where `attempt` starts at 1.
	pub fn delay_for(&self, attempt: u32) -> Duration {
		let exponent = attempt.saturating_sub(1) as i32;
		let raw = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
		let capped = raw.min(self.max_delay.as_secs_f64());
		let secs = if self.jitter {
			// Equal jitter in [capped/2, capped].
			capped * (0.5 + fastrand::f64() * 0.5)
		} else {
			capped
		};
		Duration::from_secs_f64(secs)
	}
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// `config.max_attempts` is reached.
pub async fn retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
	E: RetryableError + Display,
{
	let max_attempts = config.max_attempts.max(1);
	let mut attempt = 1;

	loop {
		match operation().await {
			Ok(value) => return Ok(value),
			Err(e) if attempt < max_attempts && e.is_retryable() => {
				let delay = config.delay_for(attempt);
				warn!(
					attempt = attempt,
					max_attempts = max_attempts,
					delay_ms = delay.as_millis() as u64,
					error = %e,
					"retryable request failure"
				);
				tokio::time::sleep(delay).await;
				attempt += 1;
			}
			Err(e) => {
				debug!(attempt = attempt, error = %e, "giving up on request");
				return Err(e);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fmt;
	use std::sync::atomic::{AtomicU32, Ordering};

	#[derive(Debug)]
	struct TestError {
		retryable: bool,
	}

	impl fmt::Display for TestError {
		fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
			write!(f, "test error (retryable: {})", self.retryable)
		}
	}

	impl RetryableError for TestError {
		fn is_retryable(&self) -> bool {
			self.retryable
		}
	}

	fn fast_config(max_attempts: u32) -> RetryConfig {
		RetryConfig {
			max_attempts,
			base_delay: Duration::from_millis(1),
			max_delay: Duration::from_millis(2),
			backoff_factor: 2.0,
			jitter: false,
		}
	}

	#[tokio::test]
	async fn retries_until_success() {
		let calls = AtomicU32::new(0);
		let result: Result<u32, TestError> = retry(&fast_config(3), || async {
			let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
			if n < 3 {
				Err(TestError { retryable: true })
			} else {
				Ok(n)
			}
		})
		.await;

		assert_eq!(result.unwrap(), 3);
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn stops_on_non_retryable_error() {
		let calls = AtomicU32::new(0);
		let result: Result<(), TestError> = retry(&fast_config(5), || async {
			calls.fetch_add(1, Ordering::SeqCst);
			Err(TestError { retryable: false })
		})
		.await;

		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn gives_up_after_max_attempts() {
		let calls = AtomicU32::new(0);
		let result: Result<(), TestError> = retry(&fast_config(2), || async {
			calls.fetch_add(1, Ordering::SeqCst);
			Err(TestError { retryable: true })
		})
		.await;

		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	#[test]
	fn delay_grows_and_caps() {
		let config = RetryConfig {
			max_attempts: 5,
			base_delay: Duration::from_millis(125),
			max_delay: Duration::from_millis(375),
			backoff_factor: 2.0,
			jitter: false,
		};
		assert_eq!(config.delay_for(1), Duration::from_millis(125));
		assert_eq!(config.delay_for(2), Duration::from_millis(250));
		assert_eq!(config.delay_for(3), Duration::from_millis(375));
		assert_eq!(config.delay_for(8), Duration::from_millis(375));
	}

	#[test]
	fn jitter_stays_within_bounds() {
		let config = RetryConfig {
			jitter: true,
			..fast_config(3)
		};
		for attempt in 1..5 {
			let delay = config.delay_for(attempt);
			assert!(delay <= config.max_delay);
		}
	}
}
