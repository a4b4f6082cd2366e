// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Retry with exponential backoff and jitter.
//!
//! Only errors that report themselves as transient through [`RetryableError`]
//! are retried. Everything else is returned after the first attempt.

use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Statuses that indicate a transient upstream condition.
const TRANSIENT_STATUSES: [StatusCode; 6] = [
	StatusCode::REQUEST_TIMEOUT,
	StatusCode::TOO_MANY_REQUESTS,
	StatusCode::INTERNAL_SERVER_ERROR,
	StatusCode::BAD_GATEWAY,
	StatusCode::SERVICE_UNAVAILABLE,
	StatusCode::GATEWAY_TIMEOUT,
];

#[derive(Debug, Clone)]
pub struct RetryConfig {
	/// Total attempts including the first one. Zero behaves like one.
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
	pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
		self.max_attempts = max_attempts;
		self
	}
}

pub trait RetryableError {
	fn is_retryable(&self) -> bool;
}

/// 408, 429 and the 5xx gateway family.
pub fn is_retryable_status(status: StatusCode) -> bool {
	TRANSIENT_STATUSES.contains(&status)
}

impl RetryableError for reqwest::Error {
	fn is_retryable(&self) -> bool {
		if self.is_timeout() || self.is_connect() {
			return true;
		}
		self.status().is_some_and(is_retryable_status)
	}
}

fn calculate_delay(cfg: &RetryConfig, attempt: u32) -> Duration {
	let exponential = cfg.base_delay.as_secs_f64() * cfg.backoff_factor.powi(attempt as i32);
	let capped = exponential.min(cfg.max_delay.as_secs_f64());

	let delay = if cfg.jitter {
		capped * (0.5 + fastrand::f64())
	} else {
		capped
	};

	Duration::from_secs_f64(delay)
}

/// Run `f` until it succeeds, fails permanently, or attempts run out.
///
/// `operation` names the call in log events.
pub async fn retry<F, Fut, T, E>(cfg: &RetryConfig, operation: &str, mut f: F) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
	E: RetryableError + std::fmt::Display,
{
	let max_attempts = cfg.max_attempts.max(1);
	let mut attempt = 0;

	loop {
		attempt += 1;
		let err = match f().await {
			Ok(value) => {
				if attempt > 1 {
					debug!(operation, attempt, "succeeded after retry");
				}
				return Ok(value);
			}
			Err(err) => err,
		};

		if !err.is_retryable() {
			debug!(operation, attempt, error = %err, "permanent failure, not retrying");
			return Err(err);
		}

		if attempt >= max_attempts {
			warn!(
				operation,
				attempt,
				max_attempts,
				error = %err,
				"retry attempts exhausted"
			);
			return Err(err);
		}

		let delay = calculate_delay(cfg, attempt - 1);
		warn!(
			operation,
			attempt,
			max_attempts,
			delay_ms = delay.as_millis() as u64,
			error = %err,
			"transient failure, retrying"
		);
		tokio::time::sleep(delay).await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fmt;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::Arc;

	#[derive(Debug)]
	struct FakeError {
		transient: bool,
	}

	impl fmt::Display for FakeError {
		fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
			write!(f, "fake error (transient: {})", self.transient)
		}
	}

	impl RetryableError for FakeError {
		fn is_retryable(&self) -> bool {
			self.transient
		}
	}

	fn fast_config(max_attempts: u32) -> RetryConfig {
		RetryConfig {
			max_attempts,
			base_delay: Duration::from_millis(1),
			max_delay: Duration::from_millis(5),
			backoff_factor: 2.0,
			jitter: false,
		}
	}

	/// A 404-style failure must surface immediately instead of burning attempts.
	#[tokio::test]
	async fn permanent_error_is_not_retried() {
		let calls = Arc::new(AtomicU32::new(0));
		let counter = Arc::clone(&calls);

		let result: Result<(), FakeError> = retry(&fast_config(5), "test", || {
			let counter = Arc::clone(&counter);
			async move {
				counter.fetch_add(1, Ordering::SeqCst);
				Err(FakeError { transient: false })
			}
		})
		.await;

		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn transient_error_uses_every_attempt() {
		let calls = Arc::new(AtomicU32::new(0));
		let counter = Arc::clone(&calls);

		let result: Result<(), FakeError> = retry(&fast_config(3), "test", || {
			let counter = Arc::clone(&counter);
			async move {
				counter.fetch_add(1, Ordering::SeqCst);
				Err(FakeError { transient: true })
			}
		})
		.await;

		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn recovers_after_transient_failures() {
		let calls = Arc::new(AtomicU32::new(0));
		let counter = Arc::clone(&calls);

		let result: Result<&str, FakeError> = retry(&fast_config(5), "test", || {
			let counter = Arc::clone(&counter);
			async move {
				if counter.fetch_add(1, Ordering::SeqCst) < 2 {
					Err(FakeError { transient: true })
				} else {
					Ok("paste body")
				}
			}
		})
		.await;

		assert_eq!(result.unwrap(), "paste body");
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn zero_attempts_still_runs_once() {
		let calls = Arc::new(AtomicU32::new(0));
		let counter = Arc::clone(&calls);

		let _: Result<(), FakeError> = retry(&fast_config(0), "test", || {
			let counter = Arc::clone(&counter);
			async move {
				counter.fetch_add(1, Ordering::SeqCst);
				Err(FakeError { transient: true })
			}
		})
		.await;

		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn jitter_varies_delay() {
		let jittered = RetryConfig {
			base_delay: Duration::from_millis(100),
			..RetryConfig::default()
		};
		let steady = RetryConfig {
			jitter: false,
			..jittered.clone()
		};

		let steady_delays: Vec<Duration> = (0..10).map(|_| calculate_delay(&steady, 1)).collect();
		let jittered_delays: Vec<Duration> =
			(0..10).map(|_| calculate_delay(&jittered, 1)).collect();

		assert!(steady_delays.windows(2).all(|w| w[0] == w[1]));
		assert!(!jittered_delays.windows(2).all(|w| w[0] == w[1]));
	}

	#[test]
	fn delay_is_capped() {
		let cfg = RetryConfig {
			max_attempts: 10,
			base_delay: Duration::from_secs(1),
			max_delay: Duration::from_secs(5),
			backoff_factor: 10.0,
			jitter: false,
		};

		for attempt in 0..10 {
			assert!(calculate_delay(&cfg, attempt) <= Duration::from_secs(5));
		}
	}

	#[test]
	fn transient_statuses() {
		assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
		assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
		assert!(is_retryable_status(StatusCode::REQUEST_TIMEOUT));
		assert!(!is_retryable_status(StatusCode::NOT_FOUND));
		assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
	}
}
