// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP client construction with a consistent User-Agent header.

use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Client builder carrying the standard satchel User-Agent.
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Build a client whose every request is bounded by `timeout`.
pub fn client_with_timeout(timeout: Duration) -> reqwest::Result<Client> {
	builder().timeout(timeout).connect_timeout(timeout).build()
}

/// Format: `satchel/{version} ({os}-{arch})`
pub fn user_agent() -> String {
	format!(
		"satchel/{} ({}-{})",
		env!("CARGO_PKG_VERSION"),
		std::env::consts::OS,
		std::env::consts::ARCH
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_agent_has_expected_shape() {
		let ua = user_agent();
		assert!(ua.starts_with("satchel/"));
		assert!(ua.contains(std::env::consts::OS));
	}

	#[test]
	fn client_with_timeout_builds() {
		assert!(client_with_timeout(Duration::from_secs(1)).is_ok());
	}
}
