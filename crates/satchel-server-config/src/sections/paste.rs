// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Remote paste (PrivateBin) fetch configuration.

use std::time::Duration;

use satchel_common_secret::SecretString;
use serde::Deserialize;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PasteConfigLayer {
	#[serde(default)]
	pub timeout_secs: Option<u64>,
	#[serde(default)]
	pub max_attempts: Option<u32>,
	#[serde(default)]
	pub password: Option<SecretString>,
}

impl PasteConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.timeout_secs.is_some() {
			self.timeout_secs = other.timeout_secs;
		}
		if other.max_attempts.is_some() {
			self.max_attempts = other.max_attempts;
		}
		if other.password.is_some() {
			self.password = other.password;
		}
	}

	pub fn finalize(self) -> PasteConfig {
		PasteConfig {
			timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
			max_attempts: self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
			password: self.password,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct PasteConfig {
	pub timeout_secs: u64,
	pub max_attempts: u32,
	/// Paste sources are rejected while this is unset.
	pub password: Option<SecretString>,
}

impl PasteConfig {
	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_secs)
	}
}

impl Default for PasteConfig {
	fn default() -> Self {
		PasteConfigLayer::default().finalize()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_values() {
		let config = PasteConfig::default();
		assert_eq!(config.timeout(), Duration::from_secs(30));
		assert_eq!(config.max_attempts, 3);
		assert!(config.password.is_none());
	}

	#[test]
	fn test_debug_hides_password() {
		let config = PasteConfigLayer {
			password: Some(SecretString::from("correct-horse")),
			..Default::default()
		}
		.finalize();
		assert!(!format!("{config:?}").contains("correct-horse"));
	}
}
