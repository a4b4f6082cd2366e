// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session encryption configuration section.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_TEARDOWN_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct EncryptionConfigLayer {
	#[serde(default)]
	pub enabled: Option<bool>,
	#[serde(default)]
	pub teardown_timeout_ms: Option<u64>,
}

impl EncryptionConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.teardown_timeout_ms.is_some() {
			self.teardown_timeout_ms = other.teardown_timeout_ms;
		}
	}

	pub fn finalize(self) -> EncryptionConfig {
		EncryptionConfig {
			enabled: self.enabled.unwrap_or(false),
			teardown_timeout_ms: self
				.teardown_timeout_ms
				.unwrap_or(DEFAULT_TEARDOWN_TIMEOUT_MS),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncryptionConfig {
	/// When off, no session keys are ever created.
	pub enabled: bool,
	/// How long session teardown waits for in-flight decrypts.
	pub teardown_timeout_ms: u64,
}

impl EncryptionConfig {
	pub fn teardown_timeout(&self) -> Duration {
		Duration::from_millis(self.teardown_timeout_ms)
	}
}

impl Default for EncryptionConfig {
	fn default() -> Self {
		EncryptionConfigLayer::default().finalize()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_disabled_by_default() {
		let config = EncryptionConfig::default();
		assert!(!config.enabled);
		assert_eq!(config.teardown_timeout(), Duration::from_secs(5));
	}

	#[test]
	fn test_merge_preserves_base_when_none() {
		let mut base = EncryptionConfigLayer {
			enabled: Some(true),
			teardown_timeout_ms: Some(250),
		};
		base.merge(EncryptionConfigLayer {
			enabled: None,
			teardown_timeout_ms: Some(1000),
		});
		assert_eq!(base.enabled, Some(true));
		assert_eq!(base.teardown_timeout_ms, Some(1000));
	}
}
