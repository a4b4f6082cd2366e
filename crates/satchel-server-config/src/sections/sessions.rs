// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session manifest location overrides and remote mode.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SessionsConfigLayer {
	#[serde(default)]
	pub remote_mode: Option<bool>,
	#[serde(default)]
	pub manifest_path: Option<String>,
	#[serde(default)]
	pub session_dir: Option<String>,
	#[serde(default)]
	pub session_root: Option<String>,
	#[serde(default)]
	pub legacy_sessions_dir: Option<String>,
}

impl SessionsConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.remote_mode.is_some() {
			self.remote_mode = other.remote_mode;
		}
		if other.manifest_path.is_some() {
			self.manifest_path = other.manifest_path;
		}
		if other.session_dir.is_some() {
			self.session_dir = other.session_dir;
		}
		if other.session_root.is_some() {
			self.session_root = other.session_root;
		}
		if other.legacy_sessions_dir.is_some() {
			self.legacy_sessions_dir = other.legacy_sessions_dir;
		}
	}

	pub fn finalize(self) -> SessionsConfig {
		SessionsConfig {
			remote_mode: self.remote_mode.unwrap_or(false),
			manifest_path: self.manifest_path,
			session_dir: self.session_dir,
			session_root: self.session_root,
			legacy_sessions_dir: self.legacy_sessions_dir,
		}
	}
}

/// Overrides are kept as written; `~` expansion and validation happen in
/// the session path resolver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionsConfig {
	pub remote_mode: bool,
	pub manifest_path: Option<String>,
	pub session_dir: Option<String>,
	pub session_root: Option<String>,
	pub legacy_sessions_dir: Option<String>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_finalize_defaults() {
		let config = SessionsConfigLayer::default().finalize();
		assert!(!config.remote_mode);
		assert!(config.manifest_path.is_none());
		assert!(config.legacy_sessions_dir.is_none());
	}

	#[test]
	fn test_deserialize_layer_partial() {
		let layer: SessionsConfigLayer = toml::from_str(
			r#"
remote_mode = true
session_root = "/srv/sessions"
"#,
		)
		.unwrap();
		let config = layer.finalize();
		assert!(config.remote_mode);
		assert_eq!(config.session_root.as_deref(), Some("/srv/sessions"));
		assert!(config.session_dir.is_none());
	}
}
