// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the satchel server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`SATCHEL_*`)
//!
//! # Usage
//!
//! ```ignore
//! use satchel_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("Server listening on {}:{}", config.http.host, config.http.port);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub encryption: EncryptionConfig,
	pub sessions: SessionsConfig,
	pub paste: PasteConfig,
	pub logging: LoggingConfig,
}

impl ServerConfig {
	/// Get the socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`SATCHEL_*`)
/// 2. Config file (`/etc/satchel/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	];
	load_from_sources(sources)
}

/// Load configuration from environment only (for testing or simple deployments).
pub fn load_config_from_env() -> Result<ServerConfig, ConfigError> {
	let mut merged = ServerConfigLayer::default();
	merged.merge(EnvSource.load()?);
	finalize(merged)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	];
	load_from_sources(sources)
}

fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let http = layer.http.unwrap_or_default().finalize();
	let encryption = layer.encryption.unwrap_or_default().finalize();
	let sessions = layer.sessions.unwrap_or_default().finalize();
	let paste = layer.paste.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	validate_config(&paste)?;

	info!(
		host = %http.host,
		port = http.port,
		encryption_enabled = encryption.enabled,
		remote_mode = sessions.remote_mode,
		paste_password_configured = paste.password.is_some(),
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		http,
		encryption,
		sessions,
		paste,
		logging,
	})
}

/// Validate cross-field configuration rules.
///
/// Session path overrides are checked separately, at startup, by the session
/// path policy.
fn validate_config(paste: &PasteConfig) -> Result<(), ConfigError> {
	if paste.timeout_secs == 0 {
		return Err(ConfigError::Validation(
			"SATCHEL_PASTE_TIMEOUT_SECS must be greater than zero".to_string(),
		));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	#[test]
	fn test_zero_paste_timeout_rejected() {
		let paste = PasteConfig {
			timeout_secs: 0,
			..Default::default()
		};
		let result = validate_config(&paste);
		assert!(result.unwrap_err().to_string().contains("greater than zero"));
	}

	#[test]
	fn test_socket_addr() {
		let config = ServerConfig {
			http: HttpConfig {
				host: "127.0.0.1".to_string(),
				port: 9000,
			},
			..Default::default()
		};
		assert_eq!(config.socket_addr(), "127.0.0.1:9000");
	}

	#[test]
	fn test_file_layer_over_defaults() {
		let mut file = NamedTempFile::new().unwrap();
		writeln!(
			file,
			r#"
[paste]
timeout_secs = 5
max_attempts = 1
"#
		)
		.unwrap();

		let sources: Vec<Box<dyn ConfigSource>> = vec![
			Box::new(DefaultsSource),
			Box::new(TomlSource::new(file.path())),
		];
		let config = load_from_sources(sources).unwrap();

		assert_eq!(config.paste.timeout_secs, 5);
		assert_eq!(config.paste.max_attempts, 1);
		assert_eq!(config.http.port, 8787);
		assert!(!config.encryption.enabled);
	}
}
