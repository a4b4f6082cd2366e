// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;

use satchel_common_config::{load_secret_env, parse_flag};
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	EncryptionConfigLayer, HttpConfigLayer, LoggingConfigLayer, PasteConfigLayer,
	SessionsConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/satchel/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: SATCHEL_<FIELD>, with the names listed per section below.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			http: Some(load_http_from_env()?),
			encryption: Some(load_encryption_from_env()?),
			sessions: Some(load_sessions_from_env()?),
			paste: Some(load_paste_from_env()?),
			logging: Some(load_logging_from_env()),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Result<Option<bool>, ConfigError> {
	match env_var(name) {
		Some(v) => parse_flag(&v)
			.map(Some)
			.ok_or_else(|| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid boolean value '{v}'"),
			}),
		None => Ok(None),
	}
}

fn env_u16(name: &str) -> Result<Option<u16>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u16 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_u32(name: &str) -> Result<Option<u32>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u32 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_u64(name: &str) -> Result<Option<u64>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u64 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn load_http_from_env() -> Result<HttpConfigLayer, ConfigError> {
	Ok(HttpConfigLayer {
		host: env_var("SATCHEL_SERVER_HOST"),
		port: env_u16("SATCHEL_SERVER_PORT")?,
	})
}

fn load_encryption_from_env() -> Result<EncryptionConfigLayer, ConfigError> {
	Ok(EncryptionConfigLayer {
		enabled: env_bool("SATCHEL_ENABLE_ENCRYPTION")?,
		teardown_timeout_ms: env_u64("SATCHEL_SESSION_TEARDOWN_TIMEOUT_MS")?,
	})
}

fn load_sessions_from_env() -> Result<SessionsConfigLayer, ConfigError> {
	Ok(SessionsConfigLayer {
		remote_mode: env_bool("SATCHEL_REMOTE_MODE")?,
		manifest_path: env_var("SATCHEL_SESSION_MANIFEST_PATH"),
		session_dir: env_var("SATCHEL_SESSION_DIR"),
		session_root: env_var("SATCHEL_SESSION_ROOT"),
		legacy_sessions_dir: env_var("SATCHEL_SESSIONS_DIR"),
	})
}

fn load_paste_from_env() -> Result<PasteConfigLayer, ConfigError> {
	Ok(PasteConfigLayer {
		timeout_secs: env_u64("SATCHEL_PASTE_TIMEOUT_SECS")?,
		max_attempts: env_u32("SATCHEL_PASTE_MAX_ATTEMPTS")?,
		password: load_secret_env("SATCHEL_PASTE_PASSWORD")
			.map_err(|e| ConfigError::Secret(e.to_string()))?,
	})
}

fn load_logging_from_env() -> LoggingConfigLayer {
	LoggingConfigLayer {
		level: env_var("SATCHEL_LOG_LEVEL"),
	}
}
