// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Environment variable helpers.
//!
//! Secrets follow the `VAR` / `VAR_FILE` convention used by Docker and
//! Kubernetes secret mounts. Feature switches accept the usual spellings of
//! true and false.

use std::path::PathBuf;
use std::{env, fs};

use satchel_common_secret::Secret;
use thiserror::Error;

/// Errors that can occur when loading secrets from environment variables.
#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },
}

/// Load a secret from `{var}_FILE` (preferred) or `{var}`.
///
/// A single trailing newline is stripped from file contents. Returns
/// `Ok(None)` when neither variable is set.
///
/// ```no_run
/// use satchel_common_config::load_secret_env;
///
/// if let Some(password) = load_secret_env("SATCHEL_PASTE_PASSWORD")? {
///     println!("paste password configured: {password}"); // prints the placeholder
/// }
/// # Ok::<(), satchel_common_config::SecretEnvError>(())
/// ```
pub fn load_secret_env(var: &str) -> Result<Option<Secret<String>>, SecretEnvError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path_str) = env::var(&file_var) {
		if path_str.is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}

		let path = PathBuf::from(&path_str);
		let content = fs::read_to_string(&path).map_err(|e| SecretEnvError::Io {
			path: path.clone(),
			source: e,
		})?;
		let content = Secret::new(content);

		let secret = content
			.expose()
			.strip_suffix('\n')
			.unwrap_or(content.expose().as_str())
			.to_string();
		return Ok(Some(Secret::new(secret)));
	}

	match env::var(var) {
		Ok(value) if !value.is_empty() => Ok(Some(Secret::new(value))),
		_ => Ok(None),
	}
}

/// Like [`load_secret_env`], but a missing secret is an error.
pub fn require_secret_env(var: &str) -> Result<Secret<String>, RequiredSecretError> {
	load_secret_env(var)?.ok_or_else(|| RequiredSecretError::Missing {
		var: var.to_string(),
		file_var: format!("{var}_FILE"),
	})
}

#[derive(Debug, Error)]
pub enum RequiredSecretError {
	#[error("required secret not found: set either {var} or {file_var}")]
	Missing { var: String, file_var: String },

	#[error(transparent)]
	Load(#[from] SecretEnvError),
}

/// Parse a boolean switch value.
///
/// `1`, `true`, `yes` and `on` are true; `0`, `false`, `no`, `off` and the
/// empty string are false (case-insensitive). Anything else is `None`.
pub fn parse_flag(value: &str) -> Option<bool> {
	match value.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Some(true),
		"" | "0" | "false" | "no" | "off" => Some(false),
		_ => None,
	}
}

/// Read a boolean switch from the environment. Unset variables are `None`.
pub fn env_flag(var: &str) -> Option<bool> {
	env::var(var).ok().and_then(|v| parse_flag(&v))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	mod load_secret_env_tests {
		use super::*;

		#[test]
		fn returns_none_when_not_set() {
			let var = "SATCHEL_TEST_NONEXISTENT_VAR_12345";
			env::remove_var(var);
			env::remove_var(format!("{var}_FILE"));

			assert!(load_secret_env(var).unwrap().is_none());
		}

		/// An empty direct value is treated as unset rather than an empty password.
		#[test]
		fn empty_direct_value_is_none() {
			let var = "SATCHEL_TEST_EMPTY_DIRECT_12345";
			env::set_var(var, "");
			env::remove_var(format!("{var}_FILE"));

			assert!(load_secret_env(var).unwrap().is_none());

			env::remove_var(var);
		}

		#[test]
		fn reads_from_direct_env_var() {
			let var = "SATCHEL_TEST_DIRECT_VAR_12345";
			env::set_var(var, "direct-secret-value");
			env::remove_var(format!("{var}_FILE"));

			let result = load_secret_env(var).unwrap().unwrap();
			assert_eq!(result.expose(), "direct-secret-value");

			env::remove_var(var);
		}

		/// `VAR_FILE` wins over `VAR`, and one trailing newline is dropped.
		#[test]
		fn file_var_takes_precedence() {
			let var = "SATCHEL_TEST_PRECEDENCE_VAR_12345";
			let mut temp_file = NamedTempFile::new().unwrap();
			writeln!(temp_file, "file-secret").unwrap();

			env::set_var(var, "direct-secret");
			env::set_var(format!("{var}_FILE"), temp_file.path().to_str().unwrap());

			let result = load_secret_env(var).unwrap().unwrap();
			assert_eq!(result.expose(), "file-secret");

			env::remove_var(var);
			env::remove_var(format!("{var}_FILE"));
		}

		#[test]
		fn returns_error_for_missing_file() {
			let var = "SATCHEL_TEST_MISSING_FILE_VAR_12345";
			env::set_var(format!("{var}_FILE"), "/nonexistent/path/to/secret");

			assert!(matches!(
				load_secret_env(var),
				Err(SecretEnvError::Io { .. })
			));

			env::remove_var(format!("{var}_FILE"));
		}

		#[test]
		fn returns_error_for_empty_file_path() {
			let var = "SATCHEL_TEST_EMPTY_PATH_VAR_12345";
			env::set_var(format!("{var}_FILE"), "");

			assert!(matches!(
				load_secret_env(var),
				Err(SecretEnvError::EmptyPath { .. })
			));

			env::remove_var(format!("{var}_FILE"));
		}

		#[test]
		fn require_reports_both_variable_names() {
			let var = "SATCHEL_TEST_REQUIRE_MISSING_12345";
			env::remove_var(var);
			env::remove_var(format!("{var}_FILE"));

			let err = require_secret_env(var).unwrap_err();
			let message = err.to_string();
			assert!(message.contains(var));
			assert!(message.contains(&format!("{var}_FILE")));
		}
	}

	mod flag_tests {
		use super::*;

		#[test]
		fn truthy_spellings() {
			for value in ["1", "true", "TRUE", "True", "yes", "YES", "on", " on "] {
				assert_eq!(parse_flag(value), Some(true), "value: {value:?}");
			}
		}

		#[test]
		fn falsy_spellings() {
			for value in ["", "0", "false", "False", "no", "NO", "off"] {
				assert_eq!(parse_flag(value), Some(false), "value: {value:?}");
			}
		}

		#[test]
		fn garbage_is_none() {
			assert_eq!(parse_flag("enabled"), None);
			assert_eq!(parse_flag("2"), None);
		}

		#[test]
		fn env_flag_reads_variable() {
			let var = "SATCHEL_TEST_FLAG_12345";
			env::set_var(var, "yes");
			assert_eq!(env_flag(var), Some(true));
			env::remove_var(var);
			assert_eq!(env_flag(var), None);
		}
	}
}
