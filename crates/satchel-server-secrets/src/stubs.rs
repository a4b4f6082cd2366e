// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Placeholder entries for secrets the operator still has to fill in.
//!
//! Stub values start with `#`, so resolution skips them and inventory reports
//! them as unset until they are replaced.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};
use zeroize::Zeroizing;

use satchel_common_core::ConfigValue;

use crate::dotenv::{self, normalize_key};
use crate::error::{SecretsError, SecretsResult};

pub const STUB_VALUE_PREFIX: &str = "# TODO: Set actual value for ";

const SECRET_PROPERTIES_PATH: &str = "spec.connection_specification.properties";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StubReport {
	pub path: PathBuf,
	pub added: Vec<String>,
	pub created: bool,
}

/// Append a stub line for each of `config_paths` to the dotenv file at `path`.
///
/// Refuses with [`SecretsError::StubCollision`] if any requested key is
/// already present, leaving the file untouched. A missing file is created
/// (with its parent directories) only when `allow_create` is set.
#[instrument(skip(config_paths), fields(path = %path.display(), requested = config_paths.len()))]
pub async fn populate_stubs(
	path: &Path,
	config_paths: &[String],
	allow_create: bool,
) -> SecretsResult<StubReport> {
	let keys = validate_keys(config_paths)?;
	let location = path.display().to_string();
	let io_error = |source: std::io::Error| SecretsError::Io {
		path: path.to_path_buf(),
		source,
	};

	let (existing, created) = match fs::read_to_string(path).await {
		Ok(text) => (Zeroizing::new(text), false),
		Err(e) if e.kind() == ErrorKind::NotFound && allow_create => {
			if let Some(parent) = path.parent() {
				fs::create_dir_all(parent).await.map_err(io_error)?;
			}
			(Zeroizing::new(String::new()), true)
		}
		Err(e) if e.kind() == ErrorKind::NotFound => {
			return Err(SecretsError::SourceNotFound { location });
		}
		Err(e) => return Err(io_error(e)),
	};

	let present: BTreeSet<String> = dotenv::parse_entries(&existing, &location)?
		.into_iter()
		.map(|(key, _)| key)
		.collect();
	let collisions: Vec<String> = keys
		.iter()
		.filter(|key| present.contains(*key))
		.cloned()
		.collect();
	if !collisions.is_empty() {
		return Err(SecretsError::StubCollision { keys: collisions });
	}

	let mut content = String::new();
	if !existing.is_empty() && !existing.ends_with('\n') {
		content.push('\n');
	}
	for key in &keys {
		content.push_str(&format!("{key}=\"{STUB_VALUE_PREFIX}{key}\"\n"));
	}

	let mut file = OpenOptions::new()
		.create(true)
		.append(true)
		.open(path)
		.await
		.map_err(io_error)?;
	file.write_all(content.as_bytes()).await.map_err(io_error)?;
	file.flush().await.map_err(io_error)?;

	info!(added = keys.len(), created, "secret stubs written");
	Ok(StubReport {
		path: path.to_path_buf(),
		added: keys,
		created,
	})
}

/// Property names flagged `airbyte_secret: true` in a connector manifest.
pub fn secret_paths_from_spec(manifest: &ConfigValue) -> Vec<String> {
	manifest
		.get_path(SECRET_PROPERTIES_PATH)
		.and_then(ConfigValue::as_mapping)
		.map(|properties| {
			properties
				.iter()
				.filter(|(_, field)| {
					field
						.get_path("airbyte_secret")
						.and_then(ConfigValue::as_bool)
						.unwrap_or(false)
				})
				.map(|(name, _)| name.clone())
				.collect()
		})
		.unwrap_or_default()
}

/// Normalise, dedupe (first occurrence wins) and check each key is a usable dotenv key.
fn validate_keys(config_paths: &[String]) -> SecretsResult<Vec<String>> {
	let mut seen = BTreeSet::new();
	let mut keys = Vec::new();

	for raw in config_paths {
		let key = normalize_key(raw);
		if !is_valid_key(&key) {
			return Err(SecretsError::InvalidSecretPath { path: raw.clone() });
		}
		if seen.insert(key.clone()) {
			keys.push(key);
		}
	}

	Ok(keys)
}

fn is_valid_key(key: &str) -> bool {
	let mut chars = key.chars();
	let starts_well = chars
		.next()
		.is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
	starts_well
		&& chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
		&& key.split('.').all(|segment| !segment.is_empty())
}
