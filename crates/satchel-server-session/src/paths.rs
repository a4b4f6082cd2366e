// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Where a session's manifest lives on disk.
//!
//! Precedence, highest first:
//! 1. `SATCHEL_SESSION_MANIFEST_PATH`, used as-is
//! 2. `SATCHEL_SESSION_DIR`, plus `manifest.yaml`
//! 3. `SATCHEL_SESSION_ROOT`, plus `<sha256(session_id)>/manifest.yaml`
//! 4. `SATCHEL_SESSIONS_DIR` (legacy), resolved like the session root
//! 5. `~/.mcp-sessions/<sha256(session_id)>/manifest.yaml`

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::{SessionPathError, SessionPathResult};

pub const MANIFEST_PATH_VAR: &str = "SATCHEL_SESSION_MANIFEST_PATH";
pub const SESSION_DIR_VAR: &str = "SATCHEL_SESSION_DIR";
pub const SESSION_ROOT_VAR: &str = "SATCHEL_SESSION_ROOT";
pub const LEGACY_SESSIONS_DIR_VAR: &str = "SATCHEL_SESSIONS_DIR";

pub const MANIFEST_FILE_NAME: &str = "manifest.yaml";
pub const DEFAULT_SESSIONS_DIR_NAME: &str = ".mcp-sessions";

/// Operator-supplied path overrides. None of them may be set in remote mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathOverridePolicy {
	pub session_manifest_path: Option<String>,
	pub session_dir: Option<String>,
	pub session_root: Option<String>,
	pub legacy_sessions_dir: Option<String>,
	pub remote_mode: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OverrideKind {
	ManifestPath,
	SessionDir,
	SessionRoot,
	LegacySessionsDir,
}

impl PathOverridePolicy {
	/// Overrides that are set, in precedence order, with their variable names.
	fn set_overrides(&self) -> Vec<(OverrideKind, &'static str, &str)> {
		[
			(
				OverrideKind::ManifestPath,
				MANIFEST_PATH_VAR,
				&self.session_manifest_path,
			),
			(OverrideKind::SessionDir, SESSION_DIR_VAR, &self.session_dir),
			(OverrideKind::SessionRoot, SESSION_ROOT_VAR, &self.session_root),
			(
				OverrideKind::LegacySessionsDir,
				LEGACY_SESSIONS_DIR_VAR,
				&self.legacy_sessions_dir,
			),
		]
		.into_iter()
		.filter_map(|(kind, var, value)| {
			value
				.as_deref()
				.filter(|v| !v.trim().is_empty())
				.map(|v| (kind, var, v))
		})
		.collect()
	}

	/// Startup guard. Rejects any override in remote mode and any override
	/// that is not absolute after `~` expansion.
	pub fn validate(&self) -> SessionPathResult<()> {
		let overrides = self.set_overrides();

		if self.remote_mode && !overrides.is_empty() {
			return Err(SessionPathError::RemoteModeViolation {
				variables: overrides.iter().map(|(_, var, _)| var.to_string()).collect(),
			});
		}

		for (_, var, value) in overrides {
			expand_absolute(var, value)?;
		}

		Ok(())
	}
}

/// Resolve the manifest path for `session_id` under `policy`.
pub fn resolve_session_manifest_path(
	policy: &PathOverridePolicy,
	session_id: &str,
) -> SessionPathResult<PathBuf> {
	let overrides = policy.set_overrides();

	if policy.remote_mode && !overrides.is_empty() {
		return Err(SessionPathError::RemoteModeViolation {
			variables: overrides.iter().map(|(_, var, _)| var.to_string()).collect(),
		});
	}

	let Some(((kind, var, value), ignored)) = overrides.split_first() else {
		let home = dirs::home_dir().ok_or(SessionPathError::HomeDirUnavailable)?;
		return Ok(hashed_manifest_path(
			&home.join(DEFAULT_SESSIONS_DIR_NAME),
			session_id,
		));
	};

	for (_, ignored_var, _) in ignored {
		warn!(
			variable = *ignored_var,
			winner = *var,
			"{ignored_var} is ignored because {var} is set"
		);
	}

	let base = expand_absolute(var, value)?;
	Ok(match kind {
		OverrideKind::ManifestPath => base,
		OverrideKind::SessionDir => base.join(MANIFEST_FILE_NAME),
		OverrideKind::SessionRoot | OverrideKind::LegacySessionsDir => {
			hashed_manifest_path(&base, session_id)
		}
	})
}

/// Directory holding the session's manifest.
pub fn session_dir(policy: &PathOverridePolicy, session_id: &str) -> SessionPathResult<PathBuf> {
	let manifest = resolve_session_manifest_path(policy, session_id)?;
	Ok(manifest
		.parent()
		.map(Path::to_path_buf)
		.unwrap_or(manifest))
}

/// Hex SHA-256 of the session id, used as its directory name.
pub fn session_hash(session_id: &str) -> String {
	hex::encode(Sha256::digest(session_id.as_bytes()))
}

fn hashed_manifest_path(root: &Path, session_id: &str) -> PathBuf {
	root.join(session_hash(session_id)).join(MANIFEST_FILE_NAME)
}

fn expand_absolute(variable: &str, value: &str) -> SessionPathResult<PathBuf> {
	let value = value.trim();
	let expanded = if value == "~" {
		dirs::home_dir().ok_or(SessionPathError::HomeDirUnavailable)?
	} else if let Some(rest) = value.strip_prefix("~/") {
		dirs::home_dir()
			.ok_or(SessionPathError::HomeDirUnavailable)?
			.join(rest)
	} else {
		PathBuf::from(value)
	};

	if !expanded.is_absolute() {
		return Err(SessionPathError::RelativePathRejected {
			variable: variable.to_string(),
		});
	}

	Ok(expanded)
}
