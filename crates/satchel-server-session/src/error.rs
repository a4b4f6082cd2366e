// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

pub type SessionPathResult<T> = Result<T, SessionPathError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionPathError {
	#[error("{variable} must be an absolute path")]
	RelativePathRejected { variable: String },

	#[error(
		"session path overrides are not allowed in remote mode (set: {})",
		.variables.join(", ")
	)]
	RemoteModeViolation { variables: Vec<String> },

	#[error("home directory could not be determined")]
	HomeDirUnavailable,
}

impl SessionPathError {
	/// Returns the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			SessionPathError::RelativePathRejected { .. } => 400,
			SessionPathError::RemoteModeViolation { .. } => 403,
			SessionPathError::HomeDirUnavailable => 500,
		}
	}

	pub fn is_internal(&self) -> bool {
		matches!(self, SessionPathError::HomeDirUnavailable)
	}
}
