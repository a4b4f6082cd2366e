// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for session keys, secret resolution and hydration.
//!
//! No message carries plaintext, key bytes, ciphertext or dotenv line content.
//! Kids, file paths, URLs without their fragment and config paths are fine.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for secrets operations.
pub type SecretsResult<T> = Result<T, SecretsError>;

#[derive(Debug, Error)]
pub enum SecretsError {
	// =========================================================================
	// Session keys and envelopes
	// =========================================================================
	#[error("no live session key for session '{session_id}'")]
	SessionNotFound { session_id: String },

	#[error("unsupported algorithm '{algorithm}'")]
	UnsupportedAlgorithm { algorithm: String },

	#[error("key id mismatch: session key is '{expected}', payload was sealed for '{actual}'")]
	KeyMismatch { expected: String, actual: String },

	#[error("ciphertext is not valid base64")]
	InvalidEncoding,

	#[error("ciphertext is {size} bytes, limit is {max}")]
	CiphertextTooLarge { size: usize, max: usize },

	#[error("decryption failed")]
	DecryptionFailed,

	#[error("decrypted secret is not valid UTF-8")]
	InvalidPlaintextEncoding,

	// =========================================================================
	// Sources
	// =========================================================================
	#[error("secret source not found: {location}")]
	SourceNotFound { location: String },

	#[error("secret source unavailable: {location}: {reason}")]
	SourceUnavailable { location: String, reason: String },

	#[error("invalid secret source '{uri}': {reason}")]
	InvalidSourceUri { uri: String, reason: String },

	#[error("invalid dotenv content in {location}: {reason}")]
	InvalidDotenv { location: String, reason: String },

	#[error("invalid sealed file {path}: expected JSON object with kid and ciphertext")]
	InvalidSealedFile { path: PathBuf },

	#[error("invalid paste at {location}: {reason}")]
	InvalidPaste { location: String, reason: String },

	// =========================================================================
	// Hydration and stubs
	// =========================================================================
	#[error("config path '{path}' conflicts with a non-mapping value")]
	PathConflict { path: String },

	#[error("invalid secret path '{path}'")]
	InvalidSecretPath { path: String },

	#[error("cannot stub secrets that already exist: {}", .keys.join(", "))]
	StubCollision { keys: Vec<String> },

	#[error("I/O error on {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

impl SecretsError {
	/// Returns true if this error should be logged at error level.
	pub fn is_internal(&self) -> bool {
		matches!(self, SecretsError::Io { .. })
	}

	/// Only network-level failures are worth another attempt.
	pub fn is_retryable(&self) -> bool {
		matches!(self, SecretsError::SourceUnavailable { .. })
	}

	/// Returns the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			// 400 Bad Request
			SecretsError::UnsupportedAlgorithm { .. }
			| SecretsError::InvalidEncoding
			| SecretsError::InvalidPlaintextEncoding
			| SecretsError::InvalidSourceUri { .. }
			| SecretsError::InvalidDotenv { .. }
			| SecretsError::InvalidSealedFile { .. }
			| SecretsError::InvalidSecretPath { .. } => 400,

			// 404 Not Found
			SecretsError::SessionNotFound { .. } | SecretsError::SourceNotFound { .. } => 404,

			// 409 Conflict
			SecretsError::KeyMismatch { .. }
			| SecretsError::PathConflict { .. }
			| SecretsError::StubCollision { .. } => 409,

			// 413 Payload Too Large
			SecretsError::CiphertextTooLarge { .. } => 413,

			// 422 Unprocessable Entity
			SecretsError::DecryptionFailed | SecretsError::InvalidPaste { .. } => 422,

			// 502 Bad Gateway
			SecretsError::SourceUnavailable { .. } => 502,

			// 500 Internal Server Error
			SecretsError::Io { .. } => 500,
		}
	}

	/// Stable machine-readable code for API responses.
	pub fn code(&self) -> &'static str {
		match self {
			SecretsError::SessionNotFound { .. } => "session_not_found",
			SecretsError::UnsupportedAlgorithm { .. } => "unsupported_algorithm",
			SecretsError::KeyMismatch { .. } => "key_mismatch",
			SecretsError::InvalidEncoding => "invalid_encoding",
			SecretsError::CiphertextTooLarge { .. } => "ciphertext_too_large",
			SecretsError::DecryptionFailed => "decryption_failed",
			SecretsError::InvalidPlaintextEncoding => "invalid_plaintext_encoding",
			SecretsError::SourceNotFound { .. } => "source_not_found",
			SecretsError::SourceUnavailable { .. } => "source_unavailable",
			SecretsError::InvalidSourceUri { .. } => "invalid_source_uri",
			SecretsError::InvalidDotenv { .. } => "invalid_dotenv",
			SecretsError::InvalidSealedFile { .. } => "invalid_sealed_file",
			SecretsError::InvalidPaste { .. } => "invalid_paste",
			SecretsError::PathConflict { .. } => "path_conflict",
			SecretsError::InvalidSecretPath { .. } => "invalid_secret_path",
			SecretsError::StubCollision { .. } => "stub_collision",
			SecretsError::Io { .. } => "io_error",
		}
	}
}
