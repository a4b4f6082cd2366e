// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server error types and HTTP response conversions.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde::{Deserialize, Serialize};

use satchel_server_secrets::SecretsError;
use satchel_server_session::SessionPathError;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error(transparent)]
	Secrets(#[from] SecretsError),

	#[error(transparent)]
	SessionPath(#[from] SessionPathError),

	/// Session keys are only issued when encryption is switched on.
	#[error("secret encryption is not enabled on this server")]
	EncryptionDisabled,

	#[error("Forbidden: {0}")]
	Forbidden(String),

	/// The connector-execution collaborator failed. The message is already redacted.
	#[error("Connector execution failed: {0}")]
	Sink(String),

	#[error("Internal error: {0}")]
	Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

impl ErrorResponse {
	fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			error: error.into(),
			message: message.into(),
		}
	}
}

fn internal() -> (StatusCode, ErrorResponse) {
	(
		StatusCode::INTERNAL_SERVER_ERROR,
		ErrorResponse::new("internal_error", "An internal error occurred"),
	)
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let (status, body) = match &self {
			ServerError::Secrets(e) if e.is_internal() => {
				tracing::error!(error = %e, "secrets error");
				internal()
			}
			ServerError::Secrets(e) => {
				let status = StatusCode::from_u16(e.status_code())
					.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
				if status.is_server_error() {
					tracing::warn!(error = %e, code = e.code(), "secret source failed");
				}
				(status, ErrorResponse::new(e.code(), e.to_string()))
			}
			ServerError::SessionPath(e) if e.is_internal() => {
				tracing::error!(error = %e, "session path error");
				internal()
			}
			ServerError::SessionPath(e) => {
				let code = match e {
					SessionPathError::RelativePathRejected { .. } => "relative_path_rejected",
					SessionPathError::RemoteModeViolation { .. } => "remote_mode_violation",
					SessionPathError::HomeDirUnavailable => "home_dir_unavailable",
				};
				let status = StatusCode::from_u16(e.status_code())
					.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
				(status, ErrorResponse::new(code, e.to_string()))
			}
			ServerError::EncryptionDisabled => (
				StatusCode::NOT_FOUND,
				ErrorResponse::new("encryption_disabled", self.to_string()),
			),
			ServerError::Forbidden(msg) => {
				tracing::warn!(error = %msg, "forbidden");
				(
					StatusCode::FORBIDDEN,
					ErrorResponse::new("forbidden", msg.clone()),
				)
			}
			ServerError::Sink(msg) => {
				tracing::warn!(error = %msg, "connector execution failed");
				(
					StatusCode::BAD_GATEWAY,
					ErrorResponse::new("connector_failed", msg.clone()),
				)
			}
			ServerError::Internal(msg) => {
				tracing::error!(error = %msg, "internal error");
				internal()
			}
		};

		(status, Json(body)).into_response()
	}
}
