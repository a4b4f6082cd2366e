// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session key HTTP handlers.

use axum::{
	extract::{Path, State},
	http::{header, StatusCode},
	response::IntoResponse,
	Json,
};
use tracing::instrument;

use satchel_server_secrets::{PublicKeyInfo, SecretsError, SEALED_BOX};

use crate::api::AppState;
use crate::error::{ServerError, ServerResult};

const MARKDOWN: &str = "text/markdown; charset=utf-8";

/// POST /api/sessions/{id}/key
///
/// Creates the session keypair, replacing any existing one.
#[instrument(skip(state), fields(%session_id))]
pub async fn create_session_key(
	State(state): State<AppState>,
	Path(session_id): Path<String>,
) -> ServerResult<(StatusCode, Json<PublicKeyInfo>)> {
	if !state.encryption_enabled() {
		return Err(ServerError::EncryptionDisabled);
	}
	let info = state.registry.create_session_key(&session_id).await;
	Ok((StatusCode::CREATED, Json(info)))
}

/// GET /api/sessions/{id}/public-key
#[instrument(skip(state), fields(%session_id))]
pub async fn get_public_key(
	State(state): State<AppState>,
	Path(session_id): Path<String>,
) -> ServerResult<Json<PublicKeyInfo>> {
	if !state.encryption_enabled() {
		return Err(ServerError::EncryptionDisabled);
	}
	Ok(Json(state.registry.get_public_key(&session_id).await?))
}

/// DELETE /api/sessions/{id}
///
/// Idempotent; an unknown session is not an error.
#[instrument(skip(state), fields(%session_id))]
pub async fn destroy_session(
	State(state): State<AppState>,
	Path(session_id): Path<String>,
) -> StatusCode {
	state.registry.destroy(&session_id).await;
	StatusCode::NO_CONTENT
}

/// GET /api/sessions/{id}/encryption-instructions
#[instrument(skip(state), fields(%session_id))]
pub async fn encryption_instructions(
	State(state): State<AppState>,
	Path(session_id): Path<String>,
) -> ServerResult<impl IntoResponse> {
	let body = if !state.encryption_enabled() {
		disabled_instructions()
	} else {
		match state.registry.get_public_key(&session_id).await {
			Ok(info) => enabled_instructions(&session_id, Some(&info)),
			Err(SecretsError::SessionNotFound { .. }) => enabled_instructions(&session_id, None),
			Err(e) => return Err(e.into()),
		}
	};
	Ok(([(header::CONTENT_TYPE, MARKDOWN)], body))
}

fn disabled_instructions() -> String {
	"# Secret encryption\n\n\
	 Encryption is not enabled on this server. Secrets can only be supplied \
	 through plain dotenv files or PrivateBin pastes.\n\n\
	 Ask the operator to set `SATCHEL_ENABLE_ENCRYPTION=1` to accept sealed secrets.\n"
		.to_string()
}

fn enabled_instructions(session_id: &str, info: Option<&PublicKeyInfo>) -> String {
	let mut out = String::from("# Secret encryption\n\n");

	let Some(info) = info else {
		out.push_str(&format!(
			"No key exists for session `{session_id}` yet. Create one with \
			 `POST /api/sessions/{session_id}/key`, then fetch these instructions again.\n"
		));
		return out;
	};

	out.push_str(&format!(
		"Seal each secret to this session's public key with a libsodium sealed box \
		 (X25519, XSalsa20-Poly1305), then base64-encode the result.\n\n\
		 | field | value |\n\
		 |---|---|\n\
		 | kid | `{kid}` |\n\
		 | public key ({encoding}) | `{public_key}` |\n\
		 | algorithm | `{algorithm}` |\n\
		 | max ciphertext | {max} bytes |\n\n",
		kid = info.kid,
		encoding = info.encoding,
		public_key = info.public_key_b64,
		algorithm = info.algorithm,
		max = info.max_ciphertext_bytes,
	));

	out.push_str(&format!(
		"## Inline secrets\n\n\
		 Send sealed values as `encrypted_secrets`, keyed by dotted config path:\n\n\
		 ```json\n\
		 {{\n  \"credentials.password\": {{\n    \"ciphertext\": \"<base64>\",\n    \
		 \"kid\": \"{kid}\",\n    \"algorithm\": \"{SEALED_BOX}\"\n  }}\n}}\n\
		 ```\n\n\
		 ## Sealed dotenv files\n\n\
		 Seal a whole dotenv file and store it as `{{\"kid\": \"{kid}\", \"ciphertext\": \"<base64>\"}}`, \
		 then reference it as `salt-sealed:/absolute/path`.\n\n\
		 ## Lifetime\n\n\
		 The private key lives in memory only. It is destroyed when the session ends \
		 or a new key is created, after which anything sealed to `{kid}` can no longer \
		 be opened.\n",
		kid = info.kid,
	));

	out
}
