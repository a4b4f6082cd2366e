// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret inventory, stub population and config hydration handlers.

use std::collections::BTreeMap;

use axum::{
	extract::{Path, State},
	Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use satchel_common_core::ConfigValue;
use satchel_redact::Redactor;
use satchel_server_secrets::{
	hydrate as hydrate_config, populate_stubs as write_stubs, secret_paths_from_spec,
	EncryptedPayload, SecretInfo, SecretSourceSpec, SecretsError, SessionDecryptor, StubReport,
};

use crate::api::AppState;
use crate::error::{ServerError, ServerResult};
use crate::source_uri::{display_uri, parse_source_uri, parse_source_uris};

#[derive(Debug, Default, Deserialize)]
pub struct InventoryRequest {
	#[serde(default)]
	pub sources: Vec<String>,
	#[serde(default)]
	pub encrypted_secrets: Option<BTreeMap<String, EncryptedPayload>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HydrateRequest {
	#[serde(default)]
	pub config: ConfigValue,
	#[serde(default)]
	pub sources: Vec<String>,
	#[serde(default)]
	pub encrypted_secrets: Option<BTreeMap<String, EncryptedPayload>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HydrateResponse {
	/// The connector's result, redacted.
	pub result: ConfigValue,
	pub secrets_applied: usize,
}

#[derive(Debug, Deserialize)]
pub struct StubsRequest {
	pub dotenv_path: String,
	#[serde(default)]
	pub config_paths: Vec<String>,
	/// Connector manifest; properties flagged `airbyte_secret` are stubbed too.
	#[serde(default)]
	pub manifest: Option<ConfigValue>,
	#[serde(default)]
	pub allow_create: bool,
}

/// POST /api/sessions/{id}/secrets/inventory
#[instrument(skip(state, request), fields(%session_id))]
pub async fn inventory(
	State(state): State<AppState>,
	Path(session_id): Path<String>,
	Json(request): Json<InventoryRequest>,
) -> ServerResult<Json<Vec<SecretInfo>>> {
	let (sources, decryptor) =
		prepare_sources(&state, &session_id, &request.sources, request.encrypted_secrets).await?;
	let secrets = state
		.resolver
		.inventory(&sources, decryptor.as_ref())
		.await?;
	Ok(Json(secrets))
}

/// POST /api/sessions/{id}/hydrate
///
/// Resolves the sources, merges them into `config`, hands the result to the
/// configured sink and returns the sink's output redacted.
#[instrument(skip(state, request), fields(%session_id))]
pub async fn hydrate(
	State(state): State<AppState>,
	Path(session_id): Path<String>,
	Json(request): Json<HydrateRequest>,
) -> ServerResult<Json<HydrateResponse>> {
	let (sources, decryptor) =
		prepare_sources(&state, &session_id, &request.sources, request.encrypted_secrets).await?;
	let secrets = state.resolver.resolve(&sources, decryptor.as_ref()).await?;
	let hydrated = hydrate_config(&request.config, &secrets)?;

	let redactor = Redactor::from_resolved(&secrets);
	let result = state
		.sink
		.consume(&session_id, hydrated)
		.await
		.map_err(|e| ServerError::Sink(redactor.redact_text(&e.0).into_owned()))?;

	info!(secrets_applied = secrets.len(), "config hydrated");
	Ok(Json(HydrateResponse {
		result: redactor.redact(&result),
		secrets_applied: secrets.len(),
	}))
}

/// POST /api/sessions/{id}/secrets/stubs
///
/// Not available in remote mode, where the server's filesystem is not the caller's.
#[instrument(skip(state, request), fields(%session_id))]
pub async fn populate_stubs(
	State(state): State<AppState>,
	Path(session_id): Path<String>,
	Json(request): Json<StubsRequest>,
) -> ServerResult<Json<StubReport>> {
	if state.path_policy.remote_mode {
		return Err(ServerError::Forbidden(
			"secret stubs cannot be written in remote mode".to_string(),
		));
	}

	let path = match parse_source_uri(&request.dotenv_path, None)? {
		SecretSourceSpec::LocalDotenvFile(path) => path,
		_ => {
			return Err(SecretsError::InvalidSourceUri {
				uri: display_uri(&request.dotenv_path).to_string(),
				reason: "stubs can only be written to a plain dotenv file".to_string(),
			}
			.into())
		}
	};

	let mut config_paths = request.config_paths;
	if let Some(manifest) = &request.manifest {
		config_paths.extend(secret_paths_from_spec(manifest));
	}

	Ok(Json(
		write_stubs(&path, &config_paths, request.allow_create).await?,
	))
}

/// Parse URIs, append inline payloads last, and fetch the session decryptor
/// when any source is sealed.
async fn prepare_sources(
	state: &AppState,
	session_id: &str,
	uris: &[String],
	encrypted_secrets: Option<BTreeMap<String, EncryptedPayload>>,
) -> ServerResult<(Vec<SecretSourceSpec>, Option<SessionDecryptor>)> {
	let mut sources = parse_source_uris(uris, state.config.paste.password.as_ref())?;
	if let Some(entries) = encrypted_secrets.filter(|entries| !entries.is_empty()) {
		sources.push(SecretSourceSpec::InlineEncryptedMap(entries));
	}

	if !sources.iter().any(SecretSourceSpec::requires_session_key) {
		return Ok((sources, None));
	}
	if !state.encryption_enabled() {
		return Err(ServerError::EncryptionDisabled);
	}
	let decryptor = state.registry.decryptor(session_id).await?;
	Ok((sources, Some(decryptor)))
}
