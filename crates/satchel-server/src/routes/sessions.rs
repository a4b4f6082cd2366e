// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session path HTTP handler.

use axum::{
	extract::{Path, State},
	Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use satchel_server_session::{resolve_session_manifest_path, session_hash};

use crate::api::AppState;
use crate::error::ServerResult;

#[derive(Debug, Serialize, Deserialize)]
pub struct ManifestPathResponse {
	pub session_id: String,
	pub session_hash: String,
	pub manifest_path: String,
	pub session_dir: Option<String>,
}

/// GET /api/sessions/{id}/manifest-path
#[instrument(skip(state), fields(%session_id))]
pub async fn manifest_path(
	State(state): State<AppState>,
	Path(session_id): Path<String>,
) -> ServerResult<Json<ManifestPathResponse>> {
	let manifest = resolve_session_manifest_path(&state.path_policy, &session_id)?;

	Ok(Json(ManifestPathResponse {
		session_hash: session_hash(&session_id),
		session_dir: manifest.parent().map(|dir| dir.display().to_string()),
		manifest_path: manifest.display().to_string(),
		session_id,
	}))
}
