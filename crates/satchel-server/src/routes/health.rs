// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Health HTTP handler.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
	pub status: String,
	pub encryption_enabled: bool,
	pub remote_mode: bool,
	pub active_sessions: usize,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
	Json(HealthResponse {
		status: "ok".to_string(),
		encryption_enabled: state.encryption_enabled(),
		remote_mode: state.path_policy.remote_mode,
		active_sessions: state.registry.session_count().await,
	})
}
