// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application state and router.

use std::sync::Arc;

use axum::{
	routing::{delete, get, post},
	Router,
};

use satchel_server_config::{ServerConfig, SessionsConfig};
use satchel_server_secrets::{PasteClient, SecretSourceResolver, SessionKeyRegistry};
use satchel_server_session::PathOverridePolicy;

use crate::error::{ServerError, ServerResult};
use crate::routes;
use crate::sink::{EchoSink, HydratedConfigSink};

#[derive(Clone)]
pub struct AppState {
	pub config: Arc<ServerConfig>,
	pub registry: Arc<SessionKeyRegistry>,
	pub resolver: Arc<SecretSourceResolver>,
	pub path_policy: Arc<PathOverridePolicy>,
	pub sink: Arc<dyn HydratedConfigSink>,
}

impl std::fmt::Debug for AppState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AppState")
			.field("config", &self.config)
			.field("registry", &self.registry)
			.field("path_policy", &self.path_policy)
			.finish_non_exhaustive()
	}
}

impl AppState {
	/// Replace the default echo sink.
	pub fn with_sink(mut self, sink: Arc<dyn HydratedConfigSink>) -> Self {
		self.sink = sink;
		self
	}

	pub fn encryption_enabled(&self) -> bool {
		self.config.encryption.enabled
	}
}

/// Path overrides as configured, before expansion or validation.
pub fn path_policy(sessions: &SessionsConfig) -> PathOverridePolicy {
	PathOverridePolicy {
		session_manifest_path: sessions.manifest_path.clone(),
		session_dir: sessions.session_dir.clone(),
		session_root: sessions.session_root.clone(),
		legacy_sessions_dir: sessions.legacy_sessions_dir.clone(),
		remote_mode: sessions.remote_mode,
	}
}

pub fn create_app_state(config: &ServerConfig) -> ServerResult<AppState> {
	let paste = PasteClient::new(config.paste.timeout(), config.paste.max_attempts)
		.map_err(|e| ServerError::Internal(format!("failed to build paste client: {e}")))?;

	Ok(AppState {
		config: Arc::new(config.clone()),
		registry: Arc::new(SessionKeyRegistry::with_teardown_timeout(
			config.encryption.teardown_timeout(),
		)),
		resolver: Arc::new(SecretSourceResolver::new(paste)),
		path_policy: Arc::new(path_policy(&config.sessions)),
		sink: Arc::new(EchoSink),
	})
}

pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(routes::health::health_check))
		// Session keys
		.route("/api/sessions/{id}", delete(routes::keys::destroy_session))
		.route("/api/sessions/{id}/key", post(routes::keys::create_session_key))
		.route(
			"/api/sessions/{id}/public-key",
			get(routes::keys::get_public_key),
		)
		.route(
			"/api/sessions/{id}/encryption-instructions",
			get(routes::keys::encryption_instructions),
		)
		// Session paths
		.route(
			"/api/sessions/{id}/manifest-path",
			get(routes::sessions::manifest_path),
		)
		// Secrets
		.route(
			"/api/sessions/{id}/secrets/inventory",
			post(routes::secrets::inventory),
		)
		.route(
			"/api/sessions/{id}/secrets/stubs",
			post(routes::secrets::populate_stubs),
		)
		.route("/api/sessions/{id}/hydrate", post(routes::secrets::hydrate))
		.with_state(state)
}
