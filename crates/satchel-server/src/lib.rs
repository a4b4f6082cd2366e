// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Satchel secrets server.
//!
//! Issues per-session sealing keys, resolves secrets from dotenv files,
//! sealed files, inline envelopes and PrivateBin pastes, and hydrates
//! connector configs with them. Anything returned to the caller is redacted.

pub mod api;
pub mod error;
pub mod routes;
pub mod sink;
pub mod source_uri;
pub mod version;

pub use api::{create_app_state, create_router, path_policy, AppState};
pub use error::{ErrorResponse, ServerError, ServerResult};
pub use satchel_server_config::ServerConfig;
pub use sink::{EchoSink, HydratedConfigSink, SinkError};
pub use source_uri::{parse_source_uri, parse_source_uris};
