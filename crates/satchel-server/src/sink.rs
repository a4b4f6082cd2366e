// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Where hydrated configs go.
//!
//! The server does not run connectors itself. A [`HydratedConfigSink`] receives
//! the hydrated config and returns whatever the connector produced; the server
//! redacts that result before it leaves the process.

use async_trait::async_trait;
use satchel_common_core::ConfigValue;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct SinkError(pub String);

#[async_trait]
pub trait HydratedConfigSink: Send + Sync {
	async fn consume(&self, session_id: &str, config: ConfigValue)
		-> Result<ConfigValue, SinkError>;
}

/// Hands the hydrated config straight back.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoSink;

#[async_trait]
impl HydratedConfigSink for EchoSink {
	async fn consume(
		&self,
		_session_id: &str,
		config: ConfigValue,
	) -> Result<ConfigValue, SinkError> {
		Ok(config)
	}
}
