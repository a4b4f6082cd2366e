// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Satchel server binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use satchel_server::{create_app_state, create_router, version};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Satchel server - session-scoped secret hydration.
#[derive(Parser, Debug)]
#[command(name = "satchel-server", about = "Session-scoped secret hydration server", version)]
struct Args {
	/// Config file to use instead of /etc/satchel/server.toml
	#[arg(long, env = "SATCHEL_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version and build information
	Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => satchel_server_config::load_config_with_file(path)?,
		None => satchel_server_config::load_config()?,
	};

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	let state = create_app_state(&config)?;

	// Refuse to start with overrides that remote mode forbids or that are not absolute.
	if let Err(e) = state.path_policy.validate() {
		tracing::error!(error = %e, "invalid session path configuration");
		std::process::exit(2);
	}

	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		encryption_enabled = config.encryption.enabled,
		remote_mode = config.sessions.remote_mode,
		"starting satchel-server"
	);

	let registry = state.registry.clone();
	let app = create_router(state).layer(TraceLayer::new_for_http());

	let addr = config.socket_addr();
	tracing::info!("listening on {}", addr);

	let listener = tokio::net::TcpListener::bind(&addr).await?;

	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "Server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Received shutdown signal");
		}
	}

	registry.destroy_all().await;
	tracing::info!("Server shutdown complete");
	Ok(())
}
