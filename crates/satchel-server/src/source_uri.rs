// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Turns request source URIs into [`SecretSourceSpec`]s.
//!
//! Accepted forms:
//! - `salt-sealed:/abs/path` for a sealed dotenv file
//! - `https://<host containing privatebin>/?<id>#<key>` for a remote paste
//! - `/abs/path` or `file:///abs/path` for a plain dotenv file
//!
//! Any entry may hold several URIs separated by commas.

use std::path::{Path, PathBuf};

use url::Url;

use satchel_common_secret::SecretString;
use satchel_server_secrets::{SecretSourceSpec, SecretsError, SecretsResult};

const SALT_SEALED_SCHEME: &str = "salt-sealed:";
const PASTE_HOST_MARKER: &str = "privatebin";

/// Parse every URI in `raw`, splitting comma-separated entries.
///
/// `paste_password` is the configured password for remote pastes; a paste URI
/// is refused while it is unset.
pub fn parse_source_uris(
	raw: &[String],
	paste_password: Option<&SecretString>,
) -> SecretsResult<Vec<SecretSourceSpec>> {
	raw.iter()
		.flat_map(|entry| entry.split(','))
		.map(str::trim)
		.filter(|uri| !uri.is_empty())
		.map(|uri| parse_source_uri(uri, paste_password))
		.collect()
}

pub fn parse_source_uri(
	uri: &str,
	paste_password: Option<&SecretString>,
) -> SecretsResult<SecretSourceSpec> {
	if let Some(path) = uri.strip_prefix(SALT_SEALED_SCHEME) {
		return absolute(uri, path).map(SecretSourceSpec::SaltSealedFile);
	}

	if uri.contains("://") {
		let url = Url::parse(uri).map_err(|_| invalid(uri, "not a valid URL"))?;
		return match url.scheme() {
			"file" => url
				.to_file_path()
				.map(SecretSourceSpec::LocalDotenvFile)
				.map_err(|_| invalid(uri, "file URL must name an absolute local path")),
			"https" if is_paste_host(&url) => paste(uri, url, paste_password),
			_ => Err(invalid(uri, "unsupported source scheme")),
		};
	}

	absolute(uri, uri).map(SecretSourceSpec::LocalDotenvFile)
}

fn paste(
	uri: &str,
	url: Url,
	paste_password: Option<&SecretString>,
) -> SecretsResult<SecretSourceSpec> {
	if url.query_pairs().any(|(name, _)| name == "password") {
		return Err(invalid(
			uri,
			"paste passwords must come from server configuration, not the URL",
		));
	}
	let password = paste_password
		.cloned()
		.ok_or_else(|| invalid(uri, "no paste password is configured"))?;
	Ok(SecretSourceSpec::RemoteEncryptedPaste { url, password })
}

fn is_paste_host(url: &Url) -> bool {
	url.host_str()
		.is_some_and(|host| host.to_ascii_lowercase().contains(PASTE_HOST_MARKER))
}

fn absolute(uri: &str, path: &str) -> SecretsResult<PathBuf> {
	let path = Path::new(path);
	if path.is_absolute() {
		Ok(path.to_path_buf())
	} else {
		Err(invalid(uri, "path must be absolute"))
	}
}

/// The URI as it may appear in an error: no query, no fragment.
pub(crate) fn display_uri(uri: &str) -> &str {
	uri.split(['?', '#']).next().unwrap_or_default()
}

fn invalid(uri: &str, reason: &str) -> SecretsError {
	SecretsError::InvalidSourceUri {
		uri: display_uri(uri).to_string(),
		reason: reason.to_string(),
	}
}
