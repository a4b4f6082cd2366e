// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Multi-source secret resolution.
//!
//! Sources are loaded in list order and folded last-write-wins. Any failing
//! source fails the whole resolution.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use zeroize::Zeroizing;

use satchel_common_secret::{ResolvedSecrets, SecretString};

use crate::dotenv::{self, is_skipped, normalize_key};
use crate::envelope::EncryptedPayload;
use crate::error::{SecretsError, SecretsResult};
use crate::keys::SessionDecryptor;
use crate::paste::PasteClient;
use crate::source::SecretSourceSpec;

/// Reported in place of a session id when no decryptor was supplied.
const UNBOUND_SESSION: &str = "<unbound>";

/// A key defined by a source set, without its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretInfo {
	pub key: String,
	pub is_set: bool,
}

#[derive(Debug, Clone)]
pub struct SecretSourceResolver {
	paste: PasteClient,
}

impl SecretSourceResolver {
	pub fn new(paste: PasteClient) -> Self {
		Self { paste }
	}

	/// Load every source and merge them, later sources winning.
	///
	/// Empty values and unfilled stubs are dropped.
	#[instrument(skip_all, fields(sources = sources.len()))]
	pub async fn resolve(
		&self,
		sources: &[SecretSourceSpec],
		decryptor: Option<&SessionDecryptor>,
	) -> SecretsResult<ResolvedSecrets> {
		let mut resolved = ResolvedSecrets::new();

		for source in sources {
			let batch: ResolvedSecrets = self
				.load_entries(source, decryptor)
				.await?
				.into_iter()
				.filter(|(_, value)| !is_skipped(value.expose()))
				.collect();
			debug!(
				kind = source.kind(),
				location = %source.location(),
				count = batch.len(),
				"source loaded"
			);
			resolved.merge(batch);
		}

		info!(count = resolved.len(), "secrets resolved");
		Ok(resolved)
	}

	/// List the keys a source set defines and whether each one has a value.
	#[instrument(skip_all, fields(sources = sources.len()))]
	pub async fn inventory(
		&self,
		sources: &[SecretSourceSpec],
		decryptor: Option<&SessionDecryptor>,
	) -> SecretsResult<Vec<SecretInfo>> {
		let mut keys = BTreeMap::new();

		for source in sources {
			for (key, value) in self.load_entries(source, decryptor).await? {
				keys.insert(key, dotenv::is_value_set(value.expose()));
			}
		}

		Ok(keys
			.into_iter()
			.map(|(key, is_set)| SecretInfo { key, is_set })
			.collect())
	}

	async fn load_entries(
		&self,
		source: &SecretSourceSpec,
		decryptor: Option<&SessionDecryptor>,
	) -> SecretsResult<Vec<(String, SecretString)>> {
		match source {
			SecretSourceSpec::LocalDotenvFile(path) => {
				let text = read_source_file(path).await?;
				dotenv::parse_entries(&text, &path.display().to_string())
			}
			SecretSourceSpec::SaltSealedFile(path) => {
				let decryptor = require_decryptor(decryptor)?;
				let raw = read_source_file(path).await?;
				let payload: EncryptedPayload = serde_json::from_str(&raw)
					.map_err(|_| SecretsError::InvalidSealedFile { path: path.clone() })?;
				let text = decryptor.decrypt(&payload).await?;
				dotenv::parse_entries(text.expose(), &path.display().to_string())
			}
			SecretSourceSpec::InlineEncryptedMap(entries) => {
				let decryptor = require_decryptor(decryptor)?;
				let mut decrypted = Vec::with_capacity(entries.len());
				for (key, payload) in entries {
					decrypted.push((normalize_key(key), decryptor.decrypt(payload).await?));
				}
				Ok(decrypted)
			}
			SecretSourceSpec::RemoteEncryptedPaste { url, password } => {
				let text = self.paste.fetch(url, password).await?;
				dotenv::parse_entries(text.expose(), &source.location())
			}
		}
	}
}

fn require_decryptor(decryptor: Option<&SessionDecryptor>) -> SecretsResult<&SessionDecryptor> {
	decryptor.ok_or_else(|| SecretsError::SessionNotFound {
		session_id: UNBOUND_SESSION.to_string(),
	})
}

async fn read_source_file(path: &Path) -> SecretsResult<Zeroizing<String>> {
	match tokio::fs::read_to_string(path).await {
		Ok(text) => Ok(Zeroizing::new(text)),
		Err(e) if e.kind() == ErrorKind::NotFound => Err(SecretsError::SourceNotFound {
			location: path.display().to_string(),
		}),
		Err(e) if e.kind() == ErrorKind::InvalidData => Err(SecretsError::InvalidDotenv {
			location: path.display().to_string(),
			reason: "file is not valid UTF-8".to_string(),
		}),
		Err(source) => Err(SecretsError::Io {
			path: path.to_path_buf(),
			source,
		}),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::keys::{PublicKeyInfo, SessionKeyRegistry};
	use base64::{engine::general_purpose::STANDARD, Engine};
	use crypto_box::{aead::OsRng, PublicKey};
	use satchel_common_http::RetryConfig;
	use std::path::PathBuf;
	use tempfile::TempDir;

	fn resolver() -> SecretSourceResolver {
		SecretSourceResolver::new(PasteClient::with_client(
			reqwest::Client::new(),
			RetryConfig::default(),
		))
	}

	fn seal(info: &PublicKeyInfo, plaintext: &str) -> EncryptedPayload {
		let raw: [u8; 32] = STANDARD
			.decode(&info.public_key_b64)
			.unwrap()
			.try_into()
			.unwrap();
		let sealed = PublicKey::from(raw)
			.seal(&mut OsRng, plaintext.as_bytes())
			.unwrap();
		EncryptedPayload::sealed_box(STANDARD.encode(sealed), info.kid.clone())
	}

	fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
		let path = dir.path().join(name);
		std::fs::write(&path, content).unwrap();
		path
	}

	mod dotenv_files {
		use super::*;

		#[tokio::test]
		async fn later_sources_win() {
			let dir = TempDir::new().unwrap();
			let first = write(&dir, "a.env", "api_key=first\nshared.host=db1\n");
			let second = write(&dir, "b.env", "API_KEY=second\n");

			let resolved = resolver()
				.resolve(
					&[
						SecretSourceSpec::LocalDotenvFile(first),
						SecretSourceSpec::LocalDotenvFile(second),
					],
					None,
				)
				.await
				.unwrap();

			assert_eq!(resolved.get("api_key").unwrap().expose(), "second");
			assert_eq!(resolved.get("shared.host").unwrap().expose(), "db1");
		}

		#[tokio::test]
		async fn missing_file_is_source_not_found() {
			let dir = TempDir::new().unwrap();
			let err = resolver()
				.resolve(
					&[SecretSourceSpec::LocalDotenvFile(dir.path().join("nope.env"))],
					None,
				)
				.await
				.unwrap_err();
			assert!(matches!(err, SecretsError::SourceNotFound { .. }));
		}

		/// Stub lines do not override a real value from an earlier source.
		#[tokio::test]
		async fn stubs_do_not_clobber_values() {
			let dir = TempDir::new().unwrap();
			let real = write(&dir, "real.env", "token=abc\n");
			let stubs = write(&dir, "stubs.env", "token=\"# TODO: Set actual value for token\"\n");

			let resolved = resolver()
				.resolve(
					&[
						SecretSourceSpec::LocalDotenvFile(real),
						SecretSourceSpec::LocalDotenvFile(stubs),
					],
					None,
				)
				.await
				.unwrap();
			assert_eq!(resolved.get("token").unwrap().expose(), "abc");
		}
	}

	mod sealed_file {
		use super::*;

		/// A `{kid, ciphertext}` file sealed to the session key resolves to its dotenv body.
		#[tokio::test]
		async fn round_trip() {
			let registry = SessionKeyRegistry::new();
			let info = registry.create_session_key("s1").await;
			let payload = seal(&info, "credentials.password=hunter2\nempty=\n");
			let body = serde_json::json!({ "kid": payload.kid, "ciphertext": payload.ciphertext });

			let dir = TempDir::new().unwrap();
			let path = write(&dir, "secrets.sealed", &body.to_string());
			let decryptor = registry.decryptor("s1").await.unwrap();

			let resolved = resolver()
				.resolve(&[SecretSourceSpec::SaltSealedFile(path)], Some(&decryptor))
				.await
				.unwrap();

			let keys: Vec<&str> = resolved.keys().collect();
			assert_eq!(keys, vec!["credentials.password"]);
			assert_eq!(
				resolved.get("credentials.password").unwrap().expose(),
				"hunter2"
			);
		}

		#[tokio::test]
		async fn without_decryptor_is_session_not_found() {
			let dir = TempDir::new().unwrap();
			let path = write(&dir, "secrets.sealed", r#"{"kid":"k","ciphertext":"AAAA"}"#);
			let err = resolver()
				.resolve(&[SecretSourceSpec::SaltSealedFile(path)], None)
				.await
				.unwrap_err();
			assert!(matches!(err, SecretsError::SessionNotFound { .. }));
		}

		#[tokio::test]
		async fn malformed_json_is_invalid_sealed_file() {
			let registry = SessionKeyRegistry::new();
			registry.create_session_key("s1").await;
			let decryptor = registry.decryptor("s1").await.unwrap();

			let dir = TempDir::new().unwrap();
			let path = write(&dir, "secrets.sealed", "api_key=plaintext\n");
			let err = resolver()
				.resolve(&[SecretSourceSpec::SaltSealedFile(path)], Some(&decryptor))
				.await
				.unwrap_err();
			assert!(matches!(err, SecretsError::InvalidSealedFile { .. }));
		}
	}

	mod inline {
		use super::*;

		#[tokio::test]
		async fn decrypts_each_entry_and_normalises_keys() {
			let registry = SessionKeyRegistry::new();
			let info = registry.create_session_key("s1").await;
			let decryptor = registry.decryptor("s1").await.unwrap();

			let entries = BTreeMap::from([
				("API_KEY".to_string(), seal(&info, "k-1")),
				("credentials.token".to_string(), seal(&info, "t-2")),
			]);

			let resolved = resolver()
				.resolve(
					&[SecretSourceSpec::InlineEncryptedMap(entries)],
					Some(&decryptor),
				)
				.await
				.unwrap();
			assert_eq!(resolved.get("api_key").unwrap().expose(), "k-1");
			assert_eq!(resolved.get("credentials.token").unwrap().expose(), "t-2");
		}

		/// One bad entry fails the whole batch; nothing partial comes back.
		#[tokio::test]
		async fn no_partial_resolution() {
			let registry = SessionKeyRegistry::new();
			let info = registry.create_session_key("s1").await;
			let decryptor = registry.decryptor("s1").await.unwrap();

			let mut tampered = seal(&info, "b");
			tampered.kid = "someone-else".to_string();
			let entries = BTreeMap::from([
				("a".to_string(), seal(&info, "a")),
				("b".to_string(), tampered),
			]);

			let result = resolver()
				.resolve(
					&[SecretSourceSpec::InlineEncryptedMap(entries)],
					Some(&decryptor),
				)
				.await;
			assert!(matches!(result, Err(SecretsError::KeyMismatch { .. })));
		}
	}

	mod inventory {
		use super::*;

		#[tokio::test]
		async fn reports_keys_without_values() {
			let dir = TempDir::new().unwrap();
			let path = write(
				&dir,
				"a.env",
				"api_key=abc\nblank=\"   \"\nstub=\"# TODO: Set actual value for stub\"\n",
			);

			let inventory = resolver()
				.inventory(&[SecretSourceSpec::LocalDotenvFile(path)], None)
				.await
				.unwrap();

			assert_eq!(
				inventory,
				vec![
					SecretInfo { key: "api_key".into(), is_set: true },
					SecretInfo { key: "blank".into(), is_set: false },
					SecretInfo { key: "stub".into(), is_set: false },
				]
			);
		}
	}
}
