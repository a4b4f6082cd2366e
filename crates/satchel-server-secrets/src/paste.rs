// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client for PrivateBin v2 pastes.
//!
//! The paste key travels in the URL fragment and is never sent to the server.
//! Decryption is PBKDF2-HMAC-SHA256 over `base58(fragment) ‖ password`, then
//! AES-256-GCM with a 16-byte IV and the compact JSON of `adata` as
//! associated data, then optional raw inflate.

use std::fmt;
use std::io::Read;
use std::time::Duration;

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Key, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine};
use flate2::read::DeflateDecoder;
use pbkdf2::pbkdf2_hmac;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use tracing::{debug, instrument};
use url::Url;
use zeroize::Zeroizing;

use satchel_common_http::{is_retryable_status, retry, RetryConfig, RetryableError};
use satchel_common_secret::SecretString;

use crate::error::{SecretsError, SecretsResult};
use crate::source::location_of;

type PasteCipher = AesGcm<Aes256, U16>;

const PASTE_FORMAT_VERSION: u64 = 2;
const IV_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Upper bound on the decompressed paste document.
pub const MAX_PASTE_BYTES: usize = 1024 * 1024;

/// Upper bound on the raw HTTP response, leaving room for base64 and JSON.
const MAX_RESPONSE_BYTES: usize = 2 * MAX_PASTE_BYTES;

/// Refuse key derivation work factors beyond this.
const MAX_KDF_ITERATIONS: u32 = 10_000_000;

#[derive(Debug, Clone)]
pub struct PasteClient {
	http: reqwest::Client,
	retry: RetryConfig,
}

impl PasteClient {
	pub fn new(timeout: Duration, max_attempts: u32) -> reqwest::Result<Self> {
		Ok(Self::with_client(
			satchel_common_http::client_with_timeout(timeout)?,
			RetryConfig::default().with_max_attempts(max_attempts),
		))
	}

	pub fn with_client(http: reqwest::Client, retry: RetryConfig) -> Self {
		Self { http, retry }
	}

	/// Fetch and decrypt a paste, returning its text body.
	#[instrument(skip_all, fields(location = %location_of(url)))]
	pub async fn fetch(&self, url: &Url, password: &SecretString) -> SecretsResult<SecretString> {
		let location = location_of(url);
		let paste_key = decode_paste_key(url, &location)?;

		let mut bare = url.clone();
		bare.set_fragment(None);

		let body = retry(&self.retry, "fetch_paste", || self.request(&bare))
			.await
			.map_err(|e| e.into_secrets_error(&location))?;

		let document: PasteDocument =
			serde_json::from_slice(&body).map_err(|_| invalid(&location, "response is not JSON"))?;

		let text = open_document(&document, &paste_key, password, &location)?;
		debug!("paste decrypted");
		Ok(text)
	}

	async fn request(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
		let mut response = self
			.http
			.get(url.clone())
			.header("X-Requested-With", "JSONHttpRequest")
			.header(reqwest::header::ACCEPT, "application/json")
			.send()
			.await
			.map_err(FetchError::Transport)?;

		let status = response.status();
		if !status.is_success() {
			return Err(FetchError::Status(status));
		}

		if response
			.content_length()
			.is_some_and(|len| len > MAX_RESPONSE_BYTES as u64)
		{
			return Err(FetchError::TooLarge);
		}

		let mut body = Vec::new();
		while let Some(chunk) = response.chunk().await.map_err(FetchError::Transport)? {
			if body.len() + chunk.len() > MAX_RESPONSE_BYTES {
				return Err(FetchError::TooLarge);
			}
			body.extend_from_slice(&chunk);
		}
		Ok(body)
	}
}

#[derive(Debug)]
enum FetchError {
	Transport(reqwest::Error),
	Status(StatusCode),
	TooLarge,
}

impl fmt::Display for FetchError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FetchError::Transport(e) => write!(f, "{}", transport_reason(e)),
			FetchError::Status(status) => write!(f, "HTTP {status}"),
			FetchError::TooLarge => write!(f, "response exceeds size limit"),
		}
	}
}

impl RetryableError for FetchError {
	fn is_retryable(&self) -> bool {
		match self {
			FetchError::Transport(e) => e.is_retryable(),
			FetchError::Status(status) => is_retryable_status(*status),
			FetchError::TooLarge => false,
		}
	}
}

impl FetchError {
	fn into_secrets_error(self, location: &str) -> SecretsError {
		match self {
			FetchError::Status(StatusCode::NOT_FOUND) => SecretsError::SourceNotFound {
				location: location.to_string(),
			},
			FetchError::TooLarge => invalid(location, "response exceeds size limit"),
			other => SecretsError::SourceUnavailable {
				location: location.to_string(),
				reason: other.to_string(),
			},
		}
	}
}

fn transport_reason(error: &reqwest::Error) -> &'static str {
	if error.is_timeout() {
		"request timed out"
	} else if error.is_connect() {
		"connection failed"
	} else if error.is_body() || error.is_decode() {
		"response body unreadable"
	} else {
		"request failed"
	}
}

#[derive(Debug, Deserialize)]
struct PasteDocument {
	#[serde(default)]
	status: i64,
	#[serde(default)]
	message: Option<String>,
	#[serde(default)]
	v: Option<u64>,
	#[serde(default)]
	adata: Option<Value>,
	#[serde(default)]
	ct: Option<String>,
}

/// `[iv, salt, iterations, key_size, tag_size, algorithm, mode, compression]`
#[derive(Debug, Deserialize)]
struct CipherSpec(String, String, u32, u32, u32, String, String, String);

#[derive(Deserialize)]
struct PastePlaintext {
	paste: SecretString,
}

fn invalid(location: &str, reason: &str) -> SecretsError {
	SecretsError::InvalidPaste {
		location: location.to_string(),
		reason: reason.to_string(),
	}
}

fn decode_paste_key(url: &Url, location: &str) -> SecretsResult<Zeroizing<Vec<u8>>> {
	let fragment = url
		.fragment()
		.map(|f| f.trim_start_matches('-'))
		.filter(|f| !f.is_empty())
		.ok_or_else(|| SecretsError::InvalidSourceUri {
			uri: location.to_string(),
			reason: "missing paste key in URL fragment".to_string(),
		})?;

	bs58::decode(fragment)
		.into_vec()
		.map(Zeroizing::new)
		.map_err(|_| SecretsError::InvalidSourceUri {
			uri: location.to_string(),
			reason: "paste key is not base58".to_string(),
		})
}

fn open_document(
	document: &PasteDocument,
	paste_key: &[u8],
	password: &SecretString,
	location: &str,
) -> SecretsResult<SecretString> {
	if document.status != 0 {
		let missing = document
			.message
			.as_deref()
			.is_some_and(|m| m.to_lowercase().contains("does not exist"));
		if missing {
			return Err(SecretsError::SourceNotFound {
				location: location.to_string(),
			});
		}
		return Err(invalid(location, "server reported an error status"));
	}

	if document.v != Some(PASTE_FORMAT_VERSION) {
		return Err(invalid(location, "unsupported paste format version"));
	}

	let adata = document
		.adata
		.as_ref()
		.ok_or_else(|| invalid(location, "missing adata"))?;
	let spec_value = adata
		.get(0)
		.cloned()
		.ok_or_else(|| invalid(location, "missing cipher parameters"))?;
	let CipherSpec(iv, salt, iterations, key_size, tag_size, algorithm, mode, compression) =
		serde_json::from_value(spec_value)
			.map_err(|_| invalid(location, "malformed cipher parameters"))?;

	if algorithm != "aes" || mode != "gcm" || key_size != 256 || tag_size != 128 {
		return Err(invalid(location, "unsupported cipher"));
	}
	if iterations == 0 || iterations > MAX_KDF_ITERATIONS {
		return Err(invalid(location, "unsupported key derivation work factor"));
	}
	let inflate = match compression.as_str() {
		"zlib" => true,
		"none" => false,
		_ => return Err(invalid(location, "unsupported compression")),
	};

	let iv = STANDARD
		.decode(iv)
		.map_err(|_| invalid(location, "IV is not base64"))?;
	if iv.len() != IV_LEN {
		return Err(invalid(location, "IV must be 16 bytes"));
	}
	let salt = STANDARD
		.decode(salt)
		.map_err(|_| invalid(location, "salt is not base64"))?;
	let ciphertext = STANDARD
		.decode(
			document
				.ct
				.as_deref()
				.ok_or_else(|| invalid(location, "missing ciphertext"))?,
		)
		.map_err(|_| invalid(location, "ciphertext is not base64"))?;

	let mut material = Zeroizing::new(paste_key.to_vec());
	material.extend_from_slice(password.expose().as_bytes());
	let mut derived = Zeroizing::new([0u8; KEY_LEN]);
	pbkdf2_hmac::<Sha256>(&material, &salt, iterations, &mut derived[..]);

	let aad = serde_json::to_string(adata).map_err(|_| invalid(location, "malformed adata"))?;
	let cipher = PasteCipher::new(Key::<PasteCipher>::from_slice(&derived[..]));
	let plaintext = Zeroizing::new(
		cipher
			.decrypt(
				Nonce::<U16>::from_slice(&iv),
				Payload {
					msg: &ciphertext,
					aad: aad.as_bytes(),
				},
			)
			.map_err(|_| SecretsError::DecryptionFailed)?,
	);

	let document_bytes = if inflate {
		let mut inflated = Zeroizing::new(Vec::new());
		DeflateDecoder::new(plaintext.as_slice())
			.take(MAX_PASTE_BYTES as u64 + 1)
			.read_to_end(&mut inflated)
			.map_err(|_| invalid(location, "decompression failed"))?;
		inflated
	} else {
		plaintext
	};

	if document_bytes.len() > MAX_PASTE_BYTES {
		return Err(invalid(location, "paste exceeds size limit"));
	}

	let parsed: PastePlaintext = serde_json::from_slice(&document_bytes)
		.map_err(|_| invalid(location, "decrypted content is not a paste document"))?;
	Ok(parsed.paste)
}
