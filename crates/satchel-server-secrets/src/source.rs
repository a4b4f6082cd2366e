// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use url::Url;

use satchel_common_secret::SecretString;

use crate::envelope::EncryptedPayload;

/// Where a batch of secrets comes from.
///
/// `Debug` never prints ciphertext, passwords or a paste URL's fragment.
#[derive(Clone)]
pub enum SecretSourceSpec {
	/// Plain dotenv file on local disk.
	LocalDotenvFile(PathBuf),
	/// `{kid, ciphertext}` JSON whose plaintext is dotenv text.
	SaltSealedFile(PathBuf),
	/// Individually sealed values keyed by dotted config path.
	InlineEncryptedMap(BTreeMap<String, EncryptedPayload>),
	/// PrivateBin v2 paste. The URL fragment carries the paste key.
	RemoteEncryptedPaste { url: Url, password: SecretString },
}

impl SecretSourceSpec {
	/// Human-readable location, safe for logs and error messages.
	pub fn location(&self) -> String {
		match self {
			SecretSourceSpec::LocalDotenvFile(path) | SecretSourceSpec::SaltSealedFile(path) => {
				path.display().to_string()
			}
			SecretSourceSpec::InlineEncryptedMap(_) => "inline".to_string(),
			SecretSourceSpec::RemoteEncryptedPaste { url, .. } => location_of(url),
		}
	}

	pub fn kind(&self) -> &'static str {
		match self {
			SecretSourceSpec::LocalDotenvFile(_) => "dotenv_file",
			SecretSourceSpec::SaltSealedFile(_) => "salt_sealed_file",
			SecretSourceSpec::InlineEncryptedMap(_) => "inline_encrypted",
			SecretSourceSpec::RemoteEncryptedPaste { .. } => "remote_paste",
		}
	}

	/// Sources sealed to the session key need a live decryptor.
	pub fn requires_session_key(&self) -> bool {
		matches!(
			self,
			SecretSourceSpec::SaltSealedFile(_) | SecretSourceSpec::InlineEncryptedMap(_)
		)
	}
}

impl fmt::Debug for SecretSourceSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SecretSourceSpec::InlineEncryptedMap(entries) => f
				.debug_struct("InlineEncryptedMap")
				.field("keys", &entries.keys().collect::<Vec<_>>())
				.finish(),
			SecretSourceSpec::RemoteEncryptedPaste { .. } => f
				.debug_struct("RemoteEncryptedPaste")
				.field("url", &self.location())
				.finish_non_exhaustive(),
			_ => f
				.debug_tuple(match self {
					SecretSourceSpec::LocalDotenvFile(_) => "LocalDotenvFile",
					_ => "SaltSealedFile",
				})
				.field(&self.location())
				.finish(),
		}
	}
}

/// A URL with its fragment removed.
pub(crate) fn location_of(url: &Url) -> String {
	let mut bare = url.clone();
	bare.set_fragment(None);
	bare.to_string()
}
