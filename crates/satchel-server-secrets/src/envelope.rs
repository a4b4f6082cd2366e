// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sealed-envelope decryption.
//!
//! Clients encrypt with a libsodium-compatible sealed box (X25519 +
//! XSalsa20-Poly1305, anonymous sender) against the session public key. The
//! server only ever opens envelopes.

use base64::{engine::general_purpose::STANDARD, Engine};
use crypto_box::SecretKey;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use satchel_common_secret::SecretString;

use crate::error::{SecretsError, SecretsResult};
use crate::keys::SessionKeyPair;

/// Canonical algorithm name.
pub const SEALED_BOX: &str = "SealedBox";

/// Spelling used by existing clients.
pub const SEALED_BOX_ALIAS: &str = "libsodium-sealed-box";

/// Upper bound on decoded ciphertext length.
pub const MAX_CIPHERTEXT_BYTES: usize = 64 * 1024;

/// Ciphertext as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
	/// Standard base64.
	pub ciphertext: String,
	pub kid: String,
	#[serde(default = "default_algorithm")]
	pub algorithm: String,
}

fn default_algorithm() -> String {
	SEALED_BOX.to_string()
}

impl EncryptedPayload {
	pub fn sealed_box(ciphertext: impl Into<String>, kid: impl Into<String>) -> Self {
		Self {
			ciphertext: ciphertext.into(),
			kid: kid.into(),
			algorithm: default_algorithm(),
		}
	}
}

pub fn is_supported_algorithm(algorithm: &str) -> bool {
	algorithm == SEALED_BOX || algorithm == SEALED_BOX_ALIAS
}

/// Open `payload` with the session keypair.
///
/// Checks run in a fixed order and stop at the first failure: algorithm, kid,
/// base64, size, authenticated decryption, UTF-8.
pub fn decrypt(
	payload: &EncryptedPayload,
	keypair: &SessionKeyPair,
) -> SecretsResult<SecretString> {
	if !is_supported_algorithm(&payload.algorithm) {
		return Err(SecretsError::UnsupportedAlgorithm {
			algorithm: payload.algorithm.clone(),
		});
	}

	if payload.kid != keypair.kid() {
		return Err(SecretsError::KeyMismatch {
			expected: keypair.kid().to_string(),
			actual: payload.kid.clone(),
		});
	}

	let ciphertext = STANDARD
		.decode(payload.ciphertext.trim())
		.map_err(|_| SecretsError::InvalidEncoding)?;

	if ciphertext.len() > MAX_CIPHERTEXT_BYTES {
		return Err(SecretsError::CiphertextTooLarge {
			size: ciphertext.len(),
			max: MAX_CIPHERTEXT_BYTES,
		});
	}

	let secret_key = SecretKey::from(*keypair.private_key_bytes());
	let plaintext = Zeroizing::new(
		secret_key
			.unseal(&ciphertext)
			.map_err(|_| SecretsError::DecryptionFailed)?,
	);

	let text =
		std::str::from_utf8(&plaintext).map_err(|_| SecretsError::InvalidPlaintextEncoding)?;
	Ok(SecretString::new(text.to_string()))
}
