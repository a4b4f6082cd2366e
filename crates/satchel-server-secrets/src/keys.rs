// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-session X25519 keypairs.
//!
//! Each session owns exactly one live keypair. The private half stays inside
//! this crate: callers get a [`PublicKeyInfo`] to publish and a
//! [`SessionDecryptor`] to open envelopes with.
//!
//! # Locking
//!
//! The registry map and each session slot have their own `RwLock`. Decrypts
//! hold the slot's read lock for one decrypt only. Create, replace and
//! destroy take the write lock. Teardown removes the slot from the map first,
//! so new lookups fail immediately, then waits a bounded time for in-flight
//! decrypts before wiping the key.
//!
//! A decryptor obtained before its session was re-keyed reports
//! [`SecretsError::KeyMismatch`] against the new kid. One obtained before the
//! session was destroyed reports [`SecretsError::SessionNotFound`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use base64::{
	engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
	Engine,
};
use chrono::{DateTime, Utc};
use crypto_box::SecretKey;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use zeroize::Zeroize;

use satchel_common_secret::{Secret, SecretKeyBytes, SecretString};

use crate::envelope::{self, EncryptedPayload, MAX_CIPHERTEXT_BYTES, SEALED_BOX};
use crate::error::{SecretsError, SecretsResult};

pub const KEY_SIZE: usize = 32;

/// Random bytes behind each kid (128 bits).
pub const KID_BYTES: usize = 16;

pub const DEFAULT_TEARDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Public projection of a session key, safe to hand to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyInfo {
	pub kid: String,
	pub public_key_b64: String,
	pub algorithm: String,
	pub encoding: String,
	pub max_ciphertext_bytes: usize,
}

/// A session's keypair. The private key is zeroized on drop.
#[derive(Debug)]
pub struct SessionKeyPair {
	session_id: String,
	kid: String,
	public_key: [u8; KEY_SIZE],
	private_key: SecretKeyBytes,
	created_at: DateTime<Utc>,
}

impl SessionKeyPair {
	/// Fresh keypair and kid from OS entropy.
	pub(crate) fn generate(session_id: &str) -> Self {
		let mut seed = [0u8; KEY_SIZE];
		OsRng.fill_bytes(&mut seed);
		let private_key = Secret::new(seed);
		seed.zeroize();

		let public_key = *SecretKey::from(*private_key.expose()).public_key().as_bytes();

		let mut kid_bytes = [0u8; KID_BYTES];
		OsRng.fill_bytes(&mut kid_bytes);

		Self {
			session_id: session_id.to_string(),
			kid: URL_SAFE_NO_PAD.encode(kid_bytes),
			public_key,
			private_key,
			created_at: Utc::now(),
		}
	}

	pub fn session_id(&self) -> &str {
		&self.session_id
	}

	pub fn kid(&self) -> &str {
		&self.kid
	}

	pub fn public_key_bytes(&self) -> &[u8; KEY_SIZE] {
		&self.public_key
	}

	pub(crate) fn private_key_bytes(&self) -> &[u8; KEY_SIZE] {
		self.private_key.expose()
	}

	pub fn created_at(&self) -> DateTime<Utc> {
		self.created_at
	}

	pub fn public_info(&self) -> PublicKeyInfo {
		PublicKeyInfo {
			kid: self.kid.clone(),
			public_key_b64: STANDARD.encode(self.public_key),
			algorithm: SEALED_BOX.to_string(),
			encoding: "base64".to_string(),
			max_ciphertext_bytes: MAX_CIPHERTEXT_BYTES,
		}
	}

	fn wipe(&mut self) {
		self.private_key.wipe();
	}
}

struct SessionSlot {
	keypair: RwLock<Option<SessionKeyPair>>,
	/// Set before teardown waits, so handles that outlive the wait stop working.
	destroyed: AtomicBool,
	/// Kid of the keypair that took this slot's place, if it was replaced.
	replaced_by: OnceLock<String>,
}

impl SessionSlot {
	fn new(keypair: SessionKeyPair) -> Self {
		Self {
			keypair: RwLock::new(Some(keypair)),
			destroyed: AtomicBool::new(false),
			replaced_by: OnceLock::new(),
		}
	}
}

/// Handle for opening envelopes sealed to one session's key.
#[derive(Clone)]
pub struct SessionDecryptor {
	session_id: String,
	slot: Arc<SessionSlot>,
}

impl std::fmt::Debug for SessionDecryptor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionDecryptor")
			.field("session_id", &self.session_id)
			.finish_non_exhaustive()
	}
}

impl SessionDecryptor {
	pub fn session_id(&self) -> &str {
		&self.session_id
	}

	#[instrument(skip(self, payload), fields(session_id = %self.session_id, kid = %payload.kid))]
	pub async fn decrypt(&self, payload: &EncryptedPayload) -> SecretsResult<SecretString> {
		let guard = self.slot.keypair.read().await;
		if self.slot.destroyed.load(Ordering::Acquire) {
			return Err(self.retired(payload));
		}
		let keypair = guard.as_ref().ok_or_else(|| self.retired(payload))?;
		envelope::decrypt(payload, keypair)
	}

	fn retired(&self, payload: &EncryptedPayload) -> SecretsError {
		match self.slot.replaced_by.get() {
			Some(kid) => SecretsError::KeyMismatch {
				expected: kid.clone(),
				actual: payload.kid.clone(),
			},
			None => SecretsError::SessionNotFound {
				session_id: self.session_id.clone(),
			},
		}
	}
}

/// All live session keys, keyed by session id.
pub struct SessionKeyRegistry {
	sessions: RwLock<HashMap<String, Arc<SessionSlot>>>,
	teardown_timeout: Duration,
}

impl Default for SessionKeyRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for SessionKeyRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionKeyRegistry")
			.field("teardown_timeout", &self.teardown_timeout)
			.finish_non_exhaustive()
	}
}

impl SessionKeyRegistry {
	pub fn new() -> Self {
		Self::with_teardown_timeout(DEFAULT_TEARDOWN_TIMEOUT)
	}

	pub fn with_teardown_timeout(teardown_timeout: Duration) -> Self {
		Self {
			sessions: RwLock::new(HashMap::new()),
			teardown_timeout,
		}
	}

	/// Generate a keypair for `session_id`, replacing and destroying any previous one.
	#[instrument(skip(self))]
	pub async fn create_session_key(&self, session_id: &str) -> PublicKeyInfo {
		let keypair = SessionKeyPair::generate(session_id);
		let info = keypair.public_info();
		let slot = Arc::new(SessionSlot::new(keypair));

		let previous = self
			.sessions
			.write()
			.await
			.insert(session_id.to_string(), slot);

		if let Some(previous) = previous {
			debug!("replacing existing session key");
			let _ = previous.replaced_by.set(info.kid.clone());
			self.teardown(session_id, previous).await;
		}

		info!(kid = %info.kid, "session key created");
		info
	}

	pub async fn get_public_key(&self, session_id: &str) -> SecretsResult<PublicKeyInfo> {
		let slot = self.slot(session_id).await?;
		let guard = slot.keypair.read().await;
		guard
			.as_ref()
			.map(SessionKeyPair::public_info)
			.ok_or_else(|| not_found(session_id))
	}

	pub async fn decryptor(&self, session_id: &str) -> SecretsResult<SessionDecryptor> {
		let slot = self.slot(session_id).await?;
		Ok(SessionDecryptor {
			session_id: session_id.to_string(),
			slot,
		})
	}

	/// Destroy the session key. Idempotent.
	#[instrument(skip(self))]
	pub async fn destroy(&self, session_id: &str) {
		let removed = self.sessions.write().await.remove(session_id);
		match removed {
			Some(slot) => {
				self.teardown(session_id, slot).await;
				info!("session key destroyed");
			}
			None => debug!("no session key to destroy"),
		}
	}

	/// Destroy every session key, e.g. at process shutdown.
	pub async fn destroy_all(&self) {
		let drained: Vec<(String, Arc<SessionSlot>)> =
			self.sessions.write().await.drain().collect();
		let count = drained.len();

		for (session_id, slot) in drained {
			self.teardown(&session_id, slot).await;
		}

		info!(count, "all session keys destroyed");
	}

	pub async fn session_count(&self) -> usize {
		self.sessions.read().await.len()
	}

	async fn slot(&self, session_id: &str) -> SecretsResult<Arc<SessionSlot>> {
		self.sessions
			.read()
			.await
			.get(session_id)
			.cloned()
			.ok_or_else(|| not_found(session_id))
	}

	async fn teardown(&self, session_id: &str, slot: Arc<SessionSlot>) {
		slot.destroyed.store(true, Ordering::Release);

		match tokio::time::timeout(self.teardown_timeout, slot.keypair.write()).await {
			Ok(mut guard) => {
				if let Some(mut keypair) = guard.take() {
					keypair.wipe();
				}
			}
			Err(_) => {
				// The key is still zeroized on drop once the last handle goes away.
				warn!(
					session_id,
					timeout_ms = self.teardown_timeout.as_millis() as u64,
					"in-flight decrypts outlived teardown wait"
				);
			}
		}
	}
}

fn not_found(session_id: &str) -> SecretsError {
	SecretsError::SessionNotFound {
		session_id: session_id.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crypto_box::{aead::OsRng as AeadRng, PublicKey};

	/// Seal the way an external client would: from the published info only.
	fn seal_for(info: &PublicKeyInfo, plaintext: &str) -> EncryptedPayload {
		let raw: [u8; KEY_SIZE] = STANDARD
			.decode(&info.public_key_b64)
			.unwrap()
			.try_into()
			.unwrap();
		let sealed = PublicKey::from(raw)
			.seal(&mut AeadRng, plaintext.as_bytes())
			.unwrap();
		EncryptedPayload::sealed_box(STANDARD.encode(sealed), info.kid.clone())
	}

	mod keypair {
		use super::*;

		#[test]
		fn kid_is_128_bit_url_safe() {
			let keypair = SessionKeyPair::generate("s1");
			let decoded = URL_SAFE_NO_PAD.decode(keypair.kid()).unwrap();
			assert_eq!(decoded.len(), KID_BYTES);
			assert!(!keypair.kid().contains('='));
		}

		#[test]
		fn public_info_shape() {
			let keypair = SessionKeyPair::generate("s1");
			let info = keypair.public_info();
			assert_eq!(info.algorithm, "SealedBox");
			assert_eq!(info.encoding, "base64");
			assert_eq!(info.max_ciphertext_bytes, 65536);
			assert_eq!(STANDARD.decode(&info.public_key_b64).unwrap().len(), KEY_SIZE);
		}

		#[test]
		fn debug_does_not_print_private_key() {
			let keypair = SessionKeyPair::generate("s1");
			let debug = format!("{keypair:?}");
			assert!(debug.contains("REDACTED"));
			assert!(debug.contains(keypair.kid()));
		}

		#[test]
		fn generated_keys_differ() {
			let a = SessionKeyPair::generate("s1");
			let b = SessionKeyPair::generate("s1");
			assert_ne!(a.kid(), b.kid());
			assert_ne!(a.public_key_bytes(), b.public_key_bytes());
		}
	}

	mod lifecycle {
		use super::*;

		/// Ciphertext produced from the published key decrypts inside the session.
		#[tokio::test]
		async fn round_trip_via_published_key() {
			let registry = SessionKeyRegistry::new();
			registry.create_session_key("s1").await;

			let info = registry.get_public_key("s1").await.unwrap();
			let payload = seal_for(&info, "correct horse battery staple");

			let decryptor = registry.decryptor("s1").await.unwrap();
			let secret = decryptor.decrypt(&payload).await.unwrap();
			assert_eq!(secret.expose(), "correct horse battery staple");
		}

		#[tokio::test]
		async fn unknown_session_is_not_found() {
			let registry = SessionKeyRegistry::new();
			assert!(matches!(
				registry.get_public_key("nope").await,
				Err(SecretsError::SessionNotFound { .. })
			));
			assert!(matches!(
				registry.decryptor("nope").await,
				Err(SecretsError::SessionNotFound { .. })
			));
		}

		/// Two sessions never open each other's envelopes.
		#[tokio::test]
		async fn sessions_are_isolated() {
			let registry = SessionKeyRegistry::new();
			let info_a = registry.create_session_key("a").await;
			registry.create_session_key("b").await;

			let payload = seal_for(&info_a, "for a only");
			let decryptor_b = registry.decryptor("b").await.unwrap();

			assert!(matches!(
				decryptor_b.decrypt(&payload).await,
				Err(SecretsError::KeyMismatch { .. })
			));
		}

		#[tokio::test]
		async fn recreate_replaces_previous_key() {
			let registry = SessionKeyRegistry::new();
			let old = registry.create_session_key("s1").await;
			let old_payload = seal_for(&old, "old");

			let new = registry.create_session_key("s1").await;
			assert_ne!(old.kid, new.kid);
			assert_eq!(registry.session_count().await, 1);

			let decryptor = registry.decryptor("s1").await.unwrap();
			assert!(matches!(
				decryptor.decrypt(&old_payload).await,
				Err(SecretsError::KeyMismatch { .. })
			));
			assert_eq!(
				decryptor.decrypt(&seal_for(&new, "new")).await.unwrap().expose(),
				"new"
			);
		}

		/// A handle taken before re-keying sees the old ciphertext as bound to a stale kid.
		#[tokio::test]
		async fn held_decryptor_reports_key_mismatch_after_rekey() {
			let registry = SessionKeyRegistry::new();
			let old = registry.create_session_key("s1").await;
			let held = registry.decryptor("s1").await.unwrap();

			let new = registry.create_session_key("s1").await;

			match held.decrypt(&seal_for(&old, "stale")).await {
				Err(SecretsError::KeyMismatch { expected, actual }) => {
					assert_eq!(expected, new.kid);
					assert_eq!(actual, old.kid);
				}
				other => panic!("expected KeyMismatch, got {other:?}"),
			}
		}

		/// After destroy every path to the key reports SessionNotFound.
		#[tokio::test]
		async fn destroy_implies_not_found() {
			let registry = SessionKeyRegistry::new();
			let info = registry.create_session_key("s1").await;
			let held = registry.decryptor("s1").await.unwrap();

			registry.destroy("s1").await;

			assert!(matches!(
				registry.get_public_key("s1").await,
				Err(SecretsError::SessionNotFound { .. })
			));
			assert!(matches!(
				registry.decryptor("s1").await,
				Err(SecretsError::SessionNotFound { .. })
			));
			assert!(matches!(
				held.decrypt(&seal_for(&info, "late")).await,
				Err(SecretsError::SessionNotFound { .. })
			));
		}

		#[tokio::test]
		async fn destroy_is_idempotent() {
			let registry = SessionKeyRegistry::new();
			registry.create_session_key("s1").await;
			registry.destroy("s1").await;
			registry.destroy("s1").await;
			registry.destroy("never-existed").await;
			assert_eq!(registry.session_count().await, 0);
		}

		#[tokio::test]
		async fn destroy_all_clears_registry() {
			let registry = SessionKeyRegistry::new();
			for id in ["a", "b", "c"] {
				registry.create_session_key(id).await;
			}
			assert_eq!(registry.session_count().await, 3);

			registry.destroy_all().await;

			assert_eq!(registry.session_count().await, 0);
			assert!(registry.get_public_key("b").await.is_err());
		}
	}

	mod teardown {
		use super::*;

		/// Teardown wipes the key once the in-flight reader releases its lock.
		#[tokio::test]
		async fn waits_for_in_flight_reader() {
			let registry = Arc::new(SessionKeyRegistry::with_teardown_timeout(
				Duration::from_secs(5),
			));
			registry.create_session_key("s1").await;
			let slot = registry.slot("s1").await.unwrap();

			let reader = slot.keypair.read().await;
			let destroyer = {
				let registry = Arc::clone(&registry);
				tokio::spawn(async move { registry.destroy("s1").await })
			};

			tokio::time::sleep(Duration::from_millis(20)).await;
			assert!(!destroyer.is_finished());
			assert!(matches!(
				registry.decryptor("s1").await,
				Err(SecretsError::SessionNotFound { .. })
			));

			drop(reader);
			destroyer.await.unwrap();
			assert!(slot.keypair.read().await.is_none());
		}

		/// A stuck reader bounds the wait; the handle is still unusable afterwards.
		#[tokio::test]
		async fn gives_up_after_timeout() {
			let registry =
				SessionKeyRegistry::with_teardown_timeout(Duration::from_millis(20));
			let info = registry.create_session_key("s1").await;
			let decryptor = registry.decryptor("s1").await.unwrap();
			let slot = Arc::clone(&decryptor.slot);

			let reader = slot.keypair.read().await;
			registry.destroy("s1").await;
			drop(reader);

			assert!(matches!(
				decryptor.decrypt(&seal_for(&info, "late")).await,
				Err(SecretsError::SessionNotFound { .. })
			));
		}
	}

	mod round_trip {
		use super::*;
		use proptest::prelude::*;

		proptest! {
			#![proptest_config(ProptestConfig::with_cases(32))]

			/// Anything sealed to the published key opens to the same text, and
			/// never under another session's key.
			#[test]
			fn sealed_text_opens_only_for_its_session(plaintext in "\\PC{0,64}") {
				tokio_test::block_on(async {
					let registry = SessionKeyRegistry::new();
					let info = registry.create_session_key("mine").await;
					registry.create_session_key("other").await;
					let payload = seal_for(&info, &plaintext);

					let mine = registry.decryptor("mine").await.unwrap();
					let opened = mine.decrypt(&payload).await.unwrap();
					assert_eq!(opened.expose(), &plaintext);

					let other = registry.decryptor("other").await.unwrap();
					assert!(matches!(
						other.decrypt(&payload).await,
						Err(SecretsError::KeyMismatch { .. })
					));
				});
			}
		}
	}
}
