// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session-scoped secrets for satchel.
//!
//! This crate provides:
//! - Per-session X25519 keypairs ([`SessionKeyRegistry`])
//! - Sealed-box envelope decryption ([`envelope::decrypt`])
//! - Secret resolution from dotenv files, sealed files, inline envelopes and
//!   PrivateBin pastes ([`SecretSourceResolver`])
//! - Dotted-path merge into a config tree ([`hydrate`])
//! - Stub population for secrets still to be filled in ([`populate_stubs`])
//!
//! # Usage
//!
//! ```ignore
//! use satchel_server_secrets::{hydrate, SecretSourceResolver, SessionKeyRegistry};
//!
//! let registry = SessionKeyRegistry::new();
//! let info = registry.create_session_key("session-1").await;
//! // ...client seals a dotenv file against info.public_key_b64...
//! let decryptor = registry.decryptor("session-1").await?;
//! let secrets = resolver.resolve(&sources, Some(&decryptor)).await?;
//! let config = hydrate(&base, &secrets)?;
//! ```

pub mod dotenv;
pub mod envelope;
pub mod error;
pub mod hydrate;
pub mod keys;
pub mod paste;
pub mod resolver;
pub mod source;
pub mod stubs;

pub use envelope::{EncryptedPayload, MAX_CIPHERTEXT_BYTES, SEALED_BOX, SEALED_BOX_ALIAS};
pub use error::{SecretsError, SecretsResult};
pub use hydrate::hydrate;
pub use keys::{
	PublicKeyInfo, SessionDecryptor, SessionKeyPair, SessionKeyRegistry, DEFAULT_TEARDOWN_TIMEOUT,
};
pub use paste::PasteClient;
pub use resolver::{SecretInfo, SecretSourceResolver};
pub use satchel_common_secret::ResolvedSecrets;
pub use source::SecretSourceSpec;
pub use stubs::{populate_stubs, secret_paths_from_spec, StubReport, STUB_VALUE_PREFIX};
