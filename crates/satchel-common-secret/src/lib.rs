// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret buffer type for plaintext secrets and private key material.
//!
//! [`Secret<T>`] wraps a value that must never leave the process in
//! plaintext by accident:
//!
//! - `Debug`, `Display` and `Serialize` always emit [`REDACTED`]
//! - the inner value is overwritten with zeroes when the wrapper is dropped
//! - reading the value requires an explicit `.expose()` call
//!
//! Zeroization is best-effort. Copies the compiler makes on moves, and pages
//! swapped to disk, are outside what this type can control.
//!
//! ```
//! use satchel_common_secret::{SecretString, REDACTED};
//!
//! let password = SecretString::new("hunter2".to_string());
//! assert_eq!(format!("{password}"), REDACTED);
//! assert_eq!(password.expose(), "hunter2");
//! ```

use std::fmt;
use zeroize::Zeroize;

mod resolved;

pub use resolved::ResolvedSecrets;

/// Placeholder written wherever a secret would otherwise appear.
pub const REDACTED: &str = "***REDACTED***";

/// A value that is redacted in all formatting and zeroized on drop.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct Secret<T>
where
	T: Zeroize,
{
	inner: T,
}

/// Secret text: plaintext secret values, passwords.
pub type SecretString = Secret<String>;

/// Secret binary material of arbitrary length.
pub type SecretBytes = Secret<Vec<u8>>;

/// A 32-byte private key.
pub type SecretKeyBytes = Secret<[u8; 32]>;

impl<T> Secret<T>
where
	T: Zeroize,
{
	pub fn new(inner: T) -> Self {
		Self { inner }
	}

	/// Borrow the plaintext. Every call site is a place where the secret is used.
	pub fn expose(&self) -> &T {
		&self.inner
	}

	pub fn expose_mut(&mut self) -> &mut T {
		&mut self.inner
	}

	/// Overwrite the inner value now instead of waiting for drop.
	pub fn wipe(&mut self) {
		self.inner.zeroize();
	}
}

impl Secret<String> {
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	pub fn len(&self) -> usize {
		self.inner.len()
	}
}

impl From<String> for Secret<String> {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}

impl From<&str> for Secret<String> {
	fn from(value: &str) -> Self {
		Self::new(value.to_string())
	}
}

impl<T> Clone for Secret<T>
where
	T: Zeroize + Clone,
{
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T> fmt::Debug for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Secret").field(&REDACTED).finish()
	}
}

impl<T> fmt::Display for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<T> PartialEq for Secret<T>
where
	T: Zeroize + PartialEq,
{
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl<T> Eq for Secret<T> where T: Zeroize + Eq {}

// `tracing::Value` is sealed, so structured logging goes through Display
// (`field = %secret`) or Debug (`?secret`). Both are redacted above.

#[cfg(feature = "serde")]
mod serde_impl {
	use super::{Secret, REDACTED};
	use serde::{Deserialize, Deserializer, Serialize, Serializer};
	use zeroize::Zeroize;

	impl<T> Serialize for Secret<T>
	where
		T: Serialize + Zeroize,
	{
		fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			serializer.serialize_str(REDACTED)
		}
	}

	impl<'de, T> Deserialize<'de> for Secret<T>
	where
		T: Deserialize<'de> + Zeroize,
	{
		fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
		where
			D: Deserializer<'de>,
		{
			T::deserialize(deserializer).map(Secret::new)
		}
	}
}
