// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redaction of configuration trees before they cross the trust boundary.
//!
//! Two independent rules mask values with [`REDACTED`]:
//!
//! - **by key**: a mapping entry whose key contains a sensitive keyword, or
//!   matches a known secret key, has its scalar value masked. Sequence items
//!   inherit the flag of the key that holds the sequence.
//! - **by value**: any scalar whose text equals a known secret value is
//!   masked, numbers and booleans included. Known values of at least
//!   [`MIN_EMBEDDED_VALUE_LEN`] characters are also masked where they appear
//!   inside longer strings.
//!
//! Redaction never fails. Subtrees nested deeper than [`MAX_DEPTH`] are
//! replaced wholesale.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use satchel_common_core::{ConfigValue, Scalar};
use satchel_common_secret::{ResolvedSecrets, SecretString};
use tracing::warn;

pub use satchel_common_secret::REDACTED;

/// Substrings that mark a key as sensitive (matched case-insensitively).
pub const SENSITIVE_KEYWORDS: [&str; 9] = [
	"password",
	"token",
	"key",
	"secret",
	"credential",
	"api_key",
	"access_token",
	"refresh_token",
	"client_secret",
];

pub const MAX_DEPTH: usize = 128;

/// Shorter known values are only masked on exact match.
pub const MIN_EMBEDDED_VALUE_LEN: usize = 6;

/// Whether `key` contains one of [`SENSITIVE_KEYWORDS`].
pub fn is_sensitive_key(key: &str) -> bool {
	let lower = key.to_lowercase();
	SENSITIVE_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Redact `value` using the built-in keywords plus the given keys and values.
pub fn redact<K, S, V>(
	value: &ConfigValue,
	known_secret_keys: K,
	known_secret_values: V,
) -> ConfigValue
where
	K: IntoIterator<Item = S>,
	S: AsRef<str>,
	V: IntoIterator<Item = SecretString>,
{
	Redactor::new()
		.with_known_keys(known_secret_keys)
		.with_known_values(known_secret_values)
		.redact(value)
}

#[derive(Clone, Default)]
pub struct Redactor {
	/// Lower-cased bare keys and dotted paths.
	known_keys: HashSet<String>,
	/// Longest first, so a secret that contains another is masked whole.
	known_values: Vec<SecretString>,
}

impl fmt::Debug for Redactor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Redactor")
			.field("known_keys", &self.known_keys.len())
			.field("known_values", &self.known_values.len())
			.finish()
	}
}

impl Redactor {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_known_keys<K, S>(mut self, keys: K) -> Self
	where
		K: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		self.known_keys.extend(
			keys.into_iter()
				.map(|k| k.as_ref().to_lowercase())
				.filter(|k| !k.is_empty()),
		);
		self
	}

	pub fn with_known_values<V>(mut self, values: V) -> Self
	where
		V: IntoIterator<Item = SecretString>,
	{
		for value in values {
			if !value.is_empty() && !self.known_values.contains(&value) {
				self.known_values.push(value);
			}
		}
		self.known_values
			.sort_by(|a, b| b.expose().len().cmp(&a.expose().len()));
		self
	}

	/// A redactor that knows every resolved path, its leaf segment, and its value.
	pub fn from_resolved(resolved: &ResolvedSecrets) -> Self {
		let mut keys = Vec::with_capacity(resolved.len() * 2);
		for path in resolved.keys() {
			keys.push(path.to_string());
			if let Some(leaf) = path.rsplit('.').next() {
				keys.push(leaf.to_string());
			}
		}

		Self::new()
			.with_known_keys(keys)
			.with_known_values(resolved.iter().map(|(_, value)| value.clone()))
	}

	/// Return a copy of `value` with the same shape and sensitive leaves masked.
	pub fn redact(&self, value: &ConfigValue) -> ConfigValue {
		self.redact_node(value, "", false, 0)
	}

	/// Mask known secret values in free text such as error messages.
	pub fn redact_text<'a>(&self, text: &'a str) -> Cow<'a, str> {
		if self.known_values.iter().any(|v| v.expose() == text) {
			return Cow::Owned(REDACTED.to_string());
		}

		let mut out = Cow::Borrowed(text);
		for value in &self.known_values {
			let value = value.expose();
			if value.chars().count() >= MIN_EMBEDDED_VALUE_LEN && out.contains(value.as_str()) {
				out = Cow::Owned(out.replace(value.as_str(), REDACTED));
			}
		}
		out
	}

	fn key_is_flagged(&self, key: &str, path: &str) -> bool {
		if is_sensitive_key(key) {
			return true;
		}
		if self.known_keys.is_empty() {
			return false;
		}
		self.known_keys.contains(&key.to_lowercase())
			|| self.known_keys.contains(&path.to_lowercase())
	}

	fn redact_node(
		&self,
		value: &ConfigValue,
		path: &str,
		flagged: bool,
		depth: usize,
	) -> ConfigValue {
		if depth > MAX_DEPTH {
			warn!(path, max_depth = MAX_DEPTH, "config nested too deeply, masking subtree");
			return placeholder();
		}

		match value {
			ConfigValue::Scalar(_) if flagged => placeholder(),
			ConfigValue::Scalar(scalar) => ConfigValue::Scalar(self.redact_scalar(scalar)),
			ConfigValue::Mapping(map) => {
				let redacted: BTreeMap<String, ConfigValue> = map
					.iter()
					.map(|(key, child)| {
						let child_path = join_path(path, key);
						let child_flagged = self.key_is_flagged(key, &child_path);
						(
							key.clone(),
							self.redact_node(child, &child_path, child_flagged, depth + 1),
						)
					})
					.collect();
				ConfigValue::Mapping(redacted)
			}
			ConfigValue::Sequence(items) => ConfigValue::Sequence(
				items
					.iter()
					.map(|item| self.redact_node(item, path, flagged, depth + 1))
					.collect(),
			),
		}
	}

	fn redact_scalar(&self, scalar: &Scalar) -> Scalar {
		match scalar {
			Scalar::String(s) => Scalar::String(self.redact_text(s).into_owned()),
			other if self.is_known_value(&non_string_text(other)) => {
				Scalar::String(REDACTED.to_string())
			}
			other => other.clone(),
		}
	}

	fn is_known_value(&self, text: &str) -> bool {
		self.known_values.iter().any(|v| v.expose() == text)
	}
}

/// How a non-string scalar reads once a connector has parsed a secret into it.
fn non_string_text(scalar: &Scalar) -> String {
	match scalar {
		Scalar::Bool(b) => b.to_string(),
		Scalar::Integer(i) => i.to_string(),
		Scalar::Float(f) => f.to_string(),
		Scalar::Null | Scalar::String(_) => String::new(),
	}
}

fn placeholder() -> ConfigValue {
	ConfigValue::string(REDACTED)
}

fn join_path(parent: &str, key: &str) -> String {
	if parent.is_empty() {
		key.to_string()
	} else {
		format!("{parent}.{key}")
	}
}
