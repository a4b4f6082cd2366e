// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

use crate::SecretString;

/// Resolved secret values keyed by dotted config path.
///
/// Iteration is in lexicographic path order. `Debug` lists keys only, and each
/// value is zeroized when the map is dropped.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ResolvedSecrets {
	entries: BTreeMap<String, SecretString>,
}

impl ResolvedSecrets {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert or replace a value, returning the previous one.
	pub fn insert(&mut self, path: impl Into<String>, value: SecretString) -> Option<SecretString> {
		self.entries.insert(path.into(), value)
	}

	pub fn get(&self, path: &str) -> Option<&SecretString> {
		self.entries.get(path)
	}

	pub fn contains_key(&self, path: &str) -> bool {
		self.entries.contains_key(path)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.entries.keys().map(String::as_str)
	}

	pub fn iter(&self) -> btree_map::Iter<'_, String, SecretString> {
		self.entries.iter()
	}

	/// Fold `other` into `self`; entries from `other` win on collision.
	pub fn merge(&mut self, other: ResolvedSecrets) {
		self.entries.extend(other.entries);
	}
}

impl fmt::Debug for ResolvedSecrets {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ResolvedSecrets")
			.field("keys", &self.entries.keys().collect::<Vec<_>>())
			.finish()
	}
}

impl FromIterator<(String, SecretString)> for ResolvedSecrets {
	fn from_iter<I: IntoIterator<Item = (String, SecretString)>>(iter: I) -> Self {
		Self {
			entries: iter.into_iter().collect(),
		}
	}
}

impl IntoIterator for ResolvedSecrets {
	type Item = (String, SecretString);
	type IntoIter = btree_map::IntoIter<String, SecretString>;

	fn into_iter(self) -> Self::IntoIter {
		self.entries.into_iter()
	}
}

impl<'a> IntoIterator for &'a ResolvedSecrets {
	type Item = (&'a String, &'a SecretString);
	type IntoIter = btree_map::Iter<'a, String, SecretString>;

	fn into_iter(self) -> Self::IntoIter {
		self.entries.iter()
	}
}
