// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use satchel_common_core::{ConfigValue, Scalar};
use satchel_common_secret::ResolvedSecrets;
use tracing::debug;

use crate::error::{SecretsError, SecretsResult};

/// Merge resolved secrets into a copy of `base` by dotted path.
///
/// Paths are applied in lexicographic order, so the result does not depend on
/// source order and `a.b` next to `a.b.c` always conflicts. Missing
/// intermediate mappings are created; a non-mapping intermediate is a
/// [`SecretsError::PathConflict`]. A null base counts as an empty mapping.
pub fn hydrate(base: &ConfigValue, secrets: &ResolvedSecrets) -> SecretsResult<ConfigValue> {
	let mut tree = match base {
		ConfigValue::Scalar(Scalar::Null) => ConfigValue::empty_mapping(),
		other => other.clone(),
	};

	for (path, value) in secrets {
		let segments: Vec<&str> = path.split('.').collect();
		if segments.iter().any(|s| s.is_empty()) {
			return Err(SecretsError::InvalidSecretPath { path: path.clone() });
		}
		let conflict = || SecretsError::PathConflict { path: path.clone() };

		let (leaf, parents) = segments.split_last().ok_or_else(conflict)?;
		let mut node = &mut tree;
		for segment in parents {
			node = node
				.as_mapping_mut()
				.ok_or_else(conflict)?
				.entry((*segment).to_string())
				.or_insert_with(ConfigValue::empty_mapping);
		}

		node.as_mapping_mut()
			.ok_or_else(conflict)?
			.insert((*leaf).to_string(), ConfigValue::string(value.expose().as_str()));
	}

	debug!(count = secrets.len(), "config hydrated");
	Ok(tree)
}
