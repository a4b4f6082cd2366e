// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Connector configuration tree.
//!
//! Configuration arrives as JSON and is handed on as JSON, but everything in
//! between works on [`ConfigValue`], which only has the three shapes a
//! connector config can take. Mapping keys are kept sorted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
	Null,
	Bool(bool),
	Integer(i64),
	Float(f64),
	String(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum ConfigValue {
	Scalar(Scalar),
	Mapping(BTreeMap<String, ConfigValue>),
	Sequence(Vec<ConfigValue>),
}

impl Default for ConfigValue {
	fn default() -> Self {
		ConfigValue::Mapping(BTreeMap::new())
	}
}

impl ConfigValue {
	pub fn null() -> Self {
		ConfigValue::Scalar(Scalar::Null)
	}

	pub fn string(value: impl Into<String>) -> Self {
		ConfigValue::Scalar(Scalar::String(value.into()))
	}

	pub fn empty_mapping() -> Self {
		ConfigValue::Mapping(BTreeMap::new())
	}

	pub fn as_mapping(&self) -> Option<&BTreeMap<String, ConfigValue>> {
		match self {
			ConfigValue::Mapping(map) => Some(map),
			_ => None,
		}
	}

	pub fn as_mapping_mut(&mut self) -> Option<&mut BTreeMap<String, ConfigValue>> {
		match self {
			ConfigValue::Mapping(map) => Some(map),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			ConfigValue::Scalar(Scalar::String(s)) => Some(s),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			ConfigValue::Scalar(Scalar::Bool(b)) => Some(*b),
			_ => None,
		}
	}

	pub fn is_mapping(&self) -> bool {
		matches!(self, ConfigValue::Mapping(_))
	}

	/// Look up a child by dotted path. An empty path returns `self`.
	pub fn get_path(&self, path: &str) -> Option<&ConfigValue> {
		if path.is_empty() {
			return Some(self);
		}
		path
			.split('.')
			.try_fold(self, |node, segment| node.as_mapping()?.get(segment))
	}

	pub fn to_json(&self) -> Value {
		Value::from(self.clone())
	}
}

impl From<Value> for ConfigValue {
	fn from(value: Value) -> Self {
		match value {
			Value::Null => ConfigValue::Scalar(Scalar::Null),
			Value::Bool(b) => ConfigValue::Scalar(Scalar::Bool(b)),
			Value::Number(n) => ConfigValue::Scalar(number_to_scalar(&n)),
			Value::String(s) => ConfigValue::Scalar(Scalar::String(s)),
			Value::Array(items) => {
				ConfigValue::Sequence(items.into_iter().map(ConfigValue::from).collect())
			}
			Value::Object(map) => ConfigValue::Mapping(
				map.into_iter()
					.map(|(k, v)| (k, ConfigValue::from(v)))
					.collect(),
			),
		}
	}
}

fn number_to_scalar(n: &Number) -> Scalar {
	if let Some(i) = n.as_i64() {
		Scalar::Integer(i)
	} else {
		// u64 above i64::MAX and real floats both land here
		Scalar::Float(n.as_f64().unwrap_or(f64::NAN))
	}
}

impl From<ConfigValue> for Value {
	fn from(value: ConfigValue) -> Self {
		match value {
			ConfigValue::Scalar(scalar) => match scalar {
				Scalar::Null => Value::Null,
				Scalar::Bool(b) => Value::Bool(b),
				Scalar::Integer(i) => Value::Number(i.into()),
				// JSON has no NaN or infinity
				Scalar::Float(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
				Scalar::String(s) => Value::String(s),
			},
			ConfigValue::Mapping(map) => Value::Object(
				map.into_iter()
					.map(|(k, v)| (k, Value::from(v)))
					.collect::<Map<String, Value>>(),
			),
			ConfigValue::Sequence(items) => {
				Value::Array(items.into_iter().map(Value::from).collect())
			}
		}
	}
}

impl From<&str> for ConfigValue {
	fn from(value: &str) -> Self {
		ConfigValue::string(value)
	}
}

impl From<String> for ConfigValue {
	fn from(value: String) -> Self {
		ConfigValue::string(value)
	}
}

impl From<BTreeMap<String, ConfigValue>> for ConfigValue {
	fn from(map: BTreeMap<String, ConfigValue>) -> Self {
		ConfigValue::Mapping(map)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use serde_json::json;

	mod conversions {
		use super::*;

		#[test]
		fn json_object_becomes_mapping() {
			let value = ConfigValue::from(json!({
				"host": "db.internal",
				"port": 5432,
				"ssl": true,
				"ratio": 0.5,
				"tags": ["a", null],
			}));

			let map = value.as_mapping().unwrap();
			assert_eq!(map["host"], ConfigValue::string("db.internal"));
			assert_eq!(map["port"], ConfigValue::Scalar(Scalar::Integer(5432)));
			assert_eq!(map["ssl"], ConfigValue::Scalar(Scalar::Bool(true)));
			assert_eq!(map["ratio"], ConfigValue::Scalar(Scalar::Float(0.5)));
			assert_eq!(
				map["tags"],
				ConfigValue::Sequence(vec![ConfigValue::string("a"), ConfigValue::null()])
			);
		}

		#[test]
		fn large_unsigned_becomes_float() {
			let value = ConfigValue::from(json!(u64::MAX));
			assert!(matches!(value, ConfigValue::Scalar(Scalar::Float(_))));
		}

		#[test]
		fn non_finite_float_serializes_as_null() {
			let value = ConfigValue::Scalar(Scalar::Float(f64::INFINITY));
			assert_eq!(value.to_json(), Value::Null);
		}

		/// Serde goes through the JSON conversions, so request bodies parse directly.
		#[test]
		fn serde_uses_json_shape() {
			let parsed: ConfigValue = serde_json::from_str(r#"{"a":{"b":[1,2]}}"#).unwrap();
			assert_eq!(
				parsed.get_path("a.b"),
				Some(&ConfigValue::Sequence(vec![
					ConfigValue::Scalar(Scalar::Integer(1)),
					ConfigValue::Scalar(Scalar::Integer(2)),
				]))
			);
			assert_eq!(serde_json::to_string(&parsed).unwrap(), r#"{"a":{"b":[1,2]}}"#);
		}
	}

	mod paths {
		use super::*;

		#[test]
		fn get_path_walks_mappings() {
			let value = ConfigValue::from(json!({"credentials": {"api_key": "x"}}));
			assert_eq!(
				value.get_path("credentials.api_key").and_then(ConfigValue::as_str),
				Some("x")
			);
			assert!(value.get_path("credentials.missing").is_none());
			assert!(value.get_path("credentials.api_key.deeper").is_none());
		}

		#[test]
		fn empty_path_is_root() {
			let value = ConfigValue::from(json!({"a": 1}));
			assert_eq!(value.get_path(""), Some(&value));
		}
	}

	fn arb_json() -> impl Strategy<Value = Value> {
		let leaf = prop_oneof![
			Just(Value::Null),
			any::<bool>().prop_map(Value::Bool),
			any::<i64>().prop_map(|i| Value::Number(i.into())),
			"[a-z0-9 ]{0,12}".prop_map(Value::String),
		];
		leaf.prop_recursive(4, 32, 6, |inner| {
			prop_oneof![
				prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
				prop::collection::btree_map("[a-z_]{1,8}", inner, 0..4)
					.prop_map(|m| Value::Object(m.into_iter().collect())),
			]
		})
	}

	proptest! {
		/// Integer-only JSON survives the trip through the tree unchanged.
		#[test]
		fn json_conversion_is_lossless_without_floats(value in arb_json()) {
			let tree = ConfigValue::from(value.clone());
			prop_assert_eq!(Value::from(tree), value);
		}
	}
}
