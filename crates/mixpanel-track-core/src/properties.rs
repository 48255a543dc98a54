// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Helper for building custom event properties.

use std::collections::{BTreeMap, HashMap};

/// A builder for the custom string properties attached to an event.
///
/// Custom properties are merged flat into the `properties` object of the
/// outgoing message, next to the reserved keys.
///
/// # Example
///
/// ```
/// use mixpanel_track_core::Properties;
///
/// let props = Properties::new()
///     .insert("action", "play")
///     .insert("plan", "premium");
/// assert_eq!(props.get("action"), Some("play"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
	inner: BTreeMap<String, String>,
}

impl Properties {
	/// Creates a new empty Properties builder.
	pub fn new() -> Self {
		Self {
			inner: BTreeMap::new(),
		}
	}

	/// Inserts a key-value pair, replacing any previous value for the key.
	pub fn insert<K, V>(mut self, key: K, value: V) -> Self
	where
		K: Into<String>,
		V: Into<String>,
	{
		self.inner.insert(key.into(), value.into());
		self
	}

	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	pub fn len(&self) -> usize {
		self.inner.len()
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.inner.get(key).map(String::as_str)
	}

	/// Iterates over the properties in key order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}
}

impl<K, V> FromIterator<(K, V)> for Properties
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self {
			inner: iter
				.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.collect(),
		}
	}
}

impl From<HashMap<String, String>> for Properties {
	fn from(map: HashMap<String, String>) -> Self {
		map.into_iter().collect()
	}
}

impl From<BTreeMap<String, String>> for Properties {
	fn from(map: BTreeMap<String, String>) -> Self {
		Self { inner: map }
	}
}
