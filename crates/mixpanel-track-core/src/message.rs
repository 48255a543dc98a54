// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Track requests and the outbound message built from them.
//!
//! A [`TrackRequest`] carries everything a caller knows about one event. It is
//! validated and turned into an [`OutboundMessage`] by [`build_message`], which
//! produces the document the track endpoint expects:
//!
//! ```json
//! {
//!     "event": "play",
//!     "properties": {
//!         "distinct_id": "50479b24671bf",
//!         "ip": "123.123.123.123",
//!         "token": "e3bc4100330c35722740fb8c6f5abddc",
//!         "time": 1245613885,
//!         "mp_name_tag": "Test Name",
//!         "action": "play"
//!     }
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::properties::Properties;

/// Reserved property names inside the `properties` object.
pub mod keys {
	pub const DISTINCT_ID: &str = "distinct_id";
	pub const IP: &str = "ip";
	pub const TOKEN: &str = "token";
	pub const TIME: &str = "time";
	pub const NAME_TAG: &str = "mp_name_tag";
}

/// One event to track.
///
/// `event` and `distinct_id` are required, but their absence is only detected
/// when the request is built into a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackRequest {
	pub event: Option<String>,
	pub distinct_id: Option<String>,
	/// Human readable label for the user, shown in streams.
	pub name_tag: Option<String>,
	/// Raw IP address used for geolocation.
	pub ip: Option<String>,
	/// When the event happened. Sent with whole-second precision.
	pub time: Option<DateTime<Utc>>,
	pub properties: Properties,
}

impl TrackRequest {
	/// Creates a request with both required fields set.
	pub fn new(event: impl Into<String>, distinct_id: impl Into<String>) -> Self {
		Self {
			event: Some(event.into()),
			distinct_id: Some(distinct_id.into()),
			..Self::default()
		}
	}

	pub fn with_name_tag(mut self, name_tag: impl Into<String>) -> Self {
		self.name_tag = Some(name_tag.into());
		self
	}

	pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
		self.ip = Some(ip.into());
		self
	}

	pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
		self.time = Some(time);
		self
	}

	/// Replaces the custom properties.
	pub fn with_properties(mut self, properties: Properties) -> Self {
		self.properties = properties;
		self
	}

	/// Adds a single custom property.
	pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.properties = std::mem::take(&mut self.properties).insert(key, value);
		self
	}

}

/// The document sent to the track endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
	event: String,
	properties: Map<String, Value>,
}

impl OutboundMessage {
	pub fn event(&self) -> &str {
		&self.event
	}

	pub fn properties(&self) -> &Map<String, Value> {
		&self.properties
	}
}

/// Builds the outbound message for `request`, stamping it with `token`.
///
/// Custom properties are written after the reserved keys, so a custom property
/// named like a reserved key replaces the reserved value.
pub fn build_message(
	request: &TrackRequest,
	token: &str,
) -> Result<OutboundMessage, ValidationError> {
	let event = request.event.as_ref().ok_or(ValidationError::MissingEvent)?;
	let distinct_id = request
		.distinct_id
		.as_ref()
		.ok_or(ValidationError::MissingDistinctId)?;

	let mut properties = Map::new();
	properties.insert(keys::DISTINCT_ID.to_string(), distinct_id.clone().into());
	if let Some(ip) = &request.ip {
		properties.insert(keys::IP.to_string(), ip.clone().into());
	}
	properties.insert(keys::TOKEN.to_string(), token.into());
	if let Some(time) = &request.time {
		// DateTime::timestamp floors, sub-second precision is dropped
		properties.insert(keys::TIME.to_string(), time.timestamp().into());
	}
	if let Some(name_tag) = &request.name_tag {
		properties.insert(keys::NAME_TAG.to_string(), name_tag.clone().into());
	}
	for (key, value) in request.properties.iter() {
		properties.insert(key.to_string(), value.into());
	}

	Ok(OutboundMessage {
		event: event.clone(),
		properties,
	})
}
