// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Transport encoding of outbound messages.
//!
//! The track endpoint takes the message as standard base64 of its compact JSON
//! text, passed in the `data` query parameter.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::EncodeError;
use crate::message::OutboundMessage;

/// The Mixpanel track endpoint.
pub const MIXPANEL_API_ENDPOINT: &str = "http://api.mixpanel.com/track/";

/// Query parameter carrying the encoded message.
pub const DATA_PARAM: &str = "data";

/// Serializes `message` to compact JSON text.
pub fn to_json(message: &OutboundMessage) -> Result<String, EncodeError> {
	Ok(serde_json::to_string(message)?)
}

/// Encodes JSON text as standard base64.
pub fn encode_payload(json: &str) -> String {
	STANDARD.encode(json.as_bytes())
}

/// Decodes a `data` value back into JSON text.
pub fn decode_payload(data: &str) -> Result<String, EncodeError> {
	let bytes = STANDARD.decode(data)?;
	Ok(String::from_utf8(bytes)?)
}

/// Builds the request target for already serialized JSON text.
pub fn url_for_json(endpoint: &str, json: &str) -> String {
	format!("{endpoint}?{DATA_PARAM}={}", encode_payload(json))
}

/// Builds the request target `<endpoint>?data=<base64>` for `message`.
pub fn encode_url(endpoint: &str, message: &OutboundMessage) -> Result<String, EncodeError> {
	let json = to_json(message)?;
	Ok(url_for_json(endpoint, &json))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::message::{build_message, TrackRequest};

	fn message(request: TrackRequest) -> OutboundMessage {
		build_message(&request, "abc").unwrap()
	}

	#[test]
	fn test_json_is_compact_with_wire_field_names() {
		let json = to_json(&message(TrackRequest::new("test6", "50479b24671bf"))).unwrap();
		assert_eq!(
			json,
			r#"{"event":"test6","properties":{"distinct_id":"50479b24671bf","token":"abc"}}"#
		);
	}

	#[test]
	fn test_url_layout() {
		let url = encode_url(
			MIXPANEL_API_ENDPOINT,
			&message(TrackRequest::new("test6", "50479b24671bf")),
		)
		.unwrap();

		assert!(url.starts_with("http://api.mixpanel.com/track/?data="));
		assert!(!url.contains(' '));
	}

	#[test]
	fn test_payload_uses_standard_alphabet() {
		// 0xfb 0xff encodes to "+/8=" with the standard alphabet
		let encoded = STANDARD.encode([0xfb, 0xff]);
		assert_eq!(encoded, "+/8=");
		assert_eq!(encode_payload("??>"), "Pz8+");
	}

	#[test]
	fn test_url_roundtrip_is_byte_identical() {
		let request = TrackRequest::new("play", "user-1")
			.with_name_tag("Zoë")
			.with_property("action", "play");
		let json = to_json(&message(request.clone())).unwrap();
		let url = encode_url("http://localhost/track/", &message(request)).unwrap();

		let data = url.split_once("?data=").unwrap().1;
		assert_eq!(decode_payload(data).unwrap(), json);
	}

	#[test]
	fn test_decode_rejects_invalid_base64() {
		assert!(matches!(
			decode_payload("not base64!"),
			Err(EncodeError::Base64(_))
		));
	}
}
