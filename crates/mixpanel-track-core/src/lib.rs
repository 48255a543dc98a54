// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Mixpanel track API.
//!
//! This crate is free of I/O. It provides:
//! - [`TrackRequest`] and [`build_message`]: validation and construction of the
//!   outbound JSON document
//! - [`encode_url`]: base64 transport encoding and request target assembly

pub mod encode;
pub mod error;
pub mod message;
pub mod properties;

pub use encode::{
	decode_payload, encode_payload, encode_url, to_json, url_for_json, DATA_PARAM,
	MIXPANEL_API_ENDPOINT,
};
pub use error::{EncodeError, ValidationError};
pub use message::{build_message, keys, OutboundMessage, TrackRequest};
pub use properties::Properties;
