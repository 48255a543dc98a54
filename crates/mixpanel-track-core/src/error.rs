// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for building and encoding track messages.

use thiserror::Error;

/// A required field of a track request was absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
	#[error("event field is mandatory")]
	MissingEvent,

	#[error("distinct_id field is mandatory")]
	MissingDistinctId,
}

/// The message could not be turned into a request target.
#[derive(Debug, Error)]
pub enum EncodeError {
	/// JSON serialization failed.
	#[error("failed to serialize message: {0}")]
	Json(#[from] serde_json::Error),

	/// The `data` value is not valid base64.
	#[error("invalid base64 payload: {0}")]
	Base64(#[from] base64::DecodeError),

	/// The decoded payload is not UTF-8 text.
	#[error("payload is not valid UTF-8: {0}")]
	Utf8(#[from] std::string::FromUtf8Error),
}
