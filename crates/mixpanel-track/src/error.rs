// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the track client.

use mixpanel_track_core::{EncodeError, ValidationError};
use thiserror::Error;

use crate::request::CookieError;

/// Track client errors.
///
/// Everything that can go wrong with a single event is reported through its
/// [`TrackHandle`](crate::TrackHandle); only builder errors are returned
/// directly.
#[derive(Debug, Error)]
pub enum TrackError {
	/// `event` or `distinct_id` was absent.
	#[error("missing required field: {0}")]
	MissingRequiredField(#[from] ValidationError),

	/// The request target could not be parsed as a URL.
	#[error("track URL is malformed: {0}")]
	MalformedEndpoint(String),

	/// Network or IO fault while calling the endpoint.
	#[error("HTTP request failed: {0}")]
	Transport(#[from] reqwest::Error),

	/// The endpoint answered with a status other than 200.
	#[error("track response not 200: {status}")]
	UnexpectedStatus { status: u16, body: String },

	/// The endpoint answered 200 but not with `1`.
	#[error("event not reported successfully, response body: {body}")]
	UnexpectedBody { body: String },

	/// The message could not be encoded.
	#[error("serialization error: {0}")]
	Serialization(#[from] EncodeError),

	/// The tracking cookie was present but unreadable.
	#[error("invalid tracking cookie {name}: {source}")]
	InvalidCookie {
		name: String,
		#[source]
		source: CookieError,
	},

	/// No project token was configured.
	#[error("missing project token")]
	MissingToken,

	/// The default worker pool could not be started.
	#[error("failed to start worker pool: {0}")]
	WorkerPool(#[from] std::io::Error),

	/// The client was closed before the event was submitted.
	#[error("client has been shut down")]
	ClientShutdown,

	/// The unit of work was dropped before it produced an outcome.
	#[error("track task was dropped before completing")]
	Abandoned,

	/// The outcome of this handle was already handed out.
	#[error("outcome already taken from this handle")]
	OutcomeTaken,
}

/// Result type alias for track operations.
pub type Result<T> = std::result::Result<T, TrackError>;
