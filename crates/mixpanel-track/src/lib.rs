// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Asynchronous Mixpanel track client for server-side Rust.
//!
//! Events are sent one request each to the Mixpanel track endpoint, on a
//! worker pool, so tracking never blocks the caller on network I/O.
//!
//! # Features
//!
//! - **Fire and forget**: every call returns a [`TrackHandle`] immediately
//! - **Observable outcome**: await the handle, or wait on it with a timeout
//! - **Explicit lifecycle**: [`MixpanelClient::close`] and
//!   [`MixpanelClient::await_termination`]
//! - **Pluggable logging**: a [`TrackLogger`] sink, silent by default
//! - **Web helpers**: distinct id from the browser SDK cookie and client IP
//!   from proxy headers via [`InboundRequest`]
//!
//! # Example
//!
//! ```ignore
//! use mixpanel_track::{MixpanelClient, Properties, TracingLogger};
//! use std::time::Duration;
//!
//! let client = MixpanelClient::builder()
//!     .token("e3bc4100330c35722740fb8c6f5abddc")
//!     .logger(TracingLogger)
//!     .build()?;
//!
//! let handle = client.track_with_properties(
//!     "test1",
//!     "50479b24671bf",
//!     Properties::new().insert("action", "play"),
//! );
//!
//! // optional: observe the outcome
//! handle.wait()?;
//!
//! client.close();
//! client.await_termination(Duration::from_secs(10));
//! ```

mod client;
mod error;
mod handle;
mod logger;
mod pool;
mod request;

pub use client::{ClientConfig, MixpanelClient, MixpanelClientBuilder, TOKEN_ENV, TOKEN_FILE_ENV};
pub use error::{Result, TrackError};
pub use handle::TrackHandle;
pub use logger::{NoOpLogger, SharedLogger, TrackLogger, TracingLogger};
pub use pool::WorkerPool;
pub use request::{distinct_id_from_cookie, CookieError, InboundRequest, CLIENT_IP_HEADERS};

// Re-export core types for convenience
pub use mixpanel_track_core::{
	build_message, encode_url, keys, OutboundMessage, Properties, TrackRequest, ValidationError,
	MIXPANEL_API_ENDPOINT,
};
