// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Extraction of tracking metadata from inbound web requests.
//!
//! Server-side tracking usually happens while handling a browser request. The
//! browser SDK stores the user's distinct id in a cookie (`mp_<name>`) as
//! URL-encoded JSON, and the client IP can be recovered from proxy headers.

use std::net::{IpAddr, SocketAddr};

use http::header::COOKIE;
use http::HeaderMap;
use thiserror::Error;

/// Headers consulted for the client IP, in priority order.
pub const CLIENT_IP_HEADERS: [&str; 5] = [
	"x-forwarded-for",
	"proxy-client-ip",
	"wl-proxy-client-ip",
	"http_client_ip",
	"http_x_forwarded_for",
];

/// Placeholder some proxies send when they do not know the address.
const UNKNOWN: &str = "unknown";

/// The tracking cookie could not be read.
#[derive(Debug, Error)]
pub enum CookieError {
	#[error("cookie value is not valid percent-encoded UTF-8: {0}")]
	Decode(#[from] std::string::FromUtf8Error),

	#[error("cookie value is not JSON: {0}")]
	Json(#[from] serde_json::Error),

	#[error("cookie JSON has no distinct_id")]
	MissingDistinctId,
}

/// The parts of an inbound web request used for tracking.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
	headers: HeaderMap,
	remote_addr: Option<IpAddr>,
}

impl InboundRequest {
	pub fn new(headers: HeaderMap) -> Self {
		Self {
			headers,
			remote_addr: None,
		}
	}

	/// Sets the address of the peer connected to the server.
	pub fn with_remote_addr(mut self, addr: IpAddr) -> Self {
		self.remote_addr = Some(addr);
		self
	}

	/// Captures headers from an `http::Request`.
	///
	/// The remote address is taken from a `SocketAddr` request extension when
	/// the server framework stores one there.
	pub fn from_request<B>(request: &http::Request<B>) -> Self {
		Self {
			headers: request.headers().clone(),
			remote_addr: request
				.extensions()
				.get::<SocketAddr>()
				.map(SocketAddr::ip),
		}
	}

	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	pub fn remote_addr(&self) -> Option<IpAddr> {
		self.remote_addr
	}

	/// Returns the client IP as reported by proxies, else the peer address.
	///
	/// The first header in [`CLIENT_IP_HEADERS`] that is non-empty and not
	/// `unknown` wins. Values are trimmed first, so a blank value counts as
	/// empty. Comma separated lists are returned whole.
	pub fn client_ip(&self) -> Option<String> {
		CLIENT_IP_HEADERS
			.iter()
			.filter_map(|name| self.headers.get(*name))
			.filter_map(|value| value.to_str().ok())
			.map(str::trim)
			.find(|value| !value.is_empty() && !value.eq_ignore_ascii_case(UNKNOWN))
			.map(str::to_string)
			.or_else(|| self.remote_addr.map(|addr| addr.to_string()))
	}

	/// Returns the raw value of the cookie named `name`.
	pub fn cookie(&self, name: &str) -> Option<&str> {
		self.headers
			.get_all(COOKIE)
			.iter()
			.filter_map(|value| value.to_str().ok())
			.flat_map(|header| header.split(';'))
			.filter_map(|pair| pair.trim().split_once('='))
			.find(|(key, _)| key.trim() == name)
			.map(|(_, value)| value.trim())
	}
}

/// Reads the distinct id out of a browser SDK cookie value.
///
/// The value is percent-decoded and parsed as JSON; its `distinct_id` field
/// may be a string or a number. Only `%XX` escapes are decoded: a literal `+`
/// stays a `+` rather than becoming a space, matching how the browser SDK
/// writes the cookie with `encodeURIComponent`.
pub fn distinct_id_from_cookie(value: &str) -> Result<String, CookieError> {
	let decoded = urlencoding::decode(value)?;
	let json: serde_json::Value = serde_json::from_str(&decoded)?;

	match json.get("distinct_id") {
		Some(serde_json::Value::String(id)) => Ok(id.clone()),
		Some(serde_json::Value::Number(id)) => Ok(id.to_string()),
		_ => Err(CookieError::MissingDistinctId),
	}
}
