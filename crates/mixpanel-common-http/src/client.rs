// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP client with consistent User-Agent header.

use reqwest::{Client, ClientBuilder};

/// Name sent as the product part of the User-Agent.
const PRODUCT: &str = "mixpanel-track-rust";

/// Creates a new HTTP client builder with the standard User-Agent header.
///
/// Use this when you need to customize the client (e.g., set timeout).
///
/// # Example
/// ```ignore
/// let client = mixpanel_common_http::builder()
///     .timeout(Duration::from_secs(30))
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Creates a new HTTP client builder with a custom User-Agent header.
pub fn builder_with_user_agent(user_agent: impl Into<String>) -> ClientBuilder {
	Client::builder().user_agent(user_agent.into())
}

/// Returns the standard User-Agent string.
///
/// Format: `mixpanel-track-rust/{version} ({os}-{arch})`
pub fn user_agent() -> String {
	format!(
		"{}/{} ({}-{})",
		PRODUCT,
		env!("CARGO_PKG_VERSION"),
		std::env::consts::OS,
		std::env::consts::ARCH
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_agent_has_correct_format() {
		let ua = user_agent();
		assert!(ua.starts_with("mixpanel-track-rust/"));
		assert!(ua.ends_with(')'));
		let platform = ua.split_once('(').unwrap().1.trim_end_matches(')');
		assert_eq!(platform.split('-').count(), 2);
	}

	#[test]
	fn builder_accepts_timeout() {
		let client = builder().timeout(std::time::Duration::from_secs(5)).build();
		assert!(client.is_ok());
	}

	#[test]
	fn builder_with_custom_user_agent() {
		let custom_ua = "my-custom-agent/1.0";
		let client = builder_with_user_agent(custom_ua).build();
		assert!(client.is_ok());
	}
}
