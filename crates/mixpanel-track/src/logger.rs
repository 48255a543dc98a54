// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Pluggable sink for per-event reporting.
//!
//! Every tracking attempt reports the outgoing message and URL at debug level
//! and every failure at warn level to a [`TrackLogger`]. When no logger is
//! configured the client uses [`NoOpLogger`], which discards everything.
//!
//! # Example
//!
//! ```ignore
//! use mixpanel_track::{MixpanelClient, TracingLogger};
//!
//! let client = MixpanelClient::builder()
//!     .token("e3bc4100330c35722740fb8c6f5abddc")
//!     .logger(TracingLogger)
//!     .build()?;
//! ```

use std::sync::Arc;

use crate::error::TrackError;

/// Receives the client's per-event log lines.
///
/// Implementations are shared by all in-flight events and are called from
/// worker threads, so they must be cheap and must not panic.
pub trait TrackLogger: Send + Sync + 'static {
	/// Detail about an attempt: the message, the URL, a success.
	fn debug(&self, message: &str);

	/// A failed attempt, with the error when there is one.
	fn warn(&self, message: &str, error: Option<&TrackError>);
}

/// Type alias for a shared logger.
pub type SharedLogger = Arc<dyn TrackLogger>;

/// A logger that discards all lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl TrackLogger for NoOpLogger {
	fn debug(&self, _message: &str) {}

	fn warn(&self, _message: &str, _error: Option<&TrackError>) {}
}

/// A logger that forwards to `tracing` under the `mixpanel_track` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl TrackLogger for TracingLogger {
	fn debug(&self, message: &str) {
		tracing::debug!(target: "mixpanel_track", "{message}");
	}

	fn warn(&self, message: &str, error: Option<&TrackError>) {
		match error {
			Some(error) => tracing::warn!(target: "mixpanel_track", error = %error, "{message}"),
			None => tracing::warn!(target: "mixpanel_track", "{message}"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Mutex;

	#[derive(Default)]
	struct RecordingLogger {
		lines: Mutex<Vec<(&'static str, String)>>,
	}

	impl TrackLogger for RecordingLogger {
		fn debug(&self, message: &str) {
			self.lines.lock().unwrap().push(("debug", message.to_string()));
		}

		fn warn(&self, message: &str, _error: Option<&TrackError>) {
			self.lines.lock().unwrap().push(("warn", message.to_string()));
		}
	}

	#[test]
	fn noop_logger_does_nothing() {
		let logger = NoOpLogger;
		logger.debug("message");
		logger.warn("failure", Some(&TrackError::ClientShutdown));
		logger.warn("failure", None);
	}

	#[test]
	fn tracing_logger_without_subscriber_is_silent() {
		let logger = TracingLogger;
		logger.debug("message");
		logger.warn("failure", Some(&TrackError::Abandoned));
	}

	#[test]
	fn shared_logger_dispatches_to_implementation() {
		let recorder = Arc::new(RecordingLogger::default());
		let shared: SharedLogger = recorder.clone();

		shared.debug("sent");
		shared.warn("failed", None);

		let lines = recorder.lines.lock().unwrap();
		assert_eq!(
			*lines,
			vec![("debug", "sent".to_string()), ("warn", "failed".to_string())]
		);
	}
}
