// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Track client for the Mixpanel HTTP track API.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mixpanel_track_core::{
	build_message, to_json, url_for_json, Properties, TrackRequest, MIXPANEL_API_ENDPOINT,
};
use reqwest::{Client, StatusCode};
use tracing::{info, warn};

use crate::error::{Result, TrackError};
use crate::handle::TrackHandle;
use crate::logger::{NoOpLogger, SharedLogger, TrackLogger};
use crate::pool::WorkerPool;
use crate::request::{distinct_id_from_cookie, InboundRequest};

/// SDK version for identification.
const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");
/// SDK name for identification.
const SDK_NAME: &str = "mixpanel-track-rust";

/// Environment variable holding the project token.
pub const TOKEN_ENV: &str = "MIXPANEL_TOKEN";
/// Environment variable holding a path to a file containing the project token.
pub const TOKEN_FILE_ENV: &str = "MIXPANEL_TOKEN_FILE";

/// Body the endpoint returns when it accepted the event.
const SUCCESS_BODY: &str = "1";

/// Configuration for the track client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
	/// Endpoint every event is sent to.
	pub endpoint: String,
	/// Timeout for HTTP requests. `None` keeps the transport default.
	pub request_timeout: Option<Duration>,
	/// User-Agent override. `None` uses the shared default.
	pub user_agent: Option<String>,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			endpoint: MIXPANEL_API_ENDPOINT.to_string(),
			request_timeout: None,
			user_agent: None,
		}
	}
}

/// Builder for constructing a MixpanelClient.
pub struct MixpanelClientBuilder {
	token: Option<String>,
	logger: Option<SharedLogger>,
	pool: Option<WorkerPool>,
	config: ClientConfig,
}

impl MixpanelClientBuilder {
	/// Creates a new builder with default settings.
	pub fn new() -> Self {
		Self {
			token: None,
			logger: None,
			pool: None,
			config: ClientConfig::default(),
		}
	}

	/// Creates a builder with the token taken from the environment.
	///
	/// `MIXPANEL_TOKEN` is used when set; otherwise the first line of the file
	/// named by `MIXPANEL_TOKEN_FILE`. A file that cannot be read leaves the
	/// token unset, so `build` reports [`TrackError::MissingToken`].
	pub fn from_env() -> Self {
		let token = std::env::var(TOKEN_ENV)
			.ok()
			.filter(|token| !token.is_empty())
			.or_else(|| {
				let path = PathBuf::from(std::env::var_os(TOKEN_FILE_ENV)?);
				match std::fs::read_to_string(&path) {
					Ok(contents) => contents
						.lines()
						.next()
						.map(|line| line.trim().to_string())
						.filter(|token| !token.is_empty()),
					Err(e) => {
						warn!(path = %path.display(), error = %e, "Failed to read token file");
						None
					}
				}
			});

		Self {
			token,
			..Self::new()
		}
	}

	/// Sets the project token sent with every event.
	pub fn token(mut self, token: impl Into<String>) -> Self {
		self.token = Some(token.into());
		self
	}

	/// Sets the sink receiving per-event log lines.
	///
	/// Defaults to [`NoOpLogger`].
	pub fn logger(mut self, logger: impl TrackLogger) -> Self {
		self.logger = Some(Arc::new(logger));
		self
	}

	/// Sets a logger that is also shared with other components.
	pub fn shared_logger(mut self, logger: SharedLogger) -> Self {
		self.logger = Some(logger);
		self
	}

	/// Sets the pool executing tracking calls.
	///
	/// Defaults to [`WorkerPool::new`], a dedicated runtime without a
	/// concurrency limit.
	pub fn worker_pool(mut self, pool: WorkerPool) -> Self {
		self.pool = Some(pool);
		self
	}

	/// Overrides the endpoint for every event sent by this client.
	///
	/// Example: a forwarding proxy such as `https://proxy.internal/track/`
	pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
		self.config.endpoint = endpoint.into();
		self
	}

	/// Sets the HTTP request timeout.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.config.request_timeout = Some(timeout);
		self
	}

	/// Sets the User-Agent header.
	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.config.user_agent = Some(user_agent.into());
		self
	}

	/// Replaces the whole configuration.
	pub fn config(mut self, config: ClientConfig) -> Self {
		self.config = config;
		self
	}

	/// Builds the MixpanelClient.
	pub fn build(self) -> Result<MixpanelClient> {
		let token = self.token.ok_or(TrackError::MissingToken)?;

		let mut http_builder = match &self.config.user_agent {
			Some(user_agent) => mixpanel_common_http::builder_with_user_agent(user_agent.clone()),
			None => mixpanel_common_http::builder(),
		};
		if let Some(timeout) = self.config.request_timeout {
			http_builder = http_builder.timeout(timeout);
		}
		let http_client = http_builder.build()?;

		let pool = match self.pool {
			Some(pool) => pool,
			None => WorkerPool::new()?,
		};

		info!(
			endpoint = %self.config.endpoint,
			max_concurrency = ?pool.max_concurrency(),
			sdk_name = SDK_NAME,
			sdk_version = SDK_VERSION,
			"Mixpanel client initialized"
		);

		let inner = Arc::new(MixpanelClientInner {
			token,
			logger: self.logger.unwrap_or_else(|| Arc::new(NoOpLogger)),
			http_client,
			pool,
			config: self.config,
		});

		Ok(MixpanelClient { inner })
	}
}

impl Default for MixpanelClientBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Internal client state.
struct MixpanelClientInner {
	token: String,
	logger: SharedLogger,
	http_client: Client,
	pool: WorkerPool,
	config: ClientConfig,
}

impl MixpanelClientInner {
	/// The body of one unit of work: send the event and report the outcome.
	async fn deliver(&self, request: TrackRequest) -> Result<()> {
		let outcome = self.send(&request).await;
		match &outcome {
			Ok(()) => self.logger.debug("Mixpanel event reported successfully"),
			Err(e) => self
				.logger
				.warn(&format!("Mixpanel event not reported: {e}"), Some(e)),
		}
		outcome
	}

	async fn send(&self, request: &TrackRequest) -> Result<()> {
		let message = build_message(request, &self.token)?;
		let json = to_json(&message)?;
		self
			.logger
			.debug(&format!("Mixpanel message to be sent: {json}"));

		let url = url_for_json(&self.config.endpoint, &json);
		self.logger.debug(&format!("Mixpanel URL to call: {url}"));
		let url =
			reqwest::Url::parse(&url).map_err(|e| TrackError::MalformedEndpoint(e.to_string()))?;

		let response = self.http_client.get(url).send().await?;
		let status = response.status();
		let body = response.text().await?;

		interpret_response(status, body)
	}
}

impl Drop for MixpanelClientInner {
	fn drop(&mut self) {
		// best effort only; callers are expected to close explicitly
		self.pool.close();
	}
}

/// Maps the endpoint's answer to an outcome: success is 200 with body `1`.
fn interpret_response(status: StatusCode, body: String) -> Result<()> {
	if status != StatusCode::OK {
		return Err(TrackError::UnexpectedStatus {
			status: status.as_u16(),
			body,
		});
	}
	if body != SUCCESS_BODY {
		return Err(TrackError::UnexpectedBody { body });
	}
	Ok(())
}

/// Asynchronous client for the Mixpanel track API.
///
/// Every tracking call is handed to the client's [`WorkerPool`] and returns a
/// [`TrackHandle`] at once. The handle reports whether the endpoint accepted
/// the event; it may be dropped when the caller does not care.
///
/// The client should be created once per application and released with
/// [`MixpanelClient::close`], optionally followed by
/// [`MixpanelClient::await_termination`]. Dropping the last clone stops the
/// pool as well, but discards work that has not started.
///
/// # Example
///
/// ```ignore
/// use mixpanel_track::{MixpanelClient, Properties, TrackRequest};
///
/// let client = MixpanelClient::new("e3bc4100330c35722740fb8c6f5abddc")?;
///
/// client.track_event("signup", "50479b24671bf");
/// client.track(
///     TrackRequest::new("play", "50479b24671bf")
///         .with_name_tag("Test Name")
///         .with_ip("123.123.123.123")
///         .with_time(chrono::Utc::now())
///         .with_property("action", "play"),
/// );
///
/// client.close();
/// client.await_termination(Duration::from_secs(10));
/// ```
#[derive(Clone)]
pub struct MixpanelClient {
	inner: Arc<MixpanelClientInner>,
}

impl MixpanelClient {
	/// Creates a new builder for constructing a MixpanelClient.
	pub fn builder() -> MixpanelClientBuilder {
		MixpanelClientBuilder::new()
	}

	/// Creates a client with default settings for `token`.
	pub fn new(token: impl Into<String>) -> Result<Self> {
		Self::builder().token(token).build()
	}

	/// Tracks an event.
	///
	/// Missing required fields are not reported here but through the handle.
	pub fn track(&self, request: TrackRequest) -> TrackHandle {
		let (handle, completer) = TrackHandle::pending();
		let inner = Arc::clone(&self.inner);

		let work = async move {
			let outcome = inner.deliver(request).await;
			completer.complete(outcome);
		};

		if let Err(rejected) = self.inner.pool.submit(work) {
			self.inner.logger.warn(
				"Mixpanel client is closed, event not sent",
				Some(&TrackError::ClientShutdown),
			);
			// resolve before dropping the work so its completer cannot win
			handle.resolve(Err(TrackError::ClientShutdown));
			drop(rejected);
		}

		handle
	}

	/// Tracks an event with only the required fields.
	pub fn track_event(
		&self,
		event: impl Into<String>,
		distinct_id: impl Into<String>,
	) -> TrackHandle {
		self.track(TrackRequest::new(event, distinct_id))
	}

	/// Tracks an event with custom properties.
	pub fn track_with_properties(
		&self,
		event: impl Into<String>,
		distinct_id: impl Into<String>,
		properties: Properties,
	) -> TrackHandle {
		self.track(TrackRequest::new(event, distinct_id).with_properties(properties))
	}

	/// Tracks an event on behalf of the browser that sent `request`.
	///
	/// The distinct id is read from the browser SDK cookie `cookie_name`. If
	/// you initialise the browser SDK with `cookie_name: "foobar"`, the cookie
	/// is called `mp_foobar`. Without that cookie the client IP doubles as the
	/// distinct id. The IP is taken from proxy headers, see
	/// [`InboundRequest::client_ip`].
	pub fn track_request(
		&self,
		event: impl Into<String>,
		name_tag: Option<&str>,
		request: &InboundRequest,
		cookie_name: &str,
		properties: Option<Properties>,
	) -> TrackHandle {
		let ip = request.client_ip();

		let distinct_id = match request.cookie(cookie_name) {
			Some(value) => match distinct_id_from_cookie(value) {
				Ok(distinct_id) => Some(distinct_id),
				Err(source) => {
					let err = TrackError::InvalidCookie {
						name: cookie_name.to_string(),
						source,
					};
					self.inner
						.logger
						.warn(&format!("Mixpanel cookie unreadable: {err}"), Some(&err));
					return TrackHandle::ready(Err(err));
				}
			},
			None => {
				self.inner.logger.warn(
					&format!(
						"Unique ID for mixpanel cookie name: {cookie_name} was not found, using IP instead"
					),
					None,
				);
				ip.clone()
			}
		};

		self.track(TrackRequest {
			event: Some(event.into()),
			distinct_id,
			name_tag: name_tag.map(str::to_string),
			ip,
			time: None,
			properties: properties.unwrap_or_default(),
		})
	}

	/// Stops accepting new events. Events already submitted are still sent.
	///
	/// Calling this more than once is harmless.
	pub fn close(&self) {
		if !self.inner.pool.is_closed() {
			self.inner.pool.close();
			info!("Mixpanel client closed");
		}
	}

	/// Returns true if the client has been closed.
	pub fn is_closed(&self) -> bool {
		self.inner.pool.is_closed()
	}

	/// Blocks until every submitted event has been handled or `timeout`
	/// elapses, whichever comes first.
	///
	/// Returns true if all work finished in time. Never fails and does not
	/// close the client. Do not call from async code on the client's own
	/// runtime.
	pub fn await_termination(&self, timeout: Duration) -> bool {
		let terminated = self.inner.pool.await_termination(timeout);
		if !terminated {
			let outstanding = self.inner.pool.outstanding();
			warn!(
				outstanding,
				timeout = ?timeout,
				"Mixpanel client did not terminate in time"
			);
			self.inner.logger.warn(
				&format!("Didn't terminate after {timeout:?}, {outstanding} events outstanding"),
				None,
			);
		}
		terminated
	}

	/// Number of submitted events not yet handled.
	pub fn outstanding(&self) -> usize {
		self.inner.pool.outstanding()
	}

	/// Returns the endpoint this client sends to.
	pub fn endpoint(&self) -> &str {
		&self.inner.config.endpoint
	}
}

impl std::fmt::Debug for MixpanelClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MixpanelClient")
			.field("endpoint", &self.inner.config.endpoint)
			.field("pool", &self.inner.pool)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::logger::TrackLogger;
	use mixpanel_track_core::ValidationError;
	use std::sync::Mutex;

	#[derive(Default)]
	struct RecordingLogger {
		debug: Mutex<Vec<String>>,
		warn: Mutex<Vec<String>>,
	}

	impl TrackLogger for RecordingLogger {
		fn debug(&self, message: &str) {
			self.debug.lock().unwrap().push(message.to_string());
		}

		fn warn(&self, message: &str, _error: Option<&TrackError>) {
			self.warn.lock().unwrap().push(message.to_string());
		}
	}

	#[test]
	fn test_builder_requires_token() {
		let result = MixpanelClientBuilder::new().build();
		assert!(matches!(result, Err(TrackError::MissingToken)));
	}

	#[test]
	fn test_builder_success() {
		let client = MixpanelClient::new("abc").unwrap();
		assert_eq!(client.endpoint(), MIXPANEL_API_ENDPOINT);
		assert!(!client.is_closed());
	}

	#[test]
	fn test_client_config_defaults() {
		let config = ClientConfig::default();
		assert_eq!(config.endpoint, "http://api.mixpanel.com/track/");
		assert!(config.request_timeout.is_none());
		assert!(config.user_agent.is_none());
	}

	#[test]
	fn test_from_env_reads_token_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("token");
		std::fs::write(&path, "abc123\n").unwrap();

		// both variables are only touched by this test
		std::env::remove_var(TOKEN_ENV);
		std::env::set_var(TOKEN_FILE_ENV, &path);
		let builder = MixpanelClientBuilder::from_env();
		std::env::remove_var(TOKEN_FILE_ENV);

		assert_eq!(builder.token.as_deref(), Some("abc123"));
	}

	#[test]
	fn test_interpret_success() {
		assert!(interpret_response(StatusCode::OK, "1".to_string()).is_ok());
	}

	#[test]
	fn test_interpret_unexpected_body() {
		let result = interpret_response(StatusCode::OK, "0".to_string());
		assert!(matches!(result, Err(TrackError::UnexpectedBody { body }) if body == "0"));
	}

	#[test]
	fn test_interpret_unexpected_body_is_exact() {
		let result = interpret_response(StatusCode::OK, "1\n".to_string());
		assert!(matches!(result, Err(TrackError::UnexpectedBody { .. })));
	}

	#[test]
	fn test_interpret_unexpected_status() {
		let result = interpret_response(StatusCode::BAD_GATEWAY, "1".to_string());
		assert!(matches!(
			result,
			Err(TrackError::UnexpectedStatus { status: 502, .. })
		));
	}

	#[test]
	fn test_missing_event_fails_through_handle() {
		let logger = Arc::new(RecordingLogger::default());
		let client = MixpanelClient::builder()
			.token("abc")
			.shared_logger(logger.clone())
			.build()
			.unwrap();

		let request = TrackRequest {
			distinct_id: Some("50479b24671bf".to_string()),
			..TrackRequest::default()
		};
		let result = client.track(request).wait();

		assert!(matches!(
			result,
			Err(TrackError::MissingRequiredField(ValidationError::MissingEvent))
		));
		assert_eq!(logger.warn.lock().unwrap().len(), 1);
		assert!(logger.debug.lock().unwrap().is_empty());
	}

	#[test]
	fn test_missing_distinct_id_fails_through_handle() {
		let client = MixpanelClient::new("abc").unwrap();
		let request = TrackRequest {
			event: Some("test1".to_string()),
			..TrackRequest::default()
		};

		assert!(matches!(
			client.track(request).wait(),
			Err(TrackError::MissingRequiredField(
				ValidationError::MissingDistinctId
			))
		));
	}

	#[test]
	fn test_malformed_endpoint_fails_through_handle() {
		let client = MixpanelClient::builder()
			.token("abc")
			.endpoint("not a url")
			.build()
			.unwrap();

		assert!(matches!(
			client.track_event("e", "u").wait(),
			Err(TrackError::MalformedEndpoint(_))
		));
	}

	#[test]
	fn test_track_after_close_fails_immediately() {
		let logger = Arc::new(RecordingLogger::default());
		let client = MixpanelClient::builder()
			.token("abc")
			.shared_logger(logger.clone())
			.build()
			.unwrap();

		client.close();
		let mut handle = client.track_event("test7", "50479b24671bf");

		assert!(handle.is_finished());
		assert!(matches!(
			handle.try_outcome(),
			Some(Err(TrackError::ClientShutdown))
		));
		assert_eq!(client.outstanding(), 0);
		assert_eq!(logger.warn.lock().unwrap().len(), 1);
	}

	#[test]
	fn test_double_close_is_ok() {
		let client = MixpanelClient::new("abc").unwrap();
		client.close();
		client.close();
		assert!(client.is_closed());
	}

	#[test]
	fn test_clones_share_lifecycle() {
		let client = MixpanelClient::new("abc").unwrap();
		let other = client.clone();
		client.close();
		assert!(other.is_closed());
	}

	#[test]
	fn test_invalid_cookie_fails_through_handle() {
		let mut headers = http::HeaderMap::new();
		headers.insert("cookie", http::HeaderValue::from_static("mp_test=garbage"));
		let request = InboundRequest::new(headers);

		let client = MixpanelClient::new("abc").unwrap();
		let result = client
			.track_request("visit", None, &request, "mp_test", None)
			.wait();

		assert!(matches!(result, Err(TrackError::InvalidCookie { name, .. }) if name == "mp_test"));
	}

	#[test]
	fn test_request_without_cookie_or_ip_fails_validation() {
		let client = MixpanelClient::new("abc").unwrap();
		let result = client
			.track_request("visit", None, &InboundRequest::default(), "mp_test", None)
			.wait();

		assert!(matches!(
			result,
			Err(TrackError::MissingRequiredField(
				ValidationError::MissingDistinctId
			))
		));
	}
}
