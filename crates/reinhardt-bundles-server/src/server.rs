//! Request entry point
//!
//! A request path (relative to the mount path) starts with the provider name:
//! `/bnd/app1/css/site.css` is file `css/site.css` of provider `app1`, found at
//! `<content_dir>/static/app1/css/site.css`.

use crate::config::ServerConfig;
use crate::error::{ServeError, ServeResult};
use crate::fault::FaultChannel;
use crate::responder::{ConditionalResponder, ErrorKind, ExchangeState};
use crate::sink::{HttpResponseSink, ResponseSink};
use crate::validators::RequestValidators;
use bytes::Bytes;
use http::{HeaderMap, Method, Request, Response, StatusCode};
use percent_encoding::percent_decode_str;
use reinhardt_bundles_cache::{CacheStore, ProviderHandle, ProviderListener, ProviderRegistry};
use std::sync::Arc;

const INTERNAL_ERROR_BODY: &str = "Internal server error\n";

/// Serves static content of registered providers
///
/// # Example
///
/// ```rust,no_run
/// use reinhardt_bundles_cache::{DirectoryProvider, ProviderListener};
/// use reinhardt_bundles_server::{BundleFileServer, ServerConfig};
/// use std::sync::Arc;
/// use std::time::SystemTime;
///
/// let server = BundleFileServer::new(ServerConfig::default());
/// server.on_provider_appeared(Arc::new(DirectoryProvider::new(
///     "app1",
///     "/srv/app1",
///     SystemTime::now(),
/// )));
///
/// let request = http::Request::get("/bnd/app1/index.html").body(()).unwrap();
/// let response = server.serve(&request).unwrap();
/// println!("{}", response.status());
/// ```
pub struct BundleFileServer {
	config: ServerConfig,
	registry: ProviderRegistry,
	store: CacheStore,
	responder: ConditionalResponder,
}

impl BundleFileServer {
	/// Creates a server without providers.
	pub fn new(config: ServerConfig) -> Self {
		let registry = ProviderRegistry::new(config.cache.root_policy());
		let store = CacheStore::from_config(&config.cache);
		let responder =
			ConditionalResponder::new(config.chunk_size).with_redirect_base(config.mount_path.clone());

		Self {
			config,
			registry,
			store,
			responder,
		}
	}

	/// Replaces the channel streaming failures are reported to.
	pub fn with_fault_channel(mut self, faults: Arc<dyn FaultChannel>) -> Self {
		self.responder = self.responder.with_fault_channel(faults);
		self
	}

	/// The configuration.
	pub fn config(&self) -> &ServerConfig {
		&self.config
	}

	/// The provider registry.
	pub fn registry(&self) -> &ProviderRegistry {
		&self.registry
	}

	/// The cache store.
	pub fn store(&self) -> &CacheStore {
		&self.store
	}

	/// Answers one request
	///
	/// `path` is relative to the mount path, `None` when the request carried
	/// none. Internal failures are logged and answered with a 500 page, or
	/// returned when [`ServerConfig::exceptions`] is set.
	///
	/// # Errors
	///
	/// - [`ServeError::Streaming`] when the body failed after the 200 was sent
	/// - any internal failure when `exceptions` is enabled
	pub fn handle(
		&self,
		path: Option<&str>,
		method: &Method,
		headers: &HeaderMap,
		sink: &mut dyn ResponseSink,
	) -> ServeResult<ExchangeState> {
		let with_body = if *method == Method::GET {
			true
		} else if *method == Method::HEAD {
			false
		} else {
			sink.send_error(StatusCode::METHOD_NOT_ALLOWED, None)
				.map_err(ServeError::Sink)?;
			return Ok(ExchangeState::Error(ErrorKind::MethodNotAllowed));
		};

		let Some(path) = path else {
			sink.send_error(StatusCode::NOT_FOUND, None)
				.map_err(ServeError::Sink)?;
			return Ok(ExchangeState::Error(ErrorKind::PathNotFound));
		};

		let path = path.strip_prefix('/').unwrap_or(path);
		let name = path.split_once('/').map_or(path, |(name, _)| name);

		let Some(provider) = self.registry.lookup(name) else {
			tracing::debug!(provider = %name, "no such provider");
			sink.send_error(StatusCode::NOT_FOUND, None)
				.map_err(ServeError::Sink)?;
			return Ok(ExchangeState::Error(ErrorKind::ProviderNotFound));
		};

		let validators = RequestValidators::from_headers(headers);
		let resolved = self.store.resolve_from_provider(&provider, path);
		self.evict_if_departed(name, &provider);

		let result = match resolved {
			Ok(resolution) if with_body => self.responder.respond(&validators, &resolution, sink),
			Ok(resolution) => self.responder.respond_head(&validators, &resolution, sink),
			Err(err) => Err(err.into()),
		};

		match result {
			Ok(state) => Ok(state),
			Err(err) if err.is_streaming() => Err(err),
			Err(err) => self.internal_error(err, sink),
		}
	}

	/// Answers an [`http::Request`]
	///
	/// The mount path is stripped and the remainder percent-decoded; requests
	/// outside the mount path get a 404.
	///
	/// # Errors
	///
	/// Same as [`handle`](Self::handle).
	pub fn serve<B>(&self, request: &Request<B>) -> ServeResult<Response<Bytes>> {
		let path = self.relative_path(request.uri().path());
		let mut sink = HttpResponseSink::new();
		self.handle(path.as_deref(), request.method(), request.headers(), &mut sink)?;
		Ok(sink.into_response())
	}

	fn relative_path(&self, uri_path: &str) -> Option<String> {
		let mount = self.config.mount_path.trim_end_matches('/');
		let rest = uri_path.strip_prefix(mount)?;
		if !rest.is_empty() && !rest.starts_with('/') {
			return None;
		}
		let decoded = percent_decode_str(rest).decode_utf8().ok()?;
		(!decoded.is_empty()).then(|| decoded.into_owned())
	}

	/// Drops entries a resolution may have cached for `provider` after it was
	/// unregistered or replaced while the request was in flight.
	fn evict_if_departed(&self, name: &str, provider: &ProviderHandle) {
		let current = self.registry.lookup(name);
		let still_registered = current
			.as_ref()
			.is_some_and(|current| std::ptr::addr_eq(Arc::as_ptr(current), Arc::as_ptr(provider)));
		if !still_registered {
			tracing::debug!(provider = %name, "provider departed during request");
			self.store.evict_provider(name);
		}
	}

	fn internal_error(
		&self,
		err: ServeError,
		sink: &mut dyn ResponseSink,
	) -> ServeResult<ExchangeState> {
		tracing::error!(error = %err, "Internal webserver error");
		if self.config.exceptions {
			return Err(err);
		}

		let page = sink.send_error(StatusCode::INTERNAL_SERVER_ERROR, Some(INTERNAL_ERROR_BODY));
		if let Err(second) = page {
			tracing::error!(error = %second, "Second level internal webserver error");
		}
		Ok(ExchangeState::Error(ErrorKind::Internal))
	}
}

impl ProviderListener for BundleFileServer {
	fn on_provider_appeared(&self, provider: ProviderHandle) {
		let name = provider.name().to_string();
		self.registry.register(name.clone(), provider);
		// After the swap, so requests still holding the old provider either
		// see the replacement or are evicted here.
		self.store.evict_provider(&name);
	}

	fn on_provider_disappeared(&self, name: &str) {
		self.registry.unregister(name);
		self.store.evict_provider(name);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("/bnd/app1/index.html", Some("/app1/index.html"))]
	#[case("/bnd/app1/my%20file.txt", Some("/app1/my file.txt"))]
	#[case("/bnd/", Some("/"))]
	#[case("/bnd", None)]
	#[case("/bndx/app1", None)]
	#[case("/other/app1", None)]
	#[case("/bnd/%FF", None)]
	fn test_relative_path(#[case] uri_path: &str, #[case] expected: Option<&str>) {
		let server = BundleFileServer::new(ServerConfig::default());

		assert_eq!(server.relative_path(uri_path).as_deref(), expected);
	}

	#[rstest]
	fn test_unsupported_method() {
		let server = BundleFileServer::new(ServerConfig::default());
		let mut sink = HttpResponseSink::new();

		let state = server
			.handle(Some("/app1/index.html"), &Method::POST, &HeaderMap::new(), &mut sink)
			.unwrap();

		assert_eq!(state, ExchangeState::Error(ErrorKind::MethodNotAllowed));
		assert_eq!(sink.status(), Some(StatusCode::METHOD_NOT_ALLOWED));
	}

	#[rstest]
	fn test_missing_path() {
		let server = BundleFileServer::new(ServerConfig::default());
		let mut sink = HttpResponseSink::new();

		let state = server
			.handle(None, &Method::GET, &HeaderMap::new(), &mut sink)
			.unwrap();

		assert_eq!(state, ExchangeState::Error(ErrorKind::PathNotFound));
		assert_eq!(sink.status(), Some(StatusCode::NOT_FOUND));
	}
}
