//! # Reinhardt Bundles
//!
//! Static file serving for content providers that are deployed, updated and
//! removed while the process runs.
//!
//! Each provider contributes a directory of static content under its own name.
//! Requests such as `/bnd/app1/index.html` are answered from provider `app1`
//! with strong ETags, `Last-Modified`, conditional GET (`304 Not Modified`),
//! redirects for directory paths and negative caching of missing files.
//!
//! ## Feature Flags
//!
//! - `cache` - Provider registry, cache entries and the cache store
//! - `server` (default) - Request entry point and conditional responses
//! - `full` - All features enabled
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reinhardt_bundles::prelude::*;
//! use std::sync::Arc;
//! use std::time::SystemTime;
//!
//! let server = BundleFileServer::new(ServerConfig::default());
//! server.on_provider_appeared(Arc::new(DirectoryProvider::new(
//!     "app1",
//!     "/srv/app1",
//!     SystemTime::now(),
//! )));
//!
//! let request = http::Request::get("/bnd/app1/index.html").body(()).unwrap();
//! let response = server.serve(&request).unwrap();
//! println!("{} {:?}", response.status(), response.headers().get("etag"));
//! ```
//!
//! ## Crates
//!
//! - [`cache`] - `reinhardt-bundles-cache`
//! - [`server`] - `reinhardt-bundles-server`

/// Provider registry, cache entries and resolution.
pub use reinhardt_bundles_cache as cache;

/// Request handling and conditional responses.
#[cfg(feature = "server")]
pub use reinhardt_bundles_server as server;

pub use reinhardt_bundles_cache::{BundleError, BundleResult};

#[cfg(feature = "server")]
pub use reinhardt_bundles_server::{ServeError, ServeResult};

/// Commonly used types
pub mod prelude {
	pub use crate::cache::{
		BundleError, BundleResult, CacheConfig, CacheEntry, CacheStore, DirectoryProvider,
		Provider, ProviderHandle, ProviderListener, ProviderRegistry, Resolution,
	};

	#[cfg(feature = "server")]
	pub use crate::server::{
		BundleFileServer, ConditionalResponder, ExchangeState, HttpResponseSink,
		RequestValidators, ResponseSink, ServeError, ServeResult, ServerConfig,
	};
}
