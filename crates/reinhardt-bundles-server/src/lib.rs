//! # Reinhardt Bundles Server
//!
//! Conditional HTTP serving of static files contributed by dynamically
//! registered content providers.
//!
//! [`BundleFileServer`] is the request entry point. It looks the provider up
//! by the first path segment, resolves the rest through the
//! [`CacheStore`](reinhardt_bundles_cache::CacheStore) and lets the
//! [`ConditionalResponder`] pick between a body, a `304 Not Modified`, a
//! redirect and an error page.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reinhardt_bundles_cache::{DirectoryProvider, ProviderListener};
//! use reinhardt_bundles_server::{BundleFileServer, ServerConfig, init_tracing};
//! use std::sync::Arc;
//! use std::time::SystemTime;
//!
//! # fn main() -> reinhardt_bundles_server::ServeResult<()> {
//! init_tracing("info");
//!
//! let config = ServerConfig::default().with_env_overrides("BUNDLES_")?;
//! let server = BundleFileServer::new(config);
//! server.on_provider_appeared(Arc::new(DirectoryProvider::new(
//!     "app1",
//!     "/srv/app1",
//!     SystemTime::now(),
//! )));
//!
//! let request = http::Request::get("/bnd/app1/").body(()).unwrap();
//! let response = server.serve(&request)?;
//! assert!(response.status().is_success());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Structure
//!
//! - [`server`] - Request entry point and provider lifecycle handling
//! - [`responder`] - Conditional GET decision and body streaming
//! - [`validators`] - `If-None-Match` / `If-Modified-Since` parsing
//! - [`sink`] - Response output abstraction
//! - [`fault`] - Reporting of post-commit failures
//! - [`config`] - Server configuration
//! - [`logging`] - Tracing subscriber setup
//! - [`error`] - Error types

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod error;
pub mod fault;
pub mod logging;
pub mod responder;
pub mod server;
pub mod sink;
pub mod validators;

// Re-export main types
pub use config::{DEFAULT_CHUNK_SIZE, DEFAULT_MOUNT_PATH, ServerConfig};
pub use error::{ServeError, ServeResult};
pub use fault::{FaultChannel, TracingFaultChannel};
pub use logging::init_tracing;
pub use responder::{ConditionalResponder, ErrorKind, ExchangeState};
pub use server::BundleFileServer;
pub use sink::{HttpResponseSink, ResponseSink};
pub use validators::RequestValidators;
