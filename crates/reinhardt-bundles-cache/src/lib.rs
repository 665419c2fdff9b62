//! # Reinhardt Bundles Cache
//!
//! Provider registry and cache-entry layer for serving static files that are
//! contributed by independently deployed content providers.
//!
//! A provider (for example a deployed module) exposes a directory of static
//! content. Providers appear and disappear at runtime; the
//! [`ProviderRegistry`] tracks the ones whose content root qualifies for the
//! current mode and answers name lookups concurrently with those changes.
//!
//! For a `(provider, path)` pair the [`CacheStore`] resolves one of:
//!
//! - an [`Entry`](Resolution::Entry) carrying an immutable [`CacheEntry`]
//!   (ETag, content hash, MIME type, effective timestamp, expiration),
//! - a [`Redirect`](Resolution::Redirect) when the path names a directory
//!   without a trailing separator,
//! - a [`NotFound`](Resolution::NotFound) placeholder that is cached for its
//!   own expiration window.
//!
//! The effective timestamp of an entry is the later of the file's
//! modification time and the provider's update time. When the provider is
//! newer, its update time is written back onto the file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reinhardt_bundles_cache::{
//!     CacheConfig, CacheStore, DirectoryProvider, ProviderRegistry, Resolution,
//! };
//! use std::sync::Arc;
//! use std::time::SystemTime;
//!
//! # fn main() -> reinhardt_bundles_cache::BundleResult<()> {
//! let config = CacheConfig::default();
//! let registry = ProviderRegistry::new(config.root_policy());
//! let store = CacheStore::from_config(&config);
//!
//! let provider = Arc::new(DirectoryProvider::new("app1", "/srv/app1", SystemTime::now()));
//! registry.register("app1", provider);
//!
//! if let Some(provider) = registry.lookup("app1") {
//!     match store.resolve_from_provider(&provider, "app1/index.html")? {
//!         Resolution::Entry(entry) => println!("etag {:?}", entry.etag()),
//!         Resolution::Redirect(signal) => println!("redirect to {}", signal.path()),
//!         Resolution::NotFound(_) => println!("not found"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Structure
//!
//! - [`mime`] - Extension to MIME type table
//! - [`entry`] - Cache entries, content digests and the entry factory
//! - [`provider`] - Provider abstraction and content root policy
//! - [`registry`] - Concurrent name to provider table
//! - [`store`] - Resolution, negative caching and generated assets
//! - [`config`] - Cache configuration
//! - [`error`] - Error types

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod entry;
pub mod error;
pub mod mime;
pub mod provider;
pub mod registry;
pub mod store;

// Re-export main types
pub use config::{CacheConfig, DEFAULT_NOT_FOUND_EXPIRATION};
pub use entry::{CacheEntry, CacheEntryFactory, ContentDigest, ResolvedFile};
pub use error::{BundleError, BundleResult};
pub use mime::MimeTable;
pub use provider::{
	DirectoryProvider, Provider, ProviderHandle, ProviderListener, StaticRootPolicy,
};
pub use registry::ProviderRegistry;
pub use store::{
	CacheStore, FileCompleter, GeneratedAsset, PendingFile, RedirectSignal, Resolution,
};
