//! Resolution of provider paths to cache entries
//!
//! The store memoizes resolutions per `(provider name, path)`:
//!
//! - "not found" placeholders are reused until their expiration elapses,
//!   avoiding repeated filesystem probes;
//! - resolved entries are reused while the file's effective timestamp
//!   (later of file modification time and provider update time) and the
//!   provider instance are unchanged, and rebuilt otherwise;
//! - redirects are cheap to recompute and never stored.
//!
//! Expired placeholders are swept every [`NEGATIVE_SWEEP_INTERVAL`]
//! placeholder inserts, so requests for ever new missing paths cannot grow
//! the store past the placeholders of one expiration window.
//!
//! Builds of one file are serialized through striped locks so the digest and
//! the timestamp write-back happen once when requests race.

pub mod pending;

pub use pending::{FileCompleter, GeneratedAsset, PendingFile};

use crate::config::CacheConfig;
use crate::entry::{CacheEntry, CacheEntryFactory};
use crate::error::{BundleError, BundleResult};
use crate::provider::{ProviderHandle, StaticRootPolicy};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const BUILD_LOCK_STRIPES: usize = 32;

/// Expired placeholders are swept after this many placeholder inserts.
pub const NEGATIVE_SWEEP_INTERVAL: usize = 256;

/// Outcome of resolving a path against a provider
#[derive(Debug, Clone)]
pub enum Resolution {
	/// The path names a regular file.
	Entry(Arc<CacheEntry>),
	/// The path names a directory and must be requested with a trailing separator.
	Redirect(RedirectSignal),
	/// Nothing to serve; carries the cacheable placeholder.
	NotFound(Arc<CacheEntry>),
}

impl Resolution {
	/// The resolved entry, if any.
	pub fn entry(&self) -> Option<&Arc<CacheEntry>> {
		match self {
			Self::Entry(entry) => Some(entry),
			_ => None,
		}
	}

	/// Whether this is a "not found" outcome.
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound(_))
	}
}

/// Request to redirect the client to a normalized path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectSignal {
	path: String,
}

impl RedirectSignal {
	/// Creates a signal for `path`.
	pub fn new(path: impl Into<String>) -> Self {
		Self { path: path.into() }
	}

	/// Normalized path, relative to the serving endpoint.
	pub fn path(&self) -> &str {
		&self.path
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
	provider: String,
	path: String,
}

/// Resolves provider paths and files to [`CacheEntry`] values
pub struct CacheStore {
	factory: CacheEntryFactory,
	policy: StaticRootPolicy,
	index_file: String,
	entries: RwLock<HashMap<CacheKey, Arc<CacheEntry>>>,
	negative_inserts: AtomicUsize,
	build_locks: Box<[Mutex<()>]>,
}

impl CacheStore {
	/// Creates a store
	///
	/// # Arguments
	///
	/// * `factory` - Builds entries for resolved files
	/// * `policy` - Locates the static base inside provider content
	pub fn new(factory: CacheEntryFactory, policy: StaticRootPolicy) -> Self {
		Self {
			factory,
			policy,
			index_file: "index.html".to_string(),
			entries: RwLock::new(HashMap::new()),
			negative_inserts: AtomicUsize::new(0),
			build_locks: (0..BUILD_LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
		}
	}

	/// Creates a store from configuration.
	pub fn from_config(config: &CacheConfig) -> Self {
		Self::new(CacheEntryFactory::from_config(config), config.root_policy())
			.with_index_file(config.index_file.clone())
	}

	/// Sets the file served for directory paths ending with a separator.
	pub fn with_index_file(mut self, index_file: impl Into<String>) -> Self {
		self.index_file = index_file.into();
		self
	}

	/// The entry factory.
	pub fn factory(&self) -> &CacheEntryFactory {
		&self.factory
	}

	/// Resolves `path` against `provider`
	///
	/// `path` starts with the provider name (`app1/index.html`); a single
	/// leading separator is ignored. Empty paths and paths trying to leave the
	/// provider's static base resolve to "not found".
	///
	/// # Errors
	///
	/// Returns [`BundleError::Io`] when probing the filesystem fails for any
	/// reason other than the file not existing.
	pub fn resolve_from_provider(
		&self,
		provider: &ProviderHandle,
		path: &str,
	) -> BundleResult<Resolution> {
		let Some(path) = normalize_request_path(path) else {
			return Ok(Resolution::NotFound(Arc::new(self.factory.not_found())));
		};

		let key = CacheKey {
			provider: provider.name().to_string(),
			path: path.to_string(),
		};

		if let Some(resolution) = self.reuse(&key, provider)? {
			return Ok(resolution);
		}

		let target = self.locate(provider, path);
		let _guard = self.build_lock(&target).lock();

		// Another request may have rebuilt the entry while we waited.
		if let Some(resolution) = self.reuse(&key, provider)? {
			return Ok(resolution);
		}

		let resolution = self.probe(provider, path, &target)?;
		match &resolution {
			Resolution::Entry(entry) => {
				self.entries.write().insert(key, Arc::clone(entry));
			}
			Resolution::NotFound(entry) => {
				self.entries.write().insert(key, Arc::clone(entry));
				self.note_negative_insert();
			}
			Resolution::Redirect(_) => {}
		}
		Ok(resolution)
	}

	/// Builds the entry for a file the caller already holds, bypassing
	/// provider path lookup
	///
	/// Used for locally managed assets such as generated temp files. The
	/// absolute path serves as logical path for MIME resolution. The result is
	/// not memoized.
	pub fn resolve_from_file(
		&self,
		file: &Path,
		provider: Option<&ProviderHandle>,
	) -> BundleResult<Arc<CacheEntry>> {
		let absolute = std::path::absolute(file).unwrap_or_else(|_| file.to_path_buf());
		let logical_path = absolute.to_string_lossy().into_owned();

		let _guard = self.build_lock(&absolute).lock();
		Ok(Arc::new(self.factory.build(&absolute, provider, &logical_path)?))
	}

	/// Waits for a file that is still being produced, then builds its entry
	///
	/// Must not be called from within an async runtime.
	pub fn resolve_pending(
		&self,
		pending: PendingFile,
		provider: Option<&ProviderHandle>,
	) -> BundleResult<Arc<CacheEntry>> {
		let path = pending.wait()?;
		self.resolve_from_file(&path, provider)
	}

	/// Writes generated content to a temporary file and builds its entry
	///
	/// # Arguments
	///
	/// * `prefix` - File name prefix, usually the owning application's name
	/// * `suffix` - File name suffix including the extension, e.g. `.js`
	/// * `contents` - Generated bytes
	pub fn generate_asset(
		&self,
		prefix: &str,
		suffix: &str,
		contents: &[u8],
	) -> BundleResult<GeneratedAsset> {
		let temp_dir = std::env::temp_dir();
		let mut file = tempfile::Builder::new()
			.prefix(prefix)
			.suffix(suffix)
			.tempfile()
			.map_err(|e| BundleError::io(&temp_dir, e))?;
		if let Err(err) = file.write_all(contents).and_then(|()| file.flush()) {
			return Err(BundleError::io(file.path(), err));
		}

		let path = file.into_temp_path();
		let entry = self.resolve_from_file(&path, None)?;
		Ok(GeneratedAsset::new(path, entry))
	}

	/// Returns the memoized entry for `(provider name, path)` without any
	/// freshness check.
	pub fn peek(&self, provider: &str, path: &str) -> Option<Arc<CacheEntry>> {
		let path = normalize_request_path(path)?;
		let key = CacheKey {
			provider: provider.to_string(),
			path: path.to_string(),
		};
		self.entries.read().get(&key).cloned()
	}

	/// Drops every memoized entry of a provider, returning how many were removed.
	pub fn evict_provider(&self, provider: &str) -> usize {
		let mut entries = self.entries.write();
		let before = entries.len();
		entries.retain(|key, _| key.provider != provider);
		let evicted = before - entries.len();
		if evicted > 0 {
			tracing::debug!(provider = %provider, evicted, "evicted cache entries");
		}
		evicted
	}

	/// Drops expired "not found" placeholders, returning how many were removed.
	pub fn purge_expired(&self) -> usize {
		let mut entries = self.entries.write();
		let before = entries.len();
		entries.retain(|_, entry| !(entry.is_not_found() && entry.is_expired()));
		before - entries.len()
	}

	/// Drops every memoized entry.
	pub fn clear(&self) {
		self.entries.write().clear();
	}

	/// Number of memoized entries.
	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	/// Whether nothing is memoized.
	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	fn reuse(&self, key: &CacheKey, provider: &ProviderHandle) -> BundleResult<Option<Resolution>> {
		let Some(cached) = self.entries.read().get(key).cloned() else {
			return Ok(None);
		};

		let Some(file) = cached.file() else {
			if cached.is_expired() {
				return Ok(None);
			}
			tracing::debug!(provider = %key.provider, path = %key.path, "negative cache hit");
			return Ok(Some(Resolution::NotFound(cached)));
		};

		let same_provider = file
			.provider
			.as_ref()
			.is_some_and(|owner| std::ptr::addr_eq(Arc::as_ptr(owner), Arc::as_ptr(provider)));
		if !same_provider {
			return Ok(None);
		}

		let modified = match fs::metadata(&file.path).and_then(|m| m.modified()) {
			Ok(modified) => modified,
			Err(err) if is_missing(&err) => return Ok(None),
			Err(err) => return Err(BundleError::io(&file.path, err)),
		};
		let effective = modified.max(provider.last_modified());
		if effective != file.content_timestamp {
			tracing::debug!(provider = %key.provider, path = %key.path, "cache entry is stale");
			return Ok(None);
		}

		Ok(Some(Resolution::Entry(cached)))
	}

	fn note_negative_insert(&self) {
		let inserted = self.negative_inserts.fetch_add(1, Ordering::Relaxed) + 1;
		if inserted % NEGATIVE_SWEEP_INTERVAL == 0 {
			let purged = self.purge_expired();
			if purged > 0 {
				tracing::debug!(purged, "swept expired negative cache entries");
			}
		}
	}

	fn locate(&self, provider: &ProviderHandle, path: &str) -> PathBuf {
		let base = provider.content_dir().join(self.policy.static_base());
		match path.strip_suffix('/') {
			Some(directory) => base.join(directory).join(&self.index_file),
			None => base.join(path),
		}
	}

	fn probe(&self, provider: &ProviderHandle, path: &str, target: &Path) -> BundleResult<Resolution> {
		let metadata = match fs::metadata(target) {
			Ok(metadata) => metadata,
			Err(err) if is_missing(&err) => {
				return Ok(Resolution::NotFound(Arc::new(self.factory.not_found())));
			}
			Err(err) => return Err(BundleError::io(target, err)),
		};

		let is_directory_request = path.ends_with('/');
		if metadata.is_dir() && !is_directory_request {
			return Ok(Resolution::Redirect(RedirectSignal::new(format!("{path}/"))));
		}
		if !metadata.is_file() {
			return Ok(Resolution::NotFound(Arc::new(self.factory.not_found())));
		}

		let logical_path = if is_directory_request {
			format!("{path}{}", self.index_file)
		} else {
			path.to_string()
		};
		let entry = self.factory.build(target, Some(provider), &logical_path)?;
		Ok(Resolution::Entry(Arc::new(entry)))
	}

	fn build_lock(&self, path: &Path) -> &Mutex<()> {
		let mut hasher = DefaultHasher::new();
		path.hash(&mut hasher);
		&self.build_locks[(hasher.finish() as usize) % self.build_locks.len()]
	}
}

impl Default for CacheStore {
	fn default() -> Self {
		Self::from_config(&CacheConfig::default())
	}
}

/// Strips a single leading separator and refuses paths that are empty or
/// could escape the static base
///
/// # Example
///
/// ```rust
/// use reinhardt_bundles_cache::store::normalize_request_path;
///
/// assert_eq!(normalize_request_path("/app1/index.html"), Some("app1/index.html"));
/// assert_eq!(normalize_request_path("/"), None);
/// assert_eq!(normalize_request_path("app1/../app2/secret"), None);
/// ```
pub fn normalize_request_path(path: &str) -> Option<&str> {
	let path = path.strip_prefix('/').unwrap_or(path);
	if path.is_empty() {
		return None;
	}
	let escapes = path.starts_with('/')
		|| path.contains(['\\', '\0'])
		|| path.split('/').any(|segment| segment == "..");
	if escapes {
		tracing::warn!("Path traversal attempt blocked in CacheStore: {}", path);
		return None;
	}
	Some(path)
}

fn is_missing(err: &io::Error) -> bool {
	matches!(
		err.kind(),
		io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
	)
}
