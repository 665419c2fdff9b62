//! Cache entries
//!
//! A [`CacheEntry`] is immutable once built and shared through `Arc` across
//! request threads. Resolution replaces entries, it never updates them.

pub mod digest;
pub mod factory;

pub use digest::ContentDigest;
pub use factory::CacheEntryFactory;

use crate::provider::ProviderHandle;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

/// Metadata of a resolved file
#[derive(Debug, Clone)]
pub struct ResolvedFile {
	/// Backing file (owned by the filesystem, not by the cache)
	pub path: PathBuf,

	/// File size in bytes
	pub size: u64,

	/// Later of the file's modification time and the provider's update time
	pub content_timestamp: SystemTime,

	/// Hex-encoded content digest
	pub etag: String,

	/// Base64-encoded content digest (same digest as `etag`)
	pub content_hash: String,

	/// MIME type, if the extension is known
	pub mime_type: Option<String>,

	/// Provider that supplied the file
	pub provider: Option<ProviderHandle>,
}

/// Cached metadata for one resolved `(provider, path)` pair
///
/// An entry without a file is a "not found" placeholder; it only carries its
/// expiration.
#[derive(Debug, Clone)]
pub struct CacheEntry {
	expires_after: Duration,
	created_at: Instant,
	file: Option<ResolvedFile>,
}

impl CacheEntry {
	/// Creates an entry for a resolved file.
	pub fn resolved(file: ResolvedFile, expires_after: Duration) -> Self {
		Self {
			expires_after,
			created_at: Instant::now(),
			file: Some(file),
		}
	}

	/// Creates a "not found" placeholder.
	pub fn not_found(expires_after: Duration) -> Self {
		Self {
			expires_after,
			created_at: Instant::now(),
			file: None,
		}
	}

	/// Whether this is a "not found" placeholder.
	pub fn is_not_found(&self) -> bool {
		self.file.is_none()
	}

	/// The resolved file, absent for placeholders.
	pub fn file(&self) -> Option<&ResolvedFile> {
		self.file.as_ref()
	}

	/// Backing file path.
	pub fn source_file(&self) -> Option<&Path> {
		self.file.as_ref().map(|f| f.path.as_path())
	}

	/// Hex-encoded content digest.
	pub fn etag(&self) -> Option<&str> {
		self.file.as_ref().map(|f| f.etag.as_str())
	}

	/// Base64-encoded content digest.
	pub fn content_hash(&self) -> Option<&str> {
		self.file.as_ref().map(|f| f.content_hash.as_str())
	}

	/// MIME type.
	pub fn mime_type(&self) -> Option<&str> {
		self.file.as_ref().and_then(|f| f.mime_type.as_deref())
	}

	/// Effective modification time.
	pub fn content_timestamp(&self) -> Option<SystemTime> {
		self.file.as_ref().map(|f| f.content_timestamp)
	}

	/// Provider that supplied the file.
	pub fn owning_provider(&self) -> Option<&ProviderHandle> {
		self.file.as_ref().and_then(|f| f.provider.as_ref())
	}

	/// Duration after which the entry must be re-resolved.
	pub fn expires_after(&self) -> Duration {
		self.expires_after
	}

	/// Time since the entry was built.
	pub fn age(&self) -> Duration {
		self.created_at.elapsed()
	}

	/// Whether `expires_after` has elapsed since the entry was built.
	pub fn is_expired(&self) -> bool {
		self.age() >= self.expires_after
	}
}
