//! Cache entry construction

use super::digest::ContentDigest;
use super::{CacheEntry, ResolvedFile};
use crate::config::{CacheConfig, DEFAULT_NOT_FOUND_EXPIRATION};
use crate::error::{BundleError, BundleResult};
use crate::mime::{MimeTable, extension_of};
use crate::provider::ProviderHandle;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Builds [`CacheEntry`] values from files
///
/// The factory does no caching of its own. Its only side effect besides
/// reading the file is the timestamp write-back described on
/// [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct CacheEntryFactory {
	mimes: Arc<MimeTable>,
	expiration: Duration,
	mime_fallback: bool,
}

impl CacheEntryFactory {
	/// Creates a factory using `mimes` and the default expiration.
	pub fn new(mimes: Arc<MimeTable>) -> Self {
		Self {
			mimes,
			expiration: DEFAULT_NOT_FOUND_EXPIRATION,
			mime_fallback: false,
		}
	}

	/// Creates a factory from configuration.
	pub fn from_config(config: &CacheConfig) -> Self {
		Self {
			mimes: config.mime_table(),
			expiration: config.not_found_expiration(),
			mime_fallback: config.mime_fallback,
		}
	}

	/// Sets the expiration attached to built entries.
	pub fn with_expiration(mut self, expiration: Duration) -> Self {
		self.expiration = expiration;
		self
	}

	/// Enables guessing MIME types missing from the table.
	pub fn with_mime_fallback(mut self, enabled: bool) -> Self {
		self.mime_fallback = enabled;
		self
	}

	/// Expiration attached to built entries.
	pub fn expiration(&self) -> Duration {
		self.expiration
	}

	/// The MIME table in use.
	pub fn mime_table(&self) -> &Arc<MimeTable> {
		&self.mimes
	}

	/// Resolves the MIME type of a logical path from its extension.
	pub fn mime_type_for(&self, logical_path: &str) -> Option<String> {
		let extension = extension_of(logical_path)?;
		if let Some(mime) = self.mimes.get(extension) {
			return Some(mime.to_string());
		}
		if self.mime_fallback && !extension.is_empty() {
			return mime_guess::from_ext(extension).first_raw().map(str::to_string);
		}
		None
	}

	/// Builds the entry for `file`
	///
	/// When `provider` was updated after the file was last modified, the
	/// provider's update time becomes the entry's timestamp and is also
	/// written onto the file's modification time, so later observers of the
	/// file see the same time. Callers serialize concurrent builds of one file.
	///
	/// # Errors
	///
	/// Returns [`BundleError::Io`] if metadata or content cannot be read.
	pub fn build(
		&self,
		file: &Path,
		provider: Option<&ProviderHandle>,
		logical_path: &str,
	) -> BundleResult<CacheEntry> {
		let metadata = fs::metadata(file).map_err(|e| BundleError::io(file, e))?;
		let file_modified = metadata.modified().map_err(|e| BundleError::io(file, e))?;

		let mut content_timestamp = file_modified;
		if let Some(provider) = provider {
			let provider_modified = provider.last_modified();
			if provider_modified > file_modified {
				content_timestamp = provider_modified;
				write_back_modified(file, provider_modified);
			}
		}

		let digest = ContentDigest::of_file(file).map_err(|e| BundleError::io(file, e))?;

		let resolved = ResolvedFile {
			path: file.to_path_buf(),
			size: metadata.len(),
			content_timestamp,
			etag: digest.to_hex(),
			content_hash: digest.to_base64(),
			mime_type: self.mime_type_for(logical_path),
			provider: provider.cloned(),
		};

		tracing::debug!(
			path = %file.display(),
			etag = %resolved.etag,
			"built cache entry"
		);

		Ok(CacheEntry::resolved(resolved, self.expiration))
	}

	/// Builds a "not found" placeholder with the configured expiration.
	pub fn not_found(&self) -> CacheEntry {
		CacheEntry::not_found(self.expiration)
	}
}

impl Default for CacheEntryFactory {
	fn default() -> Self {
		Self::new(MimeTable::bundled())
	}
}

fn write_back_modified(file: &Path, modified: SystemTime) {
	let result = OpenOptions::new()
		.write(true)
		.open(file)
		.and_then(|handle| handle.set_modified(modified));

	if let Err(err) = result {
		tracing::warn!(
			path = %file.display(),
			error = %err,
			"could not propagate provider update time to file"
		);
	}
}
