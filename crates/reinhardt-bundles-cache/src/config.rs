//! Cache configuration
//!
//! Settings are read from TOML and can then be overridden from environment
//! variables sharing a common prefix (environment > file > defaults).
//!
//! ```toml
//! debug = false
//! not_found_expiration_secs = 1200
//! index_file = "index.html"
//! mime_types = "/etc/bundles/mimetypes"
//! mime_fallback = false
//! ```

use crate::error::{BundleError, BundleResult};
use crate::mime::MimeTable;
use crate::provider::StaticRootPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Expiration applied to "not found" placeholders (20 minutes)
pub const DEFAULT_NOT_FOUND_EXPIRATION: Duration = Duration::from_secs(20 * 60);

/// Configuration of the cache layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
	/// Serve from `static/debug/<name>` roots instead of `static/<name>`
	pub debug: bool,

	/// Lifetime of cached entries, in seconds; hard limit for "not found"
	/// placeholders, freshness hint for resolved files
	pub not_found_expiration_secs: u64,

	/// File served for directory requests ending with a separator
	pub index_file: String,

	/// Optional MIME table replacing the bundled one
	pub mime_types: Option<PathBuf>,

	/// Guess MIME types for extensions missing from the table
	pub mime_fallback: bool,
}

impl Default for CacheConfig {
	fn default() -> Self {
		Self {
			debug: false,
			not_found_expiration_secs: DEFAULT_NOT_FOUND_EXPIRATION.as_secs(),
			index_file: "index.html".to_string(),
			mime_types: None,
			mime_fallback: false,
		}
	}
}

impl CacheConfig {
	/// Parses and validates a TOML document
	///
	/// # Example
	///
	/// ```rust
	/// use reinhardt_bundles_cache::CacheConfig;
	///
	/// let config = CacheConfig::from_toml_str("debug = true").unwrap();
	/// assert!(config.debug);
	/// assert_eq!(config.index_file, "index.html");
	/// ```
	pub fn from_toml_str(source: &str) -> BundleResult<Self> {
		let config: Self = toml::from_str(source)?;
		config.validate()?;
		Ok(config)
	}

	/// Reads, parses and validates a TOML file.
	pub fn from_file(path: &Path) -> BundleResult<Self> {
		let source = std::fs::read_to_string(path).map_err(|e| BundleError::io(path, e))?;
		Self::from_toml_str(&source)
	}

	/// Applies `<prefix>DEBUG`, `<prefix>NOT_FOUND_EXPIRATION_SECS`,
	/// `<prefix>INDEX_FILE` and `<prefix>MIME_TYPES` overrides.
	pub fn with_env_overrides(mut self, prefix: &str) -> BundleResult<Self> {
		if let Some(debug) = env_flag(prefix, "DEBUG")? {
			self.debug = debug;
		}
		if let Some(secs) = env_u64(prefix, "NOT_FOUND_EXPIRATION_SECS")? {
			self.not_found_expiration_secs = secs;
		}
		if let Some(index_file) = env_string(prefix, "INDEX_FILE") {
			self.index_file = index_file;
		}
		if let Some(mime_types) = env_string(prefix, "MIME_TYPES") {
			self.mime_types = Some(PathBuf::from(mime_types));
		}
		self.validate()?;
		Ok(self)
	}

	/// Checks value ranges.
	pub fn validate(&self) -> BundleResult<()> {
		if self.not_found_expiration_secs == 0 {
			return Err(BundleError::Config(
				"not_found_expiration_secs must be greater than zero".to_string(),
			));
		}
		if self.index_file.is_empty() || self.index_file.contains('/') {
			return Err(BundleError::Config(format!(
				"index_file must be a plain file name, got {:?}",
				self.index_file
			)));
		}
		Ok(())
	}

	/// Expiration of cache entries as a [`Duration`].
	pub fn not_found_expiration(&self) -> Duration {
		Duration::from_secs(self.not_found_expiration_secs)
	}

	/// Content root policy for the configured mode.
	pub fn root_policy(&self) -> StaticRootPolicy {
		StaticRootPolicy::new(self.debug)
	}

	/// The configured MIME table, or the bundled one.
	pub fn mime_table(&self) -> Arc<MimeTable> {
		match &self.mime_types {
			Some(path) => Arc::new(MimeTable::load(path)),
			None => MimeTable::bundled(),
		}
	}
}

/// Parses a boolean the way settings files spell them
///
/// Accepts `true/1/yes/on` and `false/0/no/off`, case-insensitively.
pub fn parse_bool(value: &str) -> Option<bool> {
	match value.trim().to_lowercase().as_str() {
		"true" | "1" | "yes" | "on" => Some(true),
		"false" | "0" | "no" | "off" => Some(false),
		_ => None,
	}
}

/// Reads `<prefix><key>` as a string, if set.
pub fn env_string(prefix: &str, key: &str) -> Option<String> {
	std::env::var(format!("{prefix}{key}")).ok()
}

/// Reads `<prefix><key>` as a boolean, if set.
pub fn env_flag(prefix: &str, key: &str) -> BundleResult<Option<bool>> {
	let Some(raw) = env_string(prefix, key) else {
		return Ok(None);
	};
	parse_bool(&raw).map(Some).ok_or_else(|| {
		BundleError::Config(format!("{prefix}{key}: expected a boolean, got {raw:?}"))
	})
}

/// Reads `<prefix><key>` as an unsigned integer, if set.
pub fn env_u64(prefix: &str, key: &str) -> BundleResult<Option<u64>> {
	let Some(raw) = env_string(prefix, key) else {
		return Ok(None);
	};
	raw.trim().parse().map(Some).map_err(|_| {
		BundleError::Config(format!("{prefix}{key}: expected an integer, got {raw:?}"))
	})
}
