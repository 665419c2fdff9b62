//! Server configuration
//!
//! Extends [`CacheConfig`] with the settings of the request entry point. Cache
//! keys sit at the top level of the same document:
//!
//! ```toml
//! debug = false
//! not_found_expiration_secs = 1200
//! mount_path = "/bnd"
//! exceptions = false
//! chunk_size = 65536
//! ```

use crate::error::ServeResult;
use reinhardt_bundles_cache::config::{env_flag, env_string, env_u64};
use reinhardt_bundles_cache::{BundleError, CacheConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default mount path of the file server
pub const DEFAULT_MOUNT_PATH: &str = "/bnd";

/// Default size of body chunks handed to the sink (64 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Configuration of [`BundleFileServer`](crate::BundleFileServer)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
	/// Cache layer settings
	#[serde(flatten)]
	pub cache: CacheConfig,

	/// URL prefix the server is mounted under
	pub mount_path: String,

	/// Re-raise internal failures to the host instead of answering 500
	pub exceptions: bool,

	/// Size of body chunks handed to the sink, in bytes
	pub chunk_size: usize,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			cache: CacheConfig::default(),
			mount_path: DEFAULT_MOUNT_PATH.to_string(),
			exceptions: false,
			chunk_size: DEFAULT_CHUNK_SIZE,
		}
	}
}

impl ServerConfig {
	/// Parses and validates a TOML document
	///
	/// # Example
	///
	/// ```rust
	/// use reinhardt_bundles_server::ServerConfig;
	///
	/// let config = ServerConfig::from_toml_str("debug = true\nexceptions = true").unwrap();
	/// assert!(config.cache.debug);
	/// assert!(config.exceptions);
	/// assert_eq!(config.mount_path, "/bnd");
	/// ```
	pub fn from_toml_str(source: &str) -> ServeResult<Self> {
		let config: Self = toml::from_str(source).map_err(BundleError::from)?;
		config.validate()?;
		Ok(config)
	}

	/// Reads, parses and validates a TOML file.
	pub fn from_file(path: &Path) -> ServeResult<Self> {
		let source = std::fs::read_to_string(path).map_err(|e| BundleError::io(path, e))?;
		Self::from_toml_str(&source)
	}

	/// Applies the cache overrides plus `<prefix>EXCEPTIONS`,
	/// `<prefix>MOUNT_PATH` and `<prefix>CHUNK_SIZE`.
	pub fn with_env_overrides(mut self, prefix: &str) -> ServeResult<Self> {
		self.cache = self.cache.with_env_overrides(prefix)?;
		if let Some(exceptions) = env_flag(prefix, "EXCEPTIONS")? {
			self.exceptions = exceptions;
		}
		if let Some(mount_path) = env_string(prefix, "MOUNT_PATH") {
			self.mount_path = mount_path;
		}
		if let Some(chunk_size) = env_u64(prefix, "CHUNK_SIZE")? {
			self.chunk_size = usize::try_from(chunk_size).map_err(|_| {
				BundleError::Config(format!("{prefix}CHUNK_SIZE: {chunk_size} is too large"))
			})?;
		}
		self.validate()?;
		Ok(self)
	}

	/// Checks value ranges.
	pub fn validate(&self) -> ServeResult<()> {
		self.cache.validate()?;
		if self.chunk_size == 0 {
			return Err(BundleError::Config("chunk_size must be greater than zero".to_string()).into());
		}
		if !self.mount_path.starts_with('/') {
			return Err(BundleError::Config(format!(
				"mount_path must start with '/', got {:?}",
				self.mount_path
			))
			.into());
		}
		Ok(())
	}
}
