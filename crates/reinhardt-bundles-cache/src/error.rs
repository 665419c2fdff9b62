//! Error types for the bundle cache layer.
//!
//! Redirects are not errors; they are reported through
//! [`Resolution::Redirect`](crate::store::Resolution::Redirect).

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for bundle cache operations.
pub type BundleResult<T> = Result<T, BundleError>;

/// Bundle cache errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BundleError {
	/// No provider is registered under the requested name.
	#[error("provider not found: {0}")]
	ProviderNotFound(String),

	/// The provider is known but does not contain the requested path.
	#[error("path not found: {0}")]
	PathNotFound(String),

	/// Reading metadata or content of a file failed.
	#[error("IO error on {}: {source}", .path.display())]
	Io {
		/// File or directory being accessed.
		path: PathBuf,
		/// Underlying error.
		#[source]
		source: io::Error,
	},

	/// The producer of a pending file went away without completing it.
	#[error("pending file was abandoned before it was materialized")]
	PendingAbandoned,

	/// The producer of a pending file reported a failure.
	#[error("pending file failed to materialize: {0}")]
	PendingFailed(#[source] io::Error),

	/// Invalid configuration value.
	#[error("configuration error: {0}")]
	Config(String),

	/// TOML parsing error.
	#[error("TOML parse error: {0}")]
	TomlParse(#[from] toml::de::Error),
}

impl BundleError {
	/// Wraps an I/O error together with the path that caused it.
	pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
		Self::Io {
			path: path.into(),
			source,
		}
	}

	/// Returns `true` for the "not found" kinds, which callers surface as 404.
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::ProviderNotFound(_) | Self::PathNotFound(_))
	}
}
