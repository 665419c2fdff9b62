//! Error types for serving bundle files.

use http::StatusCode;
use http::header::InvalidHeaderValue;
use reinhardt_bundles_cache::BundleError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for serving operations.
pub type ServeResult<T> = Result<T, ServeError>;

/// Errors raised while answering a request
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServeError {
	/// Resolution or configuration failed in the cache layer.
	#[error(transparent)]
	Bundle(#[from] BundleError),

	/// Reading or writing the body failed after the headers were committed.
	///
	/// The exchange cannot be turned into an error response anymore.
	#[error("streaming {} failed after headers were committed: {source}", .path.display())]
	Streaming {
		/// File being streamed.
		path: PathBuf,
		/// Underlying error.
		#[source]
		source: io::Error,
	},

	/// The response sink refused a status line, headers or an error page.
	#[error("response sink error: {0}")]
	Sink(#[source] io::Error),

	/// A header value derived from an entry could not be encoded.
	#[error("invalid header value: {0}")]
	InvalidHeader(#[from] InvalidHeaderValue),
}

impl ServeError {
	/// Status code an uncommitted exchange should answer with
	///
	/// `None` for streaming failures, which happen after the status line has
	/// been sent.
	///
	/// # Example
	///
	/// ```rust
	/// use http::StatusCode;
	/// use reinhardt_bundles_cache::BundleError;
	/// use reinhardt_bundles_server::ServeError;
	///
	/// let err = ServeError::from(BundleError::ProviderNotFound("ghost".into()));
	/// assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
	/// ```
	pub fn status(&self) -> Option<StatusCode> {
		match self {
			Self::Bundle(BundleError::ProviderNotFound(_) | BundleError::PathNotFound(_)) => {
				Some(StatusCode::NOT_FOUND)
			}
			Self::Streaming { .. } => None,
			_ => Some(StatusCode::INTERNAL_SERVER_ERROR),
		}
	}

	/// Whether the error happened after the response was committed.
	pub fn is_streaming(&self) -> bool {
		matches!(self, Self::Streaming { .. })
	}
}
