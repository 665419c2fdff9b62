//! Files that materialize after the request for them starts, and generated assets

use crate::entry::CacheEntry;
use crate::error::{BundleError, BundleResult};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;
use tokio::sync::oneshot;

/// Consumer side of a file that is still being produced
///
/// # Example
///
/// ```rust,no_run
/// use reinhardt_bundles_cache::{CacheStore, PendingFile};
/// use std::path::PathBuf;
///
/// let store = CacheStore::default();
/// let (completer, pending) = PendingFile::channel();
///
/// std::thread::spawn(move || {
///     // ... generate the file ...
///     completer.complete(PathBuf::from("/tmp/generated.js"));
/// });
///
/// let entry = store.resolve_pending(pending, None).unwrap();
/// ```
#[derive(Debug)]
pub struct PendingFile {
	receiver: oneshot::Receiver<io::Result<PathBuf>>,
}

/// Producer side of a [`PendingFile`]
#[derive(Debug)]
pub struct FileCompleter {
	sender: oneshot::Sender<io::Result<PathBuf>>,
}

impl PendingFile {
	/// Creates a connected completer / pending pair.
	pub fn channel() -> (FileCompleter, PendingFile) {
		let (sender, receiver) = oneshot::channel();
		(FileCompleter { sender }, PendingFile { receiver })
	}

	/// Blocks until the producer completes or fails
	///
	/// Must not be called from within an async runtime.
	pub fn wait(self) -> BundleResult<PathBuf> {
		match self.receiver.blocking_recv() {
			Ok(Ok(path)) => Ok(path),
			Ok(Err(err)) => Err(BundleError::PendingFailed(err)),
			Err(_) => Err(BundleError::PendingAbandoned),
		}
	}
}

impl FileCompleter {
	/// Hands over the finished file. Ignored if nobody is waiting anymore.
	pub fn complete(self, path: PathBuf) {
		let _ = self.sender.send(Ok(path));
	}

	/// Reports that the file could not be produced.
	pub fn fail(self, error: io::Error) {
		let _ = self.sender.send(Err(error));
	}
}

/// Dynamically generated content backed by a temporary file
///
/// The file is deleted when the asset is dropped.
#[derive(Debug)]
pub struct GeneratedAsset {
	path: TempPath,
	entry: Arc<CacheEntry>,
}

impl GeneratedAsset {
	pub(crate) fn new(path: TempPath, entry: Arc<CacheEntry>) -> Self {
		Self { path, entry }
	}

	/// Location of the backing temporary file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Cache entry describing the generated content.
	pub fn entry(&self) -> &Arc<CacheEntry> {
		&self.entry
	}
}
