//! Content providers
//!
//! A provider is a named source of static content owned by the host's module
//! runtime. The cache layer only holds shared handles to providers and never
//! controls their lifetime.
//!
//! Content of a provider named `app1` lives under
//! `<content_dir>/static/app1/...` (or `<content_dir>/static/debug/app1/...`
//! in debug mode). Request paths start with the provider name, so
//! `app1/index.html` resolves to `<content_dir>/static/app1/index.html`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Shared handle to a provider.
pub type ProviderHandle = Arc<dyn Provider>;

/// A named source of static content
pub trait Provider: Send + Sync + fmt::Debug {
	/// Unique provider name.
	fn name(&self) -> &str;

	/// Time of the provider's last deployment or update.
	fn last_modified(&self) -> SystemTime;

	/// Directory the provider's content paths are relative to.
	fn content_dir(&self) -> &Path;

	/// Content root probe: does `root` (relative to [`content_dir`](Self::content_dir))
	/// exist and contain at least one entry?
	fn has_entries(&self, root: &str) -> bool {
		match fs::read_dir(self.content_dir().join(root)) {
			Ok(mut entries) => entries.next().is_some(),
			Err(_) => false,
		}
	}
}

/// Provider backed by a directory on disk
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
	name: String,
	content_dir: PathBuf,
	last_modified: SystemTime,
}

impl DirectoryProvider {
	/// Creates a provider
	///
	/// # Example
	///
	/// ```rust
	/// use reinhardt_bundles_cache::{DirectoryProvider, Provider};
	/// use std::time::SystemTime;
	///
	/// let provider = DirectoryProvider::new("app1", "/srv/app1", SystemTime::UNIX_EPOCH);
	/// assert_eq!(provider.name(), "app1");
	/// ```
	pub fn new(
		name: impl Into<String>,
		content_dir: impl Into<PathBuf>,
		last_modified: SystemTime,
	) -> Self {
		Self {
			name: name.into(),
			content_dir: content_dir.into(),
			last_modified,
		}
	}

	/// Returns a copy with a new update time, as after a redeployment.
	pub fn with_last_modified(mut self, last_modified: SystemTime) -> Self {
		self.last_modified = last_modified;
		self
	}
}

impl Provider for DirectoryProvider {
	fn name(&self) -> &str {
		&self.name
	}

	fn last_modified(&self) -> SystemTime {
		self.last_modified
	}

	fn content_dir(&self) -> &Path {
		&self.content_dir
	}
}

/// Where providers keep their static content, depending on the mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticRootPolicy {
	debug: bool,
}

impl StaticRootPolicy {
	/// Creates the policy for release (`false`) or debug (`true`) mode.
	pub const fn new(debug: bool) -> Self {
		Self { debug }
	}

	/// Whether debug roots are used.
	pub fn is_debug(&self) -> bool {
		self.debug
	}

	/// Directory, relative to a provider's content dir, request paths resolve under.
	pub fn static_base(&self) -> &'static str {
		if self.debug { "static/debug" } else { "static" }
	}

	/// Root that must have entries for `name` to count as a content provider
	///
	/// # Example
	///
	/// ```rust
	/// use reinhardt_bundles_cache::StaticRootPolicy;
	///
	/// assert_eq!(StaticRootPolicy::new(false).probe_root("app1"), "static/app1");
	/// assert_eq!(StaticRootPolicy::new(true).probe_root("app1"), "static/debug/app1");
	/// ```
	pub fn probe_root(&self, name: &str) -> String {
		format!("{}/{}", self.static_base(), name)
	}

	/// Runs the provider's probe against the root expected for `name`.
	pub fn qualifies(&self, name: &str, provider: &dyn Provider) -> bool {
		provider.has_entries(&self.probe_root(name))
	}
}

/// Receiver of provider lifecycle notifications from the host runtime
pub trait ProviderListener: Send + Sync {
	/// A provider was started or updated.
	fn on_provider_appeared(&self, provider: ProviderHandle);

	/// The provider registered under `name` was stopped or uninstalled.
	fn on_provider_disappeared(&self, name: &str);
}
