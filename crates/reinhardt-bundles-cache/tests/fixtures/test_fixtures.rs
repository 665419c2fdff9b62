//! Provider content trees for integration tests

use reinhardt_bundles_cache::{DirectoryProvider, ProviderHandle};
use rstest::fixture;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use tempfile::TempDir;

/// A provider together with the temporary directory holding its content
pub struct ProviderRoot {
	inner: TempDir,
	pub provider: ProviderHandle,
}

impl ProviderRoot {
	fn new(inner: TempDir, name: &str) -> Self {
		let provider: ProviderHandle = Arc::new(DirectoryProvider::new(
			name,
			inner.path(),
			SystemTime::UNIX_EPOCH,
		));
		Self { inner, provider }
	}

	pub fn path(&self) -> &Path {
		self.inner.path()
	}

	/// Writes `content` at `relative` below the content dir, creating parents.
	pub fn write(&self, relative: &str, content: &str) {
		let path = self.inner.path().join(relative);
		fs::create_dir_all(path.parent().unwrap()).unwrap();
		fs::write(path, content).unwrap();
	}

	/// A new handle for the same content with another update time.
	pub fn redeployed(&self, last_modified: SystemTime) -> ProviderHandle {
		Arc::new(DirectoryProvider::new(
			self.provider.name(),
			self.inner.path(),
			last_modified,
		))
	}
}

/// Provider `app1` with an index page, a stylesheet and a nested directory
#[fixture]
pub fn app_provider() -> ProviderRoot {
	let root = ProviderRoot::new(TempDir::new().unwrap(), "app1");
	root.write("static/app1/index.html", "<html><body>app1</body></html>");
	root.write("static/app1/css/site.css", &"body { color: red; }".repeat(100));
	root.write("static/app1/js/app.js", "console.log('app1');");
	root.write("static/app1/docs/index.html", "<html>docs</html>");
	root.write("static/app1/LICENSE", "MIT");
	root
}

/// Provider `app1` with content only under the debug root
#[fixture]
pub fn debug_provider() -> ProviderRoot {
	let root = ProviderRoot::new(TempDir::new().unwrap(), "app1");
	root.write("static/debug/app1/index.html", "<html>debug</html>");
	root
}

/// Provider `bare` without static content
#[fixture]
pub fn empty_provider() -> ProviderRoot {
	let root = ProviderRoot::new(TempDir::new().unwrap(), "bare");
	fs::create_dir_all(root.path().join("static/bare")).unwrap();
	root
}
