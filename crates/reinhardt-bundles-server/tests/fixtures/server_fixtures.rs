//! Servers with registered providers, and failing collaborators

use bytes::Bytes;
use http::{HeaderMap, Request, Response, StatusCode};
use parking_lot::Mutex;
use reinhardt_bundles_cache::{DirectoryProvider, Provider, ProviderListener};
use reinhardt_bundles_server::{
	BundleFileServer, FaultChannel, ResponseSink, ServeError, ServerConfig,
};
use rstest::fixture;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// A server with provider `app1` registered
pub struct ServedApp {
	root: TempDir,
	pub server: BundleFileServer,
	pub faults: Arc<RecordingFaultChannel>,
	/// Update time of the registered provider, before every file's mtime
	pub deployed: SystemTime,
}

impl ServedApp {
	pub fn new(config: ServerConfig) -> Self {
		let root = TempDir::new().unwrap();
		write(root.path(), "static/app1/index.html", "<html><body>app1</body></html>");
		write(root.path(), "static/app1/css/site.css", "body { color: red; }");
		write(root.path(), "static/app1/docs/index.html", "<html>docs</html>");
		write(root.path(), "static/app1/big.js", &"x".repeat(200 * 1024));

		let faults = Arc::new(RecordingFaultChannel::default());
		let server = BundleFileServer::new(config).with_fault_channel(faults.clone());
		let deployed = SystemTime::now() - Duration::from_secs(3600);
		server.on_provider_appeared(Arc::new(DirectoryProvider::new(
			"app1",
			root.path(),
			deployed,
		)));

		Self {
			root,
			server,
			faults,
			deployed,
		}
	}

	pub fn path(&self) -> &Path {
		self.root.path()
	}

	pub fn get(&self, uri: &str) -> Response<Bytes> {
		self.request(Request::get(uri).body(()).unwrap())
	}

	pub fn request(&self, request: Request<()>) -> Response<Bytes> {
		self.server.serve(&request).unwrap()
	}

	/// Registers `app1` again with content of the same directory.
	pub fn redeploy(&self, last_modified: SystemTime) {
		self.server.on_provider_appeared(Arc::new(DirectoryProvider::new(
			"app1",
			self.root.path(),
			last_modified,
		)));
	}
}

/// Server with default configuration and provider `app1`
#[fixture]
pub fn served_app() -> ServedApp {
	ServedApp::new(ServerConfig::default())
}

fn write(root: &Path, relative: &str, content: &str) {
	let path = root.join(relative);
	fs::create_dir_all(path.parent().unwrap()).unwrap();
	fs::write(path, content).unwrap();
}

/// Fault channel remembering every report
#[derive(Default)]
pub struct RecordingFaultChannel {
	reports: Mutex<Vec<String>>,
}

impl RecordingFaultChannel {
	pub fn reports(&self) -> Vec<String> {
		self.reports.lock().clone()
	}
}

impl FaultChannel for RecordingFaultChannel {
	fn report(&self, request_path: &str, fault: &ServeError) {
		self.reports.lock().push(format!("{request_path}: {fault}"));
	}
}

/// Sink accepting headers but failing once `fail_after` body bytes were written
pub struct FailingSink {
	pub status: Option<StatusCode>,
	pub written: usize,
	pub writes: usize,
	fail_after: usize,
}

impl FailingSink {
	pub fn new(fail_after: usize) -> Self {
		Self {
			status: None,
			written: 0,
			writes: 0,
			fail_after,
		}
	}
}

impl ResponseSink for FailingSink {
	fn send_error(&mut self, status: StatusCode, _message: Option<&str>) -> io::Result<()> {
		if self.status.is_some() {
			return Err(io::Error::other("committed"));
		}
		self.status = Some(status);
		Ok(())
	}

	fn send_redirect(&mut self, _location: &str) -> io::Result<()> {
		self.send_error(StatusCode::FOUND, None)
	}

	fn send_headers(&mut self, status: StatusCode, _headers: HeaderMap) -> io::Result<()> {
		self.send_error(status, None)
	}

	fn write_body(&mut self, chunk: &[u8]) -> io::Result<()> {
		self.writes += 1;
		if self.written >= self.fail_after {
			return Err(io::Error::new(io::ErrorKind::BrokenPipe, "connection reset"));
		}
		self.written += chunk.len();
		Ok(())
	}

	fn is_committed(&self) -> bool {
		self.status.is_some()
	}
}

/// Provider whose content directory cannot be probed by the filesystem
#[derive(Debug)]
pub struct BrokenProvider {
	content_dir: PathBuf,
}

impl BrokenProvider {
	pub fn new() -> Self {
		Self {
			content_dir: PathBuf::from("/broken\0root"),
		}
	}
}

impl Provider for BrokenProvider {
	fn name(&self) -> &str {
		"broken"
	}

	fn last_modified(&self) -> SystemTime {
		SystemTime::UNIX_EPOCH
	}

	fn content_dir(&self) -> &Path {
		&self.content_dir
	}

	fn has_entries(&self, _root: &str) -> bool {
		true
	}
}

/// Provider that unregisters itself from `server` the first time a request
/// looks at its content directory, after the request already holds it
#[derive(Debug)]
pub struct DepartingProvider {
	inner: DirectoryProvider,
	server: OnceLock<Weak<BundleFileServer>>,
	departed: AtomicBool,
}

impl DepartingProvider {
	pub fn new(inner: DirectoryProvider) -> Self {
		Self {
			inner,
			server: OnceLock::new(),
			departed: AtomicBool::new(false),
		}
	}

	/// Arms the provider; until then it behaves like `inner`.
	pub fn depart_from(&self, server: &Arc<BundleFileServer>) {
		let _ = self.server.set(Arc::downgrade(server));
	}
}

impl Provider for DepartingProvider {
	fn name(&self) -> &str {
		self.inner.name()
	}

	fn last_modified(&self) -> SystemTime {
		self.inner.last_modified()
	}

	fn content_dir(&self) -> &Path {
		if let Some(server) = self.server.get().and_then(Weak::upgrade)
			&& !self.departed.swap(true, Ordering::SeqCst)
		{
			server.on_provider_disappeared(self.inner.name());
		}
		self.inner.content_dir()
	}
}
