//! Extension to MIME type table
//!
//! The table is read once (from the bundled `resources/mimetypes` file or an
//! operator supplied file) and never mutated afterwards. Lines have the form
//! `extension=mime/type`; blank lines and lines starting with `#` or `!` are
//! ignored, and `:` is accepted as separator as well.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

const BUNDLED_MIME_TYPES: &str = include_str!("../resources/mimetypes");

static BUNDLED: Lazy<Arc<MimeTable>> = Lazy::new(|| Arc::new(MimeTable::parse(BUNDLED_MIME_TYPES)));

/// Read-only mapping from file extension to MIME type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MimeTable {
	types: HashMap<String, String>,
}

impl MimeTable {
	/// Creates a table with no mappings; every lookup misses.
	pub fn empty() -> Self {
		Self::default()
	}

	/// Parses `extension=mime/type` lines
	///
	/// # Example
	///
	/// ```rust
	/// use reinhardt_bundles_cache::MimeTable;
	///
	/// let table = MimeTable::parse("# comment\nhtml=text/html\ncss: text/css\n");
	/// assert_eq!(table.get("html"), Some("text/html"));
	/// assert_eq!(table.get("css"), Some("text/css"));
	/// assert_eq!(table.get("js"), None);
	/// ```
	pub fn parse(source: &str) -> Self {
		let mut types = HashMap::new();

		for line in source.lines() {
			let line = line.trim();
			if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
				continue;
			}

			let Some((extension, mime)) = line.split_once(['=', ':']) else {
				continue;
			};
			let (extension, mime) = (extension.trim(), mime.trim());
			if extension.is_empty() || mime.is_empty() {
				continue;
			}

			types.insert(extension.to_string(), mime.to_string());
		}

		Self { types }
	}

	/// Returns the table shipped with the crate, parsed once per process.
	pub fn bundled() -> Arc<MimeTable> {
		Arc::clone(&BUNDLED)
	}

	/// Loads a table from a file
	///
	/// A missing or unreadable file yields an empty table; MIME types are then
	/// simply omitted from responses.
	pub fn load(path: &Path) -> Self {
		match fs::read_to_string(path) {
			Ok(source) => Self::parse(&source),
			Err(err) => {
				tracing::warn!(
					path = %path.display(),
					error = %err,
					"MIME table could not be read, continuing without MIME types"
				);
				Self::empty()
			}
		}
	}

	/// Looks up the MIME type for an extension (without the leading dot)
	///
	/// The empty extension never matches.
	pub fn get(&self, extension: &str) -> Option<&str> {
		if extension.is_empty() {
			return None;
		}
		self.types.get(extension).map(String::as_str)
	}

	/// Number of mappings.
	pub fn len(&self) -> usize {
		self.types.len()
	}

	/// Whether the table has no mappings.
	pub fn is_empty(&self) -> bool {
		self.types.is_empty()
	}
}

/// Extracts the extension of the last segment of a logical path
///
/// The extension is what follows the last `.` of the file name. A name
/// without a dot, or whose only dot is its first character, has no
/// extension. A trailing dot yields the empty extension.
///
/// # Example
///
/// ```rust
/// use reinhardt_bundles_cache::mime::extension_of;
///
/// assert_eq!(extension_of("app1/index.html"), Some("html"));
/// assert_eq!(extension_of("app1/archive.tar.gz"), Some("gz"));
/// assert_eq!(extension_of("app1/README"), None);
/// assert_eq!(extension_of("app1/file."), Some(""));
/// assert_eq!(extension_of("app1.v2/README"), None);
/// ```
pub fn extension_of(logical_path: &str) -> Option<&str> {
	let name = logical_path.rsplit('/').next().unwrap_or(logical_path);
	match name.rfind('.') {
		Some(n) if n > 0 => Some(&name[n + 1..]),
		_ => None,
	}
}
