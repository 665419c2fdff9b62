//! Content digest with hex and base64 views

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use md5::{Digest, Md5};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// MD5 digest of a file's content
///
/// Computed once; [`to_hex`](Self::to_hex) (the ETag) and
/// [`to_base64`](Self::to_base64) (the content hash) are two encodings of
/// the same bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 16]);

impl ContentDigest {
	/// Digests the content of a file. Empty files are digested too.
	pub fn of_file(path: &Path) -> io::Result<Self> {
		let mut file = File::open(path)?;
		let mut hasher = Md5::new();
		let mut buffer = [0u8; READ_BUFFER_SIZE];

		loop {
			let read = file.read(&mut buffer)?;
			if read == 0 {
				break;
			}
			hasher.update(&buffer[..read]);
		}

		Ok(Self(hasher.finalize().into()))
	}

	/// Digests a byte slice
	///
	/// # Example
	///
	/// ```rust
	/// use reinhardt_bundles_cache::ContentDigest;
	///
	/// let digest = ContentDigest::of_bytes(b"");
	/// assert_eq!(digest.to_hex(), "d41d8cd98f00b204e9800998ecf8427e");
	/// assert_eq!(digest.to_base64(), "1B2M2Y8AsgTpgAmY7PhCfg==");
	/// ```
	pub fn of_bytes(bytes: &[u8]) -> Self {
		Self(Md5::digest(bytes).into())
	}

	/// Raw digest bytes.
	pub fn as_bytes(&self) -> &[u8; 16] {
		&self.0
	}

	/// Lowercase hex encoding.
	pub fn to_hex(&self) -> String {
		hex::encode(self.0)
	}

	/// Standard base64 encoding with padding.
	pub fn to_base64(&self) -> String {
		STANDARD.encode(self.0)
	}
}
