//! Conditional responses for resolved bundle files
//!
//! One exchange moves from [`ExchangeState::Received`] to exactly one terminal
//! state:
//!
//! | Resolution | Validators      | State          | Response                 |
//! |------------|-----------------|----------------|--------------------------|
//! | Redirect   | -               | `Redirected`   | 302 + `Location`         |
//! | NotFound   | -               | `Error`        | 404                      |
//! | Entry      | current         | `NotModified`  | 304 + cache headers      |
//! | Entry      | stale / absent  | `BodySent`     | 200 + cache headers+body |
//!
//! A failure while streaming the body happens after the 200 was committed.
//! It is reported once to the [`FaultChannel`] and returned as
//! [`ServeError::Streaming`]; it is never turned into another status.

use crate::config::DEFAULT_CHUNK_SIZE;
use crate::error::{ServeError, ServeResult};
use crate::fault::{FaultChannel, TracingFaultChannel};
use crate::sink::ResponseSink;
use crate::validators::RequestValidators;
use http::header::{
	CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ETAG, EXPIRES, HeaderName, HeaderValue,
	LAST_MODIFIED,
};
use http::{HeaderMap, StatusCode};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reinhardt_bundles_cache::{BundleError, CacheEntry, Resolution};
use std::fs::File;
use std::io::Read;
use std::sync::Arc;
use std::time::SystemTime;

/// Base64 MD5 of the body.
pub const CONTENT_MD5: HeaderName = HeaderName::from_static("content-md5");

/// Bytes escaped in a path segment of a `Location` header.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
	.add(b' ')
	.add(b'"')
	.add(b'#')
	.add(b'%')
	.add(b'<')
	.add(b'>')
	.add(b'?')
	.add(b'`')
	.add(b'{')
	.add(b'}');

/// Progress of one request/response exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
	/// Nothing has been sent yet.
	Received,
	/// 304 with cache headers.
	NotModified,
	/// 200 with cache headers and the file body.
	BodySent,
	/// 302 to the normalized path.
	Redirected,
	/// An error status was sent.
	Error(ErrorKind),
}

/// Why an exchange ended in [`ExchangeState::Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// No provider under the requested name (404).
	ProviderNotFound,
	/// The provider has no such file (404).
	PathNotFound,
	/// Only GET and HEAD are served (405).
	MethodNotAllowed,
	/// Resolution or reading failed (500).
	Internal,
}

impl ExchangeState {
	/// Whether the exchange is finished.
	pub fn is_terminal(&self) -> bool {
		!matches!(self, Self::Received)
	}
}

/// Turns resolutions into responses
pub struct ConditionalResponder {
	chunk_size: usize,
	redirect_base: String,
	faults: Arc<dyn FaultChannel>,
}

impl ConditionalResponder {
	/// Creates a responder streaming bodies in `chunk_size` pieces.
	pub fn new(chunk_size: usize) -> Self {
		Self {
			chunk_size: chunk_size.max(1),
			redirect_base: String::new(),
			faults: Arc::new(TracingFaultChannel),
		}
	}

	/// Prefix put in front of redirect paths, usually the mount path.
	pub fn with_redirect_base(mut self, base: impl Into<String>) -> Self {
		self.redirect_base = base.into().trim_end_matches('/').to_string();
		self
	}

	/// Replaces the channel streaming failures are reported to.
	pub fn with_fault_channel(mut self, faults: Arc<dyn FaultChannel>) -> Self {
		self.faults = faults;
		self
	}

	/// Answers a GET
	///
	/// # Errors
	///
	/// - [`ServeError::Sink`] when the sink refuses the status line
	/// - [`ServeError::Bundle`] when the file cannot be opened (nothing sent)
	/// - [`ServeError::Streaming`] when the body fails after the 200 was sent
	pub fn respond(
		&self,
		validators: &RequestValidators,
		resolved: &Resolution,
		sink: &mut dyn ResponseSink,
	) -> ServeResult<ExchangeState> {
		self.respond_with(validators, resolved, sink, true)
	}

	/// Answers a HEAD: same decision and headers as [`respond`](Self::respond), no body.
	pub fn respond_head(
		&self,
		validators: &RequestValidators,
		resolved: &Resolution,
		sink: &mut dyn ResponseSink,
	) -> ServeResult<ExchangeState> {
		self.respond_with(validators, resolved, sink, false)
	}

	fn respond_with(
		&self,
		validators: &RequestValidators,
		resolved: &Resolution,
		sink: &mut dyn ResponseSink,
		with_body: bool,
	) -> ServeResult<ExchangeState> {
		let entry = match resolved {
			Resolution::Redirect(signal) => {
				let location = format!("{}/{}", self.redirect_base, encode_path(signal.path()));
				sink.send_redirect(&location).map_err(ServeError::Sink)?;
				return Ok(ExchangeState::Redirected);
			}
			Resolution::NotFound(_) => {
				sink.send_error(StatusCode::NOT_FOUND, None)
					.map_err(ServeError::Sink)?;
				return Ok(ExchangeState::Error(ErrorKind::PathNotFound));
			}
			Resolution::Entry(entry) => entry,
		};

		let Some(file) = entry.file() else {
			sink.send_error(StatusCode::NOT_FOUND, None)
				.map_err(ServeError::Sink)?;
			return Ok(ExchangeState::Error(ErrorKind::PathNotFound));
		};

		let mut headers = cache_headers(entry)?;

		if validators.matches(entry) {
			tracing::debug!(path = %file.path.display(), "not modified");
			sink.send_headers(StatusCode::NOT_MODIFIED, headers)
				.map_err(ServeError::Sink)?;
			return Ok(ExchangeState::NotModified);
		}

		if let Some(mime_type) = &file.mime_type {
			headers.insert(CONTENT_TYPE, HeaderValue::from_str(mime_type)?);
		}
		headers.insert(CONTENT_MD5, HeaderValue::from_str(&file.content_hash)?);

		// Opened before committing so a vanished file still gets a 500. The
		// length comes from the open handle, which is what gets streamed.
		let reader = File::open(&file.path).map_err(|e| BundleError::io(&file.path, e))?;
		let length = reader
			.metadata()
			.map_err(|e| BundleError::io(&file.path, e))?
			.len();
		headers.insert(CONTENT_LENGTH, HeaderValue::from(length));

		sink.send_headers(StatusCode::OK, headers)
			.map_err(ServeError::Sink)?;

		if with_body
			&& let Err(source) = self.stream(reader.take(length), sink)
		{
			let fault = ServeError::Streaming {
				path: file.path.clone(),
				source,
			};
			self.faults.report(&file.path.to_string_lossy(), &fault);
			return Err(fault);
		}

		Ok(ExchangeState::BodySent)
	}

	fn stream(&self, mut reader: impl Read, sink: &mut dyn ResponseSink) -> std::io::Result<()> {
		let mut buffer = vec![0u8; self.chunk_size];
		loop {
			let read = reader.read(&mut buffer)?;
			if read == 0 {
				return Ok(());
			}
			sink.write_body(&buffer[..read])?;
		}
	}
}

impl Default for ConditionalResponder {
	fn default() -> Self {
		Self::new(DEFAULT_CHUNK_SIZE)
	}
}

/// Percent-encodes each segment of a decoded request path.
fn encode_path(path: &str) -> String {
	path.split('/')
		.map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
		.collect::<Vec<_>>()
		.join("/")
}

/// Headers shared by 200 and 304 responses: `ETag`, `Last-Modified`,
/// `Cache-Control` and `Expires`.
pub fn cache_headers(entry: &CacheEntry) -> ServeResult<HeaderMap> {
	let mut headers = HeaderMap::new();
	let Some(file) = entry.file() else {
		return Ok(headers);
	};

	headers.insert(ETAG, HeaderValue::from_str(&format!("\"{}\"", file.etag))?);
	headers.insert(
		LAST_MODIFIED,
		HeaderValue::from_str(&httpdate::fmt_http_date(file.content_timestamp))?,
	);

	let max_age = entry.expires_after();
	headers.insert(
		CACHE_CONTROL,
		HeaderValue::from_str(&format!("max-age={}", max_age.as_secs()))?,
	);
	headers.insert(
		EXPIRES,
		HeaderValue::from_str(&httpdate::fmt_http_date(SystemTime::now() + max_age))?,
	);
	Ok(headers)
}
