//! Output side of an exchange

use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderValue, LOCATION};
use http::{HeaderMap, Response, StatusCode};
use std::io;

/// Destination of one response
///
/// The status line and headers are committed by the first call to
/// [`send_headers`](Self::send_headers), [`send_error`](Self::send_error) or
/// [`send_redirect`](Self::send_redirect); afterwards only body chunks may
/// follow.
pub trait ResponseSink {
	/// Commits an error status with an optional plain text message.
	fn send_error(&mut self, status: StatusCode, message: Option<&str>) -> io::Result<()>;

	/// Commits a `302 Found` pointing at `location`.
	fn send_redirect(&mut self, location: &str) -> io::Result<()>;

	/// Commits the status line and headers of a response.
	fn send_headers(&mut self, status: StatusCode, headers: HeaderMap) -> io::Result<()>;

	/// Appends a body chunk to a committed response.
	fn write_body(&mut self, chunk: &[u8]) -> io::Result<()>;

	/// Whether the status line has been sent.
	fn is_committed(&self) -> bool;
}

/// Sink buffering the whole exchange into an [`http::Response`]
#[derive(Debug, Default)]
pub struct HttpResponseSink {
	status: Option<StatusCode>,
	headers: HeaderMap,
	body: BytesMut,
}

impl HttpResponseSink {
	/// Creates an uncommitted sink.
	pub fn new() -> Self {
		Self::default()
	}

	/// Committed status, if any.
	pub fn status(&self) -> Option<StatusCode> {
		self.status
	}

	/// Converts into a response
	///
	/// An uncommitted sink yields an empty `200 OK`.
	pub fn into_response(self) -> Response<Bytes> {
		let mut response = Response::new(self.body.freeze());
		*response.status_mut() = self.status.unwrap_or(StatusCode::OK);
		*response.headers_mut() = self.headers;
		response
	}

	fn commit(&mut self, status: StatusCode, headers: HeaderMap) -> io::Result<()> {
		if self.status.is_some() {
			return Err(io::Error::other("response already committed"));
		}
		self.status = Some(status);
		self.headers = headers;
		Ok(())
	}
}

impl ResponseSink for HttpResponseSink {
	fn send_error(&mut self, status: StatusCode, message: Option<&str>) -> io::Result<()> {
		let body = message
			.map(str::to_string)
			.or_else(|| status.canonical_reason().map(|reason| format!("{reason}\n")))
			.unwrap_or_default();

		let mut headers = HeaderMap::new();
		headers.insert(
			CONTENT_TYPE,
			HeaderValue::from_static("text/plain; charset=utf-8"),
		);
		headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
		self.commit(status, headers)?;
		self.body.extend_from_slice(body.as_bytes());
		Ok(())
	}

	fn send_redirect(&mut self, location: &str) -> io::Result<()> {
		let location = HeaderValue::from_str(location)
			.map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

		let mut headers = HeaderMap::new();
		headers.insert(LOCATION, location);
		headers.insert(CONTENT_LENGTH, HeaderValue::from(0usize));
		self.commit(StatusCode::FOUND, headers)
	}

	fn send_headers(&mut self, status: StatusCode, headers: HeaderMap) -> io::Result<()> {
		self.commit(status, headers)
	}

	fn write_body(&mut self, chunk: &[u8]) -> io::Result<()> {
		if self.status.is_none() {
			return Err(io::Error::other("body written before headers"));
		}
		self.body.extend_from_slice(chunk);
		Ok(())
	}

	fn is_committed(&self) -> bool {
		self.status.is_some()
	}
}
