//! Request validators for conditional GET

use http::HeaderMap;
use http::header::{IF_MODIFIED_SINCE, IF_NONE_MATCH};
use reinhardt_bundles_cache::CacheEntry;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// What the requester already holds in its own cache
///
/// Entity tags are compared against both the entry's ETag and its content
/// hash. The modification date is only consulted when no entity tag was sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestValidators {
	entity_tags: Option<Vec<String>>,
	modified_since: Option<SystemTime>,
}

impl RequestValidators {
	/// No validators: the requester holds nothing.
	pub fn none() -> Self {
		Self::default()
	}

	/// Reads `If-None-Match` and `If-Modified-Since`
	///
	/// Unparsable values are ignored.
	///
	/// # Example
	///
	/// ```rust
	/// use http::HeaderMap;
	/// use http::header::IF_NONE_MATCH;
	/// use reinhardt_bundles_server::RequestValidators;
	///
	/// let mut headers = HeaderMap::new();
	/// headers.insert(IF_NONE_MATCH, "W/\"abc\", \"def\"".parse().unwrap());
	///
	/// let validators = RequestValidators::from_headers(&headers);
	/// assert_eq!(validators.entity_tags(), Some(&["abc".to_string(), "def".to_string()][..]));
	/// ```
	pub fn from_headers(headers: &HeaderMap) -> Self {
		let entity_tags = headers
			.get_all(IF_NONE_MATCH)
			.iter()
			.filter_map(|value| value.to_str().ok())
			.flat_map(|value| value.split(','))
			.map(parse_entity_tag)
			.filter(|tag| !tag.is_empty())
			.collect::<Vec<_>>();

		let modified_since = headers
			.get(IF_MODIFIED_SINCE)
			.and_then(|value| value.to_str().ok())
			.and_then(|value| httpdate::parse_http_date(value).ok());

		Self {
			entity_tags: (!entity_tags.is_empty()).then_some(entity_tags),
			modified_since,
		}
	}

	/// Adds an entity tag.
	pub fn with_entity_tag(mut self, tag: &str) -> Self {
		self.entity_tags
			.get_or_insert_with(Vec::new)
			.push(parse_entity_tag(tag));
		self
	}

	/// Sets the modification date the requester's copy has.
	pub fn with_modified_since(mut self, time: SystemTime) -> Self {
		self.modified_since = Some(time);
		self
	}

	/// Entity tags, unquoted and without weak prefix.
	pub fn entity_tags(&self) -> Option<&[String]> {
		self.entity_tags.as_deref()
	}

	/// Modification date of the requester's copy.
	pub fn modified_since(&self) -> Option<SystemTime> {
		self.modified_since
	}

	/// Whether the requester sent nothing to compare.
	pub fn is_empty(&self) -> bool {
		self.entity_tags.is_none() && self.modified_since.is_none()
	}

	/// Whether the requester's copy of `entry` is still current
	///
	/// Always `false` for "not found" placeholders.
	pub fn matches(&self, entry: &CacheEntry) -> bool {
		let Some(file) = entry.file() else {
			return false;
		};

		if let Some(tags) = &self.entity_tags {
			return tags
				.iter()
				.any(|tag| tag == "*" || *tag == file.etag || *tag == file.content_hash);
		}

		if let Some(since) = self.modified_since {
			return truncate_to_seconds(file.content_timestamp) <= since;
		}

		false
	}
}

fn parse_entity_tag(raw: &str) -> String {
	let tag = raw.trim();
	let tag = tag.strip_prefix("W/").unwrap_or(tag);
	tag.trim_matches('"').to_string()
}

/// HTTP dates carry whole seconds only.
pub(crate) fn truncate_to_seconds(time: SystemTime) -> SystemTime {
	match time.duration_since(UNIX_EPOCH) {
		Ok(elapsed) => UNIX_EPOCH + Duration::from_secs(elapsed.as_secs()),
		Err(_) => time,
	}
}
