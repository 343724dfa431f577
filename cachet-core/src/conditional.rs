//! ETag and conditional GET handling.
//!
//! A resource describes itself with [`Validators`] (an entity tag, a
//! modification time, or both). [`evaluate`] turns them into `ETag` /
//! `Last-Modified` response headers and decides whether the client's cached
//! copy is still fresh.
//!
//! # Freshness
//!
//! Two comparisons, each applicable only when the resource supplies the
//! validator *and* the request carries the matching header:
//!
//! - `If-None-Match`: fresh when it lists `*` or the resource's exact tag
//! - `If-Modified-Since`: fresh when the resource was last modified at or
//!   before that date, compared at one-second resolution
//!
//! The resource is fresh when every applicable comparison passes. With no
//! applicable comparison it is never fresh.
//!
//! Evaluation never ends the request. Callers apply the headers and, when
//! fresh, answer 304 with an empty body.
//!
//! # Example
//!
//! ```
//! use cachet_core::conditional::{ConditionalRequest, ETag, Validators};
//! use cachet_core::HttpRequest;
//!
//! let request = HttpRequest::new("GET", "/articles/7").with_header("If-None-Match", "\"v7\"");
//! let validators = Validators::new().etag(ETag::strong("v7"));
//!
//! let freshness = request.freshness(&validators)?;
//! assert!(freshness.is_fresh);
//! assert_eq!(freshness.headers.etag(), Some("\"v7\""));
//! # Ok::<(), cachet_core::Error>(())
//! ```

use crate::date::{format_http_date, parse_http_date, truncate_to_secs};
use crate::error::Result;
use crate::headers::{HeaderMap, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use crate::logging::{debug, trace};
use crate::HttpRequest;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::SystemTime;

// ============================================================================
// ETag
// ============================================================================

/// An HTTP entity tag.
///
/// # Examples
///
/// ```
/// use cachet_core::conditional::ETag;
///
/// assert_eq!(ETag::strong("abc123").to_header_value(), "\"abc123\"");
/// assert_eq!(ETag::weak("abc123").to_header_value(), "W/\"abc123\"");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ETag {
    /// The opaque tag (without quotes)
    pub value: String,
    /// Whether this is a weak tag
    pub weak: bool,
}

impl ETag {
    /// `value` is the opaque tag without quotes and must not contain `"`.
    pub fn strong(value: impl Into<String>) -> Self {
        let value = value.into();
        debug_assert!(!value.contains('"'), "entity tag contains a quote: {value}");
        Self { value, weak: false }
    }

    /// Same constraint as [`Self::strong`].
    pub fn weak(value: impl Into<String>) -> Self {
        let value = value.into();
        debug_assert!(!value.contains('"'), "entity tag contains a quote: {value}");
        Self { value, weak: true }
    }

    /// Parse a single quoted entity tag, e.g. `"abc"` or `W/"abc"`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();

        let (weak, quoted) = match s.strip_prefix("W/").or_else(|| s.strip_prefix("w/")) {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let value = quoted.strip_prefix('"')?.strip_suffix('"')?;
        if value.contains('"') {
            return None;
        }

        Some(Self {
            value: value.to_string(),
            weak,
        })
    }

    /// Derive a strong tag from content bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = DefaultHasher::new();
        data.hash(&mut hasher);
        Self::strong(format!("{:x}", hasher.finish()))
    }

    /// Derive a strong tag from a revision number.
    pub fn from_version(version: u64) -> Self {
        Self::strong(format!("v{}", version))
    }

    /// Quoted header representation.
    pub fn to_header_value(&self) -> String {
        if self.weak {
            format!("W/\"{}\"", self.value)
        } else {
            format!("\"{}\"", self.value)
        }
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header_value())
    }
}

// ============================================================================
// ETag List (If-None-Match)
// ============================================================================

/// Entity tags listed in an `If-None-Match` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ETagList {
    pub etags: Vec<ETag>,
    /// The header was `*`
    pub any: bool,
}

impl ETagList {
    pub fn any() -> Self {
        Self {
            etags: Vec::new(),
            any: true,
        }
    }

    /// Parse a header value. Entries that are not quoted tags are skipped.
    ///
    /// ```
    /// use cachet_core::conditional::ETagList;
    ///
    /// assert_eq!(ETagList::parse("\"a\", W/\"b\", c").etags.len(), 2);
    /// assert!(ETagList::parse(" * ").any);
    /// ```
    pub fn parse(header: &str) -> Self {
        let header = header.trim();
        if header == "*" {
            return Self::any();
        }

        let etags = split_list(header).filter_map(ETag::parse).collect();
        Self { etags, any: false }
    }

    /// `*`, or the exact tag (same text, same weakness).
    pub fn matches(&self, etag: &ETag) -> bool {
        self.any || self.etags.iter().any(|e| e == etag)
    }
}

/// Split a header list on commas outside quoted strings.
fn split_list(header: &str) -> impl Iterator<Item = &str> {
    let mut quoted = false;
    let mut start = 0;
    let mut parts = Vec::new();

    for (i, c) in header.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => {
                parts.push(&header[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&header[start..]);

    parts.into_iter()
}

// ============================================================================
// Validators and Request Headers
// ============================================================================

/// What the handler knows about the resource being served.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validators {
    pub etag: Option<ETag>,
    pub last_modified: Option<SystemTime>,
}

impl Validators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn etag(mut self, etag: ETag) -> Self {
        self.etag = Some(etag);
        self
    }

    pub fn last_modified(mut self, time: SystemTime) -> Self {
        self.last_modified = Some(time);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }
}

/// Parsed conditional request headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionalHeaders {
    pub if_none_match: Option<ETagList>,
    /// `None` when the header is absent or not a valid HTTP-date
    pub if_modified_since: Option<SystemTime>,
}

impl ConditionalHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let if_none_match = headers.get(IF_NONE_MATCH).map(ETagList::parse);

        let if_modified_since = headers.get(IF_MODIFIED_SINCE).and_then(|raw| {
            let parsed = parse_http_date(raw);
            if parsed.is_none() {
                debug!(value = raw, "Ignoring malformed If-Modified-Since");
            }
            parsed
        });

        Self {
            if_none_match,
            if_modified_since,
        }
    }

    pub fn from_request(request: &HttpRequest) -> Self {
        Self::from_headers(&request.headers)
    }

    /// Decide freshness and build validator headers. See [`evaluate`].
    pub fn evaluate(&self, validators: &Validators) -> Result<Freshness> {
        evaluate(self, validators)
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Outcome of a conditional GET evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Freshness {
    /// `ETag` and/or `Last-Modified`, to be merged into the response
    pub headers: HeaderMap,
    /// The client's copy is valid; answer 304
    pub is_fresh: bool,
}

/// Build validator headers and decide freshness.
///
/// Fails only when `last_modified` has no HTTP-date representation.
pub fn evaluate(request: &ConditionalHeaders, validators: &Validators) -> Result<Freshness> {
    let mut headers = HeaderMap::new();

    if let Some(etag) = &validators.etag {
        headers.insert(ETAG, etag.to_header_value());
    }
    if let Some(last_modified) = validators.last_modified {
        headers.insert(LAST_MODIFIED, format_http_date(last_modified)?);
    }

    let by_etag = match (&validators.etag, &request.if_none_match) {
        (Some(etag), Some(list)) => Some(list.matches(etag)),
        _ => None,
    };

    let by_date = match (validators.last_modified, request.if_modified_since) {
        (Some(modified), Some(since)) => Some(truncate_to_secs(modified) <= truncate_to_secs(since)),
        _ => None,
    };

    let is_fresh = match (by_etag, by_date) {
        (None, None) => false,
        (etag, date) => etag.unwrap_or(true) && date.unwrap_or(true),
    };

    trace!(?by_etag, ?by_date, is_fresh, "Evaluated conditional GET");

    Ok(Freshness { headers, is_fresh })
}

// ============================================================================
// Request Extensions
// ============================================================================

/// Conditional GET helpers on [`HttpRequest`].
pub trait ConditionalRequest {
    fn conditional_headers(&self) -> ConditionalHeaders;

    fn freshness(&self, validators: &Validators) -> Result<Freshness>;
}

impl ConditionalRequest for HttpRequest {
    fn conditional_headers(&self) -> ConditionalHeaders {
        ConditionalHeaders::from_request(self)
    }

    fn freshness(&self, validators: &Validators) -> Result<Freshness> {
        self.conditional_headers().evaluate(validators)
    }
}

// ============================================================================
// Tests
// ============================================================================
