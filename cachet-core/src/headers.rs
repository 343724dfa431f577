//! Inline header storage for cache negotiation.
//!
//! Cache negotiation touches a handful of headers per request: two
//! conditional request headers in, up to four validator/caching headers
//! out. [`HeaderMap`] keeps them inline in a `SmallVec`, with
//! case-insensitive lookup and the merge/overwrite and membership
//! operations the action lifecycle needs.
//!
//! # Example
//!
//! ```rust
//! use cachet_core::headers::{HeaderMap, CACHE_CONTROL};
//!
//! let mut headers = HeaderMap::new();
//! headers.insert(CACHE_CONTROL, "private, no-cache");
//!
//! assert_eq!(headers.get("cache-control"), Some("private, no-cache"));
//! assert!(!headers.insert_if_absent(CACHE_CONTROL, "public"));
//! ```

use smallvec::SmallVec;
use std::fmt;

/// `Cache-Control` response header.
pub const CACHE_CONTROL: &str = "Cache-Control";
/// `Expires` response header.
pub const EXPIRES: &str = "Expires";
/// `ETag` response header.
pub const ETAG: &str = "ETag";
/// `Last-Modified` response header.
pub const LAST_MODIFIED: &str = "Last-Modified";
/// `If-None-Match` request header.
pub const IF_NONE_MATCH: &str = "If-None-Match";
/// `If-Modified-Since` request header.
pub const IF_MODIFIED_SINCE: &str = "If-Modified-Since";

/// Number of headers stored inline before spilling to the heap.
pub const INLINE_HEADERS: usize = 8;

/// A header name-value pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Header {
    /// Header name as first inserted (lookup is case-insensitive)
    pub name: String,
    /// Header value
    pub value: String,
}

impl Header {
    #[inline]
    pub fn name_eq(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

/// A compact, case-insensitive header map.
///
/// One value per name: [`insert`](Self::insert) overwrites, which is the
/// last-write-wins behavior per-request cache helpers rely on.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    inner: SmallVec<[Header; INLINE_HEADERS]>,
}

impl HeaderMap {
    #[inline]
    pub const fn new() -> Self {
        Self {
            inner: SmallVec::new_const(),
        }
    }

    /// Check if storage is inline (no heap allocation).
    #[inline]
    pub fn is_inline(&self) -> bool {
        !self.inner.spilled()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Get header value by name (case-insensitive).
    #[inline]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|h| h.name_eq(name))
            .map(|h| h.value.as_str())
    }

    /// Check if header exists (case-insensitive).
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.iter().any(|h| h.name_eq(name))
    }

    /// Insert a header, replacing any existing header with same name.
    ///
    /// Returns the old value if replaced.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();

        for h in &mut self.inner {
            if h.name_eq(&name) {
                return Some(std::mem::replace(&mut h.value, value));
            }
        }

        self.inner.push(Header { name, value });
        None
    }

    /// Insert a header only when no header with that name is present.
    ///
    /// Returns `true` if the header was inserted.
    pub fn insert_if_absent(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.inner.push(Header {
            name,
            value: value.into(),
        });
        true
    }

    /// Merge another map into this one, overwriting on name collisions.
    pub fn merge(&mut self, other: HeaderMap) {
        for header in other.inner {
            self.insert(header.name, header.value);
        }
    }

    /// Remove a header by name (case-insensitive).
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self.inner.iter().position(|h| h.name_eq(name))?;
        Some(self.inner.remove(pos).value)
    }

    /// Iterate over all headers in insertion order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .iter()
            .map(|h| (h.name.as_str(), h.value.as_str()))
    }

    #[inline]
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    // ========================================================================
    // Cache Header Accessors
    // ========================================================================

    #[inline]
    pub fn cache_control(&self) -> Option<&str> {
        self.get(CACHE_CONTROL)
    }

    #[inline]
    pub fn expires(&self) -> Option<&str> {
        self.get(EXPIRES)
    }

    #[inline]
    pub fn etag(&self) -> Option<&str> {
        self.get(ETAG)
    }

    #[inline]
    pub fn last_modified(&self) -> Option<&str> {
        self.get(LAST_MODIFIED)
    }
}

impl fmt::Debug for HeaderMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.inner.iter().map(|h| (&h.name, &h.value)))
            .finish()
    }
}

impl<K, V> FromIterator<(K, V)> for HeaderMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = HeaderMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl IntoIterator for HeaderMap {
    type Item = (String, String);
    type IntoIter = std::iter::Map<
        smallvec::IntoIter<[Header; INLINE_HEADERS]>,
        fn(Header) -> (String, String),
    >;

    fn into_iter(self) -> Self::IntoIter {
        fn into_pair(h: Header) -> (String, String) {
            (h.name, h.value)
        }
        self.inner
            .into_iter()
            .map(into_pair as fn(Header) -> (String, String))
    }
}
