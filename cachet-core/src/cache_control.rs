//! `Cache-Control` header construction.
//!
//! Directives come in two kinds:
//!
//! - **Flags** ([`CacheFlag`]): `public`, `private`, `no-cache`, `no-store`,
//!   `must-revalidate`, `proxy-revalidate`
//! - **Values** ([`CacheValue`]): `max-age`, `s-maxage`, `min-stale`, each
//!   bound to a number of seconds
//!
//! Only this RFC 2616 set is recognized. Anything else is rejected with
//! [`Error::InvalidDirective`] instead of being passed through.
//!
//! # Rendering
//!
//! Flags render first, in the order they were added, followed by value
//! directives in the fixed order `max-age`, `s-maxage`, `min-stale`.
//!
//! # Examples
//!
//! ## From handler symbols
//!
//! ```
//! use cachet_core::cache_control::{CacheControl, DirectiveArg};
//!
//! let cc = CacheControl::build([
//!     DirectiveArg::from("public"),
//!     DirectiveArg::from("must_revalidate"),
//!     DirectiveArg::values([("s_max_age", 600), ("max_age", 60)]),
//! ])?;
//!
//! assert_eq!(cc.to_header_value(), "public, must-revalidate, max-age=60, s-maxage=600");
//! # Ok::<(), cachet_core::Error>(())
//! ```
//!
//! ## Typed builder
//!
//! ```
//! use cachet_core::cache_control::CacheControl;
//! use std::time::Duration;
//!
//! let cc = CacheControl::new()
//!     .private()
//!     .max_age(Duration::from_secs(300));
//!
//! assert_eq!(cc.to_string(), "private, max-age=300");
//! ```

use crate::error::{Error, Result};
use crate::logging::debug;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Directive Names
// ============================================================================

/// A bare `Cache-Control` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheFlag {
    /// Response may be stored by any cache
    Public,
    /// Response is for a single user; shared caches must not store it
    Private,
    /// Response must be revalidated before every reuse
    NoCache,
    /// Response must not be stored at all
    NoStore,
    /// Stale responses must be revalidated
    MustRevalidate,
    /// Stale responses must be revalidated by shared caches
    ProxyRevalidate,
}

impl CacheFlag {
    pub const ALL: [CacheFlag; 6] = [
        CacheFlag::Public,
        CacheFlag::Private,
        CacheFlag::NoCache,
        CacheFlag::NoStore,
        CacheFlag::MustRevalidate,
        CacheFlag::ProxyRevalidate,
    ];

    /// Header token for this flag.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheFlag::Public => "public",
            CacheFlag::Private => "private",
            CacheFlag::NoCache => "no-cache",
            CacheFlag::NoStore => "no-store",
            CacheFlag::MustRevalidate => "must-revalidate",
            CacheFlag::ProxyRevalidate => "proxy-revalidate",
        }
    }
}

impl FromStr for CacheFlag {
    type Err = Error;

    /// Accepts the symbol form (`no_cache`) and the header token (`no-cache`).
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "public" => Ok(CacheFlag::Public),
            "private" => Ok(CacheFlag::Private),
            "no-cache" => Ok(CacheFlag::NoCache),
            "no-store" => Ok(CacheFlag::NoStore),
            "must-revalidate" => Ok(CacheFlag::MustRevalidate),
            "proxy-revalidate" => Ok(CacheFlag::ProxyRevalidate),
            _ => Err(Error::InvalidDirective(format!(
                "unknown cache-control flag `{}`",
                s.trim()
            ))),
        }
    }
}

impl fmt::Display for CacheFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `Cache-Control` directive bound to a number of seconds.
///
/// The derived ordering is the rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CacheValue {
    /// Maximum time the response is fresh
    MaxAge,
    /// Maximum time a shared cache considers the response fresh
    SMaxAge,
    /// Staleness the client is willing to accept
    MinStale,
}

impl CacheValue {
    /// Header token for this directive.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheValue::MaxAge => "max-age",
            CacheValue::SMaxAge => "s-maxage",
            CacheValue::MinStale => "min-stale",
        }
    }
}

impl FromStr for CacheValue {
    type Err = Error;

    /// Accepts `max_age`, `s_maxage`, `s_max_age`, `min_stale` and their
    /// hyphenated header tokens.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "max-age" => Ok(CacheValue::MaxAge),
            "s-maxage" | "s-max-age" => Ok(CacheValue::SMaxAge),
            "min-stale" => Ok(CacheValue::MinStale),
            _ => Err(Error::InvalidDirective(format!(
                "unknown cache-control value directive `{}`",
                s.trim()
            ))),
        }
    }
}

impl fmt::Display for CacheValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Untyped Arguments
// ============================================================================

/// One element of a handler's directive list: a flag symbol, or a mapping
/// of value-directive keys to seconds.
///
/// Seconds are signed so that negative input can be rejected with
/// [`Error::InvalidDirective`] rather than failing to type-check at the
/// call site of a configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveArg {
    Flag(String),
    Values(Vec<(String, i64)>),
}

impl DirectiveArg {
    /// Build a value mapping from `(key, seconds)` pairs.
    pub fn values<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, i64)>,
        K: Into<String>,
    {
        DirectiveArg::Values(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<&str> for DirectiveArg {
    fn from(flag: &str) -> Self {
        DirectiveArg::Flag(flag.to_string())
    }
}

impl From<String> for DirectiveArg {
    fn from(flag: String) -> Self {
        DirectiveArg::Flag(flag)
    }
}

impl From<CacheFlag> for DirectiveArg {
    fn from(flag: CacheFlag) -> Self {
        DirectiveArg::Flag(flag.as_str().to_string())
    }
}

impl<K: Into<String>, const N: usize> From<[(K, i64); N]> for DirectiveArg {
    fn from(pairs: [(K, i64); N]) -> Self {
        DirectiveArg::values(pairs)
    }
}

fn checked_seconds(key: CacheValue, seconds: i64) -> Result<u64> {
    u64::try_from(seconds).map_err(|_| {
        Error::InvalidDirective(format!(
            "`{}` must be a non-negative number of seconds, got {}",
            key, seconds
        ))
    })
}

// ============================================================================
// Cache-Control Header
// ============================================================================

/// A validated set of `Cache-Control` directives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheControl {
    flags: Vec<CacheFlag>,
    values: BTreeMap<CacheValue, u64>,
}

impl CacheControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a handler's directive list.
    ///
    /// Flags keep their order; a later mapping entry for the same key
    /// replaces an earlier one.
    pub fn build<I>(args: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<DirectiveArg>,
    {
        let mut cache_control = Self::new();

        for arg in args {
            match arg.into() {
                DirectiveArg::Flag(name) => {
                    let flag = name.parse::<CacheFlag>().inspect_err(|_| {
                        debug!(directive = %name, "Rejected cache-control flag");
                    })?;
                    cache_control.push_flag(flag);
                }
                DirectiveArg::Values(pairs) => {
                    for (name, seconds) in pairs {
                        let key = name.parse::<CacheValue>().inspect_err(|_| {
                            debug!(directive = %name, "Rejected cache-control value directive");
                        })?;
                        let seconds = checked_seconds(key, seconds)?;
                        cache_control.values.insert(key, seconds);
                    }
                }
            }
        }

        Ok(cache_control)
    }

    /// Like [`Self::build`], for a standalone `Cache-Control` header.
    ///
    /// An empty list has no header representation and is an
    /// [`Error::InvalidDirective`].
    pub fn build_header<I>(args: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<DirectiveArg>,
    {
        let cache_control = Self::build(args)?;
        if cache_control.is_empty() {
            return Err(Error::InvalidDirective(
                "Cache-Control needs at least one directive".to_string(),
            ));
        }
        Ok(cache_control)
    }

    /// Parse a `Cache-Control` header value in the recognized directive set.
    ///
    /// ```
    /// use cachet_core::cache_control::{CacheControl, CacheFlag, CacheValue};
    ///
    /// let cc = CacheControl::parse("private, max-age=0, no-cache")?;
    /// assert!(cc.has_flag(CacheFlag::NoCache));
    /// assert_eq!(cc.get(CacheValue::MaxAge), Some(0));
    ///
    /// assert!(CacheControl::parse("immutable").is_err());
    /// # Ok::<(), cachet_core::Error>(())
    /// ```
    pub fn parse(header: &str) -> Result<Self> {
        let mut cache_control = Self::new();

        for token in header.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token.split_once('=') {
                Some((name, raw)) => {
                    let key = name.parse::<CacheValue>()?;
                    let seconds = raw.trim().trim_matches('"').parse::<i64>().map_err(|_| {
                        Error::InvalidDirective(format!(
                            "`{}` expects an integer number of seconds, got `{}`",
                            key,
                            raw.trim()
                        ))
                    })?;
                    let seconds = checked_seconds(key, seconds)?;
                    cache_control.values.insert(key, seconds);
                }
                None => {
                    let flag = token.parse::<CacheFlag>()?;
                    cache_control.push_flag(flag);
                }
            }
        }

        Ok(cache_control)
    }

    /// Render the header value.
    pub fn to_header_value(&self) -> String {
        self.flags
            .iter()
            .map(|flag| flag.as_str().to_string())
            .chain(
                self.values
                    .iter()
                    .map(|(key, seconds)| format!("{}={}", key, seconds)),
            )
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn push_flag(&mut self, flag: CacheFlag) {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
    }

    // ==================== Builder Methods ====================

    /// Add a flag. Adding a flag twice keeps its first position.
    pub fn flag(mut self, flag: CacheFlag) -> Self {
        self.push_flag(flag);
        self
    }

    /// Set a value directive, replacing any previous value.
    pub fn value(mut self, key: CacheValue, seconds: u64) -> Self {
        self.values.insert(key, seconds);
        self
    }

    pub fn public(self) -> Self {
        self.flag(CacheFlag::Public)
    }

    pub fn private(self) -> Self {
        self.flag(CacheFlag::Private)
    }

    pub fn no_cache(self) -> Self {
        self.flag(CacheFlag::NoCache)
    }

    pub fn no_store(self) -> Self {
        self.flag(CacheFlag::NoStore)
    }

    pub fn must_revalidate(self) -> Self {
        self.flag(CacheFlag::MustRevalidate)
    }

    pub fn proxy_revalidate(self) -> Self {
        self.flag(CacheFlag::ProxyRevalidate)
    }

    pub fn max_age(self, duration: Duration) -> Self {
        self.value(CacheValue::MaxAge, duration.as_secs())
    }

    pub fn s_maxage(self, duration: Duration) -> Self {
        self.value(CacheValue::SMaxAge, duration.as_secs())
    }

    pub fn min_stale(self, duration: Duration) -> Self {
        self.value(CacheValue::MinStale, duration.as_secs())
    }

    // ==================== Query Methods ====================

    pub fn has_flag(&self, flag: CacheFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Seconds bound to a value directive.
    pub fn get(&self, key: CacheValue) -> Option<u64> {
        self.values.get(&key).copied()
    }

    /// Flags in insertion order.
    pub fn flags(&self) -> &[CacheFlag] {
        &self.flags
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty() && self.values.is_empty()
    }

    // ==================== Preset Configurations ====================

    /// `no-store, no-cache`
    pub fn never() -> Self {
        Self::new().no_store().no_cache()
    }

    pub fn public_max_age(duration: Duration) -> Self {
        Self::new().public().max_age(duration)
    }

    pub fn private_max_age(duration: Duration) -> Self {
        Self::new().private().max_age(duration)
    }
}

impl fmt::Display for CacheControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header_value())
    }
}

impl FromStr for CacheControl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// ============================================================================
// Tests
// ============================================================================
