//! `Expires` header construction.
//!
//! An [`Expires`] pairs an expiry amount with a directive set. Rendering it
//! produces two headers that always agree: `Expires` as an HTTP-date and
//! `Cache-Control` carrying `max-age` merged with the other directives.
//!
//! `max-age` is derived, never supplied. Passing `max_age` yourself is a
//! [`Error::ConflictingDirective`].
//!
//! # Example
//!
//! ```
//! use cachet_core::clock::FixedClock;
//! use cachet_core::expires::Expires;
//! use std::time::Duration;
//!
//! let clock = FixedClock::from_unix_secs(1_700_000_000);
//! let headers = Expires::build(Duration::from_secs(300), ["public"], &clock)?;
//!
//! assert_eq!(headers.expires, "Tue, 14 Nov 2023 22:18:20 GMT");
//! assert_eq!(headers.cache_control, "public, max-age=300");
//! # Ok::<(), cachet_core::Error>(())
//! ```

use crate::cache_control::{CacheControl, CacheValue, DirectiveArg};
use crate::clock::Clock;
use crate::date::{format_http_date, unix_secs, MAX_HTTP_DATE_SECS};
use crate::error::{Error, Result};
use crate::headers::{HeaderMap, CACHE_CONTROL, EXPIRES};
use std::time::{Duration, SystemTime};

/// When a response expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiresAt {
    /// Relative to the moment headers are rendered
    In(Duration),
    /// A fixed point in time
    At(SystemTime),
}

impl ExpiresAt {
    /// Reject amounts that can never be rendered as an HTTP-date.
    pub fn validate(&self) -> Result<()> {
        match *self {
            ExpiresAt::In(amount) if amount.as_secs() > MAX_HTTP_DATE_SECS => {
                Err(Error::InvalidDate(format!(
                    "expiry {}s from now is beyond the HTTP-date range",
                    amount.as_secs()
                )))
            }
            ExpiresAt::At(point) if unix_secs(point).is_none() => Err(Error::InvalidDate(
                format!("{:?} is outside the HTTP-date range", point),
            )),
            _ => Ok(()),
        }
    }

    /// Resolve to the expiry instant and the `max-age` in whole seconds.
    ///
    /// For [`ExpiresAt::In`] the age is the amount itself, so both headers
    /// describe the same lifetime. A point in the past yields an age of 0.
    pub fn resolve(&self, now: SystemTime) -> Result<(SystemTime, u64)> {
        match *self {
            ExpiresAt::In(amount) => {
                let expiry = now.checked_add(amount).ok_or_else(|| {
                    Error::InvalidDate(format!("expiry {}s from now overflows", amount.as_secs()))
                })?;
                Ok((expiry, amount.as_secs()))
            }
            ExpiresAt::At(expiry) => {
                let max_age = expiry
                    .duration_since(now)
                    .map(|remaining| remaining.as_secs())
                    .unwrap_or(0);
                Ok((expiry, max_age))
            }
        }
    }
}

impl From<Duration> for ExpiresAt {
    fn from(amount: Duration) -> Self {
        ExpiresAt::In(amount)
    }
}

impl From<u64> for ExpiresAt {
    fn from(seconds: u64) -> Self {
        ExpiresAt::In(Duration::from_secs(seconds))
    }
}

impl From<SystemTime> for ExpiresAt {
    fn from(point: SystemTime) -> Self {
        ExpiresAt::At(point)
    }
}

/// Rendered `Expires` and `Cache-Control` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiresHeaders {
    pub expires: String,
    pub cache_control: String,
}

impl ExpiresHeaders {
    pub fn into_header_map(self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(EXPIRES, self.expires);
        headers.insert(CACHE_CONTROL, self.cache_control);
        headers
    }
}

/// A validated expiry declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expires {
    amount: ExpiresAt,
    directives: CacheControl,
}

impl Expires {
    /// Validate an amount and a directive list.
    pub fn new<I>(amount: impl Into<ExpiresAt>, args: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<DirectiveArg>,
    {
        Self::with_directives(amount, CacheControl::build(args)?)
    }

    /// Use an already built directive set, which must not carry `max-age`.
    pub fn with_directives(amount: impl Into<ExpiresAt>, directives: CacheControl) -> Result<Self> {
        let amount = amount.into();
        amount.validate()?;

        if directives.get(CacheValue::MaxAge).is_some() {
            return Err(Error::ConflictingDirective(
                "max_age is derived from the expiry amount and cannot be supplied".to_string(),
            ));
        }

        Ok(Self {
            amount,
            directives,
        })
    }

    /// Validate and render in one step.
    pub fn build<I>(amount: impl Into<ExpiresAt>, args: I, clock: &dyn Clock) -> Result<ExpiresHeaders>
    where
        I: IntoIterator,
        I::Item: Into<DirectiveArg>,
    {
        Self::new(amount, args)?.headers(clock)
    }

    pub fn amount(&self) -> ExpiresAt {
        self.amount
    }

    /// Directives other than `max-age`.
    pub fn directives(&self) -> &CacheControl {
        &self.directives
    }

    /// Render headers as of `now`.
    pub fn headers_at(&self, now: SystemTime) -> Result<ExpiresHeaders> {
        let (expiry, max_age) = self.amount.resolve(now)?;
        let cache_control = self.directives.clone().value(CacheValue::MaxAge, max_age);

        Ok(ExpiresHeaders {
            expires: format_http_date(expiry)?,
            cache_control: cache_control.to_header_value(),
        })
    }

    pub fn headers(&self, clock: &dyn Clock) -> Result<ExpiresHeaders> {
        self.headers_at(clock.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    const NOW: u64 = 1_700_000_000;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_relative_expiry() {
        let clock = FixedClock::from_unix_secs(NOW);
        let headers = Expires::build(300u64, Vec::<DirectiveArg>::new(), &clock).unwrap();

        assert_eq!(headers.expires, "Tue, 14 Nov 2023 22:18:20 GMT");
        assert_eq!(headers.cache_control, "max-age=300");
    }

    #[test]
    fn test_max_age_merged_with_directives() {
        let clock = FixedClock::from_unix_secs(NOW);
        let headers = Expires::build(
            Duration::from_secs(60),
            [
                DirectiveArg::from("private"),
                DirectiveArg::from("must_revalidate"),
                DirectiveArg::values([("s_max_age", 30)]),
            ],
            &clock,
        )
        .unwrap();

        assert_eq!(
            headers.cache_control,
            "private, must-revalidate, max-age=60, s-maxage=30"
        );
    }

    #[test]
    fn test_relative_age_ignores_sub_second_clock() {
        let now = at(NOW) + Duration::from_millis(999);
        let expires = Expires::new(300u64, ["public"]).unwrap();
        let headers = expires.headers_at(now).unwrap();

        assert_eq!(headers.cache_control, "public, max-age=300");
        assert_eq!(headers.expires, "Tue, 14 Nov 2023 22:18:20 GMT");
    }

    #[test]
    fn test_absolute_future_expiry() {
        let expires = Expires::new(at(NOW + 3600), ["public"]).unwrap();
        let headers = expires.headers_at(at(NOW) + Duration::from_millis(400)).unwrap();

        assert_eq!(headers.expires, "Tue, 14 Nov 2023 23:13:20 GMT");
        assert_eq!(headers.cache_control, "public, max-age=3599");
    }

    #[test]
    fn test_absolute_past_expiry_is_stale() {
        let expires = Expires::new(at(NOW - 1000), Vec::<DirectiveArg>::new()).unwrap();
        let headers = expires.headers_at(at(NOW)).unwrap();

        assert_eq!(headers.expires, "Tue, 14 Nov 2023 21:56:40 GMT");
        assert_eq!(headers.cache_control, "max-age=0");
    }

    #[test]
    fn test_supplied_max_age_conflicts() {
        let err = Expires::new(300u64, [DirectiveArg::values([("max_age", 100)])]).unwrap_err();
        assert!(matches!(err, Error::ConflictingDirective(_)));

        let err = Expires::with_directives(
            300u64,
            CacheControl::public_max_age(Duration::from_secs(100)),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ConflictingDirective(_)));
    }

    #[test]
    fn test_invalid_directive_propagates() {
        let err = Expires::new(300u64, ["forever"]).unwrap_err();
        assert!(matches!(err, Error::InvalidDirective(_)));
    }

    #[test]
    fn test_unrepresentable_amount_rejected_at_construction() {
        for secs in [u64::MAX, u64::MAX / 2, MAX_HTTP_DATE_SECS + 1] {
            let err = Expires::new(Duration::from_secs(secs), ["public"]).unwrap_err();
            assert!(matches!(err, Error::InvalidDate(_)));
        }

        let err = Expires::new(at(MAX_HTTP_DATE_SECS + 1), ["public"]).unwrap_err();
        assert!(matches!(err, Error::InvalidDate(_)));
        let err = Expires::new(
            SystemTime::UNIX_EPOCH - Duration::from_secs(1),
            Vec::<DirectiveArg>::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidDate(_)));
    }

    #[test]
    fn test_expiry_past_year_9999_fails_to_render() {
        let expires = Expires::new(Duration::from_secs(MAX_HTTP_DATE_SECS), ["public"]).unwrap();
        assert!(matches!(
            expires.headers_at(at(NOW)),
            Err(Error::InvalidDate(_))
        ));
        assert!(expires.headers_at(at(0)).is_ok());
    }

    #[test]
    fn test_into_header_map() {
        let headers = Expires::new(10u64, ["public"])
            .unwrap()
            .headers_at(at(0))
            .unwrap()
            .into_header_map();

        assert_eq!(headers.expires(), Some("Thu, 01 Jan 1970 00:00:10 GMT"));
        assert_eq!(headers.cache_control(), Some("public, max-age=10"));
    }
}
