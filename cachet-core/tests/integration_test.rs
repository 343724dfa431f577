//! Integration tests for cachet-core.

use async_trait::async_trait;
use cachet_core::conditional::{evaluate, ConditionalHeaders};
use cachet_core::headers::{EXPIRES, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use cachet_core::*;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

const NOW: u64 = 1_700_000_000;

fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

fn context(request: HttpRequest) -> ActionContext {
    ActionContext::with_clock(request, Arc::new(FixedClock::from_unix_secs(NOW)))
}

// =============================================================================
// Header construction
// =============================================================================

#[test]
fn test_cache_control_rendering() {
    let cc = CacheControl::build([
        DirectiveArg::from("public"),
        DirectiveArg::from("must_revalidate"),
        DirectiveArg::values([("max_age", 60)]),
    ])
    .unwrap();
    assert_eq!(cc.to_header_value(), "public, must-revalidate, max-age=60");

    let cc = CacheControl::build([DirectiveArg::values([("s_max_age", 600)])]).unwrap();
    assert_eq!(cc.to_header_value(), "s-maxage=600");
}

#[test]
fn test_unknown_flag_is_rejected() {
    let err = CacheControl::build(["cache_forever"]).unwrap_err();
    assert!(matches!(err, Error::InvalidDirective(_)));
    assert!(err.is_directive_error());
}

#[test]
fn test_expires_rejects_max_age() {
    let clock = FixedClock::from_unix_secs(NOW);
    let err = Expires::build(60u64, [DirectiveArg::values([("max_age", 30)])], &clock).unwrap_err();
    assert!(matches!(err, Error::ConflictingDirective(_)));
}

// =============================================================================
// Conditional GET
// =============================================================================

#[test]
fn test_matching_etag_is_fresh() {
    let headers: HeaderMap = [(IF_NONE_MATCH, "\"abc\"")].into_iter().collect();
    let request = ConditionalHeaders::from_headers(&headers);

    let freshness = evaluate(&request, &Validators::new().etag(ETag::strong("abc"))).unwrap();
    assert!(freshness.is_fresh);
    assert_eq!(freshness.headers.etag(), Some("\"abc\""));
}

#[test]
fn test_mismatched_etag_is_stale() {
    let headers: HeaderMap = [(IF_NONE_MATCH, "\"xyz\"")].into_iter().collect();
    let request = ConditionalHeaders::from_headers(&headers);

    let freshness = evaluate(&request, &Validators::new().etag(ETag::strong("abc"))).unwrap();
    assert!(!freshness.is_fresh);
}

#[test]
fn test_equal_modification_date_is_fresh() {
    let request = HttpRequest::new("GET", "/").with_header(IF_MODIFIED_SINCE, "Tue, 14 Nov 2023 22:13:20 GMT");

    let freshness = request
        .freshness(&Validators::new().last_modified(at(NOW)))
        .unwrap();
    assert!(freshness.is_fresh);
    assert_eq!(
        freshness.headers.get(LAST_MODIFIED),
        Some("Tue, 14 Nov 2023 22:13:20 GMT")
    );
}

#[test]
fn test_no_conditional_headers_is_stale() {
    let request = HttpRequest::new("GET", "/");
    let validators = Validators::new()
        .etag(ETag::strong("abc"))
        .last_modified(at(NOW));

    assert!(!request.freshness(&validators).unwrap().is_fresh);
}

#[test]
fn test_both_validators_must_pass() {
    let request = HttpRequest::new("GET", "/")
        .with_header(IF_NONE_MATCH, "\"abc\"")
        .with_header(IF_MODIFIED_SINCE, "Tue, 14 Nov 2023 22:13:20 GMT");

    let unchanged = Validators::new().etag(ETag::strong("abc")).last_modified(at(NOW));
    assert!(request.freshness(&unchanged).unwrap().is_fresh);

    let modified_later = Validators::new()
        .etag(ETag::strong("abc"))
        .last_modified(at(NOW + 1));
    assert!(!request.freshness(&modified_later).unwrap().is_fresh);
}

// =============================================================================
// Actions
// =============================================================================

struct PublicArticles;

#[async_trait]
impl Action for PublicArticles {
    fn configure(defaults: &CacheDefaults) -> Result<()> {
        defaults.cache_control(["public"])?;
        Ok(())
    }

    async fn call(&self, ctx: &mut ActionContext) -> ActionResult {
        if ctx.request().path == "/private" {
            ctx.cache_control(["private", "no_store"])?;
        }
        ctx.response_mut().body = b"articles".to_vec();
        Ok(())
    }
}

#[tokio::test]
async fn test_per_request_cache_control_overrides_default() {
    let response = dispatch(&PublicArticles, context(HttpRequest::new("GET", "/private")))
        .await
        .unwrap();

    assert_eq!(response.headers.cache_control(), Some("private, no-store"));
}

#[tokio::test]
async fn test_default_cache_control_applies_when_unset() {
    let response = dispatch(&PublicArticles, context(HttpRequest::new("GET", "/articles")))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.headers.cache_control(), Some("public"));
    assert_eq!(response.body, b"articles");
}

struct VersionedDocument;

#[async_trait]
impl Action for VersionedDocument {
    fn configure(defaults: &CacheDefaults) -> Result<()> {
        defaults.expires(Duration::from_secs(60), ["public"])?;
        Ok(())
    }

    async fn call(&self, ctx: &mut ActionContext) -> ActionResult {
        ctx.fresh(&Validators::new().etag(ETag::from_version(7)).last_modified(at(NOW - 3600)))?;
        ctx.response_mut().body = b"document v7".to_vec();
        Ok(())
    }
}

#[tokio::test]
async fn test_fresh_request_gets_304_with_defaults() {
    let etag = ETag::from_version(7).to_header_value();
    let request = HttpRequest::new("GET", "/doc").with_header(IF_NONE_MATCH, etag.clone());

    let response = dispatch(&VersionedDocument, context(request)).await.unwrap();

    assert!(response.is_not_modified());
    assert!(response.body.is_empty());
    assert_eq!(response.headers.etag(), Some(etag.as_str()));
    assert_eq!(response.headers.get(EXPIRES), Some("Tue, 14 Nov 2023 22:14:20 GMT"));
    assert_eq!(response.headers.cache_control(), Some("public, max-age=60"));
}

#[tokio::test]
async fn test_stale_request_gets_full_response() {
    let request = HttpRequest::new("GET", "/doc").with_header(IF_NONE_MATCH, "\"old\"");

    let response = dispatch(&VersionedDocument, context(request)).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"document v7");
    assert_eq!(
        response.headers.get(LAST_MODIFIED),
        Some("Tue, 14 Nov 2023 21:13:20 GMT")
    );
}

struct Misconfigured;

#[async_trait]
impl Action for Misconfigured {
    fn configure(defaults: &CacheDefaults) -> Result<()> {
        defaults.cache_control(["sometimes"])?;
        Ok(())
    }

    async fn call(&self, _ctx: &mut ActionContext) -> ActionResult {
        Ok(())
    }
}

#[tokio::test]
async fn test_misconfigured_action_fails_registration() {
    let err = dispatch(&Misconfigured, context(HttpRequest::new("GET", "/")))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidDirective(_)));
    assert!(!defaults_for::<Misconfigured>().is_configured());
}

struct UnboundedExpiry;

#[async_trait]
impl Action for UnboundedExpiry {
    fn configure(defaults: &CacheDefaults) -> Result<()> {
        defaults.expires(Duration::from_secs(u64::MAX / 2), ["public"])?;
        Ok(())
    }

    async fn call(&self, _ctx: &mut ActionContext) -> ActionResult {
        Ok(())
    }
}

#[test]
fn test_unbounded_expiry_fails_registration() {
    let err = register::<UnboundedExpiry>().unwrap_err();
    assert!(matches!(err, Error::InvalidDate(_)));
    assert!(!defaults_for::<UnboundedExpiry>().is_configured());
    assert!(defaults_for::<UnboundedExpiry>().get_expires().is_none());
}

struct FailingHandler;

#[async_trait]
impl Action for FailingHandler {
    async fn call(&self, ctx: &mut ActionContext) -> ActionResult {
        ctx.expires(60u64, [DirectiveArg::values([("max_age", 60)])])?;
        Ok(())
    }
}

#[tokio::test]
async fn test_handler_error_propagates() {
    let err = dispatch(&FailingHandler, context(HttpRequest::new("GET", "/")))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ConflictingDirective(_)));
}

struct Concurrent;

#[async_trait]
impl Action for Concurrent {
    fn configure(defaults: &CacheDefaults) -> Result<()> {
        defaults.cache_control(["private"])?;
        Ok(())
    }

    async fn call(&self, _ctx: &mut ActionContext) -> ActionResult {
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_defaults() {
    let handles: Vec<_> = (0..16)
        .map(|_| {
            tokio::spawn(async {
                dispatch(&Concurrent, context(HttpRequest::new("GET", "/")))
                    .await
                    .unwrap()
            })
        })
        .collect();

    for handle in handles {
        let response = handle.await.unwrap();
        assert_eq!(response.headers.cache_control(), Some("private"));
    }

    let first = register::<Concurrent>().unwrap();
    assert!(std::ptr::eq(first, defaults_for::<Concurrent>()));
}

// =============================================================================
// Configuration
// =============================================================================

struct Configured;

#[async_trait]
impl Action for Configured {
    fn configure(defaults: &CacheDefaults) -> Result<()> {
        CacheDefaultsConfig::from_toml(
            r#"
            [expires]
            seconds = 3600
            flags = ["public"]
            values = { s_maxage = 60 }
            "#,
        )?
        .apply(defaults)
    }

    async fn call(&self, _ctx: &mut ActionContext) -> ActionResult {
        Ok(())
    }
}

#[tokio::test]
async fn test_defaults_from_configuration() {
    let response = dispatch(&Configured, context(HttpRequest::new("GET", "/")))
        .await
        .unwrap();

    assert_eq!(
        response.headers.cache_control(),
        Some("public, max-age=3600, s-maxage=60")
    );
    assert_eq!(response.headers.expires(), Some("Tue, 14 Nov 2023 23:13:20 GMT"));
}
