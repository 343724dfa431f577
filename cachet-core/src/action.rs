// Request handlers with cache negotiation

use crate::cache_control::{CacheControl, DirectiveArg};
use crate::clock::{Clock, SystemClock};
use crate::conditional::{ConditionalHeaders, Freshness, Validators};
use crate::defaults::{defaults_for, CacheDefaults};
use crate::error::{Error, Result};
use crate::expires::{Expires, ExpiresAt};
use crate::headers::{HeaderMap, CACHE_CONTROL};
use crate::http::{HttpRequest, HttpResponse};
use crate::logging::{debug, trace};
use async_trait::async_trait;
use std::any::type_name;
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;

/// Where a request is in its cache-header lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// No cache helper has run
    Unset,
    /// `cache_control`, `expires` or `fresh` wrote headers
    PerRequestSet,
    /// Class defaults applied; headers are final
    Finalized,
}

/// Early termination of a handler.
///
/// Returned, not raised: a handler stops by returning `Err(Halt)` and the
/// caller turns it into a response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Halt {
    /// Answer with this status and an empty body
    #[error("halted with status {0}")]
    Status(u16),

    #[error(transparent)]
    Failed(#[from] Error),
}

impl Halt {
    pub fn status(&self) -> Option<u16> {
        match self {
            Halt::Status(status) => Some(*status),
            Halt::Failed(_) => None,
        }
    }
}

/// What a handler returns: carry on to the response, or stop early.
pub type ActionResult = std::result::Result<(), Halt>;

/// Per-request state handed to an [`Action`].
#[derive(Debug)]
pub struct ActionContext {
    request: HttpRequest,
    response: HttpResponse,
    clock: Arc<dyn Clock>,
    state: CacheState,
}

impl ActionContext {
    pub fn new(request: HttpRequest) -> Self {
        Self::with_clock(request, Arc::new(SystemClock))
    }

    pub fn with_clock(request: HttpRequest, clock: Arc<dyn Clock>) -> Self {
        Self {
            request,
            response: HttpResponse::ok(),
            clock,
            state: CacheState::Unset,
        }
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    pub fn response(&self) -> &HttpResponse {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut HttpResponse {
        &mut self.response
    }

    /// Response headers written so far.
    pub fn headers(&self) -> &HeaderMap {
        &self.response.headers
    }

    pub fn state(&self) -> CacheState {
        self.state
    }

    pub fn now(&self) -> SystemTime {
        self.clock.now()
    }

    fn mark_set(&mut self) {
        if self.state == CacheState::Unset {
            self.state = CacheState::PerRequestSet;
        }
    }

    /// Set `Cache-Control` for this response, replacing any earlier value.
    pub fn cache_control<I>(&mut self, args: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<DirectiveArg>,
    {
        let cache_control = CacheControl::build_header(args)?;
        self.set_cache_control(&cache_control);
        Ok(())
    }

    /// An empty directive set writes nothing and leaves the class default
    /// in place.
    pub fn set_cache_control(&mut self, cache_control: &CacheControl) {
        if cache_control.is_empty() {
            debug!("Skipped empty Cache-Control");
            return;
        }
        self.response
            .headers
            .insert(CACHE_CONTROL, cache_control.to_header_value());
        self.mark_set();
    }

    /// Set `Expires` and the matching `Cache-Control` for this response.
    pub fn expires<I>(&mut self, amount: impl Into<ExpiresAt>, args: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<DirectiveArg>,
    {
        let expires = Expires::new(amount, args)?;
        self.set_expires(&expires)
    }

    pub fn set_expires(&mut self, expires: &Expires) -> Result<()> {
        let rendered = expires.headers(self.clock.as_ref())?;
        self.response.headers.merge(rendered.into_header_map());
        self.mark_set();
        Ok(())
    }

    /// Evaluate the request's conditional headers without halting.
    ///
    /// Validator headers are written to the response either way.
    pub fn freshness(&mut self, validators: &Validators) -> Result<Freshness> {
        let freshness = ConditionalHeaders::from_request(&self.request).evaluate(validators)?;
        self.response.headers.merge(freshness.headers.clone());
        self.mark_set();
        Ok(freshness)
    }

    /// Conditional GET: write `ETag`/`Last-Modified`, and halt with 304
    /// when the client's copy is still valid.
    ///
    /// ```
    /// use cachet_core::action::{ActionContext, Halt};
    /// use cachet_core::conditional::{ETag, Validators};
    /// use cachet_core::HttpRequest;
    ///
    /// let request = HttpRequest::new("GET", "/articles/1").with_header("If-None-Match", "\"v1\"");
    /// let mut ctx = ActionContext::new(request);
    ///
    /// let outcome = ctx.fresh(&Validators::new().etag(ETag::strong("v1")));
    /// assert_eq!(outcome, Err(Halt::Status(304)));
    /// assert_eq!(ctx.headers().etag(), Some("\"v1\""));
    /// ```
    pub fn fresh(&mut self, validators: &Validators) -> ActionResult {
        if self.freshness(validators)?.is_fresh {
            debug!(path = %self.request.path, "Client copy is fresh, halting with 304");
            return Err(Halt::Status(304));
        }
        Ok(())
    }

    /// Stop the handler with `status`. Use as `return ctx.halt(404);`.
    pub fn halt(&self, status: u16) -> ActionResult {
        Err(Halt::Status(status))
    }

    /// Apply class defaults to headers not yet set. Runs once; later calls
    /// are no-ops.
    pub fn finalize(&mut self, defaults: &CacheDefaults) -> Result<()> {
        if self.state == CacheState::Finalized {
            return Ok(());
        }

        defaults.apply(&mut self.response.headers, self.clock.now())?;
        trace!(previous = ?self.state, "Finalized cache headers");
        self.state = CacheState::Finalized;
        Ok(())
    }

    pub fn into_response(self) -> HttpResponse {
        self.response
    }
}

/// A request handler type with class-level cache defaults.
///
/// # Example
///
/// ```
/// use cachet_core::action::{dispatch, Action, ActionContext, ActionResult};
/// use cachet_core::defaults::CacheDefaults;
/// use cachet_core::{HttpRequest, Result};
/// use async_trait::async_trait;
///
/// struct ShowArticle;
///
/// #[async_trait]
/// impl Action for ShowArticle {
///     fn configure(defaults: &CacheDefaults) -> Result<()> {
///         defaults.cache_control(["public", "must_revalidate"])?;
///         Ok(())
///     }
///
///     async fn call(&self, ctx: &mut ActionContext) -> ActionResult {
///         ctx.response_mut().body = b"article".to_vec();
///         Ok(())
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let ctx = ActionContext::new(HttpRequest::new("GET", "/articles/1"));
/// let response = dispatch(&ShowArticle, ctx).await?;
/// assert_eq!(response.headers.cache_control(), Some("public, must-revalidate"));
/// # Ok::<(), cachet_core::Error>(())
/// # })?;
/// # Ok::<(), cachet_core::Error>(())
/// ```
#[async_trait]
pub trait Action: Send + Sync + 'static {
    /// Declare class-level defaults. Runs once per type, at registration.
    fn configure(_defaults: &CacheDefaults) -> Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }

    async fn call(&self, ctx: &mut ActionContext) -> ActionResult;
}

/// Register `A` and return its defaults, running [`Action::configure`] the
/// first time.
pub fn register<A: Action>() -> Result<&'static CacheDefaults> {
    let defaults = defaults_for::<A>();
    defaults.configure_once(|defaults| {
        debug!(action = type_name::<A>(), "Configuring action cache defaults");
        A::configure(defaults)
    })?;
    Ok(defaults)
}

/// Run `action` against `ctx` and produce the final response.
///
/// A [`Halt::Status`] becomes a response with that status and an empty body.
/// Class defaults are applied after the handler returns, halted or not.
pub async fn dispatch<A: Action>(action: &A, mut ctx: ActionContext) -> Result<HttpResponse> {
    let defaults = register::<A>()?;

    match action.call(&mut ctx).await {
        Ok(()) => {}
        Err(Halt::Status(status)) => {
            ctx.response.status = status;
            ctx.response.body.clear();
        }
        Err(Halt::Failed(err)) => return Err(err),
    }

    ctx.finalize(defaults)?;
    Ok(ctx.into_response())
}
