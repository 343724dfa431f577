// Cachet - HTTP cache negotiation for request handlers
//
// Builds Cache-Control and Expires headers from declarative directive lists,
// answers conditional GETs with 304 Not Modified, and applies per-handler
// cache defaults at response finalization.

// Re-export core functionality
pub use cachet_core::*;

// Handlers implement `Action` with `#[async_trait]`
pub use async_trait::async_trait;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Action,
        ActionContext,
        ActionResult,
        CacheControl,
        CacheDefaults,
        CacheDefaultsConfig,
        CacheFlag,
        CacheValue,
        Clock,
        ConditionalRequest,
        DirectiveArg,
        ETag,
        Error,
        Expires,
        ExpiresAt,
        Halt,
        HeaderMap,
        HttpRequest,
        HttpResponse,
        Result,
        SystemClock,
        Validators,
        async_trait,
        dispatch,
        register,
    };
}
