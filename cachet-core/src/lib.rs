// Core library for cachet
// HTTP cache negotiation: Cache-Control and Expires construction, conditional
// GET evaluation, and per-handler cache defaults

pub mod action;
pub mod cache_control;
pub mod clock;
pub mod conditional;
pub mod config;
pub mod date;
pub mod defaults;
pub mod error;
pub mod expires;
pub mod headers;
pub mod http;
pub mod logging;

// Re-export commonly used types
pub use action::{dispatch, register, Action, ActionContext, ActionResult, CacheState, Halt};
pub use cache_control::{CacheControl, CacheFlag, CacheValue, DirectiveArg};
pub use clock::{Clock, FixedClock, SystemClock};
pub use conditional::{
    ConditionalHeaders, ConditionalRequest, ETag, ETagList, Freshness, Validators,
};
pub use config::{CacheDefaultsConfig, DirectiveConfig, ExpiresConfig};
pub use defaults::{defaults_for, CacheDefaults};
pub use error::{Error, Result};
pub use expires::{Expires, ExpiresAt, ExpiresHeaders};
pub use headers::HeaderMap;
pub use http::{HttpRequest, HttpResponse};
pub use logging::{LogConfig, LogFormat, LogOutput};
