//! Class-level cache defaults.
//!
//! Each handler type owns one [`CacheDefaults`]: at most one `Cache-Control`
//! default and one `Expires` default. A default is fixed by its first
//! declaration; declaring it again is ignored. Defaults live in a
//! process-wide registry keyed by the handler's [`TypeId`] and are shared
//! read-only by every request the handler serves.
//!
//! Defaults are applied at finalize time, and only for header names the
//! request has not already set.

use crate::cache_control::{CacheControl, DirectiveArg};
use crate::error::Result;
use crate::expires::{Expires, ExpiresAt};
use crate::headers::{HeaderMap, CACHE_CONTROL, EXPIRES};
use crate::logging::{debug, trace};
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::time::SystemTime;

/// Construct-once cache defaults for one handler type.
#[derive(Debug, Default)]
pub struct CacheDefaults {
    cache_control: OnceCell<CacheControl>,
    expires: OnceCell<Expires>,
    configured: OnceCell<()>,
}

impl CacheDefaults {
    pub const fn new() -> Self {
        Self {
            cache_control: OnceCell::new(),
            expires: OnceCell::new(),
            configured: OnceCell::new(),
        }
    }

    /// Declare the default `Cache-Control`.
    ///
    /// The directive list is validated even when a default already exists.
    /// Returns `false` if an earlier declaration was kept.
    pub fn cache_control<I>(&self, args: I) -> Result<bool>
    where
        I: IntoIterator,
        I::Item: Into<DirectiveArg>,
    {
        let cache_control = CacheControl::build_header(args)?;
        Ok(self.set_cache_control(cache_control))
    }

    /// An empty directive set is not a default; returns `false`.
    pub fn set_cache_control(&self, cache_control: CacheControl) -> bool {
        if cache_control.is_empty() {
            debug!("Ignored empty default Cache-Control");
            return false;
        }
        let declared = self.cache_control.set(cache_control).is_ok();
        if !declared {
            debug!("Ignored re-declaration of default Cache-Control");
        }
        declared
    }

    /// Declare the default `Expires`. Same rules as [`Self::cache_control`].
    pub fn expires<I>(&self, amount: impl Into<ExpiresAt>, args: I) -> Result<bool>
    where
        I: IntoIterator,
        I::Item: Into<DirectiveArg>,
    {
        let expires = Expires::new(amount, args)?;
        Ok(self.set_expires(expires))
    }

    pub fn set_expires(&self, expires: Expires) -> bool {
        let declared = self.expires.set(expires).is_ok();
        if !declared {
            debug!("Ignored re-declaration of default Expires");
        }
        declared
    }

    pub fn get_cache_control(&self) -> Option<&CacheControl> {
        self.cache_control.get()
    }

    pub fn get_expires(&self) -> Option<&Expires> {
        self.expires.get()
    }

    pub fn is_empty(&self) -> bool {
        self.cache_control.get().is_none() && self.expires.get().is_none()
    }

    /// Run `configure` against these defaults exactly once.
    ///
    /// Concurrent callers block until the first finishes. If it fails the
    /// error is returned and a later call runs `configure` again.
    pub fn configure_once<F>(&self, configure: F) -> Result<()>
    where
        F: FnOnce(&CacheDefaults) -> Result<()>,
    {
        self.configured.get_or_try_init(|| configure(self))?;
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.configured.get().is_some()
    }

    /// Fill in headers the response does not have yet.
    ///
    /// The `Cache-Control` default goes first, then the `Expires` default's
    /// two headers. Nothing present in `headers` is overwritten.
    pub fn apply(&self, headers: &mut HeaderMap, now: SystemTime) -> Result<()> {
        if let Some(cache_control) = self.cache_control.get()
            && headers.insert_if_absent(CACHE_CONTROL, cache_control.to_header_value())
        {
            trace!("Applied default Cache-Control");
        }

        if let Some(expires) = self.expires.get()
            && !(headers.contains(EXPIRES) && headers.contains(CACHE_CONTROL))
        {
            let rendered = expires.headers_at(now)?;
            let expires_set = headers.insert_if_absent(EXPIRES, rendered.expires);
            let cache_control_set = headers.insert_if_absent(CACHE_CONTROL, rendered.cache_control);
            trace!(expires_set, cache_control_set, "Applied default Expires");
        }

        Ok(())
    }
}

// ============================================================================
// Registry
// ============================================================================

static REGISTRY: Lazy<RwLock<HashMap<TypeId, &'static CacheDefaults>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// The defaults owned by handler type `T`, created empty on first lookup.
///
/// The same reference is returned for the life of the process.
pub fn defaults_for<T: ?Sized + 'static>() -> &'static CacheDefaults {
    let id = TypeId::of::<T>();

    if let Some(defaults) = REGISTRY.read().get(&id).copied() {
        return defaults;
    }

    let guard = REGISTRY.upgradable_read();
    if let Some(defaults) = guard.get(&id).copied() {
        return defaults;
    }

    let mut registry = RwLockUpgradableReadGuard::upgrade(guard);
    *registry.entry(id).or_insert_with(|| {
        debug!(handler = type_name::<T>(), "Created cache defaults");
        Box::leak(Box::new(CacheDefaults::new()))
    })
}
