//! Navigation guards.
//!
//! An application can hook three points of every navigation:
//!
//! | Hook | Trait | Runs |
//! |------|-------|------|
//! | before | [`BeforeGuard`] | before the host is called; may veto |
//! | after | [`AfterGuard`] | after the host reported success |
//! | error | [`ErrorGuard`] | when a navigation is blocked or fails |
//!
//! At most one of each is active; setting a new one replaces the old.
//!
//! # Continuation
//!
//! A before-guard does not return its decision. It receives a [`Next`]
//! continuation and resolves it, immediately or later from another task:
//!
//! ```
//! use miniapp_navigator::{before_fn, BeforeGuard};
//!
//! let guard = before_fn(|to, _from, next| {
//!     if to.path() == "/pages/admin" {
//!         next.abort();
//!     } else {
//!         next.proceed();
//!     }
//! });
//! # let _ = guard;
//! ```
//!
//! The first resolution wins; later ones are ignored. A guard that drops every
//! clone of its `Next` without resolving it stalls the navigation forever.

use crate::error::NavigationError;
use crate::host::Operation;
use crate::request::NavigationRequest;
use crate::{trace_log, warn_log};
use futures::channel::oneshot;
use parking_lot::Mutex;
use std::sync::Arc;

// ============================================================================
// Guard traits
// ============================================================================

/// Decides whether a navigation may proceed.
pub trait BeforeGuard: Send + Sync + 'static {
    /// Inspect the navigation and resolve `next`.
    fn before(&self, to: &NavigationRequest, from: Option<&NavigationRequest>, next: Next);
}

/// Observes a navigation after the host completed it.
pub trait AfterGuard: Send + Sync + 'static {
    fn after(&self, to: &NavigationRequest, from: Option<&NavigationRequest>);
}

/// Observes blocked and failed navigations.
///
/// The error is still returned to the caller afterwards.
pub trait ErrorGuard: Send + Sync + 'static {
    fn error(
        &self,
        error: &NavigationError,
        to: &NavigationRequest,
        from: Option<&NavigationRequest>,
    );
}

// ============================================================================
// Closure adapters
// ============================================================================

/// Create a before-guard from a closure.
pub const fn before_fn<F>(f: F) -> FnBefore<F>
where
    F: Fn(&NavigationRequest, Option<&NavigationRequest>, Next) + Send + Sync + 'static,
{
    FnBefore { f }
}

/// Before-guard created by [`before_fn`].
pub struct FnBefore<F> {
    f: F,
}

impl<F> BeforeGuard for FnBefore<F>
where
    F: Fn(&NavigationRequest, Option<&NavigationRequest>, Next) + Send + Sync + 'static,
{
    fn before(&self, to: &NavigationRequest, from: Option<&NavigationRequest>, next: Next) {
        (self.f)(to, from, next);
    }
}

/// Create an after-guard from a closure.
pub const fn after_fn<F>(f: F) -> FnAfter<F>
where
    F: Fn(&NavigationRequest, Option<&NavigationRequest>) + Send + Sync + 'static,
{
    FnAfter { f }
}

/// After-guard created by [`after_fn`].
pub struct FnAfter<F> {
    f: F,
}

impl<F> AfterGuard for FnAfter<F>
where
    F: Fn(&NavigationRequest, Option<&NavigationRequest>) + Send + Sync + 'static,
{
    fn after(&self, to: &NavigationRequest, from: Option<&NavigationRequest>) {
        (self.f)(to, from);
    }
}

/// Create an error callback from a closure.
pub const fn error_fn<F>(f: F) -> FnError<F>
where
    F: Fn(&NavigationError, &NavigationRequest, Option<&NavigationRequest>)
        + Send
        + Sync
        + 'static,
{
    FnError { f }
}

/// Error callback created by [`error_fn`].
pub struct FnError<F> {
    f: F,
}

impl<F> ErrorGuard for FnError<F>
where
    F: Fn(&NavigationError, &NavigationRequest, Option<&NavigationRequest>)
        + Send
        + Sync
        + 'static,
{
    fn error(
        &self,
        error: &NavigationError,
        to: &NavigationRequest,
        from: Option<&NavigationRequest>,
    ) {
        (self.f)(error, to, from);
    }
}

// ============================================================================
// Next
// ============================================================================

/// Single-use continuation handed to a [`BeforeGuard`].
///
/// Cloning is allowed; all clones share one resolution.
#[derive(Clone)]
pub struct Next {
    inner: Arc<NextInner>,
}

struct NextInner {
    operation: Operation,
    sender: Mutex<Option<oneshot::Sender<bool>>>,
}

impl Next {
    fn channel(operation: Operation) -> (Self, oneshot::Receiver<bool>) {
        let (tx, rx) = oneshot::channel();
        let next = Self {
            inner: Arc::new(NextInner {
                operation,
                sender: Mutex::new(Some(tx)),
            }),
        };
        (next, rx)
    }

    /// Resolve with an optional signal; `None` means proceed.
    ///
    /// Returns `false` if the continuation had already been resolved.
    pub fn call(&self, signal: Option<bool>) -> bool {
        let allowed = signal.unwrap_or(true);
        let Some(sender) = self.inner.sender.lock().take() else {
            trace_log!(
                "{}: continuation already resolved, ignoring {}",
                self.inner.operation,
                allowed
            );
            return false;
        };
        // The receiver is gone only if the navigation future was dropped.
        let _ = sender.send(allowed);
        true
    }

    /// Allow the navigation.
    pub fn proceed(&self) -> bool {
        self.call(Some(true))
    }

    /// Block the navigation.
    pub fn abort(&self) -> bool {
        self.call(Some(false))
    }

    /// Resolve with an explicit decision.
    pub fn resolve(&self, allowed: bool) -> bool {
        self.call(Some(allowed))
    }

    pub fn is_resolved(&self) -> bool {
        self.inner.sender.lock().is_none()
    }

    /// Operation this continuation belongs to.
    pub fn operation(&self) -> Operation {
        self.inner.operation
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("operation", &self.inner.operation)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

// ============================================================================
// GuardPipeline
// ============================================================================

/// The active before/after/error hooks.
///
/// Cloning is cheap; the router clones the pipeline out of its lock before
/// running a guard so that callbacks can themselves reconfigure the router.
#[derive(Clone, Default)]
pub struct GuardPipeline {
    before: Option<Arc<dyn BeforeGuard>>,
    after: Option<Arc<dyn AfterGuard>>,
    error: Option<Arc<dyn ErrorGuard>>,
}

impl GuardPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_before(&mut self, guard: Option<Arc<dyn BeforeGuard>>) {
        self.before = guard;
    }

    pub fn set_after(&mut self, guard: Option<Arc<dyn AfterGuard>>) {
        self.after = guard;
    }

    pub fn set_error(&mut self, guard: Option<Arc<dyn ErrorGuard>>) {
        self.error = guard;
    }

    pub fn has_before(&self) -> bool {
        self.before.is_some()
    }

    pub fn has_after(&self) -> bool {
        self.after.is_some()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Evaluate the before-guard.
    ///
    /// Resolves to `true` when no guard is set. Otherwise waits for the
    /// guard's first resolution of [`Next`]; if the guard abandons the
    /// continuation the returned future never completes.
    pub async fn run_before(
        &self,
        operation: Operation,
        to: &NavigationRequest,
        from: Option<&NavigationRequest>,
    ) -> bool {
        let Some(guard) = &self.before else {
            return true;
        };

        let (next, decision) = Next::channel(operation);
        guard.before(to, from, next);

        match decision.await {
            Ok(allowed) => {
                trace_log!("{}: before-guard resolved {} for '{}'", operation, allowed, to);
                allowed
            }
            Err(oneshot::Canceled) => {
                warn_log!(
                    "{}: before-guard dropped its continuation for '{}'; navigation stalled",
                    operation,
                    to
                );
                futures::future::pending().await
            }
        }
    }

    /// Run the after-guard, if any.
    pub fn notify_after(&self, to: &NavigationRequest, from: Option<&NavigationRequest>) {
        if let Some(guard) = &self.after {
            guard.after(to, from);
        }
    }

    /// Run the error callback, if any.
    pub fn notify_error(
        &self,
        error: &NavigationError,
        to: &NavigationRequest,
        from: Option<&NavigationRequest>,
    ) {
        if let Some(guard) = &self.error {
            guard.error(error, to, from);
        }
    }
}

impl std::fmt::Debug for GuardPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardPipeline")
            .field("before", &self.has_before())
            .field("after", &self.has_after())
            .field("error", &self.has_error())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
