//! The host port.
//!
//! The router never performs a page transition itself. It drives an injected
//! [`Host`], which owns the real navigation primitives, the physical page
//! stack, and the interceptor registry. Tests substitute a double.
//!
//! # Interceptor contract
//!
//! When an [`Interceptor`] is registered for an [`Operation`], the host must,
//! for every call of that operation:
//!
//! 1. await [`Interceptor::invoke`] and forward the args it returns; an `Err`
//!    aborts the call and is handed back to the caller unchanged;
//! 2. run the primitive, then call exactly one of [`Interceptor::success`] or
//!    [`Interceptor::fail`];
//! 3. call [`Interceptor::complete`].
//!
//! A primitive failure is returned as
//! [`NavigationError::HostNavigationFailed`] wrapping the host's raw
//! [`HostError`].
//!
//! Calls must be serialized by the host. The router keeps one in-flight slot
//! per operation and does not lock across calls.

use crate::error::{HostError, NavigationError, NavigationResult};
use crate::request::{normalize, BackOptions, NavigationRequest};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The six intercepted host navigation operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    /// Push a page.
    NavigateTo,
    /// Replace the current page.
    RedirectTo,
    /// Close every page and open one.
    ReLaunch,
    /// Switch to a tab page, closing every non-tab page.
    SwitchTab,
    /// Pop pages.
    NavigateBack,
    /// Preload a page without showing it.
    PreloadPage,
}

impl Operation {
    /// Every operation, in registration order.
    pub const ALL: [Operation; 6] = [
        Operation::NavigateTo,
        Operation::RedirectTo,
        Operation::ReLaunch,
        Operation::SwitchTab,
        Operation::NavigateBack,
        Operation::PreloadPage,
    ];

    /// Host-side name of the operation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Operation::NavigateTo => "navigateTo",
            Operation::RedirectTo => "redirectTo",
            Operation::ReLaunch => "reLaunch",
            Operation::SwitchTab => "switchTab",
            Operation::NavigateBack => "navigateBack",
            Operation::PreloadPage => "preloadPage",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = NavigationError;

    fn from_str(name: &str) -> NavigationResult<Self> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == name)
            .ok_or_else(|| {
                NavigationError::invalid_argument(format!("unknown navigation operation: {name}"))
            })
    }
}

/// Arguments of a host navigation call.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationArgs {
    /// Url-based operations (everything except back).
    Target(NavigationRequest),
    /// `navigateBack`.
    Back(BackOptions),
}

impl NavigationArgs {
    pub fn target(&self) -> Option<&NavigationRequest> {
        match self {
            Self::Target(request) => Some(request),
            Self::Back(_) => None,
        }
    }

    pub fn back(&self) -> Option<&BackOptions> {
        match self {
            Self::Back(options) => Some(options),
            Self::Target(_) => None,
        }
    }
}

/// One live page as reported by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageDescriptor {
    /// Page route, usually without a leading `/` (`pages/index`).
    pub route: String,
    /// Query options the page was opened with.
    #[serde(default)]
    pub options: Map<String, Value>,
}

impl PageDescriptor {
    pub fn new(route: impl Into<String>, options: Map<String, Value>) -> Self {
        Self {
            route: route.into(),
            options,
        }
    }

    /// Normalized request that would reopen this page.
    pub fn to_request(&self) -> NavigationRequest {
        let url = if self.route.starts_with('/') {
            self.route.clone()
        } else {
            format!("/{}", self.route)
        };
        normalize(NavigationRequest::new(url).with_query(self.options.clone()))
    }
}

/// Hooks a host runs around an intercepted operation.
pub trait Interceptor: Send + Sync + 'static {
    /// Runs before the primitive. Returns the args to forward, or an error
    /// that aborts the call.
    fn invoke(
        &self,
        op: Operation,
        args: NavigationArgs,
    ) -> BoxFuture<'static, NavigationResult<NavigationArgs>>;

    /// The primitive succeeded.
    fn success(&self, op: Operation);

    /// The primitive failed.
    fn fail(&self, op: Operation, error: &HostError);

    /// Always runs last.
    fn complete(&self, op: Operation);
}

/// Navigation capabilities provided by the surrounding framework.
pub trait Host: Send + Sync + 'static {
    /// Perform `op`, running any registered interceptor around it.
    ///
    /// Errors from [`Interceptor::invoke`] are returned as they are, so a
    /// vetoed call surfaces as [`NavigationError::NavigationBlocked`].
    fn navigate(&self, op: Operation, args: NavigationArgs) -> BoxFuture<'_, NavigationResult<()>>;

    /// The live page stack, bottom first.
    fn current_pages(&self) -> Vec<PageDescriptor>;

    /// Wrap `op` with `interceptor`, replacing any previous one.
    fn add_interceptor(&self, op: Operation, interceptor: Arc<dyn Interceptor>);

    /// Detach the interceptor for `op`, if any.
    fn remove_interceptor(&self, op: Operation);
}
