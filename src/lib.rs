//! # miniapp-navigator
//!
//! Navigation guards and a history ledger for mini-program style hosts.
//!
//! Hosts of this kind expose a handful of page-stack primitives (`navigateTo`,
//! `redirectTo`, `reLaunch`, `switchTab`, `navigateBack`, `preloadPage`), cap
//! the physical page stack at a small depth, and offer no navigation guards.
//! This crate wraps those primitives:
//!
//! - a **before-guard** can veto any navigation, including calls that
//!   application code makes directly against the host;
//! - **after** and **error** callbacks observe outcomes;
//! - a **history ledger** records the logical navigation depth, which keeps
//!   growing after the host's stack limit forces a push into a relaunch, so
//!   that back navigation can still land on the page the user expects.
//!
//! The host is injected through the [`Host`] trait.
//!
//! ```no_run
//! use miniapp_navigator::{before_fn, Host, Router, RouterOptions};
//! use std::sync::Arc;
//!
//! # async fn demo(host: Arc<dyn Host>) -> Result<(), miniapp_navigator::NavigationError> {
//! let router = Router::configure(RouterOptions::new().with_home_page("/pages/home"), host);
//! router.before_each(before_fn(|to, _from, next| {
//!     next.resolve(to.path() != "/pages/locked");
//! }));
//!
//! router.navigate_to("/pages/detail?id=1").await?;
//! router.navigate_back(1).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Feature flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `log` | yes | Log through the `log` crate |
//! | `tracing` | no | Log through the `tracing` crate |

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub mod guards;
pub mod history;
pub mod host;
pub mod logging;
pub mod plugin;
pub mod request;
pub mod router;
pub mod utils;

pub use error::{HostError, NavigationError, NavigationResult};
pub use guards::{
    after_fn, before_fn, error_fn, AfterGuard, BeforeGuard, ErrorGuard, FnAfter, FnBefore,
    FnError, GuardPipeline, Next,
};
pub use history::{History, HistorySnapshot};
pub use host::{Host, Interceptor, NavigationArgs, Operation, PageDescriptor};
pub use plugin::{AttachPoint, Framework, GLOBAL_PROPERTY};
pub use request::{encode_query, normalize, BackOptions, NavigationRequest, NavigationTarget};
pub use router::{
    CallState, LedgerMutation, Navigated, Router, RouterOptions, DEFAULT_MAX_DEPTH,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
