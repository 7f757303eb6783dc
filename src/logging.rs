//! Logging abstraction layer.
//!
//! The router never talks to a logging backend directly. Every record goes
//! through the macros below, which forward to either the
//! [`log`](https://docs.rs/log) or the [`tracing`](https://docs.rs/tracing)
//! crate depending on the enabled feature. Enable at most one of them; with
//! neither enabled the macros expand to nothing.
//!
//! | Feature    | Backend         | Default |
//! |------------|-----------------|---------|
//! | `log`      | `log` crate     | yes     |
//! | `tracing`  | `tracing` crate | no      |
//!
//! All records carry the [`TARGET`] target so applications can filter router
//! output separately (`RUST_LOG=miniapp_navigator=debug`).
//!
//! ```ignore
//! use miniapp_navigator::{debug_log, warn_log};
//!
//! debug_log!("ledger committed: {} entries", len);
//! warn_log!("navigateTo blocked by before-guard");
//! ```

/// Log target shared by every record the crate emits.
pub const TARGET: &str = "miniapp_navigator";

#[doc(hidden)]
#[macro_export]
macro_rules! __log_at {
    ($level:ident, $($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::$level!(target: $crate::logging::TARGET, $($arg)*);
        #[cfg(feature = "log")]
        ::log::$level!(target: $crate::logging::TARGET, $($arg)*);
    };
}

/// State transitions of an in-flight call.
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        $crate::__log_at!(trace, $($arg)*)
    };
}

/// Ledger commits and policy decisions.
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        $crate::__log_at!(debug, $($arg)*)
    };
}

#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        $crate::__log_at!(info, $($arg)*)
    };
}

/// Blocked navigations and abandoned continuations.
#[macro_export]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        $crate::__log_at!(warn, $($arg)*)
    };
}

#[macro_export]
macro_rules! error_log {
    ($($arg:tt)*) => {
        $crate::__log_at!(error, $($arg)*)
    };
}
