//! Framework installation.
//!
//! Installing the router makes it reachable from every page component as the
//! `$Router` global property and seeds the history ledger from the host's
//! current page stack. Where the property lives depends on the framework's
//! major version: version 2 frameworks expose it on the component prototype,
//! version 3 and later on `config.globalProperties`.

use crate::info_log;
use crate::router::Router;

/// Property name the router is published under.
pub const GLOBAL_PROPERTY: &str = "$Router";

/// Where a framework keeps app-wide component properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachPoint {
    /// `Framework.prototype` (major version < 3).
    Prototype,
    /// `app.config.globalProperties` (major version >= 3).
    GlobalProperties,
}

impl AttachPoint {
    /// Pick the attach point for a framework version string such as `"2.6.14"`.
    ///
    /// Versions whose major component does not parse are treated as current.
    pub fn for_version(version: &str) -> Self {
        let major = version
            .split('.')
            .next()
            .and_then(|major| major.trim().parse::<u32>().ok());
        match major {
            Some(major) if major < 3 => Self::Prototype,
            _ => Self::GlobalProperties,
        }
    }
}

/// The UI framework the router is installed into.
pub trait Framework {
    /// Framework version string.
    fn version(&self) -> &str;

    /// Publish `router` under `name` at `point`.
    fn attach(&mut self, point: AttachPoint, name: &'static str, router: Router);
}

impl Router {
    /// Publish this router on `framework` and seed the history ledger.
    pub fn install<F: Framework + ?Sized>(&self, framework: &mut F) -> AttachPoint {
        let point = AttachPoint::for_version(framework.version());
        framework.attach(point, GLOBAL_PROPERTY, self.clone());
        self.seed_history();
        info_log!(
            "Router {} installed on framework {} ({:?})",
            self.version(),
            framework.version(),
            point
        );
        point
    }
}
