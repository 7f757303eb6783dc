//! The interception router.
//!
//! [`Router`] wraps the six host navigation operations. Every call, whether
//! it comes through a router method or straight from application code against
//! the host, goes through the same per-call state machine:
//!
//! ```text
//! PendingGuard ──blocked──▶ Blocked
//!      │
//!   allowed
//!      ▼
//! PendingHost ──success──▶ Committed
//!      └───────fail──────▶ RolledBack
//! ```
//!
//! The history ledger is never touched speculatively. Each call computes a
//! [`LedgerMutation`] up front and applies it only when the host reports
//! success; on failure the ledger is restored from the snapshot taken before
//! the call was issued.
//!
//! # Host depth limit
//!
//! Hosts cap the physical page stack (10 pages by default). A push issued at
//! the cap is silently turned into a relaunch of the same target, while the
//! ledger keeps growing. Back navigation then reconciles the two depths:
//! when the physical stack is too shallow, the router relaunches to the
//! ledger entry the user expects to land on, or to the home page when the
//! ledger is exhausted too.

use crate::error::{HostError, NavigationError, NavigationResult};
use crate::guards::{AfterGuard, BeforeGuard, ErrorGuard, GuardPipeline};
use crate::history::{History, HistorySnapshot};
use crate::host::{Host, Interceptor, NavigationArgs, Operation, PageDescriptor};
use crate::request::{normalize, BackOptions, NavigationRequest, NavigationTarget};
use crate::{debug_log, error_log, info_log, trace_log, warn_log};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Default physical page-stack limit of mini-program hosts.
pub const DEFAULT_MAX_DEPTH: usize = 10;

// ============================================================================
// RouterOptions
// ============================================================================

/// Router configuration.
///
/// ```
/// use miniapp_navigator::RouterOptions;
///
/// let options: RouterOptions = serde_json::from_str(r#"{"homePage": "/pages/home"}"#).unwrap();
/// assert_eq!(options.home_page, "/pages/home");
/// assert_eq!(options.max_depth, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RouterOptions {
    /// Fallback target when back navigation runs out of history.
    pub home_page: String,
    /// Physical page-stack limit of the host.
    pub max_depth: usize,
}

impl RouterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_home_page(mut self, home_page: impl Into<String>) -> Self {
        self.home_page = home_page.into();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            home_page: "/".to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

// ============================================================================
// Call bookkeeping
// ============================================================================

/// Where an in-flight call currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// Waiting for the before-guard.
    PendingGuard,
    /// Issued to the host, outcome unknown.
    PendingHost,
    /// Host succeeded and the ledger mutation was applied.
    Committed,
    /// Host failed and the ledger was restored.
    RolledBack,
    /// The before-guard vetoed the call.
    Blocked,
}

/// Ledger change applied when a call commits.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerMutation {
    Append(NavigationRequest),
    ReplaceLast(NavigationRequest),
    ResetTo(NavigationRequest),
    TruncateLast(usize),
    /// Rebuild the ledger from the host's page stack after the call.
    Reseed,
}

struct InFlight {
    /// Issued by a router method rather than directly against the host.
    internal: bool,
    state: CallState,
    to: NavigationRequest,
    from: Option<NavigationRequest>,
    snapshot: HistorySnapshot,
    mutation: Option<LedgerMutation>,
}

/// A planned navigation: what to ask the host for and what to record.
struct Plan {
    requested: Operation,
    issued: Operation,
    args: NavigationArgs,
    to: NavigationRequest,
    from: Option<NavigationRequest>,
    mutation: Option<LedgerMutation>,
}

/// Outcome of a successful navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct Navigated {
    /// Operation the caller asked for.
    pub operation: Operation,
    /// Operation actually sent to the host (differs after a substitution).
    pub issued: Operation,
    pub to: NavigationRequest,
    pub from: Option<NavigationRequest>,
}

impl Navigated {
    /// `true` when the router replaced the requested operation with a relaunch.
    pub fn was_substituted(&self) -> bool {
        self.operation != self.issued
    }
}

// ============================================================================
// Router
// ============================================================================

/// Navigation guard layer over an injected [`Host`].
///
/// Cloning yields another handle to the same router.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

struct RouterInner {
    options: RouterOptions,
    host: Arc<dyn Host>,
    history: Mutex<History>,
    guards: Mutex<GuardPipeline>,
    in_flight: Mutex<HashMap<Operation, InFlight>>,
}

impl Router {
    /// Create a router with default options.
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self::configure(RouterOptions::default(), host)
    }

    /// Create a router, intercept all six host operations, and seed the
    /// history ledger from the host page stack.
    pub fn configure(mut options: RouterOptions, host: Arc<dyn Host>) -> Self {
        if options.home_page.is_empty() {
            options.home_page = "/".to_string();
        }
        options.max_depth = options.max_depth.max(1);

        let router = Self {
            inner: Arc::new(RouterInner {
                options,
                host,
                history: Mutex::new(History::new()),
                guards: Mutex::new(GuardPipeline::new()),
                in_flight: Mutex::new(HashMap::new()),
            }),
        };
        router.add_interceptors();
        router.seed_history();
        info_log!(
            "Router configured (home '{}', max depth {})",
            router.inner.options.home_page,
            router.inner.options.max_depth
        );
        router
    }

    /// Register the interception around every host operation.
    ///
    /// Called by [`configure`](Self::configure); call it again to re-attach
    /// after [`remove_interceptor`](Self::remove_interceptor).
    pub fn add_interceptors(&self) {
        let interceptor: Arc<dyn Interceptor> = Arc::new(RouterInterceptor {
            router: Arc::downgrade(&self.inner),
        });
        for op in Operation::ALL {
            self.inner.host.add_interceptor(op, Arc::clone(&interceptor));
        }
    }

    /// Detach the interception for one operation, or for all when `None`.
    pub fn remove_interceptor(&self, op: Option<Operation>) {
        match op {
            Some(op) => {
                debug_log!("Removing interceptor for {}", op);
                self.inner.host.remove_interceptor(op);
            }
            None => {
                debug_log!("Removing all interceptors");
                for op in Operation::ALL {
                    self.inner.host.remove_interceptor(op);
                }
            }
        }
    }

    /// Detach by host operation name. Unknown names are ignored; an empty
    /// name detaches everything.
    pub fn remove_interceptor_named(&self, name: &str) {
        if name.is_empty() {
            self.remove_interceptor(None);
        } else if let Ok(op) = name.parse::<Operation>() {
            self.remove_interceptor(Some(op));
        } else {
            trace_log!("No interceptor named '{}'", name);
        }
    }

    // ========================================================================
    // Guards
    // ========================================================================

    /// Set the before-guard, replacing any previous one.
    pub fn before_each(&self, guard: impl BeforeGuard) {
        self.inner.guards.lock().set_before(Some(Arc::new(guard)));
    }

    /// Set the after-guard, replacing any previous one.
    pub fn after_each(&self, guard: impl AfterGuard) {
        self.inner.guards.lock().set_after(Some(Arc::new(guard)));
    }

    /// Set the error callback, replacing any previous one.
    pub fn error(&self, guard: impl ErrorGuard) {
        self.inner.guards.lock().set_error(Some(Arc::new(guard)));
    }

    pub fn clear_before_each(&self) {
        self.inner.guards.lock().set_before(None);
    }

    pub fn clear_after_each(&self) {
        self.inner.guards.lock().set_after(None);
    }

    pub fn clear_error(&self) {
        self.inner.guards.lock().set_error(None);
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Push a page. At the host's depth limit this becomes a relaunch.
    pub async fn navigate_to(
        &self,
        target: impl Into<NavigationTarget>,
    ) -> NavigationResult<Navigated> {
        self.navigate(Operation::NavigateTo, target.into()).await
    }

    /// Replace the current page.
    pub async fn redirect_to(
        &self,
        target: impl Into<NavigationTarget>,
    ) -> NavigationResult<Navigated> {
        self.navigate(Operation::RedirectTo, target.into()).await
    }

    /// Close every page and open `target`.
    pub async fn re_launch(&self, target: impl Into<NavigationTarget>) -> NavigationResult<Navigated> {
        self.navigate(Operation::ReLaunch, target.into()).await
    }

    /// Switch to a tab page.
    pub async fn switch_tab(&self, target: impl Into<NavigationTarget>) -> NavigationResult<Navigated> {
        self.navigate(Operation::SwitchTab, target.into()).await
    }

    /// Preload a page. The ledger is not affected.
    pub async fn preload_page(
        &self,
        target: impl Into<NavigationTarget>,
    ) -> NavigationResult<Navigated> {
        self.navigate(Operation::PreloadPage, target.into()).await
    }

    /// Go back `delta` pages (default 1).
    ///
    /// Resolves to `None` when `delta` is 0.
    pub async fn navigate_back(
        &self,
        options: impl Into<BackOptions>,
    ) -> NavigationResult<Option<Navigated>> {
        let options = options.into();
        if options.delta == 0 {
            trace_log!("navigateBack with delta 0 ignored");
            return Ok(None);
        }
        let plan = self.plan_back(options);
        self.execute(plan).await.map(Some)
    }

    /// Navigate with a dynamic target (`"/path"` or `{url, query, ...}`).
    ///
    /// For [`Operation::NavigateBack`] the value is parsed as back options.
    pub async fn navigate_value(
        &self,
        op: Operation,
        target: serde_json::Value,
    ) -> NavigationResult<Option<Navigated>> {
        if op == Operation::NavigateBack {
            let options = BackOptions::from_value(target)?;
            return self.navigate_back(options).await;
        }
        let target = NavigationTarget::from_value(target)?;
        self.navigate(op, target).await.map(Some)
    }

    /// Single entry point for the url-based operations.
    async fn navigate(&self, op: Operation, target: NavigationTarget) -> NavigationResult<Navigated> {
        let plan = self.plan_target(op, target)?;
        self.execute(plan).await
    }

    fn plan_target(&self, op: Operation, target: NavigationTarget) -> NavigationResult<Plan> {
        if op == Operation::NavigateBack {
            return Err(NavigationError::invalid_argument(
                "navigateBack takes back options, not a page target",
            ));
        }

        let to = target.normalize();
        let pages = self.inner.host.current_pages();
        self.inner.ensure_seeded(&pages);
        let from = pages.last().map(PageDescriptor::to_request);

        let issued = if op == Operation::NavigateTo && pages.len() >= self.inner.options.max_depth {
            debug_log!(
                "Page stack at limit ({}), relaunching to '{}' instead of pushing",
                pages.len(),
                to
            );
            Operation::ReLaunch
        } else {
            op
        };

        Ok(Plan {
            requested: op,
            issued,
            args: NavigationArgs::Target(to.clone()),
            mutation: target_mutation(op, &to),
            to,
            from,
        })
    }

    fn plan_back(&self, options: BackOptions) -> Plan {
        let pages = self.inner.host.current_pages();
        self.inner.ensure_seeded(&pages);
        let from = pages.last().map(PageDescriptor::to_request);

        let delta = options.delta;
        let physical = pages.len();
        let history = self.inner.history.lock().clone();
        let logical = history.len();
        trace_log!(
            "navigateBack delta {} (physical {}, logical {})",
            delta,
            physical,
            logical
        );

        if delta < physical {
            let (to, mutation) = match history.peek_back(delta) {
                Some(entry) => (entry.clone(), LedgerMutation::TruncateLast(delta)),
                None => (
                    pages[physical - 1 - delta].to_request(),
                    LedgerMutation::Reseed,
                ),
            };
            return Plan {
                requested: Operation::NavigateBack,
                issued: Operation::NavigateBack,
                args: NavigationArgs::Back(options),
                to,
                from,
                mutation: Some(mutation),
            };
        }

        let (to, mutation) = match history.peek_back(delta) {
            Some(entry) => {
                debug_log!(
                    "Not enough pages to go back {}, relaunching to ledger entry '{}'",
                    delta,
                    entry
                );
                (entry.clone(), LedgerMutation::TruncateLast(delta))
            }
            None => {
                debug_log!(
                    "History exhausted going back {}, relaunching to home '{}'",
                    delta,
                    self.inner.options.home_page
                );
                (
                    NavigationRequest::new(self.inner.options.home_page.clone()),
                    LedgerMutation::Reseed,
                )
            }
        };

        Plan {
            requested: Operation::NavigateBack,
            issued: Operation::ReLaunch,
            args: NavigationArgs::Target(to.clone()),
            to,
            from,
            mutation: Some(mutation),
        }
    }

    async fn execute(&self, plan: Plan) -> NavigationResult<Navigated> {
        let Plan {
            requested,
            issued,
            args,
            to,
            from,
            mutation,
        } = plan;

        let guards = self.inner.guards.lock().clone();
        trace_log!("{} '{}': {:?}", requested, to, CallState::PendingGuard);
        if !guards.run_before(requested, &to, from.as_ref()).await {
            let err = NavigationError::blocked(requested);
            warn_log!("{} to '{}' blocked by before-guard", requested, to);
            trace_log!("{} '{}': {:?}", requested, to, CallState::Blocked);
            guards.notify_error(&err, &to, from.as_ref());
            return Err(err);
        }

        let snapshot = self.inner.history.lock().snapshot();
        self.inner.in_flight.lock().insert(
            issued,
            InFlight {
                internal: true,
                state: CallState::PendingHost,
                to: to.clone(),
                from: from.clone(),
                snapshot,
                mutation,
            },
        );

        info_log!(
            "{} '{}' → '{}'{}",
            issued,
            from.as_ref().map_or("", |f| f.url.as_str()),
            to,
            if issued == requested {
                String::new()
            } else {
                format!(" (requested {requested})")
            }
        );
        let outcome = self.inner.host.navigate(issued, args).await;

        // Settle here as well; this is a no-op when the host already ran the
        // interceptor hooks.
        match outcome {
            Ok(()) => {
                self.inner.settle_success(issued);
                self.inner.settle_complete(issued);
                Ok(Navigated {
                    operation: requested,
                    issued,
                    to,
                    from,
                })
            }
            Err(err) => {
                self.inner.settle_fail(issued, &err);
                self.inner.settle_complete(issued);
                Err(err)
            }
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Copy of the history ledger.
    pub fn history(&self) -> History {
        self.inner.history.lock().clone()
    }

    /// Seed the ledger from the host if it is empty.
    pub fn seed_history(&self) -> bool {
        let pages = self.inner.host.current_pages();
        self.inner.ensure_seeded(&pages)
    }

    pub fn home_page(&self) -> &str {
        &self.inner.options.home_page
    }

    pub fn max_depth(&self) -> usize {
        self.inner.options.max_depth
    }

    pub fn options(&self) -> &RouterOptions {
        &self.inner.options
    }

    pub fn version(&self) -> &'static str {
        crate::VERSION
    }

    /// State of the call currently in flight for `op`, if any.
    pub fn call_state(&self, op: Operation) -> Option<CallState> {
        self.inner.in_flight.lock().get(&op).map(|call| call.state)
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("options", &self.inner.options)
            .field("history", &*self.inner.history.lock())
            .field("guards", &*self.inner.guards.lock())
            .finish_non_exhaustive()
    }
}

fn target_mutation(op: Operation, to: &NavigationRequest) -> Option<LedgerMutation> {
    match op {
        Operation::NavigateTo => Some(LedgerMutation::Append(to.clone())),
        Operation::RedirectTo => Some(LedgerMutation::ReplaceLast(to.clone())),
        Operation::ReLaunch | Operation::SwitchTab => Some(LedgerMutation::ResetTo(to.clone())),
        Operation::NavigateBack | Operation::PreloadPage => None,
    }
}

// ============================================================================
// Interception
// ============================================================================

impl RouterInner {
    fn ensure_seeded(&self, pages: &[PageDescriptor]) -> bool {
        let seeded = self.history.lock().seed_from_host(pages);
        if seeded {
            debug_log!(
                "History seeded from host page '{}'",
                pages.first().map_or("", |p| p.route.as_str())
            );
        }
        seeded
    }

    /// `invoke` hook: pass router-issued calls through, guard bypass calls.
    ///
    /// For bypass calls `from` is the current top of the host page stack,
    /// the page being left, as for router-issued calls.
    async fn intercept(
        &self,
        op: Operation,
        args: NavigationArgs,
    ) -> NavigationResult<NavigationArgs> {
        if self
            .in_flight
            .lock()
            .get(&op)
            .is_some_and(|call| call.internal)
        {
            trace_log!("{}: router-issued call, forwarding", op);
            return Ok(args);
        }

        let pages = self.host.current_pages();
        self.ensure_seeded(&pages);
        let from = pages.last().map(PageDescriptor::to_request);
        let history = self.history.lock().clone();

        let (to, mutation, forward) = match args {
            NavigationArgs::Target(request) => {
                let to = normalize(request);
                let mutation = target_mutation(op, &to);
                (to.clone(), mutation, NavigationArgs::Target(to))
            }
            NavigationArgs::Back(options) => {
                let delta = options.delta;
                let to = if delta < pages.len() {
                    pages[pages.len() - 1 - delta].to_request()
                } else {
                    history
                        .peek_back(delta)
                        .cloned()
                        .unwrap_or_else(|| NavigationRequest::new(self.options.home_page.clone()))
                };
                let mutation = if delta == 0 {
                    None
                } else if delta >= history.len() {
                    Some(LedgerMutation::Reseed)
                } else {
                    Some(LedgerMutation::TruncateLast(delta))
                };
                (to, mutation, NavigationArgs::Back(options))
            }
        };

        debug_log!("{}: intercepted direct host call to '{}'", op, to);
        self.in_flight.lock().insert(
            op,
            InFlight {
                internal: false,
                state: CallState::PendingGuard,
                to: to.clone(),
                from: from.clone(),
                snapshot: history.snapshot(),
                mutation,
            },
        );

        let guards = self.guards.lock().clone();
        if !guards.run_before(op, &to, from.as_ref()).await {
            self.in_flight.lock().remove(&op);
            let err = NavigationError::blocked(op);
            warn_log!("{} to '{}' blocked by before-guard", op, to);
            guards.notify_error(&err, &to, from.as_ref());
            return Err(err);
        }

        let mut in_flight = self.in_flight.lock();
        if let Some(call) = in_flight.get_mut(&op) {
            call.state = CallState::PendingHost;
            call.snapshot = self.history.lock().snapshot();
        }
        Ok(forward)
    }

    /// `success` hook: commit the scheduled mutation, then notify.
    fn settle_success(&self, op: Operation) {
        let (to, from) = {
            let mut in_flight = self.in_flight.lock();
            let Some(call) = in_flight.get_mut(&op) else {
                return;
            };
            if call.state != CallState::PendingHost {
                return;
            }
            if let Some(mutation) = call.mutation.take() {
                self.apply(mutation, &call.to);
            }
            call.state = CallState::Committed;
            trace_log!("{} '{}': {:?}", op, call.to, CallState::Committed);
            (call.to.clone(), call.from.clone())
        };

        let guards = self.guards.lock().clone();
        guards.notify_after(&to, from.as_ref());
    }

    /// `fail` hook: restore the ledger, then notify.
    fn settle_fail(&self, op: Operation, err: &NavigationError) {
        let (to, from) = {
            let mut in_flight = self.in_flight.lock();
            let Some(call) = in_flight.get_mut(&op) else {
                return;
            };
            if call.state != CallState::PendingHost {
                return;
            }
            self.history.lock().restore(call.snapshot.clone());
            call.mutation = None;
            call.state = CallState::RolledBack;
            trace_log!("{} '{}': {:?}", op, call.to, CallState::RolledBack);
            (call.to.clone(), call.from.clone())
        };

        error_log!("{} to '{}': {}", op, to, err);
        let guards = self.guards.lock().clone();
        guards.notify_error(err, &to, from.as_ref());
    }

    /// `complete` hook: the call is over, drop its slot.
    fn settle_complete(&self, op: Operation) {
        if let Some(call) = self.in_flight.lock().remove(&op) {
            trace_log!("{} complete ({:?})", op, call.state);
        }
    }

    fn apply(&self, mutation: LedgerMutation, to: &NavigationRequest) {
        let reseed_pages = matches!(mutation, LedgerMutation::Reseed).then(|| self.host.current_pages());

        let mut history = self.history.lock();
        match mutation {
            LedgerMutation::Append(entry) => history.append(entry),
            LedgerMutation::ReplaceLast(entry) => history.replace_last(entry),
            LedgerMutation::ResetTo(entry) => history.reset_to(entry),
            LedgerMutation::TruncateLast(n) => history.truncate_last(n),
            LedgerMutation::Reseed => {
                history.clear();
                let pages = reseed_pages.unwrap_or_default();
                if !history.seed_from_host(&pages) {
                    history.reset_to(to.clone());
                }
            }
        }
        debug_log!("History committed: {:?}", history.urls());
    }
}

/// Hooks registered with the host. Holds the router weakly so that the
/// host's interceptor registry does not keep the router alive.
struct RouterInterceptor {
    router: Weak<RouterInner>,
}

impl Interceptor for RouterInterceptor {
    fn invoke(
        &self,
        op: Operation,
        args: NavigationArgs,
    ) -> BoxFuture<'static, NavigationResult<NavigationArgs>> {
        let router = self.router.upgrade();
        Box::pin(async move {
            match router {
                Some(router) => router.intercept(op, args).await,
                None => Ok(args),
            }
        })
    }

    fn success(&self, op: Operation) {
        if let Some(router) = self.router.upgrade() {
            router.settle_success(op);
        }
    }

    fn fail(&self, op: Operation, error: &HostError) {
        if let Some(router) = self.router.upgrade() {
            router.settle_fail(op, &NavigationError::host_failed(op, error.clone()));
        }
    }

    fn complete(&self, op: Operation) {
        if let Some(router) = self.router.upgrade() {
            router.settle_complete(op);
        }
    }
}
