//! Test utilities for router tests
//!
//! Provides a [`MockHost`] that simulates a mini-program page stack and runs
//! registered interceptors the way a real host does.

#![allow(dead_code)]

use futures::future::BoxFuture;
use miniapp_navigator::*;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Host double with a bounded page stack.
pub struct MockHost {
    state: Mutex<MockState>,
}

struct MockState {
    pages: Vec<PageDescriptor>,
    interceptors: HashMap<Operation, Arc<dyn Interceptor>>,
    calls: Vec<(Operation, NavigationArgs)>,
    fail_next: Option<HostError>,
    max_depth: usize,
}

impl MockHost {
    /// Host whose stack holds `routes`, bottom first.
    pub fn with_pages(routes: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MockState {
                pages: routes.iter().map(|route| page(route)).collect(),
                interceptors: HashMap::new(),
                calls: Vec::new(),
                fail_next: None,
                max_depth: DEFAULT_MAX_DEPTH,
            }),
        })
    }

    /// Make the next primitive fail with `message`.
    pub fn fail_next(&self, message: &str) {
        self.state.lock().fail_next = Some(HostError::new(message));
    }

    /// Urls of the live pages, bottom first.
    pub fn page_urls(&self) -> Vec<String> {
        self.state
            .lock()
            .pages
            .iter()
            .map(|p| p.to_request().url)
            .collect()
    }

    pub fn depth(&self) -> usize {
        self.state.lock().pages.len()
    }

    /// Primitives that reached the host, in order.
    pub fn calls(&self) -> Vec<(Operation, NavigationArgs)> {
        self.state.lock().calls.clone()
    }

    pub fn call_ops(&self) -> Vec<Operation> {
        self.state.lock().calls.iter().map(|(op, _)| *op).collect()
    }

    pub fn has_interceptor(&self, op: Operation) -> bool {
        self.state.lock().interceptors.contains_key(&op)
    }

    pub fn interceptor_count(&self) -> usize {
        self.state.lock().interceptors.len()
    }

    fn execute(&self, op: Operation, args: &NavigationArgs) -> Result<(), HostError> {
        let mut state = self.state.lock();
        state.calls.push((op, args.clone()));
        if let Some(err) = state.fail_next.take() {
            return Err(err);
        }

        match (op, args) {
            (Operation::NavigateTo, NavigationArgs::Target(request)) => {
                if state.pages.len() >= state.max_depth {
                    return Err(HostError::new("navigateTo:fail page limit exceeded"));
                }
                state.pages.push(page(&request.url));
            }
            (Operation::RedirectTo, NavigationArgs::Target(request)) => {
                state.pages.pop();
                state.pages.push(page(&request.url));
            }
            (Operation::ReLaunch | Operation::SwitchTab, NavigationArgs::Target(request)) => {
                state.pages = vec![page(&request.url)];
            }
            (Operation::NavigateBack, NavigationArgs::Back(options)) => {
                let keep = state.pages.len().saturating_sub(options.delta).max(1);
                state.pages.truncate(keep);
            }
            (Operation::PreloadPage, NavigationArgs::Target(_)) => {}
            _ => return Err(HostError::new(format!("{op}:fail invalid args"))),
        }
        Ok(())
    }
}

impl Host for MockHost {
    fn navigate(&self, op: Operation, args: NavigationArgs) -> BoxFuture<'_, NavigationResult<()>> {
        Box::pin(async move {
            let interceptor = self.state.lock().interceptors.get(&op).cloned();
            let args = match &interceptor {
                Some(interceptor) => interceptor.invoke(op, args).await?,
                None => args,
            };

            let result = self.execute(op, &args);
            if let Some(interceptor) = &interceptor {
                match &result {
                    Ok(()) => interceptor.success(op),
                    Err(err) => interceptor.fail(op, err),
                }
                interceptor.complete(op);
            }
            result.map_err(|err| NavigationError::host_failed(op, err))
        })
    }

    fn current_pages(&self) -> Vec<PageDescriptor> {
        self.state.lock().pages.clone()
    }

    fn add_interceptor(&self, op: Operation, interceptor: Arc<dyn Interceptor>) {
        self.state.lock().interceptors.insert(op, interceptor);
    }

    fn remove_interceptor(&self, op: Operation) {
        self.state.lock().interceptors.remove(&op);
    }
}

/// Framework double recording where the router was attached.
pub struct MockFramework {
    pub version: String,
    pub attached: Vec<(AttachPoint, &'static str, Router)>,
}

impl MockFramework {
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            attached: Vec::new(),
        }
    }
}

impl Framework for MockFramework {
    fn version(&self) -> &str {
        &self.version
    }

    fn attach(&mut self, point: AttachPoint, name: &'static str, router: Router) {
        self.attached.push((point, name, router));
    }
}

/// Page descriptor for a route such as `pages/index` or `/pages/a?id=1`.
pub fn page(route: &str) -> PageDescriptor {
    let route = route.trim_start_matches('/');
    let (path, search) = route.split_once('?').unwrap_or((route, ""));
    let mut options = Map::new();
    for pair in search.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        options.insert(key.to_string(), Value::String(value.to_string()));
    }
    PageDescriptor::new(path, options)
}

/// Route router logs to the test output (`RUST_LOG=miniapp_navigator=trace`).
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Router over `host` with the given home page.
pub fn router_with_home(host: &Arc<MockHost>, home: &str) -> Router {
    init_logging();
    let host: Arc<dyn Host> = host.clone();
    Router::configure(RouterOptions::new().with_home_page(home), host)
}

/// Shared log for guard assertions.
pub fn call_log() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

/// Urls recorded in the router's ledger.
pub fn ledger(router: &Router) -> Vec<String> {
    router
        .history()
        .urls()
        .into_iter()
        .map(str::to_string)
        .collect()
}
