//! Router navigation tests: ledger policy per operation, guards, rollback.

mod common;

use common::*;
use miniapp_navigator::*;
use pollster::block_on;
use serde_json::json;
use std::sync::Arc;

#[test]
fn test_push_commits_and_notifies_after() {
    let host = MockHost::with_pages(&["pages/index"]);
    let router = router_with_home(&host, "/pages/home");

    let log = call_log();
    let before_log = log.clone();
    router.before_each(before_fn(move |to, from, next| {
        before_log.lock().push(format!(
            "before {} <- {}",
            to.url,
            from.map_or("-", |f| f.url.as_str())
        ));
        next.proceed();
    }));
    let after_log = log.clone();
    router.after_each(after_fn(move |to, from| {
        after_log.lock().push(format!(
            "after {} <- {}",
            to.url,
            from.map_or("-", |f| f.url.as_str())
        ));
    }));

    let navigated = block_on(router.navigate_to("/pages/detail?id=1")).unwrap();

    assert_eq!(navigated.to, NavigationRequest::new("/pages/detail?id=1"));
    assert_eq!(navigated.from, Some(NavigationRequest::new("/pages/index")));
    assert!(!navigated.was_substituted());
    assert_eq!(ledger(&router), vec!["/pages/index", "/pages/detail?id=1"]);
    assert_eq!(
        *log.lock(),
        vec![
            "before /pages/detail?id=1 <- /pages/index",
            "after /pages/detail?id=1 <- /pages/index",
        ]
    );
    assert_eq!(host.call_ops(), vec![Operation::NavigateTo]);
    assert_eq!(router.call_state(Operation::NavigateTo), None);
}

#[test]
fn test_structured_target_is_normalized() {
    let host = MockHost::with_pages(&["pages/index"]);
    let router = router_with_home(&host, "/pages/home");

    let request = NavigationRequest::new("/pages/search")
        .query_param("q", json!("rust"))
        .query_param("empty", json!(""))
        .query_param("filter", json!({"tag": "a"}));
    block_on(router.navigate_to(&request)).unwrap();

    let expected = "/pages/search?q=rust&filter=%7B%22tag%22%3A%22a%22%7D";
    assert_eq!(ledger(&router), vec!["/pages/index", expected]);
    match &host.calls()[0].1 {
        NavigationArgs::Target(sent) => {
            assert_eq!(sent.url, expected);
            assert!(sent.query.is_none());
        }
        other => panic!("unexpected args {other:?}"),
    }
    // The caller's request is untouched.
    assert!(request.query.is_some());
}

#[test]
fn test_redirect_replaces_tail() {
    let host = MockHost::with_pages(&["pages/index"]);
    let router = router_with_home(&host, "/");

    block_on(router.navigate_to("/pages/a")).unwrap();
    block_on(router.redirect_to("/pages/b")).unwrap();

    assert_eq!(ledger(&router), vec!["/pages/index", "/pages/b"]);
    assert_eq!(host.page_urls(), vec!["/pages/index", "/pages/b"]);
}

#[test]
fn test_relaunch_and_switch_tab_collapse_ledger() {
    let host = MockHost::with_pages(&["pages/index"]);
    let router = router_with_home(&host, "/");

    block_on(router.navigate_to("/pages/a")).unwrap();
    block_on(router.navigate_to("/pages/b")).unwrap();
    block_on(router.re_launch("/pages/c")).unwrap();
    assert_eq!(ledger(&router), vec!["/pages/c"]);

    block_on(router.navigate_to("/pages/d")).unwrap();
    block_on(router.switch_tab("/pages/tab/mine")).unwrap();
    assert_eq!(ledger(&router), vec!["/pages/tab/mine"]);
    assert_eq!(host.page_urls(), vec!["/pages/tab/mine"]);
}

#[test]
fn test_preload_has_no_ledger_effect() {
    let host = MockHost::with_pages(&["pages/index"]);
    let router = router_with_home(&host, "/");

    let navigated = block_on(router.preload_page("/pages/heavy")).unwrap();

    assert_eq!(navigated.issued, Operation::PreloadPage);
    assert_eq!(ledger(&router), vec!["/pages/index"]);
    assert_eq!(host.call_ops(), vec![Operation::PreloadPage]);
}

#[test]
fn test_push_at_depth_limit_becomes_relaunch() {
    let host = MockHost::with_pages(&["pages/index"]);
    let router = router_with_home(&host, "/");
    let max = router.max_depth();

    for i in 1..max {
        let navigated = block_on(router.navigate_to(format!("/pages/p{i}"))).unwrap();
        assert_eq!(navigated.issued, Operation::NavigateTo);
        assert_eq!(router.history().len(), i + 1);
    }
    assert_eq!(host.depth(), max);

    let navigated = block_on(router.navigate_to(format!("/pages/p{max}"))).unwrap();
    assert!(navigated.was_substituted());
    assert_eq!(navigated.issued, Operation::ReLaunch);
    assert_eq!(router.history().len(), max + 1);
    assert_eq!(host.page_urls(), vec![format!("/pages/p{max}")]);
    assert!(host.depth() <= max);
}

#[test]
fn test_host_failure_rolls_back_and_reports() {
    let host = MockHost::with_pages(&["pages/index"]);
    let router = router_with_home(&host, "/");
    block_on(router.navigate_to("/pages/a")).unwrap();

    let log = call_log();
    let err_log = log.clone();
    router.error(error_fn(move |err, to, _from| {
        err_log.lock().push(format!("{} -> {}", to.url, err));
    }));
    let after_log = log.clone();
    router.after_each(after_fn(move |to, _| {
        after_log.lock().push(format!("after {}", to.url));
    }));

    let before = router.history();
    host.fail_next("redirectTo:fail page not found");
    let err = block_on(router.redirect_to("/pages/missing")).unwrap_err();

    assert_eq!(
        err,
        NavigationError::host_failed(
            Operation::RedirectTo,
            HostError::new("redirectTo:fail page not found")
        )
    );
    assert_eq!(router.history(), before);
    assert_eq!(
        *log.lock(),
        vec!["/pages/missing -> redirectTo failed: redirectTo:fail page not found"]
    );
    assert_eq!(router.call_state(Operation::RedirectTo), None);
}

#[test]
fn test_failed_substituted_push_rolls_back() {
    let host = MockHost::with_pages(&["pages/index"]);
    let host_dyn: Arc<dyn Host> = host.clone();
    let router = Router::configure(RouterOptions::new().with_max_depth(2), host_dyn);
    block_on(router.navigate_to("/pages/a")).unwrap();
    let before = router.history();

    host.fail_next("reLaunch:fail");
    let err = block_on(router.navigate_to("/pages/b")).unwrap_err();

    assert_eq!(err.operation(), Some(Operation::ReLaunch));
    assert_eq!(router.history(), before);
    assert_eq!(host.page_urls(), vec!["/pages/index", "/pages/a"]);
}

#[test]
fn test_blocked_navigation_never_reaches_host() {
    let host = MockHost::with_pages(&["pages/index"]);
    let router = router_with_home(&host, "/");

    let log = call_log();
    router.before_each(before_fn(|to, _, next| {
        next.resolve(!to.url.starts_with("/pages/admin"));
    }));
    let err_log = log.clone();
    router.error(error_fn(move |err, to, from| {
        err_log.lock().push(format!(
            "{} {} {}",
            err,
            to.url,
            from.map_or("-", |f| f.url.as_str())
        ));
    }));
    let after_log = log.clone();
    router.after_each(after_fn(move |to, _| {
        after_log.lock().push(format!("after {}", to.url));
    }));

    let before = router.history();
    let err = block_on(router.navigate_to("/pages/admin/users")).unwrap_err();

    assert_eq!(err, NavigationError::blocked(Operation::NavigateTo));
    assert!(host.calls().is_empty());
    assert_eq!(router.history(), before);
    assert_eq!(
        *log.lock(),
        vec!["navigation blocked by before-guard: navigateTo /pages/admin/users /pages/index"]
    );

    block_on(router.navigate_to("/pages/public")).unwrap();
    assert_eq!(host.call_ops(), vec![Operation::NavigateTo]);
}

#[test]
fn test_legacy_unsignalled_continuation_proceeds() {
    let host = MockHost::with_pages(&["pages/index"]);
    let router = router_with_home(&host, "/");
    router.before_each(before_fn(|_, _, next| {
        next.call(None);
    }));

    block_on(router.navigate_to("/pages/a")).unwrap();
    assert_eq!(ledger(&router), vec!["/pages/index", "/pages/a"]);
}

#[test]
fn test_double_resolution_uses_first() {
    let host = MockHost::with_pages(&["pages/index"]);
    let router = router_with_home(&host, "/");
    router.before_each(before_fn(|_, _, next| {
        next.abort();
        next.proceed();
    }));

    let err = block_on(router.navigate_to("/pages/a")).unwrap_err();
    assert!(err.is_blocked());
    assert!(host.calls().is_empty());
}

#[test]
fn test_guard_that_never_resolves_stalls() {
    use futures::FutureExt;

    let host = MockHost::with_pages(&["pages/index"]);
    let router = router_with_home(&host, "/");
    router.before_each(before_fn(|_, _, next| drop(next)));

    assert!(router.navigate_to("/pages/a").now_or_never().is_none());
    assert!(host.calls().is_empty());
    assert_eq!(ledger(&router), vec!["/pages/index"]);
}

#[tokio::test]
async fn test_guard_resolved_later_from_task() {
    let host = MockHost::with_pages(&["pages/index"]);
    let router = router_with_home(&host, "/");
    router.before_each(before_fn(|_, _, next| {
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            next.proceed();
        });
    }));

    router.navigate_to("/pages/a").await.unwrap();
    assert_eq!(ledger(&router), vec!["/pages/index", "/pages/a"]);
}

#[test]
fn test_replacing_and_clearing_guards() {
    let host = MockHost::with_pages(&["pages/index"]);
    let router = router_with_home(&host, "/");

    router.before_each(before_fn(|_, _, next| {
        next.abort();
    }));
    router.before_each(before_fn(|_, _, next| {
        next.proceed();
    }));
    block_on(router.navigate_to("/pages/a")).unwrap();

    router.before_each(before_fn(|_, _, next| {
        next.abort();
    }));
    assert!(block_on(router.navigate_to("/pages/b")).is_err());

    router.clear_before_each();
    block_on(router.navigate_to("/pages/b")).unwrap();
    assert_eq!(ledger(&router), vec!["/pages/index", "/pages/a", "/pages/b"]);
}

#[test]
fn test_dynamic_targets() {
    let host = MockHost::with_pages(&["pages/index"]);
    let router = router_with_home(&host, "/");

    let navigated = block_on(router.navigate_value(
        Operation::NavigateTo,
        json!({"url": "/pages/a", "query": {"id": 5}}),
    ))
    .unwrap()
    .unwrap();
    assert_eq!(navigated.to.url, "/pages/a?id=5");

    let err = block_on(router.navigate_value(Operation::RedirectTo, json!(17))).unwrap_err();
    assert!(err.is_invalid_argument());

    let back = block_on(router.navigate_value(Operation::NavigateBack, json!({"delta": 1})))
        .unwrap()
        .unwrap();
    assert_eq!(back.issued, Operation::NavigateBack);
    assert_eq!(ledger(&router), vec!["/pages/index"]);
    assert_eq!(host.call_ops(), vec![Operation::NavigateTo, Operation::NavigateBack]);
}

#[test]
fn test_empty_host_stack_leaves_ledger_unseeded_until_commit() {
    let host = MockHost::with_pages(&[]);
    let router = router_with_home(&host, "/");

    let navigated = block_on(router.navigate_to("/pages/first")).unwrap();
    assert_eq!(navigated.from, None);
    assert_eq!(ledger(&router), vec!["/pages/first"]);
}
