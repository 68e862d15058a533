use super::*;

use tokio::time::{sleep, Instant};

use crate::domain::{FailureKind, RefreshSource};
use crate::testkit;
use crate::testkit::config::TEST_TIMEOUT;
use crate::testkit::provider::{launch_log, Behavior, ProviderProbe, ScriptedProvider};

// -- Helpers --------------------------------------------------------------

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn coordinator(settings: RefreshSettings) -> RefreshCoordinator {
    RefreshCoordinator::new(Arc::new(ComponentRegistry::default()), settings)
}

fn subscribe_as(
    c: &RefreshCoordinator,
    id: &str,
    provider: ScriptedProvider,
    priority: i32,
) -> Arc<ProviderProbe> {
    let (shared, probe) = provider.shared();
    c.subscribe(id, shared, SubscribeOptions::with_priority(priority));
    probe
}

// -- Guard ----------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn trigger_while_pending_is_skipped() {
    let c = coordinator(testkit::config::refresh());
    let probe = subscribe_as(&c, "slow", ScriptedProvider::succeed_after("slow", ms(100)), 1);

    let first = c.trigger_global_refresh(RefreshOptions::default());
    assert!(c.is_refreshing());

    let second = c.trigger_global_refresh(RefreshOptions::default()).await;
    assert!(second.is_skipped());
    assert!(!second.success());
    assert_eq!(second.reason(), Some(SkipReason::AlreadyRefreshing));

    assert!(first.await.success());
    assert!(!c.is_refreshing());
    assert_eq!(probe.calls(), 1);

    let third = c.trigger_global_refresh(RefreshOptions::default()).await;
    assert!(third.success());
    assert_eq!(probe.calls(), 2);
    assert_eq!(c.history().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn forced_pass_runs_alongside_and_holds_guard() {
    let c = coordinator(testkit::config::refresh());
    let probe = subscribe_as(&c, "slow", ScriptedProvider::succeed_after("slow", ms(100)), 1);

    let first = tokio::spawn(c.trigger_global_refresh(RefreshOptions::default()));
    sleep(ms(10)).await;
    let forced = tokio::spawn(c.trigger_global_refresh(RefreshOptions::default().forced()));

    // The first pass ends at 100ms; the forced one at 110ms still holds the guard.
    assert!(first.await.unwrap().success());
    assert!(c.is_refreshing());
    assert!(c
        .trigger_global_refresh(RefreshOptions::default())
        .await
        .is_skipped());

    assert!(forced.await.unwrap().success());
    assert!(!c.is_refreshing());
    assert_eq!(probe.calls(), 2);
    assert_eq!(probe.max_active(), 2);
}

#[tokio::test]
async fn dropping_the_future_releases_the_guard() {
    let c = coordinator(testkit::config::refresh());
    subscribe_as(&c, "x", ScriptedProvider::succeed("x"), 1);

    let pending = c.trigger_global_refresh(RefreshOptions::default());
    assert!(c.is_refreshing());
    drop(pending);
    assert!(!c.is_refreshing());

    assert!(c.trigger_global_refresh(RefreshOptions::default()).await.success());
}

// -- Failure isolation ----------------------------------------------------

#[tokio::test(start_paused = true)]
async fn failure_does_not_hide_sibling_success() {
    let c = coordinator(testkit::config::refresh());
    subscribe_as(&c, "a", ScriptedProvider::succeed_after("a", ms(10)), 5);
    subscribe_as(&c, "b", ScriptedProvider::fail("b", "backend unavailable"), 5);

    let pass = c
        .trigger_global_refresh(RefreshOptions::default())
        .await
        .into_pass()
        .unwrap();

    assert!(!pass.success);
    assert!(pass.global_error.is_none());
    assert_eq!(pass.results.len(), 1);
    assert_eq!(pass.results[0].component_id.as_str(), "a");
    assert_eq!(pass.errors.len(), 1);

    let failed = &pass.errors[0];
    assert_eq!(failed.component_id.as_str(), "b");
    assert_eq!(failed.kind, FailureKind::Failure);
    assert_eq!(failed.error_message, "backend unavailable");
    assert_eq!(failed.retry_count_at_failure, 1);

    let statuses = c.component_statuses();
    let a = statuses.iter().find(|s| s.id.as_str() == "a").unwrap();
    let b = statuses.iter().find(|s| s.id.as_str() == "b").unwrap();
    assert!(a.last_refresh_at.is_some());
    assert_eq!(a.retry_count, 0);
    assert_eq!(b.retry_count, 1);
    assert!(b.last_refresh_at.is_none());
}

#[tokio::test(start_paused = true)]
async fn hanging_provider_times_out_within_bound() {
    let c = coordinator(testkit::config::refresh());
    subscribe_as(&c, "stuck", ScriptedProvider::hang("stuck"), 9);
    let quick = subscribe_as(&c, "quick", ScriptedProvider::succeed("quick"), 1);

    let started = Instant::now();
    let pass = c
        .trigger_global_refresh(RefreshOptions::default())
        .await
        .into_pass()
        .unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= TEST_TIMEOUT);
    assert!(elapsed < TEST_TIMEOUT + ms(50));
    assert_eq!(quick.calls(), 1);
    assert_eq!(pass.results.len(), 1);
    assert_eq!(pass.errors.len(), 1);
    assert_eq!(pass.errors[0].kind, FailureKind::Timeout);
    assert_eq!(pass.errors[0].component_id.as_str(), "stuck");
    assert_eq!(c.state.orphans.len(), 1);

    c.destroy();
    assert_eq!(c.state.orphans.len(), 0);
}

#[tokio::test(start_paused = true)]
async fn late_success_after_timeout_is_discarded() {
    let c = coordinator(testkit::config::refresh());
    let late = subscribe_as(
        &c,
        "late",
        ScriptedProvider::new("late", Behavior::SucceedAfter(TEST_TIMEOUT + ms(200))),
        1,
    );

    let pass = c
        .trigger_global_refresh(RefreshOptions::default())
        .await
        .into_pass()
        .unwrap();
    assert_eq!(pass.errors.len(), 1);
    assert_eq!(pass.errors[0].kind, FailureKind::Timeout);
    assert_eq!(pass.errors[0].retry_count_at_failure, 1);
    assert_eq!(c.state.orphans.len(), 1);

    sleep(ms(300)).await;
    assert_eq!(late.completed(), 1);

    let status = &c.component_statuses()[0];
    assert_eq!(status.retry_count, 1);
    assert!(status.last_refresh_at.is_none());
    assert_eq!(c.history().len(), 1);
    assert_eq!(c.state.orphans.len(), 0);
}

#[tokio::test(start_paused = true)]
async fn late_failure_after_timeout_is_discarded() {
    let c = coordinator(testkit::config::refresh());
    let late = subscribe_as(
        &c,
        "late",
        ScriptedProvider::new(
            "late",
            Behavior::FailAfter(TEST_TIMEOUT + ms(200), "late boom".to_string()),
        ),
        1,
    );

    let pass = c
        .trigger_global_refresh(RefreshOptions::default())
        .await
        .into_pass()
        .unwrap();
    assert_eq!(pass.errors.len(), 1);
    assert_eq!(pass.errors[0].kind, FailureKind::Timeout);
    assert!(!pass.errors[0].error_message.contains("late boom"));

    sleep(ms(300)).await;
    assert_eq!(late.completed(), 1);

    let status = &c.component_statuses()[0];
    assert_eq!(status.retry_count, 1);
    assert!(status.last_refresh_at.is_none());
    let history = c.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].errors.len(), 1);
    assert_eq!(c.state.orphans.len(), 0);
}

#[tokio::test]
async fn internal_pass_fault_is_reported_as_global_error() {
    let c = coordinator(testkit::config::refresh());
    let probe = subscribe_as(&c, "a", ScriptedProvider::succeed("a"), 1);

    c.inject_pass_fault();
    let pass = c
        .trigger_global_refresh(RefreshOptions::default())
        .await
        .into_pass()
        .unwrap();

    assert!(!pass.success);
    assert!(pass
        .global_error
        .as_deref()
        .is_some_and(|e| e.contains("injected pass fault")));
    assert!(pass.results.is_empty());
    assert!(pass.errors.is_empty());
    assert_eq!(probe.calls(), 0);
    assert!(!c.is_refreshing());
    assert_eq!(c.history().len(), 1);

    let next = c
        .trigger_global_refresh(RefreshOptions::default())
        .await
        .into_pass()
        .unwrap();
    assert!(next.success);
    assert!(next.global_error.is_none());
    assert_eq!(probe.calls(), 1);
    assert_eq!(c.history().len(), 2);
}

#[tokio::test]
async fn panicking_provider_is_a_component_failure() {
    let c = coordinator(testkit::config::refresh());
    subscribe_as(&c, "bad", ScriptedProvider::panic("bad", "index out of range"), 1);
    subscribe_as(&c, "good", ScriptedProvider::succeed("good"), 1);

    let pass = c
        .trigger_global_refresh(RefreshOptions::default())
        .await
        .into_pass()
        .unwrap();

    assert!(!pass.success);
    assert!(pass.global_error.is_none());
    assert_eq!(pass.results.len(), 1);
    assert!(pass.errors[0].error_message.contains("index out of range"));
    assert!(!c.is_refreshing());
}

#[tokio::test]
async fn success_resets_retry_count() {
    let c = coordinator(testkit::config::refresh());
    subscribe_as(&c, "x", ScriptedProvider::flaky("x", 2, "warming up"), 1);

    c.trigger_global_refresh(RefreshOptions::default()).await;
    let second = c
        .trigger_global_refresh(RefreshOptions::default())
        .await
        .into_pass()
        .unwrap();
    assert_eq!(second.errors[0].retry_count_at_failure, 2);
    assert_eq!(c.component_statuses()[0].retry_count, 2);

    assert!(c.trigger_global_refresh(RefreshOptions::default()).await.success());
    let status = &c.component_statuses()[0];
    assert_eq!(status.retry_count, 0);
    assert!(status.last_refresh_at.is_some());
}

// -- Scheduling -----------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn worker_pool_bounds_concurrency() {
    let c = coordinator(testkit::config::refresh_with_concurrency(3));
    let probe = ProviderProbe::new();
    for i in 0..8 {
        let (provider, _) = ScriptedProvider::succeed_after(format!("c{i}"), ms(50))
            .with_probe(Arc::clone(&probe))
            .shared();
        c.subscribe(format!("c{i}"), provider, SubscribeOptions::with_priority(i));
    }

    let started = Instant::now();
    let pass = c
        .trigger_global_refresh(RefreshOptions::default())
        .await
        .into_pass()
        .unwrap();

    assert!(pass.success);
    assert_eq!(pass.results.len(), 8);
    assert_eq!(probe.calls(), 8);
    assert_eq!(probe.max_active(), 3);
    // ceil(8 / 3) rounds of 50ms.
    assert!(started.elapsed() >= ms(150));
}

#[tokio::test]
async fn launches_follow_priority_order() {
    let c = coordinator(testkit::config::refresh_with_concurrency(1));
    let log = launch_log();
    for (id, priority) in [("low", 1), ("high", 10), ("mid", 5), ("mid-later", 5)] {
        let (provider, _) = ScriptedProvider::succeed(id).logging_into(&log).shared();
        c.subscribe(id, provider, SubscribeOptions::with_priority(priority));
    }

    c.trigger_global_refresh(RefreshOptions::default()).await;

    assert_eq!(*log.lock(), vec!["high", "mid", "mid-later", "low"]);
}

#[tokio::test]
async fn disabled_components_are_skipped() {
    let c = coordinator(testkit::config::refresh());
    let on = subscribe_as(&c, "on", ScriptedProvider::succeed("on"), 1);
    let off = subscribe_as(&c, "off", ScriptedProvider::succeed("off"), 1);
    assert!(c.set_component_enabled(&ComponentId::new("off"), false));

    let pass = c
        .trigger_global_refresh(RefreshOptions::default())
        .await
        .into_pass()
        .unwrap();

    assert_eq!(pass.component_count(), 1);
    assert_eq!(on.calls(), 1);
    assert_eq!(off.calls(), 0);
}

#[tokio::test]
async fn empty_registry_completes_successfully() {
    let c = coordinator(testkit::config::refresh());
    let pass = c
        .trigger_global_refresh(RefreshOptions::default())
        .await
        .into_pass()
        .unwrap();
    assert!(pass.success);
    assert_eq!(pass.component_count(), 0);
}

// -- History and stats ----------------------------------------------------

#[tokio::test]
async fn history_is_capped() {
    let mut settings = testkit::config::refresh();
    settings.max_history = 3;
    let c = coordinator(settings);
    subscribe_as(&c, "x", ScriptedProvider::succeed("x"), 1);

    let mut ids = Vec::new();
    for _ in 0..5 {
        let pass = c
            .trigger_global_refresh(RefreshOptions::default())
            .await
            .into_pass()
            .unwrap();
        ids.push(pass.id);
    }

    let kept: Vec<_> = c.history().into_iter().map(|p| p.id).collect();
    assert_eq!(kept, ids[2..].to_vec());
}

#[tokio::test]
async fn pass_records_source_and_notify() {
    let c = coordinator(testkit::config::refresh());

    let loud = c
        .trigger_global_refresh(RefreshOptions::default())
        .await
        .into_pass()
        .unwrap();
    assert!(loud.notify);
    assert_eq!(loud.source, RefreshSource::Manual);

    let quiet = c
        .trigger_global_refresh(
            RefreshOptions::from_source(RefreshSource::WebsocketBroadcast).silent(),
        )
        .await
        .into_pass()
        .unwrap();
    assert!(quiet.silent);
    assert!(!quiet.notify);

    let mut settings = testkit::config::refresh();
    settings.show_notifications = Some(false);
    let muted = coordinator(settings)
        .trigger_global_refresh(RefreshOptions::default())
        .await
        .into_pass()
        .unwrap();
    assert!(!muted.notify);
}

#[tokio::test]
async fn stats_summarize_history_and_reset_keeps_registry() {
    let c = coordinator(testkit::config::refresh());
    subscribe_as(&c, "a", ScriptedProvider::succeed("a"), 1);
    c.trigger_global_refresh(RefreshOptions::default()).await;
    subscribe_as(&c, "b", ScriptedProvider::fail("b", "nope"), 1);
    c.trigger_global_refresh(RefreshOptions::default()).await;

    let stats = c.refresh_stats();
    assert_eq!(stats.total_refreshes, 2);
    assert_eq!(stats.successful_refreshes, 1);
    assert_eq!(stats.success_rate, 50.0);
    assert_eq!(stats.subscriber_count, 2);
    assert!(stats.last_refresh_at.is_some());
    assert!(!stats.is_refreshing);
    assert!(!stats.auto_refresh_enabled);
    assert!(!stats.recent_refreshes[0].success);

    c.reset_stats();
    let stats = c.refresh_stats();
    assert_eq!(stats.total_refreshes, 0);
    assert!(stats.last_refresh_at.is_none());
    assert_eq!(stats.subscriber_count, 2);
}

// -- Auto refresh ---------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn auto_refresh_runs_at_cadence_until_stopped() {
    let c = coordinator(testkit::config::refresh());
    let probe = subscribe_as(&c, "x", ScriptedProvider::succeed("x"), 1);

    c.set_auto_refresh(true, Some(ms(50)));
    assert_eq!(c.auto_refresh_interval(), Some(ms(50)));
    sleep(ms(175)).await;
    assert_eq!(probe.calls(), 3);
    assert!(c
        .history()
        .iter()
        .all(|p| p.source == RefreshSource::Auto));

    c.set_auto_refresh(false, None);
    assert!(!c.refresh_stats().auto_refresh_enabled);
    sleep(ms(500)).await;
    assert_eq!(probe.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn overlapping_ticks_collapse() {
    let c = coordinator(testkit::config::refresh());
    let probe = subscribe_as(&c, "slow", ScriptedProvider::succeed_after("slow", ms(120)), 1);

    // Ticks at 50..300; passes run 50..170 and 200..320.
    c.set_auto_refresh(true, Some(ms(50)));
    sleep(ms(330)).await;

    assert_eq!(probe.calls(), 2);
    assert_eq!(probe.max_active(), 1);
    assert_eq!(c.history().len(), 2);
    c.set_auto_refresh(false, None);
}

#[tokio::test(start_paused = true)]
async fn changing_interval_replaces_timer() {
    let c = coordinator(testkit::config::refresh());
    let probe = subscribe_as(&c, "x", ScriptedProvider::succeed("x"), 1);

    c.set_auto_refresh(true, Some(ms(50)));
    c.set_auto_refresh(true, Some(ms(100)));
    sleep(ms(250)).await;

    assert_eq!(probe.calls(), 2);
    assert_eq!(c.auto_refresh_interval(), Some(ms(100)));
    c.set_auto_refresh(false, None);
}

#[tokio::test(start_paused = true)]
async fn zero_interval_falls_back_to_configured() {
    let mut settings = testkit::config::refresh();
    settings.auto_refresh_interval_ms = 80;
    let c = coordinator(settings);

    c.set_auto_refresh(true, Some(Duration::ZERO));
    assert_eq!(c.auto_refresh_interval(), Some(ms(80)));
    c.set_auto_refresh(false, None);
}

// -- Destroy --------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn destroy_stops_timer_and_clears_state() {
    let c = coordinator(testkit::config::refresh());
    let probe = subscribe_as(&c, "x", ScriptedProvider::succeed("x"), 1);

    c.set_auto_refresh(true, Some(ms(50)));
    sleep(ms(60)).await;
    assert_eq!(probe.calls(), 1);

    c.destroy();
    assert!(c.is_destroyed());
    assert!(c.registry().is_empty());
    assert!(c.history().is_empty());
    assert_eq!(c.auto_refresh_interval(), None);

    sleep(ms(1_000)).await;
    assert_eq!(probe.calls(), 1);

    c.set_auto_refresh(true, Some(ms(50)));
    assert_eq!(c.auto_refresh_interval(), None);
}

#[tokio::test(start_paused = true)]
async fn destroy_mid_pass_launches_nothing_further() {
    let c = coordinator(testkit::config::refresh_with_concurrency(1));
    let first = subscribe_as(&c, "first", ScriptedProvider::succeed_after("first", ms(100)), 2);
    let second = subscribe_as(&c, "second", ScriptedProvider::succeed("second"), 1);

    let pass = tokio::spawn(c.trigger_global_refresh(RefreshOptions::default()));
    sleep(ms(10)).await;
    c.destroy();

    let pass = pass.await.unwrap().into_pass().unwrap();
    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 0);
    assert_eq!(pass.component_count(), 1);
    assert!(c.history().is_empty());
}
