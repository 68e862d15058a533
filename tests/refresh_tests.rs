mod support;

use std::sync::Arc;
use std::time::Duration;

use hyperdash::domain::{
    ComponentId, FailureKind, RefreshOptions, RefreshSource, SkipReason, SubscribeOptions,
};
use hyperdash::infrastructure::bootstrap::RefreshCore;
use hyperdash::infrastructure::config::Config;
use hyperdash::testkit::provider::{ProviderProbe, ScriptedProvider};
use tokio::time::{sleep, Instant};

fn subscribe(core: &RefreshCore, id: &str, provider: ScriptedProvider) -> Arc<ProviderProbe> {
    let (provider, probe) = provider.shared();
    core.coordinator()
        .subscribe(id, provider, SubscribeOptions::default());
    probe
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[tokio::test]
async fn catalog_priorities_order_components() {
    let core = support::core();
    for id in ["status-monitor", "cluster-status", "pods-services"] {
        subscribe(&core, id, ScriptedProvider::succeed(id));
    }

    let outcome = core
        .coordinator()
        .trigger_global_refresh(RefreshOptions::default())
        .await;
    assert!(outcome.success());

    let statuses = core.coordinator().component_statuses();
    let order: Vec<&str> = statuses.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(order, vec!["cluster-status", "pods-services", "status-monitor"]);
    assert!(statuses.iter().all(|s| s.last_refresh_at.is_some()));

    let stats = core.coordinator().refresh_stats();
    assert_eq!(stats.total_refreshes, 1);
    assert_eq!(stats.subscriber_count, 3);
    assert!((stats.success_rate - 100.0).abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn configured_timeout_bounds_a_hanging_component() {
    let core = support::core();
    let fast = subscribe(&core, "cluster-status", ScriptedProvider::succeed("cluster-status"));
    subscribe(&core, "status-monitor", ScriptedProvider::hang("status-monitor"));

    let started = Instant::now();
    let pass = core
        .coordinator()
        .trigger_global_refresh(RefreshOptions::default())
        .await
        .into_pass()
        .unwrap();

    assert!(started.elapsed() >= ms(500));
    assert!(started.elapsed() < ms(550));
    assert!(!pass.success);
    assert_eq!(fast.completed(), 1);
    assert_eq!(pass.results.len(), 1);
    assert_eq!(pass.errors.len(), 1);
    assert_eq!(pass.errors[0].component_id.as_str(), "status-monitor");
    assert_eq!(pass.errors[0].kind, FailureKind::Timeout);

    let statuses = core.coordinator().component_statuses();
    let hung = statuses
        .iter()
        .find(|s| s.id.as_str() == "status-monitor")
        .unwrap();
    assert_eq!(hung.retry_count, 1);
    assert!(!core.coordinator().is_refreshing());
    core.destroy();
}

#[tokio::test(start_paused = true)]
async fn overlapping_triggers_collapse_into_one_pass() {
    let core = support::core();
    let probe = subscribe(
        &core,
        "cluster-status",
        ScriptedProvider::succeed_after("cluster-status", ms(100)),
    );

    let first = core
        .coordinator()
        .trigger_global_refresh(RefreshOptions::default());
    let second = core
        .coordinator()
        .trigger_global_refresh(RefreshOptions::from_source(RefreshSource::Auto));

    assert_eq!(second.await.reason(), Some(SkipReason::AlreadyRefreshing));
    assert!(first.await.success());
    assert_eq!(probe.calls(), 1);

    let again = core
        .coordinator()
        .trigger_global_refresh(RefreshOptions::default())
        .await;
    assert!(again.success());
    assert_eq!(probe.calls(), 2);
    assert_eq!(core.coordinator().history().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn forced_pass_runs_alongside_the_current_one() {
    let core = support::core();
    let probe = subscribe(
        &core,
        "pods-services",
        ScriptedProvider::succeed_after("pods-services", ms(100)),
    );

    let first = tokio::spawn(
        core.coordinator()
            .trigger_global_refresh(RefreshOptions::default()),
    );
    let forced = tokio::spawn(
        core.coordinator()
            .trigger_global_refresh(RefreshOptions::default().forced()),
    );

    assert!(first.await.unwrap().success());
    assert!(forced.await.unwrap().success());
    assert_eq!(probe.calls(), 2);
    assert!(!core.coordinator().is_refreshing());
}

#[tokio::test(start_paused = true)]
async fn auto_refresh_from_config_ticks_until_destroyed() {
    let toml = support::CONFIG.replace(
        "[refresh]\n",
        "[refresh]\nauto_refresh_enabled = true\nauto_refresh_interval_ms = 100\n",
    );
    let core = RefreshCore::from_config(&Config::parse_toml(&toml).unwrap());
    let probe = subscribe(&core, "cluster-status", ScriptedProvider::succeed("cluster-status"));

    core.start();
    assert_eq!(core.coordinator().auto_refresh_interval(), Some(ms(100)));

    sleep(ms(350)).await;
    assert_eq!(probe.calls(), 3);
    assert!(core
        .coordinator()
        .history()
        .iter()
        .all(|pass| pass.source == RefreshSource::Auto));

    core.destroy();
    sleep(ms(500)).await;
    assert_eq!(probe.calls(), 3);
    assert_eq!(core.coordinator().auto_refresh_interval(), None);
}

#[tokio::test]
async fn failing_component_does_not_abort_the_pass() {
    let core = support::core();
    subscribe(&core, "cluster-status", ScriptedProvider::fail("cluster-status", "503 from API"));
    let healthy = subscribe(&core, "pods-services", ScriptedProvider::succeed("pods-services"));

    let pass = core
        .coordinator()
        .trigger_global_refresh(RefreshOptions::default())
        .await
        .into_pass()
        .unwrap();

    assert!(!pass.success);
    assert_eq!(healthy.completed(), 1);
    assert_eq!(pass.errors[0].kind, FailureKind::Failure);
    assert_eq!(pass.errors[0].error_message, "503 from API");
    assert!(pass.global_error.is_none());

    core.coordinator()
        .set_component_enabled(&ComponentId::new("cluster-status"), false);
    assert!(core
        .coordinator()
        .trigger_global_refresh(RefreshOptions::default())
        .await
        .success());
}
