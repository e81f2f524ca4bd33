//! End-to-end sync scenarios against the simulated companion.
//!
//! Every test runs the production runtime on tokio's paused clock, so command
//! timeouts resolve without waiting.

use std::time::Duration;

use pulselink_app::{Dashboard, HealthStatus, view::PLACEHOLDER};
use pulselink_core::{ChannelConfig, ErrorKind, MetricSnapshot, SessionState, SyncError};
use pulselink_harness::{InvariantRegistry, SimCompanionConfig, SimDriver};
use pulselink_proto::{Action, Payload, keys};

async fn started(config: SimCompanionConfig) -> SimDriver {
    let mut sim = SimDriver::start(config, ChannelConfig::default())
        .with_invariants(InvariantRegistry::standard());
    sim.activate().await;
    sim
}

#[tokio::test(start_paused = true)]
async fn start_running_after_activation() {
    let mut sim = started(SimCompanionConfig::default()).await;
    let snapshot = sim.handle().snapshot();
    assert_eq!(snapshot.session, SessionState::Active);
    assert!(snapshot.connection.installed && snapshot.connection.reachable);

    let result = sim.handle().start_workout("Running").wait().await;

    assert_eq!(result, Ok(()));
    let snapshot = sim.settle("after start").await;
    assert_eq!(snapshot.workout.workout_type(), Some("Running"));
    assert_eq!(sim.companion().workout().as_deref(), Some("Running"));
    sim.stop().await;
}

#[tokio::test(start_paused = true)]
async fn partial_pushes_merge_field_by_field() {
    let mut sim = started(SimCompanionConfig::default()).await;

    sim.companion().push(Payload::new().with(keys::HEART_RATE, 142.0), false);
    sim.companion().push(Payload::new().with(keys::STEPS, 5000i64), false);
    let snapshot = sim.settle("after pushes").await;

    assert_eq!(snapshot.metrics, MetricSnapshot {
        heart_rate: Some(142.0),
        steps: Some(5000),
        active_energy: None,
        distance: None,
    });
    sim.stop().await;
}

#[tokio::test(start_paused = true)]
async fn snapshot_while_unreachable_never_reaches_transport() {
    let mut sim = started(SimCompanionConfig { reachable: false, ..Default::default() }).await;
    let before = sim.handle().snapshot().metrics;

    let result = sim.handle().request_snapshot().wait().await;

    assert_eq!(result, Err(SyncError::Unreachable));
    assert_eq!(sim.companion().sends(), 0);
    assert_eq!(sim.settle("after unreachable snapshot").await.metrics, before);
    sim.stop().await;
}

#[tokio::test(start_paused = true)]
async fn snapshot_reply_updates_metrics() {
    let mut sim = started(SimCompanionConfig::default()).await;

    sim.handle().request_snapshot().wait().await.expect("snapshot should succeed");

    let metrics = sim.settle("after snapshot").await.metrics;
    assert!(metrics.heart_rate.is_some());
    assert!(metrics.steps.is_some());
    assert!(metrics.active_energy.is_some());
    assert!(metrics.distance.is_some());
    sim.stop().await;
}

#[tokio::test(start_paused = true)]
async fn deactivation_reactivates_exactly_once() {
    let mut sim = started(SimCompanionConfig::default()).await;
    assert_eq!(sim.companion().activations(), 1);

    sim.companion().deactivate();
    let snapshot = sim.settle("after deactivation").await;

    assert_eq!(sim.companion().activations(), 2);
    assert_eq!(snapshot.session, SessionState::Active);
    sim.stop().await;
}

#[tokio::test(start_paused = true)]
async fn unsupported_platform_never_activates() {
    let mut sim = started(SimCompanionConfig { supported: false, ..Default::default() }).await;

    assert_eq!(sim.companion().activations(), 0);
    assert_eq!(sim.settle("after unsupported activate").await.session, SessionState::Idle);
    sim.stop().await;
}

#[tokio::test(start_paused = true)]
async fn rejected_start_leaves_workout_inactive() {
    let mut sim = started(SimCompanionConfig { reject_start: true, ..Default::default() }).await;

    let result = sim.handle().start_workout("Yoga").wait().await;

    assert_eq!(result, Err(SyncError::CommandRejected { action: Action::StartWorkout }));
    assert!(!sim.settle("after rejection").await.workout.is_active());
    sim.stop().await;
}

#[tokio::test(start_paused = true)]
async fn failed_send_is_transient_transport_failure() {
    let mut sim = started(SimCompanionConfig { fail_sends: true, ..Default::default() }).await;

    let err = sim.handle().start_workout("Cycling").wait().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TransportFailure);
    assert!(err.is_transient());
    assert!(!sim.settle("after failed send").await.workout.is_active());
    sim.stop().await;
}

#[tokio::test(start_paused = true)]
async fn silent_companion_times_out() {
    let mut sim = started(SimCompanionConfig { drop_replies: true, ..Default::default() }).await;
    let started_at = tokio::time::Instant::now();

    let err = sim.handle().start_workout("Swimming").wait().await.unwrap_err();

    assert!(matches!(err, SyncError::Timeout { action: Action::StartWorkout, .. }));
    assert!(started_at.elapsed() >= Duration::from_secs(10));
    assert!(!sim.settle("after timeout").await.workout.is_active());
    sim.stop().await;
}

#[tokio::test(start_paused = true)]
async fn push_with_reply_slot_gets_receipt() {
    let mut sim = started(SimCompanionConfig::default()).await;

    let update = sim.companion().push_metrics(true);
    let snapshot = sim.settle("after push").await;

    assert_eq!(sim.companion().receipts(), 1);
    assert_eq!(snapshot.metrics.steps, update.steps);
    sim.stop().await;
}

#[tokio::test(start_paused = true)]
async fn repeated_stop_is_idempotent() {
    let mut sim = started(SimCompanionConfig::default()).await;
    sim.handle().start_workout("Walking").wait().await.expect("start should succeed");

    for _ in 0..3 {
        assert_eq!(sim.handle().stop_workout().wait().await, Ok(()));
        assert!(!sim.settle("after stop").await.workout.is_active());
    }
    assert_eq!(sim.companion().sends(), 4);
    sim.stop().await;
}

#[tokio::test(start_paused = true)]
async fn reachability_drop_keeps_running_workout() {
    let mut sim = started(SimCompanionConfig::default()).await;
    sim.handle().start_workout("Strength Training").wait().await.expect("start should succeed");

    sim.companion().set_reachable(false);
    let snapshot = sim.settle("after reachability drop").await;

    assert!(!snapshot.connection.reachable);
    assert_eq!(snapshot.workout.workout_type(), Some("Strength Training"));
    sim.stop().await;
}

#[tokio::test(start_paused = true)]
async fn commands_after_shutdown_fail() {
    let sim = started(SimCompanionConfig::default()).await;
    let handle = sim.handle().clone();
    sim.stop().await;

    let err = handle.start_workout("Running").wait().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TransportFailure);
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_published_changes() {
    let sim = started(SimCompanionConfig::default()).await;
    let mut updates = sim.handle().subscribe();
    updates.mark_unchanged();

    sim.companion().push(Payload::new().with(keys::DISTANCE, 2.5), false);
    updates.changed().await.expect("runtime should publish");

    assert_eq!(updates.borrow().metrics.distance, Some(2.5));
    sim.stop().await;
}

#[tokio::test(start_paused = true)]
async fn dashboard_shown_fills_every_card() {
    let mut sim = started(SimCompanionConfig::default()).await;
    let health = HealthStatus::default();
    let before = Dashboard::from_snapshot(&sim.handle().snapshot(), health, "Running");
    assert!(before.metrics.iter().all(|card| card.value == PLACEHOLDER));

    Dashboard::shown(sim.handle()).wait().await.expect("snapshot should succeed");

    let snapshot = sim.settle("after dashboard shown").await;
    let after = Dashboard::from_snapshot(&snapshot, health, "Running");
    assert_eq!(after.metrics.len(), 4);
    assert!(after.metrics.iter().all(|card| card.value != PLACEHOLDER));
    assert_eq!(sim.companion().sends(), 1);
    sim.stop().await;
}

#[tokio::test(start_paused = true)]
async fn install_state_change_keeps_reachability_and_workout() {
    let mut sim = started(SimCompanionConfig::default()).await;
    sim.handle().start_workout("Cycling").wait().await.expect("start should succeed");

    sim.companion().set_installed(false);
    let snapshot = sim.settle("after uninstall").await;

    assert!(!snapshot.connection.installed);
    assert!(snapshot.connection.reachable);
    assert_eq!(snapshot.workout.workout_type(), Some("Cycling"));

    sim.companion().set_installed(true);
    assert!(sim.settle("after reinstall").await.connection.installed);
    sim.stop().await;
}

#[tokio::test(start_paused = true)]
async fn commands_and_replies_travel_as_cbor() {
    let mut sim = started(SimCompanionConfig::default()).await;
    assert_eq!(sim.companion().wire_bytes(), 0);

    sim.handle().start_workout("Running").wait().await.expect("start should succeed");
    let after_command = sim.companion().wire_bytes();
    assert!(after_command > 0);

    sim.companion().push_metrics(true);
    sim.settle("after push").await;
    assert!(sim.companion().wire_bytes() > after_command);
    assert_eq!(sim.companion().receipts(), 1);
    sim.stop().await;
}

#[tokio::test(start_paused = true)]
async fn oversized_command_fails_on_the_wire() {
    let mut sim = started(SimCompanionConfig::default()).await;
    let name = "x".repeat(Payload::MAX_ENCODED_SIZE);

    let err = sim.handle().start_workout(name).wait().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TransportFailure);
    assert!(err.to_string().contains("payload too large"));
    assert!(sim.companion().workout().is_none());
    assert!(!sim.settle("after oversized command").await.workout.is_active());
    sim.stop().await;
}

#[tokio::test(start_paused = true)]
async fn oversized_push_never_reaches_the_phone() {
    let mut sim = started(SimCompanionConfig::default()).await;
    let padding = "x".repeat(Payload::MAX_ENCODED_SIZE);

    sim.companion().push(Payload::new().with(keys::STEPS, 900i64).with("padding", padding), true);
    let snapshot = sim.settle("after oversized push").await;

    assert_eq!(snapshot.metrics.steps, None);
    assert_eq!(sim.companion().receipts(), 0);
    sim.stop().await;
}
