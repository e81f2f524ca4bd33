//! Property-based tests for the sync channel.
//!
//! Random interleavings of transport callbacks, pushes, commands and replies
//! must preserve:
//! - per-field last-write-wins for metrics
//! - no transmit while the companion is unreachable
//! - every command finishes exactly once
//! - the workout is only started or stopped by an acknowledged reply
//! - reachability and install flags equal the latest report

use std::{
    collections::BTreeSet,
    time::{Duration, Instant},
};

use proptest::prelude::*;
use pulselink_core::{
    ChannelAction, ChannelConfig, ChannelEvent, MetricSnapshot, RequestId, SyncChannel,
};
use pulselink_proto::{Command, MetricUpdate, Payload, keys};

#[derive(Debug, Clone)]
enum Op {
    Reachable(bool),
    Installed(bool),
    Push(MetricUpdate),
    Send(Command),
    /// Answer the oldest outstanding command
    Reply { success: bool, metrics: MetricUpdate },
    /// Fail the oldest outstanding command
    Fail,
    Advance(u64),
    Deactivate,
}

fn arbitrary_update() -> impl Strategy<Value = MetricUpdate> {
    (
        proptest::option::of(40.0f64..200.0),
        proptest::option::of(0i64..50_000),
        proptest::option::of(0.0f64..2_000.0),
        proptest::option::of(0.0f64..60.0),
    )
        .prop_map(|(heart_rate, steps, active_energy, distance)| MetricUpdate {
            heart_rate,
            steps,
            active_energy,
            distance,
        })
}

fn arbitrary_command() -> impl Strategy<Value = Command> {
    prop_oneof![
        prop_oneof![Just("Running"), Just("Cycling"), Just("Yoga")]
            .prop_map(|name| Command::start_workout(name)),
        Just(Command::StopWorkout),
        Just(Command::RequestSnapshot),
    ]
}

fn arbitrary_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => any::<bool>().prop_map(Op::Reachable),
        1 => any::<bool>().prop_map(Op::Installed),
        3 => arbitrary_update().prop_map(Op::Push),
        3 => arbitrary_command().prop_map(Op::Send),
        3 => (any::<bool>(), arbitrary_update())
            .prop_map(|(success, metrics)| Op::Reply { success, metrics }),
        1 => Just(Op::Fail),
        1 => (0u64..15_000).prop_map(Op::Advance),
        1 => Just(Op::Deactivate),
    ]
}

fn expect_merge(model: &mut MetricSnapshot, update: &MetricUpdate) {
    if let Some(v) = update.heart_rate {
        model.heart_rate = Some(v);
    }
    if let Some(v) = update.steps {
        model.steps = Some(v);
    }
    if let Some(v) = update.active_energy {
        model.active_energy = Some(v);
    }
    if let Some(v) = update.distance {
        model.distance = Some(v);
    }
}

proptest! {
    #[test]
    fn prop_channel_invariants(ops in prop::collection::vec(arbitrary_op(), 1..80)) {
        let t0 = Instant::now();
        let mut now = t0;
        let mut channel: SyncChannel = SyncChannel::new(ChannelConfig::default());
        channel.handle(ChannelEvent::Activate { supported: true });
        channel.handle(ChannelEvent::ActivationCompleted { error: None });

        let mut model = MetricSnapshot::default();
        let mut next_id = 0u64;
        let mut outstanding: Vec<(RequestId, Command)> = Vec::new();
        let mut finished: BTreeSet<RequestId> = BTreeSet::new();
        let mut issued = 0u64;
        let mut last_reachable = false;
        let mut last_installed = false;

        for op in ops {
            let reachable = channel.connection().reachable;
            let workout_before = channel.workout().clone();

            let (actions, answered) = match op {
                Op::Reachable(reachable) => {
                    last_reachable = reachable;
                    (channel.handle(ChannelEvent::ReachabilityChanged { reachable }), None)
                },
                Op::Installed(installed) => {
                    last_installed = installed;
                    (channel.handle(ChannelEvent::InstallStateChanged { installed }), None)
                },
                Op::Push(update) => {
                    expect_merge(&mut model, &update);
                    let payload = update.to_payload();
                    (channel.handle(ChannelEvent::MessageReceived { payload, reply: None }), None)
                },
                Op::Send(command) => {
                    next_id += 1;
                    issued += 1;
                    let request_id = RequestId(next_id);
                    let actions = channel.handle(ChannelEvent::SendCommand {
                        request_id,
                        command: command.clone(),
                        now,
                    });

                    let transmitted =
                        actions.iter().any(|a| matches!(a, ChannelAction::Transmit { .. }));
                    prop_assert_eq!(transmitted, reachable, "transmit iff reachable");
                    if transmitted {
                        outstanding.push((request_id, command));
                    }
                    (actions, None)
                },
                Op::Reply { success, metrics } => {
                    if outstanding.is_empty() {
                        continue;
                    }
                    let (request_id, command) = outstanding.remove(0);
                    let payload = match command {
                        Command::RequestSnapshot => {
                            expect_merge(&mut model, &metrics);
                            metrics.to_payload()
                        },
                        _ => Payload::new().with(keys::SUCCESS, success),
                    };
                    let actions =
                        channel.handle(ChannelEvent::ReplyReceived { request_id, payload });
                    (actions, Some((command, success)))
                },
                Op::Fail => {
                    if outstanding.is_empty() {
                        continue;
                    }
                    let (request_id, _) = outstanding.remove(0);
                    let reason = "link dropped".to_owned();
                    (channel.handle(ChannelEvent::SendFailed { request_id, reason }), None)
                },
                Op::Advance(ms) => {
                    now += Duration::from_millis(ms);
                    (channel.handle(ChannelEvent::Tick { now }), None)
                },
                Op::Deactivate => {
                    let mut actions = channel.handle(ChannelEvent::SessionDeactivated);
                    prop_assert!(actions.contains(&ChannelAction::Reactivate));
                    actions.extend(channel.handle(ChannelEvent::Activate { supported: true }));
                    (actions, None)
                },
            };

            for action in &actions {
                if let ChannelAction::CommandFinished { request_id, .. } = action {
                    prop_assert!(finished.insert(*request_id), "{} finished twice", request_id);
                    outstanding.retain(|(id, _)| id != request_id);
                }
            }

            match answered {
                Some((Command::StartWorkout { workout_type }, true)) => {
                    prop_assert_eq!(channel.workout().workout_type(), Some(workout_type.as_str()));
                },
                Some((Command::StopWorkout, true)) => {
                    prop_assert!(!channel.workout().is_active());
                },
                _ => {
                    prop_assert_eq!(channel.workout(), &workout_before);
                },
            }

            prop_assert_eq!(channel.metrics(), model);
            prop_assert_eq!(channel.connection().reachable, last_reachable);
            prop_assert_eq!(channel.connection().installed, last_installed);
            prop_assert_eq!(channel.pending_count(), outstanding.len());
        }

        // Late timeouts settle everything still outstanding
        channel.handle(ChannelEvent::Tick { now: now + Duration::from_secs(60) });
        prop_assert_eq!(channel.pending_count(), 0);
        prop_assert!(finished.len() as u64 <= issued);
    }
}
