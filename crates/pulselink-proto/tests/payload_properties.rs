//! Property-based tests for the payload contract.
//!
//! These check behaviour that must hold for ALL inputs: decoding never panics
//! on hostile bytes, unrelated keys never leak into metric extraction, and
//! commands survive the wire unchanged whatever the workout name.

use proptest::prelude::*;
use pulselink_proto::{Command, MetricUpdate, Payload, Value, keys};

fn arbitrary_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1.0e6f64..1.0e6).prop_map(Value::Float),
        "[a-zA-Z ]{0,16}".prop_map(Value::Text),
    ]
}

fn arbitrary_update() -> impl Strategy<Value = MetricUpdate> {
    (
        proptest::option::of(30.0f64..220.0),
        proptest::option::of(0i64..100_000),
        proptest::option::of(0.0f64..5_000.0),
        proptest::option::of(0.0f64..100.0),
    )
        .prop_map(|(heart_rate, steps, active_energy, distance)| MetricUpdate {
            heart_rate,
            steps,
            active_energy,
            distance,
        })
}

proptest! {
    #[test]
    fn prop_decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = Payload::decode(&bytes);
    }

    #[test]
    fn prop_unrelated_keys_do_not_affect_metrics(
        update in arbitrary_update(),
        extra in prop::collection::btree_map("x[a-z]{1,8}", arbitrary_value(), 0..8),
    ) {
        let mut payload = update.to_payload();
        for (key, value) in extra {
            payload.insert(key, value);
        }

        prop_assert_eq!(MetricUpdate::from_payload(&payload), update);
    }

    #[test]
    fn prop_metrics_survive_the_wire(update in arbitrary_update()) {
        let bytes = update.to_payload().to_bytes().expect("encode");
        let decoded = Payload::decode(&bytes).expect("decode");

        prop_assert_eq!(MetricUpdate::from_payload(&decoded), update);
    }

    #[test]
    fn prop_start_workout_keeps_arbitrary_names(name in "\\PC{0,32}") {
        let command = Command::start_workout(name.clone());
        let bytes = command.to_payload().to_bytes().expect("encode");
        let decoded = Payload::decode(&bytes).expect("decode");

        prop_assert_eq!(decoded.get_str(keys::WORKOUT_TYPE), Some(name.as_str()));
        prop_assert_eq!(Command::from_payload(&decoded), Ok(command));
    }
}
