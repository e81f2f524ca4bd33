//! Payload keys shared by both ends of the channel.

/// Command selector.
pub const ACTION: &str = "action";
/// Workout type, only present on `startWorkout`.
pub const WORKOUT_TYPE: &str = "workoutType";
/// Heart rate in beats per minute.
pub const HEART_RATE: &str = "heartRate";
/// Step count.
pub const STEPS: &str = "steps";
/// Active energy in kilocalories.
pub const ACTIVE_ENERGY: &str = "activeEnergy";
/// Distance in kilometres.
pub const DISTANCE: &str = "distance";
/// Command acknowledgment flag.
pub const SUCCESS: &str = "success";
/// Receipt flag sent back for unsolicited pushes.
pub const RECEIVED: &str = "received";
