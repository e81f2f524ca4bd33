//! Inbound metric updates.

use crate::{Payload, keys};

/// Metric fields carried by a reply or unsolicited push.
///
/// Every field is optional: `None` means the payload did not carry that key
/// (or carried it with an unusable type), not that the metric is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricUpdate {
    /// Heart rate in beats per minute.
    pub heart_rate: Option<f64>,
    /// Step count.
    pub steps: Option<i64>,
    /// Active energy in kilocalories.
    pub active_energy: Option<f64>,
    /// Distance in kilometres.
    pub distance: Option<f64>,
}

impl MetricUpdate {
    /// Extract metric fields from a payload.
    ///
    /// Keys with the wrong type are skipped individually; unrelated keys
    /// (`action`, `success`, ...) are ignored.
    pub fn from_payload(payload: &Payload) -> Self {
        Self {
            heart_rate: payload.get_f64(keys::HEART_RATE),
            steps: payload.get_i64(keys::STEPS),
            active_energy: payload.get_f64(keys::ACTIVE_ENERGY),
            distance: payload.get_f64(keys::DISTANCE),
        }
    }

    /// Encode the present fields (companion side).
    pub fn to_payload(&self) -> Payload {
        let mut payload = Payload::new();
        if let Some(heart_rate) = self.heart_rate {
            payload.insert(keys::HEART_RATE, heart_rate);
        }
        if let Some(steps) = self.steps {
            payload.insert(keys::STEPS, steps);
        }
        if let Some(active_energy) = self.active_energy {
            payload.insert(keys::ACTIVE_ENERGY, active_energy);
        }
        if let Some(distance) = self.distance {
            payload.insert(keys::DISTANCE, distance);
        }
        payload
    }

    /// Whether no metric field is present.
    pub fn is_empty(&self) -> bool {
        self.heart_rate.is_none()
            && self.steps.is_none()
            && self.active_energy.is_none()
            && self.distance.is_none()
    }
}
