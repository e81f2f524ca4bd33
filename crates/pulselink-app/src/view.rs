//! Presentation model.
//!
//! Pure functions from channel and health state to what a dashboard shows.
//! Frontends render these values; they never read channel state directly.
//! [`Dashboard::shown`] is the one call a frontend makes back into the
//! channel, when the metrics view appears.

use std::fmt;

use pulselink_core::{ChannelSnapshot, HealthProfile, HealthStore, MetricSnapshot};
use thiserror::Error;

use crate::{ChannelHandle, CommandTicket};

/// Placeholder for a metric that has not been reported yet.
pub const PLACEHOLDER: &str = "--";

/// Workout types the picker offers, in display order.
pub const WORKOUT_CATALOG: [&str; 6] =
    ["Running", "Walking", "Cycling", "Swimming", "Strength Training", "Yoga"];

/// Health-data access as shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthStatus {
    /// Health data exists on this device
    pub available: bool,
    /// Permissions were granted
    pub authorized: bool,
}

impl HealthStatus {
    /// Status of `profile`.
    pub fn from_profile<S: HealthStore>(profile: &HealthProfile<S>) -> Self {
        Self { available: profile.is_available(), authorized: profile.is_authorized() }
    }
}

/// One line of the companion status card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    /// Row label
    pub title: &'static str,
    /// Check mark or cross
    pub active: bool,
    /// Extra detail shown next to the label
    pub subtitle: Option<String>,
}

/// One metric tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricCard {
    /// Metric name
    pub title: &'static str,
    /// Formatted value or [`PLACEHOLDER`]
    pub value: String,
    /// Unit label
    pub unit: &'static str,
}

/// Primary workout button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkoutButton {
    /// No workout running
    Start,
    /// Workout running
    Stop,
}

impl fmt::Display for WorkoutButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("Start"),
            Self::Stop => f.write_str("Stop"),
        }
    }
}

/// Workout control card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkoutControl {
    /// Which button is offered
    pub button: WorkoutButton,
    /// Picker selection; shown as "Current" only while a workout runs
    pub current: Option<String>,
}

/// Health summary card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthSummary {
    /// Permissions were granted
    pub authorized: bool,
    /// Hint text under the card title
    pub message: &'static str,
}

impl HealthSummary {
    /// Hint shown once permissions were granted.
    pub const AUTHORIZED: &'static str = "HealthKit is authorized and ready to sync data";
    /// Hint shown until permissions are granted.
    pub const UNAUTHORIZED: &'static str =
        "Tap the HealthKit button in Settings to enable data access";
}

/// Everything the dashboard screen shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    /// Companion status rows
    pub status: Vec<StatusRow>,
    /// Metric tiles: heart rate, steps, active energy, distance
    pub metrics: [MetricCard; 4],
    /// Workout control card
    pub workout: WorkoutControl,
    /// Health summary card
    pub health: HealthSummary,
}

impl Dashboard {
    /// Build the dashboard for `snapshot`.
    ///
    /// `selected` is the picker's current workout type.
    pub fn from_snapshot(
        snapshot: &ChannelSnapshot,
        health: HealthStatus,
        selected: &str,
    ) -> Self {
        let mut status = vec![
            StatusRow {
                title: "Watch App Installed",
                active: snapshot.connection.installed,
                subtitle: None,
            },
            StatusRow {
                title: "Watch Reachable",
                active: snapshot.connection.reachable,
                subtitle: None,
            },
        ];

        let running = snapshot.workout.is_active();
        if running {
            status.push(StatusRow {
                title: "Active Workout",
                active: true,
                subtitle: Some(snapshot.workout.workout_type().unwrap_or("Unknown").to_owned()),
            });
        }

        let workout = if running {
            WorkoutControl { button: WorkoutButton::Stop, current: Some(selected.to_owned()) }
        } else {
            WorkoutControl { button: WorkoutButton::Start, current: None }
        };

        let health = if health.authorized {
            HealthSummary { authorized: true, message: HealthSummary::AUTHORIZED }
        } else {
            HealthSummary { authorized: false, message: HealthSummary::UNAUTHORIZED }
        };

        Self { status, metrics: metric_cards(&snapshot.metrics), workout, health }
    }

    /// Hook for the moment the metrics view appears.
    ///
    /// Asks the companion for its current readings so the cards fill without
    /// waiting for the next push.
    pub fn shown(handle: &ChannelHandle) -> CommandTicket {
        handle.request_snapshot()
    }
}

impl fmt::Display for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.status {
            let mark = if row.active { "yes" } else { "no" };
            match &row.subtitle {
                Some(subtitle) => write!(f, "{}: {mark} ({subtitle}) | ", row.title)?,
                None => write!(f, "{}: {mark} | ", row.title)?,
            }
        }
        for card in &self.metrics {
            write!(f, "{} {} {} | ", card.title, card.value, card.unit)?;
        }
        write!(f, "[{}]", self.workout.button)?;
        if let Some(current) = &self.workout.current {
            write!(f, " Current: {current}")?;
        }
        Ok(())
    }
}

fn metric_cards(metrics: &MetricSnapshot) -> [MetricCard; 4] {
    let format_or_placeholder =
        |value: Option<String>| value.unwrap_or_else(|| PLACEHOLDER.to_owned());

    [
        MetricCard {
            title: "Heart Rate",
            // Whole beats, truncated
            value: format_or_placeholder(
                metrics.heart_rate.map(|bpm| format!("{:.0}", bpm.trunc())),
            ),
            unit: "BPM",
        },
        MetricCard {
            title: "Steps",
            value: format_or_placeholder(metrics.steps.map(|steps| steps.to_string())),
            unit: "steps",
        },
        MetricCard {
            title: "Active Energy",
            value: format_or_placeholder(metrics.active_energy.map(|kcal| format!("{kcal:.1}"))),
            unit: "kcal",
        },
        MetricCard {
            title: "Distance",
            value: format_or_placeholder(metrics.distance.map(|km| format!("{km:.2}"))),
            unit: "km",
        },
    ]
}

/// Error returned when selecting a workout outside [`WORKOUT_CATALOG`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown workout type: {0}")]
pub struct UnknownWorkout(pub String);

/// Workout catalog with the current selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkoutPicker {
    selected: &'static str,
}

impl WorkoutPicker {
    /// Picker with `Running` selected.
    pub fn new() -> Self {
        Self { selected: WORKOUT_CATALOG[0] }
    }

    /// Offered workout types.
    pub fn catalog(&self) -> &'static [&'static str] {
        &WORKOUT_CATALOG
    }

    /// Current selection.
    pub fn selected(&self) -> &'static str {
        self.selected
    }

    /// Select `workout_type`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownWorkout` if the name is not in the catalog; the
    /// selection is left unchanged.
    pub fn select(&mut self, workout_type: &str) -> Result<(), UnknownWorkout> {
        let Some(entry) = WORKOUT_CATALOG.iter().find(|name| **name == workout_type) else {
            return Err(UnknownWorkout(workout_type.to_owned()));
        };
        self.selected = entry;
        Ok(())
    }
}

impl Default for WorkoutPicker {
    fn default() -> Self {
        Self::new()
    }
}
