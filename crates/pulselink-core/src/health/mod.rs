//! Health-data store abstraction and the user profile built on it.
//!
//! [`HealthStore`] is synchronous, like the rest of this crate: platform
//! stores that answer asynchronously are wrapped by the host before they get
//! here. [`HealthProfile`] is the only consumer.

mod memory;
mod profile;

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
pub use memory::MemoryHealthStore;
pub use profile::{HealthProfile, SaveReport, UserProfile};
use thiserror::Error;

use crate::ErrorKind;

/// Quantity types the profile reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SampleKind {
    /// Body height
    Height,
    /// Body mass
    BodyMass,
    /// Step count
    StepCount,
    /// Active energy burned
    ActiveEnergyBurned,
    /// Heart rate
    HeartRate,
}

impl SampleKind {
    /// Unit every sample of this kind is stored in.
    pub fn unit(self) -> &'static str {
        match self {
            Self::Height => "m",
            Self::BodyMass => "kg",
            Self::StepCount => "count",
            Self::ActiveEnergyBurned => "kcal",
            Self::HeartRate => "count/min",
        }
    }
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Height => "height",
            Self::BodyMass => "body mass",
            Self::StepCount => "step count",
            Self::ActiveEnergyBurned => "active energy",
            Self::HeartRate => "heart rate",
        };
        f.write_str(name)
    }
}

/// Anything that can appear in an authorization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthDataType {
    /// Timestamped quantity samples
    Quantity(SampleKind),
    /// Date of birth characteristic
    DateOfBirth,
    /// Biological sex characteristic
    BiologicalSex,
}

/// One stored measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantitySample {
    /// What was measured
    pub kind: SampleKind,
    /// Value in [`SampleKind::unit`]
    pub value: f64,
    /// When the measurement was taken
    pub recorded_at: DateTime<Utc>,
}

/// Biological sex characteristic as stored by the health store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BiologicalSex {
    /// User has not set it
    NotSet,
    /// Female
    Female,
    /// Male
    Male,
    /// Other
    Other,
}

impl fmt::Display for BiologicalSex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotSet => "not set",
            Self::Female => "female",
            Self::Male => "male",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Failure of a single store call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HealthStoreError {
    /// Caller lacks authorization for this data type
    #[error("not authorized to access {0}")]
    NotAuthorized(SampleKind),

    /// Store backend failed
    #[error("health store failure: {0}")]
    Backend(String),
}

/// Errors reported by [`HealthProfile`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HealthError {
    /// Health data is not available on this device
    #[error("health data is not available on this device")]
    Unavailable,

    /// User declined, or the operation needs an authorization not yet granted
    #[error("health data authorization denied")]
    AuthorizationDenied,

    /// Store call failed
    #[error(transparent)]
    Store(#[from] HealthStoreError),
}

impl HealthError {
    /// Classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unavailable => ErrorKind::Unavailable,
            Self::AuthorizationDenied | Self::Store(HealthStoreError::NotAuthorized(_)) => {
                ErrorKind::AuthorizationDenied
            },
            Self::Store(HealthStoreError::Backend(_)) => ErrorKind::TransportFailure,
        }
    }
}

/// Health-data store.
///
/// Must be Clone + Send + Sync and synchronous. Implementations share their
/// state, so clones observe the same samples.
pub trait HealthStore: Clone + Send + Sync + 'static {
    /// Whether health data exists on this device at all.
    fn is_available(&self) -> bool;

    /// Ask the user for access.
    ///
    /// Returns `Ok(true)` if the request was granted, `Ok(false)` if the user
    /// declined.
    fn request_authorization(
        &self,
        share: &[SampleKind],
        read: &[HealthDataType],
    ) -> Result<bool, HealthStoreError>;

    /// Most recent sample of `kind`. `None` if nothing was ever recorded.
    fn most_recent(&self, kind: SampleKind) -> Result<Option<QuantitySample>, HealthStoreError>;

    /// Persist a new sample.
    fn save(&self, sample: &QuantitySample) -> Result<(), HealthStoreError>;

    /// Date of birth characteristic. `None` if not set.
    fn date_of_birth(&self) -> Result<Option<NaiveDate>, HealthStoreError>;

    /// Biological sex characteristic. `None` if not readable.
    fn biological_sex(&self) -> Result<Option<BiologicalSex>, HealthStoreError>;
}
