use chrono::{DateTime, NaiveDate, Utc};

use super::{
    BiologicalSex, HealthDataType, HealthError, HealthStore, HealthStoreError, QuantitySample,
    SampleKind,
};

/// Quantity types the profile writes.
const SHARE: [SampleKind; 2] = [SampleKind::Height, SampleKind::BodyMass];

/// Everything the profile reads.
const READ: [HealthDataType; 7] = [
    HealthDataType::Quantity(SampleKind::Height),
    HealthDataType::Quantity(SampleKind::BodyMass),
    HealthDataType::DateOfBirth,
    HealthDataType::BiologicalSex,
    HealthDataType::Quantity(SampleKind::StepCount),
    HealthDataType::Quantity(SampleKind::ActiveEnergyBurned),
    HealthDataType::Quantity(SampleKind::HeartRate),
];

/// Profile fields read from the store. Each is `None` if missing or if its
/// read failed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UserProfile {
    /// Height in metres
    pub height_m: Option<f64>,
    /// Body mass in kilograms
    pub body_mass_kg: Option<f64>,
    /// Age in whole years
    pub age_years: Option<u32>,
    /// Biological sex
    pub biological_sex: Option<BiologicalSex>,
}

/// Outcome of [`HealthProfile::save_profile`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveReport {
    /// Kinds written successfully
    pub saved: Vec<SampleKind>,
    /// Kinds whose write failed, with the store's error
    pub failed: Vec<(SampleKind, HealthStoreError)>,
}

impl SaveReport {
    /// Whether every requested write succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Reads and writes the user's body profile through a [`HealthStore`].
#[derive(Debug, Clone)]
pub struct HealthProfile<S: HealthStore> {
    store: S,
    available: bool,
    authorized: bool,
}

impl<S: HealthStore> HealthProfile<S> {
    /// Wrap `store`, recording whether health data is available.
    pub fn new(store: S) -> Self {
        let available = store.is_available();
        if !available {
            tracing::warn!("health data is not available on this device");
        }
        Self { store, available, authorized: false }
    }

    /// Whether health data exists on this device.
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Whether a permission request has been granted.
    pub fn is_authorized(&self) -> bool {
        self.authorized
    }

    /// Ask for write access to height and body mass and read access to the
    /// profile and workout metrics.
    ///
    /// # Errors
    ///
    /// - `HealthError::Unavailable` if the device has no health data
    /// - `HealthError::AuthorizationDenied` if the user declined
    /// - `HealthError::Store` if the request itself failed
    pub fn request_permissions(&mut self) -> Result<(), HealthError> {
        if !self.available {
            return Err(HealthError::Unavailable);
        }

        let granted = self.store.request_authorization(&SHARE, &READ).inspect_err(|e| {
            tracing::error!(error = %e, "health authorization request failed");
        })?;

        if !granted {
            tracing::warn!("health authorization denied");
            return Err(HealthError::AuthorizationDenied);
        }

        tracing::info!("health authorization granted");
        self.authorized = true;
        Ok(())
    }

    /// Read the stored profile. Age is computed against `today`.
    ///
    /// Never fails as a whole: a field whose read fails is logged and left
    /// empty.
    pub fn read_profile(&self, today: NaiveDate) -> UserProfile {
        UserProfile {
            height_m: self.latest_value(SampleKind::Height),
            body_mass_kg: self.latest_value(SampleKind::BodyMass),
            age_years: self
                .characteristic("date of birth", self.store.date_of_birth())
                .and_then(|dob| today.years_since(dob)),
            biological_sex: self.characteristic("biological sex", self.store.biological_sex()),
        }
    }

    /// Write the provided height (m) and body mass (kg) as new samples dated
    /// `now`.
    ///
    /// # Errors
    ///
    /// - `HealthError::AuthorizationDenied` if permissions were not granted
    ///
    /// Individual write failures do not fail the call; they are logged and
    /// listed in [`SaveReport::failed`].
    pub fn save_profile(
        &self,
        height_m: Option<f64>,
        body_mass_kg: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<SaveReport, HealthError> {
        if !self.authorized {
            return Err(HealthError::AuthorizationDenied);
        }

        let mut report = SaveReport::default();
        let writes = [(SampleKind::Height, height_m), (SampleKind::BodyMass, body_mass_kg)];

        for (kind, value) in writes {
            let Some(value) = value else { continue };
            let sample = QuantitySample { kind, value, recorded_at: now };

            match self.store.save(&sample) {
                Ok(()) => {
                    tracing::debug!(%kind, value, unit = kind.unit(), "saved sample");
                    report.saved.push(kind);
                },
                Err(e) => {
                    tracing::error!(%kind, error = %e, "failed to save sample");
                    report.failed.push((kind, e));
                },
            }
        }

        Ok(report)
    }

    fn latest_value(&self, kind: SampleKind) -> Option<f64> {
        match self.store.most_recent(kind) {
            Ok(sample) => sample.map(|s| s.value),
            Err(e) => {
                tracing::warn!(%kind, error = %e, "failed to read latest sample");
                None
            },
        }
    }

    fn characteristic<T>(
        &self,
        name: &str,
        result: Result<Option<T>, HealthStoreError>,
    ) -> Option<T> {
        result.unwrap_or_else(|e| {
            tracing::warn!(characteristic = name, error = %e, "failed to read characteristic");
            None
        })
    }
}
