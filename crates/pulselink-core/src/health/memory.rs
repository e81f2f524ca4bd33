use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::NaiveDate;

use super::{
    BiologicalSex, HealthDataType, HealthStore, HealthStoreError, QuantitySample, SampleKind,
};

/// In-memory health store for tests and the simulated CLI.
///
/// State is behind `Arc<Mutex<>>` so clones share it. Individual sample kinds
/// can be made to fail on read or save to exercise partial-failure paths.
#[derive(Debug, Clone)]
pub struct MemoryHealthStore {
    inner: Arc<Mutex<MemoryHealthStoreInner>>,
}

#[derive(Debug)]
struct MemoryHealthStoreInner {
    available: bool,
    grant: bool,
    authorized: bool,
    samples: Vec<QuantitySample>,
    date_of_birth: Option<NaiveDate>,
    biological_sex: Option<BiologicalSex>,
    failing_reads: BTreeSet<SampleKind>,
    failing_saves: BTreeSet<SampleKind>,
    authorization_requests: usize,
}

impl MemoryHealthStore {
    /// Available store that grants every authorization request.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryHealthStoreInner {
                available: true,
                grant: true,
                authorized: false,
                samples: Vec::new(),
                date_of_birth: None,
                biological_sex: None,
                failing_reads: BTreeSet::new(),
                failing_saves: BTreeSet::new(),
                authorization_requests: 0,
            })),
        }
    }

    /// Store on a device without health data.
    pub fn unavailable() -> Self {
        let store = Self::new();
        store.lock().available = false;
        store
    }

    /// Whether future authorization requests are granted.
    pub fn set_grant(&self, grant: bool) {
        self.lock().grant = grant;
    }

    /// Set the date of birth characteristic.
    pub fn set_date_of_birth(&self, date: NaiveDate) {
        self.lock().date_of_birth = Some(date);
    }

    /// Set the biological sex characteristic.
    pub fn set_biological_sex(&self, sex: BiologicalSex) {
        self.lock().biological_sex = Some(sex);
    }

    /// Make reads of `kind` fail with a backend error.
    pub fn fail_reads(&self, kind: SampleKind) {
        self.lock().failing_reads.insert(kind);
    }

    /// Make saves of `kind` fail with a backend error.
    pub fn fail_saves(&self, kind: SampleKind) {
        self.lock().failing_saves.insert(kind);
    }

    /// Insert a sample directly, bypassing authorization.
    pub fn insert(&self, sample: QuantitySample) {
        self.lock().samples.push(sample);
    }

    /// All stored samples of `kind`, oldest first.
    pub fn samples(&self, kind: SampleKind) -> Vec<QuantitySample> {
        let mut samples: Vec<_> =
            self.lock().samples.iter().filter(|s| s.kind == kind).cloned().collect();
        samples.sort_by_key(|s| s.recorded_at);
        samples
    }

    /// Number of authorization prompts shown so far.
    pub fn authorization_requests(&self) -> usize {
        self.lock().authorization_requests
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test and
    /// simulation code.
    #[allow(clippy::expect_used)]
    fn lock(&self) -> MutexGuard<'_, MemoryHealthStoreInner> {
        self.inner.lock().expect("Mutex poisoned")
    }
}

impl Default for MemoryHealthStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthStore for MemoryHealthStore {
    fn is_available(&self) -> bool {
        self.lock().available
    }

    fn request_authorization(
        &self,
        _share: &[SampleKind],
        _read: &[HealthDataType],
    ) -> Result<bool, HealthStoreError> {
        let mut inner = self.lock();
        if !inner.available {
            return Err(HealthStoreError::Backend("health data unavailable".to_owned()));
        }

        inner.authorization_requests += 1;
        inner.authorized = inner.grant;
        Ok(inner.grant)
    }

    fn most_recent(&self, kind: SampleKind) -> Result<Option<QuantitySample>, HealthStoreError> {
        let inner = self.lock();
        if inner.failing_reads.contains(&kind) {
            return Err(HealthStoreError::Backend(format!("query for {kind} failed")));
        }

        let latest = inner.samples.iter().filter(|s| s.kind == kind).max_by_key(|s| s.recorded_at);
        Ok(latest.cloned())
    }

    fn save(&self, sample: &QuantitySample) -> Result<(), HealthStoreError> {
        let mut inner = self.lock();
        if !inner.authorized {
            return Err(HealthStoreError::NotAuthorized(sample.kind));
        }
        if inner.failing_saves.contains(&sample.kind) {
            return Err(HealthStoreError::Backend(format!("save of {} failed", sample.kind)));
        }

        inner.samples.push(sample.clone());
        Ok(())
    }

    fn date_of_birth(&self) -> Result<Option<NaiveDate>, HealthStoreError> {
        Ok(self.lock().date_of_birth)
    }

    fn biological_sex(&self) -> Result<Option<BiologicalSex>, HealthStoreError> {
        Ok(self.lock().biological_sex)
    }
}
