//! Process-wide record of which periodic work is installed.

use chrono::{DateTime, Utc};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError},
    time::Duration,
};
use uuid::Uuid;

/// A periodic registration as installed with the host scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleHandle {
    pub name: String,
    /// Changes on every (re-)registration
    pub id: Uuid,
    pub interval: Duration,
    pub flex: Duration,
    pub registered_at: DateTime<Utc>,
}

impl ScheduleHandle {
    #[must_use]
    pub fn new(name: &str, interval: Duration, flex: Duration) -> Self {
        Self {
            name: name.to_string(),
            id: Uuid::new_v4(),
            interval,
            flex,
            registered_at: Utc::now(),
        }
    }
}

/// Process-wide record of active periodic registrations, one per name
#[derive(Debug, Default)]
pub struct ScheduleRegistry {
    handles: Mutex<HashMap<String, ScheduleHandle>>,
}

static GLOBAL_REGISTRY: OnceLock<Arc<ScheduleRegistry>> = OnceLock::new();

impl ScheduleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by the whole process
    #[must_use]
    pub fn global() -> Arc<Self> {
        GLOBAL_REGISTRY
            .get_or_init(|| Arc::new(Self::new()))
            .clone()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ScheduleHandle>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install a handle under `name`, replacing any previous one.
    ///
    /// `install` runs while the registry is locked, so concurrent installs of
    /// the same name cannot interleave. Returns the new handle and the one it
    /// replaced.
    ///
    /// # Errors
    ///
    /// Propagates the error from `install`, leaving the registry untouched.
    pub fn install_with<E>(
        &self,
        name: &str,
        install: impl FnOnce() -> Result<ScheduleHandle, E>,
    ) -> Result<(ScheduleHandle, Option<ScheduleHandle>), E> {
        let mut handles = self.lock();
        let handle = install()?;
        let replaced = handles.insert(name.to_string(), handle.clone());
        Ok((handle, replaced))
    }

    /// Remove the handle under `name`, running `cancel` while locked.
    pub fn remove_with(&self, name: &str, cancel: impl FnOnce()) -> Option<ScheduleHandle> {
        let mut handles = self.lock();
        cancel();
        handles.remove(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<ScheduleHandle> {
        self.lock().get(name).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
