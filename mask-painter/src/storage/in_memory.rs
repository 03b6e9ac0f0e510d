use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use super::{MASKS_KEY, MaskStore, PersistedMaskRecord, StoreError, TIMESTAMP_KEY};

/// Keeps serialized values in memory. Clones share the same map, so a test can hand one clone to
/// an editor and inspect or reuse the other.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    values: Arc<Mutex<HashMap<&'static str, String>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw JSON stored under `key`.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    pub fn set_raw(&self, key: &'static str, value: impl Into<String>) {
        self.lock().insert(key, value.into());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<&'static str, String>> {
        // A panic in another test thread must not hide the stored values
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl MaskStore for InMemoryStore {
    fn load(&self) -> Result<Vec<PersistedMaskRecord>, StoreError> {
        match self.raw(MASKS_KEY) {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, records: &[PersistedMaskRecord], now: i64) -> Result<(), StoreError> {
        let json = serde_json::to_string(records)?;
        let mut values = self.lock();
        values.insert(MASKS_KEY, json);
        values.insert(TIMESTAMP_KEY, now.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut values = self.lock();
        values.remove(MASKS_KEY);
        values.remove(TIMESTAMP_KEY);
        Ok(())
    }

    fn last_saved(&self) -> Result<Option<i64>, StoreError> {
        Ok(self
            .raw(TIMESTAMP_KEY)
            .and_then(|s| s.parse().ok()))
    }
}
