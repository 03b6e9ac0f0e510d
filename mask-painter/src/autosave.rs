use chrono::TimeDelta;
use log::{debug, info, warn};

use crate::{
    BatchSession, MaskRef,
    storage::{MaskStore, PersistedMaskRecord, StoreError},
};

/// Records older than this are dropped on load.
pub const EXPIRY: TimeDelta = TimeDelta::hours(24);

/// One record per masked entry, stamped with `now`.
pub fn snapshot(session: &BatchSession, now: i64) -> Vec<PersistedMaskRecord> {
    session
        .entries()
        .iter()
        .filter_map(|e| {
            Some(PersistedMaskRecord {
                file_name: e.source.name.clone(),
                file_size: e.source.size,
                mask_data_url: e.mask.as_ref()?.as_str().to_string(),
                timestamp: now,
            })
        })
        .collect()
}

/// Overwrites the stored snapshot with the masks of `session`.
pub fn save(store: &dyn MaskStore, session: &BatchSession, now: i64) -> Result<usize, StoreError> {
    let records = snapshot(session, now);
    store.save(&records, now)?;
    debug!("Autosaved {} masks", records.len());
    Ok(records.len())
}

pub fn is_expired(record: &PersistedMaskRecord, now: i64) -> bool {
    now.saturating_sub(record.timestamp) >= EXPIRY.num_milliseconds()
}

/// Loads the stored records, dropping expired ones. If anything was dropped the store is
/// rewritten with the survivors.
pub fn load_valid(store: &dyn MaskStore, now: i64) -> Result<Vec<PersistedMaskRecord>, StoreError> {
    let records = store.load()?;
    let total = records.len();
    let valid: Vec<_> = records.into_iter().filter(|r| !is_expired(r, now)).collect();
    if valid.len() != total {
        info!("Purging {} expired masks", total - valid.len());
        store.save(&valid, now)?;
    }
    Ok(valid)
}

/// Assigns every valid record to the entries with the same `(name, size)`.
/// Returns the number of records which found an entry.
pub fn apply(session: &mut BatchSession, records: &[PersistedMaskRecord]) -> usize {
    records
        .iter()
        .filter(|r| match MaskRef::parse(&r.mask_data_url) {
            Ok(mask) => session.assign_by_key(&r.file_name, r.file_size, &mask) > 0,
            Err(e) => {
                warn!("Skipping stored mask of {}: {e}", r.file_name);
                false
            }
        })
        .count()
}
