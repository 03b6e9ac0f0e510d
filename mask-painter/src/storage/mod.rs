//! Durable key-value storage for autosaved masks.

use std::io;

#[cfg(not(target_arch = "wasm32"))]
pub mod file;
pub mod in_memory;

/// Key under which the mask snapshot is stored.
pub const MASKS_KEY: &str = "batchImageMasks";
/// Sibling key holding the epoch-ms of the last write.
pub const TIMESTAMP_KEY: &str = "autoSaveTimestamp";

/// One autosaved mask, matched against loaded images by `(file_name, file_size)`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedMaskRecord {
    pub file_name: String,
    pub file_size: u64,
    pub mask_data_url: String,
    /// Epoch-ms when the record was written.
    pub timestamp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage io: {0}")]
    Io(#[from] io::Error),
    #[error("stored masks are corrupted: {0}")]
    Corrupted(#[from] serde_json::Error),
}

/// Port to the autosave store. Implementations overwrite, they never merge.
pub trait MaskStore {
    fn load(&self) -> Result<Vec<PersistedMaskRecord>, StoreError>;
    fn save(&self, records: &[PersistedMaskRecord], now: i64) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
    /// Epoch-ms of the last successful `save`.
    fn last_saved(&self) -> Result<Option<i64>, StoreError>;
}
