use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use log::{debug, info};

use super::{MASKS_KEY, MaskStore, PersistedMaskRecord, StoreError, TIMESTAMP_KEY};

/// One file per key inside `base`.
pub struct FileStore {
    base: PathBuf,
}

impl FileStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn path(&self, key: &str) -> PathBuf {
        self.base.join(key)
    }

    fn read(&self, key: &str) -> io::Result<Option<String>> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Writes next to the target and renames over it.
    fn write(&self, key: &str, value: &[u8]) -> io::Result<()> {
        std::fs::create_dir_all(&self.base)?;
        let target = self.path(key);
        let tmp = self.path(&format!("{key}.tmp"));
        let mut f = std::fs::File::create(&tmp)?;
        f.write_all(value)?;
        f.sync_all()?;
        std::fs::rename(tmp, target)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match std::fs::remove_file(self.path(key)) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl MaskStore for FileStore {
    fn load(&self) -> Result<Vec<PersistedMaskRecord>, StoreError> {
        match self.read(MASKS_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, records: &[PersistedMaskRecord], now: i64) -> Result<(), StoreError> {
        let json = serde_json::to_vec(records)?;
        debug!("Store {} masks at: {:?}", records.len(), self.base);
        self.write(MASKS_KEY, &json)?;
        self.write(TIMESTAMP_KEY, now.to_string().as_bytes())?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        info!("Clearing autosave in {:?}", self.base);
        self.remove(MASKS_KEY)?;
        self.remove(TIMESTAMP_KEY)?;
        Ok(())
    }

    fn last_saved(&self) -> Result<Option<i64>, StoreError> {
        Ok(self
            .read(TIMESTAMP_KEY)?
            .and_then(|s| s.trim().parse().ok()))
    }
}
