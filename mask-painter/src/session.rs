use std::sync::Arc;

use itertools::Itertools;
use log::debug;

use crate::{DataUrl, MaskRef, SourceFile, stroke::Tool};

/// Identity used to match persisted masks against loaded images.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileKey {
    pub name: String,
    pub size: u64,
}

impl FileKey {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProcessingState {
    #[default]
    Idle,
    Processing,
    Processed {
        result: String,
    },
    Failed {
        message: String,
    },
}

impl ProcessingState {
    pub fn result(&self) -> Option<&str> {
        match self {
            ProcessingState::Processed { result } => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ProcessingState::Failed { message } => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageEntry {
    pub source: Arc<SourceFile>,
    /// Reference to the original pixels, handed to the processing service.
    pub preview: DataUrl,
    pub mask: Option<MaskRef>,
    pub state: ProcessingState,
}

impl ImageEntry {
    pub fn new(source: SourceFile) -> Self {
        let preview = source.to_data_url();
        Self {
            source: Arc::new(source),
            preview,
            mask: None,
            state: ProcessingState::Idle,
        }
    }

    pub fn key(&self) -> FileKey {
        FileKey::new(self.source.name.clone(), self.source.size)
    }

    pub fn matches(&self, name: &str, size: u64) -> bool {
        self.source.name == name && self.source.size == size
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BrushRadius(u32);

impl BrushRadius {
    pub const MIN: u32 = 5;
    pub const MAX: u32 = 100;
    pub const STEP: u32 = 5;

    pub fn new(radius: u32) -> Self {
        Self(radius.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn grow(self) -> Self {
        Self::new(self.0.saturating_add(Self::STEP))
    }

    pub fn shrink(self) -> Self {
        Self::new(self.0.saturating_sub(Self::STEP))
    }
}

impl Default for BrushRadius {
    fn default() -> Self {
        Self(30)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("No images loaded")]
    NoImages,
    #[error("Select the areas to remove on the current image first")]
    NoMask,
    #[error("No masked images waiting for processing")]
    NothingToSubmit,
    #[error("Processing is already running")]
    AlreadyProcessing,
}

/// Images, masks and editor state of one working set.
///
/// Entries are held in a shared slice which is replaced as a whole on every change, so cloning
/// a session is cheap and earlier clones stay untouched snapshots.
#[derive(Debug, Clone, Default)]
pub struct BatchSession {
    entries: Arc<[ImageEntry]>,
    selected: Option<usize>,
    tool: Tool,
    brush: BrushRadius,
}

impl BatchSession {
    pub fn with_brush(brush: BrushRadius) -> Self {
        Self {
            brush,
            ..Default::default()
        }
    }

    pub fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected(&self) -> Option<&ImageEntry> {
        self.entries.get(self.selected?)
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn brush(&self) -> BrushRadius {
        self.brush
    }

    pub fn masked_count(&self) -> usize {
        self.entries.iter().filter(|e| e.mask.is_some()).count()
    }

    pub fn is_processing(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.state == ProcessingState::Processing)
    }

    pub fn can_submit(&self) -> bool {
        self.masked_count() > 0 && !self.is_processing()
    }

    /// Entries a batch submit would send, in upload order.
    pub fn submittable(&self) -> Vec<usize> {
        self.entries
            .iter()
            .positions(|e| {
                e.mask.is_some()
                    && !matches!(
                        e.state,
                        ProcessingState::Processed { .. } | ProcessingState::Processing
                    )
            })
            .collect()
    }

    fn update_entries(&mut self, f: impl FnOnce(&mut Vec<ImageEntry>)) {
        let mut entries = self.entries.to_vec();
        f(&mut entries);
        self.entries = entries.into();
    }

    fn update_entry(&mut self, index: usize, f: impl FnOnce(&mut ImageEntry)) -> bool {
        if index >= self.entries.len() {
            return false;
        }
        self.update_entries(|entries| f(&mut entries[index]));
        true
    }

    /// Appends in upload order. Selects the first image when the session was empty.
    pub fn add_images(&mut self, files: impl IntoIterator<Item = SourceFile>) -> usize {
        let before = self.entries.len();
        self.update_entries(|entries| entries.extend(files.into_iter().map(ImageEntry::new)));
        let added = self.entries.len() - before;
        if self.selected.is_none() && !self.entries.is_empty() {
            self.selected = Some(0);
        }
        added
    }

    /// Out of bounds indices are ignored. Returns whether the selection changed.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.entries.len() || self.selected == Some(index) {
            return false;
        }
        self.selected = Some(index);
        true
    }

    pub fn select_next(&mut self) -> bool {
        match self.selected {
            Some(i) => self.select(i + 1),
            None => false,
        }
    }

    pub fn select_previous(&mut self) -> bool {
        match self.selected.and_then(|i| i.checked_sub(1)) {
            Some(i) => self.select(i),
            None => false,
        }
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    pub fn set_brush(&mut self, brush: BrushRadius) {
        self.brush = brush;
    }

    /// Replaces the mask of entry `index` wholesale.
    pub fn set_mask(&mut self, index: usize, mask: Option<MaskRef>) -> bool {
        self.update_entry(index, |e| e.mask = mask)
    }

    pub fn clear_selected_mask(&mut self) -> Result<(), SessionError> {
        let index = self.selected.ok_or(SessionError::NoImages)?;
        self.set_mask(index, None);
        Ok(())
    }

    /// Copies the selected entry's mask reference onto every entry.
    pub fn apply_mask_to_all(&mut self) -> Result<usize, SessionError> {
        let mask = self
            .selected()
            .ok_or(SessionError::NoImages)?
            .mask
            .clone()
            .ok_or(SessionError::NoMask)?;
        self.update_entries(|entries| {
            for e in entries.iter_mut() {
                e.mask = Some(mask.clone());
            }
        });
        Ok(self.entries.len())
    }

    pub fn clear_all_masks(&mut self) {
        self.update_entries(|entries| entries.iter_mut().for_each(|e| e.mask = None));
    }

    /// Current mask of every entry, in order.
    pub fn masks(&self) -> Vec<Option<MaskRef>> {
        self.entries.iter().map(|e| e.mask.clone()).collect()
    }

    /// Restores masks taken with [`BatchSession::masks`]. Entries added since keep their mask.
    pub fn restore_masks(&mut self, masks: &[Option<MaskRef>]) {
        self.update_entries(|entries| {
            for (e, m) in entries.iter_mut().zip(masks) {
                e.mask = m.clone();
            }
        });
    }

    /// Assigns `mask` to every entry matching `(name, size)`. Returns the number of entries hit.
    pub fn assign_by_key(&mut self, name: &str, size: u64, mask: &MaskRef) -> usize {
        let hits: Vec<usize> = self.entries.iter().positions(|e| e.matches(name, size)).collect();
        if !hits.is_empty() {
            self.update_entries(|entries| {
                for &i in &hits {
                    entries[i].mask = Some(mask.clone());
                }
            });
        }
        hits.len()
    }

    pub fn set_state(&mut self, index: usize, state: ProcessingState) -> bool {
        debug!("Entry {index} -> {state:?}");
        self.update_entry(index, |e| e.state = state)
    }

    /// Drops every entry and the selection. Tool and brush survive.
    pub fn clear(&mut self) {
        self.entries = Arc::from([]);
        self.selected = None;
    }
}

#[cfg(test)]
mod tests {
    use image::GrayImage;

    use super::*;

    fn file(name: &str, len: usize) -> SourceFile {
        SourceFile::new(name, "image/png", vec![0u8; len])
    }

    fn mask(value: u8) -> MaskRef {
        MaskRef::encode(&GrayImage::from_pixel(2, 2, image::Luma([value]))).unwrap()
    }

    fn session_with(n: usize) -> BatchSession {
        let mut session = BatchSession::default();
        session.add_images((0..n).map(|i| file(&format!("{i}.png"), 10 + i)));
        session
    }

    #[test]
    fn first_upload_selects_first_image() {
        let mut session = BatchSession::default();
        assert_eq!(session.selected_index(), None);
        assert_eq!(session.add_images([file("a.png", 1), file("b.png", 2)]), 2);
        assert_eq!(session.selected_index(), Some(0));
        session.select(1);
        session.add_images([file("c.png", 3)]);
        assert_eq!(session.selected_index(), Some(1));
        assert_eq!(session.entries()[2].source.name, "c.png");
    }

    #[test]
    fn selection_is_clamped() {
        let mut session = session_with(2);
        assert!(!session.select(2));
        assert!(!session.select_previous());
        assert!(session.select_next());
        assert!(!session.select_next());
        assert_eq!(session.selected_index(), Some(1));
    }

    #[test]
    fn apply_mask_to_all_shares_bytes() {
        let mut session = session_with(3);
        session.set_mask(2, Some(mask(0)));
        session.set_mask(0, Some(mask(255)));
        assert_eq!(session.apply_mask_to_all(), Ok(3));
        let first = session.entries()[0].mask.clone().unwrap();
        assert!(
            session
                .entries()
                .iter()
                .all(|e| e.mask.as_ref().unwrap().shares_bytes_with(&first))
        );
        assert_eq!(session.masked_count(), 3);
    }

    #[test]
    fn apply_mask_to_all_without_mask_changes_nothing() {
        let mut session = session_with(2);
        session.set_mask(1, Some(mask(255)));
        let before = session.masks();
        assert_eq!(session.apply_mask_to_all(), Err(SessionError::NoMask));
        assert_eq!(session.masks(), before);
    }

    #[test]
    fn masked_count_follows_mutations() {
        let mut session = session_with(3);
        assert_eq!(session.masked_count(), 0);
        session.set_mask(0, Some(mask(255)));
        session.apply_mask_to_all().unwrap();
        assert_eq!(session.masked_count(), 3);
        session.clear_selected_mask().unwrap();
        assert_eq!(session.masked_count(), 2);
        session.clear_all_masks();
        assert_eq!(session.masked_count(), 0);
    }

    #[test]
    fn snapshots_are_not_affected_by_later_changes() {
        let mut session = session_with(1);
        let snapshot = session.clone();
        session.set_mask(0, Some(mask(255)));
        assert_eq!(snapshot.masked_count(), 0);
        assert_eq!(session.masked_count(), 1);
    }

    #[test]
    fn brush_radius_is_clamped() {
        let mut radius = BrushRadius::new(5);
        for _ in 0..5 {
            radius = radius.shrink();
        }
        assert_eq!(radius.get(), 5);
        assert_eq!(BrushRadius::new(98).grow().get(), 100);
        assert_eq!(BrushRadius::default().get(), 30);
    }

    #[test]
    fn submit_requires_masks_and_idle_entries() {
        let mut session = session_with(3);
        assert!(!session.can_submit());
        session.set_mask(1, Some(mask(255)));
        session.set_mask(2, Some(mask(255)));
        assert!(session.can_submit());
        session.set_state(
            2,
            ProcessingState::Processed {
                result: "https://out".into(),
            },
        );
        assert_eq!(session.submittable(), vec![1]);
        session.set_state(1, ProcessingState::Processing);
        assert!(!session.can_submit());
    }

    #[test]
    fn assign_by_key_needs_name_and_size() {
        let mut session = session_with(2);
        assert_eq!(session.assign_by_key("0.png", 11, &mask(255)), 0);
        assert_eq!(session.assign_by_key("0.png", 10, &mask(255)), 1);
        assert_eq!(session.masked_count(), 1);
    }
}
