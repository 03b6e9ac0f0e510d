//! History is a stack of mask snapshots. Each snapshot holds the mask reference of every entry,
//! so undo just hands back the previous one. Snapshots share their encoded masks.

use crate::MaskRef;

pub type MaskSnapshot = Vec<Option<MaskRef>>;

pub struct History {
    snapshots: Vec<MaskSnapshot>,
    // Index of the snapshot which reflects the current state
    current: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl History {
    pub fn new(initial: MaskSnapshot) -> Self {
        Self {
            snapshots: vec![initial],
            current: 0,
        }
    }

    /// Forgets everything and starts over from `initial`.
    pub fn reset(&mut self, initial: MaskSnapshot) {
        *self = Self::new(initial);
    }

    pub fn push(&mut self, snapshot: MaskSnapshot) {
        if self.snapshots.get(self.current) == Some(&snapshot) {
            return;
        }
        self.snapshots.truncate(self.current + 1);
        self.snapshots.push(snapshot);
        self.current = self.snapshots.len() - 1;
    }

    pub fn can_undo(&self) -> bool {
        self.current > 0
    }

    pub fn can_redo(&self) -> bool {
        self.current + 1 < self.snapshots.len()
    }

    pub fn undo(&mut self) -> Option<&MaskSnapshot> {
        self.current = self.current.checked_sub(1)?;
        self.snapshots.get(self.current)
    }

    pub fn redo(&mut self) -> Option<&MaskSnapshot> {
        if !self.can_redo() {
            return None;
        }
        self.current += 1;
        self.snapshots.get(self.current)
    }
}
