//! Linear snapshot history with undo/redo.
//!
//! The store owns every committed `(PitchTrack, NoteList)` pair; other
//! components receive shared read-only views that stay valid across later
//! commits. History is capped: beyond [`MAX_SNAPSHOTS`] entries the oldest is
//! evicted from the head, and the index never points past either end.

use std::sync::Arc;

use crate::core::types::HistorySnapshot;

/// Maximum retained snapshots before head eviction.
pub const MAX_SNAPSHOTS: usize = 200;

/// Append-only snapshot history with an index into the timeline.
#[derive(Debug, Default)]
pub struct HistoryStore {
    snapshots: Vec<Arc<HistorySnapshot>>,
    index: usize,
}

impl HistoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards all history and starts fresh from `snapshot`.
    pub fn reset(&mut self, snapshot: HistorySnapshot) {
        self.snapshots.clear();
        self.snapshots.push(Arc::new(snapshot));
        self.index = 0;
    }

    /// Commits a new snapshot: truncates the redo tail, appends, and evicts
    /// from the head once over capacity. The committed snapshot atomically
    /// becomes the visible state.
    pub fn commit(&mut self, snapshot: HistorySnapshot) {
        if self.snapshots.is_empty() {
            self.reset(snapshot);
            return;
        }
        self.snapshots.truncate(self.index + 1);
        self.snapshots.push(Arc::new(snapshot));
        self.index += 1;

        if self.snapshots.len() > MAX_SNAPSHOTS {
            let excess = self.snapshots.len() - MAX_SNAPSHOTS;
            self.snapshots.drain(..excess);
            self.index -= excess;
        }
    }

    /// The currently visible snapshot, if any was committed.
    pub fn current(&self) -> Option<Arc<HistorySnapshot>> {
        self.snapshots.get(self.index).cloned()
    }

    /// Steps back one snapshot. Returns the now-visible snapshot, or `None`
    /// at the beginning of history.
    pub fn undo(&mut self) -> Option<Arc<HistorySnapshot>> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        self.current()
    }

    /// Steps forward one snapshot. Returns the now-visible snapshot, or
    /// `None` at the end of history.
    pub fn redo(&mut self) -> Option<Arc<HistorySnapshot>> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        self.current()
    }

    /// True when a snapshot precedes the current one.
    #[inline]
    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    /// True when a snapshot follows the current one.
    #[inline]
    pub fn can_redo(&self) -> bool {
        !self.snapshots.is_empty() && self.index < self.snapshots.len() - 1
    }

    /// Number of retained snapshots.
    #[inline]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// True when nothing was ever committed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
