//! Pure functions over note sequences: median-pitch aggregation, note
//! creation, split, resize-with-push, and boundary snapping.
//!
//! Operations take the current note list and pitch track by reference and
//! return a new list; committing the result is the caller's job (via the
//! history store). The invariants maintained here: notes are pairwise
//! non-overlapping, ordered by start, and at least [`MIN_NOTE_DURATION`] long.

use crate::core::types::{Note, PitchFrame, PitchTrack, MIN_NOTE_DURATION};

/// Snap radius in screen pixels; divided by zoom to get seconds.
const SNAP_PX: f64 = 10.0;

/// Margin around note edges inside which a split point is rejected.
const SPLIT_MARGIN: f64 = 0.01;

/// Allocates stable note identifiers, unique within a project.
#[derive(Debug, Clone)]
pub struct NoteIds {
    next: u64,
}

impl Default for NoteIds {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteIds {
    /// Starts allocating from 1.
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Resumes allocation above the ids already present in `notes`, so
    /// imported projects never collide with fresh notes.
    pub fn resuming_after(notes: &[Note]) -> Self {
        let max = notes.iter().map(|n| n.id).max().unwrap_or(0);
        Self { next: max + 1 }
    }

    /// Returns a fresh identifier.
    pub fn fresh(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Statistical median of the voiced frequencies in `frames`.
///
/// Returns the mean of the two central values for an even count, or 0.0 when
/// no frame is voiced.
pub fn median_pitch(frames: &[PitchFrame]) -> f64 {
    let mut voiced: Vec<f64> = frames
        .iter()
        .filter(|f| f.has_pitch && f.frequency > 0.0)
        .map(|f| f.frequency)
        .collect();
    if voiced.is_empty() {
        return 0.0;
    }
    voiced.sort_by(f64::total_cmp);
    let mid = voiced.len() / 2;
    if voiced.len() % 2 == 1 {
        voiced[mid]
    } else {
        (voiced[mid - 1] + voiced[mid]) / 2.0
    }
}

/// Replaces whatever lies under the selection with one note spanning it.
///
/// Every note whose midpoint falls inside `[start, end]` is removed. A new
/// note is inserted only when the selection contains voiced frames; an
/// unvoiced selection applies just the removals.
pub fn create_or_replace(
    start: f64,
    end: f64,
    notes: &[Note],
    pitch: &PitchTrack,
    ids: &mut NoteIds,
) -> Vec<Note> {
    let mut result: Vec<Note> = notes
        .iter()
        .filter(|n| {
            let mid = n.midpoint();
            mid < start || mid > end
        })
        .cloned()
        .collect();

    let p = median_pitch(pitch.frames_in(start, end));
    if p > 0.0 {
        // Survivors whose bodies cross the selection edge are clipped to it;
        // non-overlap must hold after the insert.
        for n in result.iter_mut() {
            if n.start < end && n.end > start {
                if n.midpoint() < start {
                    n.end = start;
                } else {
                    n.start = end;
                }
            }
        }
        result.retain(|n| n.duration() >= MIN_NOTE_DURATION);

        result.push(Note {
            id: ids.fresh(),
            start,
            end,
            pitch: p,
            state: None,
        });
    }
    result.sort_by(|a, b| a.start.total_cmp(&b.start));
    result
}

/// Splits `note` at time `t` into two notes with fresh ids.
///
/// Valid only when `t` lies strictly inside the note with a 10 ms margin on
/// both sides; otherwise returns `None`. Each half takes the median pitch of
/// its own range, falling back to the original pitch where the range has no
/// voiced frames.
pub fn split_note(
    note: &Note,
    t: f64,
    pitch: &PitchTrack,
    ids: &mut NoteIds,
) -> Option<(Note, Note)> {
    if t <= note.start + SPLIT_MARGIN || t >= note.end - SPLIT_MARGIN {
        return None;
    }

    let pitch_of = |a: f64, b: f64| {
        let p = median_pitch(pitch.frames_in(a, b));
        if p > 0.0 {
            p
        } else {
            note.pitch
        }
    };

    let left = Note {
        id: ids.fresh(),
        start: note.start,
        end: t,
        pitch: pitch_of(note.start, t),
        state: note.state.clone(),
    };
    let right = Note {
        id: ids.fresh(),
        start: t,
        end: note.end,
        pitch: pitch_of(t, note.end),
        state: note.state.clone(),
    };
    Some((left, right))
}

/// Resizes note `id` to `[new_start, new_end]`, pushing neighbor boundaries
/// out of the way.
///
/// A neighbor overlapping the new range has its nearest boundary pushed to
/// the target's edge; a neighbor swallowed whole collapses and is removed by
/// the duration rule. Every modified note (target included) has its pitch
/// recomputed from the median over its new range, keeping the previous pitch
/// where the range has no voiced frames. Neighbors shorter than
/// [`MIN_NOTE_DURATION`] after the push are deleted. The result is sorted by
/// start.
pub fn resize_with_push(
    notes: &[Note],
    id: u64,
    new_start: f64,
    new_end: f64,
    pitch: &PitchTrack,
) -> Vec<Note> {
    if !notes.iter().any(|n| n.id == id) || new_end - new_start < MIN_NOTE_DURATION {
        return notes.to_vec();
    }

    let mut result: Vec<Note> = Vec::with_capacity(notes.len());
    for n in notes {
        let mut n = n.clone();
        let modified = if n.id == id {
            n.start = new_start;
            n.end = new_end;
            true
        } else if new_start < n.end && new_end > n.start {
            if n.start >= new_start && n.end > new_end {
                // Head swallowed: note now extends past the target's new end.
                n.start = new_end;
            } else if n.end <= new_end && n.start < new_start {
                // Tail swallowed, symmetric on the left.
                n.end = new_start;
            } else if n.start < new_start {
                n.end = new_start;
            } else {
                n.start = new_end;
            }
            true
        } else {
            false
        };

        if n.duration() < MIN_NOTE_DURATION {
            continue;
        }
        if modified {
            let p = median_pitch(pitch.frames_in(n.start, n.end));
            if p > 0.0 {
                n.pitch = p;
            }
        }
        result.push(n);
    }

    result.sort_by(|a, b| a.start.total_cmp(&b.start));
    result
}

/// Snaps a dragged time toward nearby note boundaries, the frame grid, and
/// the buffer edges.
///
/// Within `SNAP_PX / zoom` seconds (zoom in pixels per second), the closest of
/// these wins, ties resolving to the first considered: any other note's start
/// or end (skipping `ignore_id`), the frame-grid position, 0, and `duration`.
/// Holding shift bypasses snapping entirely.
#[allow(clippy::too_many_arguments)]
pub fn snap_time(
    t: f64,
    notes: &[Note],
    zoom: f64,
    frame_duration: f64,
    duration: f64,
    ignore_id: Option<u64>,
    shift_held: bool,
) -> f64 {
    if shift_held || zoom <= 0.0 {
        return t;
    }
    let snap_window = SNAP_PX / zoom;

    let mut best: Option<f64> = None;
    let mut best_dist = f64::INFINITY;
    let mut consider = |candidate: f64| {
        let dist = (t - candidate).abs();
        if dist <= snap_window && dist < best_dist {
            best = Some(candidate);
            best_dist = dist;
        }
    };

    for n in notes {
        if Some(n.id) == ignore_id {
            continue;
        }
        consider(n.start);
        consider(n.end);
    }
    if frame_duration > 0.0 {
        consider((t / frame_duration).round() * frame_duration);
    }
    consider(0.0);
    consider(duration);

    best.unwrap_or(t)
}
