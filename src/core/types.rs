//! Core types shared across the crate: buffers, pitch data, notes, and mixer state.

use serde::{Deserialize, Serialize};

/// A single audio sample (32-bit float, range -1.0 to 1.0).
pub type Sample = f32;

/// A mono audio buffer. The core analyzes exactly one channel.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Sample data, -1.0 to 1.0.
    pub samples: Vec<Sample>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Creates a new mono buffer.
    pub fn new(samples: Vec<Sample>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Returns the duration in seconds.
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// A single (frequency, probability) hypothesis for one analysis frame.
///
/// `frequency == 0.0` denotes the unvoiced candidate; each frame carries at
/// most one of those.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PitchCandidate {
    /// Candidate fundamental frequency in Hz (0 = unvoiced).
    pub frequency: f64,
    /// Probability in (0, 1].
    pub probability: f64,
    /// The normalized-difference dip this candidate was extracted from.
    pub yin_dip: f64,
}

impl PitchCandidate {
    /// True when this is the unvoiced candidate.
    #[inline]
    pub fn is_unvoiced(&self) -> bool {
        self.frequency <= 0.0
    }
}

/// One analysis frame of the pitch trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PitchFrame {
    /// Frame-grid-aligned timestamp in seconds.
    pub timestamp: f64,
    /// Chosen fundamental frequency in Hz (0 when unvoiced).
    pub frequency: f64,
    /// Probability of the chosen candidate.
    pub probability: f64,
    /// Whether a periodic pitch was detected for this frame.
    pub has_pitch: bool,
    /// All candidates extracted for this frame, kept for alternative-picking.
    #[serde(default)]
    pub candidates: Vec<PitchCandidate>,
}

/// The pitch trajectory: one frame per hop, timestamps strictly increasing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PitchTrack {
    pub frames: Vec<PitchFrame>,
}

impl PitchTrack {
    /// Returns the number of frames.
    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True when the track has no frames.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames whose timestamp lies in `[start, end]` (inclusive).
    pub fn frames_in(&self, start: f64, end: f64) -> &[PitchFrame] {
        let lo = self.frames.partition_point(|f| f.timestamp < start);
        let hi = self.frames.partition_point(|f| f.timestamp <= end);
        &self.frames[lo..hi]
    }
}

/// An editable note segment derived from the pitch trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Stable identifier, unique within a project.
    pub id: u64,
    /// Start time in seconds, snapped to the frame grid.
    pub start: f64,
    /// End time in seconds, `start < end`.
    pub end: f64,
    /// Note pitch in Hz, > 0.
    pub pitch: f64,
    /// Optional UI state tag carried through persistence untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Note {
    /// Returns the note duration in seconds.
    #[inline]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Returns the time midpoint of the note.
    #[inline]
    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) / 2.0
    }
}

/// Minimum note duration in seconds; shorter notes are removed.
pub const MIN_NOTE_DURATION: f64 = 0.010;

/// Short-time spectrogram for visualization.
///
/// `magnitudes` is stored frame-major: the magnitude of `bin` in `frame` is
/// `magnitudes[frame * height + bin]`. Rebuilt on every audio load, never
/// mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct SpectrogramData {
    /// Number of analysis frames.
    pub width: usize,
    /// Number of frequency bins (FFT size / 2).
    pub height: usize,
    /// Flattened magnitude matrix, frame-major.
    pub magnitudes: Vec<f32>,
    /// Global maximum magnitude across all frames.
    pub max_magnitude: f32,
}

impl SpectrogramData {
    /// Magnitudes of one analysis frame.
    #[inline]
    pub fn frame(&self, index: usize) -> &[f32] {
        &self.magnitudes[index * self.height..(index + 1) * self.height]
    }
}

/// One committed editing state: the pitch trajectory plus its note segments.
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySnapshot {
    pub pitch_track: PitchTrack,
    pub notes: Vec<Note>,
}

/// Enable/volume pair for one playback voice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceMix {
    pub enabled: bool,
    /// Volume in [0, 1]. Zero is equivalent to disabled.
    pub volume: f32,
}

impl VoiceMix {
    /// Gain actually applied: volume when enabled, otherwise 0.
    #[inline]
    pub fn effective_gain(&self) -> f32 {
        if self.enabled {
            self.volume.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl Default for VoiceMix {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 0.8,
        }
    }
}

/// Mixer settings for the three playback voices.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixerState {
    pub original: VoiceMix,
    pub pitch_synth: VoiceMix,
    pub note_synth: VoiceMix,
}
