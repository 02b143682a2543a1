#![forbid(unsafe_code)]
//! Pitch-analysis core for a monophonic vocal intonation editor.
//!
//! `retune` turns a mono recording into an editable pitch trajectory: a
//! probabilistic YIN estimator with Viterbi decoding produces per-frame
//! frequency candidates, a Hann-windowed STFT feeds the spectrogram view,
//! and a note model derives editable segments whose mutations flow through
//! an undo/redo history. A playback scheduler synthesizes the original
//! recording (time-stretched, pitch-preserved), a pitch-curve oscillator,
//! and per-note pulse voices against a shared wall clock.
//!
//! # Quick Start
//!
//! ```
//! // Half a second of 440 Hz sine at 44.1 kHz
//! let samples: Vec<f32> = (0..22050)
//!     .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin())
//!     .collect();
//!
//! let (track, spectrogram) = retune::analyze(&samples, 44100);
//! assert!(track.frames.iter().skip(2).all(|f| f.has_pitch));
//! assert_eq!(spectrogram.height, 1024);
//! ```
//!
//! Every timestamp the crate exposes sits on the shared frame grid
//! (`hop / sample_rate`, hop 512), so candidate arrays from different
//! analysis passes line up exactly.

pub mod analysis;
pub mod core;
pub mod error;
pub mod history;
pub mod io;
pub mod notes;
pub mod playback;

pub use crate::core::grid::{frame_duration, snap_time, FRAME_SIZE, HOP};
pub use crate::core::types::{
    AudioBuffer, HistorySnapshot, MixerState, Note, PitchCandidate, PitchFrame, PitchTrack,
    SpectrogramData, VoiceMix, MIN_NOTE_DURATION,
};
pub use analysis::{AnalysisEvent, AnalysisWorker, JobKind, PyinEngine, PyinParams, SearchMode};
pub use error::RetuneError;
pub use history::HistoryStore;
pub use notes::NoteIds;
pub use playback::{AudioOutput, PlaybackOptions, PlaybackScheduler};

/// Analyzes a mono buffer with default parameters.
///
/// Convenience entry point running the pitch estimator and the spectrogram
/// synchronously. Interactive hosts should use [`AnalysisWorker`] instead,
/// which runs both off the interactive path with progress reporting.
pub fn analyze(samples: &[f32], sample_rate: u32) -> (PitchTrack, SpectrogramData) {
    let engine = PyinEngine::new(PyinParams::new());
    let track = engine.analyze(samples, sample_rate, &mut |_| {});
    let spectrogram = analysis::spectrogram::compute(samples, &analysis::CancelFlag::new())
        .unwrap_or_default();
    (track, spectrogram)
}
