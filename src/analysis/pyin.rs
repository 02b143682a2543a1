//! Probabilistic YIN pitch tracking with Viterbi path decoding.
//!
//! Each analysis frame yields a set of pitch candidates (plus one unvoiced
//! candidate); a Viterbi pass selects the minimum-cost trajectory through the
//! candidate lattice, and a despeckling pass removes voiced runs too short to
//! be real phonation. Deep search widens the candidate net for partial
//! re-analysis of regions the standard pass left unvoiced.

use crate::analysis::yin;
use crate::core::grid::{self, FRAME_SIZE, HOP};
use crate::core::types::{PitchCandidate, PitchFrame, PitchTrack};
use crate::core::window;

/// Default normalized-difference acceptance threshold.
pub const DEFAULT_THRESHOLD: f64 = 0.75;
/// Default frame-RMS gate; quieter frames are unvoiced without analysis.
pub const DEFAULT_RMS_THRESHOLD: f64 = 0.01;
/// Lowest trackable fundamental in Hz.
pub const MIN_FREQ: f64 = 60.0;
/// Highest trackable fundamental in Hz.
pub const MAX_FREQ: f64 = 1200.0;

/// Weight on the octave-distance cost between voiced candidates.
const TRANSITION_COST_WEIGHT: f64 = 1.0;
/// Cost of switching between voiced and unvoiced, either direction.
const VOICING_TRANSITION_COST: f64 = 1.5;
/// Voiced runs shorter than this many frames are despeckled to unvoiced.
const MIN_VOICED_RUN: usize = 8;
/// Deep search keeps only this many candidates, by smallest dip.
const DEEP_CANDIDATE_CAP: usize = 20;
/// Deep search accepts every strict local minimum below this.
const DEEP_EFFECTIVE_THRESHOLD: f64 = 10.0;
/// Deep-search unvoiced probability: forces the path toward any voiced candidate.
const DEEP_UNVOICED_PROB: f64 = 1e-15;
/// Context samples added on each side of a partial re-analysis region.
const REANALYSIS_PAD: usize = 4096;
/// Probability floor for voiced candidates.
const PROB_FLOOR: f64 = 1e-4;

/// Candidate-extraction regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Normal tracking: thresholded dips, despeckling enabled.
    Standard,
    /// Exhaustive mode used for partial re-analysis: every local minimum is a
    /// candidate (capped by dip), silence is maximally improbable, and
    /// despeckling is skipped.
    Deep,
}

/// Tuning parameters for the pYIN engine.
#[derive(Debug, Clone)]
pub struct PyinParams {
    /// Acceptance threshold on the normalized difference.
    pub threshold: f64,
    /// Frames with RMS below this are unvoiced without further analysis.
    pub rms_threshold: f64,
    /// Lowest candidate frequency in Hz.
    pub min_freq: f64,
    /// Highest candidate frequency in Hz.
    pub max_freq: f64,
    /// Candidate-extraction regime.
    pub mode: SearchMode,
}

impl Default for PyinParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            rms_threshold: DEFAULT_RMS_THRESHOLD,
            min_freq: MIN_FREQ,
            max_freq: MAX_FREQ,
            mode: SearchMode::Standard,
        }
    }
}

impl PyinParams {
    /// Creates parameters with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the acceptance threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the RMS gate.
    pub fn with_rms_threshold(mut self, rms_threshold: f64) -> Self {
        self.rms_threshold = rms_threshold;
        self
    }

    /// Switches to deep search.
    pub fn deep(mut self) -> Self {
        self.mode = SearchMode::Deep;
        self
    }

    /// Maps the legacy numeric convention onto the mode flag: settings files
    /// written before the explicit flag encoded deep search as a threshold
    /// above 0.8.
    pub fn from_legacy_threshold(threshold: f64, rms_threshold: f64) -> Self {
        let mode = if threshold > 0.8 {
            SearchMode::Deep
        } else {
            SearchMode::Standard
        };
        Self {
            threshold,
            rms_threshold,
            mode,
            ..Self::default()
        }
    }
}

/// Reusable per-frame scratch buffers.
#[derive(Default)]
struct Scratch {
    windowed: Vec<f32>,
    diff: Vec<f64>,
    cmndf: Vec<f64>,
}

/// The pYIN pitch estimator.
///
/// Exclusively produces [`PitchTrack`]s; one frame per [`HOP`] samples, each
/// carrying its full candidate set for alternative-picking in the editor.
/// Analysis frames are Hann-windowed before the difference function; the
/// amplitude taper penalizes subharmonic dips, which is what lets the Viterbi
/// path take octave jumps instead of locking to the lower octave.
#[derive(Debug, Clone)]
pub struct PyinEngine {
    params: PyinParams,
    hann: Vec<f32>,
}

impl PyinEngine {
    /// Creates an engine with the given parameters.
    pub fn new(params: PyinParams) -> Self {
        Self {
            params,
            hann: window::hann_window(FRAME_SIZE),
        }
    }

    /// Returns the engine parameters.
    pub fn params(&self) -> &PyinParams {
        &self.params
    }

    /// Analyzes a mono buffer into a pitch track.
    ///
    /// Progress is reported as 0→0.5 during candidate extraction, 0.5→0.9
    /// during Viterbi decoding, and 0.95 before despeckling.
    pub fn analyze(
        &self,
        samples: &[f32],
        sample_rate: u32,
        progress: &mut dyn FnMut(f32),
    ) -> PitchTrack {
        let num_frames = grid::frame_count(samples.len());
        if num_frames == 0 {
            progress(1.0);
            return PitchTrack::default();
        }

        let mut scratch = Scratch::default();
        let mut lattice: Vec<Vec<PitchCandidate>> = Vec::with_capacity(num_frames);
        for i in 0..num_frames {
            let frame = &samples[i * HOP..i * HOP + FRAME_SIZE];
            lattice.push(self.extract_candidates(frame, sample_rate, &mut scratch));
            if i % 16 == 0 {
                progress(0.5 * i as f32 / num_frames as f32);
            }
        }
        progress(0.5);

        let chosen = decode_path(&lattice, progress);
        progress(0.9);

        let mut frames: Vec<PitchFrame> = lattice
            .into_iter()
            .zip(chosen)
            .enumerate()
            .map(|(i, (candidates, k))| {
                let c = candidates[k];
                PitchFrame {
                    timestamp: grid::frame_timestamp(i, sample_rate),
                    frequency: c.frequency.max(0.0),
                    probability: c.probability,
                    has_pitch: c.frequency > 0.0,
                    candidates,
                }
            })
            .collect();

        progress(0.95);
        if self.params.mode == SearchMode::Standard {
            despeckle(&mut frames);
        }
        progress(1.0);

        PitchTrack { frames }
    }

    /// Re-analyzes `[t0, t1]` of the buffer with deep-search parameters and
    /// merges the result into `existing`.
    ///
    /// The region is padded by [`REANALYSIS_PAD`] samples on each side for
    /// context; frames landing outside `[t0, t1]` are discarded, frames of the
    /// existing track inside the region are replaced, and the merged track is
    /// re-sorted by timestamp.
    pub fn reanalyze_region(
        &self,
        existing: &PitchTrack,
        samples: &[f32],
        sample_rate: u32,
        t0: f64,
        t1: f64,
        progress: &mut dyn FnMut(f32),
    ) -> PitchTrack {
        let sr = sample_rate as f64;
        let region_start = ((t0 * sr).round().max(0.0) as usize).min(samples.len());
        let region_end = ((t1 * sr).round().max(0.0) as usize).min(samples.len());
        let pad_start = region_start.saturating_sub(REANALYSIS_PAD);
        let pad_end = (region_end + REANALYSIS_PAD).min(samples.len());

        let deep = PyinEngine::new(PyinParams {
            mode: SearchMode::Deep,
            ..self.params.clone()
        });
        let local = deep.analyze(&samples[pad_start..pad_end], sample_rate, progress);

        // Rounding slack on the region bounds; grid timestamps are recomputed
        // from the slice offset and may differ from the originals by an ulp.
        let eps = 1e-9;
        let offset = pad_start as f64 / sr;
        let mut merged: Vec<PitchFrame> = existing
            .frames
            .iter()
            .filter(|f| f.timestamp < t0 - eps || f.timestamp > t1 + eps)
            .cloned()
            .collect();
        merged.extend(local.frames.into_iter().filter_map(|mut f| {
            f.timestamp += offset;
            (f.timestamp >= t0 - eps && f.timestamp <= t1 + eps).then_some(f)
        }));
        merged.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        PitchTrack { frames: merged }
    }

    /// Extracts the candidate set for one frame, always ending with exactly
    /// one unvoiced candidate.
    fn extract_candidates(
        &self,
        frame: &[f32],
        sample_rate: u32,
        scratch: &mut Scratch,
    ) -> Vec<PitchCandidate> {
        scratch.windowed.clear();
        scratch.windowed.extend_from_slice(frame);
        window::apply_window(&mut scratch.windowed, &self.hann);

        let rms = yin::frame_rms(&scratch.windowed);
        if rms < self.params.rms_threshold {
            return vec![PitchCandidate {
                frequency: 0.0,
                probability: 0.99,
                yin_dip: 0.01,
            }];
        }

        yin::difference(&scratch.windowed, &mut scratch.diff);
        yin::cumulative_mean_normalized(&scratch.diff, &mut scratch.cmndf);
        let cmndf = &scratch.cmndf;
        let half = frame.len() / 2;

        let sr = sample_rate as f64;
        let tau_min = ((sr / self.params.max_freq).floor() as usize).max(2);
        let tau_max = ((sr / self.params.min_freq).floor() as usize).min(half.saturating_sub(2));

        let effective_threshold = match self.params.mode {
            SearchMode::Deep => DEEP_EFFECTIVE_THRESHOLD,
            SearchMode::Standard => self.params.threshold,
        };

        let mut candidates: Vec<PitchCandidate> = Vec::new();
        for tau in tau_min..=tau_max {
            let d = cmndf[tau];
            if d < effective_threshold && d < cmndf[tau - 1] && d < cmndf[tau + 1] {
                let period = yin::parabolic_interpolate(cmndf, tau);
                if period <= 0.0 {
                    continue;
                }
                candidates.push(PitchCandidate {
                    frequency: sr / period,
                    probability: (1.0 - d).max(PROB_FLOOR),
                    yin_dip: d,
                });
            }
        }

        if self.params.mode == SearchMode::Deep && candidates.len() > DEEP_CANDIDATE_CAP {
            candidates.sort_by(|a, b| a.yin_dip.total_cmp(&b.yin_dip));
            candidates.truncate(DEEP_CANDIDATE_CAP);
        }

        let unvoiced_prob = match self.params.mode {
            SearchMode::Deep => DEEP_UNVOICED_PROB,
            SearchMode::Standard => {
                let best_dip = candidates
                    .iter()
                    .map(|c| c.yin_dip)
                    .fold(f64::INFINITY, f64::min);
                let dip = if best_dip.is_finite() { best_dip } else { 1.0 };
                (dip * 0.5).clamp(0.05, 0.9)
            }
        };
        candidates.push(PitchCandidate {
            frequency: 0.0,
            probability: unvoiced_prob,
            yin_dip: 1.0,
        });

        candidates
    }
}

/// Viterbi decode over the candidate lattice.
///
/// Initial cost is `1 − p`; the step cost is the transition cost plus the
/// emission cost `1 − p` of the destination. Returns the chosen candidate
/// index per frame.
fn decode_path(lattice: &[Vec<PitchCandidate>], progress: &mut dyn FnMut(f32)) -> Vec<usize> {
    let num_frames = lattice.len();
    if num_frames == 0 {
        return Vec::new();
    }

    let mut cost: Vec<f64> = lattice[0].iter().map(|c| 1.0 - c.probability).collect();
    let mut back: Vec<Vec<u32>> = Vec::with_capacity(num_frames);
    back.push(vec![0; lattice[0].len()]);

    for t in 1..num_frames {
        let prev = &lattice[t - 1];
        let curr = &lattice[t];
        let mut next_cost = vec![f64::INFINITY; curr.len()];
        let mut pointers = vec![0u32; curr.len()];

        for (k, cand) in curr.iter().enumerate() {
            let emission = 1.0 - cand.probability;
            let mut best = f64::INFINITY;
            let mut best_j = 0u32;
            for (j, prev_cand) in prev.iter().enumerate() {
                let total = cost[j] + transition_cost(prev_cand, cand) + emission;
                if total < best {
                    best = total;
                    best_j = j as u32;
                }
            }
            next_cost[k] = best;
            pointers[k] = best_j;
        }

        cost = next_cost;
        back.push(pointers);
        if t % 64 == 0 {
            progress(0.5 + 0.4 * t as f32 / num_frames as f32);
        }
    }

    // Backtrack from the cheapest terminal state.
    let mut k = cost
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or(0);

    let mut chosen = vec![0usize; num_frames];
    for t in (0..num_frames).rev() {
        chosen[t] = k;
        k = back[t][k] as usize;
    }
    chosen
}

/// Cost of moving between two candidates of adjacent frames.
#[inline]
fn transition_cost(prev: &PitchCandidate, curr: &PitchCandidate) -> f64 {
    match (prev.is_unvoiced(), curr.is_unvoiced()) {
        (false, false) => {
            (curr.frequency / prev.frequency).log2().abs() * TRANSITION_COST_WEIGHT
        }
        (true, true) => 0.0,
        _ => VOICING_TRANSITION_COST,
    }
}

/// Forces voiced runs shorter than [`MIN_VOICED_RUN`] frames to unvoiced.
/// Runs touching either end of the track are treated like interior runs.
fn despeckle(frames: &mut [PitchFrame]) {
    let mut i = 0;
    while i < frames.len() {
        if !frames[i].has_pitch {
            i += 1;
            continue;
        }
        let run_start = i;
        while i < frames.len() && frames[i].has_pitch {
            i += 1;
        }
        if i - run_start < MIN_VOICED_RUN {
            for frame in &mut frames[run_start..i] {
                frame.frequency = 0.0;
                frame.has_pitch = false;
                if let Some(u) = frame.candidates.iter().find(|c| c.is_unvoiced()) {
                    frame.probability = u.probability;
                }
            }
        }
    }
}
