#![allow(dead_code)]

use std::f32::consts::PI;

use retune::{Note, PitchFrame, PitchTrack};

pub fn gen_sine(freq_hz: f32, amp: f32, sr: u32, n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| amp * (2.0 * PI * freq_hz * i as f32 / sr as f32).sin())
        .collect()
}

pub fn gen_silence(n: usize) -> Vec<f32> {
    vec![0.0f32; n]
}

/// Two tones back to back: `freq_a` for the first half, `freq_b` for the rest.
pub fn gen_tone_step(freq_a: f32, freq_b: f32, amp: f32, sr: u32, n: usize) -> Vec<f32> {
    let half = n / 2;
    (0..n)
        .map(|i| {
            let freq = if i < half { freq_a } else { freq_b };
            // Continuous phase is not needed for tracking tests; a hard seam
            // at the boundary is part of the scenario.
            amp * (2.0 * PI * freq * i as f32 / sr as f32).sin()
        })
        .collect()
}

pub fn windowed_rms(signal: &[f32], start: usize, len: usize) -> f64 {
    if signal.is_empty() || len == 0 {
        return 0.0;
    }
    let start = start.min(signal.len());
    let end = (start + len).min(signal.len());
    if end <= start {
        return 0.0;
    }
    let sum_sq: f64 = signal[start..end]
        .iter()
        .map(|&s| {
            let v = s as f64;
            v * v
        })
        .sum();
    (sum_sq / (end - start) as f64).sqrt()
}

pub fn note(id: u64, start: f64, end: f64, pitch: f64) -> Note {
    Note {
        id,
        start,
        end,
        pitch,
        state: None,
    }
}

/// A pitch track holding `freq` at every grid position covering `[0, seconds]`.
pub fn uniform_track(freq: f64, seconds: f64, sr: u32) -> PitchTrack {
    let step = 512.0 / sr as f64;
    let count = (seconds / step).ceil() as usize;
    PitchTrack {
        frames: (0..count)
            .map(|i| PitchFrame {
                timestamp: i as f64 * step,
                frequency: freq,
                probability: 0.95,
                has_pitch: freq > 0.0,
                candidates: vec![],
            })
            .collect(),
    }
}

/// Asserts the pairwise non-overlap and minimum-duration invariants.
pub fn assert_note_invariants(notes: &[Note]) {
    for n in notes {
        assert!(
            n.duration() >= retune::MIN_NOTE_DURATION - 1e-12,
            "note {} shorter than minimum: {}",
            n.id,
            n.duration()
        );
    }
    for pair in notes.windows(2) {
        assert!(
            pair[0].start <= pair[1].start,
            "notes not sorted by start: {:?} then {:?}",
            pair[0],
            pair[1]
        );
        assert!(
            pair[0].end <= pair[1].start + 1e-12,
            "notes overlap: {:?} and {:?}",
            pair[0],
            pair[1]
        );
    }
}
