//! The shared frame grid: the time discretization every subsystem agrees on.
//!
//! Analysis frames advance by [`HOP`] samples, so every timestamp the core
//! exposes is a multiple of `HOP / sample_rate`. Externally supplied times
//! (selection bounds, note boundaries, split points, seek targets on commit)
//! pass through [`snap_time`] so that candidate arrays from different analysis
//! passes align exactly.

/// Samples between consecutive analysis frames.
pub const HOP: usize = 512;

/// Samples per analysis frame (and FFT size).
pub const FRAME_SIZE: usize = 2048;

/// Duration of one hop in seconds.
#[inline]
pub fn frame_duration(sample_rate: u32) -> f64 {
    HOP as f64 / sample_rate as f64
}

/// Snaps a time in seconds to the nearest frame-grid position.
///
/// Idempotent: `snap_time(snap_time(t, sr), sr) == snap_time(t, sr)`.
#[inline]
pub fn snap_time(t: f64, sample_rate: u32) -> f64 {
    let sr = sample_rate as f64;
    (t * sr / HOP as f64).round() * HOP as f64 / sr
}

/// Number of whole analysis frames that fit in `num_samples` samples.
///
/// A frame needs [`FRAME_SIZE`] samples of lookahead, so short buffers
/// produce zero frames.
#[inline]
pub fn frame_count(num_samples: usize) -> usize {
    num_samples.saturating_sub(FRAME_SIZE) / HOP
}

/// Timestamp of frame `index` in seconds.
#[inline]
pub fn frame_timestamp(index: usize, sample_rate: u32) -> f64 {
    index as f64 * HOP as f64 / sample_rate as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_time_idempotent() {
        for &t in &[0.0, 0.1234, 0.5, 1.0, 2.718, 59.999] {
            let once = snap_time(t, 44100);
            let twice = snap_time(once, 44100);
            assert!(
                (once - twice).abs() < 1e-12,
                "snap not idempotent at t={}: {} vs {}",
                t,
                once,
                twice
            );
        }
    }

    #[test]
    fn test_snap_time_lands_on_grid() {
        let sr = 44100;
        let snapped = snap_time(0.5, sr);
        let frames = snapped * sr as f64 / HOP as f64;
        assert!((frames - frames.round()).abs() < 1e-9);
    }

    #[test]
    fn test_snap_zero() {
        assert_eq!(snap_time(0.0, 44100), 0.0);
    }

    #[test]
    fn test_frame_count() {
        // 1 second at 44100: (44100 - 2048) / 512 = 82
        assert_eq!(frame_count(44100), 82);
        assert_eq!(frame_count(FRAME_SIZE), 0);
        assert_eq!(frame_count(FRAME_SIZE + HOP), 1);
        assert_eq!(frame_count(0), 0);
    }

    #[test]
    fn test_frame_timestamp_step() {
        let sr = 48000;
        let step = frame_timestamp(1, sr) - frame_timestamp(0, sr);
        assert!((step - frame_duration(sr)).abs() < 1e-12);
    }
}
