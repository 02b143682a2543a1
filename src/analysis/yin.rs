//! YIN kernels: difference function, cumulative-mean-normalized difference,
//! and parabolic minimum refinement for a single analysis frame.
//!
//! These are the time-domain building blocks the pYIN engine evaluates once
//! per hop. All accumulation happens in f64; the callers pass reusable output
//! buffers so the per-frame hot path does not allocate.

/// Computes the difference function `d[τ] = Σ_{j < N/2} (x[j] − x[j+τ])²`
/// for `τ ∈ [0, N/2)` into `out`.
pub fn difference(frame: &[f32], out: &mut Vec<f64>) {
    let half = frame.len() / 2;
    out.clear();
    out.resize(half, 0.0);

    for (tau, slot) in out.iter_mut().enumerate() {
        let mut sum = 0.0f64;
        for j in 0..half {
            let delta = (frame[j] - frame[j + tau]) as f64;
            sum += delta * delta;
        }
        *slot = sum;
    }
}

/// Computes the cumulative-mean-normalized difference
/// `d'[τ] = d[τ] · τ / Σ_{k=1..τ} d[k]`, with `d'[0] = 1`, into `out`.
pub fn cumulative_mean_normalized(diff: &[f64], out: &mut Vec<f64>) {
    out.clear();
    out.resize(diff.len(), 1.0);
    if diff.is_empty() {
        return;
    }

    let mut running_sum = 0.0f64;
    for tau in 1..diff.len() {
        running_sum += diff[tau];
        out[tau] = if running_sum > 0.0 {
            diff[tau] * tau as f64 / running_sum
        } else {
            1.0
        };
    }
}

/// Refines a sampled minimum at `tau` by fitting a parabola through
/// `(τ−1, τ, τ+1)` and returning the vertex abscissa.
///
/// Returns `τ` unchanged when the fit is degenerate (zero denominator) or
/// `tau` sits on a boundary where the three points are unavailable.
pub fn parabolic_interpolate(cmndf: &[f64], tau: usize) -> f64 {
    if tau == 0 || tau + 1 >= cmndf.len() {
        return tau as f64;
    }
    let left = cmndf[tau - 1];
    let mid = cmndf[tau];
    let right = cmndf[tau + 1];

    let denom = 2.0 * (left - 2.0 * mid + right);
    if denom == 0.0 {
        return tau as f64;
    }
    tau as f64 + (left - right) / denom
}

/// Root-mean-square level of a frame.
pub fn frame_rms(frame: &[f32]) -> f64 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = frame.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / frame.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine_frame(freq: f32, sr: u32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f32 / sr as f32).sin())
            .collect()
    }

    #[test]
    fn test_difference_zero_lag_is_zero() {
        let frame = sine_frame(440.0, 44100, 2048);
        let mut diff = Vec::new();
        difference(&frame, &mut diff);
        assert_eq!(diff.len(), 1024);
        assert!(diff[0].abs() < 1e-12);
    }

    #[test]
    fn test_difference_dips_at_period() {
        // 441 Hz at 44100 Hz has an exact period of 100 samples.
        let frame = sine_frame(441.0, 44100, 2048);
        let mut diff = Vec::new();
        difference(&frame, &mut diff);

        // d[100] should be far below its neighborhood average
        let local_avg: f64 = (80..120).map(|t| diff[t]).sum::<f64>() / 40.0;
        assert!(
            diff[100] < local_avg * 0.05,
            "d[100] = {} not a dip (avg {})",
            diff[100],
            local_avg
        );
    }

    #[test]
    fn test_cmndf_starts_at_one() {
        let frame = sine_frame(440.0, 44100, 2048);
        let mut diff = Vec::new();
        let mut cmndf = Vec::new();
        difference(&frame, &mut diff);
        cumulative_mean_normalized(&diff, &mut cmndf);
        assert_eq!(cmndf[0], 1.0);
    }

    #[test]
    fn test_cmndf_dip_below_threshold_for_periodic_signal() {
        let frame = sine_frame(441.0, 44100, 2048);
        let mut diff = Vec::new();
        let mut cmndf = Vec::new();
        difference(&frame, &mut diff);
        cumulative_mean_normalized(&diff, &mut cmndf);
        assert!(
            cmndf[100] < 0.1,
            "period dip {} should be well below threshold",
            cmndf[100]
        );
    }

    #[test]
    fn test_cmndf_all_zero_input() {
        let diff = vec![0.0f64; 64];
        let mut cmndf = Vec::new();
        cumulative_mean_normalized(&diff, &mut cmndf);
        // Zero running sum falls back to 1.0 everywhere
        assert!(cmndf.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_parabolic_refines_toward_true_minimum() {
        // Parabola y = (x - 10.3)^2 sampled at integers: minimum at 10.3.
        let cmndf: Vec<f64> = (0..20).map(|x| (x as f64 - 10.3).powi(2)).collect();
        let refined = parabolic_interpolate(&cmndf, 10);
        assert!(
            (refined - 10.3).abs() < 1e-9,
            "expected 10.3, got {}",
            refined
        );
    }

    #[test]
    fn test_parabolic_boundary_returns_tau() {
        let cmndf = vec![1.0, 0.5, 1.0];
        assert_eq!(parabolic_interpolate(&cmndf, 0), 0.0);
        assert_eq!(parabolic_interpolate(&cmndf, 2), 2.0);
    }

    #[test]
    fn test_parabolic_flat_returns_tau() {
        let cmndf = vec![0.5f64; 8];
        assert_eq!(parabolic_interpolate(&cmndf, 4), 4.0);
    }

    #[test]
    fn test_frame_rms() {
        assert_eq!(frame_rms(&[]), 0.0);
        assert!((frame_rms(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-9);
        // Full-scale sine has RMS 1/sqrt(2)
        let frame = sine_frame(441.0, 44100, 2048);
        assert!((frame_rms(&frame) - std::f64::consts::FRAC_1_SQRT_2).abs() < 0.01);
    }
}
