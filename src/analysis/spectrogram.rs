//! Hann-windowed STFT producing a magnitude matrix for visualization.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::fft;
use crate::core::grid::{FRAME_SIZE, HOP};
use crate::core::types::SpectrogramData;
use crate::core::window;

/// Cooperative cancellation flag for an in-flight spectrogram job.
///
/// Cancelling drops the result silently; the engine checks once per frame.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Creates an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns true once cancellation was requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Computes the spectrogram of a mono buffer: window and FFT size 2048,
/// hop 512, magnitudes for bins `[0, 1024)`, with the global maximum tracked
/// across all frames.
///
/// Returns `None` when cancelled. Empty or too-short input yields an empty
/// spectrogram (width 0).
pub fn compute(samples: &[f32], cancel: &CancelFlag) -> Option<SpectrogramData> {
    let height = FRAME_SIZE / 2;
    let width = samples.len().saturating_sub(FRAME_SIZE) / HOP;
    if width == 0 {
        return Some(SpectrogramData {
            width: 0,
            height,
            magnitudes: Vec::new(),
            max_magnitude: 0.0,
        });
    }

    let hann = window::hann_window(FRAME_SIZE);
    let mut magnitudes = vec![0.0f32; width * height];
    let mut max_magnitude = 0.0f32;

    let mut re = vec![0.0f32; FRAME_SIZE];
    let mut im = vec![0.0f32; FRAME_SIZE];

    for frame in 0..width {
        if cancel.is_cancelled() {
            return None;
        }

        let start = frame * HOP;
        re.copy_from_slice(&samples[start..start + FRAME_SIZE]);
        window::apply_window(&mut re, &hann);
        im.fill(0.0);

        fft::forward(&mut re, &mut im);

        let row = &mut magnitudes[frame * height..(frame + 1) * height];
        for (bin, slot) in row.iter_mut().enumerate() {
            let mag = (re[bin] * re[bin] + im[bin] * im[bin]).sqrt();
            *slot = mag;
            if mag > max_magnitude {
                max_magnitude = mag;
            }
        }
    }

    Some(SpectrogramData {
        width,
        height,
        magnitudes,
        max_magnitude,
    })
}
