//! In-place radix-2 complex FFT over parallel real/imaginary slices.
//!
//! Forward transform uses the sign convention `W = exp(-j·2π/N)`. Lengths
//! must be powers of two (2048 in practice for the spectrogram). The caller
//! windows; this module does not.

use std::f64::consts::PI;

/// Forward in-place FFT.
///
/// `re` and `im` are parallel arrays of equal power-of-two length; on return
/// they hold the frequency-domain pairs at the same indices.
///
/// # Panics
///
/// Panics if the slices differ in length or the length is not a power of two.
pub fn forward(re: &mut [f32], im: &mut [f32]) {
    transform(re, im, false);
}

/// Inverse in-place FFT (`W = exp(+j·2π/N)`), including the `1/N` scaling.
pub fn inverse(re: &mut [f32], im: &mut [f32]) {
    transform(re, im, true);
    let norm = 1.0 / re.len() as f32;
    for (r, i) in re.iter_mut().zip(im.iter_mut()) {
        *r *= norm;
        *i *= norm;
    }
}

fn transform(re: &mut [f32], im: &mut [f32], invert: bool) {
    let n = re.len();
    assert_eq!(n, im.len(), "re/im slices must have equal length");
    if n <= 1 {
        return;
    }
    assert!(n.is_power_of_two(), "FFT length must be a power of two");

    bit_reverse_permute(re, im);

    // Decimation-in-time butterflies.
    let sign = if invert { 1.0f64 } else { -1.0f64 };
    let mut len = 2;
    while len <= n {
        let angle = sign * 2.0 * PI / len as f64;
        let w_len_re = angle.cos();
        let w_len_im = angle.sin();

        let mut start = 0;
        while start < n {
            let mut w_re = 1.0f64;
            let mut w_im = 0.0f64;
            for k in 0..len / 2 {
                let a = start + k;
                let b = start + k + len / 2;

                let t_re = re[b] as f64 * w_re - im[b] as f64 * w_im;
                let t_im = re[b] as f64 * w_im + im[b] as f64 * w_re;

                re[b] = (re[a] as f64 - t_re) as f32;
                im[b] = (im[a] as f64 - t_im) as f32;
                re[a] = (re[a] as f64 + t_re) as f32;
                im[a] = (im[a] as f64 + t_im) as f32;

                let next_re = w_re * w_len_re - w_im * w_len_im;
                w_im = w_re * w_len_im + w_im * w_len_re;
                w_re = next_re;
            }
            start += len;
        }
        len <<= 1;
    }
}

/// Reorders both slices into bit-reversed index order.
#[inline]
fn bit_reverse_permute(re: &mut [f32], im: &mut [f32]) {
    let n = re.len();
    let mut j = 0usize;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j |= bit;
        if i < j {
            re.swap(i, j);
            im.swap(i, j);
        }
    }
}
