//! Radix-2 Cooley-Tukey FFT kernel (§4.A).
//!
//! A small, self-contained transform over `num_complex::Complex<f64>`.
//! Internal accumulation is double precision; callers at the f32 boundary
//! convert in and out. This exists instead of wrapping `rustfft`/`realfft`
//! because the spec pins an exact contract (reject non-power-of-two
//! lengths, iterative bit-reversal + twiddle recurrence) that a black-box
//! planner doesn't expose — see DESIGN.md.

use num_complex::Complex64;

use crate::error::{RestoreError, RestoreResult};

/// Transform `data` in place.
///
/// `invert = false` computes the forward DFT; `invert = true` computes the
/// inverse and scales the result by `1/len`. `data.len()` must be a power
/// of two (including 1).
pub fn fft(data: &mut [Complex64], invert: bool) -> RestoreResult<()> {
    let n = data.len();
    if n == 0 || !n.is_power_of_two() {
        return Err(RestoreError::InvalidInput {
            reason: format!("FFT length {n} is not a power of two"),
        });
    }

    bit_reverse_permute(data);

    let mut len = 2;
    while len <= n {
        let angle_step = std::f64::consts::PI / (len / 2) as f64 * if invert { 1.0 } else { -1.0 };
        let wlen = Complex64::new(angle_step.cos(), angle_step.sin());

        let mut start = 0;
        while start < n {
            let mut w = Complex64::new(1.0, 0.0);
            for i in 0..len / 2 {
                let u = data[start + i];
                let v = data[start + i + len / 2] * w;
                data[start + i] = u + v;
                data[start + i + len / 2] = u - v;
                w *= wlen;
            }
            start += len;
        }
        len <<= 1;
    }

    if invert {
        let scale = 1.0 / n as f64;
        for sample in data.iter_mut() {
            *sample *= scale;
        }
    }

    Ok(())
}

fn bit_reverse_permute(data: &mut [Complex64]) {
    let n = data.len();
    if n <= 1 {
        return;
    }
    let bits = n.trailing_zeros();
    for i in 0..n {
        let j = i.reverse_bits() >> (usize::BITS - bits);
        if i < j {
            data.swap(i, j);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn rejects_non_power_of_two() {
        let mut data = vec![Complex64::new(0.0, 0.0); 3];
        assert!(fft(&mut data, false).is_err());
    }

    #[test]
    fn length_one_is_identity() {
        let mut data = vec![Complex64::new(1.0, -2.0)];
        fft(&mut data, false).unwrap();
        assert_abs_diff_eq!(data[0].re, 1.0);
        assert_abs_diff_eq!(data[0].im, -2.0);
    }

    #[test]
    fn round_trip_reproduces_input() {
        let n = 1024;
        let mut original = Vec::with_capacity(n);
        let mut data = Vec::with_capacity(n);
        for i in 0..n {
            let t = i as f64 / n as f64;
            let sample = (2.0 * std::f64::consts::PI * 5.0 * t).sin() * 0.5;
            original.push(Complex64::new(sample, 0.0));
            data.push(Complex64::new(sample, 0.0));
        }

        fft(&mut data, false).unwrap();
        fft(&mut data, true).unwrap();

        let mut sq_err = 0.0;
        for (a, b) in original.iter().zip(data.iter()) {
            let d = a.re - b.re;
            sq_err += d * d;
        }
        let rms = (sq_err / n as f64).sqrt();
        assert!(rms < 1e-5, "round-trip RMS error too large: {rms}");
    }

    #[test]
    fn forward_dc_bin_is_sum() {
        let mut data: Vec<Complex64> = (0..8).map(|_| Complex64::new(1.0, 0.0)).collect();
        fft(&mut data, false).unwrap();
        assert_abs_diff_eq!(data[0].re, 8.0, epsilon = 1e-9);
    }
}
