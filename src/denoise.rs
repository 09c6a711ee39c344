//! Spectral denoiser: STFT magnitude subtraction with temporal gain
//! smoothing (§4.D).

use num_complex::Complex64;

use crate::fft::fft;
use crate::types::AudioBuffer;
use crate::window::{
    adaptive_frame_size, frame_count_in_segment, hann_window, hop_size, DENOISE_FRAME_MAX,
    DENOISE_FRAME_MIN, MAX_SEGMENT_SAMPLES,
};

const GAIN_SMOOTHING_ALPHA: f32 = 0.85;
const WEIGHT_EPSILON: f32 = 1e-9;

/// Run the spectral denoiser over every channel of `buffer` in place.
///
/// `effective_reduction` is the resolved `r` from §4.D (already folded with
/// the 0.6 "gentle flooring" scale when that mode is enabled).
pub fn apply(buffer: &mut AudioBuffer, effective_reduction: f32) {
    if effective_reduction <= 0.0 {
        return;
    }

    let channels = buffer.channels();
    let frame_count = buffer.frame_count();
    let sample_rate = buffer.sample_rate();

    let frame_size = adaptive_frame_size(sample_rate, DENOISE_FRAME_MIN, DENOISE_FRAME_MAX);
    let hop = hop_size(frame_size);
    let window = hann_window(frame_size);

    for channel in 0..channels {
        let mut channel_samples: Vec<f32> = (0..frame_count)
            .map(|frame| buffer.get(frame, channel))
            .collect();

        denoise_channel(
            &mut channel_samples,
            frame_size,
            hop,
            &window,
            effective_reduction,
        );

        for (frame, &sample) in channel_samples.iter().enumerate() {
            *buffer.get_mut(frame, channel) = sample;
        }
    }
}

/// Denoise a single de-interleaved channel. Gain-smoothing state persists
/// across segments, as required by §4.D.
fn denoise_channel(
    channel: &mut [f32],
    frame_size: usize,
    hop: usize,
    window: &[f32],
    effective_reduction: f32,
) {
    let mut prev_gains = vec![1.0f32; frame_size];

    let mut seg_start = 0;
    while seg_start < channel.len() {
        let seg_end = (seg_start + MAX_SEGMENT_SAMPLES).min(channel.len());
        process_segment(
            &mut channel[seg_start..seg_end],
            frame_size,
            hop,
            window,
            effective_reduction,
            &mut prev_gains,
        );
        seg_start = seg_end;
    }
}

fn process_segment(
    segment: &mut [f32],
    frame_size: usize,
    hop: usize,
    window: &[f32],
    effective_reduction: f32,
    prev_gains: &mut [f32],
) {
    let frame_count = frame_count_in_segment(segment.len(), frame_size, hop);
    if frame_count == 0 {
        log::trace!(
            "denoise: segment of {} samples too short for one frame, skipping",
            segment.len()
        );
        return;
    }

    let min_gain = 1.0 - 0.6 * effective_reduction;

    // 1. Frame, window, and forward-FFT every analysis frame.
    let mut spectra: Vec<Vec<Complex64>> = Vec::with_capacity(frame_count);
    let mut frame_rms: Vec<f32> = Vec::with_capacity(frame_count);

    for f in 0..frame_count {
        let start = f * hop;
        let raw = &segment[start..start + frame_size];

        let sum_sq: f64 = raw.iter().map(|&s| (s as f64) * (s as f64)).sum();
        frame_rms.push((sum_sq / frame_size as f64).sqrt() as f32);

        let mut spectrum: Vec<Complex64> = raw
            .iter()
            .zip(window.iter())
            .map(|(&s, &w)| Complex64::new((s * w) as f64, 0.0))
            .collect();
        fft(&mut spectrum, false).expect("frame_size is always a power of two");
        spectra.push(spectrum);
    }

    // 2. Noise spectrum: bin-wise mean magnitude of the quietest 20% of frames.
    let mut order: Vec<usize> = (0..frame_count).collect();
    order.sort_by(|&a, &b| frame_rms[a].partial_cmp(&frame_rms[b]).unwrap());
    let quiet_count = ((frame_count as f32 * 0.2).floor() as usize).max(1).min(frame_count);
    let quiet_frames = &order[..quiet_count];

    let mut noise_spectrum = vec![0.0f64; frame_size];
    for &f in quiet_frames {
        for (bin, c) in spectra[f].iter().enumerate() {
            noise_spectrum[bin] += c.norm();
        }
    }
    for n in noise_spectrum.iter_mut() {
        *n /= quiet_count as f64;
    }

    // 3. Per-frame, per-bin magnitude subtraction with temporal smoothing.
    for spectrum in spectra.iter_mut() {
        for (bin, bin_value) in spectrum.iter_mut().enumerate() {
            let m = bin_value.norm();
            if m <= 0.0 {
                continue;
            }
            let n = noise_spectrum[bin] as f32;
            let reduced = (m - n * effective_reduction).max(m * min_gain);
            let target_gain = reduced / m;

            let g_new = GAIN_SMOOTHING_ALPHA * prev_gains[bin]
                + (1.0 - GAIN_SMOOTHING_ALPHA) * target_gain;
            prev_gains[bin] = g_new;

            if g_new > 0.0 {
                *bin_value *= g_new as f64;
            }
        }
    }

    // 4. Inverse FFT and overlap-add, normalizing by the accumulated window
    //    weight at each sample position.
    let mut accum = vec![0.0f64; segment.len()];
    let mut weight = vec![0.0f32; segment.len()];

    for (f, spectrum) in spectra.iter_mut().enumerate() {
        fft(spectrum, true).expect("frame_size is always a power of two");
        let start = f * hop;
        for i in 0..frame_size {
            accum[start + i] += spectrum[i].re;
            weight[start + i] += window[i];
        }
    }

    for i in 0..segment.len() {
        if weight[i] > 0.0 {
            segment[i] = (accum[i] / weight[i].max(WEIGHT_EPSILON) as f64) as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(n: usize, sample_rate: u32, freq: f32, amp: f32) -> Vec<f32> {
        (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * std::f32::consts::PI * freq * t).sin() * amp
            })
            .collect()
    }

    #[test]
    fn zero_reduction_is_a_no_op() {
        let samples = sine(4096, 44_100, 440.0, 0.4);
        let mut buf = AudioBuffer::new(samples.clone(), 1, 44_100).unwrap();
        apply(&mut buf, 0.0);
        assert_eq!(buf.samples(), samples.as_slice());
    }

    #[test]
    fn short_segment_is_left_untouched() {
        let samples = vec![0.1f32; 100];
        let mut buf = AudioBuffer::new(samples.clone(), 1, 44_100).unwrap();
        apply(&mut buf, 0.5);
        assert_eq!(buf.samples(), samples.as_slice());
    }

    #[test]
    fn denoise_keeps_output_finite() {
        let mut samples = sine(20_000, 44_100, 300.0, 0.3);
        for (i, s) in samples.iter_mut().enumerate() {
            *s += ((i * 2654435761) % 1000) as f32 / 1000.0 * 0.02 - 0.01;
        }
        let mut buf = AudioBuffer::new(samples, 1, 44_100).unwrap();
        apply(&mut buf, 0.7);
        assert!(buf.samples().iter().all(|s| s.is_finite()));
    }

    #[test]
    fn denoise_reduces_energy_on_reasonable_settings() {
        let mut samples = sine(40_000, 44_100, 300.0, 0.05);
        for (i, s) in samples.iter_mut().enumerate() {
            *s += ((i * 2654435761) % 1000) as f32 / 1000.0 * 0.06 - 0.03;
        }
        let original_energy: f64 = samples.iter().map(|&s| (s as f64).powi(2)).sum();

        let mut buf = AudioBuffer::new(samples, 1, 44_100).unwrap();
        apply(&mut buf, 0.8);

        let processed_energy: f64 = buf.samples().iter().map(|&s| (s as f64).powi(2)).sum();
        assert!(processed_energy <= original_energy);
    }
}
