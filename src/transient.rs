//! Multi-band transient pre-classifier (§4.E).
//!
//! Mixes to mono, frames and FFTs the mix, buckets energy into three
//! bands, and flags frames whose band energy exceeds a per-segment 95th
//! percentile in any band. Flags dilate by one frame, then map down to a
//! per-sample boolean mask the impulse classifier (§4.F) uses to relax its
//! thresholds around real musical transients.

use num_complex::Complex64;

use crate::fft::fft;
use crate::types::AudioBuffer;
use crate::window::{
    adaptive_frame_size, frame_count_in_segment, hann_window, hop_size, TRANSIENT_FRAME_MAX,
    TRANSIENT_FRAME_MIN,
};

const BAND_LOW_HZ: f32 = 2_000.0;
const BAND_HIGH_HZ: f32 = 6_000.0;
const PERCENTILE: f32 = 0.95;

/// Per-sample transient mask plus a human-readable threshold summary.
pub struct TransientResult {
    /// `true` for every sample inside a dilated transient frame.
    pub mask: Vec<bool>,
    /// Per-band min/avg/max threshold summary, or empty when there was no
    /// frame to analyze.
    pub summary: String,
}

/// Run the detector over `buffer` without mutating it.
pub fn detect(buffer: &AudioBuffer) -> TransientResult {
    let frame_count = buffer.frame_count();
    let sample_rate = buffer.sample_rate();
    let channels = buffer.channels();

    let mut mask = vec![false; frame_count];
    if frame_count == 0 {
        return TransientResult {
            mask,
            summary: String::new(),
        };
    }

    let mono: Vec<f32> = (0..frame_count)
        .map(|f| {
            let sum: f32 = (0..channels).map(|c| buffer.get(f, c)).sum();
            sum / channels as f32
        })
        .collect();

    let frame_size = adaptive_frame_size(sample_rate, TRANSIENT_FRAME_MIN, TRANSIENT_FRAME_MAX);
    let hop = hop_size(frame_size);
    let window = hann_window(frame_size);
    let n_frames = frame_count_in_segment(mono.len(), frame_size, hop);

    if n_frames == 0 {
        log::trace!("transient: buffer too short for one analysis frame");
        return TransientResult {
            mask,
            summary: String::new(),
        };
    }

    let nyquist_bins = frame_size / 2 + 1;
    let band_energy = compute_band_energy(&mono, frame_size, hop, n_frames, &window, sample_rate, nyquist_bins);

    let seg_span = ((sample_rate as usize * 2) / hop.max(1)).max(1);
    let (flagged, stats) = flag_frames(&band_energy, n_frames, seg_span);
    let dilated = dilate(&flagged, n_frames);

    for (f, &is_transient) in dilated.iter().enumerate() {
        if is_transient {
            let start = f * hop;
            let end = (start + hop).min(frame_count);
            mask[start..end].fill(true);
        }
    }

    TransientResult {
        mask,
        summary: format_summary(seg_span, &stats),
    }
}

fn compute_band_energy(
    mono: &[f32],
    frame_size: usize,
    hop: usize,
    n_frames: usize,
    window: &[f32],
    sample_rate: u32,
    nyquist_bins: usize,
) -> Vec<[f32; 3]> {
    let bin_freq = |bin: usize| bin as f32 * sample_rate as f32 / frame_size as f32;

    (0..n_frames)
        .map(|f| {
            let start = f * hop;
            let mut spectrum: Vec<Complex64> = mono[start..start + frame_size]
                .iter()
                .zip(window.iter())
                .map(|(&s, &w)| Complex64::new((s * w) as f64, 0.0))
                .collect();
            fft(&mut spectrum, false).expect("frame_size is always a power of two");

            let mut energy = [0.0f32; 3];
            for bin in 0..nyquist_bins {
                let mag_sq = spectrum[bin].norm_sqr() as f32;
                let freq = bin_freq(bin);
                let band = if freq < BAND_LOW_HZ {
                    0
                } else if freq < BAND_HIGH_HZ {
                    1
                } else {
                    2
                };
                energy[band] += mag_sq;
            }
            energy
        })
        .collect()
}

/// Per-band (min, avg, max) threshold across all segments.
struct BandStats {
    min: [f32; 3],
    max: [f32; 3],
    sum: [f64; 3],
    count: [usize; 3],
}

fn flag_frames(band_energy: &[[f32; 3]], n_frames: usize, seg_span: usize) -> (Vec<bool>, BandStats) {
    let mut flagged = vec![false; n_frames];
    let mut stats = BandStats {
        min: [f32::MAX; 3],
        max: [f32::MIN; 3],
        sum: [0.0; 3],
        count: [0; 3],
    };

    let mut seg_start = 0;
    while seg_start < n_frames {
        let seg_end = (seg_start + seg_span).min(n_frames);

        for band in 0..3 {
            let mut values: Vec<f32> = (seg_start..seg_end).map(|f| band_energy[f][band]).collect();
            values.sort_by(|a, b| a.partial_cmp(b).unwrap());
            let threshold = percentile(&values, PERCENTILE);

            stats.min[band] = stats.min[band].min(threshold);
            stats.max[band] = stats.max[band].max(threshold);
            stats.sum[band] += threshold as f64;
            stats.count[band] += 1;

            for (f, frame_energy) in band_energy.iter().enumerate().take(seg_end).skip(seg_start) {
                if frame_energy[band] > threshold {
                    flagged[f] = true;
                }
            }
        }

        seg_start = seg_end;
    }

    (flagged, stats)
}

/// Linear-interpolation percentile over an already-sorted slice.
fn percentile(sorted: &[f32], p: f32) -> f32 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p * (sorted.len() - 1) as f32;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f32;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

fn dilate(flagged: &[bool], n_frames: usize) -> Vec<bool> {
    let mut dilated = flagged.to_vec();
    for f in 0..n_frames {
        if flagged[f] {
            if f > 0 {
                dilated[f - 1] = true;
            }
            if f + 1 < n_frames {
                dilated[f + 1] = true;
            }
        }
    }
    dilated
}

fn format_summary(seg_span: usize, stats: &BandStats) -> String {
    let names = ["low", "mid", "high"];
    let mut out = String::new();
    for (band, name) in names.iter().enumerate() {
        let min = if stats.min[band] == f32::MAX { 0.0 } else { stats.min[band] };
        let max = if stats.max[band] == f32::MIN { 0.0 } else { stats.max[band] };
        let avg = if stats.count[band] > 0 {
            (stats.sum[band] / stats.count[band] as f64) as f32
        } else {
            0.0
        };
        out.push_str(&format!("{name}: min={min:.6} avg={avg:.6} max={max:.6}; "));
    }
    out.push_str(&format!("segment_frames={seg_span}"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_has_no_transients() {
        let buf = AudioBuffer::new(vec![], 1, 44_100).unwrap();
        let result = detect(&buf);
        assert!(result.mask.is_empty());
        assert!(result.summary.is_empty());
    }

    #[test]
    fn short_buffer_produces_empty_summary() {
        let buf = AudioBuffer::new(vec![0.1; 10], 1, 44_100).unwrap();
        let result = detect(&buf);
        assert_eq!(result.mask.len(), 10);
        assert!(result.summary.is_empty());
    }

    #[test]
    fn impulse_in_quiet_signal_is_flagged() {
        let mut samples = vec![0.0f32; 20_000];
        samples[10_000] = 0.9;
        let buf = AudioBuffer::new(samples, 1, 44_100).unwrap();
        let result = detect(&buf);
        assert!(result.mask.iter().any(|&t| t));
        assert!(!result.summary.is_empty());
    }

    #[test]
    fn percentile_linear_interpolation() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let p50 = percentile(&values, 0.5);
        assert!((p50 - 3.0).abs() < 1e-6);
    }
}
