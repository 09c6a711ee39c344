//! Segment-RMS / noise-floor estimation (§4.C).

use crate::types::{AudioBuffer, NoiseProfile};

/// Segment span in frames: `max(sample_rate * 2, 1)`.
pub fn segment_frames(sample_rate: u32) -> usize {
    ((sample_rate as usize) * 2).max(1)
}

/// Partition the buffer into non-overlapping segments and compute each
/// segment's RMS across all channels, plus the scalar time-domain noise
/// floor (mean of the lowest 20% of segment RMS values, at least one).
pub fn analyze(buffer: &AudioBuffer) -> (NoiseProfile, f32) {
    let seg_frames = segment_frames(buffer.sample_rate());
    let frame_count = buffer.frame_count();
    let channels = buffer.channels();
    let samples = buffer.samples();

    let mut segment_rms = Vec::new();
    let mut start_frame = 0;
    while start_frame < frame_count {
        let end_frame = (start_frame + seg_frames).min(frame_count);
        let start = start_frame * channels;
        let end = end_frame * channels;
        let slice = &samples[start..end];

        let sum_sq: f64 = slice.iter().map(|&s| (s as f64) * (s as f64)).sum();
        let rms = if slice.is_empty() {
            0.0
        } else {
            (sum_sq / slice.len() as f64).sqrt() as f32
        };
        segment_rms.push(rms);

        start_frame = end_frame;
    }

    let noise_floor = lowest_quintile_mean(&segment_rms);

    (
        NoiseProfile {
            segment_rms,
            segment_frames: seg_frames,
            sample_rate: buffer.sample_rate(),
        },
        noise_floor,
    )
}

/// Mean of the lowest 20% of `values` (at least one value), or 0 if empty.
pub(crate) fn lowest_quintile_mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let count = ((sorted.len() as f32 * 0.2).floor() as usize).max(1).min(sorted.len());
    let sum: f64 = sorted[..count].iter().map(|&v| v as f64).sum();
    (sum / count as f64) as f32
}
