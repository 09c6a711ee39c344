//! Window generation and frame/segment sizing (§4.B).

/// Minimum/maximum analysis frame size for the spectral denoiser.
pub const DENOISE_FRAME_MIN: usize = 512;
pub const DENOISE_FRAME_MAX: usize = 8192;

/// Minimum/maximum analysis frame size for the transient detector.
pub const TRANSIENT_FRAME_MIN: usize = 512;
pub const TRANSIENT_FRAME_MAX: usize = 4096;

/// Target analysis frame duration, in seconds.
const TARGET_FRAME_SECONDS: f64 = 0.023;

/// Maximum samples per channel held in one denoiser segment.
pub const MAX_SEGMENT_SAMPLES: usize = 1_000_000;

/// Generate a length-`len` Hann window: `w[i] = 0.5*(1 - cos(2*pi*i/(len-1)))`.
///
/// `len == 1` returns `[1.0]` (the formula's denominator would be zero).
pub fn hann_window(len: usize) -> Vec<f32> {
    if len == 0 {
        return Vec::new();
    }
    if len == 1 {
        return vec![1.0];
    }
    (0..len)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * i as f64 / (len - 1) as f64;
            (0.5 * (1.0 - phase.cos())) as f32
        })
        .collect()
}

/// Pick the adaptive analysis frame size for a given sample rate: target
/// 23ms of audio, rounded up to the next power of two, clamped to
/// `[min, max]`.
pub fn adaptive_frame_size(sample_rate: u32, min: usize, max: usize) -> usize {
    let target = (sample_rate as f64 * TARGET_FRAME_SECONDS).max(1.0);
    let size = (target as usize).next_power_of_two();
    size.clamp(min, max)
}

/// Hop size for 50% overlap.
#[inline]
pub fn hop_size(frame_size: usize) -> usize {
    frame_size / 2
}

/// Number of overlapping analysis frames that fit in `segment_len` samples
/// at the given frame/hop size, or 0 if the segment is too short for even
/// one frame.
pub fn frame_count_in_segment(segment_len: usize, frame_size: usize, hop: usize) -> usize {
    if segment_len < frame_size || hop == 0 {
        return 0;
    }
    (segment_len - frame_size) / hop + 1
}
