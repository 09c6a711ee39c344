//! Impulse classifier and repair (§4.F).
//!
//! A disjoint three-tier cascade — decrackle, pop, click — evaluated in
//! that order per sample. The first tier whose magnitude guard matches
//! claims the sample: its impulse-likeness test and repair run (or the
//! sample is left alone if the test rejects it), and no other tier is
//! tried. Repairs always read the *current*, partially-repaired buffer,
//! so later samples see earlier repairs in the same pass.

use crate::types::{DetectedEvent, DetectedEventType, ResolvedSettings};
use crate::types::AudioBuffer;

const DECRACKLE_WINDOW: usize = 2;
const DECRACKLE_ER: f32 = 2.2;
const DECRACKLE_HR: f32 = 1.4;

const POP_WINDOW: usize = 3;
const POP_ER: f32 = 2.5;
const POP_HR: f32 = 1.2;

const CLICK_WINDOW: usize = 2;
const CLICK_ER: f32 = 2.3;
const CLICK_HR: f32 = 1.4;

const DECRACKLE_INTERP_RADIUS: usize = 6;
const POP_INTERP_RADIUS: usize = 10;
const CLICK_INTERP_RADIUS: usize = 6;

const SINC_CUTOFF: f32 = 0.45;
const ZERO_RMS_GUARD: f32 = 1e-6;
const SILENT_IMPULSE_FLOOR: f32 = 0.001;
const WEIGHT_EPSILON: f32 = 1e-9;

/// Run the three-tier cascade over every sample of `buffer` in place,
/// iterating frames in order with channels innermost (§5 ordering).
pub fn classify_and_repair(
    buffer: &mut AudioBuffer,
    resolved: &ResolvedSettings,
    transient_mask: &[bool],
) -> Vec<DetectedEvent> {
    let frame_count = buffer.frame_count();
    let channels = buffer.channels();
    let mut events = Vec::new();

    for frame in 0..frame_count {
        let is_transient = transient_mask.get(frame).copied().unwrap_or(false);
        let click_threshold = resolved.click_threshold * if is_transient { 0.75 } else { 1.0 };
        let pop_threshold = resolved.pop_threshold * if is_transient { 0.85 } else { 1.0 };

        for channel in 0..channels {
            let magnitude = buffer.get(frame, channel).abs();

            if resolved.use_decrackle
                && resolved.noise_floor * 1.8 <= magnitude
                && magnitude < click_threshold
            {
                if is_impulse_like(buffer, frame, channel, DECRACKLE_WINDOW, DECRACKLE_ER, DECRACKLE_HR) {
                    events.push(DetectedEvent {
                        frame,
                        kind: DetectedEventType::Decrackle,
                        strength: magnitude,
                    });
                    let repaired = repair_decrackle(buffer, frame, channel, resolved);
                    *buffer.get_mut(frame, channel) = repaired;
                }
                continue;
            }

            if magnitude >= pop_threshold {
                if is_impulse_like(buffer, frame, channel, POP_WINDOW, POP_ER, POP_HR) {
                    events.push(DetectedEvent {
                        frame,
                        kind: DetectedEventType::Pop,
                        strength: magnitude,
                    });
                    let repaired = repair_pop(buffer, frame, channel, resolved);
                    *buffer.get_mut(frame, channel) = repaired;
                }
                continue;
            }

            if magnitude >= click_threshold {
                if is_impulse_like(buffer, frame, channel, CLICK_WINDOW, CLICK_ER, CLICK_HR) {
                    events.push(DetectedEvent {
                        frame,
                        kind: DetectedEventType::Click,
                        strength: magnitude,
                    });
                    let repaired = repair_click(buffer, frame, channel, resolved);
                    *buffer.get_mut(frame, channel) = repaired;
                }
            }
        }
    }

    events
}

/// `IsImpulseLike(frame, channel, w, ER, HR)` (§4.F).
pub(crate) fn is_impulse_like(
    buffer: &AudioBuffer,
    frame: usize,
    channel: usize,
    window: usize,
    energy_ratio: f32,
    hf_ratio: f32,
) -> bool {
    let sample = buffer.get(frame, channel);
    let magnitude = sample.abs();
    let rms = local_rms(buffer, frame, channel, window);

    if rms <= ZERO_RMS_GUARD {
        return magnitude > SILENT_IMPULSE_FLOOR;
    }

    let prev = buffer.get(clamp_index(frame as isize - 1, buffer.frame_count()), channel);
    let next = buffer.get(clamp_index(frame as isize + 1, buffer.frame_count()), channel);
    let hf_emphasis = (2.0 * sample - prev - next).abs();

    magnitude > rms * energy_ratio && hf_emphasis > rms * hf_ratio
}

fn clamp_index(index: isize, frame_count: usize) -> usize {
    if frame_count == 0 {
        0
    } else if index < 0 {
        0
    } else if index as usize >= frame_count {
        frame_count - 1
    } else {
        index as usize
    }
}

fn neighbors(buffer: &AudioBuffer, frame: usize, channel: usize, window: usize) -> Vec<f32> {
    let frame_count = buffer.frame_count();
    let mut values = Vec::with_capacity(window * 2);
    for delta in -(window as isize)..=(window as isize) {
        if delta == 0 {
            continue;
        }
        let idx = clamp_index(frame as isize + delta, frame_count);
        values.push(buffer.get(idx, channel));
    }
    values
}

pub(crate) fn local_rms(buffer: &AudioBuffer, frame: usize, channel: usize, window: usize) -> f32 {
    let values = neighbors(buffer, frame, channel, window);
    if values.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = values.iter().map(|&v| (v as f64) * (v as f64)).sum();
    (sum_sq / values.len() as f64).sqrt() as f32
}

/// Neighbor blend repair: `s*(1-I) + mean(neighbors)*I`.
fn neighbor_blend(buffer: &AudioBuffer, frame: usize, channel: usize, window: usize, intensity: f32) -> f32 {
    let sample = buffer.get(frame, channel);
    let values = neighbors(buffer, frame, channel, window);
    let mean = if values.is_empty() {
        sample
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    };
    let i = intensity.clamp(0.0, 1.0);
    sample * (1.0 - i) + mean * i
}

/// Median repair: median of the neighborhood (even count -> mean of the
/// two central values).
fn median_repair(buffer: &AudioBuffer, frame: usize, channel: usize, window: usize) -> f32 {
    let mut values = neighbors(buffer, frame, channel, window);
    if values.is_empty() {
        return buffer.get(frame, channel);
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

fn sinc(x: f32) -> f32 {
    if x.abs() < 1e-9 {
        1.0
    } else {
        x.sin() / x
    }
}

/// Band-limited (Lanczos-windowed sinc) interpolation, radius `R`.
fn band_limited_interpolate(buffer: &AudioBuffer, frame: usize, channel: usize, radius: usize) -> f32 {
    let frame_count = buffer.frame_count();
    let mut weighted_sum = 0.0f32;
    let mut weight_sum = 0.0f32;

    for delta in -(radius as isize)..=(radius as isize) {
        if delta == 0 {
            continue;
        }
        let idx = clamp_index(frame as isize + delta, frame_count);
        let d = delta as f32;
        let sinc_value = sinc(std::f32::consts::PI * SINC_CUTOFF * d);
        let hann_value = 0.54 + 0.46 * (std::f32::consts::PI * d.abs() / radius as f32).cos();
        let weight = sinc_value * hann_value;

        weighted_sum += weight * buffer.get(idx, channel);
        weight_sum += weight;
    }

    if weight_sum.abs() < WEIGHT_EPSILON {
        buffer.get(frame, channel)
    } else {
        weighted_sum / weight_sum
    }
}

fn interp_blend(interpolated: f32, sample: f32, intensity: f32) -> f32 {
    let i = intensity.clamp(0.0, 1.0);
    sample * (1.0 - i) + interpolated * i
}

fn repair_decrackle(buffer: &AudioBuffer, frame: usize, channel: usize, resolved: &ResolvedSettings) -> f32 {
    if resolved.use_band_limited_interpolation {
        let interpolated = band_limited_interpolate(buffer, frame, channel, DECRACKLE_INTERP_RADIUS);
        interp_blend(interpolated, buffer.get(frame, channel), resolved.decrackle_intensity)
    } else {
        neighbor_blend(buffer, frame, channel, 1, resolved.decrackle_intensity)
    }
}

fn repair_pop(buffer: &AudioBuffer, frame: usize, channel: usize, resolved: &ResolvedSettings) -> f32 {
    if resolved.use_band_limited_interpolation {
        let interpolated = band_limited_interpolate(buffer, frame, channel, POP_INTERP_RADIUS);
        interp_blend(interpolated, buffer.get(frame, channel), resolved.pop_intensity)
    } else if resolved.use_median_repair {
        median_repair(buffer, frame, channel, 3)
    } else {
        neighbor_blend(buffer, frame, channel, 3, resolved.pop_intensity)
    }
}

fn repair_click(buffer: &AudioBuffer, frame: usize, channel: usize, resolved: &ResolvedSettings) -> f32 {
    if resolved.use_band_limited_interpolation {
        let interpolated = band_limited_interpolate(buffer, frame, channel, CLICK_INTERP_RADIUS);
        interp_blend(interpolated, buffer.get(frame, channel), resolved.click_intensity)
    } else if resolved.use_median_repair {
        median_repair(buffer, frame, channel, 1)
    } else {
        neighbor_blend(buffer, frame, channel, 1, resolved.click_intensity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AutoSettings;

    fn resolved(noise_floor: f32) -> ResolvedSettings {
        ResolvedSettings::from_auto(
            &AutoSettings {
                click_sensitivity: 0.3,
                pop_sensitivity: 0.3,
                ..AutoSettings::default()
            },
            noise_floor,
        )
    }

    #[test]
    fn obvious_click_is_detected_and_repaired() {
        let mut samples = vec![0.01f32; 2000];
        for i in (0..samples.len()).step_by(2) {
            samples[i] = if i % 4 == 0 { 0.01 } else { -0.01 };
        }
        samples[1000] = 0.8;
        let mut buffer = AudioBuffer::new(samples, 1, 44_100).unwrap();

        let resolved = resolved(0.01);
        let mask = vec![false; buffer.frame_count()];
        let events = classify_and_repair(&mut buffer, &resolved, &mask);

        assert!(!events.is_empty());
        assert!(buffer.get(1000, 0).abs() < 0.8);
    }

    #[test]
    fn silent_buffer_produces_no_events() {
        let mut buffer = AudioBuffer::new(vec![0.0; 5000], 1, 44_100).unwrap();
        let resolved = resolved(0.0);
        let mask = vec![false; buffer.frame_count()];
        let events = classify_and_repair(&mut buffer, &resolved, &mask);
        assert!(events.is_empty());
    }

    #[test]
    fn zero_local_rms_uses_silent_floor() {
        let mut below = vec![0.0f32; 11];
        below[5] = 0.0005; // <= 0.001 silent floor
        let buffer_below = AudioBuffer::new(below, 1, 44_100).unwrap();
        assert!(!is_impulse_like(&buffer_below, 5, 0, 2, 2.2, 1.4));

        let mut above = vec![0.0f32; 11];
        above[5] = 0.01; // > 0.001 silent floor
        let buffer_above = AudioBuffer::new(above, 1, 44_100).unwrap();
        assert!(is_impulse_like(&buffer_above, 5, 0, 2, 2.2, 1.4));
    }

    #[test]
    fn band_limited_interpolate_falls_back_on_degenerate_weights() {
        let buffer = AudioBuffer::new(vec![0.5; 3], 1, 44_100).unwrap();
        let value = band_limited_interpolate(&buffer, 1, 0, 0);
        assert_eq!(value, 0.5);
    }

    #[test]
    fn median_repair_even_window_averages_center_pair() {
        let buffer = AudioBuffer::new(vec![1.0, 2.0, 0.0, 4.0], 1, 44_100).unwrap();
        // window=1 around frame 2: neighbors are frame1=2.0 and frame3=4.0
        let value = median_repair(&buffer, 2, 0, 1);
        assert_eq!(value, 3.0);
    }
}
