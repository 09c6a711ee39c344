//! Diagnostics and difference computation (§4.G).

use crate::impulse::is_impulse_like;
use crate::types::{AudioBuffer, DetectedEvent, DetectedEventType};

const RESIDUAL_WINDOW: usize = 2;
const RESIDUAL_ER: f32 = 2.1;
const RESIDUAL_HR: f32 = 1.2;
const LOG_EPSILON: f64 = 1e-9;

/// `input - processed`, sample for sample. Buffers must have identical
/// shape (the pipeline always diffs a clone against itself).
pub fn difference(input: &AudioBuffer, processed: &AudioBuffer) -> AudioBuffer {
    let diff: Vec<f32> = input
        .samples()
        .iter()
        .zip(processed.samples())
        .map(|(&a, &b)| a - b)
        .collect();
    AudioBuffer::new(diff, input.channels(), input.sample_rate())
        .expect("difference has the same shape as its inputs")
}

fn rms(buffer: &AudioBuffer) -> f64 {
    let samples = buffer.samples();
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

/// `20*log10((rms(input)+eps)/(rms(difference)+eps))`, 0 if the difference
/// is silent.
pub fn processing_gain_db(input: &AudioBuffer, diff: &AudioBuffer) -> f32 {
    let diff_rms = rms(diff);
    if diff_rms == 0.0 {
        return 0.0;
    }
    let input_rms = rms(input);
    (20.0 * ((input_rms + LOG_EPSILON) / (diff_rms + LOG_EPSILON)).log10()) as f32
}

/// `rms(processed) - rms(original)`.
pub fn delta_rms(input: &AudioBuffer, processed: &AudioBuffer) -> f32 {
    (rms(processed) - rms(input)) as f32
}

/// Count click-like samples still present in the processed buffer, using
/// the relaxed residual window/ratios and the click threshold (§4.G: "the
/// impulse-likeness test … and the click threshold"). No repair is
/// performed here — this is a read-only quality metric.
pub fn count_residual_clicks(processed: &AudioBuffer, click_threshold: f32) -> usize {
    let frame_count = processed.frame_count();
    let channels = processed.channels();
    let mut count = 0;

    for frame in 0..frame_count {
        for channel in 0..channels {
            let magnitude = processed.get(frame, channel).abs();
            if magnitude >= click_threshold
                && is_impulse_like(processed, frame, channel, RESIDUAL_WINDOW, RESIDUAL_ER, RESIDUAL_HR)
            {
                count += 1;
            }
        }
    }

    count
}

/// Tally accepted events by tier.
pub fn tally_events(events: &[DetectedEvent]) -> (usize, usize, usize) {
    let mut clicks = 0;
    let mut pops = 0;
    let mut decrackles = 0;
    for event in events {
        match event.kind {
            DetectedEventType::Click => clicks += 1,
            DetectedEventType::Pop => pops += 1,
            DetectedEventType::Decrackle => decrackles += 1,
        }
    }
    (clicks, pops, decrackles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difference_of_identical_buffers_is_silent() {
        let buf = AudioBuffer::new(vec![0.1, -0.2, 0.3, 0.4], 2, 44_100).unwrap();
        let diff = difference(&buf, &buf);
        assert!(diff.samples().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn processing_gain_is_zero_when_unchanged() {
        let buf = AudioBuffer::new(vec![0.1, -0.2, 0.3, 0.4], 2, 44_100).unwrap();
        let diff = difference(&buf, &buf);
        assert_eq!(processing_gain_db(&buf, &diff), 0.0);
    }

    #[test]
    fn processing_gain_is_positive_when_difference_is_smaller() {
        let input = AudioBuffer::new(vec![0.5; 1000], 1, 44_100).unwrap();
        let processed = AudioBuffer::new(vec![0.1; 1000], 1, 44_100).unwrap();
        let diff = difference(&input, &processed);
        assert!(processing_gain_db(&input, &diff) > 0.0);
    }

    #[test]
    fn tally_counts_each_tier() {
        let events = vec![
            DetectedEvent { frame: 0, kind: DetectedEventType::Click, strength: 0.1 },
            DetectedEvent { frame: 1, kind: DetectedEventType::Pop, strength: 0.2 },
            DetectedEvent { frame: 2, kind: DetectedEventType::Click, strength: 0.3 },
        ];
        let (clicks, pops, decrackles) = tally_events(&events);
        assert_eq!(clicks, 2);
        assert_eq!(pops, 1);
        assert_eq!(decrackles, 0);
    }

    #[test]
    fn residual_clicks_counts_without_mutating() {
        let mut samples = vec![0.01f32; 2000];
        for i in (0..samples.len()).step_by(2) {
            samples[i] = -samples[i];
        }
        samples[900] = 0.9;
        let buf = AudioBuffer::new(samples.clone(), 1, 44_100).unwrap();
        let count = count_residual_clicks(&buf, 0.5);
        assert!(count >= 1);
        assert_eq!(buf.samples(), samples.as_slice());
    }

    #[test]
    fn residual_clicks_ignores_sub_threshold_impulse_like_samples() {
        // magnitude 0.2 is impulse-like against quiet neighbors but sits
        // below a 0.5 click threshold, so it must not count as residual.
        let mut samples = vec![0.0f32; 11];
        samples[5] = 0.2;
        let buf = AudioBuffer::new(samples, 1, 44_100).unwrap();
        assert!(is_impulse_like(&buf, 5, 0, RESIDUAL_WINDOW, RESIDUAL_ER, RESIDUAL_HR));
        assert_eq!(count_residual_clicks(&buf, 0.5), 0);
    }
}
