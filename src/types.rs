//! Core data model: buffers, settings, events, diagnostics and results.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RestoreError, RestoreResult};

/// Interleaved multichannel PCM buffer.
///
/// Invariants: `samples.len() == frame_count() * channels`, `channels >= 1`,
/// `sample_rate > 0`. Immutable once constructed — the pipeline clones the
/// input into a working buffer before mutating anything.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Construct a buffer, validating the invariants.
    pub fn new(samples: Vec<f32>, channels: usize, sample_rate: u32) -> RestoreResult<Self> {
        if channels == 0 {
            return Err(RestoreError::InvalidInput {
                reason: "channels must be at least 1".to_string(),
            });
        }
        if sample_rate == 0 {
            return Err(RestoreError::InvalidInput {
                reason: "sample rate must be positive".to_string(),
            });
        }
        if samples.len() % channels != 0 {
            return Err(RestoreError::InvalidInput {
                reason: format!(
                    "sample count {} is not a multiple of channel count {}",
                    samples.len(),
                    channels
                ),
            });
        }
        Ok(Self {
            samples,
            channels,
            sample_rate,
        })
    }

    /// Number of channels.
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Sample rate in Hz.
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of multi-channel frames.
    #[inline]
    pub fn frame_count(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }

    /// Interleaved sample slice.
    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Mutable interleaved sample slice.
    #[inline]
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Consume the buffer, returning its interleaved samples.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Sample at `(frame, channel)`.
    #[inline]
    pub fn get(&self, frame: usize, channel: usize) -> f32 {
        self.samples[frame * self.channels + channel]
    }

    /// Mutable reference to the sample at `(frame, channel)`.
    #[inline]
    pub fn get_mut(&mut self, frame: usize, channel: usize) -> &mut f32 {
        &mut self.samples[frame * self.channels + channel]
    }
}

/// Auto-mode settings: sensitivities and amount knobs, with thresholds
/// derived internally from the estimated noise floor (§4.F).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoSettings {
    /// Click detection sensitivity, 0..1.
    pub click_sensitivity: f32,
    /// Pop detection sensitivity, 0..1.
    pub pop_sensitivity: f32,
    /// Spectral noise reduction amount, 0..1.
    pub noise_reduction_amount: f32,
    /// Use median-filter repair as a fallback tier.
    pub use_median_repair: bool,
    /// Run the spectral denoiser (§4.D).
    pub use_spectral_noise_reduction: bool,
    /// Run the multi-band transient detector (§4.E) to bias thresholds.
    pub use_multi_band_transient_detection: bool,
    /// Run the decrackle tier (§4.F).
    pub use_decrackle: bool,
    /// Use band-limited (Lanczos) interpolation instead of simpler repairs.
    pub use_band_limited_interpolation: bool,
    /// Decrackle repair blend intensity, 0..1.
    pub decrackle_intensity: f32,
    /// Extra reduction scale applied in "gentle flooring" mode, 0..1.
    pub spectral_masking_strength: f32,
}

impl Default for AutoSettings {
    fn default() -> Self {
        Self {
            click_sensitivity: 0.5,
            pop_sensitivity: 0.5,
            noise_reduction_amount: 0.3,
            use_median_repair: true,
            use_spectral_noise_reduction: true,
            use_multi_band_transient_detection: true,
            use_decrackle: false,
            use_band_limited_interpolation: true,
            decrackle_intensity: 0.5,
            spectral_masking_strength: 0.6,
        }
    }
}

/// Manual-mode settings: absolute thresholds and intensities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualSettings {
    /// Absolute click magnitude threshold.
    pub click_threshold: f32,
    /// Click repair blend intensity, 0..1.
    pub click_intensity: f32,
    /// Absolute pop magnitude threshold.
    pub pop_threshold: f32,
    /// Pop repair blend intensity, 0..1.
    pub pop_intensity: f32,
    /// Baseline noise floor amplitude (used by the decrackle guard).
    pub noise_floor: f32,
    /// Spectral noise reduction amount, 0..1.
    pub noise_reduction_amount: f32,
    /// Use median-filter repair as a fallback tier.
    pub use_median_repair: bool,
    /// Run the spectral denoiser (§4.D).
    pub use_spectral_noise_reduction: bool,
    /// Run the multi-band transient detector (§4.E) to bias thresholds.
    pub use_multi_band_transient_detection: bool,
    /// Run the decrackle tier (§4.F).
    pub use_decrackle: bool,
    /// Use band-limited (Lanczos) interpolation instead of simpler repairs.
    pub use_band_limited_interpolation: bool,
    /// Decrackle repair blend intensity, 0..1.
    pub decrackle_intensity: f32,
    /// Extra reduction scale applied in "gentle flooring" mode, 0..1.
    pub spectral_masking_strength: f32,
}

/// Processing configuration: a tagged choice between auto and manual tuning.
///
/// Exactly one variant is active per request — there is no "both" or
/// "neither" state representable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ProcessingSettings {
    /// Sensitivity/amount knobs; thresholds derived from the estimated
    /// noise floor.
    Auto(AutoSettings),
    /// Absolute thresholds and intensities.
    Manual(ManualSettings),
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self::Auto(AutoSettings::default())
    }
}

/// Tier of a detected impulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectedEventType {
    /// Low-level continuous vinyl crackle.
    Decrackle,
    /// Short, sharp impulse.
    Click,
    /// Larger, longer impulse.
    Pop,
}

/// A single accepted impulse detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedEvent {
    /// Frame index, `0..frame_count`.
    pub frame: usize,
    /// Detection tier.
    pub kind: DetectedEventType,
    /// Pre-repair magnitude of the offending sample.
    pub strength: f32,
}

/// Segment-RMS noise profile (§4.C).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseProfile {
    /// Per-segment RMS, in segment order.
    pub segment_rms: Vec<f32>,
    /// Frames per segment.
    pub segment_frames: usize,
    /// Sample rate the segmentation was computed against.
    pub sample_rate: u32,
}

/// Numeric diagnostics produced alongside a processed buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingDiagnostics {
    /// Wall-clock time spent in `process`.
    pub elapsed_time: Duration,
    /// Accepted click-tier events.
    pub clicks_detected: usize,
    /// Accepted pop-tier events.
    pub pops_detected: usize,
    /// Accepted decrackle-tier events.
    pub decrackles_detected: usize,
    /// Click-like samples remaining in the processed buffer.
    pub residual_clicks: usize,
    /// Scalar time-domain noise floor estimate (§4.C).
    pub estimated_noise_floor: f32,
    /// `20*log10((rms(input)+eps)/(rms(difference)+eps))`, or 0 if the
    /// difference is silent.
    pub processing_gain_db: f32,
    /// `rms(processed) - rms(original)`.
    pub delta_rms: f32,
    /// Human-readable multi-band transient threshold summary (§4.E).
    pub transient_threshold_summary: String,
}

/// Detected events and the noise profile, bundled for export (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingArtifacts {
    /// Events in frame-major, then channel-major insertion order.
    pub events: Vec<DetectedEvent>,
    /// Segment-RMS noise profile.
    pub noise_profile: NoiseProfile,
}

/// The outcome of a `process` call.
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The repaired/denoised buffer. Same shape as the input.
    pub processed: AudioBuffer,
    /// `input - processed`, sample for sample.
    pub difference: AudioBuffer,
    /// Numeric diagnostics.
    pub diagnostics: ProcessingDiagnostics,
    /// Detected events and noise profile.
    pub artifacts: ProcessingArtifacts,
}

/// Settings resolved to a single concrete set of thresholds/flags,
/// regardless of which `ProcessingSettings` variant the caller chose.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedSettings {
    pub click_threshold: f32,
    pub click_intensity: f32,
    pub pop_threshold: f32,
    pub pop_intensity: f32,
    /// Baseline noise floor used by the decrackle guard (§4.F).
    pub noise_floor: f32,
    pub noise_reduction_amount: f32,
    pub use_median_repair: bool,
    pub use_spectral_noise_reduction: bool,
    pub use_multi_band_transient_detection: bool,
    pub use_decrackle: bool,
    pub use_band_limited_interpolation: bool,
    pub decrackle_intensity: f32,
    pub spectral_masking_strength: f32,
}

fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

impl ResolvedSettings {
    /// Resolve auto-mode thresholds from sensitivities and an estimated
    /// noise floor (§4.F "Auto-mode threshold derivation").
    pub fn from_auto(settings: &AutoSettings, estimated_noise_floor: f32) -> Self {
        let click_sensitivity = clamp01(settings.click_sensitivity);
        let pop_sensitivity = clamp01(settings.pop_sensitivity);
        Self {
            click_threshold: estimated_noise_floor * (1.0 + 8.0 * click_sensitivity),
            click_intensity: 0.7 + 0.3 * click_sensitivity,
            pop_threshold: estimated_noise_floor * (1.0 + 12.0 * pop_sensitivity),
            pop_intensity: 0.8 + 0.2 * pop_sensitivity,
            noise_floor: estimated_noise_floor,
            noise_reduction_amount: clamp01(settings.noise_reduction_amount),
            use_median_repair: settings.use_median_repair,
            use_spectral_noise_reduction: settings.use_spectral_noise_reduction,
            use_multi_band_transient_detection: settings.use_multi_band_transient_detection,
            use_decrackle: settings.use_decrackle,
            use_band_limited_interpolation: settings.use_band_limited_interpolation,
            decrackle_intensity: clamp01(settings.decrackle_intensity),
            spectral_masking_strength: clamp01(settings.spectral_masking_strength),
        }
    }

    /// Resolve manual-mode settings: thresholds and noise floor are taken
    /// verbatim (clamped to non-negative), everything else clamped to 0..1.
    pub fn from_manual(settings: &ManualSettings) -> RestoreResult<Self> {
        Ok(Self {
            click_threshold: settings.click_threshold.max(0.0),
            click_intensity: clamp01(settings.click_intensity),
            pop_threshold: settings.pop_threshold.max(0.0),
            pop_intensity: clamp01(settings.pop_intensity),
            noise_floor: settings.noise_floor.max(0.0),
            noise_reduction_amount: clamp01(settings.noise_reduction_amount),
            use_median_repair: settings.use_median_repair,
            use_spectral_noise_reduction: settings.use_spectral_noise_reduction,
            use_multi_band_transient_detection: settings.use_multi_band_transient_detection,
            use_decrackle: settings.use_decrackle,
            use_band_limited_interpolation: settings.use_band_limited_interpolation,
            decrackle_intensity: clamp01(settings.decrackle_intensity),
            spectral_masking_strength: clamp01(settings.spectral_masking_strength),
        })
    }
}
