//! Pipeline orchestrator (§4.H).
//!
//! Sequences the other components against one request: estimate the noise
//! floor, resolve settings to concrete thresholds, optionally denoise,
//! optionally pre-classify transients, run the impulse cascade, then
//! compute diagnostics against the untouched input.

use std::time::Instant;

use crate::denoise;
use crate::diagnostics;
use crate::error::{RestoreError, RestoreResult};
use crate::impulse;
use crate::noise_floor;
use crate::transient::{self, TransientResult};
use crate::types::{
    AudioBuffer, AutoSettings, ManualSettings, ProcessingArtifacts, ProcessingDiagnostics,
    ProcessingResult, ProcessingSettings, ResolvedSettings,
};

/// Run the full restoration pipeline against `input`, producing a repaired
/// buffer, the input/output difference, and diagnostics. `input` is never
/// mutated; all work happens on an internal clone.
#[tracing::instrument(skip(input, settings), fields(frame_count = input.frame_count(), channels = input.channels()))]
pub fn process(input: &AudioBuffer, settings: &ProcessingSettings) -> RestoreResult<ProcessingResult> {
    let start = Instant::now();
    validate_settings(settings)?;

    let (profile, estimated_noise_floor) = noise_floor::analyze(input);
    log::trace!("pipeline: estimated noise floor {estimated_noise_floor}");

    let resolved = resolve(settings, estimated_noise_floor)?;

    let mut processed = input.clone();

    if resolved.use_spectral_noise_reduction {
        denoise::apply(&mut processed, resolved.noise_reduction_amount);
    }

    let TransientResult { mask, summary } = if resolved.use_multi_band_transient_detection {
        transient::detect(&processed)
    } else {
        TransientResult {
            mask: vec![false; processed.frame_count()],
            summary: String::new(),
        }
    };

    let events = impulse::classify_and_repair(&mut processed, &resolved, &mask);

    let difference = diagnostics::difference(input, &processed);
    let processing_gain_db = diagnostics::processing_gain_db(input, &difference);
    let delta_rms = diagnostics::delta_rms(input, &processed);
    let residual_clicks = diagnostics::count_residual_clicks(&processed, resolved.click_threshold);
    let (clicks_detected, pops_detected, decrackles_detected) = diagnostics::tally_events(&events);

    let diagnostics = ProcessingDiagnostics {
        elapsed_time: start.elapsed(),
        clicks_detected,
        pops_detected,
        decrackles_detected,
        residual_clicks,
        estimated_noise_floor,
        processing_gain_db,
        delta_rms,
        transient_threshold_summary: summary,
    };

    log::debug!(
        "pipeline: {} clicks, {} pops, {} decrackles, {} residual, gain={:.2}dB, elapsed={:?}",
        diagnostics.clicks_detected,
        diagnostics.pops_detected,
        diagnostics.decrackles_detected,
        diagnostics.residual_clicks,
        diagnostics.processing_gain_db,
        diagnostics.elapsed_time,
    );

    Ok(ProcessingResult {
        processed,
        difference,
        diagnostics,
        artifacts: ProcessingArtifacts {
            events,
            noise_profile: profile,
        },
    })
}

fn resolve(settings: &ProcessingSettings, estimated_noise_floor: f32) -> RestoreResult<ResolvedSettings> {
    match settings {
        ProcessingSettings::Auto(auto) => Ok(ResolvedSettings::from_auto(auto, estimated_noise_floor)),
        ProcessingSettings::Manual(manual) => ResolvedSettings::from_manual(manual),
    }
}

fn validate_settings(settings: &ProcessingSettings) -> RestoreResult<()> {
    match settings {
        ProcessingSettings::Auto(auto) => validate_auto(auto),
        ProcessingSettings::Manual(manual) => validate_manual(manual),
    }
}

fn validate_auto(settings: &AutoSettings) -> RestoreResult<()> {
    let fields = [
        settings.click_sensitivity,
        settings.pop_sensitivity,
        settings.noise_reduction_amount,
        settings.decrackle_intensity,
        settings.spectral_masking_strength,
    ];
    reject_non_finite(&fields)
}

fn validate_manual(settings: &ManualSettings) -> RestoreResult<()> {
    let fields = [
        settings.click_threshold,
        settings.click_intensity,
        settings.pop_threshold,
        settings.pop_intensity,
        settings.noise_floor,
        settings.noise_reduction_amount,
        settings.decrackle_intensity,
        settings.spectral_masking_strength,
    ];
    reject_non_finite(&fields)
}

fn reject_non_finite(fields: &[f32]) -> RestoreResult<()> {
    if fields.iter().any(|f| !f.is_finite()) {
        return Err(RestoreError::InvalidConfiguration {
            reason: "settings contain a non-finite value".to_string(),
        });
    }
    Ok(())
}
