//! Offline DSP pipeline for restoring vinyl transfers: spectral denoise,
//! multi-band transient pre-classification, and a three-tier impulse
//! (decrackle/pop/click) classifier and repair cascade.
//!
//! The crate exposes a single entry point, [`process`], that takes a
//! decoded [`AudioBuffer`] and a [`ProcessingSettings`] choice and returns
//! a [`ProcessingResult`] holding the repaired buffer, the input/output
//! difference, and numeric diagnostics. WAV decoding/encoding and any
//! event persistence are a host concern — see [`export`] for the pure
//! data shaping this crate offers toward that.

mod denoise;
mod diagnostics;
mod error;
mod export;
mod fft;
mod impulse;
mod noise_floor;
mod pipeline;
mod transient;
mod types;
mod window;

pub use error::{RestoreError, RestoreResult};
pub use export::{to_csv, to_json};
pub use pipeline::process;
pub use types::{
    AudioBuffer, AutoSettings, DetectedEvent, DetectedEventType, ManualSettings, NoiseProfile,
    ProcessingArtifacts, ProcessingDiagnostics, ProcessingResult, ProcessingSettings,
};
