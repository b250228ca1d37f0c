//! DSP worklet modules
//!
//! Transform modules are identified by a fixed logical path and loaded once
//! per execution-context instantiation. Resolving an unknown path fails the
//! same way a missing resource does at context setup.

use crate::audio::params::EffectParameter;
use crate::error::{Error, Result};

/// Logical path of the adjustable noise suppressor module
pub const NOISE_SUPPRESSOR_MODULE: &str = "worklets/adjustable-noise-suppressor";

/// Name of the suppressor's live parameter
pub const SUPPRESSION_LEVEL_PARAM: &str = "suppressionLevel";

/// A unit of DSP logic applied to an audio block.
///
/// # Real-Time Constraints
/// `process` runs on the real-time worker thread: no allocations, no
/// blocking operations.
pub trait AudioTransform: Send {
    /// Process interleaved samples in-place
    fn process(&mut self, samples: &mut [f32], sample_rate: u32);

    /// Write a named parameter. Out-of-range values are clamped, unknown
    /// names are ignored; writes never fail.
    fn set_parameter(&mut self, name: &str, value: f32);

    /// Reset internal state (envelopes, filter history)
    fn reset(&mut self);

    /// Transform name (for logging)
    fn name(&self) -> &'static str;
}

/// A loaded transform module: a factory for transform instances
#[derive(Clone, Copy)]
pub struct WorkletModule {
    path: &'static str,
    factory: fn(f32) -> Box<dyn AudioTransform>,
}

impl WorkletModule {
    pub fn path(&self) -> &'static str {
        self.path
    }

    /// Instantiate the transform, parameterized with the initial
    /// suppression level
    pub fn instantiate(&self, level: f32) -> Box<dyn AudioTransform> {
        (self.factory)(level)
    }
}

impl std::fmt::Debug for WorkletModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkletModule").field("path", &self.path).finish()
    }
}

fn noise_suppressor_factory(level: f32) -> Box<dyn AudioTransform> {
    Box::new(NoiseSuppressor::new(level))
}

const MODULES: &[WorkletModule] = &[WorkletModule {
    path: NOISE_SUPPRESSOR_MODULE,
    factory: noise_suppressor_factory,
}];

/// Resolve a logical module path
pub fn load(path: &str) -> Result<WorkletModule> {
    MODULES
        .iter()
        .copied()
        .find(|module| module.path == path)
        .ok_or_else(|| Error::Initialization(format!("unknown worklet module: {path}")))
}

// Per-block smoothing toward rising energy and falling energy.
const ENVELOPE_ATTACK: f32 = 0.35;
const ENVELOPE_RELEASE: f32 = 0.08;
// RMS below this counts as noise.
const NOISE_FLOOR: f32 = 0.02;
// Per-sample gain slew, keeps level changes free of zipper noise.
const GAIN_SMOOTHING: f32 = 0.15;

/// Adjustable noise suppressor: a downward expander driven by a short-term
/// RMS envelope.
///
/// A suppression level of 0.0 leaves the signal untouched; 1.0 gates
/// low-energy passages hard. Signal above the noise floor passes at unity
/// gain regardless of the level.
pub struct NoiseSuppressor {
    level: EffectParameter,
    envelope: f32,
    gain: f32,
}

impl NoiseSuppressor {
    pub fn new(level: f32) -> Self {
        Self {
            level: EffectParameter::new(SUPPRESSION_LEVEL_PARAM, level, 0.0..=1.0),
            envelope: 0.0,
            gain: 1.0,
        }
    }

    /// Current suppression level
    pub fn level(&self) -> f32 {
        self.level.value()
    }

    fn target_gain(&self) -> f32 {
        let level = self.level.value();
        if level <= f32::EPSILON || self.envelope >= NOISE_FLOOR {
            return 1.0;
        }
        // Attenuation deepens as the envelope falls below the floor and as
        // the suppression level rises.
        let depth = 1.0 - self.envelope / NOISE_FLOOR;
        (1.0 - level * depth).max(0.0)
    }
}

impl AudioTransform for NoiseSuppressor {
    fn process(&mut self, samples: &mut [f32], _sample_rate: u32) {
        if samples.is_empty() {
            return;
        }

        let mean_sq = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
        let rms = mean_sq.sqrt();
        let coeff = if rms > self.envelope { ENVELOPE_ATTACK } else { ENVELOPE_RELEASE };
        self.envelope += coeff * (rms - self.envelope);

        let target = self.target_gain();
        for sample in samples.iter_mut() {
            self.gain += GAIN_SMOOTHING * (target - self.gain);
            *sample *= self.gain;
        }
    }

    fn set_parameter(&mut self, name: &str, value: f32) {
        if name == self.level.name() {
            self.level.set(value);
        }
    }

    fn reset(&mut self) {
        self.envelope = 0.0;
        self.gain = 1.0;
    }

    fn name(&self) -> &'static str {
        "AdjustableNoiseSuppressor"
    }
}
