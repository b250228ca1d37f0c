//! Typed configuration for the effects pipeline
//!
//! Every field is named and validated; out-of-range values are corrected,
//! not rejected.

use crate::audio::worklet::NOISE_SUPPRESSOR_MODULE;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EffectsConfig {
    pub audio: AudioEffectsConfig,
    pub video: VideoEffectsConfig,
}

impl EffectsConfig {
    /// Clamp-and-floor validation of every field
    pub fn validated(mut self) -> Self {
        self.audio.default_suppression_level =
            self.audio.default_suppression_level.clamp(0.0, 1.0);
        if self.video.refresh_rate == 0 {
            self.video.refresh_rate = DEFAULT_REFRESH_RATE;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AudioEffectsConfig {
    /// Suppression level transforms are constructed with, in [0, 1]
    pub default_suppression_level: f32,
    /// Logical path of the DSP transform module
    pub worklet_module: String,
}

impl Default for AudioEffectsConfig {
    fn default() -> Self {
        Self {
            default_suppression_level: 0.5,
            worklet_module: NOISE_SUPPRESSOR_MODULE.to_string(),
        }
    }
}

const DEFAULT_REFRESH_RATE: u32 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VideoEffectsConfig {
    /// Frame-copy loop rate in ticks per second, aligned to the display
    /// refresh
    pub refresh_rate: u32,
}

impl Default for VideoEffectsConfig {
    fn default() -> Self {
        Self {
            refresh_rate: DEFAULT_REFRESH_RATE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let config: EffectsConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EffectsConfig::default());
        assert_eq!(config.audio.default_suppression_level, 0.5);
        assert_eq!(config.audio.worklet_module, NOISE_SUPPRESSOR_MODULE);
        assert_eq!(config.video.refresh_rate, 60);
    }

    #[test]
    fn partial_json_overrides_fields() {
        let config: EffectsConfig =
            serde_json::from_str("{\"audio\":{\"defaultSuppressionLevel\":0.7}}").unwrap();
        assert_eq!(config.audio.default_suppression_level, 0.7);
        assert_eq!(config.video.refresh_rate, 60);
    }

    #[test]
    fn validation_clamps_level_and_floors_refresh() {
        let config = EffectsConfig {
            audio: AudioEffectsConfig {
                default_suppression_level: 3.5,
                ..AudioEffectsConfig::default()
            },
            video: VideoEffectsConfig { refresh_rate: 0 },
        }
        .validated();

        assert_eq!(config.audio.default_suppression_level, 1.0);
        assert_eq!(config.video.refresh_rate, 60);
    }
}
