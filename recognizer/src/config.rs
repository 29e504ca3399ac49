use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{RecognizeError, RecognizeResult};
use crate::ops::decode;

/// Model specific preprocessing constants. Pixels are mapped to `(value - mean) / scale`
/// after being resized to `height` x `width`.
///
/// The defaults fit the inception5h graph: 224x224 RGB, mean 117, scale 1.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizationConfig {
    pub height: usize,
    pub width: usize,
    pub mean: f32,
    pub scale: f32,
    pub channels: usize,
}

impl Default for NormalizationConfig {
    fn default() -> NormalizationConfig {
        NormalizationConfig { height: 224, width: 224, mean: 117.0, scale: 1.0, channels: 3 }
    }
}

impl NormalizationConfig {
    pub fn validate(&self) -> RecognizeResult<()> {
        if self.height == 0 || self.width == 0 {
            return Err(RecognizeError::configuration(format!(
                "target size must be positive, got {}x{}",
                self.height, self.width
            )));
        }
        if i32::try_from(self.height).is_err() || i32::try_from(self.width).is_err() {
            return Err(RecognizeError::configuration(format!(
                "target size {}x{} is too large",
                self.height, self.width
            )));
        }
        if !self.mean.is_finite() {
            let reason = format!("mean must be finite, got {}", self.mean);
            return Err(RecognizeError::configuration(reason));
        }
        if !self.scale.is_finite() || self.scale == 0.0 {
            return Err(RecognizeError::configuration(format!(
                "scale must be finite and non-zero, got {}",
                self.scale
            )));
        }
        decode::check_channels(self.channels)
            .map_err(|e| RecognizeError::configuration(e.to_string()))
    }

    /// Shape of the normalized tensor, and of the model input.
    pub fn input_shape(&self) -> [usize; 4] {
        [1, self.height, self.width, self.channels]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecognizerConfig {
    pub normalization: NormalizationConfig,
    pub input_name: String,
    pub output_name: String,
    /// Upper bound for one recognition when going through the deadline entry point.
    pub deadline_ms: Option<u64>,
    /// Worker threads the deadline entry point may have running at once, timed out ones
    /// included.
    pub max_workers: usize,
}

impl Default for RecognizerConfig {
    fn default() -> RecognizerConfig {
        RecognizerConfig {
            normalization: NormalizationConfig::default(),
            input_name: "input".to_string(),
            output_name: "output".to_string(),
            deadline_ms: None,
            max_workers: 16,
        }
    }
}

impl RecognizerConfig {
    pub fn validate(&self) -> RecognizeResult<()> {
        self.normalization.validate()?;
        if self.input_name.is_empty() || self.output_name.is_empty() {
            return Err(RecognizeError::configuration("input and output names can not be empty"));
        }
        if self.deadline_ms == Some(0) {
            return Err(RecognizeError::configuration("deadline must be positive"));
        }
        if self.max_workers == 0 {
            return Err(RecognizeError::configuration("max_workers must be positive"));
        }
        Ok(())
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}
