use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transformer dimensions for the encoder-decoder model.
///
/// Construction never validates; call [`ModelArchitecture::validate`] when the
/// caller wants the structural checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelArchitecture {
    /// Feed-forward inner width.
    pub d_ff: usize,
    /// Embedding width.
    pub d_model: usize,
    pub num_heads: usize,
    /// Per-head key/value width, expected to be `d_model / num_heads`.
    pub d_kv: usize,
    pub num_decoder_layers: usize,
    /// Encoder depth.
    pub num_layers: usize,
}

impl Default for ModelArchitecture {
    fn default() -> Self {
        Self {
            d_ff: 3072,
            d_model: 768,
            num_heads: 12,
            d_kv: 64,
            num_decoder_layers: 10,
            num_layers: 10,
        }
    }
}

impl ModelArchitecture {
    /// Collect every structural problem instead of stopping at the first one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        for (label, value) in [
            ("d_ff", self.d_ff),
            ("d_model", self.d_model),
            ("num_heads", self.num_heads),
            ("d_kv", self.d_kv),
            ("num_decoder_layers", self.num_decoder_layers),
            ("num_layers", self.num_layers),
        ] {
            if value == 0 {
                errors.push(format!("{label} must be greater than zero"));
            }
        }

        if self.num_heads > 0 && self.d_model % self.num_heads != 0 {
            errors.push(format!(
                "d_model ({}) must be divisible by num_heads ({})",
                self.d_model, self.num_heads
            ));
        } else if self.num_heads > 0 && self.d_model / self.num_heads != self.d_kv {
            errors.push(format!(
                "d_kv ({}) must equal d_model / num_heads ({})",
                self.d_kv,
                self.d_model / self.num_heads
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors.join("; ")))
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serde_json error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("invalid model configuration: {0}")]
    Invalid(String),
}
