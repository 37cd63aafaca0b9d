use crate::config::{ConfigError, ModelArchitecture};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

pub const DEFAULT_DECODER_START_TOKEN_ID: u32 = 0;
pub const DEFAULT_EOS_TOKEN_ID: u32 = 1;

/// HuggingFace-compatible `config.json` for a T5 encoder-decoder.
///
/// Field names and defaults follow the upstream `T5Config`, so a file written
/// with [`T5Config::save`] can be loaded by any T5 implementation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct T5Config {
    pub model_type: String,
    pub vocab_size: usize,
    pub d_model: usize,
    pub d_kv: usize,
    pub d_ff: usize,
    pub num_layers: usize,
    pub num_decoder_layers: usize,
    pub num_heads: usize,
    pub relative_attention_num_buckets: usize,
    pub relative_attention_max_distance: usize,
    pub dropout_rate: f64,
    pub layer_norm_epsilon: f64,
    pub initializer_factor: f64,
    pub feed_forward_proj: String,
    pub is_encoder_decoder: bool,
    pub use_cache: bool,
    pub tie_word_embeddings: bool,
    pub pad_token_id: u32,
    pub eos_token_id: u32,
    pub decoder_start_token_id: Option<u32>,
}

impl Default for T5Config {
    fn default() -> Self {
        Self {
            model_type: "t5".to_owned(),
            vocab_size: 32_128,
            d_model: 512,
            d_kv: 64,
            d_ff: 2048,
            num_layers: 6,
            num_decoder_layers: 6,
            num_heads: 8,
            relative_attention_num_buckets: 32,
            relative_attention_max_distance: 128,
            dropout_rate: 0.1,
            layer_norm_epsilon: 1e-6,
            initializer_factor: 1.0,
            feed_forward_proj: "relu".to_owned(),
            is_encoder_decoder: true,
            use_cache: true,
            tie_word_embeddings: true,
            pad_token_id: 0,
            eos_token_id: DEFAULT_EOS_TOKEN_ID,
            decoder_start_token_id: None,
        }
    }
}

impl T5Config {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = File::open(path.as_ref())?;
        let config = serde_json::from_reader(BufReader::new(file))?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// Project the architecture bundle onto a fresh [`T5Config`].
///
/// Pure field copy: ids are not checked against `vocab_size` or against the
/// tokenizer's special-token layout.
pub fn build_t5_config(
    arch: &ModelArchitecture,
    vocab_size: usize,
    decoder_start_token_id: u32,
    eos_token_id: u32,
) -> T5Config {
    T5Config {
        d_ff: arch.d_ff,
        d_kv: arch.d_kv,
        d_model: arch.d_model,
        num_decoder_layers: arch.num_decoder_layers,
        num_heads: arch.num_heads,
        num_layers: arch.num_layers,
        vocab_size,
        decoder_start_token_id: Some(decoder_start_token_id),
        eos_token_id,
        ..T5Config::default()
    }
}

pub fn build_t5_config_with_default_ids(arch: &ModelArchitecture, vocab_size: usize) -> T5Config {
    build_t5_config(
        arch,
        vocab_size,
        DEFAULT_DECODER_START_TOKEN_ID,
        DEFAULT_EOS_TOKEN_ID,
    )
}
