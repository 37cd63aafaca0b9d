//! Model-side configuration for the encoder-decoder chat model.
//!
//! [`ModelArchitecture`] holds the tunable transformer dimensions. It is
//! projected onto the HuggingFace-compatible [`T5Config`] with
//! [`build_t5_config`], together with the vocabulary size and the two
//! special-token ids the decoder needs.

pub mod config;
pub mod t5;

pub use config::{ConfigError, ModelArchitecture};
pub use t5::{
    build_t5_config, build_t5_config_with_default_ids, T5Config, DEFAULT_DECODER_START_TOKEN_ID,
    DEFAULT_EOS_TOKEN_ID,
};
