//! Stage configuration for the T5 chat-model pipeline.
//!
//! Every stage (pretraining, supervised fine-tuning, preference tuning and
//! inference) has its own bundle with fixed defaults. Bundles are plain
//! values: load one from TOML or JSON, patch it with dotted-path overrides
//! and pass it to whatever needs it.

pub mod config;
pub mod overrides;
pub mod stage;

pub use config::{
    load_config_file, ConfigFile, DpoConfig, InferConfig, LogLevel, MixedPrecision, SftConfig,
    TrainConfig, TrainingError,
};
pub use overrides::{apply_overrides, parse_override_value, OverrideArg};
pub use stage::{Stage, StageConfig};
