use model::{build_t5_config, ModelArchitecture, T5Config};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};
use tokenizer::{EOS_TOKEN, PAD_TOKEN};

/// Read a bundle from JSON (`.json`) or TOML (`.toml`, `.tml`, no extension).
/// Missing fields keep their defaults.
pub fn load_config_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, TrainingError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| TrainingError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&contents)?,
        Some("toml") | Some("tml") | None => toml::from_str(&contents)?,
        Some(other) => {
            return Err(TrainingError::ConfigFormat(format!(
                "unsupported configuration extension '{}'",
                other
            )));
        }
    };
    Ok(config)
}

/// Bundles that can be read with [`load_config_file`].
pub trait ConfigFile: DeserializeOwned {
    fn from_path(path: impl AsRef<Path>) -> Result<Self, TrainingError> {
        load_config_file(path)
    }
}

impl ConfigFile for InferConfig {}
impl ConfigFile for DpoConfig {}
impl ConfigFile for SftConfig {}
impl ConfigFile for TrainConfig {}
impl ConfigFile for ModelArchitecture {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixedPrecision {
    No,
    Fp16,
    Bf16,
    Fp8,
}

impl Default for MixedPrecision {
    fn default() -> Self {
        MixedPrecision::Bf16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

/// Inference and API server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InferConfig {
    /// Longest generated answer, in tokens.
    pub max_seq_len: usize,
    pub mixed_precision: MixedPrecision,
    pub model_dir: PathBuf,
    pub api_key: String,
    pub host: String,
    pub port: u16,
    pub reload: bool,
    pub workers: usize,
    pub log_level: LogLevel,
}

impl Default for InferConfig {
    fn default() -> Self {
        Self {
            max_seq_len: 320,
            mixed_precision: MixedPrecision::Bf16,
            model_dir: PathBuf::from("./output/model_save/"),
            api_key: String::new(),
            host: "127.0.0.1".to_owned(),
            port: 8812,
            reload: true,
            workers: 1,
            log_level: LogLevel::Info,
        }
    }
}

impl InferConfig {
    pub fn validate(&self) -> Result<(), TrainingError> {
        let mut errors = Vec::new();
        if self.max_seq_len == 0 {
            errors.push("max_seq_len must be greater than 0".to_string());
        }
        if self.host.trim().is_empty() {
            errors.push("host must not be empty".to_string());
        }
        if self.workers == 0 {
            errors.push("workers must be greater than 0".to_string());
        }
        finish_validation(errors)
    }
}

/// Preference (DPO) fine-tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DpoConfig {
    pub max_seq_len: usize,
    pub sft_model_file: PathBuf,
    pub tokenizer_dir: PathBuf,
    pub dpo_train_file: PathBuf,
    pub dpo_eval_file: PathBuf,
    pub adapter_file: PathBuf,
    pub log_dir: PathBuf,
    pub per_device_train_batch_size: usize,
    pub num_train_epochs: usize,
    pub gradient_accumulation_steps: usize,
    pub learning_rate: f64,
    pub logging_first_step: bool,
    pub logging_steps: usize,
    pub save_steps: usize,
    pub output_dir: PathBuf,
    pub warmup_steps: usize,
    pub fp16: bool,
    pub seed: u64,
    pub beta: f64,
}

impl Default for DpoConfig {
    fn default() -> Self {
        Self {
            max_seq_len: 512 + EOS_RESERVE,
            sft_model_file: PathBuf::from("./model_save/"),
            tokenizer_dir: PathBuf::from("./model_save/tokenizer"),
            dpo_train_file: PathBuf::from("./data/my_dpo_data.json"),
            dpo_eval_file: PathBuf::from("./data/my_dpo_eval.json"),
            adapter_file: PathBuf::from("./data/dpo/adapter_model.safetensors"),
            log_dir: PathBuf::from("./logs/"),
            per_device_train_batch_size: 4,
            num_train_epochs: 4,
            gradient_accumulation_steps: 8,
            learning_rate: 1e-5,
            logging_first_step: true,
            logging_steps: 20,
            save_steps: 2000,
            output_dir: PathBuf::from("/model_save/dpo"),
            warmup_steps: 1000,
            fp16: true,
            seed: DEFAULT_SEED,
            beta: 0.1,
        }
    }
}

impl DpoConfig {
    pub fn validate(&self) -> Result<(), TrainingError> {
        let mut errors = Vec::new();
        if self.max_seq_len == 0 {
            errors.push("max_seq_len must be greater than 0".to_string());
        }
        if self.per_device_train_batch_size == 0 {
            errors.push("per_device_train_batch_size must be greater than 0".to_string());
        }
        if self.gradient_accumulation_steps == 0 {
            errors.push("gradient_accumulation_steps must be greater than 0".to_string());
        }
        if self.learning_rate <= 0.0 {
            errors.push("learning_rate must be greater than 0".to_string());
        }
        if self.beta <= 0.0 {
            errors.push("beta must be greater than 0".to_string());
        }
        finish_validation(errors)
    }
}

/// Supervised fine-tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SftConfig {
    pub max_seq_len: usize,
    pub finetune_from_ckp_file: PathBuf,
    pub tokenizer_dir: PathBuf,
    pub sft_train_file: PathBuf,
    pub batch_size: usize,
    pub num_train_epochs: usize,
    pub save_steps: usize,
    pub gradient_accumulation_steps: usize,
    pub learning_rate: f64,
    pub logging_first_step: bool,
    pub logging_steps: usize,
    pub output_dir: PathBuf,
    pub warmup_steps: usize,
    pub fp16: bool,
    pub seed: u64,
}

impl Default for SftConfig {
    fn default() -> Self {
        Self {
            max_seq_len: 384 + EOS_RESERVE,
            finetune_from_ckp_file: PathBuf::from("./model_save/"),
            tokenizer_dir: PathBuf::from("./model_save/tokenizer"),
            sft_train_file: PathBuf::from("./data/sft_train.json"),
            batch_size: 12,
            num_train_epochs: 4,
            save_steps: 5000,
            gradient_accumulation_steps: 4,
            learning_rate: 1e-5,
            logging_first_step: true,
            logging_steps: 100,
            output_dir: PathBuf::from("./model_save/sft"),
            warmup_steps: 100,
            fp16: true,
            seed: DEFAULT_SEED,
        }
    }
}

impl SftConfig {
    pub fn validate(&self) -> Result<(), TrainingError> {
        let mut errors = Vec::new();
        if self.max_seq_len == 0 {
            errors.push("max_seq_len must be greater than 0".to_string());
        }
        if self.batch_size == 0 {
            errors.push("batch_size must be greater than 0".to_string());
        }
        if self.gradient_accumulation_steps == 0 {
            errors.push("gradient_accumulation_steps must be greater than 0".to_string());
        }
        if self.learning_rate <= 0.0 {
            errors.push("learning_rate must be greater than 0".to_string());
        }
        finish_validation(errors)
    }
}

/// Pretraining.
///
/// The dataset split files are not stored: [`TrainConfig::train_file`] and
/// friends derive them from the current `dataset_path` on every call, so
/// changing `dataset_path` can never leave them pointing at the old
/// directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size_per_gpu: usize,
    /// Peak rate is `div_factor * learn_rate`.
    pub learn_rate: f64,
    pub div_factor: usize,
    pub mixed_precision: MixedPrecision,
    /// Effective batch is `batch_size_per_gpu * gradient_accumulation_steps`.
    pub gradient_accumulation_steps: usize,
    pub warmup_steps: usize,
    pub dataset_path: PathBuf,
    pub tokenizer_dir: PathBuf,
    /// Checkpoint template; `{}` is replaced by the epoch or step tag.
    pub model_file: String,
    pub model_config_file: PathBuf,
    /// Resume state for interrupted runs.
    pub train_state_dir: PathBuf,
    pub output_model_file: PathBuf,
    pub output_state_dir: PathBuf,
    pub logging_steps: usize,
    pub save_steps: usize,
    /// How many best-scoring checkpoints to keep.
    pub keep_latest_n_ckp: usize,
    pub seed: u64,
    pub dataloader_buffer_size: usize,
    pub max_seq_len: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 8,
            batch_size_per_gpu: 16,
            learn_rate: 0.0001,
            div_factor: 50,
            mixed_precision: MixedPrecision::Bf16,
            gradient_accumulation_steps: 8,
            warmup_steps: 1024,
            dataset_path: PathBuf::from("./data/result/data_shuffle"),
            tokenizer_dir: PathBuf::from("./output/tokenizer"),
            model_file: "./data/model/pertrain/chat_bot_t5.{}.bin".to_owned(),
            model_config_file: PathBuf::from("./data/model/pertrain/config.json"),
            train_state_dir: PathBuf::from("./data/model/pertrain/train_latest_state"),
            output_model_file: PathBuf::from("./output/model/chat_bot_t5_best.bin"),
            output_state_dir: PathBuf::from("./output/model/pretrain_best_state"),
            logging_steps: 50,
            save_steps: 10_000,
            keep_latest_n_ckp: 8,
            seed: DEFAULT_SEED,
            dataloader_buffer_size: 50_000,
            max_seq_len: 256,
        }
    }
}

impl TrainConfig {
    pub fn new(dataset_path: impl Into<PathBuf>) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), TrainingError> {
        let mut errors = Vec::new();
        if self.epochs == 0 {
            errors.push("epochs must be greater than 0".to_string());
        }
        if self.batch_size_per_gpu == 0 {
            errors.push("batch_size_per_gpu must be greater than 0".to_string());
        }
        if self.gradient_accumulation_steps == 0 {
            errors.push("gradient_accumulation_steps must be greater than 0".to_string());
        }
        if self.learn_rate <= 0.0 {
            errors.push("learn_rate must be greater than 0".to_string());
        }
        if self.div_factor == 0 {
            errors.push("div_factor must be greater than 0".to_string());
        }
        if self.max_seq_len == 0 {
            errors.push("max_seq_len must be greater than 0".to_string());
        }
        if self.logging_steps == 0 || self.save_steps == 0 {
            errors.push("logging_steps and save_steps must be greater than 0".to_string());
        }
        if !self.model_file.contains("{}") {
            errors.push(format!(
                "model_file '{}' must contain a '{{}}' placeholder",
                self.model_file
            ));
        }
        finish_validation(errors)
    }

    pub fn train_file(&self) -> PathBuf {
        self.dataset_path.join(TRAIN_SPLIT)
    }

    pub fn validation_file(&self) -> PathBuf {
        self.dataset_path.join(VALIDATION_SPLIT)
    }

    pub fn test_file(&self) -> PathBuf {
        self.dataset_path.join(TEST_SPLIT)
    }

    pub fn model_file_for(&self, tag: impl fmt::Display) -> PathBuf {
        PathBuf::from(self.model_file.replace("{}", &tag.to_string()))
    }

    /// Project `arch` onto a T5 config whose vocabulary size and
    /// decoder-start / eos ids come from the tokenizer at `tokenizer_dir`
    /// (`[PAD]` starts decoding, `[EOS]` ends it).
    pub fn resolve_t5_config(&self, arch: &ModelArchitecture) -> Result<T5Config, TrainingError> {
        let tokenizer = tokenizer::load_tokenizer(&self.tokenizer_dir)
            .map_err(|err| self.tokenizer_error(err.to_string()))?;

        let special_id = |token: &str| {
            tokenizer
                .token_to_id(token)
                .ok_or_else(|| self.tokenizer_error(format!("no {token} token")))
        };
        let decoder_start_token_id = special_id(PAD_TOKEN)?;
        let eos_token_id = special_id(EOS_TOKEN)?;

        if decoder_start_token_id != model::DEFAULT_DECODER_START_TOKEN_ID
            || eos_token_id != model::DEFAULT_EOS_TOKEN_ID
        {
            log::warn!(
                "tokenizer special ids differ from defaults: decoder_start={} eos={}",
                decoder_start_token_id,
                eos_token_id
            );
        }

        let vocab_size = tokenizer.get_vocab_size(true);
        log::info!(
            "resolved model vocab_size={} decoder_start={} eos={}",
            vocab_size,
            decoder_start_token_id,
            eos_token_id
        );

        Ok(build_t5_config(
            arch,
            vocab_size,
            decoder_start_token_id,
            eos_token_id,
        ))
    }

    /// Resolve the T5 config and save it to `model_config_file`.
    pub fn write_model_config(&self, arch: &ModelArchitecture) -> Result<T5Config, TrainingError> {
        let t5 = self.resolve_t5_config(arch)?;
        t5.save(&self.model_config_file)
            .map_err(|source| TrainingError::ModelConfig {
                path: self.model_config_file.clone(),
                source,
            })?;
        Ok(t5)
    }

    fn tokenizer_error(&self, reason: String) -> TrainingError {
        TrainingError::Tokenizer {
            dir: self.tokenizer_dir.clone(),
            reason,
        }
    }
}

const TRAIN_SPLIT: &str = "train.parquet";
const VALIDATION_SPLIT: &str = "valid.parquet";
const TEST_SPLIT: &str = "test.parquet";

fn finish_validation(errors: Vec<String>) -> Result<(), TrainingError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TrainingError::Validation(errors))
    }
}

/// Room left in fine-tuning sequences for the end-of-sequence token.
const EOS_RESERVE: usize = 8;
const DEFAULT_SEED: u64 = 23_333;

#[derive(Debug)]
pub enum TrainingError {
    /// A bundle file could not be read.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Unsupported extension, malformed file, unknown key or wrong type.
    ConfigFormat(String),
    Validation(Vec<String>),
    /// The tokenizer a stage depends on is missing or lacks a reserved token.
    Tokenizer { dir: PathBuf, reason: String },
    /// A `key=value` override names a path that cannot be assigned.
    Override { path: String, reason: String },
    ModelConfig {
        path: PathBuf,
        source: model::ConfigError,
    },
}

impl TrainingError {
    pub fn validation(messages: Vec<String>) -> Self {
        Self::Validation(messages)
    }
}

impl fmt::Display for TrainingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingError::Io { path, source } => {
                write!(f, "cannot read stage config {}: {}", path.display(), source)
            }
            TrainingError::ConfigFormat(msg) => write!(f, "bad stage config: {}", msg),
            TrainingError::Validation(messages) => {
                write!(f, "stage config rejected: {}", messages.join("; "))
            }
            TrainingError::Tokenizer { dir, reason } => {
                write!(f, "tokenizer at {} unusable: {}", dir.display(), reason)
            }
            TrainingError::Override { path, reason } => {
                write!(f, "cannot apply override '{}': {}", path, reason)
            }
            TrainingError::ModelConfig { path, source } => {
                write!(f, "cannot write model config {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for TrainingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrainingError::Io { source, .. } => Some(source),
            TrainingError::ModelConfig { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for TrainingError {
    fn from(value: toml::de::Error) -> Self {
        TrainingError::ConfigFormat(value.to_string())
    }
}

impl From<toml::ser::Error> for TrainingError {
    fn from(value: toml::ser::Error) -> Self {
        TrainingError::ConfigFormat(value.to_string())
    }
}

impl From<serde_json::Error> for TrainingError {
    fn from(value: serde_json::Error) -> Self {
        TrainingError::ConfigFormat(value.to_string())
    }
}
