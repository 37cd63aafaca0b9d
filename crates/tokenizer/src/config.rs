use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

pub const PAD_TOKEN: &str = "[PAD]";
pub const EOS_TOKEN: &str = "[EOS]";
pub const SEP_TOKEN: &str = "[SEP]";
pub const BOS_TOKEN: &str = "[BOS]";
pub const CLS_TOKEN: &str = "[CLS]";
pub const MASK_TOKEN: &str = "[MASK]";
pub const UNK_TOKEN: &str = "[UNK]";

/// Reserved tokens in id order: `[PAD]` is 0 and `[EOS]` is 1 after training.
pub const SPECIAL_TOKENS: [&str; 7] = [
    PAD_TOKEN, EOS_TOKEN, SEP_TOKEN, BOS_TOKEN, CLS_TOKEN, MASK_TOKEN, UNK_TOKEN,
];

pub const DEFAULT_VOCAB_SIZE: usize = 40_960;
pub const DEFAULT_MIN_FREQUENCY: u64 = 100;
pub const DEFAULT_CHUNK_LEN: usize = 2048;
pub const DEFAULT_BUFFER_SIZE: usize = 1000;
/// Line cap the command-line trainer applies unless told otherwise.
pub const DEFAULT_MAX_TRAIN_LINES: usize = 10_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerCfg {
    pub vocab_size: usize,
    pub min_frequency: u64,
    pub special_tokens: Vec<String>,
    pub unk_token: String,
    pub show_progress: bool,
    pub chunk: ChunkCfg,
}

impl Default for TrainerCfg {
    fn default() -> Self {
        Self {
            vocab_size: DEFAULT_VOCAB_SIZE,
            min_frequency: DEFAULT_MIN_FREQUENCY,
            special_tokens: SPECIAL_TOKENS.iter().map(|t| t.to_string()).collect(),
            unk_token: UNK_TOKEN.to_owned(),
            show_progress: true,
            chunk: ChunkCfg::default(),
        }
    }
}

impl TrainerCfg {
    /// Read a JSON trainer config; absent fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let cfg = serde_json::from_reader(BufReader::new(file))?;
        Ok(cfg)
    }
}

/// Bounds for the streamed corpus: a chunk is sealed once it holds
/// `chunk_len` characters, a batch is handed out once it holds
/// `buffer_size` chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkCfg {
    pub chunk_len: usize,
    pub buffer_size: usize,
}

impl Default for ChunkCfg {
    fn default() -> Self {
        Self {
            chunk_len: DEFAULT_CHUNK_LEN,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}
