//! BPE tokenizer training for the chat model.
//!
//! The pipeline is fixed: NFKC normalization, punctuation / per-digit /
//! metaspace pre-tokenization, a BPE model with `[UNK]` fallback and seven
//! reserved special tokens. [`train_bpe_tokenizer`] streams the corpus in
//! bounded chunk batches (see [`corpus::CorpusBatches`]) so memory use does
//! not grow with corpus size.
//!
//! # Idempotency
//!
//! A successful run leaves `<output>.log` next to the tokenizer. Later calls
//! for the same output return `Ok(false)` without touching the corpus unless
//! `recreate` is set. Concurrent runs against one output are serialized by
//! an advisory lock on `<output>.lock`; the loser gets [`Error::Busy`]. The
//! empty lock file stays next to the tokenizer after every run and is reused
//! by the next one.

pub mod artifacts;
pub mod config;
pub mod corpus;
pub mod errors;

mod bpe;
mod pretokenizer;
mod trainer;
mod validate;

pub use artifacts::{load_tokenizer, lock_path, marker_path, read_marker, resolve_tokenizer_path};
pub use bpe::CONTROL_TOKENS;
pub use config::{ChunkCfg, TrainerCfg, EOS_TOKEN, PAD_TOKEN, SPECIAL_TOKENS, UNK_TOKEN};
pub use corpus::{CorpusBatches, CorpusChunks};
pub use errors::{Error, Result};

use std::path::Path;

/// Train with the default configuration (vocab 40960, min frequency 100,
/// 2048-character chunks in batches of 1000).
pub fn train_bpe_tokenizer(
    corpus: impl AsRef<Path>,
    output: impl AsRef<Path>,
    recreate: bool,
    max_train_lines: Option<usize>,
) -> Result<bool> {
    train_bpe_tokenizer_with(
        &TrainerCfg::default(),
        corpus,
        output,
        recreate,
        max_train_lines,
    )
}

pub fn train_bpe_tokenizer_with(
    cfg: &TrainerCfg,
    corpus: impl AsRef<Path>,
    output: impl AsRef<Path>,
    recreate: bool,
    max_train_lines: Option<usize>,
) -> Result<bool> {
    trainer::train_from_corpus(
        cfg,
        corpus.as_ref(),
        output.as_ref(),
        recreate,
        max_train_lines,
    )
}
