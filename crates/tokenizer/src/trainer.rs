use crate::artifacts::{lock_path, marker_path, remove_marker, save_tokenizer_json, write_marker};
use crate::bpe::{build_trainer, build_untrained, ensure_control_tokens};
use crate::config::TrainerCfg;
use crate::corpus::CorpusBatches;
use crate::errors::{Error, Result};
use crate::validate::{validate_config, validate_tokenizer};
use std::fs::{self, File, OpenOptions, TryLockError};
use std::path::Path;
use std::time::Instant;

/// Train a BPE tokenizer from `corpus` and save it to `output`.
///
/// Returns `Ok(false)` without reading the corpus when `<output>.log`
/// already exists and `recreate` is not set. The marker is written last, so
/// a failed or killed run is retried on the next call.
pub fn train_from_corpus(
    cfg: &TrainerCfg,
    corpus: &Path,
    output: &Path,
    recreate: bool,
    max_train_lines: Option<usize>,
) -> Result<bool> {
    validate_config(cfg)?;

    if let Some(dir) = output.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }

    let mut log_items = vec![format!("{} -> {}", corpus.display(), output.display())];
    log::info!("{}", log_items[0]);

    let _lock = TrainingLock::acquire(&lock_path(output))?;

    let marker = marker_path(output);
    if recreate && remove_marker(&marker)? {
        log::debug!("removed marker {}", marker.display());
    }

    if marker.is_file() {
        log::info!("{} skip", corpus.display());
        return Ok(false);
    }

    let start = Instant::now();

    let mut tokenizer = build_untrained(cfg)?;
    let mut trainer = build_trainer(cfg);

    let mut chunks = CorpusBatches::open(corpus, cfg.chunk, max_train_lines)?.into_chunks();
    tokenizer.train(&mut trainer, chunks.by_ref())?;

    if let Some(err) = chunks.take_error() {
        return Err(Error::Io(err));
    }
    log::debug!(
        "consumed {} corpus lines, vocab size {}",
        chunks.lines_read(),
        tokenizer.get_vocab_size(true)
    );

    let added = ensure_control_tokens(&mut tokenizer);
    if added > 0 {
        log::debug!("added {added} control tokens to the vocabulary");
    }

    validate_tokenizer(&tokenizer, cfg)?;
    save_tokenizer_json(&tokenizer, output)?;

    let duration = start.elapsed().as_secs_f64();
    log_items.push(format!("time cost = {duration:.2}s"));
    log::info!("{}", log_items[1]);

    write_marker(&marker, &log_items)?;

    log::info!("{} success", corpus.display());
    Ok(true)
}

/// Exclusive advisory lock on `<output>.lock`, released when dropped or
/// when the process dies.
struct TrainingLock {
    _file: File,
}

impl TrainingLock {
    fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;

        match file.try_lock() {
            Ok(()) => Ok(Self { _file: file }),
            Err(TryLockError::WouldBlock) => Err(Error::Busy(path.display().to_string())),
            Err(TryLockError::Error(err)) => Err(Error::Io(err)),
        }
    }
}
