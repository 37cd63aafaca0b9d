use crate::bpe::CONTROL_TOKENS;
use crate::config::TrainerCfg;
use crate::errors::{Error, Result};
use std::collections::HashSet;
use tokenizers::Tokenizer;

pub fn validate_config(cfg: &TrainerCfg) -> Result<()> {
    if cfg.vocab_size == 0 {
        return Err(Error::Validation(
            "vocab_size must be greater than zero".into(),
        ));
    }

    if cfg.chunk.chunk_len == 0 {
        return Err(Error::Validation(
            "chunk.chunk_len must be greater than zero".into(),
        ));
    }

    if cfg.chunk.buffer_size == 0 {
        return Err(Error::Validation(
            "chunk.buffer_size must be greater than zero".into(),
        ));
    }

    let mut seen = HashSet::new();
    for token in &cfg.special_tokens {
        if !seen.insert(token) {
            return Err(Error::Validation(format!(
                "special token '{token}' appears multiple times"
            )));
        }
    }

    if !cfg.special_tokens.contains(&cfg.unk_token) {
        return Err(Error::Validation(format!(
            "unk token '{}' must be listed in special_tokens",
            cfg.unk_token
        )));
    }

    Ok(())
}

pub fn validate_tokenizer(tok: &Tokenizer, cfg: &TrainerCfg) -> Result<()> {
    for (expected_id, token) in cfg.special_tokens.iter().enumerate() {
        match tok.token_to_id(token) {
            Some(id) if id as usize == expected_id => {}
            Some(id) => {
                return Err(Error::Validation(format!(
                    "special token '{token}' has id {id}, expected {expected_id}"
                )));
            }
            None => {
                return Err(Error::Validation(format!(
                    "expected special token '{token}' to be present in tokenizer vocab"
                )));
            }
        }
    }

    let vocab = tok.get_vocab(true);
    for token in CONTROL_TOKENS {
        if !vocab.contains_key(token) {
            return Err(Error::Validation(format!(
                "control token {token:?} missing from tokenizer vocab"
            )));
        }
    }

    Ok(())
}
