use crate::config::TrainerCfg;
use crate::errors::Result;
use crate::pretokenizer::{build_decoder, build_normalizer, build_pre_tokenizer};
use tokenizers::models::bpe::{BpeTrainer, BPE};
use tokenizers::models::TrainerWrapper;
use tokenizers::tokenizer::AddedToken;
use tokenizers::Tokenizer;

/// Control characters the metaspace pipeline can otherwise lose.
pub const CONTROL_TOKENS: [&str; 2] = ["\t", "\n"];

/// Assemble the untrained pipeline: BPE model, normalizer, pre-tokenizer,
/// decoder and the reserved special tokens.
pub fn build_untrained(cfg: &TrainerCfg) -> Result<Tokenizer> {
    let model = BPE::builder().unk_token(cfg.unk_token.clone()).build()?;

    let mut tokenizer = Tokenizer::new(model);
    tokenizer.with_normalizer(Some(build_normalizer()));
    tokenizer.with_pre_tokenizer(Some(build_pre_tokenizer()));
    tokenizer.with_decoder(Some(build_decoder()));
    tokenizer.add_special_tokens(&special_tokens(cfg));

    Ok(tokenizer)
}

pub fn build_trainer(cfg: &TrainerCfg) -> TrainerWrapper {
    BpeTrainer::builder()
        .vocab_size(cfg.vocab_size)
        .min_frequency(cfg.min_frequency)
        .show_progress(cfg.show_progress)
        .special_tokens(special_tokens(cfg))
        .build()
        .into()
}

/// Add `\t` and `\n` as plain tokens when training did not produce them.
/// Returns how many tokens were added.
pub fn ensure_control_tokens(tokenizer: &mut Tokenizer) -> usize {
    let vocab = tokenizer.get_vocab(true);
    let missing: Vec<AddedToken> = CONTROL_TOKENS
        .iter()
        .filter(|token| !vocab.contains_key(**token))
        .map(|token| AddedToken::from(*token, false))
        .collect();

    if missing.is_empty() {
        return 0;
    }
    tokenizer.add_tokens(&missing)
}

fn special_tokens(cfg: &TrainerCfg) -> Vec<AddedToken> {
    cfg.special_tokens
        .iter()
        .cloned()
        .map(|token| AddedToken::from(token, true))
        .collect()
}
