use tokenizers::normalizers::{Sequence as NormalizerSequence, NFKC};
use tokenizers::pre_tokenizers::digits::Digits;
use tokenizers::pre_tokenizers::metaspace::Metaspace;
use tokenizers::pre_tokenizers::punctuation::Punctuation;
use tokenizers::pre_tokenizers::sequence::Sequence as PreTokenizerSequence;

/// NFKC folds compatibility variants (full-width Latin, ligatures) before
/// any splitting happens.
pub fn build_normalizer() -> NormalizerSequence {
    NormalizerSequence::new(vec![NFKC.into()])
}

/// Punctuation, then one unit per digit, then metaspace so that word
/// boundaries survive into the vocabulary.
pub fn build_pre_tokenizer() -> PreTokenizerSequence {
    PreTokenizerSequence::new(vec![
        Punctuation::default().into(),
        Digits::new(true).into(),
        Metaspace::default().into(),
    ])
}

pub fn build_decoder() -> Metaspace {
    Metaspace::default()
}
