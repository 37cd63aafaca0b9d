use anyhow::Result;
use model::{
    build_t5_config, build_t5_config_with_default_ids, ModelArchitecture, T5Config,
    DEFAULT_DECODER_START_TOKEN_ID, DEFAULT_EOS_TOKEN_ID,
};
use serde_json::Value;
use tempfile::tempdir;

fn large_architecture() -> ModelArchitecture {
    ModelArchitecture {
        d_ff: 3072,
        d_model: 768,
        num_heads: 12,
        d_kv: 64,
        num_decoder_layers: 10,
        num_layers: 10,
    }
}

#[test]
fn projection_copies_every_field() {
    let arch = large_architecture();
    let cfg = build_t5_config(&arch, 40_960, 0, 1);

    assert_eq!(cfg.d_ff, 3072);
    assert_eq!(cfg.d_model, 768);
    assert_eq!(cfg.num_heads, 12);
    assert_eq!(cfg.d_kv, 64);
    assert_eq!(cfg.num_decoder_layers, 10);
    assert_eq!(cfg.num_layers, 10);
    assert_eq!(cfg.vocab_size, 40_960);
    assert_eq!(cfg.decoder_start_token_id, Some(0));
    assert_eq!(cfg.eos_token_id, 1);
}

#[test]
fn projection_leaves_other_fields_at_upstream_defaults() {
    let cfg = build_t5_config(&large_architecture(), 40_960, 0, 1);
    let base = T5Config::default();

    assert_eq!(cfg.model_type, "t5");
    assert_eq!(cfg.dropout_rate, base.dropout_rate);
    assert_eq!(cfg.relative_attention_num_buckets, base.relative_attention_num_buckets);
    assert_eq!(cfg.feed_forward_proj, base.feed_forward_proj);
    assert_eq!(cfg.pad_token_id, base.pad_token_id);
    assert!(cfg.is_encoder_decoder);
}

#[test]
fn out_of_range_ids_are_accepted() {
    let cfg = build_t5_config(&ModelArchitecture::default(), 8, 100, 200);
    assert_eq!(cfg.vocab_size, 8);
    assert_eq!(cfg.decoder_start_token_id, Some(100));
    assert_eq!(cfg.eos_token_id, 200);
}

#[test]
fn default_ids_helper_uses_pad_and_eos_slots() {
    let cfg = build_t5_config_with_default_ids(&ModelArchitecture::default(), 40_960);
    assert_eq!(cfg.decoder_start_token_id, Some(DEFAULT_DECODER_START_TOKEN_ID));
    assert_eq!(cfg.eos_token_id, DEFAULT_EOS_TOKEN_ID);
}

#[test]
fn save_writes_hf_compatible_json() -> Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("pretrain").join("config.json");
    let cfg = build_t5_config(&large_architecture(), 40_960, 0, 1);
    cfg.save(&path)?;

    let value: Value = serde_json::from_slice(&std::fs::read(&path)?)?;
    assert_eq!(value["model_type"], "t5");
    assert_eq!(value["d_model"], 768);
    assert_eq!(value["decoder_start_token_id"], 0);

    let reloaded = T5Config::from_path(&path)?;
    assert_eq!(reloaded, cfg);
    Ok(())
}
