use std::{fs, path::PathBuf};

use anyhow::Result;
use model::{ModelArchitecture, T5Config};
use tempfile::tempdir;
use tokenizer::{train_bpe_tokenizer_with, ChunkCfg, TrainerCfg};
use training::{
    apply_overrides, ConfigFile, DpoConfig, InferConfig, LogLevel, MixedPrecision, OverrideArg,
    SftConfig, Stage, StageConfig, TrainConfig, TrainingError,
};

fn overrides(items: &[&str]) -> Vec<OverrideArg> {
    items.iter().map(|s| s.parse().unwrap()).collect()
}

#[test]
fn stage_defaults() {
    let infer = InferConfig::default();
    assert_eq!(infer.max_seq_len, 320);
    assert_eq!(infer.mixed_precision, MixedPrecision::Bf16);
    assert_eq!(infer.host, "127.0.0.1");
    assert_eq!(infer.port, 8812);
    assert!(infer.reload);
    assert_eq!(infer.workers, 1);
    assert_eq!(infer.log_level, LogLevel::Info);
    assert!(infer.api_key.is_empty());

    let dpo = DpoConfig::default();
    assert_eq!(dpo.per_device_train_batch_size, 4);
    assert_eq!(dpo.gradient_accumulation_steps, 8);
    assert_eq!(dpo.learning_rate, 1e-5);
    assert_eq!(dpo.beta, 0.1);
    assert_eq!(dpo.output_dir, PathBuf::from("/model_save/dpo"));

    let sft = SftConfig::default();
    assert_eq!(sft.batch_size, 12);
    assert_eq!(sft.save_steps, 5000);
    assert_eq!(sft.logging_steps, 100);
    assert_eq!(sft.seed, 23333);

    let train = TrainConfig::default();
    assert_eq!(train.epochs, 8);
    assert_eq!(train.batch_size_per_gpu, 16);
    assert_eq!(train.learn_rate, 0.0001);
    assert_eq!(train.div_factor, 50);
    assert_eq!(train.warmup_steps, 1024);
    assert_eq!(train.keep_latest_n_ckp, 8);
    assert_eq!(train.dataloader_buffer_size, 50_000);
    assert_eq!(train.max_seq_len, 256);
    assert_eq!(
        train.validation_file(),
        PathBuf::from("./data/result/data_shuffle/valid.parquet")
    );
}

#[test]
fn explicit_dataset_path_drives_splits() {
    let train = TrainConfig::new("./foo");
    assert_eq!(train.train_file(), PathBuf::from("./foo/train.parquet"));
    assert_eq!(train.validation_file(), PathBuf::from("./foo/valid.parquet"));
    assert_eq!(train.test_file(), PathBuf::from("./foo/test.parquet"));

    let custom = TrainConfig {
        epochs: 9,
        ..TrainConfig::new("./")
    };
    assert_eq!(custom.epochs, 9);
    assert_eq!(custom.train_file(), PathBuf::from("./train.parquet"));
}

#[test]
fn loads_partial_toml_over_defaults() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("pretrain.toml");
    fs::write(
        &path,
        "epochs = 2\nmixed_precision = \"fp16\"\ndataset_path = \"/data/run1\"\n",
    )?;

    let cfg = TrainConfig::from_path(&path)?;
    assert_eq!(cfg.epochs, 2);
    assert_eq!(cfg.mixed_precision, MixedPrecision::Fp16);
    assert_eq!(cfg.batch_size_per_gpu, 16);
    assert_eq!(cfg.test_file(), PathBuf::from("/data/run1/test.parquet"));
    Ok(())
}

#[test]
fn loads_json_and_extensionless_toml() -> Result<()> {
    let dir = tempdir()?;
    let json = dir.path().join("sft.json");
    fs::write(&json, r#"{ "batch_size": 3, "fp16": false }"#)?;
    let sft = SftConfig::from_path(&json)?;
    assert_eq!(sft.batch_size, 3);
    assert!(!sft.fp16);

    let bare = dir.path().join("infer");
    fs::write(&bare, "port = 9000\nlog_level = \"debug\"\n")?;
    let infer = InferConfig::from_path(&bare)?;
    assert_eq!(infer.port, 9000);
    assert_eq!(infer.log_level, LogLevel::Debug);
    Ok(())
}

#[test]
fn rejects_unknown_extension_and_fields() -> Result<()> {
    let dir = tempdir()?;
    let yaml = dir.path().join("dpo.yaml");
    fs::write(&yaml, "beta: 0.2\n")?;
    assert!(matches!(
        DpoConfig::from_path(&yaml),
        Err(TrainingError::ConfigFormat(_))
    ));

    let typo = dir.path().join("dpo.toml");
    fs::write(&typo, "betta = 0.2\n")?;
    assert!(matches!(
        DpoConfig::from_path(&typo),
        Err(TrainingError::ConfigFormat(_))
    ));

    assert!(matches!(
        DpoConfig::from_path(dir.path().join("missing.toml")),
        Err(TrainingError::Io { .. })
    ));
    Ok(())
}

#[test]
fn overrides_patch_bundles() -> Result<()> {
    let cfg = apply_overrides(
        TrainConfig::default(),
        &overrides(&[
            "epochs=3",
            "learn_rate=2e-4",
            "mixed_precision=no",
            "dataset_path=/tmp/ds",
        ]),
    )?;
    assert_eq!(cfg.epochs, 3);
    assert_eq!(cfg.learn_rate, 2e-4);
    assert_eq!(cfg.mixed_precision, MixedPrecision::No);
    assert_eq!(cfg.train_file(), PathBuf::from("/tmp/ds/train.parquet"));

    // integer literal into a float field
    let dpo = apply_overrides(DpoConfig::default(), &overrides(&["beta=1"]))?;
    assert_eq!(dpo.beta, 1.0);
    Ok(())
}

#[test]
fn overrides_reject_bad_values() {
    let unknown = apply_overrides(InferConfig::default(), &overrides(&["prot=1"]));
    assert!(matches!(unknown, Err(TrainingError::ConfigFormat(_))));

    let mistyped = apply_overrides(InferConfig::default(), &overrides(&["port=yes"]));
    assert!(matches!(mistyped, Err(TrainingError::ConfigFormat(_))));

    let out_of_range = apply_overrides(InferConfig::default(), &overrides(&["port=70000"]));
    assert!(out_of_range.is_err());
}

#[test]
fn stage_config_renders_both_formats() -> Result<()> {
    let cfg = StageConfig::defaults(Stage::Infer).apply_overrides(&overrides(&["workers=4"]))?;

    let toml_text = cfg.to_toml()?;
    assert!(toml_text.contains("workers = 4"));
    assert!(toml_text.contains("bf16"));

    let json_text = cfg.to_json()?;
    let parsed: InferConfig = serde_json::from_str(&json_text)?;
    assert_eq!(parsed.workers, 4);

    let dir = tempdir()?;
    let path = dir.path().join("infer.toml");
    fs::write(&path, toml_text)?;
    assert_eq!(StageConfig::load(Stage::Infer, &path)?, cfg);
    Ok(())
}

fn trained_tokenizer(dir: &std::path::Path) -> Result<PathBuf> {
    let corpus = dir.join("corpus.txt");
    let line = "the model reads short sentences and learns merges\n";
    fs::write(&corpus, line.repeat(40))?;

    let output = dir.join("tokenizer").join("tokenizer.json");
    let cfg = TrainerCfg {
        vocab_size: 200,
        min_frequency: 2,
        show_progress: false,
        chunk: ChunkCfg {
            chunk_len: 128,
            buffer_size: 4,
        },
        ..TrainerCfg::default()
    };
    train_bpe_tokenizer_with(&cfg, &corpus, &output, false, None)?;
    Ok(output)
}

#[test]
fn resolves_t5_config_from_tokenizer() -> Result<()> {
    let dir = tempdir()?;
    let output = trained_tokenizer(dir.path())?;
    let tokenizer_dir = output.parent().unwrap().to_path_buf();

    let loaded = tokenizer::load_tokenizer(&output)?;
    let vocab_size = loaded.get_vocab_size(true);

    let cfg = TrainConfig {
        tokenizer_dir,
        model_config_file: dir.path().join("model").join("config.json"),
        ..TrainConfig::default()
    };
    let arch = ModelArchitecture::default();
    let t5 = cfg.write_model_config(&arch)?;

    assert_eq!(t5.vocab_size, vocab_size);
    assert_eq!(t5.decoder_start_token_id, Some(0));
    assert_eq!(t5.eos_token_id, 1);
    assert_eq!(t5.d_model, arch.d_model);
    assert_eq!(t5.num_decoder_layers, arch.num_decoder_layers);

    let reloaded = T5Config::from_path(&cfg.model_config_file)?;
    assert_eq!(reloaded, t5);
    Ok(())
}

#[test]
fn missing_tokenizer_is_reported() -> Result<()> {
    let dir = tempdir()?;
    let cfg = TrainConfig {
        tokenizer_dir: dir.path().join("nowhere"),
        ..TrainConfig::default()
    };
    let err = cfg
        .resolve_t5_config(&ModelArchitecture::default())
        .unwrap_err();
    assert!(matches!(err, TrainingError::Tokenizer { .. }));
    assert!(err.to_string().contains("nowhere"));
    Ok(())
}

#[test]
fn model_architecture_loads_from_file() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("arch.json");
    fs::write(&path, r#"{ "d_model": 512, "num_heads": 8 }"#)?;
    let arch = ModelArchitecture::from_path(&path)?;
    assert_eq!(arch.d_model, 512);
    assert_eq!(arch.num_heads, 8);
    assert_eq!(arch.d_ff, 3072);
    Ok(())
}

#[test]
fn model_config_write_failure_names_the_target() -> Result<()> {
    let dir = tempdir()?;
    let output = trained_tokenizer(dir.path())?;
    let blocker = dir.path().join("not_a_dir");
    fs::write(&blocker, "")?;

    let cfg = TrainConfig {
        tokenizer_dir: output,
        model_config_file: blocker.join("config.json"),
        ..TrainConfig::default()
    };
    let err = cfg
        .write_model_config(&ModelArchitecture::default())
        .unwrap_err();
    assert!(matches!(err, TrainingError::ModelConfig { .. }));
    assert!(err.to_string().contains("not_a_dir"), "{err}");
    Ok(())
}
