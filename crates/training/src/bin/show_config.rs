use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use env_logger::Env;
use model::ModelArchitecture;
use training::{ConfigFile, OverrideArg, Stage, StageConfig, TrainingError};

fn main() {
    let args = Args::parse();
    init_logging();

    let stage = args.stage;
    if let Err(err) = run(args) {
        eprintln!("{} failed: {}", stage, err);
        std::process::exit(1);
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Print the resolved configuration for a pipeline stage", long_about = None)]
struct Args {
    #[arg(long, value_name = "STAGE", help = "One of pretrain, sft, dpo, infer")]
    stage: Stage,

    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "TOML or JSON file layered over the stage defaults"
    )]
    config: Option<PathBuf>,

    #[arg(
        long = "override",
        value_name = "KEY=VALUE",
        help = "Override configuration value using dot-separated paths"
    )]
    overrides: Vec<OverrideArg>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Toml)]
    format: OutputFormat,

    #[arg(
        long,
        help = "Resolve the T5 config from the tokenizer and write it to model_config_file (pretrain only)"
    )]
    write_model_config: bool,

    #[arg(
        long,
        value_name = "PATH",
        help = "Model architecture file; built-in defaults when omitted"
    )]
    model_config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Toml,
    Json,
}

fn init_logging() {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    let _ = builder.try_init();
}

fn run(args: Args) -> Result<(), TrainingError> {
    let config = match &args.config {
        Some(path) => StageConfig::load(args.stage, path)?,
        None => StageConfig::defaults(args.stage),
    };
    let config = config.apply_overrides(&args.overrides)?;
    config.validate()?;

    let rendered = match args.format {
        OutputFormat::Toml => config.to_toml()?,
        OutputFormat::Json => config.to_json()?,
    };
    println!("{}", rendered.trim_end());

    if args.write_model_config {
        let StageConfig::Pretrain(train) = &config else {
            return Err(TrainingError::validation(vec![format!(
                "--write-model-config only applies to the pretrain stage, not {}",
                config.stage()
            )]));
        };
        let arch = match &args.model_config {
            Some(path) => ModelArchitecture::from_path(path)?,
            None => ModelArchitecture::default(),
        };
        arch.validate()
            .map_err(|err| TrainingError::validation(vec![err.to_string()]))?;
        let t5 = train.write_model_config(&arch)?;
        log::info!(
            "wrote {} (vocab_size={})",
            train.model_config_file.display(),
            t5.vocab_size
        );
    }

    Ok(())
}
