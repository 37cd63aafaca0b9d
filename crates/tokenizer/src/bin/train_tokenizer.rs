use std::path::PathBuf;

use clap::Parser;
use env_logger::Env;
use log::LevelFilter;
use tokenizer::config::DEFAULT_MAX_TRAIN_LINES;
use tokenizer::{marker_path, read_marker, train_bpe_tokenizer_with, ChunkCfg, TrainerCfg};

fn main() {
    let args = Args::parse();
    init_logging(args.quiet);

    if let Err(err) = run(args) {
        eprintln!("tokenizer training failed: {}", err);
        std::process::exit(1);
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Train the BPE tokenizer", long_about = None)]
struct Args {
    #[arg(
        long,
        value_name = "PATH",
        default_value = "./data/text/dataset_shuffle.txt",
        help = "Line-oriented UTF-8 training corpus"
    )]
    corpus: PathBuf,

    #[arg(
        long,
        value_name = "PATH",
        default_value = "./output/hf_bpe_tokenizer/tokenizer.json",
        help = "Where to save tokenizer.json"
    )]
    output: PathBuf,

    #[arg(
        long,
        value_name = "PATH",
        help = "JSON trainer config; flags below override its values"
    )]
    config: Option<PathBuf>,

    #[arg(long, help = "Retrain even if a previous run completed")]
    recreate: bool,

    #[arg(
        long,
        value_name = "N",
        default_value_t = DEFAULT_MAX_TRAIN_LINES,
        help = "Stop reading the corpus after N lines"
    )]
    max_train_lines: usize,

    #[arg(long, value_name = "N")]
    vocab_size: Option<usize>,

    #[arg(long, value_name = "N")]
    min_frequency: Option<u64>,

    #[arg(long, value_name = "CHARS", help = "Characters per corpus chunk")]
    chunk_len: Option<usize>,

    #[arg(long, value_name = "N", help = "Chunks per batch handed to the trainer")]
    buffer_size: Option<usize>,

    #[arg(short, long, help = "Only log warnings and errors")]
    quiet: bool,
}

impl Args {
    fn trainer_cfg(&self) -> tokenizer::Result<TrainerCfg> {
        let defaults = match &self.config {
            Some(path) => TrainerCfg::from_json_file(path)?,
            None => TrainerCfg::default(),
        };
        Ok(TrainerCfg {
            vocab_size: self.vocab_size.unwrap_or(defaults.vocab_size),
            min_frequency: self.min_frequency.unwrap_or(defaults.min_frequency),
            show_progress: defaults.show_progress && !self.quiet,
            chunk: ChunkCfg {
                chunk_len: self.chunk_len.unwrap_or(defaults.chunk.chunk_len),
                buffer_size: self.buffer_size.unwrap_or(defaults.chunk.buffer_size),
            },
            ..defaults
        })
    }
}

fn init_logging(quiet: bool) {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    if quiet {
        builder.filter_level(LevelFilter::Warn);
    }
    let _ = builder.try_init();
}

fn run(args: Args) -> tokenizer::Result<()> {
    let cfg = args.trainer_cfg()?;
    let trained = train_bpe_tokenizer_with(
        &cfg,
        &args.corpus,
        &args.output,
        args.recreate,
        Some(args.max_train_lines),
    )?;

    if !trained {
        let previous = read_marker(&marker_path(&args.output))?;
        log::info!(
            "tokenizer already trained at {} ({}); pass --recreate to retrain",
            args.output.display(),
            previous.join(", ")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_cap_defaults_to_ten_million() {
        let args = Args::try_parse_from(["train_tokenizer"]).unwrap();
        assert_eq!(args.max_train_lines, 10_000_000);

        let args = Args::try_parse_from(["train_tokenizer", "--max-train-lines", "50"]).unwrap();
        assert_eq!(args.max_train_lines, 50);
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from(["train_tokenizer", "--vocab-size", "512", "-q"]).unwrap();
        let cfg = args.trainer_cfg().unwrap();
        assert_eq!(cfg.vocab_size, 512);
        assert!(!cfg.show_progress);
        assert_eq!(cfg.chunk, ChunkCfg::default());
    }
}
