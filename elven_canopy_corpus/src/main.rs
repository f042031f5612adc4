// Elven Canopy corpus training — CLI entry point.
//
// Reads an interval corpus exported by the notation reader, builds the
// Markov models and motif library, and writes them as JSON for the music
// generator (`elven_canopy_music`) to load.
//
// Usage:
//   train --corpus <PATH> [OPTIONS]
//     --corpus <PATH>       Corpus JSON file or directory of piece files
//     --output-dir <DIR>    Where to write the artifacts (default: data)
//     --max-pieces <N>      Analyze at most N pieces
//     --config <PATH>       Training config JSON (default: built-in)
//     --threads <N>         Worker threads (default: all cores)
//
// Logging goes through env_logger at `info` unless RUST_LOG says otherwise.

use std::path::PathBuf;

use elven_canopy_corpus::TrainingConfig;
use elven_canopy_corpus::train::run;
use log::{error, info};

struct Args {
    corpus: PathBuf,
    output_dir: PathBuf,
    config: Option<PathBuf>,
    max_pieces: Option<usize>,
    threads: Option<usize>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args();

    let mut config = match &args.config {
        Some(path) => match TrainingConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("{e}");
                std::process::exit(1);
            }
        },
        None => TrainingConfig::default(),
    };
    if args.max_pieces.is_some() {
        config.max_pieces = args.max_pieces;
    }
    if args.threads.is_some() {
        config.worker_threads = args.threads;
    }

    info!("Corpus: {}", args.corpus.display());
    info!("Output: {}", args.output_dir.display());

    match run(&args.corpus, &args.output_dir, &config) {
        Ok(_) => info!("Done! Files ready for the generator to load."),
        Err(e) => {
            error!("Training failed: {e}");
            std::process::exit(1);
        }
    }
}

/// Parse command-line arguments. Plain `std::env::args()` matching.
fn parse_args() -> Args {
    let mut corpus = None;
    let mut output_dir = PathBuf::from("data");
    let mut config = None;
    let mut max_pieces = None;
    let mut threads = None;
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--corpus" => {
                i += 1;
                corpus = Some(PathBuf::from(required(&args, i, "--corpus")));
            }
            "--output-dir" => {
                i += 1;
                output_dir = PathBuf::from(required(&args, i, "--output-dir"));
            }
            "--config" => {
                i += 1;
                config = Some(PathBuf::from(required(&args, i, "--config")));
            }
            "--max-pieces" => {
                i += 1;
                max_pieces = Some(number(&args, i, "--max-pieces"));
            }
            "--threads" => {
                i += 1;
                threads = Some(number(&args, i, "--threads"));
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(corpus) = corpus else {
        eprintln!("--corpus is required");
        print_usage();
        std::process::exit(1);
    };

    Args {
        corpus,
        output_dir,
        config,
        max_pieces,
        threads,
    }
}

fn required<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    args.get(i).map(String::as_str).unwrap_or_else(|| {
        eprintln!("{flag} requires a value");
        std::process::exit(1);
    })
}

fn number(args: &[String], i: usize, flag: &str) -> usize {
    args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
        eprintln!("{flag} requires a valid number");
        std::process::exit(1);
    })
}

fn print_usage() {
    println!("Usage: train --corpus <PATH> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --corpus <PATH>       Corpus JSON file or directory of piece files");
    println!("  --output-dir <DIR>    Where to write the artifacts (default: data)");
    println!("  --max-pieces <N>      Analyze at most N pieces");
    println!("  --config <PATH>       Training config JSON");
    println!("  --threads <N>         Worker threads (default: all cores)");
    println!("  --help, -h            Show this help");
}
