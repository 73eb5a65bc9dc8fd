use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use wordwatch::{Controller, Settings, logging};

/// Monitor files for appended lines containing a word, for a bounded
/// duration, and report matches with timestamps.
#[derive(Parser)]
#[command(name = "wordwatch", version)]
#[command(about = "Watch growing files for a word and report matches")]
struct Cli {
    /// How long to monitor, in whole seconds
    duration: u64,

    /// Word to look for in appended lines (case-sensitive substring)
    word: String,

    /// Files to monitor
    #[arg(required = true)]
    files: Vec<String>,

    /// Alternate configuration file (default: wordwatch.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

async fn run(settings: Settings, cli: Cli) -> anyhow::Result<()> {
    let controller = Controller::new(settings, cli.duration, cli.word);
    controller
        .run(&cli.files)
        .await
        .context("monitoring run failed")
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        Settings::default()
    });
    logging::init_with_config(&settings.logging);

    if cli.files.len() > settings.limits.max_watches {
        println!(
            "Too many files! Hard limit defined as {}.",
            settings.limits.max_watches
        );
        println!("usage: wordwatch <duration-seconds> <search-word> <file>...");
        return ExitCode::FAILURE;
    }

    match run(settings, cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
