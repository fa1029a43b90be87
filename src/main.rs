// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use ebook_translator::app_config::{self, Config, TranslationPosition};
use ebook_translator::app_controller::{Controller, JobOptions};
use ebook_translator::cache::CacheDirectory;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for TranslationPosition to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliPosition {
    Above,
    Below,
    Before,
    After,
    Left,
    Right,
    Only,
}

impl From<CliPosition> for TranslationPosition {
    fn from(position: CliPosition) -> Self {
        match position {
            CliPosition::Above => TranslationPosition::Above,
            CliPosition::Below => TranslationPosition::Below,
            CliPosition::Before => TranslationPosition::Before,
            CliPosition::After => TranslationPosition::After,
            CliPosition::Left => TranslationPosition::Left,
            CliPosition::Right => TranslationPosition::Right,
            CliPosition::Only => TranslationPosition::Only,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate an unpacked ebook directory
    Translate(TranslateArgs),

    /// Manage the translation cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// List built-in and custom engines
    Engines,

    /// Show the usage report of the configured engine
    Usage,

    /// Generate shell completions for ebook-translator
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// List cache files
    List,
    /// Remove every cache file
    Clean,
    /// Move the cache to another directory and remember it
    Move {
        #[arg(value_name = "DEST")]
        dest: PathBuf,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Unpacked ebook directory
    #[arg(value_name = "INPUT_DIR")]
    input_dir: PathBuf,

    /// Where the translated book is written
    #[arg(short, long, value_name = "OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Engine name, e.g. 'Google(Free)New', 'DeepL', 'ChatGPT'
    #[arg(short, long)]
    engine: Option<String>,

    /// Source language name or code, e.g. 'English' or 'en'
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language name or code
    #[arg(short, long)]
    target_language: Option<String>,

    /// Where translations are placed
    #[arg(long, value_enum)]
    position: Option<CliPosition>,

    /// Merge paragraphs into larger requests
    #[arg(long)]
    merge: bool,

    /// Ignore cached translations
    #[arg(long)]
    fresh: bool,

    /// Only write back cached translations
    #[arg(long, conflicts_with = "fresh")]
    cache_only: bool,
}

/// ebook-translator - translate ebooks with machine translation and AI engines
#[derive(Parser, Debug)]
#[command(name = "ebook-translator")]
#[command(version)]
#[command(about = "Ebook translation with caching, retries and bilingual layouts")]
#[command(long_about = "ebook-translator extracts the text of an unpacked ebook, translates it with \
a machine translation or AI engine and writes the translation back next to the original.

EXAMPLES:
    ebook-translator translate book/ -o out/                  # Translate using default config
    ebook-translator translate book/ -o out/ -e DeepL -t fr   # Use DeepL, target French
    ebook-translator translate book/ -o out/ --position only  # Replace the original text
    ebook-translator cache list                               # Show cached jobs
    ebook-translator completions bash > ebook-translator.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger::new(LevelFilter::Trace)))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and tag for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "ERROR"),
            Level::Warn => ("1;33", "WARN "),
            Level::Info => ("1;32", "INFO "),
            Level::Debug => ("1;36", "DEBUG"),
            Level::Trace => ("1;35", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, tag) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                color,
                now,
                tag,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Load the config file, creating a default one when missing
fn load_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        return Config::load(config_path);
    }
    warn!("Config file not found at '{}', creating default config.", config_path);
    let config = Config::default();
    config
        .save(config_path)
        .with_context(|| format!("Failed to write default config to file: {}", config_path))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    CustomLogger::init(LevelFilter::Info)?;
    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "ebook-translator", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = load_config(&cli.config_path)?;
    if let Some(level) = cli.log_level.clone() {
        config.log_level = level.into();
    }
    log::set_max_level(config.log_level.to_level_filter());

    match cli.command {
        Commands::Translate(args) => run_translate(config, args).await,
        Commands::Cache { action } => run_cache(config, &cli.config_path, action),
        Commands::Engines => {
            let controller = Controller::with_config(config)?;
            for name in controller.registry().names() {
                println!("{}", name);
            }
            Ok(())
        }
        Commands::Usage => {
            let controller = Controller::with_config(config)?;
            match controller.usage().await? {
                Some(report) => println!("{}", report),
                None => println!("The engine does not report usage."),
            }
            Ok(())
        }
        Commands::Completions { .. } => Ok(()),
    }
}

async fn run_translate(mut config: Config, args: TranslateArgs) -> Result<()> {
    if let Some(engine) = &args.engine {
        config.translate_engine = engine.clone();
    }
    if let Some(position) = args.position {
        config.translation_position = position.into();
    }
    if args.merge {
        config.merge_enabled = true;
    }
    config.validate().context("Configuration validation failed")?;

    let controller = Controller::with_config(config)?;
    let cancel = controller.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the running requests");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    let options = JobOptions {
        input_dir: args.input_dir,
        output_dir: args.output_dir,
        target_lang: args.target_language,
        source_lang: args.source_language,
        fresh: args.fresh,
        cache_only: args.cache_only,
    };
    let summary = controller.run(&options).await?;
    if summary.canceled {
        warn!("Translation was canceled; run again to resume from the cache");
        return Ok(());
    }
    info!("Output written to {:?}", options.output_dir);
    Ok(())
}

fn run_cache(mut config: Config, config_path: &str, action: CacheAction) -> Result<()> {
    let mut directory = CacheDirectory::new(
        config
            .cache_path
            .clone()
            .unwrap_or_else(CacheDirectory::default_path),
    );
    match action {
        CacheAction::List => {
            let entries = directory.list()?;
            for entry in &entries {
                println!(
                    "{}\t{}\t{}\t{}\t{:.2} MB\t{}\t{}",
                    entry.title, entry.engine, entry.lang, entry.merge, entry.size_mb, entry.modified, entry.filename
                );
            }
            println!(
                "{} files, {:.2} MB in {:?}",
                entries.len(),
                directory.total_size()? as f64 / (1000.0 * 1000.0),
                directory.base()
            );
        }
        CacheAction::Clean => {
            let removed = directory.clean()?;
            println!("Removed {} cache files", removed);
        }
        CacheAction::Move { dest } => {
            let base = directory.move_to(&dest)?;
            config.cache_path = Some(base);
            config.save(config_path)?;
            println!("Cache moved to {:?}", directory.base());
        }
    }
    Ok(())
}
