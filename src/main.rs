// Binary-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{error, info, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};

use bookwash::app_config::{self, Config, ProviderKind, API_KEY_ENV};
use bookwash::app_controller::{BatchSummary, Controller};
use bookwash::bookwash::{Axis, ChangeStatus, Level as RatingLevel, Selection, TextView};
use bookwash::pipeline::PipelineMode;

/// CLI Wrapper for ProviderKind to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliProvider {
    Ollama,
    OpenAI,
    Anthropic,
    LMStudio,
}

impl From<CliProvider> for ProviderKind {
    fn from(cli_provider: CliProvider) -> Self {
        match cli_provider {
            CliProvider::Ollama => ProviderKind::Ollama,
            CliProvider::OpenAI => ProviderKind::OpenAI,
            CliProvider::Anthropic => ProviderKind::Anthropic,
            CliProvider::LMStudio => ProviderKind::LMStudio,
        }
    }
}

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

/// Which text to export
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliView {
    Original,
    Cleaned,
    Proposed,
}

impl From<CliView> for TextView {
    fn from(view: CliView) -> Self {
        match view {
            CliView::Original => TextView::Original,
            CliView::Cleaned => TextView::Cleaned,
            CliView::Proposed => TextView::Proposed,
        }
    }
}

#[derive(Args, Debug, Clone)]
struct ProviderArgs {
    /// AI provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliProvider>,

    /// Model name to use
    #[arg(short, long)]
    model: Option<String>,

    /// API key for hosted providers
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,
}

#[derive(Args, Debug, Clone)]
struct PipelineArgs {
    /// Bookwash file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    #[command(flatten)]
    provider: ProviderArgs,

    /// Highest acceptable language rating (G, PG, PG-13, R, X)
    #[arg(long, value_parser = parse_level)]
    language: Option<RatingLevel>,

    /// Highest acceptable sexual content rating
    #[arg(long, value_parser = parse_level)]
    sexual: Option<RatingLevel>,

    /// Highest acceptable violence rating
    #[arg(long, value_parser = parse_level)]
    violence: Option<RatingLevel>,

    /// Revision attempts per chapter
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Skip re-classifying revised chapters
    #[arg(long)]
    no_verify: bool,

    /// Classify chapters that already carry a rating
    #[arg(long)]
    rerate: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rate every chapter and flag the ones above target
    Rate(PipelineArgs),

    /// Revise flagged chapters into change blocks
    Clean(PipelineArgs),

    /// Rate then clean
    Process(PipelineArgs),

    /// Accept, reject or reset change blocks
    Review {
        /// Bookwash file or directory
        #[arg(value_name = "INPUT_PATH")]
        input_path: PathBuf,

        /// New status: accepted, rejected or pending
        #[arg(value_parser = parse_status)]
        status: ChangeStatus,

        /// Change ids such as `1,3,5-8`, or `all`
        #[arg(default_value = "all", value_parser = parse_selection)]
        ids: Selection,
    },

    /// Write a text view of each document
    Export {
        /// Bookwash file or directory
        #[arg(value_name = "INPUT_PATH")]
        input_path: PathBuf,

        /// Which text to write
        #[arg(long, value_enum, default_value = "cleaned")]
        view: CliView,

        /// Output directory (defaults to next to the input)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Create a bookwash file from plain text with `# ` chapter headings
    Import {
        /// Plain text book
        #[arg(value_name = "TEXT_FILE")]
        input_path: PathBuf,

        /// Output path (defaults to the input with a .bookwash extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Force overwrite of an existing output file
        #[arg(short, long)]
        force_overwrite: bool,
    },

    /// Show chapter and change counts
    Stats {
        /// Bookwash file or directory
        #[arg(value_name = "INPUT_PATH")]
        input_path: PathBuf,
    },

    /// Test the connection to the configured provider
    Check(ProviderArgs),

    /// Generate shell completions for bookwash
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// bookwash - rate and clean book content with AI
#[derive(Parser, Debug)]
#[command(name = "bookwash")]
#[command(version)]
#[command(about = "AI-assisted content rating and cleaning for books")]
#[command(long_about = "bookwash rates each chapter of a book for language, sexual content and violence,
then rewrites the chapters above your targets and records every difference as a
reviewable change block.

EXAMPLES:
    bookwash import novel.txt                         # Create novel.bookwash
    bookwash rate novel.bookwash                      # Rate chapters only
    bookwash process --language G novel.bookwash      # Rate and clean
    bookwash review novel.bookwash accepted 1,3,5-8   # Accept some changes
    bookwash export --view cleaned novel.bookwash     # Write novel.cleaned.txt
    bookwash completions bash > bookwash.bash         # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If it does not exist the
    per-user config is used, otherwise a default one is created.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = app_config::CONFIG_FILE_NAME)]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

fn parse_level(value: &str) -> Result<RatingLevel, String> {
    value.parse().map_err(|e: anyhow::Error| e.to_string())
}

fn parse_status(value: &str) -> Result<ChangeStatus, String> {
    value.parse().map_err(|e: anyhow::Error| e.to_string())
}

fn parse_selection(value: &str) -> Result<Selection, String> {
    value.parse().map_err(|e: anyhow::Error| e.to_string())
}

// @struct: Custom logger implementation, filtered by the global max level
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI colour for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let level = record.level();
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(level),
                now,
                Self::get_emoji_for_level(level),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = CustomLogger::init(LevelFilter::Info) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let cli = CommandLineOptions::parse();
    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

/// Run the selected command; `Ok(false)` means some files failed
async fn run(cli: CommandLineOptions) -> Result<bool> {
    if let Some(level) = &cli.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "bookwash", &mut std::io::stdout());
            Ok(true)
        }
        Commands::Rate(args) => run_pipeline(&cli.config_path, cli.log_level.is_some(), args, PipelineMode::Rate).await,
        Commands::Clean(args) => run_pipeline(&cli.config_path, cli.log_level.is_some(), args, PipelineMode::Clean).await,
        Commands::Process(args) => {
            run_pipeline(&cli.config_path, cli.log_level.is_some(), args, PipelineMode::Process).await
        }
        Commands::Review { input_path, status, ids } => {
            let controller = Controller::with_config(load_config(&cli.config_path, cli.log_level.is_some())?);
            Ok(report(controller.review(&input_path, &ids, status)?))
        }
        Commands::Export { input_path, view, output_dir } => {
            let controller = Controller::with_config(load_config(&cli.config_path, cli.log_level.is_some())?);
            Ok(report(controller.export(&input_path, output_dir.as_deref(), view.into())?))
        }
        Commands::Import { input_path, output, force_overwrite } => {
            let controller = Controller::with_config(load_config(&cli.config_path, cli.log_level.is_some())?);
            controller.import(&input_path, output.as_deref(), force_overwrite)?;
            Ok(true)
        }
        Commands::Stats { input_path } => {
            let controller = Controller::with_config(load_config(&cli.config_path, cli.log_level.is_some())?);
            let stats = controller.stats(&input_path)?;
            if stats.is_empty() {
                return Err(anyhow!("No bookwash files found in: {:?}", input_path));
            }
            Ok(true)
        }
        Commands::Check(provider_args) => {
            let mut config = load_config(&cli.config_path, cli.log_level.is_some())?;
            apply_provider_args(&mut config, &provider_args);
            config.validate()?;
            Controller::with_config(config).check().await?;
            Ok(true)
        }
    }
}

async fn run_pipeline(config_path: &Path, log_level_given: bool, args: PipelineArgs, mode: PipelineMode) -> Result<bool> {
    let mut config = load_config(config_path, log_level_given)?;
    apply_provider_args(&mut config, &args.provider);
    if let Some(max_iterations) = args.max_iterations {
        config.cleaning.max_iterations = max_iterations;
    }
    if args.no_verify {
        config.cleaning.verify = false;
    }
    config.validate()?;

    let overrides: Vec<(Axis, RatingLevel)> = [
        (Axis::Language, args.language),
        (Axis::Sexual, args.sexual),
        (Axis::Violence, args.violence),
    ]
    .into_iter()
    .filter_map(|(axis, level)| level.map(|level| (axis, level)))
    .collect();

    let controller = Controller::with_config(config)
        .with_target_overrides(overrides)
        .with_rerate(args.rerate);
    Ok(report(controller.run_pipeline(&args.input_path, mode).await?))
}

fn load_config(path: &Path, log_level_given: bool) -> Result<Config> {
    let config = Config::load_or_create(path)?;
    // The command line level wins over the configured one
    if !log_level_given {
        log::set_max_level(config.log_level.to_level_filter());
    }
    Ok(config)
}

fn apply_provider_args(config: &mut Config, args: &ProviderArgs) {
    if let Some(provider) = &args.provider {
        config.ai.provider = provider.clone().into();
    }
    if let Some(model) = &args.model {
        config.ai.active_provider_config_mut().model = model.clone();
    }
    if let Some(api_key) = args.api_key.as_ref().filter(|key| !key.is_empty()) {
        config.ai.active_provider_config_mut().api_key = api_key.clone();
    }
}

fn report(summary: BatchSummary) -> bool {
    if summary.has_failures() {
        error!("{} of {} file(s) failed", summary.failed.len(), summary.total());
        for path in &summary.failed {
            error!("  {}", path.display());
        }
    } else if summary.total() > 1 {
        info!("All {} files processed", summary.total());
    }
    !summary.has_failures()
}
