// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug};
use std::io::Write;
use std::path::{Path, PathBuf};

use subconvert::app_config::{self, Config, DEFAULT_CONFIG_PATH};
use subconvert::{ConversionRequest, Controller, OutputFormat};

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

/// CLI Wrapper for OutputFormat to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliOutputFormat {
    Ssa,
    Ass,
    Srt,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(cli_format: CliOutputFormat) -> Self {
        match cli_format {
            CliOutputFormat::Ssa | CliOutputFormat::Ass => OutputFormat::Ssa,
            CliOutputFormat::Srt => OutputFormat::Srt,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completions for subconvert
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// subconvert - convert subpicture subtitles to text subtitles
///
/// Recognises the text of a bitmap subtitle stream (PGS, VobSub, DVB, XSUB)
/// frame by frame and writes it out as an SSA script or an SRT list.
#[derive(Parser, Debug)]
#[command(name = "subconvert")]
#[command(version)]
#[command(about = "Convert subpicture subtitles to text subtitles")]
#[command(long_about = "subconvert extracts a subpicture subtitle stream as frames, recognises the text on
every frame and rebuilds timed, styled text subtitles from it.

EXAMPLES:
    subconvert -i movie.mkv -o movie.ssa           # First subtitle stream to SSA
    subconvert -i movie.mkv -s 2 -o movie.srt      # Third subtitle stream to SRT
    subconvert -i movie.mkv -f srt > movie.srt     # Write to stdout
    subconvert -i movie.mkv --text-only -o out.ass # Text and timing only
    subconvert completions bash > subconvert.bash  # Generate bash completions

CONFIGURATION:
    Configuration is stored in subconvert.json by default. You can specify a
    different config file with --config. If the config file doesn't exist, a
    default one will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input video file
    #[arg(short, long, value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Subtitle stream to convert, counted among subtitle streams
    #[arg(short = 's', long = "subtitle-stream", default_value_t = 0)]
    subtitle_stream: usize,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format; defaults to the output file extension, then ssa
    #[arg(short = 'f', long = "output-format", value_enum)]
    output_format: Option<CliOutputFormat>,

    /// Font named in the output styles
    #[arg(long)]
    font: Option<String>,

    /// Drop size, position and colour information
    #[arg(long)]
    text_only: bool,

    /// Configuration file path
    #[arg(short, long = "config", default_value = DEFAULT_CONFIG_PATH)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Number of concurrent frame workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Keep the extracted frames after the run
    #[arg(long)]
    keep_work_files: bool,

    /// Directory to extract frames to
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// First second of the stream to convert
    #[arg(long)]
    start: Option<f64>,

    /// Last second of the stream to convert
    #[arg(long)]
    end: Option<f64>,
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
        // The logger itself accepts everything; log::max_level does the filtering
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
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
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let level = record.level();
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
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
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "subconvert", &mut std::io::stdout());
            Ok(())
        }
        None => run_convert(cli).await,
    }
}

/// Applies command line overrides on top of the file configuration
fn apply_overrides(config: &mut Config, options: &CommandLineOptions) {
    if let Some(font) = &options.font {
        config.output.font_name = font.clone();
    }
    if options.text_only {
        config.output.text_only = true;
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
    if let Some(workers) = options.workers {
        config.workers = Some(workers);
    }
    if options.keep_work_files {
        config.extraction.preserve_work_files = true;
    }
    if let Some(work_dir) = &options.work_dir {
        config.extraction.work_dir = Some(work_dir.to_string_lossy().into_owned());
    }
    if let Some(start) = options.start {
        config.extraction.start_time = start;
    }
    if let Some(end) = options.end {
        config.extraction.end_time = end;
    }
}

async fn run_convert(options: CommandLineOptions) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.into());
    }

    let input = options
        .input
        .clone()
        .ok_or_else(|| anyhow!("--input is required when no subcommand is specified"))?;

    let mut config = Config::load_or_create(Path::new(&options.config_path))?;
    apply_overrides(&mut config, &options);

    // Validate the configuration after loading and overriding
    config.validate().context("Configuration validation failed")?;

    // If log level was not set via command line, update it from config now
    if options.log_level.is_none() {
        log::set_max_level(config.log_level.into());
    }
    debug!("Effective configuration: {:?}", config);

    let request = ConversionRequest {
        input,
        stream: options.subtitle_stream,
        output: options.output,
        format: options.output_format.map(Into::into),
    };

    Controller::with_config(config)?.run(&request).await
}
