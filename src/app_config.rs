use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::consensus::ArbitrationStrategy;
use crate::errors::ConfigError;

/// Application configuration module
/// This module handles loading, validating and saving the settings of the
/// recognition, extraction and reconstruction stages.

/// Default configuration file name
pub const DEFAULT_CONFIG_PATH: &str = "subconvert.json";

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Recognition settings
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Frame extraction settings
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Normalization and merge tunables
    #[serde(default)]
    pub reconstruction: ReconstructionConfig,

    /// Output document settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Frame workers; hardware concurrency when unset
    #[serde(default)]
    pub workers: Option<usize>,

    /// Show a progress bar over the frame stage
    #[serde(default = "default_true")]
    pub show_progress: bool,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Recognition collaborator configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OcrConfig {
    // @field: ISO 639-1 or 639-2 code of the subtitle language
    #[serde(default = "default_language")]
    pub language: String,

    // @field: Variant set used per frame
    #[serde(default)]
    pub strategy: ArbitrationStrategy,

    // @field: Recognition engine executable
    #[serde(default = "default_tesseract_path")]
    pub tesseract_path: String,

    // @field: Frames whose brightness extrema sum below this are skipped
    #[serde(default = "default_blank_threshold")]
    pub blank_threshold: u32,

    // @field: Resize factor of the upscaled variant
    #[serde(default = "default_upscale_factor")]
    pub upscale_factor: u32,

    // @field: Use the spelling collaborator during arbitration
    #[serde(default = "default_true")]
    pub spellcheck: bool,

    // @field: Spelling executable
    #[serde(default = "default_hunspell_path")]
    pub hunspell_path: String,

    // @field: Dictionary passed to the spelling executable
    #[serde(default)]
    pub dictionary: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            strategy: ArbitrationStrategy::default(),
            tesseract_path: default_tesseract_path(),
            blank_threshold: default_blank_threshold(),
            upscale_factor: default_upscale_factor(),
            spellcheck: true,
            hunspell_path: default_hunspell_path(),
            dictionary: None,
        }
    }
}

/// Frame extraction collaborator configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExtractionConfig {
    // @field: ffmpeg executable
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    // @field: ffprobe executable
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,

    // @field: Sampling rate in frames per second
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,

    // @field: First second to convert; 0 = from the start
    #[serde(default)]
    pub start_time: f64,

    // @field: Last second to convert; 0 = to the end
    #[serde(default)]
    pub end_time: f64,

    // @field: Emit frames on true frame boundaries only
    #[serde(default = "default_true")]
    pub sync_frames: bool,

    // @field: Keep extracted frames after the run
    #[serde(default)]
    pub preserve_work_files: bool,

    // @field: Work directory; a temporary directory when unset
    #[serde(default)]
    pub work_dir: Option<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            frame_rate: default_frame_rate(),
            start_time: 0.0,
            end_time: 0.0,
            sync_frames: true,
            preserve_work_files: false,
            work_dir: None,
        }
    }
}

/// Reconstruction tunables
///
/// The merge constants are empirical; they are exposed here for calibration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReconstructionConfig {
    #[serde(default = "default_size_tolerance_fraction")]
    pub size_tolerance_fraction: f64,

    #[serde(default = "default_color_tolerance")]
    pub color_tolerance: u8,

    #[serde(default = "default_vertical_merge_ratio")]
    pub vertical_merge_ratio: f64,

    #[serde(default = "default_temporal_merge_gap")]
    pub temporal_merge_gap: f64,

    #[serde(default = "default_terminal_frame_duration")]
    pub terminal_frame_duration: f64,

    #[serde(default = "default_reading_similarity")]
    pub reading_similarity: f64,

    #[serde(default = "default_glyph_height_ratio")]
    pub glyph_height_ratio: f64,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            size_tolerance_fraction: default_size_tolerance_fraction(),
            color_tolerance: default_color_tolerance(),
            vertical_merge_ratio: default_vertical_merge_ratio(),
            temporal_merge_gap: default_temporal_merge_gap(),
            terminal_frame_duration: default_terminal_frame_duration(),
            reading_similarity: default_reading_similarity(),
            glyph_height_ratio: default_glyph_height_ratio(),
        }
    }
}

/// Output document configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    // @field: Font named in every style
    #[serde(default = "default_font_name")]
    pub font_name: String,

    // @field: Drop size, position and colour from every entry
    #[serde(default)]
    pub text_only: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            font_name: default_font_name(),
            text_only: false,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_language() -> String {
    "en".to_string()
}

fn default_tesseract_path() -> String {
    "tesseract".to_string()
}

fn default_hunspell_path() -> String {
    "hunspell".to_string()
}

fn default_blank_threshold() -> u32 {
    crate::ocr::adapter::DEFAULT_BLANK_THRESHOLD
}

fn default_upscale_factor() -> u32 {
    2
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

fn default_frame_rate() -> f64 {
    10.0
}

fn default_size_tolerance_fraction() -> f64 {
    crate::normalizer::DEFAULT_SIZE_TOLERANCE_FRACTION
}

fn default_color_tolerance() -> u8 {
    crate::normalizer::DEFAULT_COLOR_TOLERANCE
}

fn default_vertical_merge_ratio() -> f64 {
    crate::merger::DEFAULT_VERTICAL_MERGE_RATIO
}

fn default_temporal_merge_gap() -> f64 {
    crate::merger::DEFAULT_TEMPORAL_MERGE_GAP
}

fn default_terminal_frame_duration() -> f64 {
    crate::pool::DEFAULT_TERMINAL_DURATION
}

fn default_reading_similarity() -> f64 {
    crate::consensus::similarity::DEFAULT_READING_SIMILARITY
}

fn default_glyph_height_ratio() -> f64 {
    crate::analysis::DEFAULT_GLYPH_HEIGHT_RATIO
}

fn default_font_name() -> String {
    "Roboto".to_string()
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue(message.into())
}

impl Config {
    /// Loads the configuration file, writing a default one if it is missing
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let file = File::open(path).with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {}", path.display()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<(), ConfigError> {
        crate::language_utils::validate_language_code(&self.ocr.language)
            .map_err(|e| invalid(e.to_string()))?;

        if self.ocr.upscale_factor == 0 {
            return Err(invalid("ocr.upscale_factor must be at least 1"));
        }

        let extraction = &self.extraction;
        if !(extraction.frame_rate > 0.0) {
            return Err(invalid(format!("extraction.frame_rate must be positive, got {}", extraction.frame_rate)));
        }
        if extraction.start_time < 0.0 || extraction.end_time < 0.0 {
            return Err(invalid("extraction start and end times must not be negative"));
        }
        if extraction.end_time > 0.0 && extraction.end_time <= extraction.start_time {
            return Err(invalid(format!(
                "extraction.end_time ({}) must be after start_time ({})",
                extraction.end_time, extraction.start_time
            )));
        }

        let reconstruction = &self.reconstruction;
        for (name, value) in [
            ("size_tolerance_fraction", reconstruction.size_tolerance_fraction),
            ("vertical_merge_ratio", reconstruction.vertical_merge_ratio),
            ("reading_similarity", reconstruction.reading_similarity),
            ("glyph_height_ratio", reconstruction.glyph_height_ratio),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(invalid(format!("reconstruction.{} must be in (0, 1), got {}", name, value)));
            }
        }
        if reconstruction.temporal_merge_gap < 0.0 {
            return Err(invalid("reconstruction.temporal_merge_gap must not be negative"));
        }
        if !(reconstruction.terminal_frame_duration > 0.0) {
            return Err(invalid("reconstruction.terminal_frame_duration must be positive"));
        }

        if self.workers == Some(0) {
            return Err(invalid("workers must be at least 1"));
        }
        if self.output.font_name.trim().is_empty() {
            return Err(invalid("output.font_name must not be empty"));
        }

        Ok(())
    }
}
