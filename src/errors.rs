/*!
 * Error types for the subconvert application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors raised by the recognition collaborator
///
/// These never escape the frame worker pool: a failing frame yields no lines.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The recognition process could not be started or talked to
    #[error("Failed to run recognition engine: {0}")]
    Spawn(String),

    /// The recognition process exited with a failure status
    #[error("Recognition engine failed with status {status}: {stderr}")]
    EngineFailed {
        /// Exit status reported by the process
        status: i32,
        /// Trimmed stderr of the process
        stderr: String,
    },

    /// The hOCR document could not be parsed
    #[error("Failed to parse hOCR output: {0}")]
    Parse(String),

    /// The frame could not be decoded or re-encoded
    #[error("Image error: {0}")]
    Image(String),
}

/// Errors raised by the spelling collaborator
#[derive(Error, Debug)]
pub enum SpellError {
    /// The spelling process could not be started or talked to
    #[error("Failed to run spelling validator: {0}")]
    Spawn(String),

    /// The response did not line up with the request
    #[error("Unexpected spelling validator output: {0}")]
    Protocol(String),
}

/// Errors raised while probing the input or extracting frames
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// A media tool could not be executed
    #[error("Failed to execute {tool}: {message}")]
    Tool {
        /// Tool name (ffmpeg, ffprobe)
        tool: String,
        /// Underlying failure
        message: String,
    },

    /// A media tool ran but reported failure
    #[error("{tool} failed: {stderr}")]
    Failed {
        /// Tool name (ffmpeg, ffprobe)
        tool: String,
        /// Filtered stderr
        stderr: String,
    },

    /// The probe output was not what we expected
    #[error("Failed to parse probe output: {0}")]
    Probe(String),
}

/// Configuration and input-selection errors
///
/// These are raised before any extraction or recognition work starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The input has no subtitle streams at all
    #[error("No subtitle streams found in the input file")]
    NoSubtitleStreams,

    /// The requested subtitle stream does not exist
    #[error("Subtitle stream {requested} requested but only {available} available")]
    StreamIndexOutOfRange {
        /// Requested subtitle stream ordinal
        requested: usize,
        /// Number of subtitle streams in the input
        available: usize,
    },

    /// The selected stream is not a subpicture stream
    #[error("Subtitle codec '{0}' is a text codec; only subpicture subtitles can be converted")]
    UnsupportedCodec(String),

    /// A configuration value is out of range
    #[error("Invalid configuration: {0}")]
    InvalidValue(String),
}

/// Errors raised by the subtitle document
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// A consumed line reached the document
    #[error("Entry {index} is a consumed line ({start:.3} -> {end:.3}); refusing to render")]
    IntegrityViolation {
        /// Position of the offending entry
        index: usize,
        /// Start time of the offending entry
        start: f64,
        /// End time of the offending entry
        end: f64,
    },

    /// A subtitle document could not be parsed
    #[error("Failed to parse subtitle document: {0}")]
    Parse(String),
}
