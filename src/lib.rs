/*!
 * # subconvert - subpicture subtitles to text subtitles
 *
 * A Rust library that rebuilds text subtitles from bitmap (subpicture)
 * subtitle streams by recognising the text on every rendered frame.
 *
 * ## Features
 *
 * - Probe a container and extract one subpicture stream as PNG frames
 * - Recognise every frame with several image and engine variants
 * - Arbitrate disagreeing readings by word frequency and spelling
 * - Normalize jittering sizes, positions and colours across frames
 * - Merge stacked rows and repeated showings into timed entries
 * - Emit Sub Station Alpha scripts or SubRip lists
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `media`: Stream probing and frame extraction (ffprobe, ffmpeg)
 * - `ocr`: Recognition engine seam and the detection adapter:
 *   - `ocr::tesseract`: Tesseract child-process engine
 *   - `ocr::hocr`: hOCR output parsing
 * - `consensus`: Arbitration between readings:
 *   - `consensus::spelling`: Hunspell pipe validator
 *   - `consensus::groups`: Cross-frame line groups
 * - `analysis`: Per-frame recognition and measurement
 * - `pool`: Concurrent frame worker pool
 * - `normalizer`, `merger`, `pipeline`: Line reconstruction
 * - `subtitles`: Subtitle document model and formats
 * - `app_controller`: Main application controller
 * - `fonts`, `file_utils`, `language_utils`: Support utilities
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod analysis;
pub mod app_config;
pub mod app_controller;
pub mod consensus;
pub mod errors;
pub mod file_utils;
pub mod fonts;
pub mod language_utils;
pub mod media;
pub mod merger;
pub mod normalizer;
pub mod ocr;
pub mod pipeline;
pub mod pool;
pub mod subtitles;
pub mod text_line;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{ConversionRequest, Controller};
pub use consensus::{ArbitrationStrategy, ConsensusArbiter, SpellValidator};
pub use errors::{ConfigError, ExtractionError, OcrError, SpellError, SubtitleError};
pub use ocr::{LinePrimitive, OcrEngine};
pub use subtitles::{OutputFormat, SubtitleDocument};
pub use text_line::TextLine;
