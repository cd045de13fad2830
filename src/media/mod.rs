/*!
 * Media collaborators: stream probing and frame extraction.
 *
 * Both wrap the ffmpeg tool family as child processes. Probing describes the
 * container's subtitle streams; extraction renders one subpicture stream to a
 * directory of numbered PNG frames.
 */

use std::fmt;

use crate::errors::ConfigError;
use crate::text_line::FrameGeometry;

pub mod extract;
pub mod probe;

pub use extract::FrameExtractor;
pub use probe::MediaProbe;

/// Codecs whose subtitles are bitmaps that need recognition
pub const SUBPICTURE_CODECS: [&str; 4] = ["hdmv_pgs_subtitle", "dvd_subtitle", "dvb_subtitle", "xsub"];

/// Resolution used when neither the stream nor a video stream has one
pub const FALLBACK_GEOMETRY: FrameGeometry = FrameGeometry {
    width: crate::subtitles::DEFAULT_WIDTH,
    height: crate::subtitles::DEFAULT_HEIGHT,
};

/// True for bitmap subtitle codecs
pub fn is_subpicture_codec(codec_name: &str) -> bool {
    SUBPICTURE_CODECS.contains(&codec_name)
}

/// One subtitle stream of the input container
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    /// Absolute stream index in the container
    pub index: usize,
    pub codec_name: String,
    pub codec_long_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub language: Option<String>,
    pub title: Option<String>,
}

impl StreamInfo {
    pub fn is_subpicture(&self) -> bool {
        is_subpicture_codec(&self.codec_name)
    }
}

impl fmt::Display for StreamInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.index, self.codec_name)?;
        if let (Some(w), Some(h)) = (self.width, self.height) {
            write!(f, " {}x{}", w, h)?;
        }
        if let Some(language) = &self.language {
            write!(f, " [{}]", language)?;
        }
        if let Some(title) = &self.title {
            write!(f, " \"{}\"", title)?;
        }
        Ok(())
    }
}

/// What the probe learned about the input
#[derive(Debug, Clone, Default)]
pub struct MediaInfo {
    pub subtitle_streams: Vec<StreamInfo>,
    /// Dimensions of the first video stream
    pub video_size: Option<(u32, u32)>,
    /// Container duration in seconds
    pub duration: Option<f64>,
}

impl MediaInfo {
    /// Picks a subtitle stream by its position among subtitle streams
    ///
    /// Fails when there are none, when the position is out of range, or when
    /// the stream holds text rather than bitmaps.
    pub fn select_stream(&self, ordinal: usize) -> Result<&StreamInfo, ConfigError> {
        if self.subtitle_streams.is_empty() {
            return Err(ConfigError::NoSubtitleStreams);
        }
        let stream = self
            .subtitle_streams
            .get(ordinal)
            .ok_or(ConfigError::StreamIndexOutOfRange {
                requested: ordinal,
                available: self.subtitle_streams.len(),
            })?;
        if !stream.is_subpicture() {
            return Err(ConfigError::UnsupportedCodec(stream.codec_name.clone()));
        }
        Ok(stream)
    }

    /// Canvas the stream is rendered on
    pub fn geometry_for(&self, stream: &StreamInfo) -> FrameGeometry {
        match (stream.width, stream.height, self.video_size) {
            (Some(width), Some(height), _) if width > 0 && height > 0 => FrameGeometry { width, height },
            (_, _, Some((width, height))) if width > 0 && height > 0 => FrameGeometry { width, height },
            _ => FALLBACK_GEOMETRY,
        }
    }
}

/// Keeps only the meaningful lines of ffmpeg's stderr, dropping the version
/// banner, build configuration and stream metadata.
pub fn filter_ffmpeg_stderr(stderr: &str) -> String {
    const NOISE_PREFIXES: [&str; 19] = [
        "ffmpeg version",
        "ffprobe version",
        "  built with",
        "  configuration:",
        "  lib",
        "Input #",
        "  Metadata:",
        "  Duration:",
        "  Chapter",
        "    Chapter",
        "  Stream #",
        "      Metadata:",
        "        title",
        "        BPS",
        "        DURATION",
        "        NUMBER_OF",
        "Output #",
        "Stream mapping:",
        "Press [q]",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !NOISE_PREFIXES.iter().any(|p| line.starts_with(p)))
        .map(str::trim)
        .collect();

    if meaningful.is_empty() {
        "unknown error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}
