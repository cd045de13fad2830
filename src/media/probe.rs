use log::{debug, error};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

use super::{MediaInfo, StreamInfo, filter_ffmpeg_stderr};
use crate::errors::ExtractionError;

// @const: Probe timeout
const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// Describes the streams of an input container with ffprobe
#[derive(Debug, Clone)]
pub struct MediaProbe {
    binary: String,
}

impl Default for MediaProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl MediaProbe {
    pub fn new(binary: impl Into<String>) -> Self {
        MediaProbe { binary: binary.into() }
    }

    pub async fn probe(&self, input: &Path) -> Result<MediaInfo, ExtractionError> {
        let tool_error = |message: String| ExtractionError::Tool {
            tool: self.binary.clone(),
            message,
        };

        let ffprobe_future = Command::new(&self.binary)
            .args(["-v", "quiet", "-print_format", "json", "-show_streams", "-show_format"])
            .arg(input)
            .kill_on_drop(true)
            .output();

        let output = tokio::select! {
            result = ffprobe_future => result.map_err(|e| tool_error(e.to_string()))?,
            _ = tokio::time::sleep(PROBE_TIMEOUT) => {
                return Err(tool_error(format!("timed out after {} seconds", PROBE_TIMEOUT.as_secs())));
            }
        };

        if !output.status.success() {
            let stderr = filter_ffmpeg_stderr(&String::from_utf8_lossy(&output.stderr));
            error!("ffprobe failed on {}: {}", input.display(), stderr);
            return Err(ExtractionError::Failed {
                tool: self.binary.clone(),
                stderr,
            });
        }

        let info = parse_probe_output(&String::from_utf8_lossy(&output.stdout))?;
        debug!(
            "Probed {}: {} subtitle stream(s), duration {:?}",
            input.display(),
            info.subtitle_streams.len(),
            info.duration
        );
        Ok(info)
    }
}

fn text(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

fn dimension(value: &Value, key: &str) -> Option<u32> {
    value.get(key).and_then(|v| v.as_u64()).map(|v| v as u32)
}

/// Parses `-print_format json -show_streams -show_format` output
pub fn parse_probe_output(stdout: &str) -> Result<MediaInfo, ExtractionError> {
    if stdout.trim().is_empty() {
        return Ok(MediaInfo::default());
    }

    let json: Value = serde_json::from_str(stdout).map_err(|e| ExtractionError::Probe(e.to_string()))?;
    // ffprobe reports the duration as a decimal string
    let duration = json
        .get("format")
        .and_then(|f| f.get("duration"))
        .and_then(|d| d.as_str().and_then(|s| s.parse().ok()).or_else(|| d.as_f64()));
    let mut info = MediaInfo {
        duration,
        ..Default::default()
    };

    let Some(streams) = json.get("streams").and_then(|s| s.as_array()) else {
        return Ok(info);
    };

    for stream in streams {
        match stream.get("codec_type").and_then(|v| v.as_str()) {
            Some("video") if info.video_size.is_none() => {
                if let (Some(w), Some(h)) = (dimension(stream, "width"), dimension(stream, "height")) {
                    info.video_size = Some((w, h));
                }
            }
            Some("subtitle") => {
                let index = stream
                    .get("index")
                    .and_then(|v| v.as_u64())
                    .ok_or_else(|| ExtractionError::Probe("subtitle stream without index".to_string()))?;
                let tags = stream.get("tags");
                info.subtitle_streams.push(StreamInfo {
                    index: index as usize,
                    codec_name: text(stream, "codec_name").unwrap_or_else(|| "unknown".to_string()),
                    codec_long_name: text(stream, "codec_long_name"),
                    width: dimension(stream, "width"),
                    height: dimension(stream, "height"),
                    language: tags.and_then(|t| text(t, "language")),
                    title: tags.and_then(|t| text(t, "title")),
                });
            }
            _ => {}
        }
    }

    Ok(info)
}
