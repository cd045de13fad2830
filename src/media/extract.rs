use log::{debug, error, info};
use std::ffi::OsString;
use std::path::Path;
use tokio::process::Command;

use super::{StreamInfo, filter_ffmpeg_stderr};
use crate::app_config::ExtractionConfig;
use crate::errors::ExtractionError;
use crate::file_utils::FileManager;
use crate::text_line::FrameGeometry;

// @const: Frame file pattern inside the work directory
pub const FRAME_PATTERN: &str = "%06d.png";

/// Renders a subpicture stream to numbered PNG frames with ffmpeg
///
/// The stream is overlaid on a black canvas of the frame geometry, sampled at
/// the frame rate and de-duplicated so that only changes produce frames.
#[derive(Debug, Clone)]
pub struct FrameExtractor {
    binary: String,
    frame_rate: f64,
    start_time: f64,
    end_time: f64,
    sync_frames: bool,
}

impl FrameExtractor {
    pub fn new(settings: &ExtractionConfig) -> Self {
        FrameExtractor {
            binary: settings.ffmpeg_path.clone(),
            frame_rate: settings.frame_rate,
            start_time: settings.start_time,
            end_time: settings.end_time,
            sync_frames: settings.sync_frames,
        }
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    /// Arguments of the extraction command, without the binary
    pub fn arguments(&self, input: &Path, stream: &StreamInfo, geometry: FrameGeometry, work_dir: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-y".into(), "-loglevel".into(), "error".into(), "-i".into(), input.into()];
        args.extend(
            [
                "-f".to_string(),
                "lavfi".to_string(),
                "-i".to_string(),
                format!("color=size={}x{}:rate={}:color=black", geometry.width, geometry.height, self.frame_rate),
                "-filter_complex".to_string(),
                format!("[1:v][0:{}]overlay,mpdecimate[out]", stream.index),
                "-map".to_string(),
                "[out]".to_string(),
                "-an".to_string(),
                "-vsync".to_string(),
                if self.sync_frames { "vfr" } else { "passthrough" }.to_string(),
                "-frame_pts".to_string(),
                "1".to_string(),
            ]
            .map(OsString::from),
        );
        if self.start_time > 0.0 {
            args.push("-ss".into());
            args.push(self.start_time.to_string().into());
        }
        if self.end_time > 0.0 {
            args.push("-to".into());
            args.push(self.end_time.to_string().into());
        }
        args.push(work_dir.join(FRAME_PATTERN).into_os_string());
        args
    }

    /// Extracts frames into `work_dir`, reusing frames already there
    ///
    /// Returns the number of frames available afterwards.
    pub async fn extract(
        &self,
        input: &Path,
        stream: &StreamInfo,
        geometry: FrameGeometry,
        work_dir: &Path,
    ) -> Result<usize, ExtractionError> {
        let existing = FileManager::list_frames(work_dir, self.frame_rate)
            .map(|frames| frames.len())
            .unwrap_or(0);
        if existing > 0 {
            info!("Reusing {} extracted frame(s) in {}", existing, work_dir.display());
            return Ok(existing);
        }

        info!("Extracting frames of stream {} from {}", stream, input.display());
        let args = self.arguments(input, stream, geometry, work_dir);
        debug!("{} {:?}", self.binary, args);

        let output = Command::new(&self.binary)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ExtractionError::Tool {
                tool: self.binary.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = filter_ffmpeg_stderr(&String::from_utf8_lossy(&output.stderr));
            error!("Frame extraction failed: {}", stderr);
            return Err(ExtractionError::Failed {
                tool: self.binary.clone(),
                stderr,
            });
        }

        let count = FileManager::list_frames(work_dir, self.frame_rate)
            .map(|frames| frames.len())
            .map_err(|e| ExtractionError::Tool {
                tool: self.binary.clone(),
                message: e.to_string(),
            })?;
        info!("Extracted {} frame(s)", count);
        Ok(count)
    }
}
