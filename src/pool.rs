use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::analysis::FrameProcessor;
use crate::text_line::TextLine;

// @module: Frame worker pool with result-by-index join

/// Fallback duration of the last frame, which has no successor
pub const DEFAULT_TERMINAL_DURATION: f64 = 5.0;

/// One extracted frame image
#[derive(Debug, Clone, PartialEq)]
pub struct FrameFile {
    /// Frame index at the extraction frame rate
    pub index: u64,

    /// Image path in the work directory
    pub path: PathBuf,

    /// Presentation time in seconds
    pub start: f64,
}

impl FrameFile {
    pub fn new(index: u64, path: PathBuf, frame_rate: f64) -> Self {
        FrameFile {
            index,
            path,
            start: index as f64 / frame_rate,
        }
    }

    /// File name used in log messages
    pub fn label(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{:06}", self.index))
    }
}

/// Bounded pool running one frame processor per frame
///
/// Frames are dispatched in order; results are consumed in the same order
/// regardless of completion order.
#[derive(Debug, Clone)]
pub struct FrameWorkerPool {
    workers: usize,
    preserve_files: bool,
    terminal_duration: f64,
    show_progress: bool,
}

impl Default for FrameWorkerPool {
    fn default() -> Self {
        Self::new(None)
    }
}

impl FrameWorkerPool {
    /// Pool sized to `workers`, or to the available hardware concurrency
    pub fn new(workers: Option<usize>) -> Self {
        let workers = workers
            .filter(|w| *w > 0)
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4));
        FrameWorkerPool {
            workers,
            preserve_files: false,
            terminal_duration: DEFAULT_TERMINAL_DURATION,
            show_progress: false,
        }
    }

    pub fn with_preserve_files(mut self, preserve: bool) -> Self {
        self.preserve_files = preserve;
        self
    }

    pub fn with_terminal_duration(mut self, seconds: f64) -> Self {
        self.terminal_duration = seconds;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style.progress_chars("█▓▒░"));
        bar.set_message("Recognising");
        bar
    }

    /// Starts one task per frame; handle `i` belongs to `frames[i]`
    pub fn dispatch(
        &self,
        processor: Arc<dyn FrameProcessor>,
        frames: &[FrameFile],
        progress: &ProgressBar,
    ) -> Vec<JoinHandle<Vec<TextLine>>> {
        let semaphore = Arc::new(Semaphore::new(self.workers));

        frames
            .iter()
            .cloned()
            .map(|frame| {
                let semaphore = Arc::clone(&semaphore);
                let processor = Arc::clone(&processor);
                let progress = progress.clone();
                tokio::spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return Vec::new();
                    };
                    let lines = processor.process(&frame).await;
                    progress.inc(1);
                    lines
                })
            })
            .collect()
    }

    /// Runs every frame and returns all lines in frame order
    ///
    /// Each frame's lines end where the next frame starts; the last frame's
    /// lines get the terminal duration. A frame whose task fails yields no
    /// lines. Frame files are deleted once consumed unless preserved.
    pub async fn run(&self, processor: Arc<dyn FrameProcessor>, frames: &[FrameFile]) -> Vec<TextLine> {
        let progress = self.progress_bar(frames.len());
        let handles = self.dispatch(processor, frames, &progress);
        let mut lines = Vec::new();

        for (index, handle) in handles.into_iter().enumerate() {
            let frame = &frames[index];
            let end = frames
                .get(index + 1)
                .map(|next| next.start)
                .unwrap_or(frame.start + self.terminal_duration);

            let frame_lines = match handle.await {
                Ok(frame_lines) => frame_lines,
                Err(e) => {
                    warn!("{}: frame task failed: {}", frame.label(), e);
                    Vec::new()
                }
            };

            if !frame_lines.is_empty() {
                debug!("{}: {} line(s)", frame.label(), frame_lines.len());
            }
            lines.extend(frame_lines.into_iter().map(|mut line| {
                line.end = end;
                line
            }));

            if !self.preserve_files {
                if let Err(e) = tokio::fs::remove_file(&frame.path).await {
                    debug!("Could not remove {}: {}", frame.path.display(), e);
                }
            }
        }

        progress.finish_and_clear();
        lines
    }
}
