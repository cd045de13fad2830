use anyhow::{Context, Result};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::pool::FrameFile;

// @module: File and directory utilities

// @const: Extracted frame file name, `%06d.png`
static FRAME_NAME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)\.png$").unwrap());

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {}", path.display()))?;
        }
        Ok(())
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path).with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file, creating parent directories
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                Self::ensure_dir(parent)?;
            }
        }

        fs::write(&path, content).with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Extracted frames of a work directory, ordered by frame index
    ///
    /// Only files named like `000123.png` count; anything else is ignored.
    pub fn list_frames<P: AsRef<Path>>(dir: P, frame_rate: f64) -> Result<Vec<FrameFile>> {
        let mut frames = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).min_depth(1).max_depth(1) {
            let entry = entry.context("Failed to read directory entry")?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            let Some(index) = FRAME_NAME_REGEX
                .captures(&name)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<u64>().ok())
            else {
                continue;
            };
            frames.push(FrameFile::new(index, entry.path().to_path_buf(), frame_rate));
        }

        frames.sort_by_key(|frame| frame.index);
        Ok(frames)
    }
}

/// Directory the frames are extracted to
///
/// A temporary directory is removed unless kept; a directory given by the user
/// is removed only once it is empty.
#[derive(Debug)]
pub enum WorkDirectory {
    Temporary(TempDir),
    Provided(PathBuf),
}

impl WorkDirectory {
    /// Uses `dir` when given, otherwise a fresh temporary directory
    pub fn prepare(dir: Option<&Path>) -> Result<Self> {
        match dir {
            Some(dir) => {
                FileManager::ensure_dir(dir)?;
                Ok(WorkDirectory::Provided(dir.to_path_buf()))
            }
            None => {
                let temp = tempfile::Builder::new()
                    .prefix("subconvert-")
                    .tempdir()
                    .context("Failed to create temporary work directory")?;
                Ok(WorkDirectory::Temporary(temp))
            }
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            WorkDirectory::Temporary(temp) => temp.path(),
            WorkDirectory::Provided(dir) => dir,
        }
    }

    /// Cleans up after the run
    pub fn finish(self, preserve: bool) {
        match self {
            WorkDirectory::Temporary(temp) if preserve => {
                let kept = temp.into_path();
                warn!("Work files kept in {}", kept.display());
            }
            WorkDirectory::Temporary(temp) => {
                let path = temp.path().to_path_buf();
                if let Err(e) = temp.close() {
                    debug!("Could not remove {}: {}", path.display(), e);
                }
            }
            WorkDirectory::Provided(dir) if !preserve => {
                if let Err(e) = fs::remove_dir(&dir) {
                    debug!("Could not remove {}: {}", dir.display(), e);
                }
            }
            WorkDirectory::Provided(_) => {}
        }
    }
}
