use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use log::{debug, trace};
use std::io::Cursor;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::hocr::parse_hocr;
use super::{LinePrimitive, OcrEngine, OcrRequest};
use crate::errors::OcrError;

/// Recognition engine backed by the tesseract command line tool
///
/// The frame is piped in as PNG and the hOCR document read back from stdout.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    /// Path or name of the tesseract executable
    binary: String,

    /// Tesseract language name (ISO 639-2/T)
    language: String,
}

impl TesseractEngine {
    pub fn new(binary: impl Into<String>, language: impl Into<String>) -> Self {
        TesseractEngine {
            binary: binary.into(),
            language: language.into(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Checks that the executable can be started
    pub async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    async fn encode_png(image: DynamicImage) -> Result<Vec<u8>, OcrError> {
        tokio::task::spawn_blocking(move || {
            let mut buffer = Vec::new();
            image
                .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
                .map_err(|e| OcrError::Image(e.to_string()))?;
            Ok(buffer)
        })
        .await
        .map_err(|e| OcrError::Image(format!("Encoding task failed: {}", e)))?
    }

    async fn run(&self, png: Vec<u8>, oem: u8) -> Result<String, OcrError> {
        let mut child = Command::new(&self.binary)
            .args(["-", "-", "-l", &self.language, "--oem", &oem.to_string(), "hocr"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| OcrError::Spawn(format!("{}: {}", self.binary, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| OcrError::Spawn("stdin not captured".to_string()))?;

        let feed = async move {
            stdin.write_all(&png).await?;
            stdin.shutdown().await
        };

        // Blocks until the engine exits; there is no per-call timeout
        let (fed, output) = tokio::join!(feed, child.wait_with_output());

        let output = output.map_err(|e| OcrError::Spawn(e.to_string()))?;
        if !output.status.success() {
            return Err(OcrError::EngineFailed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        // A broken pipe after a successful exit only means the engine stopped reading early
        if let Err(e) = fed {
            debug!("Engine closed its input early: {}", e);
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn recognize(&self, request: OcrRequest) -> Result<Vec<LinePrimitive>, OcrError> {
        let png = Self::encode_png(request.image).await?;
        let hocr = self.run(png, request.variant.engine.oem()).await?;
        let lines = parse_hocr(&hocr)?;
        trace!("{} [{}]: {} line(s)", request.label, request.variant, lines.len());
        Ok(lines)
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}
