use anyhow::{Context, Result, anyhow};
use log::{debug, error, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::analysis::FrameAnalyzer;
use crate::app_config::Config;
use crate::consensus::{ConsensusArbiter, HunspellValidator, SpellValidator};
use crate::file_utils::{FileManager, WorkDirectory};
use crate::fonts;
use crate::language_utils;
use crate::media::{FrameExtractor, MediaProbe};
use crate::ocr::{DetectionAdapter, OcrEngine, TesseractEngine};
use crate::pipeline::ReconstructionPipeline;
use crate::pool::FrameWorkerPool;
use crate::subtitles::{OutputFormat, SubtitleDocument};
use crate::text_line::FrameGeometry;

// @module: Application controller for subtitle conversion

/// One conversion asked for on the command line
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Container holding the subpicture stream
    pub input: PathBuf,
    /// Position of the stream among the container's subtitle streams
    pub stream: usize,
    /// Output file; stdout when absent
    pub output: Option<PathBuf>,
    /// Explicit output format
    pub format: Option<OutputFormat>,
}

impl ConversionRequest {
    /// Explicit format, else the output extension, else Format A
    pub fn resolved_format(&self) -> OutputFormat {
        self.format
            .or_else(|| self.output.as_deref().and_then(OutputFormat::from_path))
            .unwrap_or_default()
    }
}

/// Where the spelling collaborator comes from
#[derive(Debug, Clone)]
enum ValidatorSource {
    Probe,
    Fixed(Option<Arc<dyn SpellValidator>>),
}

/// Main application controller for subtitle conversion
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Recognition engine override
    engine: Option<Arc<dyn OcrEngine>>,

    validator: ValidatorSource,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self {
            config,
            engine: None,
            validator: ValidatorSource::Probe,
        })
    }

    /// Uses this engine instead of the configured executable
    pub fn with_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Uses this validator (or none) instead of probing for one
    pub fn with_validator(mut self, validator: Option<Arc<dyn SpellValidator>>) -> Self {
        self.validator = ValidatorSource::Fixed(validator);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the whole conversion for one request
    pub async fn run(&self, request: &ConversionRequest) -> Result<()> {
        let start_time = Instant::now();

        if !FileManager::file_exists(&request.input) {
            return Err(anyhow!("Input file does not exist: {}", request.input.display()));
        }

        // Collaborators are resolved before any frame is rendered
        let engine = self.build_engine().await?;
        let arbiter = Arc::new(self.build_arbiter().await);

        let media = MediaProbe::new(&self.config.extraction.ffprobe_path)
            .probe(&request.input)
            .await
            .with_context(|| format!("Failed to probe {}", request.input.display()))?;
        let stream = media.select_stream(request.stream)?;
        let geometry = media.geometry_for(stream);
        info!("Converting subtitle stream {} at {}x{}", stream, geometry.width, geometry.height);

        let format = request.resolved_format();
        if format == OutputFormat::Ssa && !self.config.output.text_only {
            fonts::check_font(&self.config.output.font_name).await;
        }

        let work_dir = WorkDirectory::prepare(self.config.extraction.work_dir.as_deref().map(Path::new))?;
        debug!("Work directory: {}", work_dir.path().display());

        let converted = async {
            FrameExtractor::new(&self.config.extraction)
                .extract(&request.input, stream, geometry, work_dir.path())
                .await?;
            self.recognize_frames(work_dir.path(), geometry, engine, arbiter).await
        }
        .await;
        work_dir.finish(self.config.extraction.preserve_work_files);
        let document = converted?;

        self.emit(&document, format, request.output.as_deref())?;
        info!(
            "Converted {} entries in {}",
            document.entries().len(),
            Self::format_duration(start_time.elapsed())
        );
        Ok(())
    }

    /// Recognises an already extracted frame directory into a document
    pub async fn convert_frames(&self, frames_dir: &Path, geometry: FrameGeometry) -> Result<SubtitleDocument> {
        let engine = self.build_engine().await?;
        let arbiter = Arc::new(self.build_arbiter().await);
        self.recognize_frames(frames_dir, geometry, engine, arbiter).await
    }

    async fn recognize_frames(
        &self,
        frames_dir: &Path,
        geometry: FrameGeometry,
        engine: Arc<dyn OcrEngine>,
        arbiter: Arc<ConsensusArbiter>,
    ) -> Result<SubtitleDocument> {
        let frames = FileManager::list_frames(frames_dir, self.config.extraction.frame_rate)?;
        if frames.is_empty() {
            warn!("No frames found in {}", frames_dir.display());
        }

        let ocr = &self.config.ocr;
        let reconstruction = &self.config.reconstruction;

        let adapter = DetectionAdapter::new(engine)
            .with_blank_threshold(ocr.blank_threshold)
            .with_upscale_factor(ocr.upscale_factor);
        let analyzer = FrameAnalyzer::new(adapter, Arc::clone(&arbiter), ocr.strategy)
            .with_glyph_height_ratio(reconstruction.glyph_height_ratio);

        let pool = FrameWorkerPool::new(self.config.workers)
            .with_preserve_files(self.config.extraction.preserve_work_files)
            .with_terminal_duration(reconstruction.terminal_frame_duration)
            .with_progress(self.config.show_progress);
        info!("Recognising {} frame(s) with {} worker(s)", frames.len(), pool.workers());
        let lines = pool.run(Arc::new(analyzer), &frames).await;

        let pipeline = ReconstructionPipeline::new(reconstruction.clone(), arbiter, &self.config.output.font_name)
            .with_text_only(self.config.output.text_only);
        Ok(pipeline.run(lines, geometry).await)
    }

    async fn build_engine(&self) -> Result<Arc<dyn OcrEngine>> {
        if let Some(engine) = &self.engine {
            return Ok(Arc::clone(engine));
        }
        let language = language_utils::to_engine_code(&self.config.ocr.language)?;
        let engine = TesseractEngine::new(&self.config.ocr.tesseract_path, language);
        if !engine.is_available().await {
            return Err(anyhow!(
                "Recognition engine '{}' is not available",
                self.config.ocr.tesseract_path
            ));
        }
        Ok(Arc::new(engine))
    }

    async fn build_arbiter(&self) -> ConsensusArbiter {
        let ocr = &self.config.ocr;
        if !ocr.spellcheck {
            return ConsensusArbiter::new(None);
        }
        let validator = match &self.validator {
            ValidatorSource::Fixed(validator) => validator.clone(),
            ValidatorSource::Probe => match HunspellValidator::probe(&ocr.hunspell_path, ocr.dictionary.clone()).await {
                Some(hunspell) => Some(Arc::new(hunspell) as Arc<dyn SpellValidator>),
                None => {
                    warn!(
                        "Spelling validator '{}' not available, arbitration uses frequency voting only",
                        ocr.hunspell_path
                    );
                    None
                }
            },
        };
        ConsensusArbiter::new(validator)
    }

    /// Renders the document to the output file or stdout
    ///
    /// A document that fails its integrity check leaves an empty output file
    /// and nothing on stdout.
    pub fn emit(&self, document: &SubtitleDocument, format: OutputFormat, output: Option<&Path>) -> Result<()> {
        let rendered = match document.render(format) {
            Ok(rendered) => rendered,
            Err(e) => {
                error!("Refusing to write output: {}", e);
                if let Some(path) = output {
                    FileManager::write_to_file(path, "")?;
                }
                return Err(e.into());
            }
        };

        match output {
            Some(path) => {
                FileManager::write_to_file(path, &rendered)?;
                info!("Success: {}", path.display());
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout
                    .write_all(rendered.as_bytes())
                    .and_then(|_| stdout.flush())
                    .context("Failed to write subtitles to stdout")?;
            }
        }
        Ok(())
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
