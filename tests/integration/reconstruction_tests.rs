/*!
 * End-to-end reconstruction tests: frames on disk to a subtitle document
 *
 * Recognition and spelling use the mock collaborators; everything else is the
 * real pipeline.
 */

use anyhow::Result;
use image::Rgb;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use subconvert::app_config::Config;
use subconvert::app_controller::{ConversionRequest, Controller};
use subconvert::consensus::{ArbitrationStrategy, SpellValidator};
use subconvert::errors::SubtitleError;
use subconvert::ocr::{BoundingBox, LinePrimitive, OcrEngine};
use subconvert::subtitles::{OutputFormat, SubtitleDocument};
use subconvert::text_line::{FrameGeometry, TextLine};

use crate::common::{self, DictionarySpellValidator, MockOcrEngine};

const GEOMETRY: FrameGeometry = FrameGeometry { width: 320, height: 240 };

fn caption_box() -> BoundingBox {
    BoundingBox::new(60, 180, 260, 210)
}

fn upper_box() -> BoundingBox {
    BoundingBox::new(80, 140, 240, 170)
}

/// Writes frames 0 and 1 with a caption and a blank frame 2
fn write_caption_frames(dir: &Path) -> Result<()> {
    let white = Rgb([0xff, 0xff, 0xff]);
    common::write_frame(dir, 0, (GEOMETRY.width, GEOMETRY.height), &[(caption_box(), white)])?;
    common::write_frame(dir, 1, (GEOMETRY.width, GEOMETRY.height), &[(caption_box(), white)])?;
    common::write_frame(dir, 2, (GEOMETRY.width, GEOMETRY.height), &[])?;
    Ok(())
}

fn misspelled_then_correct() -> MockOcrEngine {
    MockOcrEngine::new()
        .with_frame(common::frame_label(0), vec![LinePrimitive::new(caption_box(), "Hello wrold")])
        .with_frame(common::frame_label(1), vec![LinePrimitive::new(caption_box(), "Hello world")])
}

fn controller(config: Config, engine: MockOcrEngine, validator: Option<Arc<dyn SpellValidator>>) -> Result<Controller> {
    let engine: Arc<dyn OcrEngine> = Arc::new(engine);
    Ok(Controller::with_config(config)?
        .with_engine(engine)
        .with_validator(validator))
}

#[tokio::test]
async fn test_convertFrames_withMisspelledFrame_shouldEmitOneValidatedEntry() -> Result<()> {
    common::init_test_logging();
    let dir = common::create_temp_dir()?;
    write_caption_frames(dir.path())?;

    let validator: Arc<dyn SpellValidator> = Arc::new(DictionarySpellValidator::new(&["hello", "world"]));
    let controller = controller(common::test_config(), misspelled_then_correct(), Some(validator))?;

    let doc = controller.convert_frames(dir.path(), GEOMETRY).await?;

    assert_eq!(doc.entries().len(), 1);
    let entry = &doc.entries()[0];
    assert_eq!(entry.text(), "Hello world");
    assert_eq!(entry.start(), 0.0);
    assert!((entry.end() - 0.2).abs() < 1e-9);
    assert_eq!(doc.styles().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_convertFrames_withoutValidator_shouldKeepFirstSeenReading() -> Result<()> {
    let dir = common::create_temp_dir()?;
    write_caption_frames(dir.path())?;

    let controller = controller(common::test_config(), misspelled_then_correct(), None)?;
    let doc = controller.convert_frames(dir.path(), GEOMETRY).await?;

    assert_eq!(doc.entries().len(), 1);
    assert_eq!(doc.entries()[0].text(), "Hello wrold");
    Ok(())
}

#[tokio::test]
async fn test_convertFrames_withBrokenValidator_shouldFallBackToVoting() -> Result<()> {
    let dir = common::create_temp_dir()?;
    write_caption_frames(dir.path())?;

    let broken = Arc::new(DictionarySpellValidator::broken());
    let shared: Arc<dyn SpellValidator> = broken.clone();
    let controller = controller(common::test_config(), misspelled_then_correct(), Some(shared))?;
    let doc = controller.convert_frames(dir.path(), GEOMETRY).await?;

    assert_eq!(doc.entries().len(), 1);
    assert_eq!(doc.entries()[0].text(), "Hello wrold");
    assert_eq!(broken.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_convertFrames_withTwoRowCaption_shouldStackRows() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let white = Rgb([0xff, 0xff, 0xff]);
    common::write_frame(
        dir.path(),
        0,
        (GEOMETRY.width, GEOMETRY.height),
        &[(upper_box(), white), (caption_box(), white)],
    )?;
    let engine = MockOcrEngine::new().with_frame(
        common::frame_label(0),
        vec![
            LinePrimitive::new(upper_box(), "Where are"),
            LinePrimitive::new(caption_box(), "you going?"),
        ],
    );

    let mut config = common::test_config();
    config.ocr.strategy = ArbitrationStrategy::SinglePass;
    config.reconstruction.terminal_frame_duration = 2.0;
    let controller = controller(config, engine, None)?;
    let doc = controller.convert_frames(dir.path(), GEOMETRY).await?;

    assert_eq!(doc.entries().len(), 1);
    assert_eq!(doc.entries()[0].text(), "Where are\nyou going?");
    assert!((doc.entries()[0].end() - 2.0).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn test_convertFrames_withTextOnly_shouldUseDefaultStyle() -> Result<()> {
    let dir = common::create_temp_dir()?;
    write_caption_frames(dir.path())?;

    let mut config = common::test_config();
    config.output.text_only = true;
    let validator: Arc<dyn SpellValidator> = Arc::new(DictionarySpellValidator::new(&["hello", "world"]));
    let controller = controller(config, misspelled_then_correct(), Some(validator))?;
    let doc = controller.convert_frames(dir.path(), GEOMETRY).await?;

    assert_eq!(doc.entries().len(), 1);
    assert_eq!(doc.entries()[0].style(), "Default");
    assert_eq!(doc.entries()[0].margins(), (0, 0, 0));
    let rendered = doc.render(OutputFormat::Srt)?;
    assert_eq!(rendered, "1\n00:00:00,000 --> 00:00:00,200\nHello world\n\n");
    Ok(())
}

#[tokio::test]
async fn test_convertFrames_withSpellcheckDisabled_shouldNeverCallValidator() -> Result<()> {
    let dir = common::create_temp_dir()?;
    write_caption_frames(dir.path())?;

    let mut config = common::test_config();
    config.ocr.spellcheck = false;
    let validator = Arc::new(DictionarySpellValidator::new(&["hello", "world"]));
    let shared: Arc<dyn SpellValidator> = validator.clone();
    let controller = controller(config, misspelled_then_correct(), Some(shared))?;
    controller.convert_frames(dir.path(), GEOMETRY).await?;

    assert_eq!(validator.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_convertFrames_withEmptyDirectory_shouldEmitEmptyDocument() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let controller = controller(common::test_config(), MockOcrEngine::new(), None)?;

    let doc = controller.convert_frames(dir.path(), GEOMETRY).await?;

    assert!(doc.is_empty());
    let reparsed = SubtitleDocument::parse_format_a(&doc.render(OutputFormat::Ssa)?)?;
    assert!(reparsed.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_convertFrames_shouldDeleteFramesUnlessPreserved() -> Result<()> {
    let dir = common::create_temp_dir()?;
    write_caption_frames(dir.path())?;

    let mut config = common::test_config();
    config.extraction.preserve_work_files = true;
    controller(config, misspelled_then_correct(), None)?
        .convert_frames(dir.path(), GEOMETRY)
        .await?;
    assert!(dir.path().join(common::frame_label(0)).exists());

    controller(common::test_config(), misspelled_then_correct(), None)?
        .convert_frames(dir.path(), GEOMETRY)
        .await?;
    assert!(!dir.path().join(common::frame_label(0)).exists());
    Ok(())
}

#[test]
fn test_emit_withIntegrityViolation_shouldLeaveEmptyFile() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let output = dir.path().join("out.srt");
    fs::write(&output, "stale content")?;

    let mut doc = SubtitleDocument::new(320, 240, "Roboto");
    doc.add_plain_entry(&TextLine::new("fine", 0.0, 1.0));
    let mut consumed = TextLine::new("gone", 1.0, 2.0);
    consumed.consume();
    doc.add_plain_entry(&consumed);

    let controller = Controller::with_config(common::test_config())?;
    let err = controller.emit(&doc, OutputFormat::Srt, Some(&output)).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<SubtitleError>(),
        Some(SubtitleError::IntegrityViolation { index: 1, .. })
    ));
    assert_eq!(fs::read_to_string(&output)?, "");
    Ok(())
}

#[test]
fn test_emit_withValidDocument_shouldWriteFile() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let output = dir.path().join("nested").join("out.ass");

    let mut doc = SubtitleDocument::new(320, 240, "Roboto");
    doc.add_plain_entry(&TextLine::new("fine", 0.0, 1.0));

    Controller::with_config(common::test_config())?.emit(&doc, OutputFormat::Ssa, Some(&output))?;

    let written = fs::read_to_string(&output)?;
    assert!(written.contains("Dialogue: Marked=0,0:00:00.00,0:00:01.00,Default"));
    Ok(())
}

#[tokio::test]
async fn test_run_withMissingEngine_shouldFailBeforeExtraction() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let input = common::create_test_file(dir.path(), "movie.mkv", "not really a movie")?;
    let work_dir = dir.path().join("work");

    let mut config = common::test_config();
    config.ocr.tesseract_path = dir.path().join("no-such-tesseract").to_string_lossy().into_owned();
    config.extraction.work_dir = Some(work_dir.to_string_lossy().into_owned());
    config.extraction.preserve_work_files = true;
    let request = ConversionRequest {
        input,
        stream: 0,
        output: Some(dir.path().join("out.ass")),
        format: None,
    };

    let err = Controller::with_config(config)?.run(&request).await.unwrap_err();

    assert!(err.to_string().contains("not available"));
    assert!(!work_dir.exists());
    assert!(!dir.path().join("out.ass").exists());
    Ok(())
}

#[test]
fn test_controller_withInvalidConfig_shouldRefuseToStart() {
    let mut config = common::test_config();
    config.extraction.frame_rate = -1.0;
    assert!(Controller::with_config(config).is_err());
}
