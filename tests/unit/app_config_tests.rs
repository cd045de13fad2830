/*!
 * Tests for application configuration functionality
 */

use anyhow::Result;

use subconvert::app_config::{Config, LogLevel};
use subconvert::consensus::ArbitrationStrategy;
use subconvert::errors::ConfigError;

use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.ocr.language, "en");
    assert_eq!(config.ocr.strategy, ArbitrationStrategy::MultiEngine);
    assert_eq!(config.ocr.blank_threshold, 32);
    assert_eq!(config.ocr.upscale_factor, 2);
    assert!(config.ocr.spellcheck);
    assert_eq!(config.extraction.frame_rate, 10.0);
    assert!(config.extraction.sync_frames);
    assert!(!config.extraction.preserve_work_files);
    assert_eq!(config.reconstruction.size_tolerance_fraction, 0.008);
    assert_eq!(config.reconstruction.color_tolerance, 32);
    assert_eq!(config.reconstruction.vertical_merge_ratio, 0.1);
    assert_eq!(config.reconstruction.temporal_merge_gap, 0.1);
    assert_eq!(config.reconstruction.terminal_frame_duration, 5.0);
    assert_eq!(config.reconstruction.glyph_height_ratio, 0.75);
    assert_eq!(config.output.font_name, "Roboto");
    assert!(!config.output.text_only);
    assert!(config.show_progress);
    assert_eq!(config.workers, None);
    assert_eq!(config.log_level, LogLevel::Info);
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.ocr.language = "xx".to_string();
    assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    config.ocr.language = "fre".to_string();
    assert!(config.validate().is_ok());

    config.extraction.frame_rate = 0.0;
    assert!(config.validate().is_err());
    config.extraction.frame_rate = 25.0;

    config.reconstruction.size_tolerance_fraction = 1.5;
    assert!(config.validate().is_err());
    config.reconstruction.size_tolerance_fraction = 0.01;

    config.workers = Some(0);
    assert!(config.validate().is_err());
    config.workers = Some(4);

    config.extraction.start_time = 120.0;
    config.extraction.end_time = 60.0;
    assert!(config.validate().is_err());
    config.extraction.end_time = 0.0;

    assert!(config.validate().is_ok());
}

#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("subconvert.json");

    let config = Config::load_or_create(&path)?;

    assert!(path.exists());
    assert_eq!(config.output.font_name, "Roboto");
    let reloaded = Config::load_or_create(&path)?;
    assert_eq!(reloaded.extraction.frame_rate, config.extraction.frame_rate);
    Ok(())
}

#[test]
fn test_loadOrCreate_withPartialFile_shouldFillDefaults() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        dir.path(),
        "partial.json",
        r#"{ "ocr": { "language": "de", "strategy": "dual_polarity" }, "log_level": "debug", "workers": 3 }"#,
    )?;

    let config = Config::load_or_create(&path)?;

    assert_eq!(config.ocr.language, "de");
    assert_eq!(config.ocr.strategy, ArbitrationStrategy::DualPolarity);
    assert_eq!(config.ocr.tesseract_path, "tesseract");
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.workers, Some(3));
    assert_eq!(config.reconstruction.reading_similarity, 0.6);
    Ok(())
}

#[test]
fn test_loadOrCreate_withMalformedFile_shouldFail() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = common::create_test_file(dir.path(), "broken.json", "{ not json")?;
    assert!(Config::load_or_create(&path).is_err());
    Ok(())
}
