use image::DynamicImage;
use image::imageops::FilterType;
use log::warn;
use std::sync::Arc;

use super::{EngineMode, LinePrimitive, OcrEngine, OcrRequest, Polarity, RecognitionVariant};

/// Default brightness floor for the fast reject
pub const DEFAULT_BLANK_THRESHOLD: u32 = 32;

/// Wraps single recognition calls on one frame
///
/// Pure translation layer: prepares the frame for the requested variant,
/// calls the engine and maps boxes back to frame coordinates. Any engine
/// failure yields an empty result.
#[derive(Debug, Clone)]
pub struct DetectionAdapter {
    engine: Arc<dyn OcrEngine>,
    blank_threshold: u32,
    upscale_factor: u32,
}

impl DetectionAdapter {
    pub fn new(engine: Arc<dyn OcrEngine>) -> Self {
        DetectionAdapter {
            engine,
            blank_threshold: DEFAULT_BLANK_THRESHOLD,
            upscale_factor: 2,
        }
    }

    pub fn with_blank_threshold(mut self, threshold: u32) -> Self {
        self.blank_threshold = threshold;
        self
    }

    pub fn with_upscale_factor(mut self, factor: u32) -> Self {
        self.upscale_factor = factor.max(1);
        self
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// True when no bright text can plausibly be on the frame
    pub fn is_blank(&self, image: &DynamicImage) -> bool {
        let luma = image.to_luma8();
        let mut pixels = luma.pixels().map(|p| p.0[0]);
        let Some(first) = pixels.next() else {
            return true;
        };
        let (min, max) = pixels.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        (min as u32 + max as u32) < self.blank_threshold
    }

    /// Frame as the engine should see it for the given variant
    pub fn prepare(&self, image: &DynamicImage, variant: RecognitionVariant) -> DynamicImage {
        let mut prepared = match variant.polarity {
            Polarity::Normal => image.clone(),
            Polarity::Inverted => {
                let mut gray = DynamicImage::ImageLuma8(image.to_luma8());
                gray.invert();
                gray
            }
        };
        if variant.engine == EngineMode::Upscaled && self.upscale_factor > 1 {
            prepared = prepared.resize_exact(
                prepared.width() * self.upscale_factor,
                prepared.height() * self.upscale_factor,
                FilterType::CatmullRom,
            );
        }
        prepared
    }

    /// Reads one frame with one variant, never failing
    ///
    /// The blank-frame reject is the caller's job, so it runs once per frame
    /// rather than once per variant.
    pub async fn detect(&self, label: &str, image: &DynamicImage, variant: RecognitionVariant) -> Vec<LinePrimitive> {
        let request = OcrRequest {
            label: label.to_string(),
            image: self.prepare(image, variant),
            variant,
        };

        match self.engine.recognize(request).await {
            Ok(lines) if variant.engine == EngineMode::Upscaled => lines
                .into_iter()
                .map(|line| line.scaled_down(self.upscale_factor))
                .collect(),
            Ok(lines) => lines,
            Err(e) => {
                warn!("{} [{}]: recognition failed: {}", label, variant, e);
                Vec::new()
            }
        }
    }
}
