/*!
 * Per-frame analysis: recognition variants, alignment and arbitration.
 *
 * One unit of work of the frame worker pool. Turns a frame image into the
 * text lines visible on it, with geometry and colour measured on the frame.
 */

use async_trait::async_trait;
use futures::future::join_all;
use image::DynamicImage;
use log::{debug, warn};
use std::path::Path;
use std::sync::Arc;

use crate::consensus::{ArbitrationStrategy, ConsensusArbiter, normalize_reading};
use crate::ocr::{BoundingBox, DetectionAdapter, LinePrimitive, RecognitionVariant};
use crate::pool::FrameFile;
use crate::text_line::{FrameGeometry, Rgb, TextLine};

/// Minimum overlap for two detections to count as the same line
pub const ALIGNMENT_IOU: f64 = 0.5;

/// Default glyph height to line size ratio
pub const DEFAULT_GLYPH_HEIGHT_RATIO: f64 = 0.75;

/// One unit of frame work, run concurrently by the worker pool
#[async_trait]
pub trait FrameProcessor: Send + Sync {
    /// Lines found on the frame, with `start` set and `end` left equal to it
    async fn process(&self, frame: &FrameFile) -> Vec<TextLine>;
}

/// Reads a frame with the variants of the configured strategy
#[derive(Debug, Clone)]
pub struct FrameAnalyzer {
    adapter: DetectionAdapter,
    arbiter: Arc<ConsensusArbiter>,
    strategy: ArbitrationStrategy,
    glyph_height_ratio: f64,
}

impl FrameAnalyzer {
    pub fn new(adapter: DetectionAdapter, arbiter: Arc<ConsensusArbiter>, strategy: ArbitrationStrategy) -> Self {
        FrameAnalyzer {
            adapter,
            arbiter,
            strategy,
            glyph_height_ratio: DEFAULT_GLYPH_HEIGHT_RATIO,
        }
    }

    pub fn with_glyph_height_ratio(mut self, ratio: f64) -> Self {
        self.glyph_height_ratio = ratio;
        self
    }

    pub fn strategy(&self) -> ArbitrationStrategy {
        self.strategy
    }

    /// Analyses an already decoded frame
    pub async fn analyze_image(&self, label: &str, image: &DynamicImage, start: f64) -> Vec<TextLine> {
        // Fast reject runs once per frame, before any variant is prepared
        if self.adapter.is_blank(image) {
            debug!("{}: blank frame, skipping recognition", label);
            return Vec::new();
        }

        let readings = self.read_variants(label, image).await;
        let Some(anchor) = readings.iter().position(|lines| !lines.is_empty()) else {
            return Vec::new();
        };

        let aligned = align_readings(&readings, anchor);
        let texts = if aligned.iter().all(|candidates| candidates.len() == 1) {
            aligned
                .iter()
                .map(|candidates| normalize_reading(&candidates[0]))
                .collect()
        } else {
            self.arbiter.arbitrate_many(&aligned).await
        };

        let geometry = FrameGeometry {
            width: image.width(),
            height: image.height(),
        };
        let rgb = image.to_rgb8();

        readings[anchor]
            .iter()
            .zip(texts)
            .filter(|(_, text)| !text.is_empty())
            .map(|(primitive, text)| {
                let color = line_color(&rgb, &primitive.bbox);
                let mut line = TextLine::from_detection(primitive, color, geometry, self.glyph_height_ratio, start);
                line.content = text;
                line
            })
            .collect()
    }

    /// Runs the variants the strategy calls for, in escalation order
    async fn read_variants(&self, label: &str, image: &DynamicImage) -> Vec<Vec<LinePrimitive>> {
        if self.strategy == ArbitrationStrategy::SinglePass {
            return vec![self.adapter.detect(label, image, RecognitionVariant::PRIMARY).await];
        }

        let (normal, inverted) = tokio::join!(
            self.adapter.detect(label, image, RecognitionVariant::PRIMARY),
            self.adapter.detect(label, image, RecognitionVariant::INVERTED)
        );
        let mut readings = vec![normal, inverted];

        if readings_agree(&readings[0], &readings[1]) {
            readings.truncate(1);
            return readings;
        }

        if self.strategy == ArbitrationStrategy::MultiEngine {
            debug!("{}: polarity readings disagree, escalating", label);
            let extended = join_all(
                RecognitionVariant::EXTENDED
                    .iter()
                    .map(|variant| self.adapter.detect(label, image, *variant)),
            )
            .await;
            readings.extend(extended);
        }

        readings
    }
}

#[async_trait]
impl FrameProcessor for FrameAnalyzer {
    async fn process(&self, frame: &FrameFile) -> Vec<TextLine> {
        let label = frame.label();
        match load_frame(&frame.path).await {
            Ok(image) => self.analyze_image(&label, &image, frame.start).await,
            Err(e) => {
                warn!("{}: cannot load frame: {}", label, e);
                Vec::new()
            }
        }
    }
}

/// Decodes a frame image off the async runtime
pub async fn load_frame(path: &Path) -> anyhow::Result<DynamicImage> {
    let path = path.to_path_buf();
    let image = tokio::task::spawn_blocking(move || image::open(&path)).await??;
    Ok(image)
}

/// True when both variants read the same lines with the same text
fn readings_agree(a: &[LinePrimitive], b: &[LinePrimitive]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| normalize_reading(&x.text) == normalize_reading(&y.text))
}

/// For every line of the anchor variant, the texts every variant read there
///
/// A variant contributes the line with the largest overlap, if it reaches
/// `ALIGNMENT_IOU`. Lines no anchor line matches are dropped.
pub fn align_readings(readings: &[Vec<LinePrimitive>], anchor: usize) -> Vec<Vec<String>> {
    readings[anchor]
        .iter()
        .map(|anchor_line| {
            let mut texts = vec![anchor_line.text.clone()];
            for (variant, lines) in readings.iter().enumerate() {
                if variant == anchor {
                    continue;
                }
                let best = lines
                    .iter()
                    .map(|line| (line, line.bbox.iou(&anchor_line.bbox)))
                    .filter(|(_, iou)| *iou >= ALIGNMENT_IOU)
                    .max_by(|a, b| a.1.total_cmp(&b.1));
                if let Some((line, _)) = best {
                    texts.push(line.text.clone());
                }
            }
            texts
        })
        .collect()
}

/// Brightest value of each channel inside the box, flattened
pub fn line_color(image: &image::RgbImage, bbox: &BoundingBox) -> Rgb {
    let x1 = bbox.x1.clamp(0, image.width() as i32) as u32;
    let y1 = bbox.y1.clamp(0, image.height() as i32) as u32;
    let x2 = bbox.x2.clamp(0, image.width() as i32) as u32;
    let y2 = bbox.y2.clamp(0, image.height() as i32) as u32;
    if x2 <= x1 || y2 <= y1 {
        return Rgb::WHITE;
    }

    let mut brightest = Rgb::BLACK;
    for y in y1..y2 {
        for x in x1..x2 {
            let [r, g, b] = image.get_pixel(x, y).0;
            brightest.r = brightest.r.max(r);
            brightest.g = brightest.g.max(g);
            brightest.b = brightest.b.max(b);
        }
    }
    brightest.flattened()
}
