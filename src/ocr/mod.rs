/*!
 * Detection adapter around the external recognition engine.
 *
 * - `hocr`: parser for the engine's hOCR output
 * - `tesseract`: subprocess client for the tesseract CLI
 * - `adapter`: per-frame preprocessing, fast reject and fail-soft wrapper
 */

use async_trait::async_trait;
use image::DynamicImage;
use std::fmt::{self, Debug};

use crate::errors::OcrError;

pub mod adapter;
pub mod hocr;
pub mod tesseract;

pub use adapter::DetectionAdapter;
pub use tesseract::TesseractEngine;

/// Pixel-space bounding box, inclusive top-left and exclusive bottom-right
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        BoundingBox { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        (self.x2 - self.x1).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.y2 - self.y1).max(0)
    }

    pub fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }

    /// Intersection over union, 0.0 for disjoint boxes
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);
        if ix2 <= ix1 || iy2 <= iy1 {
            return 0.0;
        }
        let inter = (ix2 - ix1) as f64 * (iy2 - iy1) as f64;
        let union = self.area() as f64 + other.area() as f64 - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }

    /// Maps a box found on an upscaled frame back onto the original frame
    pub fn scaled_down(&self, factor: u32) -> Self {
        let factor = factor.max(1) as i32;
        BoundingBox {
            x1: self.x1 / factor,
            y1: self.y1 / factor,
            x2: (self.x2 + factor - 1) / factor,
            y2: (self.y2 + factor - 1) / factor,
        }
    }
}

/// One recognised word
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub bbox: BoundingBox,
    /// Engine confidence, 0-100
    pub confidence: f32,
    pub italic: bool,
    pub bold: bool,
}

/// One recognised text line, as reported by a single engine call
#[derive(Debug, Clone, PartialEq)]
pub struct LinePrimitive {
    pub bbox: BoundingBox,
    pub text: String,
    pub words: Vec<Word>,
    /// Mean word confidence
    pub confidence: f32,
    /// Every word is italic
    pub italic: bool,
    /// Every word is bold
    pub bold: bool,
    /// At least one word is italic
    pub has_italic: bool,
    /// At least one word is bold
    pub has_bold: bool,
}

impl LinePrimitive {
    /// Builds a plain line with no word breakdown
    pub fn new(bbox: BoundingBox, text: impl Into<String>) -> Self {
        LinePrimitive {
            bbox,
            text: text.into(),
            words: Vec::new(),
            confidence: 100.0,
            italic: false,
            bold: false,
            has_italic: false,
            has_bold: false,
        }
    }

    /// Aggregates word-level results; `None` for a line without words
    pub fn from_words(bbox: BoundingBox, words: Vec<Word>) -> Option<Self> {
        let words: Vec<Word> = words.into_iter().filter(|w| !w.text.is_empty()).collect();
        if words.is_empty() {
            return None;
        }
        let confidence = words.iter().map(|w| w.confidence).sum::<f32>() / words.len() as f32;
        let text = words.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" ");
        Some(LinePrimitive {
            bbox,
            text,
            confidence,
            italic: words.iter().all(|w| w.italic),
            bold: words.iter().all(|w| w.bold),
            has_italic: words.iter().any(|w| w.italic),
            has_bold: words.iter().any(|w| w.bold),
            words,
        })
    }

    pub fn with_style(mut self, italic: bool, bold: bool) -> Self {
        self.italic = italic;
        self.bold = bold;
        self.has_italic = italic;
        self.has_bold = bold;
        self
    }

    /// Same line with its box mapped back from an upscaled frame
    pub fn scaled_down(mut self, factor: u32) -> Self {
        self.bbox = self.bbox.scaled_down(factor);
        for word in &mut self.words {
            word.bbox = word.bbox.scaled_down(factor);
        }
        self
    }
}

impl fmt::Display for LinePrimitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({},{},{},{}; conf {:.2}{}{})",
            self.text,
            self.bbox.x1,
            self.bbox.y1,
            self.bbox.x2,
            self.bbox.y2,
            self.confidence,
            if self.has_italic { " italic" } else { "" },
            if self.has_bold { " bold" } else { "" }
        )
    }
}

/// How the frame is presented to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    /// The frame as decoded
    Normal,
    /// Luma grayscale with inverted intensities
    Inverted,
}

/// Which engine configuration reads the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineMode {
    /// Neural line recogniser
    Lstm,
    /// Legacy character classifier
    Legacy,
    /// Neural recogniser on an upscaled frame
    Upscaled,
}

impl EngineMode {
    /// Engine mode flag passed to the recogniser
    pub fn oem(&self) -> u8 {
        match self {
            EngineMode::Legacy => 0,
            EngineMode::Lstm | EngineMode::Upscaled => 1,
        }
    }
}

/// One engine configuration applied to a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecognitionVariant {
    pub polarity: Polarity,
    pub engine: EngineMode,
}

impl RecognitionVariant {
    pub const PRIMARY: RecognitionVariant = RecognitionVariant {
        polarity: Polarity::Normal,
        engine: EngineMode::Lstm,
    };

    pub const INVERTED: RecognitionVariant = RecognitionVariant {
        polarity: Polarity::Inverted,
        engine: EngineMode::Lstm,
    };

    /// Variants only tried when the first two readings disagree
    pub const EXTENDED: [RecognitionVariant; 4] = [
        RecognitionVariant { polarity: Polarity::Normal, engine: EngineMode::Legacy },
        RecognitionVariant { polarity: Polarity::Inverted, engine: EngineMode::Legacy },
        RecognitionVariant { polarity: Polarity::Normal, engine: EngineMode::Upscaled },
        RecognitionVariant { polarity: Polarity::Inverted, engine: EngineMode::Upscaled },
    ];
}

impl fmt::Display for RecognitionVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{:?}", self.polarity, self.engine)
    }
}

/// A single recognition call
#[derive(Debug, Clone)]
pub struct OcrRequest {
    /// Human-readable frame label, used for logging
    pub label: String,
    /// Frame already prepared for the variant
    pub image: DynamicImage,
    pub variant: RecognitionVariant,
}

/// Common trait for recognition engines
///
/// Implementations are stateless functions of (image, variant).
#[async_trait]
pub trait OcrEngine: Send + Sync + Debug {
    /// Recognise all text lines on the prepared frame
    async fn recognize(&self, request: OcrRequest) -> Result<Vec<LinePrimitive>, OcrError>;

    /// Engine name for logs
    fn name(&self) -> &str;
}
