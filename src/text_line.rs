use std::fmt;

use crate::ocr::{BoundingBox, LinePrimitive};

// @module: Working unit of the reconstruction pipeline

/// 8-bit RGB colour of a detected line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb { r: 0xff, g: 0xff, b: 0xff };
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Packs the colour as 0xRRGGBB, used for deterministic ordering
    pub fn packed(&self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// True when every channel is within `tolerance` of the other colour
    pub fn within(&self, other: &Rgb, tolerance: u8) -> bool {
        self.r.abs_diff(other.r) <= tolerance
            && self.g.abs_diff(other.g) <= tolerance
            && self.b.abs_diff(other.b) <= tolerance
    }

    /// Six uppercase hex digits in blue-green-red order
    pub fn to_bgr_hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.b, self.g, self.r)
    }

    /// Parses six hex digits in blue-green-red order, with or without `&H`
    pub fn from_bgr_hex(value: &str) -> Option<Self> {
        let digits = value.trim().trim_start_matches("&H").trim_start_matches("&h");
        let digits = digits.trim_end_matches('&');
        if digits.len() < 6 || !digits.is_ascii() {
            return None;
        }
        // Alpha-prefixed values (&HAABBGGRR) keep their low six digits
        let digits = &digits[digits.len() - 6..];
        let bgr = u32::from_str_radix(digits, 16).ok()?;
        Some(Rgb {
            b: ((bgr >> 16) & 0xff) as u8,
            g: ((bgr >> 8) & 0xff) as u8,
            r: (bgr & 0xff) as u8,
        })
    }

    /// Collapses anti-aliasing noise by replicating the high nibble
    pub fn flattened(&self) -> Self {
        fn flatten(c: u8) -> u8 {
            (c & 0xf0) | (c >> 4)
        }
        Rgb {
            r: flatten(self.r),
            g: flatten(self.g),
            b: flatten(self.b),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Whether a line still takes part in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineState {
    #[default]
    Active,
    /// Merged into another line; must never reach the document
    Consumed,
}

/// Sentinel timestamp carried by consumed lines
pub const CONSUMED_TIME: f64 = -1.0;

/// Output resolution the lines are measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
}

/// One detected subtitle line, mutated in place by the normalizer and merger
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    /// Start time in seconds
    pub start: f64,

    /// End time in seconds; negative once consumed
    pub end: f64,

    /// Line text; rows of a multi-row entry are joined with `\n`
    pub content: String,

    /// Glyph height in output pixels
    pub size: i32,

    pub margin_left: i32,
    pub margin_right: i32,
    pub margin_vertical: i32,

    pub color: Rgb,
    pub italic: bool,
    pub bold: bool,

    pub state: LineState,
}

impl TextLine {
    /// Creates an active line with no geometry, used by text-only output and tests
    pub fn new(content: impl Into<String>, start: f64, end: f64) -> Self {
        TextLine {
            start,
            end,
            content: content.into(),
            size: 0,
            margin_left: 0,
            margin_right: 0,
            margin_vertical: 0,
            color: Rgb::WHITE,
            italic: false,
            bold: false,
            state: LineState::Active,
        }
    }

    /// Builds a line from one detection on a frame
    ///
    /// The horizontal span is recentred so that both margins describe the same
    /// box: the smaller side margin is removed from both edges.
    pub fn from_detection(
        primitive: &LinePrimitive,
        color: Rgb,
        frame: FrameGeometry,
        glyph_height_ratio: f64,
        start: f64,
    ) -> Self {
        let BoundingBox { x1, y1, x2, y2 } = primitive.bbox;
        let width = frame.width as i32;
        let height = frame.height as i32;

        let reduce = x1.min(width - x2).max(0);
        let left = x1 - reduce;
        let right = x2 + reduce;

        let glyph_height = (y2 - y1).max(0) as f64;
        TextLine {
            start,
            end: start,
            content: primitive.text.clone(),
            size: (glyph_height / glyph_height_ratio).round() as i32,
            margin_left: left,
            margin_right: width - right,
            margin_vertical: height - y2,
            color,
            italic: primitive.italic,
            bold: primitive.bold,
            state: LineState::Active,
        }
    }

    pub fn with_geometry(mut self, size: i32, margin_left: i32, margin_right: i32, margin_vertical: i32) -> Self {
        self.size = size;
        self.margin_left = margin_left;
        self.margin_right = margin_right;
        self.margin_vertical = margin_vertical;
        self
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    /// Marks the line as merged into another one
    pub fn consume(&mut self) {
        self.state = LineState::Consumed;
        self.start = CONSUMED_TIME;
        self.end = CONSUMED_TIME;
    }

    pub fn is_consumed(&self) -> bool {
        self.state == LineState::Consumed || self.end < 0.0
    }

    /// Drops all size, position and colour information
    pub fn strip_geometry(&mut self) {
        self.size = 0;
        self.margin_left = 0;
        self.margin_right = 0;
        self.margin_vertical = 0;
        self.color = Rgb::WHITE;
        self.italic = false;
        self.bold = false;
    }

    /// True when size, colour and all three margins match
    pub fn same_placement(&self, other: &TextLine) -> bool {
        self.size == other.size
            && self.color == other.color
            && self.margin_left == other.margin_left
            && self.margin_right == other.margin_right
            && self.margin_vertical == other.margin_vertical
    }
}

impl fmt::Display for TextLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.2}-{:.2}] {:?} size={} margins=({},{},{}) color={}",
            self.start,
            self.end,
            self.content,
            self.size,
            self.margin_left,
            self.margin_right,
            self.margin_vertical,
            self.color
        )
    }
}

/// Removes consumed lines, keeping the order of the rest
pub fn retain_active(lines: &mut Vec<TextLine>) {
    lines.retain(|line| !line.is_consumed());
}
