/*!
 * Subtitle document model and format emission.
 *
 * - `ssa`: Sub Station Alpha v4 script (event list with a style table)
 * - `srt`: numbered SubRip blocks, text and timing only
 *
 * Entries are appended in presentation order and never changed afterwards.
 * Styles are registered on demand, one per distinct visual signature.
 */

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::errors::SubtitleError;
use crate::text_line::{Rgb, TextLine};

pub mod srt;
pub mod ssa;

/// Name of the style used by text-only entries
pub const DEFAULT_STYLE_NAME: &str = "Default";

/// Font size of the text-only style
pub const DEFAULT_FONT_SIZE: i32 = 24;

/// Resolution used when none is known
pub const DEFAULT_WIDTH: u32 = 720;
pub const DEFAULT_HEIGHT: u32 = 480;

/// Output serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Sub Station Alpha v4 script
    #[default]
    Ssa,
    /// Numbered SubRip list
    Srt,
}

impl OutputFormat {
    /// Format implied by a file extension (`.srt`, `.ssa`, `.ass`)
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        Self::from_name(&extension)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "ssa" | "ass" => Some(OutputFormat::Ssa),
            "srt" => Some(OutputFormat::Srt),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Ssa => "ssa",
            OutputFormat::Srt => "srt",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Visual signature a style is looked up by
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StyleKey {
    pub font: String,
    pub size: i32,
    pub color: Rgb,
    pub bold: bool,
    pub italic: bool,
}

/// One row of the style table
#[derive(Debug, Clone, PartialEq)]
pub struct StyleDefinition {
    pub name: String,
    pub font: String,
    pub size: i32,
    pub primary: Rgb,
    pub secondary: Rgb,
    pub tertiary: Rgb,
    pub back: Rgb,
    pub bold: bool,
    pub italic: bool,
    pub border_style: i32,
    pub outline: i32,
    pub shadow: i32,
    pub alignment: i32,
    pub margin_left: i32,
    pub margin_right: i32,
    pub margin_vertical: i32,
    pub alpha_level: i32,
    pub encoding: i32,
}

impl StyleDefinition {
    /// Style with the stock border, shadow, alignment and margins
    pub fn new(name: impl Into<String>, font: impl Into<String>, size: i32, color: Rgb) -> Self {
        StyleDefinition {
            name: name.into(),
            font: font.into(),
            size,
            primary: color,
            secondary: color,
            tertiary: Rgb::BLACK,
            back: Rgb::BLACK,
            bold: false,
            italic: false,
            border_style: 1,
            outline: 2,
            shadow: 3,
            alignment: 2,
            margin_left: 20,
            margin_right: 20,
            margin_vertical: 20,
            alpha_level: 0,
            encoding: 1,
        }
    }

    pub fn with_emphasis(mut self, bold: bool, italic: bool) -> Self {
        self.bold = bold;
        self.italic = italic;
        self
    }

    pub fn key(&self) -> StyleKey {
        StyleKey {
            font: self.font.clone(),
            size: self.size,
            color: self.primary,
            bold: self.bold,
            italic: self.italic,
        }
    }
}

/// One timed entry of the document
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleEntry {
    text: String,
    start: f64,
    end: f64,
    style: String,
    margin_left: i32,
    margin_right: i32,
    margin_vertical: i32,
}

impl SubtitleEntry {
    pub fn new(text: impl Into<String>, start: f64, end: f64, style: impl Into<String>) -> Self {
        SubtitleEntry {
            text: text.into(),
            start,
            end,
            style: style.into(),
            margin_left: 0,
            margin_right: 0,
            margin_vertical: 0,
        }
    }

    pub fn with_margins(mut self, left: i32, right: i32, vertical: i32) -> Self {
        self.margin_left = left;
        self.margin_right = right;
        self.margin_vertical = vertical;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn style(&self) -> &str {
        &self.style
    }

    pub fn margins(&self) -> (i32, i32, i32) {
        (self.margin_left, self.margin_right, self.margin_vertical)
    }
}

/// Ordered entries plus the style table they refer to
#[derive(Debug, Clone)]
pub struct SubtitleDocument {
    width: u32,
    height: u32,
    font: String,
    entries: Vec<SubtitleEntry>,
    styles: Vec<StyleDefinition>,
    style_names: HashMap<StyleKey, String>,
}

impl SubtitleDocument {
    pub fn new(width: u32, height: u32, font: impl Into<String>) -> Self {
        SubtitleDocument {
            width,
            height,
            font: font.into(),
            entries: Vec::new(),
            styles: Vec::new(),
            style_names: HashMap::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn font(&self) -> &str {
        &self.font
    }

    pub fn entries(&self) -> &[SubtitleEntry] {
        &self.entries
    }

    pub fn styles(&self) -> &[StyleDefinition] {
        &self.styles
    }

    pub fn style(&self, name: &str) -> Option<&StyleDefinition> {
        self.styles.iter().find(|s| s.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registers a style, replacing any style of the same name in place
    pub fn define_style(&mut self, style: StyleDefinition) {
        self.style_names.retain(|_, name| *name != style.name);
        self.style_names.insert(style.key(), style.name.clone());
        match self.styles.iter_mut().find(|s| s.name == style.name) {
            Some(existing) => *existing = style,
            None => self.styles.push(style),
        }
    }

    /// Name of the style for a line's look, registering it on first use
    pub fn style_for(&mut self, line: &TextLine) -> String {
        let key = StyleKey {
            font: self.font.clone(),
            size: line.size,
            color: line.color,
            bold: line.bold,
            italic: line.italic,
        };
        if let Some(name) = self.style_names.get(&key) {
            return name.clone();
        }
        let name = format!("Style{}", self.styles.len());
        let style = StyleDefinition::new(&name, &self.font, line.size, line.color).with_emphasis(line.bold, line.italic);
        self.define_style(style);
        name
    }

    /// Appends a styled, positioned entry for the line
    pub fn add_entry(&mut self, line: &TextLine) {
        let style = self.style_for(line);
        self.entries.push(
            SubtitleEntry::new(&line.content, line.start, line.end, style).with_margins(
                line.margin_left,
                line.margin_right,
                line.margin_vertical,
            ),
        );
    }

    /// Appends a text-only entry using the default style
    pub fn add_plain_entry(&mut self, line: &TextLine) {
        if self.style(DEFAULT_STYLE_NAME).is_none() {
            let style = StyleDefinition::new(DEFAULT_STYLE_NAME, &self.font, DEFAULT_FONT_SIZE, Rgb::WHITE);
            self.define_style(style);
        }
        self.entries
            .push(SubtitleEntry::new(&line.content, line.start, line.end, DEFAULT_STYLE_NAME));
    }

    pub(crate) fn push_entry(&mut self, entry: SubtitleEntry) {
        self.entries.push(entry);
    }

    /// Fails on the first entry still carrying the consumed sentinel
    pub fn check_integrity(&self) -> Result<(), SubtitleError> {
        match self.entries.iter().position(|entry| entry.end < 0.0) {
            Some(index) => Err(SubtitleError::IntegrityViolation {
                index,
                start: self.entries[index].start,
                end: self.entries[index].end,
            }),
            None => Ok(()),
        }
    }

    pub fn render(&self, format: OutputFormat) -> Result<String, SubtitleError> {
        match format {
            OutputFormat::Ssa => self.render_format_a(),
            OutputFormat::Srt => self.render_format_b(),
        }
    }

    /// Sub Station Alpha v4 script
    pub fn render_format_a(&self) -> Result<String, SubtitleError> {
        self.check_integrity()?;
        Ok(ssa::render(self))
    }

    /// Numbered SubRip list
    pub fn render_format_b(&self) -> Result<String, SubtitleError> {
        self.check_integrity()?;
        Ok(srt::render(self))
    }

    pub fn parse_format_a(content: &str) -> Result<Self, SubtitleError> {
        ssa::parse(content)
    }

    pub fn parse_format_b(content: &str) -> Result<Self, SubtitleError> {
        srt::parse(content)
    }
}

/// Whole milliseconds of a render-time timestamp; negatives clamp to zero
pub(crate) fn to_millis(seconds: f64) -> u64 {
    if seconds <= 0.0 {
        0
    } else {
        (seconds * 1000.0).round() as u64
    }
}
