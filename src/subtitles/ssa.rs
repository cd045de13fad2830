use std::fmt::Write;

use super::{DEFAULT_HEIGHT, DEFAULT_WIDTH, StyleDefinition, SubtitleDocument, SubtitleEntry, to_millis};
use crate::errors::SubtitleError;
use crate::text_line::Rgb;

// @module: Sub Station Alpha v4 script writer and reader

const STYLE_FORMAT: &str = "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, \
     TertiaryColour, BackColour, Bold, Italic, BorderStyle, Outline, Shadow, Alignment, \
     MarginL, MarginR, MarginV, AlphaLevel, Encoding";

const EVENT_FORMAT: &str = "Format: Marked, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text";

/// Two-character escape for a hard line break inside an event
const LINE_BREAK: &str = "\\N";

/// `H:MM:SS.CC` from seconds
pub fn format_timestamp(seconds: f64) -> String {
    let ms = to_millis(seconds);
    format!(
        "{}:{:02}:{:02}.{:02}",
        ms / 3_600_000,
        (ms % 3_600_000) / 60_000,
        (ms % 60_000) / 1_000,
        (ms % 1_000) / 10
    )
}

/// Seconds from `H:MM:SS.CC`; the fraction is scaled by its digit count
pub fn parse_timestamp(value: &str) -> Option<f64> {
    let mut parts = value.trim().split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let (secs, fraction) = parts.next()?.split_once('.')?;
    if parts.next().is_some() || fraction.is_empty() || fraction.len() > 9 {
        return None;
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let secs: u64 = secs.parse().ok()?;
    let fraction = fraction.parse::<u64>().ok()? as f64 / 10f64.powi(fraction.len() as i32);
    Some((hours * 3600 + minutes * 60 + secs) as f64 + fraction)
}

fn flag(value: bool) -> i32 {
    if value { -1 } else { 0 }
}

fn style_row(style: &StyleDefinition) -> String {
    format!(
        "Style: {},{},{},&H{},&H{},&H{},&H{},{},{},{},{},{},{},{},{},{},{},{}",
        style.name,
        style.font,
        style.size,
        style.primary.to_bgr_hex(),
        style.secondary.to_bgr_hex(),
        style.tertiary.to_bgr_hex(),
        style.back.to_bgr_hex(),
        flag(style.bold),
        flag(style.italic),
        style.border_style,
        style.outline,
        style.shadow,
        style.alignment,
        style.margin_left,
        style.margin_right,
        style.margin_vertical,
        style.alpha_level,
        style.encoding
    )
}

fn event_row(entry: &SubtitleEntry) -> String {
    let (left, right, vertical) = entry.margins();
    format!(
        "Dialogue: Marked=0,{},{},{},,{:04},{:04},{:04},,{}",
        format_timestamp(entry.start()),
        format_timestamp(entry.end()),
        entry.style(),
        left,
        right,
        vertical,
        entry.text().replace('\n', LINE_BREAK)
    )
}

/// Writes the whole script; the caller has checked integrity
pub fn render(doc: &SubtitleDocument) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = writeln!(out, "[Script Info]");
    let _ = writeln!(out, "; Script generated by subconvert {}", env!("CARGO_PKG_VERSION"));
    let _ = writeln!(out, "; Text recovered from subpicture subtitles, check before use");
    let _ = writeln!(out, "ScriptType: v4.00");
    let _ = writeln!(out, "Collisions: Normal");
    let _ = writeln!(out, "PlayResX: {}", doc.width());
    let _ = writeln!(out, "PlayResY: {}", doc.height());
    let _ = writeln!(out, "Timer: 100.0000");
    let _ = writeln!(out);
    let _ = writeln!(out, "[V4 Styles]");
    let _ = writeln!(out, "{}", STYLE_FORMAT);
    for style in doc.styles() {
        let _ = writeln!(out, "{}", style_row(style));
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[Events]");
    let _ = writeln!(out, "{}", EVENT_FORMAT);
    for entry in doc.entries() {
        let _ = writeln!(out, "{}", event_row(entry));
    }
    out
}

#[derive(Debug, PartialEq)]
enum Section {
    Preamble,
    ScriptInfo,
    Styles,
    Events,
    Other,
}

fn parse_number<T: std::str::FromStr>(value: &str, what: &str, line: usize) -> Result<T, SubtitleError> {
    value
        .trim()
        .parse()
        .map_err(|_| SubtitleError::Parse(format!("line {}: invalid {} '{}'", line, what, value.trim())))
}

fn parse_color(value: &str, line: usize) -> Result<Rgb, SubtitleError> {
    Rgb::from_bgr_hex(value).ok_or_else(|| SubtitleError::Parse(format!("line {}: invalid colour '{}'", line, value)))
}

fn parse_style(body: &str, line: usize) -> Result<StyleDefinition, SubtitleError> {
    let fields: Vec<&str> = body.split(',').map(str::trim).collect();
    if fields.len() < 18 {
        return Err(SubtitleError::Parse(format!(
            "line {}: style row has {} fields, expected 18",
            line,
            fields.len()
        )));
    }
    let mut style = StyleDefinition::new(fields[0], fields[1], parse_number(fields[2], "font size", line)?, parse_color(fields[3], line)?);
    style.secondary = parse_color(fields[4], line)?;
    style.tertiary = parse_color(fields[5], line)?;
    style.back = parse_color(fields[6], line)?;
    style.bold = parse_number::<i32>(fields[7], "bold flag", line)? != 0;
    style.italic = parse_number::<i32>(fields[8], "italic flag", line)? != 0;
    style.border_style = parse_number(fields[9], "border style", line)?;
    style.outline = parse_number(fields[10], "outline", line)?;
    style.shadow = parse_number(fields[11], "shadow", line)?;
    style.alignment = parse_number(fields[12], "alignment", line)?;
    style.margin_left = parse_number(fields[13], "margin", line)?;
    style.margin_right = parse_number(fields[14], "margin", line)?;
    style.margin_vertical = parse_number(fields[15], "margin", line)?;
    style.alpha_level = parse_number(fields[16], "alpha level", line)?;
    style.encoding = parse_number(fields[17], "encoding", line)?;
    Ok(style)
}

fn parse_event(body: &str, line: usize) -> Result<SubtitleEntry, SubtitleError> {
    let fields: Vec<&str> = body.splitn(10, ',').collect();
    if fields.len() < 10 {
        return Err(SubtitleError::Parse(format!("line {}: dialogue row has {} fields, expected 10", line, fields.len())));
    }
    let timestamp = |value: &str| {
        parse_timestamp(value).ok_or_else(|| SubtitleError::Parse(format!("line {}: invalid timestamp '{}'", line, value)))
    };
    let text = fields[9].replace("\\N", "\n").replace("\\n", "\n");
    Ok(SubtitleEntry::new(text, timestamp(fields[1])?, timestamp(fields[2])?, fields[3].trim()).with_margins(
        parse_number(fields[5], "margin", line)?,
        parse_number(fields[6], "margin", line)?,
        parse_number(fields[7], "margin", line)?,
    ))
}

/// Reads resolution, style rows and dialogue rows back into a document
pub fn parse(content: &str) -> Result<SubtitleDocument, SubtitleError> {
    let mut section = Section::Preamble;
    let mut width = DEFAULT_WIDTH;
    let mut height = DEFAULT_HEIGHT;
    let mut styles = Vec::new();
    let mut entries = Vec::new();

    for (number, raw) in content.lines().enumerate() {
        let number = number + 1;
        let line = raw.trim_start_matches('\u{feff}').trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            section = match line.to_lowercase().as_str() {
                "[script info]" => Section::ScriptInfo,
                "[v4 styles]" | "[v4+ styles]" => Section::Styles,
                "[events]" => Section::Events,
                _ => Section::Other,
            };
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match (&section, key.trim()) {
            (Section::ScriptInfo, "PlayResX") => width = parse_number(value, "PlayResX", number)?,
            (Section::ScriptInfo, "PlayResY") => height = parse_number(value, "PlayResY", number)?,
            (Section::Styles, "Style") => styles.push(parse_style(value, number)?),
            (Section::Events, "Dialogue") => entries.push(parse_event(value.trim_start(), number)?),
            _ => {}
        }
    }

    if section == Section::Preamble {
        return Err(SubtitleError::Parse("no sections found".to_string()));
    }

    let font = styles
        .first()
        .map(|s: &StyleDefinition| s.font.clone())
        .unwrap_or_default();
    let mut doc = SubtitleDocument::new(width, height, font);
    for style in styles {
        doc.define_style(style);
    }
    for entry in entries {
        doc.push_entry(entry);
    }
    Ok(doc)
}
