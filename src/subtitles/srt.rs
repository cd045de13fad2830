use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write;

use super::{DEFAULT_HEIGHT, DEFAULT_STYLE_NAME, DEFAULT_WIDTH, SubtitleDocument, SubtitleEntry, to_millis};
use crate::errors::SubtitleError;

// @module: SubRip writer and reader

// @const: SRT timing line
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2,}):(\d{2}):(\d{2}),(\d{3})\s*-->\s*(\d{2,}):(\d{2}):(\d{2}),(\d{3})").unwrap()
});

/// `HH:MM:SS,mmm` from seconds
pub fn format_timestamp(seconds: f64) -> String {
    let ms = to_millis(seconds);
    format!(
        "{:02}:{:02}:{:02},{:03}",
        ms / 3_600_000,
        (ms % 3_600_000) / 60_000,
        (ms % 60_000) / 1_000,
        ms % 1_000
    )
}

fn captured_seconds(caps: &regex::Captures, first: usize) -> Option<f64> {
    let mut parts = [0u64; 4];
    for (offset, part) in parts.iter_mut().enumerate() {
        *part = caps.get(first + offset)?.as_str().parse().ok()?;
    }
    let [hours, minutes, seconds, millis] = parts;
    if minutes >= 60 || seconds >= 60 {
        return None;
    }
    Some((hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis) as f64 / 1000.0)
}

/// Writes numbered blocks; the caller has checked integrity
pub fn render(doc: &SubtitleDocument) -> String {
    let mut out = String::new();
    for (index, entry) in doc.entries().iter().enumerate() {
        // Writing to a String cannot fail
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_timestamp(entry.start()),
            format_timestamp(entry.end()),
            entry.text()
        );
    }
    out
}

/// Reads numbered blocks back into a document
///
/// Blocks without a valid timing line or without text are skipped with a
/// warning; entries use the default style.
pub fn parse(content: &str) -> Result<SubtitleDocument, SubtitleError> {
    let mut doc = SubtitleDocument::new(DEFAULT_WIDTH, DEFAULT_HEIGHT, String::new());

    let mut sequence: Option<usize> = None;
    let mut timing: Option<(f64, f64)> = None;
    let mut text = String::new();

    let mut finish = |sequence: &mut Option<usize>, timing: &mut Option<(f64, f64)>, text: &mut String| {
        if let (Some(seq), Some((start, end))) = (sequence.take(), timing.take()) {
            if text.trim().is_empty() {
                warn!("Skipping empty subtitle entry {}", seq);
            } else {
                doc.push_entry(SubtitleEntry::new(text.trim(), start, end, DEFAULT_STYLE_NAME));
            }
        } else if !text.is_empty() {
            warn!("Skipping text outside a subtitle block: {:?}", text.trim());
        }
        text.clear();
    };

    for (number, raw) in content.lines().enumerate() {
        let line = raw.trim_start_matches('\u{feff}').trim();

        if line.is_empty() {
            if sequence.is_some() && timing.is_some() && !text.is_empty() {
                finish(&mut sequence, &mut timing, &mut text);
            }
            continue;
        }

        if sequence.is_none() && text.is_empty() {
            if let Ok(seq) = line.parse::<usize>() {
                sequence = Some(seq);
                continue;
            }
        }

        if sequence.is_some() && timing.is_none() {
            if let Some(caps) = TIMESTAMP_REGEX.captures(line) {
                match (captured_seconds(&caps, 1), captured_seconds(&caps, 5)) {
                    (Some(start), Some(end)) => {
                        timing = Some((start, end));
                        continue;
                    }
                    _ => {
                        return Err(SubtitleError::Parse(format!("line {}: invalid timing '{}'", number + 1, line)));
                    }
                }
            }
        }

        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(line);
    }
    finish(&mut sequence, &mut timing, &mut text);

    Ok(doc)
}
