use log::debug;

use crate::text_line::{TextLine, retain_active};

// @module: Vertical and temporal merge passes over normalized lines

/// Default stacking tolerance as a fraction of line size
pub const DEFAULT_VERTICAL_MERGE_RATIO: f64 = 0.1;

/// Default maximum gap in seconds between two showings of the same line
pub const DEFAULT_TEMPORAL_MERGE_GAP: f64 = 0.1;

/// Merges stacked rows and repeated showings of the same line
#[derive(Debug, Clone, Copy)]
pub struct LineMerger {
    vertical_ratio: f64,
    temporal_gap: f64,
}

impl Default for LineMerger {
    fn default() -> Self {
        Self::new(DEFAULT_VERTICAL_MERGE_RATIO, DEFAULT_TEMPORAL_MERGE_GAP)
    }
}

/// Number of text rows a line already spans
fn rows(line: &TextLine) -> i32 {
    line.content.lines().count().max(1) as i32
}

impl LineMerger {
    pub fn new(vertical_ratio: f64, temporal_gap: f64) -> Self {
        LineMerger {
            vertical_ratio,
            temporal_gap,
        }
    }

    /// True when `upper` sits directly on top of `lower`
    fn stacked(&self, upper: &TextLine, lower: &TextLine) -> bool {
        let lower_top = lower.margin_vertical + lower.size * rows(lower);
        ((upper.margin_vertical - lower_top).abs() as f64) < lower.size as f64 * self.vertical_ratio
    }

    /// Joins rows shown at the same time into one multi-row line
    ///
    /// The line scanned first keeps the merged text (upper row first), the
    /// lower row's vertical margin and the wider of the two horizontal spans.
    /// Returns the number of rows absorbed.
    pub fn merge_vertical(&self, lines: &mut Vec<TextLine>) -> usize {
        let mut merged = 0;

        for i in 0..lines.len() {
            if lines[i].is_consumed() {
                continue;
            }
            // Rescan after every absorption; the line has grown
            let mut absorbed = true;
            while absorbed {
                absorbed = false;
                for j in (i + 1)..lines.len() {
                    if lines[j].is_consumed() {
                        continue;
                    }
                    let (a, b) = (&lines[i], &lines[j]);
                    if a.start != b.start || a.end != b.end || a.size != b.size || a.color != b.color {
                        continue;
                    }

                    let i_on_top = if self.stacked(a, b) {
                        true
                    } else if self.stacked(b, a) {
                        false
                    } else {
                        continue;
                    };

                    let other = lines[j].clone();
                    let line = &mut lines[i];
                    if i_on_top {
                        line.content = format!("{}\n{}", line.content, other.content);
                        line.margin_vertical = other.margin_vertical;
                    } else {
                        line.content = format!("{}\n{}", other.content, line.content);
                    }
                    line.margin_left = line.margin_left.min(other.margin_left);
                    line.margin_right = line.margin_right.min(other.margin_right);
                    lines[j].consume();

                    merged += 1;
                    absorbed = true;
                    break;
                }
            }
        }

        retain_active(lines);
        merged
    }

    /// Extends a line over later showings of the exact same line
    ///
    /// Lines must be in chronological order. Returns the number of showings
    /// absorbed.
    pub fn merge_temporal(&self, lines: &mut Vec<TextLine>) -> usize {
        let mut merged = 0;

        for i in 0..lines.len() {
            if lines[i].is_consumed() {
                continue;
            }
            for j in (i + 1)..lines.len() {
                if lines[j].is_consumed() {
                    continue;
                }
                let (a, b) = (&lines[i], &lines[j]);
                if b.start > a.end + self.temporal_gap {
                    break;
                }
                if (b.start - a.end).abs() <= self.temporal_gap
                    && a.content == b.content
                    && a.same_placement(b)
                {
                    lines[i].end = lines[j].end;
                    lines[j].consume();
                    merged += 1;
                }
            }
        }

        retain_active(lines);
        merged
    }

    /// Vertical pass, then temporal pass
    pub fn merge(&self, lines: &mut Vec<TextLine>) {
        let before = lines.len();
        let rows = self.merge_vertical(lines);
        let showings = self.merge_temporal(lines);
        debug!(
            "Merged {} line(s) into {} ({} stacked row(s), {} repeated showing(s))",
            before,
            lines.len(),
            rows,
            showings
        );
    }
}
