/*!
 * Value normalizer.
 *
 * Collapses jittery per-frame measurements (size, margins, colour) into the
 * few canonical values a track actually uses. Runs once over the whole
 * track, before any merging.
 */

use log::debug;
use std::collections::HashMap;
use std::hash::Hash;

use crate::text_line::{Rgb, TextLine};

/// Default size/margin tolerance as a fraction of frame height
pub const DEFAULT_SIZE_TOLERANCE_FRACTION: f64 = 0.008;

/// Default per-channel colour tolerance
pub const DEFAULT_COLOR_TOLERANCE: u8 = 32;

/// Maps every observed value to its canonical value
///
/// Candidates are visited by descending frequency, ties by ascending
/// `order_key`. A candidate close to an earlier leader joins that leader,
/// otherwise it becomes a leader itself. Leaders end up pairwise farther
/// apart than the tolerance, so applying the mapping twice changes nothing.
pub fn canonical_map<T, K, F>(values: &[T], order_key: K, close: F) -> HashMap<T, T>
where
    T: Copy + Eq + Hash,
    K: Fn(&T) -> i64,
    F: Fn(&T, &T) -> bool,
{
    let mut counts: HashMap<T, usize> = HashMap::new();
    for value in values {
        *counts.entry(*value).or_insert(0) += 1;
    }

    let mut candidates: Vec<(T, usize)> = counts.into_iter().collect();
    candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| order_key(&a.0).cmp(&order_key(&b.0))));

    let mut leaders: Vec<T> = Vec::new();
    let mut mapping = HashMap::with_capacity(candidates.len());
    for (candidate, _) in candidates {
        match leaders.iter().find(|leader| close(leader, &candidate)) {
            Some(leader) => {
                mapping.insert(candidate, *leader);
            }
            None => {
                leaders.push(candidate);
                mapping.insert(candidate, candidate);
            }
        }
    }
    mapping
}

/// Snaps integers to their canonical values within `tolerance`
pub fn snap_values(values: &[i32], tolerance: i32) -> Vec<i32> {
    let mapping = canonical_map(values, |v| *v as i64, |a, b| (a - b).abs() <= tolerance);
    values.iter().map(|v| mapping.get(v).copied().unwrap_or(*v)).collect()
}

/// Snaps colours to their canonical values within a per-channel tolerance
pub fn snap_colors(values: &[Rgb], tolerance: u8) -> Vec<Rgb> {
    let mapping = canonical_map(values, |c| c.packed() as i64, |a, b| a.within(b, tolerance));
    values.iter().map(|c| mapping.get(c).copied().unwrap_or(*c)).collect()
}

/// Global normalization pass over a track's lines
#[derive(Debug, Clone, Copy)]
pub struct ValueNormalizer {
    /// Size and margin tolerance in pixels
    tolerance: i32,
    color_tolerance: u8,
    glyph_height_ratio: f64,
}

impl ValueNormalizer {
    /// Normalizer for a frame of `height` pixels with default tolerances
    pub fn new(height: u32) -> Self {
        Self::with_tolerances(height, DEFAULT_SIZE_TOLERANCE_FRACTION, DEFAULT_COLOR_TOLERANCE)
    }

    pub fn with_tolerances(height: u32, size_fraction: f64, color_tolerance: u8) -> Self {
        ValueNormalizer {
            tolerance: (height as f64 * size_fraction).round() as i32,
            color_tolerance,
            glyph_height_ratio: crate::analysis::DEFAULT_GLYPH_HEIGHT_RATIO,
        }
    }

    pub fn with_glyph_height_ratio(mut self, ratio: f64) -> Self {
        self.glyph_height_ratio = ratio;
        self
    }

    pub fn tolerance(&self) -> i32 {
        self.tolerance
    }

    /// Snaps size, margins and colour of every active line in place
    ///
    /// The vertical margin goes first; moving it shifts the line's bottom
    /// edge, so the size is compensated to keep the top edge where it was
    /// before sizes are clustered.
    pub fn normalize(&self, lines: &mut [TextLine]) {
        let active: Vec<usize> = (0..lines.len()).filter(|&i| !lines[i].is_consumed()).collect();
        if active.is_empty() {
            return;
        }

        let verticals = snap_values(&collect(lines, &active, |l| l.margin_vertical), self.tolerance);
        for (&i, vertical) in active.iter().zip(verticals) {
            let delta = vertical - lines[i].margin_vertical;
            if delta != 0 {
                lines[i].size += (-(delta as f64) / self.glyph_height_ratio).round() as i32;
                lines[i].margin_vertical = vertical;
            }
        }

        let sizes = snap_values(&collect(lines, &active, |l| l.size), self.tolerance);
        let lefts = snap_values(&collect(lines, &active, |l| l.margin_left), self.tolerance);
        let rights = snap_values(&collect(lines, &active, |l| l.margin_right), self.tolerance);
        let colors = snap_colors(&collect(lines, &active, |l| l.color), self.color_tolerance);

        for (slot, &i) in active.iter().enumerate() {
            let line = &mut lines[i];
            line.size = sizes[slot];
            line.margin_left = lefts[slot];
            line.margin_right = rights[slot];
            line.color = colors[slot];
        }

        debug!(
            "Normalized {} line(s): {} size(s), {} vertical margin(s), {} colour(s)",
            active.len(),
            distinct(collect(lines, &active, |l| l.size)),
            distinct(collect(lines, &active, |l| l.margin_vertical)),
            distinct(collect(lines, &active, |l| l.color.packed() as i32)),
        );
    }
}

fn collect<T>(lines: &[TextLine], active: &[usize], field: impl Fn(&TextLine) -> T) -> Vec<T> {
    active.iter().map(|&i| field(&lines[i])).collect()
}

fn distinct(mut values: Vec<i32>) -> usize {
    values.sort_unstable();
    values.dedup();
    values.len()
}
