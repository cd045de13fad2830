/*!
 * Reading similarity.
 *
 * Decides whether two recognised strings are plausibly the same on-screen
 * text read with a few character errors.
 */

/// Default minimum similarity for two readings of the same line
pub const DEFAULT_READING_SIMILARITY: f64 = 0.6;

/// Similarity test between readings using normalised edit distance
#[derive(Debug, Clone, Copy)]
pub struct ReadingMatcher {
    threshold: f64,
}

impl Default for ReadingMatcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_READING_SIMILARITY,
        }
    }
}

impl ReadingMatcher {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Similarity in 0.0-1.0; case-insensitive, counted in characters
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        let a: Vec<char> = a.trim().to_lowercase().chars().collect();
        let b: Vec<char> = b.trim().to_lowercase().chars().collect();
        if a.is_empty() && b.is_empty() {
            return 1.0;
        }
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        let distance = edit_distance(&a, &b);
        1.0 - distance as f64 / a.len().max(b.len()) as f64
    }

    /// True when both strings are readings of the same text
    pub fn same_reading(&self, a: &str, b: &str) -> bool {
        a == b || self.similarity(a, b) >= self.threshold
    }
}

/// Levenshtein distance over character slices
pub fn edit_distance(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
