/*!
 * Consensus arbitration between noisy readings of the same text.
 *
 * - `similarity`: edit-distance test deciding whether two readings belong together
 * - `spelling`: spelling collaborator trait and the hunspell implementation
 * - `groups`: cross-frame line groups arbitrated as one
 */

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub mod groups;
pub mod similarity;
pub mod spelling;

pub use groups::reconcile_line_groups;
pub use similarity::ReadingMatcher;
pub use spelling::{HunspellValidator, RankedLine, SpellValidator};

/// Which set of recognition variants a frame is read with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArbitrationStrategy {
    /// One reading per frame, no arbitration
    SinglePass,
    /// Normal and inverted readings, arbitrated when they disagree
    DualPolarity,
    /// Dual polarity, escalating to every engine mode on disagreement
    #[default]
    MultiEngine,
}

/// Cleans up one raw reading before it is compared or voted on
///
/// Trims, reads a leading bar or slash before a space as the pronoun `I`
/// and folds typographic quotes to ASCII.
pub fn normalize_reading(text: &str) -> String {
    let mut cleaned = text.trim().replace("| ", "I ").replace("/ ", "I ");
    if cleaned == "|" || cleaned == "/" {
        cleaned = "I".to_string();
    }
    cleaned
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => '"',
            other => other,
        })
        .collect()
}

/// Ranks the candidates of every word position by frequency
///
/// Readings are split on whitespace. Only readings with the most common word
/// count take part, so that a split or joined word cannot shift every later
/// position. Within a position, ties keep first-seen order.
pub fn rank_positions(readings: &[String]) -> RankedLine {
    let tokenized: Vec<Vec<&str>> = readings
        .iter()
        .map(|r| r.split_whitespace().collect::<Vec<_>>())
        .filter(|words| !words.is_empty())
        .collect();

    let Some(word_count) = modal(tokenized.iter().map(Vec::len)) else {
        return Vec::new();
    };

    (0..word_count)
        .map(|position| {
            let mut counts: Vec<(&str, usize)> = Vec::new();
            for words in tokenized.iter().filter(|w| w.len() == word_count) {
                let word = words[position];
                match counts.iter_mut().find(|(seen, _)| *seen == word) {
                    Some((_, count)) => *count += 1,
                    None => counts.push((word, 1)),
                }
            }
            // Stable sort keeps first-seen order among equal counts
            counts.sort_by(|a, b| b.1.cmp(&a.1));
            counts.into_iter().map(|(word, _)| word.to_string()).collect()
        })
        .collect()
}

/// Most frequent value, ties resolved by first occurrence
fn modal<T: PartialEq + Copy>(values: impl Iterator<Item = T>) -> Option<T> {
    let mut counts: Vec<(T, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }
    let best = counts.iter().map(|(_, c)| *c).max()?;
    counts.into_iter().find(|(_, c)| *c == best).map(|(v, _)| v)
}

/// Picks one word per position, preferring validated candidates
fn assemble(ranked: &RankedLine, validity: Option<&Vec<Vec<bool>>>) -> String {
    ranked
        .iter()
        .enumerate()
        .filter_map(|(position, candidates)| {
            let flags = validity.and_then(|v| v.get(position));
            let chosen = flags
                .and_then(|flags| {
                    candidates
                        .iter()
                        .zip(flags.iter())
                        .find(|(_, valid)| **valid)
                        .map(|(word, _)| word)
                })
                .or_else(|| candidates.first());
            chosen.map(String::as_str)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves several readings of the same line into one
///
/// Frequency voting per word position, refined by an optional spelling
/// validator. Without a validator, or when it fails, the most frequent
/// candidate wins at every position.
#[derive(Debug, Default)]
pub struct ConsensusArbiter {
    validator: Option<Arc<dyn SpellValidator>>,
    degraded: AtomicBool,
}

impl ConsensusArbiter {
    pub fn new(validator: Option<Arc<dyn SpellValidator>>) -> Self {
        ConsensusArbiter {
            validator,
            degraded: AtomicBool::new(false),
        }
    }

    pub fn has_validator(&self) -> bool {
        self.validator.is_some()
    }

    /// Frequency vote only, never calls the validator
    pub fn majority(&self, readings: &[String]) -> String {
        let normalized: Vec<String> = readings.iter().map(|r| normalize_reading(r)).collect();
        if let Some(agreed) = unanimous(&normalized) {
            return agreed;
        }
        assemble(&rank_positions(&normalized), None)
    }

    /// Arbitrates a single set of readings
    pub async fn arbitrate(&self, readings: &[String]) -> String {
        self.arbitrate_many(&[readings.to_vec()])
            .await
            .pop()
            .unwrap_or_default()
    }

    /// Arbitrates many independent sets with at most one validator call
    pub async fn arbitrate_many(&self, groups: &[Vec<String>]) -> Vec<String> {
        let mut results: Vec<Option<String>> = Vec::with_capacity(groups.len());
        let mut pending: Vec<(usize, RankedLine)> = Vec::new();

        for (index, readings) in groups.iter().enumerate() {
            let normalized: Vec<String> = readings.iter().map(|r| normalize_reading(r)).collect();
            match unanimous(&normalized) {
                Some(agreed) => results.push(Some(agreed)),
                None => {
                    results.push(None);
                    pending.push((index, rank_positions(&normalized)));
                }
            }
        }

        if pending.is_empty() {
            return results.into_iter().map(Option::unwrap_or_default).collect();
        }

        let ranked: Vec<RankedLine> = pending.iter().map(|(_, r)| r.clone()).collect();
        let validity = self.validate(&ranked).await;

        for (slot, (index, ranked_line)) in pending.iter().enumerate() {
            let flags = validity.as_ref().and_then(|v| v.get(slot));
            let text = assemble(ranked_line, flags);
            debug!("Arbitrated {:?} -> {:?}", groups[*index], text);
            results[*index] = Some(text);
        }

        results.into_iter().map(Option::unwrap_or_default).collect()
    }

    async fn validate(&self, ranked: &[RankedLine]) -> Option<Vec<Vec<Vec<bool>>>> {
        let validator = self.validator.as_ref()?;
        match validator.validate(ranked).await {
            Ok(flags) => Some(flags),
            Err(e) => {
                if !self.degraded.swap(true, Ordering::Relaxed) {
                    warn!("Spelling validation failed, falling back to majority voting: {}", e);
                }
                None
            }
        }
    }
}

/// The common reading when all non-empty readings agree
fn unanimous(readings: &[String]) -> Option<String> {
    let mut non_empty = readings.iter().filter(|r| !r.is_empty());
    let Some(first) = non_empty.next() else {
        return Some(String::new());
    };
    non_empty.all(|r| r == first).then(|| first.clone())
}
