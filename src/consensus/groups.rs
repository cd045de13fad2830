use log::debug;

use super::{ConsensusArbiter, ReadingMatcher};
use crate::text_line::TextLine;

/// Collects indices of lines that show the same caption across frames
///
/// Members share size, colour and margins, follow each other within `gap`
/// seconds and read similarly to the first member. Lines must be in
/// chronological order.
pub fn line_groups(lines: &[TextLine], matcher: &ReadingMatcher, gap: f64) -> Vec<Vec<usize>> {
    let mut assigned = vec![false; lines.len()];
    let mut groups = Vec::new();

    for i in 0..lines.len() {
        if assigned[i] || lines[i].is_consumed() {
            continue;
        }
        assigned[i] = true;
        let mut group = vec![i];
        let mut last_end = lines[i].end;

        for j in (i + 1)..lines.len() {
            let candidate = &lines[j];
            if candidate.start > last_end + gap {
                break;
            }
            if assigned[j] || candidate.is_consumed() {
                continue;
            }
            if (candidate.start - last_end).abs() <= gap
                && candidate.same_placement(&lines[i])
                && matcher.same_reading(&lines[i].content, &candidate.content)
            {
                assigned[j] = true;
                last_end = candidate.end;
                group.push(j);
            }
        }

        groups.push(group);
    }

    groups
}

/// Gives every member of a line group the arbitrated reading of the group
///
/// Groups where all members already agree are left alone. Returns the number
/// of lines whose text changed.
pub async fn reconcile_line_groups(
    lines: &mut [TextLine],
    arbiter: &ConsensusArbiter,
    matcher: &ReadingMatcher,
    gap: f64,
) -> usize {
    let disputed: Vec<Vec<usize>> = line_groups(lines, matcher, gap)
        .into_iter()
        .filter(|group| group.iter().any(|&i| lines[i].content != lines[group[0]].content))
        .collect();

    if disputed.is_empty() {
        return 0;
    }

    let readings: Vec<Vec<String>> = disputed
        .iter()
        .map(|group| group.iter().map(|&i| lines[i].content.clone()).collect())
        .collect();
    let resolved = arbiter.arbitrate_many(&readings).await;

    let mut changed = 0;
    for (group, text) in disputed.iter().zip(resolved) {
        debug!("Line group of {} reconciled to {:?}", group.len(), text);
        for &i in group {
            if lines[i].content != text {
                lines[i].content = text.clone();
                changed += 1;
            }
        }
    }
    changed
}
