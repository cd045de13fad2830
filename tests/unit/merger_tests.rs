/*!
 * Tests for the vertical and temporal merge passes
 */

use subconvert::merger::LineMerger;
use subconvert::text_line::{Rgb, TextLine};

fn line(text: &str, start: f64, end: f64, margin_vertical: i32) -> TextLine {
    TextLine::new(text, start, end)
        .with_geometry(50, 600, 600, margin_vertical)
        .with_color(Rgb::WHITE)
}

#[test]
fn test_mergeVertical_withRowsWithinTenthOfSize_shouldStack() {
    // upper bottom edge 4px above the lower row's top, tolerance is 5px
    let mut lines = vec![line("How are", 3.0, 4.0, 154), line("you?", 3.0, 4.0, 100)];

    let merged = LineMerger::default().merge_vertical(&mut lines);

    assert_eq!(merged, 1);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].content, "How are\nyou?");
    assert_eq!(lines[0].margin_vertical, 100);
    assert!(lines.iter().all(|l| !l.is_consumed()));
}

#[test]
fn test_mergeVertical_withGapBeyondTolerance_shouldKeepRowsApart() {
    let mut lines = vec![line("How are", 3.0, 4.0, 160), line("you?", 3.0, 4.0, 100)];
    assert_eq!(LineMerger::default().merge_vertical(&mut lines), 0);
    assert_eq!(lines.len(), 2);
}

#[test]
fn test_mergeVertical_withDifferentColors_shouldKeepRowsApart() {
    let mut lines = vec![
        line("Speaker one", 3.0, 4.0, 150),
        line("Speaker two", 3.0, 4.0, 100).with_color(Rgb::new(0xff, 0xff, 0x00)),
    ];
    assert_eq!(LineMerger::default().merge_vertical(&mut lines), 0);
}

#[test]
fn test_mergeVertical_withUnequalWidths_shouldTakeUnionOfBoxes() {
    let mut lines = vec![
        line("A much longer upper row", 3.0, 4.0, 150).with_geometry(50, 400, 420, 150),
        line("short", 3.0, 4.0, 100),
    ];

    LineMerger::default().merge_vertical(&mut lines);

    assert_eq!(lines.len(), 1);
    assert_eq!((lines[0].margin_left, lines[0].margin_right), (400, 420));
}

#[test]
fn test_mergeTemporal_withSmallGap_shouldSpanBothShowings() {
    let mut lines = vec![line("Wait.", 9.0, 10.0, 100), line("Wait.", 10.05, 11.0, 100)];

    let merged = LineMerger::default().merge_temporal(&mut lines);

    assert_eq!(merged, 1);
    assert_eq!(lines.len(), 1);
    assert_eq!((lines[0].start, lines[0].end), (9.0, 11.0));
}

#[test]
fn test_mergeTemporal_withLargeGap_shouldKeepBothShowings() {
    let mut lines = vec![line("Wait.", 9.0, 10.0, 100), line("Wait.", 10.5, 11.0, 100)];
    assert_eq!(LineMerger::default().merge_temporal(&mut lines), 0);
    assert_eq!(lines.len(), 2);
}

#[test]
fn test_mergeTemporal_withDifferentText_shouldKeepBoth() {
    let mut lines = vec![line("Wait.", 9.0, 10.0, 100), line("Stop.", 10.0, 11.0, 100)];
    assert_eq!(LineMerger::default().merge_temporal(&mut lines), 0);
}

#[test]
fn test_merge_withTwoRowCaptionOverFrames_shouldYieldOneEntry() {
    let mut lines = vec![
        line("first row", 0.0, 0.1, 150),
        line("second row", 0.0, 0.1, 100),
        line("first row", 0.1, 0.2, 150),
        line("second row", 0.1, 0.2, 100),
    ];

    LineMerger::default().merge(&mut lines);

    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].content, "first row\nsecond row");
    assert_eq!((lines[0].start, lines[0].end), (0.0, 0.2));
}
