/*!
 * Tests for value snapping across frames
 */

use subconvert::normalizer::{ValueNormalizer, snap_colors, snap_values};
use subconvert::text_line::{Rgb, TextLine};

fn detected(size: i32, left: i32, right: i32, vertical: i32, color: Rgb) -> TextLine {
    TextLine::new("line", 0.0, 0.1)
        .with_geometry(size, left, right, vertical)
        .with_color(color)
}

#[test]
fn test_snapValues_withCluster_shouldSnapToMostFrequent() {
    let snapped = snap_values(&[100, 101, 99, 100, 250], 5);
    assert_eq!(snapped, vec![100, 100, 100, 100, 250]);
}

#[test]
fn test_snapValues_withTieInFrequency_shouldPreferSmallerValue() {
    let snapped = snap_values(&[41, 40, 41, 40], 2);
    assert_eq!(snapped, vec![40, 40, 40, 40]);
}

#[test]
fn test_snapValues_twice_shouldBeIdempotent() {
    let values = [10, 14, 18, 22, 26, 30, 10, 31, 55];
    let once = snap_values(&values, 5);
    let twice = snap_values(&once, 5);
    assert_eq!(once, twice);
}

#[test]
fn test_snapColors_withNearbyShades_shouldMergeIntoDominant() {
    let yellow = Rgb::new(0xff, 0xff, 0x00);
    let shade = Rgb::new(0xee, 0xff, 0x11);
    let white = Rgb::WHITE;
    let snapped = snap_colors(&[yellow, yellow, shade, white], 32);
    assert_eq!(snapped, vec![yellow, yellow, yellow, white]);
}

#[test]
fn test_normalize_withJitteringTrack_shouldProduceOnePlacement() {
    let normalizer = ValueNormalizer::new(1080);
    let mut lines = vec![
        detected(60, 700, 700, 80, Rgb::WHITE),
        detected(61, 702, 699, 81, Rgb::WHITE),
        detected(60, 700, 700, 80, Rgb::new(0xee, 0xee, 0xee)),
        detected(59, 698, 701, 79, Rgb::WHITE),
    ];

    normalizer.normalize(&mut lines);

    for line in &lines[1..] {
        assert!(line.same_placement(&lines[0]), "{} differs from {}", line, lines[0]);
    }
    assert_eq!(lines[0].margin_vertical, 80);
    assert_eq!(lines[0].color, Rgb::WHITE);
}

#[test]
fn test_normalize_twice_shouldChangeNothing() {
    let normalizer = ValueNormalizer::new(720);
    let mut lines = vec![
        detected(40, 300, 310, 30, Rgb::WHITE),
        detected(44, 305, 300, 34, Rgb::WHITE),
        detected(80, 100, 100, 400, Rgb::new(0xff, 0xff, 0x00)),
        detected(41, 301, 309, 31, Rgb::WHITE),
    ];

    normalizer.normalize(&mut lines);
    let once = lines.clone();
    normalizer.normalize(&mut lines);

    assert_eq!(lines, once);
}

#[test]
fn test_normalize_withDistantPositions_shouldKeepThemApart() {
    let normalizer = ValueNormalizer::new(1080);
    let mut lines = vec![
        detected(60, 700, 700, 80, Rgb::WHITE),
        detected(60, 700, 700, 900, Rgb::WHITE),
    ];

    normalizer.normalize(&mut lines);

    assert_eq!(lines[0].margin_vertical, 80);
    assert_eq!(lines[1].margin_vertical, 900);
}
