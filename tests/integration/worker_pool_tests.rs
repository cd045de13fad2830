/*!
 * Worker pool tests: ordering, failure isolation and frame file lifecycle
 */

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use subconvert::analysis::FrameProcessor;
use subconvert::file_utils::FileManager;
use subconvert::pool::{FrameFile, FrameWorkerPool};
use subconvert::text_line::TextLine;

use crate::common;

/// Processor that answers slower for earlier frames
#[derive(Debug, Default)]
struct ReversedDelayProcessor {
    total: u64,
    panicking: HashSet<u64>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ReversedDelayProcessor {
    fn new(total: u64) -> Self {
        ReversedDelayProcessor {
            total,
            ..Default::default()
        }
    }

    fn panicking_on(mut self, index: u64) -> Self {
        self.panicking.insert(index);
        self
    }
}

#[async_trait]
impl FrameProcessor for ReversedDelayProcessor {
    async fn process(&self, frame: &FrameFile) -> Vec<TextLine> {
        let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(5 * (self.total - frame.index))).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.panicking.contains(&frame.index) {
            panic!("scripted processor failure on frame {}", frame.index);
        }
        vec![TextLine::new(format!("line {}", frame.index), frame.start, frame.start)]
    }
}

fn frames_in(dir: &Path, count: u64) -> Result<Vec<FrameFile>> {
    for index in 0..count {
        common::create_test_file(dir, &common::frame_label(index), "")?;
    }
    FileManager::list_frames(dir, 10.0)
}

#[tokio::test]
async fn test_run_withOutOfOrderCompletion_shouldKeepFrameOrder() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let frames = frames_in(dir.path(), 8)?;
    let processor = Arc::new(ReversedDelayProcessor::new(8));

    let lines = FrameWorkerPool::new(Some(4))
        .with_preserve_files(true)
        .run(processor.clone(), &frames)
        .await;

    let texts: Vec<String> = lines.iter().map(|l| l.content.clone()).collect();
    let expected: Vec<String> = (0..8).map(|i| format!("line {}", i)).collect();
    assert_eq!(texts, expected);
    assert!(processor.peak.load(Ordering::SeqCst) <= 4);
    Ok(())
}

#[tokio::test]
async fn test_run_shouldEndEachFrameAtTheNextStart() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let frames = frames_in(dir.path(), 3)?;

    let lines = FrameWorkerPool::new(Some(2))
        .with_terminal_duration(1.5)
        .run(Arc::new(ReversedDelayProcessor::new(3)), &frames)
        .await;

    let spans: Vec<(f64, f64)> = lines.iter().map(|l| (l.start, l.end)).collect();
    assert_eq!(spans.len(), 3);
    assert!((spans[0].1 - 0.1).abs() < 1e-9);
    assert!((spans[1].1 - 0.2).abs() < 1e-9);
    assert!((spans[2].1 - 1.7).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn test_run_withPanickingFrame_shouldDropOnlyThatFrame() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let frames = frames_in(dir.path(), 4)?;
    let processor = Arc::new(ReversedDelayProcessor::new(4).panicking_on(2));

    let lines = FrameWorkerPool::new(Some(2)).run(processor, &frames).await;

    let texts: Vec<&str> = lines.iter().map(|l| l.content.as_str()).collect();
    assert_eq!(texts, vec!["line 0", "line 1", "line 3"]);
    Ok(())
}

#[tokio::test]
async fn test_run_shouldRemoveFramesUnlessPreserved() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let frames = frames_in(dir.path(), 3)?;

    FrameWorkerPool::new(Some(2))
        .with_preserve_files(true)
        .run(Arc::new(ReversedDelayProcessor::new(3)), &frames)
        .await;
    assert_eq!(FileManager::list_frames(dir.path(), 10.0)?.len(), 3);

    FrameWorkerPool::new(Some(2))
        .run(Arc::new(ReversedDelayProcessor::new(3)), &frames)
        .await;
    assert!(FileManager::list_frames(dir.path(), 10.0)?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_run_withNoFrames_shouldReturnNothing() {
    let lines = FrameWorkerPool::new(None)
        .run(Arc::new(ReversedDelayProcessor::new(0)), &[])
        .await;
    assert!(lines.is_empty());
}
