use log::{debug, info};
use std::sync::Arc;

use crate::app_config::ReconstructionConfig;
use crate::consensus::{ConsensusArbiter, ReadingMatcher, reconcile_line_groups};
use crate::merger::LineMerger;
use crate::normalizer::ValueNormalizer;
use crate::subtitles::SubtitleDocument;
use crate::text_line::{FrameGeometry, TextLine};

// @module: Turns the collected per-frame lines into a subtitle document

/// Post-collection stages: normalize, reconcile, merge, emit
#[derive(Debug, Clone)]
pub struct ReconstructionPipeline {
    settings: ReconstructionConfig,
    arbiter: Arc<ConsensusArbiter>,
    font: String,
    text_only: bool,
}

impl ReconstructionPipeline {
    pub fn new(settings: ReconstructionConfig, arbiter: Arc<ConsensusArbiter>, font: impl Into<String>) -> Self {
        ReconstructionPipeline {
            settings,
            arbiter,
            font: font.into(),
            text_only: false,
        }
    }

    /// Drops size, position and colour before the temporal merge
    pub fn with_text_only(mut self, text_only: bool) -> Self {
        self.text_only = text_only;
        self
    }

    fn merger(&self) -> LineMerger {
        LineMerger::new(self.settings.vertical_merge_ratio, self.settings.temporal_merge_gap)
    }

    /// Runs every stage up to (not including) document emission
    pub async fn reconstruct(&self, mut lines: Vec<TextLine>, geometry: FrameGeometry) -> Vec<TextLine> {
        let collected = lines.len();

        ValueNormalizer::with_tolerances(
            geometry.height,
            self.settings.size_tolerance_fraction,
            self.settings.color_tolerance,
        )
        .with_glyph_height_ratio(self.settings.glyph_height_ratio)
        .normalize(&mut lines);

        let matcher = ReadingMatcher::new(self.settings.reading_similarity);
        let reconciled =
            reconcile_line_groups(&mut lines, &self.arbiter, &matcher, self.settings.temporal_merge_gap).await;
        if reconciled > 0 {
            debug!("Cross-frame arbitration rewrote {} line(s)", reconciled);
        }

        let merger = self.merger();
        merger.merge_vertical(&mut lines);
        if self.text_only {
            lines.iter_mut().for_each(TextLine::strip_geometry);
        }
        merger.merge_temporal(&mut lines);

        info!("Reconstructed {} subtitle line(s) from {} detection(s)", lines.len(), collected);
        lines
    }

    /// Appends lines to a fresh document sized like the frames
    pub fn build_document(&self, lines: &[TextLine], geometry: FrameGeometry) -> SubtitleDocument {
        let mut doc = SubtitleDocument::new(geometry.width, geometry.height, self.font.as_str());
        for line in lines {
            if self.text_only {
                doc.add_plain_entry(line);
            } else {
                doc.add_entry(line);
            }
        }
        doc
    }

    pub async fn run(&self, lines: Vec<TextLine>, geometry: FrameGeometry) -> SubtitleDocument {
        let lines = self.reconstruct(lines, geometry).await;
        self.build_document(&lines, geometry)
    }
}
