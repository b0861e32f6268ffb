// THEORY:
// The `ImageEvaluator` composes the leaf analyzers into one per-image verdict,
// the `ImageMetrics` record. It is the boundary where failure stops: every way a
// candidate can go wrong (excluded host, network error, bad payload, a panic in
// the analysis) is turned into a well-defined "unusable" record, so the
// selector never needs per-image error handling.
//
// Evaluation order:
// 1.  Excluded domains are rejected before any network traffic.
// 2.  The image is fetched, then decoded on the blocking pool.
// 3.  The background is analysed. An unusable background short-circuits: the
//     segmentation and quality stages are skipped, their fields stay at zero.
// 4.  Otherwise the object is measured and the quality scored.
//
// Decoding and analysis are CPU bound, so both run on tokio's blocking pool rather
// than on the async executor that drives the downloads.

use crate::config::SelectorConfig;
use crate::core_modules::background_analyzer::BackgroundAnalyzer;
use crate::core_modules::candidate::CandidateImage;
use crate::core_modules::image_fetcher::{ImageSource, decode_image};
use crate::core_modules::image_ops::image_ops;
use crate::core_modules::object_segmenter::ObjectSegmenter;
use crate::core_modules::quality_scorer::QualityScorer;
use image::RgbImage;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Everything the selector needs to know about one candidate image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImageMetrics {
    pub has_usable_background: bool,
    pub background_score: f64,
    pub object_area_pixels: u64,
    pub object_percentage: f64,
    pub quality_score: f64,
}

impl ImageMetrics {
    /// The record for a candidate that was never looked at.
    pub const UNUSABLE: ImageMetrics = ImageMetrics {
        has_usable_background: false,
        background_score: 0.0,
        object_area_pixels: 0,
        object_percentage: 0.0,
        quality_score: 0.0,
    };

    fn unusable_with_background(background_score: f64) -> Self {
        Self {
            background_score,
            ..Self::UNUSABLE
        }
    }
}

/// Pure pixel analysis of an already decoded image.
pub fn analyze_image(config: &SelectorConfig, image: &RgbImage) -> ImageMetrics {
    let gray = image_ops::to_grayscale(image);
    let background = BackgroundAnalyzer::new(config).analyze_gray(&gray);
    if !background.has_usable_background {
        return ImageMetrics::unusable_with_background(background.background_score);
    }

    let object = ObjectSegmenter::new(config.kernel_radius).measure(&background.background_mask);
    let quality = QualityScorer::new(config).score(&gray);

    ImageMetrics {
        has_usable_background: true,
        background_score: background.background_score,
        object_area_pixels: object.object_area_pixels,
        object_percentage: object.object_percentage,
        quality_score: quality.quality_score,
    }
}

pub struct ImageEvaluator<S: ImageSource> {
    source: S,
    config: Arc<SelectorConfig>,
}

impl<S: ImageSource> ImageEvaluator<S> {
    pub fn new(source: S, config: Arc<SelectorConfig>) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    pub async fn evaluate(&self, candidate: &CandidateImage) -> ImageMetrics {
        if self.config.is_excluded(&candidate.url) {
            info!(url = %candidate.url, "ignoring image from excluded domain");
            return ImageMetrics::UNUSABLE;
        }

        let bytes = match self.source.fetch_bytes(&candidate.url).await {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(url = %candidate.url, %error, "could not load image");
                return ImageMetrics::UNUSABLE;
            }
        };

        let config = Arc::clone(&self.config);
        let analysis = tokio::task::spawn_blocking(move || {
            decode_image(&bytes).map(|image| analyze_image(&config, &image))
        });
        match analysis.await {
            Ok(Ok(metrics)) => metrics,
            Ok(Err(error)) => {
                warn!(url = %candidate.url, %error, "could not load image");
                ImageMetrics::UNUSABLE
            }
            Err(error) => {
                warn!(url = %candidate.url, %error, "image analysis aborted");
                ImageMetrics::UNUSABLE
            }
        }
    }
}
