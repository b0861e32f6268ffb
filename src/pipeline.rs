// THEORY:
// The `pipeline` module is the top-level API of the selection engine. It wires the
// layers together into a single call: candidates in, one winning image per product
// out.
//
// The `SelectionPipeline` is the reference, strictly sequential driver: one
// candidate is fetched and evaluated at a time, and one group is ranked at a time.
// The `ParallelPipeline` produces exactly the same output using a worker pool.

use crate::config::SelectorConfig;
use crate::core_modules::best_image_selector::{BestImageSelector, group_candidates};
use crate::core_modules::image_evaluator::ImageEvaluator;
use crate::core_modules::image_fetcher::ImageSource;
use std::sync::Arc;
use tracing::info;

// Re-export key data structures for the public API.
pub use crate::core_modules::best_image_selector::{CandidateEvaluation, GroupReport, ProductGroup};
pub use crate::core_modules::candidate::{CandidateImage, SelectionResult};
pub use crate::core_modules::image_evaluator::ImageMetrics;

/// The sequential best-image selection engine.
pub struct SelectionPipeline<S: ImageSource> {
    evaluator: ImageEvaluator<S>,
}

impl<S: ImageSource> SelectionPipeline<S> {
    pub fn new(source: S, config: SelectorConfig) -> Self {
        Self {
            evaluator: ImageEvaluator::new(source, Arc::new(config)),
        }
    }

    /// At most one result per product group, in first-appearance order.
    pub async fn select(&self, candidates: &[CandidateImage]) -> Vec<SelectionResult> {
        self.generate_reports(candidates)
            .await
            .iter()
            .filter_map(GroupReport::selection)
            .collect()
    }

    /// One diagnostic report per product group, including groups without a winner.
    pub async fn generate_reports(&self, candidates: &[CandidateImage]) -> Vec<GroupReport> {
        let selector = BestImageSelector::new(self.evaluator.config());
        let mut reports = Vec::new();

        for group in group_candidates(candidates) {
            info!(brand = %group.brand, product = %group.product_name, "processing product");
            let mut evaluations = Vec::with_capacity(group.candidates.len());
            for candidate in &group.candidates {
                let metrics = self.evaluator.evaluate(candidate).await;
                evaluations.push(CandidateEvaluation {
                    url: candidate.url.clone(),
                    metrics,
                });
            }
            reports.push(selector.decide(&group, evaluations));
        }

        reports
    }
}
