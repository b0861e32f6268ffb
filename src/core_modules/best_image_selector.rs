// THEORY:
// The `BestImageSelector` is the decision layer. It never looks at pixels; it
// works on the frozen `ImageMetrics` of every candidate in a product group and
// picks at most one winner.
//
// Decision rules, per group:
// 1.  **Mandatory background**: only candidates with a usable background compete.
//     A group without any produces no result at all, never a fallback.
// 2.  **Size first**: the largest object area wins outright when it is a clear
//     leader.
// 3.  **Near-tie band**: candidates within a few percent of the largest area are
//     treated as comparable and ranked by a weighted score of normalised size,
//     quality and background cleanliness. Equal scores go to the candidate that
//     came first in the input, which keeps reruns deterministic.
//
// Grouping preserves first-appearance order so the output table lines up with the
// input table.

use crate::config::SelectorConfig;
use crate::core_modules::candidate::{CandidateImage, SelectionResult};
use crate::core_modules::image_evaluator::ImageMetrics;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

/// All candidates of one `(brand, product_name)`, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductGroup {
    pub brand: String,
    pub product_name: String,
    pub candidates: Vec<CandidateImage>,
}

/// A candidate URL with its computed metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateEvaluation {
    pub url: String,
    pub metrics: ImageMetrics,
}

/// Diagnostic record of how one group was decided.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupReport {
    pub brand: String,
    pub product_name: String,
    pub evaluations: Vec<CandidateEvaluation>,
    pub chosen_url: Option<String>,
}

impl GroupReport {
    pub fn selection(&self) -> Option<SelectionResult> {
        self.chosen_url.as_ref().map(|url| SelectionResult {
            brand: self.brand.clone(),
            product_name: self.product_name.clone(),
            chosen_url: url.clone(),
        })
    }
}

/// Partitions candidates by `(brand, product_name)`, groups ordered by first appearance.
pub fn group_candidates(candidates: &[CandidateImage]) -> Vec<ProductGroup> {
    let mut groups: Vec<ProductGroup> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for candidate in candidates {
        let (brand, product_name) = candidate.group_key();
        let key = (brand.to_string(), product_name.to_string());
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(ProductGroup {
                brand: candidate.brand.clone(),
                product_name: candidate.product_name.clone(),
                candidates: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].candidates.push(candidate.clone());
    }

    groups
}

pub struct BestImageSelector<'a> {
    config: &'a SelectorConfig,
}

impl<'a> BestImageSelector<'a> {
    pub fn new(config: &'a SelectorConfig) -> Self {
        Self { config }
    }

    /// Picks the winning URL among fully evaluated candidates (input order).
    pub fn choose<'e>(
        &self,
        evaluations: &'e [CandidateEvaluation],
    ) -> Option<&'e CandidateEvaluation> {
        let usable: Vec<&CandidateEvaluation> = evaluations
            .iter()
            .filter(|e| e.metrics.has_usable_background)
            .collect();

        let best_area = usable.iter().map(|e| e.metrics.object_area_pixels).max()?;
        let band_floor = best_area as f64 * self.config.near_tie_band;
        let near_best: Vec<&CandidateEvaluation> = usable
            .into_iter()
            .filter(|e| e.metrics.object_area_pixels as f64 >= band_floor)
            .collect();

        if near_best.len() == 1 {
            return near_best.first().copied();
        }

        let mut winner: Option<(&CandidateEvaluation, f64)> = None;
        for evaluation in near_best {
            let score = self.weighted_score(&evaluation.metrics, best_area);
            match winner {
                Some((_, best_score)) if best_score >= score => {}
                _ => winner = Some((evaluation, score)),
            }
        }
        winner.map(|(evaluation, _)| evaluation)
    }

    /// Tie-break score inside the near-tie band.
    pub fn weighted_score(&self, metrics: &ImageMetrics, best_area: u64) -> f64 {
        let norm_size = if best_area == 0 {
            1.0
        } else {
            metrics.object_area_pixels as f64 / best_area as f64
        };
        self.config.size_weight * norm_size
            + self.config.quality_weight * metrics.quality_score / 10.0
            + self.config.background_weight * metrics.background_score / 10.0
    }

    /// Ranks one group and logs the per-candidate score table.
    pub fn decide(
        &self,
        group: &ProductGroup,
        evaluations: Vec<CandidateEvaluation>,
    ) -> GroupReport {
        let chosen_url = self.choose(&evaluations).map(|e| e.url.clone());
        let report = GroupReport {
            brand: group.brand.clone(),
            product_name: group.product_name.clone(),
            evaluations,
            chosen_url,
        };
        log_report(&report);
        report
    }
}

/// Usable candidates by descending area, unusable ones last. Stable, so input
/// order survives among equals.
pub fn diagnostic_order(evaluations: &[CandidateEvaluation]) -> Vec<&CandidateEvaluation> {
    let mut rows: Vec<&CandidateEvaluation> = evaluations.iter().collect();
    rows.sort_by_key(|e| {
        std::cmp::Reverse(if e.metrics.has_usable_background {
            e.metrics.object_area_pixels as i128
        } else {
            -1
        })
    });
    rows
}

fn log_report(report: &GroupReport) {
    info!(brand = %report.brand, product = %report.product_name, "scores for product group");
    for row in diagnostic_order(&report.evaluations) {
        let m = &row.metrics;
        info!(
            "  {}: {} {} (q:{:.2}, {:.1}%, bg:{:.2})",
            row.url,
            if m.has_usable_background { "✓" } else { "✗" },
            m.object_area_pixels,
            m.quality_score,
            m.object_percentage * 100.0,
            m.background_score,
        );
    }
    let (brand, product) = (&report.brand, &report.product_name);
    match &report.chosen_url {
        Some(url) => info!(%brand, %product, %url, "selected best image"),
        None => warn!(%brand, %product, "no suitable image found"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usable(url: &str, area: u64, quality: f64, background: f64) -> CandidateEvaluation {
        CandidateEvaluation {
            url: url.to_string(),
            metrics: ImageMetrics {
                has_usable_background: true,
                background_score: background,
                object_area_pixels: area,
                object_percentage: 0.1,
                quality_score: quality,
            },
        }
    }

    fn unusable(url: &str, background: f64) -> CandidateEvaluation {
        CandidateEvaluation {
            url: url.to_string(),
            metrics: ImageMetrics {
                background_score: background,
                ..ImageMetrics::UNUSABLE
            },
        }
    }

    #[test]
    fn near_tie_goes_to_weighted_score() {
        let config = SelectorConfig::default();
        let selector = BestImageSelector::new(&config);
        let mut u3 = usable("U3", 100, 10.0, 10.0);
        u3.metrics.has_usable_background = false;
        let evaluations = vec![usable("U1", 500, 8.0, 9.0), usable("U2", 480, 9.0, 8.0), u3];

        assert!((selector.weighted_score(&evaluations[0].metrics, 500) - 0.95).abs() < 1e-9);
        assert!((selector.weighted_score(&evaluations[1].metrics, 500) - 0.932).abs() < 1e-9);
        assert_eq!(selector.choose(&evaluations).unwrap().url, "U1");
    }

    #[test]
    fn clear_leader_wins_on_size_alone() {
        let config = SelectorConfig::default();
        let selector = BestImageSelector::new(&config);
        // U2 is far sharper, but outside the near-tie band.
        let evaluations = vec![usable("U2", 300, 10.0, 10.0), usable("U1", 500, 0.0, 3.1)];
        assert_eq!(selector.choose(&evaluations).unwrap().url, "U1");
    }

    #[test]
    fn quality_breaks_a_close_size_race() {
        let config = SelectorConfig::default();
        let selector = BestImageSelector::new(&config);
        let evaluations = vec![
            usable("big-blurry", 1000, 0.5, 8.0),
            usable("crisp", 990, 9.5, 8.0),
        ];
        assert_eq!(selector.choose(&evaluations).unwrap().url, "crisp");
    }

    #[test]
    fn single_usable_candidate_always_wins() {
        let config = SelectorConfig::default();
        let selector = BestImageSelector::new(&config);
        let evaluations = vec![unusable("a", 9.9), usable("b", 1, 0.0, 0.1), unusable("c", 2.0)];
        assert_eq!(selector.choose(&evaluations).unwrap().url, "b");
    }

    #[test]
    fn no_usable_candidate_means_no_winner() {
        let config = SelectorConfig::default();
        let selector = BestImageSelector::new(&config);
        let evaluations = vec![unusable("a", 9.9), unusable("b", 5.0)];
        assert!(selector.choose(&evaluations).is_none());
        assert!(selector.choose(&[]).is_none());
    }

    #[test]
    fn exact_ties_go_to_the_first_candidate() {
        let config = SelectorConfig::default();
        let selector = BestImageSelector::new(&config);
        let evaluations = vec![usable("first", 700, 5.0, 5.0), usable("second", 700, 5.0, 5.0)];
        assert_eq!(selector.choose(&evaluations).unwrap().url, "first");
    }

    #[test]
    fn zero_area_objects_still_compare_on_quality() {
        let config = SelectorConfig::default();
        let selector = BestImageSelector::new(&config);
        let evaluations = vec![usable("plain", 0, 1.0, 9.0), usable("sharp", 0, 6.0, 9.0)];
        assert_eq!(selector.choose(&evaluations).unwrap().url, "sharp");
    }

    #[test]
    fn band_boundary_is_inclusive() {
        let config = SelectorConfig::default();
        let selector = BestImageSelector::new(&config);
        // 475 is exactly 95% of 500, so U2 enters the band and wins on quality.
        let evaluations = vec![usable("U1", 500, 0.0, 0.0), usable("U2", 475, 10.0, 10.0)];
        assert_eq!(selector.choose(&evaluations).unwrap().url, "U2");
    }

    #[test]
    fn grouping_preserves_first_appearance_order() {
        let candidates = vec![
            CandidateImage::new("Zeta", "Bar", "z1"),
            CandidateImage::new("AcmeCo", "Widget", "a1"),
            CandidateImage::new("Zeta", "Bar", "z2"),
            CandidateImage::new("AcmeCo", "Gadget", "g1"),
            CandidateImage::new("AcmeCo", "Widget", "a2"),
        ];
        let groups = group_candidates(&candidates);

        let keys: Vec<(&str, &str)> = groups
            .iter()
            .map(|g| (g.brand.as_str(), g.product_name.as_str()))
            .collect();
        assert_eq!(keys, vec![("Zeta", "Bar"), ("AcmeCo", "Widget"), ("AcmeCo", "Gadget")]);
        let urls: Vec<&str> = groups[1].candidates.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["a1", "a2"]);
    }

    #[test]
    fn diagnostic_rows_put_usable_first_by_area() {
        let evaluations = vec![
            unusable("x", 1.0),
            usable("small", 10, 1.0, 1.0),
            usable("big", 90, 1.0, 1.0),
        ];
        let order: Vec<&str> = diagnostic_order(&evaluations)
            .iter()
            .map(|e| e.url.as_str())
            .collect();
        assert_eq!(order, vec!["big", "small", "x"]);
    }

    #[test]
    fn decide_builds_a_selection() {
        let config = SelectorConfig::default();
        let group = ProductGroup {
            brand: "AcmeCo".into(),
            product_name: "Widget".into(),
            candidates: Vec::new(),
        };
        let report =
            BestImageSelector::new(&config).decide(&group, vec![usable("only", 5, 1.0, 1.0)]);
        assert_eq!(
            report.selection(),
            Some(SelectionResult {
                brand: "AcmeCo".into(),
                product_name: "Widget".into(),
                chosen_url: "only".into(),
            })
        );
    }
}
