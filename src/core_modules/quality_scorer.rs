// THEORY:
// The `QualityScorer` rates how crisp and how detailed an image is. Sharpness is
// the variance of the Laplacian response (blurred images have flat second
// derivatives); resolution is the raw pixel count. Both are capped at ten points so
// neither a huge image nor an extremely noisy one can dominate, and sharpness is
// weighted above resolution.

use crate::config::SelectorConfig;
use crate::core_modules::image_ops::image_ops;
use image::GrayImage;

const SCORE_CAP: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityBreakdown {
    pub sharpness_score: f64,
    pub resolution_score: f64,
    pub quality_score: f64,
}

pub struct QualityScorer<'a> {
    config: &'a SelectorConfig,
}

impl<'a> QualityScorer<'a> {
    pub fn new(config: &'a SelectorConfig) -> Self {
        Self { config }
    }

    pub fn score(&self, gray: &GrayImage) -> QualityBreakdown {
        let pixel_count = gray.width() as f64 * gray.height() as f64;
        let resolution_score =
            (pixel_count / self.config.pixels_per_resolution_point).min(SCORE_CAP);
        let variance = image_ops::laplacian_variance(gray);
        let sharpness_score = (variance / self.config.laplacian_variance_per_point).min(SCORE_CAP);
        let quality_score = (self.config.sharpness_weight * sharpness_score
            + self.config.resolution_weight * resolution_score)
            .clamp(0.0, SCORE_CAP);

        QualityBreakdown {
            sharpness_score,
            resolution_score,
            quality_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn flat_image_scores_only_on_resolution() {
        let config = SelectorConfig::default();
        let gray = GrayImage::from_pixel(1000, 500, Luma([255]));
        let breakdown = QualityScorer::new(&config).score(&gray);

        assert_eq!(breakdown.sharpness_score, 0.0);
        assert!((breakdown.resolution_score - 0.5).abs() < 1e-12);
        assert!((breakdown.quality_score - 0.2).abs() < 1e-12);
    }

    #[test]
    fn checkerboard_hits_the_sharpness_cap() {
        let config = SelectorConfig::default();
        let gray =
            GrayImage::from_fn(64, 64, |x, y| Luma([if (x + y) % 2 == 0 { 255 } else { 0 }]));
        let breakdown = QualityScorer::new(&config).score(&gray);

        assert_eq!(breakdown.sharpness_score, 10.0);
        assert!(breakdown.quality_score <= 10.0);
        assert!(breakdown.quality_score >= 6.0);
    }

    #[test]
    fn huge_images_hit_the_resolution_cap() {
        let config = SelectorConfig {
            pixels_per_resolution_point: 100.0,
            ..SelectorConfig::default()
        };
        let gray = GrayImage::from_pixel(100, 100, Luma([0]));
        let breakdown = QualityScorer::new(&config).score(&gray);

        assert_eq!(breakdown.resolution_score, 10.0);
        assert!((breakdown.quality_score - 4.0).abs() < 1e-12);
    }
}
