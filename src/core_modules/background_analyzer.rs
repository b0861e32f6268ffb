// THEORY:
// The `BackgroundAnalyzer` answers the first and only mandatory question about a
// listing photo: does the product sit on a clean, bright background?
//
// Key steps:
// 1.  **Brightness**: every pixel at or above the brightness threshold is a
//     background candidate.
// 2.  **Edge exclusion**: edges are detected on the luminance image and thickened
//     with a small dilation. Bright pixels near an edge belong to the product's
//     outline or texture, so they are removed from the candidate set. Without this
//     a bright, busy product would register as "bright background".
// 3.  **Scoring**: the share of the frame that is background and the mean
//     brightness of that background combine into a 0-10 score.
//
// The resulting background mask is handed on to the `ObjectSegmenter`, which
// treats everything that is not background as product.

use crate::config::SelectorConfig;
use crate::core_modules::image_ops::image_ops;
use image::{GrayImage, RgbImage};
use tracing::debug;

/// Result of the background check for one image.
#[derive(Debug, Clone)]
pub struct BackgroundAnalysis {
    pub has_usable_background: bool,
    /// 0.0-10.0, the product of coverage and normalised brightness.
    pub background_score: f64,
    /// Share of the frame classified as background (0.0-1.0).
    pub background_percentage: f64,
    /// Mean luminance of the background pixels, 0.0 when there are none.
    pub avg_background_brightness: f64,
    pub background_mask: GrayImage,
}

pub struct BackgroundAnalyzer<'a> {
    config: &'a SelectorConfig,
}

impl<'a> BackgroundAnalyzer<'a> {
    pub fn new(config: &'a SelectorConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, image: &RgbImage) -> BackgroundAnalysis {
        let gray = image_ops::to_grayscale(image);
        self.analyze_gray(&gray)
    }

    pub fn analyze_gray(&self, gray: &GrayImage) -> BackgroundAnalysis {
        let bright_mask = image_ops::threshold(gray, self.config.min_background_brightness);
        let edges = image_ops::detect_edges(
            gray,
            self.config.canny_low_threshold,
            self.config.canny_high_threshold,
        );
        let dilated_edges = image_ops::dilate(&edges, self.config.kernel_radius);
        let background_mask = image_ops::and_not(&bright_mask, &dilated_edges);

        let total_pixels = gray.width() as usize * gray.height() as usize;
        let mut background_pixels = 0usize;
        let mut brightness_sum = 0u64;
        for (mask, luma) in background_mask.pixels().zip(gray.pixels()) {
            if mask.0[0] > 0 {
                background_pixels += 1;
                brightness_sum += luma.0[0] as u64;
            }
        }

        let background_percentage = if total_pixels == 0 {
            0.0
        } else {
            background_pixels as f64 / total_pixels as f64
        };
        let avg_background_brightness = if background_pixels == 0 {
            0.0
        } else {
            brightness_sum as f64 / background_pixels as f64
        };

        let background_score =
            (background_percentage * (avg_background_brightness / 255.0) * 10.0).clamp(0.0, 10.0);
        let has_usable_background = background_percentage > self.config.min_background_percentage
            && avg_background_brightness > self.config.min_background_brightness as f64;

        debug!(
            background_percentage,
            avg_background_brightness,
            background_score,
            has_usable_background,
            "background analysed"
        );

        BackgroundAnalysis {
            has_usable_background,
            background_score,
            background_percentage,
            avg_background_brightness,
            background_mask,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::test_images::product_on_white;
    use image::Rgb;

    #[test]
    fn white_canvas_with_product_is_usable() {
        let config = SelectorConfig::default();
        let analysis = BackgroundAnalyzer::new(&config).analyze(&product_on_white(200, 80));

        assert!(analysis.has_usable_background);
        assert!(analysis.background_percentage > 0.7 && analysis.background_percentage < 0.84);
        assert_eq!(analysis.avg_background_brightness, 255.0);
        assert!((analysis.background_score - analysis.background_percentage * 10.0).abs() < 1e-9);
    }

    #[test]
    fn edges_are_carved_out_of_the_background() {
        let config = SelectorConfig::default();
        let analysis = BackgroundAnalyzer::new(&config).analyze(&product_on_white(200, 80));

        // A white pixel right next to the product border is not background.
        let mask = &analysis.background_mask;
        assert_eq!(mask.get_pixel(59, 100).0[0], 0);
        assert_eq!(mask.get_pixel(5, 5).0[0], 255);
    }

    #[test]
    fn dark_image_has_no_background() {
        let config = SelectorConfig::default();
        let image = RgbImage::from_pixel(64, 64, Rgb([10, 10, 10]));
        let analysis = BackgroundAnalyzer::new(&config).analyze(&image);

        assert!(!analysis.has_usable_background);
        assert_eq!(analysis.background_score, 0.0);
        assert_eq!(analysis.avg_background_brightness, 0.0);
    }

    #[test]
    fn background_exactly_at_threshold_is_not_usable() {
        let config = SelectorConfig::default();
        let image = RgbImage::from_pixel(64, 64, Rgb([180, 180, 180]));
        let analysis = BackgroundAnalyzer::new(&config).analyze(&image);

        assert_eq!(analysis.background_percentage, 1.0);
        assert_eq!(analysis.avg_background_brightness, 180.0);
        assert!(!analysis.has_usable_background);
    }

    #[test]
    fn single_white_pixel_is_a_clean_background() {
        let config = SelectorConfig::default();
        let image = RgbImage::from_pixel(1, 1, Rgb([255, 255, 255]));
        let analysis = BackgroundAnalyzer::new(&config).analyze(&image);

        assert!(analysis.has_usable_background);
        assert_eq!(analysis.background_score, 10.0);
    }

    #[test]
    fn small_background_share_is_not_usable() {
        let config = SelectorConfig::default();
        // The product fills most of the frame, leaving a thin white border.
        let analysis = BackgroundAnalyzer::new(&config).analyze(&product_on_white(100, 90));

        assert!(analysis.background_percentage <= 0.3);
        assert!(!analysis.has_usable_background);
    }

    #[test]
    fn score_stays_within_bounds() {
        let config = SelectorConfig::default();
        let analyzer = BackgroundAnalyzer::new(&config);
        for image in [
            RgbImage::from_pixel(32, 32, Rgb([255, 255, 255])),
            RgbImage::from_pixel(32, 32, Rgb([0, 0, 0])),
            product_on_white(64, 20),
        ] {
            let analysis = analyzer.analyze(&image);
            assert!((0.0..=10.0).contains(&analysis.background_score));
            assert!((0.0..=1.0).contains(&analysis.background_percentage));
        }
    }
}
