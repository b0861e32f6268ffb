use std::time::Duration;

/// The image host that is skipped unless the caller supplies its own exclusion list.
pub const DEFAULT_EXCLUDED_DOMAIN: &str = "https://images.openfoodfacts.org";

/// Tunable heuristics for the selection engine. The defaults are the values the
/// scoring was calibrated with.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Luminance a pixel needs to count as "bright" background (0-255).
    pub min_background_brightness: u8,
    /// Share of the frame that must be background for the image to be usable.
    pub min_background_percentage: f64,
    /// Lower hysteresis threshold of the edge detector.
    pub canny_low_threshold: f32,
    /// Upper hysteresis threshold of the edge detector.
    pub canny_high_threshold: f32,
    /// Radius of the square structuring element. A radius of 2 is a 5x5 kernel.
    pub kernel_radius: u8,
    /// Candidates whose area is at least `best_area * near_tie_band` go to the weighted tie-break.
    pub near_tie_band: f64,
    pub size_weight: f64,
    pub quality_weight: f64,
    pub background_weight: f64,
    pub sharpness_weight: f64,
    pub resolution_weight: f64,
    /// Laplacian variance that maps to one point of sharpness.
    pub laplacian_variance_per_point: f64,
    /// Pixel count that maps to one point of resolution.
    pub pixels_per_resolution_point: f64,
    /// URL prefixes that are never fetched nor selected.
    pub excluded_domains: Vec<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            min_background_brightness: 180,
            min_background_percentage: 0.3,
            canny_low_threshold: 50.0,
            canny_high_threshold: 150.0,
            kernel_radius: 2,
            near_tie_band: 0.95,
            size_weight: 0.7,
            quality_weight: 0.2,
            background_weight: 0.1,
            sharpness_weight: 0.6,
            resolution_weight: 0.4,
            laplacian_variance_per_point: 100.0,
            pixels_per_resolution_point: 1_000_000.0,
            excluded_domains: vec![DEFAULT_EXCLUDED_DOMAIN.to_string()],
        }
    }
}

impl SelectorConfig {
    pub fn is_excluded(&self, url: &str) -> bool {
        self.excluded_domains
            .iter()
            .any(|prefix| url.starts_with(prefix.as_str()))
    }
}

/// Process-level settings: credentials for the collaborators, logging, and
/// the size of the evaluation worker pool.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub google_api_key: Option<String>,
    pub google_cse_id: Option<String>,
    pub replicate_api_token: Option<String>,
    pub log_level: String,
    pub workers: usize,
    pub fetch_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            google_api_key: None,
            google_cse_id: None,
            replicate_api_token: None,
            log_level: "info".to_string(),
            workers: num_cpus::get(),
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            google_api_key: std::env::var("GOOGLE_API_KEY").ok(),
            google_cse_id: std::env::var("GOOGLE_CSE_ID").ok(),
            replicate_api_token: std::env::var("REPLICATE_API_TOKEN").ok(),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            workers: std::env::var("LISTING_VISION_WORKERS")
                .ok()
                .and_then(|w| w.parse().ok())
                .filter(|w: &usize| *w > 0)
                .unwrap_or(defaults.workers),
            fetch_timeout: std::env::var("LISTING_VISION_FETCH_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_timeout),
        }
    }
}
