// THEORY:
// The `candidate` module holds the "dumb" records that flow through the engine.
// A `CandidateImage` comes in from the search step, a `SelectionResult` goes out
// to the results table. Neither knows how it was produced.

use serde::{Deserialize, Serialize};

/// One image URL proposed for a product. Identity is the whole triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateImage {
    pub brand: String,
    pub product_name: String,
    #[serde(rename = "image_url")]
    pub url: String,
}

impl CandidateImage {
    pub fn new(
        brand: impl Into<String>,
        product_name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            brand: brand.into(),
            product_name: product_name.into(),
            url: url.into(),
        }
    }

    /// The key that decides which product group the candidate belongs to.
    pub fn group_key(&self) -> (&str, &str) {
        (&self.brand, &self.product_name)
    }
}

/// The winning image of one product group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub brand: String,
    pub product_name: String,
    #[serde(rename = "image_url")]
    pub chosen_url: String,
}
