// THEORY:
// The search collaborator supplies candidate URLs for a product. The engine only
// relies on the `SearchProvider` contract: an ordered list of at most `count`
// image URLs for a free-text query. The Google Custom Search implementation pages
// through results five at a time; a page that fails with a non-200 status ends
// the search early and keeps what was already collected.

use crate::core_modules::candidate::CandidateImage;
use crate::error::CollaboratorError;
use crate::table::ProductRow;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, info};

pub const GOOGLE_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";
pub const DEFAULT_RESULT_COUNT: usize = 10;
const PAGE_SIZE: usize = 5;

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, count: usize) -> Result<Vec<String>, CollaboratorError>;
}

/// `(start, num)` pairs for each page request. `start` is 1-based.
pub fn page_plan(count: usize) -> Vec<(usize, usize)> {
    (0..count)
        .step_by(PAGE_SIZE)
        .map(|offset| (offset + 1, PAGE_SIZE.min(count - offset)))
        .collect()
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    link: Option<String>,
}

pub struct GoogleImageSearch {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    engine_id: String,
}

impl GoogleImageSearch {
    pub fn new(api_key: impl Into<String>, engine_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: GOOGLE_SEARCH_URL.to_string(),
            api_key: api_key.into(),
            engine_id: engine_id.into(),
        }
    }

    pub fn from_credentials(
        api_key: Option<&str>,
        engine_id: Option<&str>,
    ) -> Result<Self, CollaboratorError> {
        let api_key = api_key.ok_or(CollaboratorError::MissingCredentials("GOOGLE_API_KEY"))?;
        let engine_id = engine_id.ok_or(CollaboratorError::MissingCredentials("GOOGLE_CSE_ID"))?;
        Ok(Self::new(api_key, engine_id))
    }
}

#[async_trait]
impl SearchProvider for GoogleImageSearch {
    async fn search(&self, query: &str, count: usize) -> Result<Vec<String>, CollaboratorError> {
        let mut links = Vec::with_capacity(count);

        for (start, num) in page_plan(count) {
            let start = start.to_string();
            let num = num.to_string();
            let response = self
                .client
                .get(&self.base_url)
                .query(&[
                    ("q", query),
                    ("cx", self.engine_id.as_str()),
                    ("key", self.api_key.as_str()),
                    ("searchType", "image"),
                    ("num", num.as_str()),
                    ("start", start.as_str()),
                ])
                .send()
                .await?;

            let status = response.status();
            if status != reqwest::StatusCode::OK {
                error!(query, status = status.as_u16(), "error fetching images");
                break;
            }

            let page: SearchResponse = response
                .json()
                .await
                .map_err(|e| CollaboratorError::Response(e.to_string()))?;
            links.extend(page.items.into_iter().filter_map(|item| item.link));
        }

        links.truncate(count);
        Ok(links)
    }
}

/// Searches every product and flattens the hits into candidate rows, product by product.
pub async fn search_candidates<P: SearchProvider + ?Sized>(
    provider: &P,
    products: &[ProductRow],
    count: usize,
) -> Result<Vec<CandidateImage>, CollaboratorError> {
    let mut candidates = Vec::new();
    for product in products {
        let query = product.query();
        info!(%query, "searching images");
        for url in provider.search(&query, count).await? {
            candidates.push(CandidateImage::new(&product.brand, &product.product_name, url));
        }
    }
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct CannedSearch(HashMap<String, Vec<String>>);

    #[async_trait]
    impl SearchProvider for CannedSearch {
        async fn search(
            &self,
            query: &str,
            count: usize,
        ) -> Result<Vec<String>, CollaboratorError> {
            let mut hits = self.0.get(query).cloned().unwrap_or_default();
            hits.truncate(count);
            Ok(hits)
        }
    }

    #[test]
    fn ten_results_take_two_pages() {
        assert_eq!(page_plan(10), vec![(1, 5), (6, 5)]);
    }

    #[test]
    fn last_page_is_partial() {
        assert_eq!(page_plan(7), vec![(1, 5), (6, 2)]);
        assert_eq!(page_plan(3), vec![(1, 3)]);
        assert!(page_plan(0).is_empty());
    }

    #[test]
    fn items_without_links_are_skipped() {
        let page: SearchResponse = serde_json::from_str(
            r#"{"items": [{"link": "https://a"}, {"title": "no link"}]}"#,
        )
        .unwrap();
        let links: Vec<String> = page.items.into_iter().filter_map(|i| i.link).collect();
        assert_eq!(links, vec!["https://a".to_string()]);

        let empty: SearchResponse =
            serde_json::from_str(r#"{"kind": "customsearch#search"}"#).unwrap();
        assert!(empty.items.is_empty());
    }

    #[test]
    fn missing_credentials_are_reported() {
        let result = GoogleImageSearch::from_credentials(Some("key"), None);
        assert!(matches!(result, Err(CollaboratorError::MissingCredentials("GOOGLE_CSE_ID"))));
    }

    #[tokio::test]
    async fn candidates_follow_product_order() {
        let provider = CannedSearch(HashMap::from([
            ("AcmeCo Widget".to_string(), vec!["w1".to_string(), "w2".to_string()]),
            ("Zeta Bar".to_string(), vec!["z1".to_string()]),
        ]));
        let products = vec![
            ProductRow {
                brand: "Zeta".into(),
                product_name: "Bar".into(),
            },
            ProductRow {
                brand: "AcmeCo".into(),
                product_name: "Widget".into(),
            },
        ];

        let candidates = search_candidates(&provider, &products, 10).await.unwrap();
        assert_eq!(
            candidates,
            vec![
                CandidateImage::new("Zeta", "Bar", "z1"),
                CandidateImage::new("AcmeCo", "Widget", "w1"),
                CandidateImage::new("AcmeCo", "Widget", "w2"),
            ]
        );
    }
}
