// THEORY:
// Background removal runs once per product, on the image the selector chose. It is
// delegated to a hosted segmentation model on Replicate: a prediction is created
// for the image URL, polled until it settles, and its output (a transparent PNG)
// is downloaded. No retries: a failed prediction is reported and the listing keeps
// the original image URL.

use crate::core_modules::candidate::SelectionResult;
use crate::core_modules::utils::image_helper::image_helper;
use crate::error::CollaboratorError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const REPLICATE_PREDICTIONS_URL: &str = "https://api.replicate.com/v1/predictions";
pub const BACKGROUND_REMOVER_VERSION: &str =
    "a029dff38972b5fda4ec5d75d7d1cd25aeff621d2cf4946a41055d7db66b80bc";
const POLL_INTERVAL: Duration = Duration::from_secs(1);
const MAX_POLLS: u32 = 120;

#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    /// Returns the processed image bytes for the image at `image_url`.
    async fn remove_background(&self, image_url: &str) -> Result<Vec<u8>, CollaboratorError>;
}

#[derive(Serialize)]
struct PredictionRequest<'a> {
    version: &'a str,
    input: RemoverInput<'a>,
}

#[derive(Serialize)]
struct RemoverInput<'a> {
    image: &'a str,
    format: &'a str,
    reverse: bool,
    threshold: u8,
    background_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: String,
    #[serde(default)]
    output: Value,
    #[serde(default)]
    urls: PredictionUrls,
}

#[derive(Debug, Default, Deserialize)]
struct PredictionUrls {
    get: Option<String>,
}

impl Prediction {
    fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "succeeded" | "failed" | "canceled")
    }

    /// The model answers with a single URL; some versions wrap it in a list.
    fn output_url(&self) -> Option<&str> {
        match &self.output {
            Value::String(url) => Some(url),
            Value::Array(items) => items.first().and_then(Value::as_str),
            _ => None,
        }
    }
}

pub struct ReplicateBackgroundRemover {
    client: reqwest::Client,
    api_token: String,
}

impl ReplicateBackgroundRemover {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_token: api_token.into(),
        }
    }

    pub fn from_token(api_token: Option<&str>) -> Result<Self, CollaboratorError> {
        api_token
            .map(Self::new)
            .ok_or(CollaboratorError::MissingCredentials("REPLICATE_API_TOKEN"))
    }

    async fn read_prediction(response: reqwest::Response) -> Result<Prediction, CollaboratorError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json()
            .await
            .map_err(|e| CollaboratorError::Response(e.to_string()))
    }

    async fn create_prediction(&self, image_url: &str) -> Result<Prediction, CollaboratorError> {
        let body = PredictionRequest {
            version: BACKGROUND_REMOVER_VERSION,
            input: RemoverInput {
                image: image_url,
                format: "png",
                reverse: false,
                threshold: 0,
                background_type: "rgba",
            },
        };
        let response = self
            .client
            .post(REPLICATE_PREDICTIONS_URL)
            .bearer_auth(&self.api_token)
            .header("Prefer", "wait")
            .json(&body)
            .send()
            .await?;
        Self::read_prediction(response).await
    }

    async fn wait_for(&self, mut prediction: Prediction) -> Result<Prediction, CollaboratorError> {
        let mut polls = 0;
        while !prediction.is_terminal() {
            if polls >= MAX_POLLS {
                return Err(CollaboratorError::Prediction {
                    id: prediction.id,
                    status: format!("{} after {} polls", prediction.status, polls),
                });
            }
            let Some(get_url) = prediction.urls.get.clone() else {
                return Err(CollaboratorError::Response(format!(
                    "prediction {} has no polling URL",
                    prediction.id
                )));
            };
            tokio::time::sleep(POLL_INTERVAL).await;
            let response = self.client.get(&get_url).bearer_auth(&self.api_token).send().await?;
            prediction = Self::read_prediction(response).await?;
            polls += 1;
            debug!(id = %prediction.id, status = %prediction.status, "prediction polled");
        }
        Ok(prediction)
    }
}

#[async_trait]
impl BackgroundRemover for ReplicateBackgroundRemover {
    async fn remove_background(&self, image_url: &str) -> Result<Vec<u8>, CollaboratorError> {
        let prediction = self.create_prediction(image_url).await?;
        let prediction = self.wait_for(prediction).await?;

        if prediction.status != "succeeded" {
            return Err(CollaboratorError::Prediction {
                id: prediction.id,
                status: prediction.status,
            });
        }
        let output_url = prediction.output_url().ok_or_else(|| {
            CollaboratorError::Response(format!("prediction {} has no output", prediction.id))
        })?;

        let response = self.client.get(output_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Status {
                status: status.as_u16(),
                body: format!("failed to download processed image from {output_url}"),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Removes the background of the selected image and stores it as
/// `{output_dir}/{brand}_{product_name}.png`.
pub async fn process_selection<R: BackgroundRemover + ?Sized>(
    remover: &R,
    selection: &SelectionResult,
    output_dir: &Path,
) -> Result<PathBuf, CollaboratorError> {
    let bytes = remover.remove_background(&selection.chosen_url).await?;
    let path = image_helper::processed_path(output_dir, &selection.brand, &selection.product_name);
    image_helper::save_png(&path, &bytes)?;
    info!(path = %path.display(), "background removed image saved");
    Ok(path)
}
