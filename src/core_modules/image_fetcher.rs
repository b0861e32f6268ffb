// THEORY:
// The `ImageFetcher` is the engine's only door to the outside world. It turns a
// candidate URL into an RGB pixel matrix or a `FetchError`, and nothing else:
// no retries, no caching across runs. A failed fetch only ever affects the one
// candidate it belongs to.
//
// The door is a trait (`ImageSource`) so the same evaluation code can be driven
// by the HTTP client in production and by an in-memory catalogue in tests.
// Sources only hand back the encoded payload; decoding is pixel work and is left
// to the caller, which runs it off the async executor.

use crate::error::FetchError;
use async_trait::async_trait;
use image::RgbImage;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Anything that can resolve a URL to an encoded image payload.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    /// Fetches and decodes on the calling task.
    async fn fetch(&self, url: &str) -> Result<RgbImage, FetchError> {
        let bytes = self.fetch_bytes(url).await?;
        decode_image(&bytes)
    }
}

/// Decodes any raster format the `image` crate understands into 8-bit RGB.
/// Alpha and palette images are flattened to RGB.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, FetchError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| FetchError::Decode(e.to_string()))?;
    Ok(decoded.to_rgb8())
}

/// Downloads candidate images over HTTP.
pub struct HttpImageSource {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpImageSource {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Network(format!("request timed out after {}s", self.timeout.as_secs()))
            } else {
                FetchError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        debug!(url, size = bytes.len(), "image downloaded");

        Ok(bytes.to_vec())
    }
}

/// A fixed catalogue of URL payloads. Unknown URLs answer 404.
#[derive(Default)]
pub struct InMemoryImageSource {
    payloads: HashMap<String, Result<Vec<u8>, FetchError>>,
}

impl InMemoryImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bytes(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.payloads.insert(url.into(), Ok(bytes));
        self
    }

    pub fn with_failure(mut self, url: impl Into<String>, error: FetchError) -> Self {
        self.payloads.insert(url.into(), Err(error));
        self
    }
}

#[async_trait]
impl ImageSource for InMemoryImageSource {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        match self.payloads.get(url) {
            Some(Ok(bytes)) => Ok(bytes.clone()),
            Some(Err(error)) => Err(error.clone()),
            None => Err(FetchError::Http(404)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::test_images::{png_bytes, product_on_white};
    use image::{Rgba, RgbaImage};

    #[test]
    fn decodes_png_into_rgb() {
        let image = product_on_white(40, 10);
        let decoded = decode_image(&png_bytes(&image)).unwrap();
        assert_eq!(decoded.dimensions(), (40, 40));
        assert_eq!(decoded, image);
    }

    #[test]
    fn alpha_is_dropped() {
        let rgba = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 0]));
        let mut bytes = Vec::new();
        rgba.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let decoded = decode_image(&bytes).unwrap();
        assert_eq!(decoded.get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let result = decode_image(b"<html>not an image</html>");
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[tokio::test]
    async fn sources_hand_back_the_encoded_payload() {
        let payload = png_bytes(&product_on_white(20, 4));
        let source = InMemoryImageSource::new()
            .with_bytes("https://cdn.test/a.png", payload.clone())
            .with_bytes("https://cdn.test/page.html", b"<html></html>".to_vec());

        assert_eq!(source.fetch_bytes("https://cdn.test/a.png").await, Ok(payload));
        // Undecodable payloads only fail once they are decoded.
        assert!(source.fetch_bytes("https://cdn.test/page.html").await.is_ok());
        assert!(matches!(
            source.fetch("https://cdn.test/page.html").await,
            Err(FetchError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn in_memory_source_serves_known_urls() {
        let source = InMemoryImageSource::new()
            .with_bytes("https://cdn.test/a.png", png_bytes(&product_on_white(20, 4)))
            .with_failure("https://cdn.test/b.png", FetchError::Network("reset".into()));

        assert!(source.fetch("https://cdn.test/a.png").await.is_ok());
        assert_eq!(
            source.fetch("https://cdn.test/b.png").await,
            Err(FetchError::Network("reset".into()))
        );
        assert_eq!(source.fetch("https://cdn.test/c.png").await, Err(FetchError::Http(404)));
    }
}
