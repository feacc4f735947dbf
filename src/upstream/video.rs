/// Proxy to the video emotion-analysis model
use crate::error::{ApiError, ApiResult, UpstreamError};
use std::path::Path;
use std::time::Duration;

/// Uploads video files to the analysis model and returns its JSON verdict
/// (`emotion_summary` and `timeline`) verbatim.
pub struct VideoAnalyzer {
    client: reqwest::Client,
    base_url: String,
}

impl VideoAnalyzer {
    /// Model inference on a full video is slow; the generous timeout is
    /// the original service contract.
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

    pub fn new(base_url: &str) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Upload the file at `path` as multipart form data and return the
    /// model's JSON response.
    pub async fn analyze(&self, path: &Path) -> ApiResult<serde_json::Value> {
        let bytes = tokio::fs::read(path).await?;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name("video.mp4")
            .mime_str("video/mp4")
            .map_err(|e| ApiError::Internal(format!("Failed to build upload: {}", e)))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let url = format!("{}/video/analyze", self.base_url);
        tracing::debug!(%url, "uploading video for analysis");

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(super::classify)?;

        if !response.status().is_success() {
            return Err(UpstreamError::BadResponse(format!(
                "model returned status {}",
                response.status()
            ))
            .into());
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| UpstreamError::BadResponse(format!("invalid JSON body: {}", e)).into())
    }
}
