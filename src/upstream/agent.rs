/// Proxy to the conversational agent service
use crate::error::{ApiError, ApiResult, UpstreamError};
use serde_json::{json, Value};
use std::time::Duration;

/// Forwards chat and analysis requests to the agent service and returns
/// its JSON responses verbatim.
pub struct AgentClient {
    client: reqwest::Client,
    base_url: String,
}

impl AgentClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

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

    /// Forward a chat message together with the caller's identity and
    /// the patient's emotion data.
    pub async fn send_message(
        &self,
        message: &str,
        therapist_id: i64,
        patient_id: i64,
        emotion_data: Option<&Value>,
    ) -> ApiResult<Value> {
        let payload = json!({
            "message": message,
            "therapist_id": therapist_id,
            "patient_id": patient_id,
            "emotion_data": emotion_data,
        });

        let url = format!("{}/api/agent/chat", self.base_url);
        tracing::debug!(%url, therapist_id, patient_id, "forwarding chat message");

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(super::classify)?;

        Self::read_json(response).await
    }

    /// Fetch chat history for a patient, optionally limited to sessions
    pub async fn chat_history(
        &self,
        patient_id: i64,
        session_ids: &[i64],
    ) -> ApiResult<Value> {
        let url = format!("{}/chat/{}", self.base_url, patient_id);

        let query: Vec<(&str, String)> = session_ids
            .iter()
            .map(|id| ("session_ids", id.to_string()))
            .collect();

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(super::classify)?;

        Self::read_json(response).await
    }

    /// Request recommendations for a patient's emotion data
    pub async fn analyze_patient(
        &self,
        patient_id: i64,
        emotion_data: &Value,
    ) -> ApiResult<Value> {
        let url = format!("{}/analyze/{}", self.base_url, patient_id);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "emotion_data": emotion_data }))
            .send()
            .await
            .map_err(super::classify)?;

        Self::read_json(response).await
    }

    async fn read_json(response: reqwest::Response) -> ApiResult<Value> {
        if !response.status().is_success() {
            return Err(UpstreamError::BadResponse(format!(
                "agent returned status {}",
                response.status()
            ))
            .into());
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| UpstreamError::BadResponse(format!("invalid JSON body: {}", e)).into())
    }
}
