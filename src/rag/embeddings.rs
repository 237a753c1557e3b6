use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::EmbeddingServiceError;

/// Client for an OpenAI-compatible embeddings endpoint.
pub struct EmbeddingClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl EmbeddingClient {
    pub fn new(client: Client, base_url: &str, api_key: String, model: String) -> Self {
        Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            api_key,
            model,
        }
    }

    /// Converts `text` into its embedding vector.
    ///
    /// An empty string is forwarded unchanged; whether it embeds is the
    /// service's call, not a local rejection. Retry policy belongs to the
    /// caller.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingServiceError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(EmbeddingServiceError::Api { status, body });
        }

        let parsed: EmbeddingResponse = response.json().await?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|entry| entry.embedding)
            .ok_or(EmbeddingServiceError::EmptyResponse)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_parses_first_vector() {
        let parsed: EmbeddingResponse = serde_json::from_str(
            r#"{"data":[{"embedding":[0.1,0.2,0.3],"index":0}],"model":"text-embedding-ada-002"}"#,
        )
        .unwrap();
        assert_eq!(parsed.data[0].embedding, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn empty_data_is_detectable() {
        let parsed: EmbeddingResponse = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert!(parsed.data.is_empty());
    }
}
