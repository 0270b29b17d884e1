// HTTP client for the Ollama generate API

mod retry;

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use retry::with_retry;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Anything that can turn a prompt into text. The pipeline stages take
/// this instead of a concrete client so tests can stub generation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct OllamaClient {
    client: Client,
    base_url: String,
    temperature: f32,
}

impl OllamaClient {
    /// `timeout_secs` should be generous; large local models are slow.
    pub fn new(base_url: impl Into<String>, timeout_secs: u64, temperature: f32) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to create HTTP client")?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self {
            client,
            base_url,
            temperature,
        })
    }

    async fn generate_once(&self, model: &str, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        tracing::debug!("sending generate request for model {}", model);

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .context("failed to reach Ollama")?;

        let status = response.status();
        if !status.is_success() {
            // Surface exactly what Ollama said; the body is usually
            // {"error": "..."} but can be plain text.
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.error)
                .unwrap_or_else(|_| body.chars().take(200).collect());
            anyhow::bail!("Ollama request failed ({}): {}", status, detail);
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .context("failed to parse Ollama response")?;

        Ok(generated.response.trim().to_string())
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        with_retry(|| self.generate_once(model, prompt)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = OllamaClient::new(DEFAULT_ENDPOINT, 900, 0.4);
        assert!(client.is_ok());
    }

    #[test]
    fn test_trailing_slash_stripped() {
        let client = OllamaClient::new("http://localhost:11434/", 900, 0.4).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
    }
}
