use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct QueryRequest<'a> {
    question: &'a str,
}

/// Successful response from the QA service. A body without `answer` is a
/// decode error and therefore a failed round trip; a missing `sources`
/// field is simply an answer with no citations.
#[derive(Debug, Clone, Deserialize)]
pub struct Answer {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Seam between the conversation controller and the QA backend, so tests
/// can script responses without a network.
#[async_trait]
pub trait QaService: Send + Sync {
    async fn ask(&self, question: &str) -> Result<Answer>;
}

#[derive(Clone)]
pub struct QaClient {
    client: Client,
    base_url: String,
}

impl QaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl QaService for QaClient {
    async fn ask(&self, question: &str) -> Result<Answer> {
        let url = format!("{}/query", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&QueryRequest { question })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "QA service request failed with status: {}",
                response.status()
            ));
        }

        let answer: Answer = response.json().await?;
        Ok(answer)
    }
}
