//! Cliente HTTP bloqueante da API de completions do TextSynth.
//!
//! `POST {base}/v1/engines/{modelo}/completions` com token Bearer. O campo `text` da
//! resposta é uma string quando `n == 1` e uma lista quando `n > 1`.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{CompletionClient, CompletionRequest};
use crate::error::{Error, Result};

pub const DEFAULT_TEXTSYNTH_URL: &str = "https://api.textsynth.com";

#[derive(Serialize)]
struct CompletionBody<'a> {
    prompt: &'a str,
    max_tokens: usize,
    n: usize,
    seed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CompletionText {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
struct CompletionResponse {
    text: CompletionText,
}

pub struct TextSynthClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl TextSynthClient {
    pub fn new(base_url: &str, model: &str, api_key: &str) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(120)).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Lê o token de `TEXTSYNTH_API_KEY`.
    pub fn from_env(base_url: &str, model: &str) -> Result<Self> {
        let key = std::env::var("TEXTSYNTH_API_KEY")
            .map_err(|_| Error::Config("TEXTSYNTH_API_KEY não definida".to_string()))?;
        Self::new(base_url, model, &key)
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl CompletionClient for TextSynthClient {
    fn complete(&self, request: &CompletionRequest) -> Result<Vec<String>> {
        let url = format!("{}/v1/engines/{}/completions", self.base_url, self.model);
        let body = CompletionBody {
            prompt: &request.prompt,
            max_tokens: request.max_tokens,
            n: request.samples,
            seed: request.seed,
            stop: request.stop.as_deref(),
        };
        let response = self.http.post(&url).bearer_auth(&self.api_key).json(&body).send()?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            warn!("TextSynth respondeu {}: {}", status, detail);
            return Err(Error::Llm(format!("status {}: {}", status, detail)));
        }
        let parsed: CompletionResponse = response.json()?;
        let samples = match parsed.text {
            CompletionText::One(text) => vec![text],
            CompletionText::Many(texts) => texts,
        };
        debug!("TextSynth {}: {} amostras", self.model, samples.len());
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_text_string_or_list() {
        let one: CompletionResponse = serde_json::from_str(r#"{"text": "a;b"}"#).unwrap();
        assert!(matches!(one.text, CompletionText::One(ref s) if s == "a;b"));
        let many: CompletionResponse =
            serde_json::from_str(r#"{"text": ["a", "b"], "finished": true}"#).unwrap();
        assert!(matches!(many.text, CompletionText::Many(ref v) if v.len() == 2));
    }

    #[test]
    fn test_body_omits_missing_stop() {
        let body = CompletionBody { prompt: "p", max_tokens: 5, n: 2, seed: 0, stop: None };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("stop").is_none());
        assert_eq!(json["n"], 2);
    }
}
