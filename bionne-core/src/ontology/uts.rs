//! Cliente HTTP bloqueante da UMLS Terminology Services (UTS).
//!
//! Três endpoints são usados:
//!
//! - `GET /search/current?string=…&pageSize=…` → conceitos ranqueados (CUI + nome)
//! - `GET /content/current/CUI/{cui}` → tipos semânticos do conceito
//! - `GET {uri do tipo semântico}` → tree number do tipo
//!
//! Cada requisição é repetida até `max_attempts` vezes quando falha ou o corpo não é JSON válido.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ConceptHit, OntologyService, SemanticTypeRef};
use crate::error::{Error, Result};

pub const DEFAULT_UTS_URL: &str = "https://uts-ws.nlm.nih.gov";

#[derive(Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Deserialize)]
struct SearchResult {
    #[serde(default)]
    results: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    ui: String,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConceptResult {
    #[serde(default)]
    semantic_types: Vec<SemanticTypeItem>,
}

#[derive(Deserialize)]
struct SemanticTypeItem {
    name: String,
    uri: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SemanticTypeResult {
    tree_number: String,
}

/// Cliente UTS com repetição limitada.
pub struct UtsClient {
    http: Client,
    base_url: String,
    api_key: String,
    max_attempts: usize,
    retry_delay: Duration,
}

impl UtsClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            max_attempts: 5,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Lê a chave de `UMLS_API_KEY`.
    pub fn from_env(base_url: &str) -> Result<Self> {
        let key = std::env::var("UMLS_API_KEY")
            .map_err(|_| Error::Config("UMLS_API_KEY não definida".to_string()))?;
        Self::new(base_url, &key)
    }

    pub fn with_retry(mut self, max_attempts: usize, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        let mut last_error = Error::Ontology(format!("nenhuma tentativa para {}", url));
        for attempt in 1..=self.max_attempts {
            let outcome = self
                .http
                .get(url)
                .query(&[("apiKey", self.api_key.as_str())])
                .query(query)
                .send()
                .and_then(|rsp| rsp.error_for_status())
                .and_then(|rsp| rsp.json::<T>());
            match outcome {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!("Requisição UTS falhou ({}/{}) {}: {}", attempt, self.max_attempts, url, e);
                    last_error = Error::Http(e);
                    if attempt < self.max_attempts {
                        thread::sleep(self.retry_delay);
                    }
                }
            }
        }
        Err(last_error)
    }
}

impl OntologyService for UtsClient {
    fn search(&self, term: &str, page_size: usize) -> Result<Vec<ConceptHit>> {
        let url = format!("{}/search/current", self.base_url);
        let envelope: Envelope<SearchResult> = self.get_json(
            &url,
            &[("string", term.to_string()), ("pageSize", page_size.to_string())],
        )?;
        // A UTS devolve um item "NONE" quando não há resultados
        let hits: Vec<ConceptHit> = envelope
            .result
            .results
            .into_iter()
            .filter(|item| item.ui != "NONE")
            .map(|item| ConceptHit { cui: item.ui, name: item.name })
            .collect();
        debug!("UTS search '{}': {} conceitos", term, hits.len());
        Ok(hits)
    }

    fn semantic_type(&self, cui: &str) -> Result<SemanticTypeRef> {
        let url = format!("{}/content/current/CUI/{}", self.base_url, cui);
        let envelope: Envelope<ConceptResult> = self.get_json(&url, &[])?;
        envelope
            .result
            .semantic_types
            .into_iter()
            .next()
            .map(|st| SemanticTypeRef { name: st.name, uri: st.uri })
            .ok_or_else(|| Error::Ontology(format!("conceito {} sem tipo semântico", cui)))
    }

    fn tree_number(&self, semantic_type: &SemanticTypeRef) -> Result<String> {
        let envelope: Envelope<SemanticTypeResult> = self.get_json(&semantic_type.uri, &[])?;
        Ok(envelope.result.tree_number)
    }
}
