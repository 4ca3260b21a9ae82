//! Cliente de LLM determinístico para testes e para o modo demonstração.
//!
//! ```rust
//! use bionne_core::llm::{CompletionClient, CompletionRequest, MockCompletionClient};
//!
//! let llm = MockCompletionClient::new()
//!     .with_response_mapping("[DISO]: ", ["sepsis;acute lung injury", "sepsis"]);
//!
//! let request = CompletionRequest::new("[TEXT]: ...\n[DISO]: ", 200).with_samples(2);
//! assert_eq!(llm.complete(&request).unwrap().len(), 2);
//! assert_eq!(llm.call_count(), 1);
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use super::{CompletionClient, CompletionRequest};
use crate::error::{Error, Result};

/// Registro de uma chamada recebida pelo mock.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub prompt: String,
    pub samples: usize,
    pub seed: u64,
}

/// Mock com respostas mapeadas por trecho do prompt.
///
/// O primeiro mapeamento cujo trecho aparece no prompt vence; sem mapeamento, a resposta
/// padrão é repetida uma vez por amostra solicitada.
#[derive(Clone, Default)]
pub struct MockCompletionClient {
    mappings: Vec<(String, Vec<String>)>,
    default_response: String,
    fail: bool,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

impl MockCompletionClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fixed_response(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }

    /// Associa as amostras devolvidas a prompts que contenham `fragment`.
    pub fn with_response_mapping<I, S>(mut self, fragment: impl Into<String>, samples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mappings
            .push((fragment.into(), samples.into_iter().map(Into::into).collect()));
        self
    }

    /// Toda chamada falha com `Error::Llm`.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.log().clone()
    }

    pub fn call_count(&self) -> usize {
        self.log().len()
    }

    fn log(&self) -> MutexGuard<'_, Vec<MockCall>> {
        self.call_log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CompletionClient for MockCompletionClient {
    fn complete(&self, request: &CompletionRequest) -> Result<Vec<String>> {
        self.log().push(MockCall {
            prompt: request.prompt.clone(),
            samples: request.samples,
            seed: request.seed,
        });
        if self.fail {
            return Err(Error::Llm("falha simulada".to_string()));
        }
        let mapped = self
            .mappings
            .iter()
            .find(|(fragment, _)| request.prompt.contains(fragment.as_str()));
        Ok(match mapped {
            Some((_, samples)) => samples.clone(),
            None => vec![self.default_response.clone(); request.samples.max(1)],
        })
    }
}
