//! # Cliente de LLM
//!
//! O LLM é usado de duas formas:
//!
//! 1. **Tagger few-shot**: um prompt por categoria ([`prompt::few_shot_prompt`]) devolve
//!    listas de entidades separadas por `;`, convertidas em menções por
//!    [`parse::process_llm_output`].
//! 2. **Desempate semântico**: pergunta de múltipla escolha feita pelo motor de
//!    desambiguação (ver [`crate::engine::tiebreak`]).
//!
//! Ambos passam pelo trait [`CompletionClient`]: texto → uma ou mais completions.

pub mod mock;
pub mod parse;
pub mod prompt;
pub mod textsynth;

use serde::{Deserialize, Serialize};

pub use mock::MockCompletionClient;
pub use textsynth::TextSynthClient;

use crate::error::Result;

/// Parâmetros de uma chamada de completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: usize,
    /// Número de amostras independentes (`n`)
    pub samples: usize,
    pub seed: u64,
    pub stop: Option<String>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: usize) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
            samples: 1,
            seed: 0,
            stop: None,
        }
    }

    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_stop(mut self, stop: impl Into<String>) -> Self {
        self.stop = Some(stop.into());
        self
    }
}

/// Fronteira com o modelo de linguagem.
pub trait CompletionClient: Send + Sync {
    /// Uma string por amostra solicitada.
    fn complete(&self, request: &CompletionRequest) -> Result<Vec<String>>;
}
