//! Tipos de erro do bionne-core.
//!
//! Apenas falhas de preparação (config, arquivos de cache) chegam ao chamador como `Err`.
//! Falhas por menção são degradadas para sentinelas e contadores em
//! [`DisambiguationStats`](crate::engine::DisambiguationStats).

use thiserror::Error;

/// Alias de `Result` com o [`Error`] do crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// O agregador recebeu evidência para uma menção que ainda não foi registrada
    #[error("Menção não encontrada na tabela de nomes: {0}")]
    UnknownMention(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Falha de transporte HTTP (após esgotar as tentativas)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Resposta da ontologia malformada ou inesperada
    #[error("Ontology error: {0}")]
    Ontology(String),

    /// Resposta do LLM malformada ou status de erro
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
