//! Configuração do motor e do pipeline.
//!
//! Carregada de um arquivo JSON (chaves ausentes assumem o padrão) e sobrescrita por
//! variáveis de ambiente `BIONNE_*`:
//!
//! | Variável                 | Campo                            |
//! |--------------------------|----------------------------------|
//! | `BIONNE_LLM_MODEL`       | `llm_model`                      |
//! | `BIONNE_LLM_URL`         | `llm_base_url`                   |
//! | `BIONNE_CACHE_DIR`       | `cache_dir`                      |
//! | `BIONNE_ENABLE_TIEBREAK` | `engine.enable_semantic_tiebreak`|
//! | `BIONNE_SEED`            | `engine.llm_seed`                |
//!
//! As chaves de API não fazem parte da configuração: vêm de `TEXTSYNTH_API_KEY` e
//! `UMLS_API_KEY` (ver os clientes HTTP).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::llm::textsynth::DEFAULT_TEXTSYNTH_URL;
use crate::ontology::uts::DEFAULT_UTS_URL;
use crate::tag::Tag;

/// Limiares da cascata de desambiguação.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Peso mínimo de menções do LLM para a menção ir ao passe de aninhadas
    pub high_frequency_threshold: u32,
    pub finding_min_tokens: usize,
    pub finding_max_tokens: usize,
    pub finding_min_mentions: u32,
    pub tiebreak_min_tokens: usize,
    pub tiebreak_max_tokens: usize,
    /// Liga a pergunta de desempate ao LLM (regra 7)
    pub enable_semantic_tiebreak: bool,
    pub llm_seed: u64,
    pub tiebreak_samples: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            high_frequency_threshold: 6,
            finding_min_tokens: 2,
            finding_max_tokens: 10,
            finding_min_mentions: 2,
            tiebreak_min_tokens: 2,
            tiebreak_max_tokens: 5,
            enable_semantic_tiebreak: false,
            llm_seed: 0,
            tiebreak_samples: 2,
        }
    }
}

/// Configuração do pipeline de documento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub engine: EngineConfig,
    pub llm_model: String,
    pub llm_base_url: String,
    /// Amostras por prompt few-shot
    pub llm_samples: usize,
    pub llm_max_tokens: usize,
    pub stop: String,
    pub ontology_base_url: String,
    pub ontology_top_k: usize,
    pub cache_dir: PathBuf,
    /// Categorias consultadas no LLM, nesta ordem
    pub categories: Vec<Tag>,
    pub add_instruction: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            llm_model: "mixtral_47B_instruct".to_string(),
            llm_base_url: DEFAULT_TEXTSYNTH_URL.to_string(),
            llm_samples: 2,
            llm_max_tokens: 200,
            stop: "###".to_string(),
            ontology_base_url: DEFAULT_UTS_URL.to_string(),
            ontology_top_k: 5,
            cache_dir: PathBuf::from("simple_db/data"),
            categories: Tag::CATEGORIES.to_vec(),
            add_instruction: true,
        }
    }
}

impl PipelineConfig {
    /// Lê a configuração de um arquivo JSON.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        info!("Configuração carregada de {}", path.display());
        config.validate()?;
        Ok(config)
    }

    /// Padrões com as sobrescritas do ambiente.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Arquivo (se informado) seguido das sobrescritas do ambiente.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Aplica as variáveis `BIONNE_*` obtidas por `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("BIONNE_LLM_MODEL") {
            self.llm_model = model;
        }
        if let Some(url) = lookup("BIONNE_LLM_URL") {
            self.llm_base_url = url;
        }
        if let Some(dir) = lookup("BIONNE_CACHE_DIR") {
            self.cache_dir = PathBuf::from(dir);
        }
        if let Some(flag) = lookup("BIONNE_ENABLE_TIEBREAK") {
            self.engine.enable_semantic_tiebreak = parse_flag(&flag)
                .ok_or_else(|| Error::Config(format!("BIONNE_ENABLE_TIEBREAK inválido: {}", flag)))?;
        }
        if let Some(seed) = lookup("BIONNE_SEED") {
            self.engine.llm_seed = seed
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("BIONNE_SEED inválido: {}", seed)))?;
        }
        debug!("Configuração efetiva: {:?}", self);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.llm_samples == 0 {
            return Err(Error::Config("llm_samples deve ser maior que zero".to_string()));
        }
        if self.ontology_top_k == 0 {
            return Err(Error::Config("ontology_top_k deve ser maior que zero".to_string()));
        }
        if let Some(tag) = self.categories.iter().find(|t| !t.is_category()) {
            return Err(Error::Config(format!("categoria inválida: {}", tag)));
        }
        if self.engine.finding_min_tokens > self.engine.finding_max_tokens
            || self.engine.tiebreak_min_tokens > self.engine.tiebreak_max_tokens
        {
            return Err(Error::Config("faixa de tokens invertida".to_string()));
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.categories[0], Tag::Diso);
        assert_eq!(config.categories.len(), 8);
        assert_eq!(config.engine.high_frequency_threshold, 6);
        assert!(!config.engine.enable_semantic_tiebreak);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bionne.json");
        fs::write(&path, r#"{"llm_samples": 3, "engine": {"llm_seed": 42}}"#).unwrap();
        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.llm_samples, 3);
        assert_eq!(config.engine.llm_seed, 42);
        assert_eq!(config.engine.tiebreak_samples, 2);
        assert_eq!(config.stop, "###");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("BIONNE_ENABLE_TIEBREAK", "true"),
            ("BIONNE_SEED", "7"),
            ("BIONNE_CACHE_DIR", "/tmp/bionne"),
        ]
        .into_iter()
        .collect();
        let mut config = PipelineConfig::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert!(config.engine.enable_semantic_tiebreak);
        assert_eq!(config.engine.llm_seed, 7);
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/bionne"));
    }

    #[test]
    fn test_invalid_override_is_config_error() {
        let mut config = PipelineConfig::default();
        let err = config
            .apply_overrides(|k| (k == "BIONNE_SEED").then(|| "abc".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_sentinel_category_rejected() {
        let config = PipelineConfig { categories: vec![Tag::Other], ..Default::default() };
        assert!(config.validate().is_err());
    }
}
