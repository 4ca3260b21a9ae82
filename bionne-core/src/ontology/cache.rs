//! # Cache Persistente da Ontologia
//!
//! Três arquivos JSON planos (objeto chave → valor), carregados inteiros na abertura e
//! gravados inteiros no [`OntologyCache::flush`]:
//!
//! | Arquivo          | Chave                 | Valor                                  |
//! |------------------|-----------------------|----------------------------------------|
//! | `cui.json`       | ID do conceito (CUI)  | `[nome, tipo semântico, tag]`          |
//! | `semantic.json`  | nome do tipo semântico| tag                                    |
//! | `nonentity.json` | texto consultado      | `"1"` (busca sem resultados)           |

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::tag::Tag;

/// Armazenamento chave-valor em um único arquivo JSON.
#[derive(Debug, Clone)]
pub struct JsonStore<V> {
    path: Option<PathBuf>,
    data: BTreeMap<String, V>,
}

impl<V: Serialize + DeserializeOwned> JsonStore<V> {
    /// Abre o arquivo, criando-o vazio se não existir.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let store = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            let data: BTreeMap<String, V> = if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)?
            };
            debug!("Cache {} carregado com {} entradas", path.display(), data.len());
            Self { path: Some(path), data }
        } else {
            let store = Self { path: Some(path), data: BTreeMap::new() };
            store.save()?;
            store
        };
        Ok(store)
    }

    /// Store sem arquivo (testes e execuções efêmeras).
    pub fn in_memory() -> Self {
        Self { path: None, data: BTreeMap::new() }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: &str, value: V) {
        self.data.insert(key.to_string(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.data.remove(key)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Grava o conteúdo inteiro no arquivo (no-op para stores em memória).
    ///
    /// Escreve em `<arquivo>.tmp` e renomeia por cima do original.
    pub fn save(&self) -> Result<()> {
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            let staging = path.with_extension("json.tmp");
            fs::write(&staging, serde_json::to_string(&self.data)?)?;
            fs::rename(&staging, path)?;
        }
        Ok(())
    }
}

/// Entrada do cache de conceitos: `[nome do conceito, tipo semântico, tag]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedConcept(pub String, pub String, pub Tag);

/// Os três caches que sobrevivem entre documentos.
#[derive(Debug, Clone)]
pub struct OntologyCache {
    pub concepts: JsonStore<CachedConcept>,
    pub semantic_types: JsonStore<Tag>,
    pub negatives: JsonStore<String>,
}

impl OntologyCache {
    /// Abre (ou cria) os três arquivos dentro de `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let cache = Self {
            concepts: JsonStore::open(dir.join("cui.json"))?,
            semantic_types: JsonStore::open(dir.join("semantic.json"))?,
            negatives: JsonStore::open(dir.join("nonentity.json"))?,
        };
        info!(
            "Cache da ontologia aberto em {}: {} conceitos, {} tipos semânticos, {} negativos",
            dir.display(),
            cache.concepts.len(),
            cache.semantic_types.len(),
            cache.negatives.len()
        );
        Ok(cache)
    }

    pub fn in_memory() -> Self {
        Self {
            concepts: JsonStore::in_memory(),
            semantic_types: JsonStore::in_memory(),
            negatives: JsonStore::in_memory(),
        }
    }

    /// Grava os três arquivos.
    pub fn flush(&self) -> Result<()> {
        self.concepts.save()?;
        self.semantic_types.save()?;
        self.negatives.save()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = OntologyCache::open(dir.path().join("data")).unwrap();
        assert!(cache.concepts.is_empty());
        assert!(dir.path().join("data/cui.json").exists());
        assert!(dir.path().join("data/nonentity.json").exists());
    }

    #[test]
    fn test_flush_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut cache = OntologyCache::open(dir.path()).unwrap();
            cache.concepts.set(
                "C0001",
                CachedConcept("Sepsis".into(), "Disease or Syndrome".into(), Tag::Diso),
            );
            cache.semantic_types.set("Disease or Syndrome", Tag::Diso);
            cache.negatives.set("qwerty", "1".into());
            cache.flush().unwrap();
        }
        let cache = OntologyCache::open(dir.path()).unwrap();
        assert_eq!(cache.concepts.get("C0001").unwrap().2, Tag::Diso);
        assert_eq!(cache.semantic_types.get("Disease or Syndrome"), Some(&Tag::Diso));
        assert!(cache.negatives.contains("qwerty"));
    }

    #[test]
    fn test_save_replaces_file_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("semantic.json");
        fs::write(&path, r#"{"Cell Function":"PHYS"}"#).unwrap();

        let mut store: JsonStore<Tag> = JsonStore::open(&path).unwrap();
        store.set("Disease or Syndrome", Tag::Diso);
        store.save().unwrap();

        assert!(!dir.path().join("semantic.json.tmp").exists());
        let reloaded: JsonStore<Tag> = JsonStore::open(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("Disease or Syndrome"), Some(&Tag::Diso));
    }

    #[test]
    fn test_concept_entry_is_a_json_triple() {
        let entry = CachedConcept("Lung".into(), "Body Part, Organ, or Organ Component".into(), Tag::Anatomy);
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"["Lung","Body Part, Organ, or Organ Component","ANATOMY"]"#);
    }
}
