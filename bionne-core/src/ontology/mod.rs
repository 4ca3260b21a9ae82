//! # Adaptador de Ontologia (UMLS)
//!
//! Converte um texto de superfície em conceitos ranqueados e, para cada conceito,
//! em uma tag de categoria. Toda consulta passa pelo [`OntologyCache`]:
//!
//! 1. **Negativos**: texto que já retornou zero conceitos não gera nova chamada.
//! 2. **Conceito → tag** (exato, por CUI).
//! 3. **Tipo semântico → tag**: calculado uma vez por tipo via prefixo do tree number
//!    ([`semantic::classify_tree_number`]).
//!
//! A ordem do ranking é preservada nas listas paralelas de [`OntologyMatch`]: o motor
//! de desambiguação usa a posição como prioridade.

pub mod cache;
pub mod semantic;
pub mod uts;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use cache::{CachedConcept, JsonStore, OntologyCache};
pub use uts::UtsClient;

use crate::error::{Error, Result};
use crate::mention::OntologyEvidence;
use crate::tag::Tag;

/// Conceito devolvido pela busca da ontologia
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptHit {
    pub cui: String,
    pub name: String,
}

/// Referência a um tipo semântico (nome + URI para obter o tree number)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticTypeRef {
    pub name: String,
    pub uri: String,
}

/// Fronteira com o serviço de ontologia.
pub trait OntologyService: Send + Sync {
    /// Conceitos ranqueados para o texto (no máximo `page_size`).
    fn search(&self, term: &str, page_size: usize) -> Result<Vec<ConceptHit>>;
    /// Tipo semântico principal do conceito.
    fn semantic_type(&self, cui: &str) -> Result<SemanticTypeRef>;
    /// Tree number do tipo semântico (ex: "B2.2.1.2.1").
    fn tree_number(&self, semantic_type: &SemanticTypeRef) -> Result<String>;
}

impl<S: OntologyService + ?Sized> OntologyService for Box<S> {
    fn search(&self, term: &str, page_size: usize) -> Result<Vec<ConceptHit>> {
        (**self).search(term, page_size)
    }

    fn semantic_type(&self, cui: &str) -> Result<SemanticTypeRef> {
        (**self).semantic_type(cui)
    }

    fn tree_number(&self, semantic_type: &SemanticTypeRef) -> Result<String> {
        (**self).tree_number(semantic_type)
    }
}

impl<S: OntologyService + ?Sized> OntologyService for Arc<S> {
    fn search(&self, term: &str, page_size: usize) -> Result<Vec<ConceptHit>> {
        (**self).search(term, page_size)
    }

    fn semantic_type(&self, cui: &str) -> Result<SemanticTypeRef> {
        (**self).semantic_type(cui)
    }

    fn tree_number(&self, semantic_type: &SemanticTypeRef) -> Result<String> {
        (**self).tree_number(semantic_type)
    }
}

/// Resultado ranqueado de uma consulta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OntologyMatch {
    pub concepts: Vec<String>,
    pub semantic_types: Vec<String>,
    pub tags: Vec<Tag>,
    /// O primeiro conceito da busca tem o nome do termo consultado (sem diferenciar caixa)
    /// e foi resolvido.
    #[serde(default)]
    pub exact_match: bool,
}

impl OntologyMatch {
    pub fn best_tag(&self) -> Option<Tag> {
        self.tags.first().copied()
    }

    pub fn into_evidence(self) -> OntologyEvidence {
        OntologyEvidence {
            tags: self.tags,
            concepts: self.concepts,
            semantic_types: self.semantic_types,
            exact_match: self.exact_match,
        }
    }
}

/// Adaptador com cache persistente em torno de um [`OntologyService`].
pub struct OntologyAdapter<S> {
    service: S,
    cache: OntologyCache,
}

impl<S: OntologyService> OntologyAdapter<S> {
    pub fn new(service: S, cache: OntologyCache) -> Self {
        Self { service, cache }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn cache(&self) -> &OntologyCache {
        &self.cache
    }

    /// Consulta a ontologia.
    ///
    /// Com `top_k == 1` apenas o primeiro conceito é resolvido. Retorna `None` quando não
    /// há conceitos (resultado negativo é cacheado) ou quando nenhum conceito pôde ser
    /// resolvido.
    pub fn lookup(&mut self, text: &str, top_k: usize) -> Option<OntologyMatch> {
        if self.cache.negatives.contains(text) {
            debug!("Ontologia: '{}' servido do cache negativo", text);
            return None;
        }

        let hits = match self.service.search(text, top_k.max(1)) {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Ontologia indisponível para '{}': {}", text, e);
                Vec::new()
            }
        };
        if hits.is_empty() {
            debug!("Ontologia: nenhum conceito para '{}'", text);
            self.cache.negatives.set(text, "1".to_string());
            return None;
        }

        let mut result = OntologyMatch {
            concepts: Vec::new(),
            semantic_types: Vec::new(),
            tags: Vec::new(),
            exact_match: false,
        };
        for (rank, hit) in hits.iter().enumerate() {
            match self.resolve_concept(hit) {
                Ok((semantic, tag)) => {
                    if rank == 0 {
                        result.exact_match = hit.name.to_lowercase() == text.to_lowercase();
                    }
                    result.concepts.push(hit.name.clone());
                    result.semantic_types.push(semantic);
                    result.tags.push(tag);
                }
                Err(e) => warn!("Conceito {} ({}) ignorado: {}", hit.cui, hit.name, e),
            }
            if top_k == 1 {
                break;
            }
        }

        debug!("Ontologia '{}': {:?} / {:?}", text, result.concepts, result.tags);
        (!result.tags.is_empty()).then_some(result)
    }

    /// Atalho para `top_k == 1`: apenas a tag mais provável.
    pub fn lookup_tag(&mut self, text: &str) -> Option<Tag> {
        self.lookup(text, 1).and_then(|m| m.best_tag())
    }

    /// (tipo semântico, tag) de um conceito, passando pelos dois níveis de cache.
    fn resolve_concept(&mut self, hit: &ConceptHit) -> Result<(String, Tag)> {
        if let Some(CachedConcept(_, semantic, tag)) = self.cache.concepts.get(&hit.cui) {
            return Ok((semantic.clone(), *tag));
        }

        let semantic_type = self.service.semantic_type(&hit.cui)?;
        let tag = match self.cache.semantic_types.get(&semantic_type.name) {
            Some(tag) => *tag,
            None => {
                let tree_number = self.service.tree_number(&semantic_type)?;
                let tag = semantic::classify_tree_number(&tree_number);
                debug!("Tipo semântico '{}' ({}) → {}", semantic_type.name, tree_number, tag);
                self.cache.semantic_types.set(&semantic_type.name, tag);
                tag
            }
        };
        self.cache.concepts.set(
            &hit.cui,
            CachedConcept(hit.name.clone(), semantic_type.name.clone(), tag),
        );
        Ok((semantic_type.name, tag))
    }

    /// Grava os caches em disco.
    pub fn flush(&self) -> Result<()> {
        self.cache.flush()
    }
}

/// Ontologia em memória com contadores de chamadas.
///
/// Serve de dublê nos testes e no modo demonstração do servidor (sem chave da UMLS).
#[derive(Debug, Default)]
pub struct FixtureOntology {
    entries: HashMap<String, Vec<ConceptHit>>,
    semantic_types: HashMap<String, SemanticTypeRef>,
    tree_numbers: HashMap<String, String>,
    search_calls: AtomicUsize,
    concept_calls: AtomicUsize,
}

impl FixtureOntology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra um termo e seus conceitos ranqueados: `(cui, nome, tipo semântico, tree number)`.
    pub fn with_term(mut self, term: &str, concepts: &[(&str, &str, &str, &str)]) -> Self {
        let mut hits = Vec::new();
        for &(cui, name, semantic, tree) in concepts {
            hits.push(ConceptHit { cui: cui.to_string(), name: name.to_string() });
            let uri = format!("fixture://semantic/{}", semantic);
            self.semantic_types.insert(
                cui.to_string(),
                SemanticTypeRef { name: semantic.to_string(), uri: uri.clone() },
            );
            self.tree_numbers.insert(uri, tree.to_string());
        }
        self.entries.insert(term.to_lowercase(), hits);
        self
    }

    /// Ontologia de demonstração com alguns termos comuns.
    pub fn demo() -> Self {
        Self::new()
            .with_term("acute lung injury", &[("C0242488", "Acute lung injury", "Disease or Syndrome", "B2.2.1.2.1")])
            .with_term("sepsis", &[("C0243026", "Sepsis", "Disease or Syndrome", "B2.2.1.2.1")])
            .with_term("lung", &[("C0024109", "Lung", "Body Part, Organ, or Organ Component", "A1.2.3.1")])
            .with_term("cisplatin", &[("C0008838", "Cisplatin", "Pharmacologic Substance", "A1.4.1.1.1")])
            .with_term("diabetes", &[("C0011849", "Diabetes Mellitus", "Disease or Syndrome", "B2.2.1.2.1")])
            .with_term("burn", &[
                ("C0006434", "Burn injury", "Injury or Poisoning", "B2.3"),
                ("C0085624", "Burning sensation", "Sign or Symptom", "A2.2.2"),
            ])
            .with_term("apoptosis", &[("C0162638", "Apoptosis", "Cell Function", "B2.2.1.1.2")])
            .with_term("biopsy", &[("C0005558", "Biopsy", "Diagnostic Procedure", "B1.3.1.2")])
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn concept_calls(&self) -> usize {
        self.concept_calls.load(Ordering::SeqCst)
    }
}

impl OntologyService for FixtureOntology {
    fn search(&self, term: &str, page_size: usize) -> Result<Vec<ConceptHit>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .entries
            .get(&term.to_lowercase())
            .map(|hits| hits.iter().take(page_size).cloned().collect())
            .unwrap_or_default())
    }

    fn semantic_type(&self, cui: &str) -> Result<SemanticTypeRef> {
        self.concept_calls.fetch_add(1, Ordering::SeqCst);
        self.semantic_types
            .get(cui)
            .cloned()
            .ok_or_else(|| Error::Ontology(format!("CUI desconhecido: {}", cui)))
    }

    fn tree_number(&self, semantic_type: &SemanticTypeRef) -> Result<String> {
        self.tree_numbers
            .get(&semantic_type.uri)
            .cloned()
            .ok_or_else(|| Error::Ontology(format!("tipo semântico desconhecido: {}", semantic_type.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(service: FixtureOntology) -> OntologyAdapter<FixtureOntology> {
        OntologyAdapter::new(service, OntologyCache::in_memory())
    }

    #[test]
    fn test_negative_cache_skips_second_call() {
        let mut onto = adapter(FixtureOntology::new());
        assert!(onto.lookup("qwertyitis", 5).is_none());
        assert!(onto.lookup("qwertyitis", 5).is_none());
        assert_eq!(onto.service().search_calls(), 1);
        assert!(onto.cache().negatives.contains("qwertyitis"));
    }

    #[test]
    fn test_ranked_lists_are_parallel() {
        let mut onto = adapter(FixtureOntology::demo());
        let found = onto.lookup("burn", 5).unwrap();
        assert_eq!(found.tags, vec![Tag::InjuryPoisoning, Tag::Finding]);
        assert_eq!(found.concepts, vec!["Burn injury", "Burning sensation"]);
        assert_eq!(found.semantic_types[1], "Sign or Symptom");
    }

    #[test]
    fn test_top_one_resolves_only_first_concept() {
        let mut onto = adapter(FixtureOntology::demo());
        assert_eq!(onto.lookup_tag("burn"), Some(Tag::InjuryPoisoning));
        assert_eq!(onto.service().concept_calls(), 1);
    }

    #[test]
    fn test_concept_cache_avoids_repeat_resolution() {
        let mut onto = adapter(FixtureOntology::demo());
        onto.lookup("sepsis", 5).unwrap();
        onto.lookup("sepsis", 5).unwrap();
        assert_eq!(onto.service().search_calls(), 2);
        assert_eq!(onto.service().concept_calls(), 1);
        assert_eq!(onto.cache().semantic_types.get("Disease or Syndrome"), Some(&Tag::Diso));
    }

    #[test]
    fn test_exact_match_is_case_insensitive() {
        let mut onto = adapter(FixtureOntology::demo());
        let evidence = onto.lookup("Acute Lung Injury", 5).unwrap().into_evidence();
        assert!(evidence.exact_match);
        let evidence = onto.lookup("diabetes", 5).unwrap().into_evidence();
        assert!(!evidence.exact_match);
    }

    #[test]
    fn test_exact_match_ignores_lower_ranked_concepts() {
        // O primeiro conceito não resolve (CUI sem tipo semântico); o segundo tem o nome exato
        let mut service = FixtureOntology::new().with_term(
            "pneumonitis",
            &[
                ("C0000001", "Interstitial lung disease", "Disease or Syndrome", "B2.2.1.2.1"),
                ("C0032285", "Pneumonitis", "Disease or Syndrome", "B2.2.1.2.1"),
            ],
        );
        service.semantic_types.remove("C0000001");
        let mut onto = adapter(service);

        let found = onto.lookup("pneumonitis", 5).unwrap();
        assert_eq!(found.concepts, vec!["Pneumonitis"]);
        assert!(!found.exact_match);
        assert!(!found.into_evidence().exact_match);
    }

    #[test]
    fn test_diagnostic_procedure_maps_to_labproc() {
        let mut onto = adapter(FixtureOntology::demo());
        assert_eq!(onto.lookup_tag("biopsy"), Some(Tag::Labproc));
    }
}
