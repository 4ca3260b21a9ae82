//! # Registro de Menções
//!
//! Cada texto de superfície único de um documento vira uma [`Mention`], que acumula a
//! evidência das três fontes (LLM, NER pré-treinado, ontologia).
//!
//! O registro tem duas fases:
//!
//! 1. **Acumulação** ([`MentionRegistry`]): mutável, alimentada pelo
//!    [`EvidenceAggregator`](crate::aggregator::EvidenceAggregator).
//! 2. **Snapshot** ([`EvidenceSnapshot`]): congelado por [`MentionRegistry::freeze`] e
//!    consumido somente-leitura pelo motor de desambiguação.
//!
//! A ordem de inserção é preservada: é a ordem em que o motor percorre as menções.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::tag::{NerLabel, Tag};
use crate::text::{word_count, Span};

/// Evidência da ontologia para uma menção.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OntologyEvidence {
    /// Tags candidatas, na ordem de relevância da ontologia (primeira = mais provável).
    /// `[Unknown]` quando a busca não encontrou nada; vazia quando não foi consultada.
    pub tags: Vec<Tag>,
    /// Nomes dos conceitos, paralelos a `tags`
    pub concepts: Vec<String>,
    /// Nomes dos tipos semânticos, paralelos a `tags`
    pub semantic_types: Vec<String>,
    /// O conceito mais bem ranqueado é igual à menção (ignorando caixa)
    pub exact_match: bool,
}

impl OntologyEvidence {
    /// Evidência para "ontologia sem resultados"
    pub fn unknown() -> Self {
        Self {
            tags: vec![Tag::Unknown],
            ..Default::default()
        }
    }

    pub fn is_populated(&self) -> bool {
        !self.tags.is_empty()
    }

    pub fn top_tag(&self) -> Option<Tag> {
        self.tags.first().copied()
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }

    /// Posição da tag no ranking da ontologia (menor = mais confiável).
    pub fn rank_of(&self, tag: Tag) -> Option<usize> {
        self.tags.iter().position(|t| *t == tag)
    }
}

/// Um texto de superfície único observado no documento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    /// Texto literal (chave de identidade, sensível a caixa)
    pub text: String,
    /// Offsets de byte da ocorrência âncora
    pub span: Span,
    /// Sentença que contém a âncora (contexto para o desempate via LLM)
    pub sentence: String,
    pub is_abbreviation: bool,
    pub looks_numeric: bool,
    pub contains_numeric: bool,
    /// Para uma sigla: sua forma longa
    pub long_form: Option<String>,
    /// Para uma forma longa: sua sigla
    pub short_form: Option<String>,
    /// Tags propostas pelo tagger few-shot
    pub llm_tags: BTreeSet<Tag>,
    /// Peso acumulado de menções nas respostas do LLM (não deduplicado entre chamadas)
    pub llm_mentions: u32,
    /// Rótulos propostos pelo NER pré-treinado
    pub ner_labels: BTreeSet<NerLabel>,
    pub ontology: OntologyEvidence,
    /// Tag forçada por regra manual do chamador; sempre vence
    pub manual_override: Option<Tag>,
}

impl Mention {
    pub fn new(text: &str, span: Span, sentence: &str) -> Self {
        Self {
            text: text.to_string(),
            span,
            sentence: sentence.to_string(),
            is_abbreviation: false,
            looks_numeric: false,
            contains_numeric: false,
            long_form: None,
            short_form: None,
            llm_tags: BTreeSet::new(),
            llm_mentions: 0,
            ner_labels: BTreeSet::new(),
            ontology: OntologyEvidence::default(),
            manual_override: None,
        }
    }

    /// Parceiro no par sigla/forma longa, se houver.
    pub fn partner(&self) -> Option<&str> {
        self.long_form.as_deref().or(self.short_form.as_deref())
    }

    pub fn word_count(&self) -> usize {
        word_count(&self.text)
    }

    pub fn has_llm_tag(&self, tag: Tag) -> bool {
        self.llm_tags.contains(&tag)
    }

    pub fn has_ner_label(&self, label: NerLabel) -> bool {
        self.ner_labels.contains(&label)
    }
}

impl std::fmt::Display for Mention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let llm: Vec<&str> = self.llm_tags.iter().map(|t| t.name()).collect();
        let ner: Vec<&str> = self.ner_labels.iter().map(|l| l.name()).collect();
        let onto: Vec<&str> = self.ontology.tags.iter().map(|t| t.name()).collect();
        write!(
            f,
            "{}: span=({}, {}), ontology={:?}, llm={:?} x{}, ner={:?}, abbr={}, numeric={}/{}",
            self.text,
            self.span.start,
            self.span.end,
            onto,
            llm,
            self.llm_mentions,
            ner,
            self.is_abbreviation,
            self.looks_numeric,
            self.contains_numeric,
        )
    }
}

/// Tabela mutável de menções de um documento, indexada pelo texto exato.
#[derive(Debug, Clone, Default)]
pub struct MentionRegistry {
    mentions: Vec<Mention>,
    index: HashMap<String, usize>,
}

impl MentionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insere a menção se o texto ainda não existe. Retorna `true` se inseriu.
    pub fn insert(&mut self, mention: Mention) -> bool {
        if self.index.contains_key(&mention.text) {
            return false;
        }
        self.index.insert(mention.text.clone(), self.mentions.len());
        self.mentions.push(mention);
        true
    }

    pub fn contains(&self, text: &str) -> bool {
        self.index.contains_key(text)
    }

    pub fn get(&self, text: &str) -> Option<&Mention> {
        self.index.get(text).map(|&i| &self.mentions[i])
    }

    pub fn get_mut(&mut self, text: &str) -> Option<&mut Mention> {
        match self.index.get(text) {
            Some(&i) => Some(&mut self.mentions[i]),
            None => None,
        }
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Mention> {
        self.mentions.iter_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mention> {
        self.mentions.iter()
    }

    pub fn len(&self) -> usize {
        self.mentions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty()
    }

    /// Encerra a fase de acumulação.
    pub fn freeze(self) -> EvidenceSnapshot {
        EvidenceSnapshot {
            mentions: self.mentions,
            index: self.index,
        }
    }
}

/// Evidência congelada de um documento (somente leitura).
#[derive(Debug, Clone, Default)]
pub struct EvidenceSnapshot {
    mentions: Vec<Mention>,
    index: HashMap<String, usize>,
}

impl EvidenceSnapshot {
    pub fn get(&self, text: &str) -> Option<&Mention> {
        self.index.get(text).map(|&i| &self.mentions[i])
    }

    pub fn contains(&self, text: &str) -> bool {
        self.index.contains_key(text)
    }

    /// Menções em ordem de inserção.
    pub fn iter(&self) -> impl Iterator<Item = &Mention> {
        self.mentions.iter()
    }

    pub fn len(&self) -> usize {
        self.mentions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty()
    }
}

impl FromIterator<Mention> for EvidenceSnapshot {
    fn from_iter<I: IntoIterator<Item = Mention>>(iter: I) -> Self {
        let mut registry = MentionRegistry::new();
        for mention in iter {
            registry.insert(mention);
        }
        registry.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_keys_by_exact_text() {
        let mut registry = MentionRegistry::new();
        assert!(registry.insert(Mention::new("Sepsis", Span::new(0, 6), "Sepsis.")));
        assert!(!registry.insert(Mention::new("Sepsis", Span::new(10, 16), "Sepsis.")));
        assert!(registry.insert(Mention::new("sepsis", Span::new(20, 26), "sepsis.")));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("Sepsis").unwrap().span.start, 0);
    }

    #[test]
    fn test_freeze_preserves_insertion_order() {
        let mut registry = MentionRegistry::new();
        for word in ["lung", "acute lung injury", "ALI"] {
            registry.insert(Mention::new(word, Span::new(0, 1), ""));
        }
        let snapshot = registry.freeze();
        let order: Vec<&str> = snapshot.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(order, vec!["lung", "acute lung injury", "ALI"]);
        assert!(snapshot.contains("ALI"));
    }

    #[test]
    fn test_ontology_rank() {
        let evidence = OntologyEvidence {
            tags: vec![Tag::Chem, Tag::Finding, Tag::Chem],
            ..Default::default()
        };
        assert_eq!(evidence.rank_of(Tag::Finding), Some(1));
        assert_eq!(evidence.rank_of(Tag::Chem), Some(0));
        assert_eq!(evidence.rank_of(Tag::Diso), None);
        assert_eq!(evidence.top_tag(), Some(Tag::Chem));
    }

    #[test]
    fn test_partner_prefers_long_form() {
        let mut m = Mention::new("ALI", Span::new(0, 3), "");
        m.long_form = Some("acute lung injury".into());
        assert_eq!(m.partner(), Some("acute lung injury"));
    }
}
