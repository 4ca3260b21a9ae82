//! # Agregador de Evidências
//!
//! Preenche o [`MentionRegistry`] de um documento com as propostas de cada fonte, na
//! ordem do pipeline:
//!
//! 1. Pares de siglas (semeiam as menções e os vínculos sigla ↔ forma longa)
//! 2. Tags do LLM, uma categoria por vez, com peso de menções
//! 3. Rótulos do NER pré-treinado
//! 4. Evidência da ontologia (exceto siglas e menções com tag manual)
//!
//! Evidência para uma menção inexistente é uma violação de contrato do chamador:
//! registrada em log e ignorada, sem interromper o documento.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::gazetteer::TaggedEntity;
use crate::llm::parse::LlmMention;
use crate::mention::{EvidenceSnapshot, Mention, MentionRegistry, OntologyEvidence};
use crate::ontology::{OntologyAdapter, OntologyService};
use crate::tag::{NerLabel, Tag};
use crate::text::{contains_numeric, is_all_caps, looks_numeric, AbbreviationPair, Alignment, Span, TextAnalyzer};

/// Construtor da evidência de um documento.
pub struct EvidenceAggregator<'a> {
    analyzer: &'a TextAnalyzer,
    registry: MentionRegistry,
}

impl<'a> EvidenceAggregator<'a> {
    pub fn new(analyzer: &'a TextAnalyzer) -> Self {
        Self {
            analyzer,
            registry: MentionRegistry::new(),
        }
    }

    pub fn registry(&self) -> &MentionRegistry {
        &self.registry
    }

    /// Cria a menção (se ainda não existe) com sentença e heurísticas derivadas do span.
    ///
    /// Retorna `true` se a menção foi criada.
    pub fn seed_mention(&mut self, text: &str, span: Span) -> bool {
        if self.registry.contains(text) {
            return false;
        }
        let tokens = self.analyzer.tokens_in(span);
        let mut mention = Mention::new(text, span, &self.analyzer.sentence_of(span));
        mention.is_abbreviation = is_all_caps(text);
        mention.looks_numeric = looks_numeric(text, tokens);
        mention.contains_numeric = contains_numeric(tokens);
        debug!("Nova menção: {}", mention);
        self.registry.insert(mention)
    }

    /// Registra um par sigla / forma longa, ligando as duas menções.
    pub fn add_abbreviation_pair(&mut self, pair: &AbbreviationPair) {
        let locate = |needle: &str| self.analyzer.span_of(needle, Alignment::Expand);
        let (Some(short_span), Some(long_span)) = (locate(&pair.short_form), locate(&pair.long_form)) else {
            warn!(
                "Par de siglas fora do texto: {} / {}",
                pair.short_form, pair.long_form
            );
            return;
        };

        self.seed_mention(&pair.short_form, short_span);
        if let Some(short) = self.registry.get_mut(&pair.short_form) {
            short.is_abbreviation = true;
            short.long_form = Some(pair.long_form.clone());
        }
        self.seed_mention(&pair.long_form, long_span);
        if let Some(long) = self.registry.get_mut(&pair.long_form) {
            long.short_form = Some(pair.short_form.clone());
        }
    }

    /// Adiciona as menções extraídas pelo LLM para uma categoria.
    pub fn add_llm_evidence(&mut self, tag: Tag, mentions: &[LlmMention]) {
        for m in mentions {
            self.seed_mention(&m.text, m.span);
            // A menção acabou de ser garantida
            let _ = self.append_llm_tag(&m.text, tag, m.mentions);
        }
    }

    /// Anexa uma tag do LLM e acumula o peso de menções.
    pub fn append_llm_tag(&mut self, text: &str, tag: Tag, mentions: u32) -> Result<()> {
        let mention = self.lookup_mut(text)?;
        mention.llm_tags.insert(tag);
        mention.llm_mentions += mentions;
        Ok(())
    }

    /// Adiciona as entidades do NER pré-treinado.
    pub fn add_ner_evidence(&mut self, entities: &[TaggedEntity]) {
        for entity in entities {
            self.seed_mention(&entity.text, entity.span);
            let _ = self.append_ner_label(&entity.text, entity.label);
        }
    }

    pub fn append_ner_label(&mut self, text: &str, label: NerLabel) -> Result<()> {
        self.lookup_mut(text)?.ner_labels.insert(label);
        Ok(())
    }

    /// Força a tag final de uma menção (regra manual do chamador).
    pub fn set_manual_override(&mut self, text: &str, tag: Tag) -> Result<()> {
        self.lookup_mut(text)?.manual_override = Some(tag);
        Ok(())
    }

    /// Consulta a ontologia para cada menção elegível.
    ///
    /// Siglas, menções com tag manual e menções já consultadas são puladas. Sem
    /// resultados, a evidência vira `[Unknown]`.
    pub fn populate_ontology<S: OntologyService>(&mut self, adapter: &mut OntologyAdapter<S>, top_k: usize) {
        for mention in self.registry.iter_mut() {
            if mention.manual_override.is_some()
                || mention.is_abbreviation
                || mention.ontology.is_populated()
            {
                continue;
            }
            mention.ontology = match adapter.lookup(&mention.text, top_k) {
                Some(found) => found.into_evidence(),
                None => {
                    debug!("Sem resultados na ontologia para '{}'", mention.text);
                    OntologyEvidence::unknown()
                }
            };
            if mention.ontology.exact_match {
                debug!(
                    "Casamento exato na ontologia: '{}' → {:?}",
                    mention.text,
                    mention.ontology.top_tag()
                );
            }
        }
    }

    /// Encerra a agregação.
    pub fn freeze(self) -> EvidenceSnapshot {
        self.registry.freeze()
    }

    fn lookup_mut(&mut self, text: &str) -> Result<&mut Mention> {
        match self.registry.get_mut(text) {
            Some(mention) => Ok(mention),
            None => {
                warn!("Menção '{}' não encontrada na tabela de nomes", text);
                Err(Error::UnknownMention(text.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::{FixtureOntology, OntologyCache};

    const ABSTRACT: &str = "Acute lung injury (ALI) follows sepsis. ALI was induced in 12 mice.";

    #[test]
    fn test_abbreviation_pair_links_both_sides() {
        let analyzer = TextAnalyzer::new(ABSTRACT);
        let mut agg = EvidenceAggregator::new(&analyzer);
        for pair in analyzer.detect_abbreviations() {
            agg.add_abbreviation_pair(&pair);
        }
        let short = agg.registry().get("ALI").unwrap();
        assert!(short.is_abbreviation);
        assert_eq!(short.long_form.as_deref(), Some("Acute lung injury"));
        let long = agg.registry().get("Acute lung injury").unwrap();
        assert_eq!(long.short_form.as_deref(), Some("ALI"));
        assert!(!long.is_abbreviation);
    }

    #[test]
    fn test_llm_mentions_accumulate() {
        let analyzer = TextAnalyzer::new(ABSTRACT);
        let mut agg = EvidenceAggregator::new(&analyzer);
        let found = LlmMention { text: "sepsis".into(), span: Span::new(32, 38), mentions: 2 };
        agg.add_llm_evidence(Tag::Diso, &[found.clone()]);
        agg.add_llm_evidence(Tag::Finding, &[found]);
        let sepsis = agg.registry().get("sepsis").unwrap();
        assert_eq!(sepsis.llm_mentions, 4);
        assert!(sepsis.has_llm_tag(Tag::Diso) && sepsis.has_llm_tag(Tag::Finding));
        assert_eq!(sepsis.sentence, "Acute lung injury (ALI) follows sepsis.");
    }

    #[test]
    fn test_unknown_mention_is_reported_not_fatal() {
        let analyzer = TextAnalyzer::new(ABSTRACT);
        let mut agg = EvidenceAggregator::new(&analyzer);
        let err = agg.append_llm_tag("pneumonia", Tag::Diso, 1).unwrap_err();
        assert!(matches!(err, Error::UnknownMention(ref t) if t == "pneumonia"));
        assert!(agg.append_ner_label("pneumonia", NerLabel::Disease).is_err());
        assert!(agg.set_manual_override("pneumonia", Tag::Diso).is_err());
        assert!(agg.registry().is_empty());
    }

    #[test]
    fn test_seed_heuristics() {
        let analyzer = TextAnalyzer::new(ABSTRACT);
        let mut agg = EvidenceAggregator::new(&analyzer);
        let at = ABSTRACT.find("12 mice").unwrap();
        agg.seed_mention("12 mice", Span::new(at, at + 7));
        agg.seed_mention("12", Span::new(at, at + 2));
        let mice = agg.registry().get("12 mice").unwrap();
        assert!(mice.contains_numeric && !mice.looks_numeric);
        assert!(agg.registry().get("12").unwrap().looks_numeric);
    }

    #[test]
    fn test_ontology_skips_abbreviations_and_overrides() {
        let analyzer = TextAnalyzer::new("Acute lung injury (ALI) follows sepsis and a burn.");
        let mut agg = EvidenceAggregator::new(&analyzer);
        for pair in analyzer.detect_abbreviations() {
            agg.add_abbreviation_pair(&pair);
        }
        agg.seed_mention("sepsis", analyzer.span_of("sepsis", Alignment::Strict).unwrap());
        agg.seed_mention("burn", analyzer.span_of("burn", Alignment::Strict).unwrap());
        agg.set_manual_override("burn", Tag::InjuryPoisoning).unwrap();

        let mut onto = OntologyAdapter::new(FixtureOntology::demo(), OntologyCache::in_memory());
        agg.populate_ontology(&mut onto, 5);
        let snapshot = agg.freeze();

        let long = snapshot.get("Acute lung injury").unwrap();
        assert!(long.ontology.exact_match);
        assert_eq!(long.ontology.top_tag(), Some(Tag::Diso));
        assert!(!snapshot.get("ALI").unwrap().ontology.is_populated());
        assert!(!snapshot.get("burn").unwrap().ontology.is_populated());
        assert_eq!(onto.service().search_calls(), 2);
    }
}
