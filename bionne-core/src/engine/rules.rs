//! Regras da cascata de desambiguação.
//!
//! Cada regra examina a evidência congelada de uma menção e devolve um [`Verdict`]. A
//! ordem da lista em [`standard_rules`] é a prioridade: a primeira regra que decide vence.

use tracing::{debug, warn};

use super::stats::DisambiguationStats;
use super::tiebreak::{self, TiebreakOutcome, TIEBREAK_TAGS};
use crate::config::EngineConfig;
use crate::llm::prompt::{tiebreak_max_tokens, tiebreak_prompt};
use crate::llm::{CompletionClient, CompletionRequest};
use crate::mention::Mention;
use crate::tag::{NerLabel, Tag};

/// Decisão de uma regra para uma menção.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Fixa a tag final
    Finalize(Tag),
    /// Encerra a cascata e envia a menção ao passe de aninhadas
    Defer,
    /// A regra não se aplica; segue para a próxima
    Pass,
}

/// Tudo que uma regra pode consultar além da própria menção.
pub struct RuleContext<'a> {
    pub config: &'a EngineConfig,
    pub llm: Option<&'a dyn CompletionClient>,
    pub stats: &'a mut DisambiguationStats,
}

pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;
    fn evaluate(&self, mention: &Mention, ctx: &mut RuleContext<'_>) -> Verdict;
}

/// A cascata padrão, em ordem de prioridade.
pub fn standard_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(ManualOverrideRule),
        Box::new(ExactOntologyMatchRule),
        Box::new(InjuryPriorityRule),
        Box::new(NerBackedRule::disease()),
        Box::new(NerBackedRule::chemical()),
        Box::new(IntersectionVoteRule),
        Box::new(SemanticTiebreakRule),
        Box::new(FindingHeuristicRule),
        Box::new(HighFrequencyRule),
    ]
}

/// Regra 1: tag forçada pelo chamador.
pub struct ManualOverrideRule;

impl Rule for ManualOverrideRule {
    fn name(&self) -> &'static str {
        "manual_override"
    }

    fn evaluate(&self, mention: &Mention, ctx: &mut RuleContext<'_>) -> Verdict {
        match mention.manual_override {
            Some(tag) => {
                ctx.stats.manual_override += 1;
                Verdict::Finalize(tag)
            }
            None => Verdict::Pass,
        }
    }
}

/// Regra 2: o conceito do topo da ontologia tem exatamente o texto da menção.
pub struct ExactOntologyMatchRule;

impl Rule for ExactOntologyMatchRule {
    fn name(&self) -> &'static str {
        "exact_match"
    }

    fn evaluate(&self, mention: &Mention, ctx: &mut RuleContext<'_>) -> Verdict {
        if !mention.ontology.exact_match {
            return Verdict::Pass;
        }
        match mention.ontology.top_tag() {
            Some(tag) => {
                ctx.stats.exact_match += 1;
                Verdict::Finalize(tag)
            }
            None => Verdict::Pass,
        }
    }
}

/// Regra 3: lesão/envenenamento proposta pelo LLM e pela ontologia.
///
/// Vem antes das regras de doença: lesão é subconjunto semântico de DISO.
pub struct InjuryPriorityRule;

impl Rule for InjuryPriorityRule {
    fn name(&self) -> &'static str {
        "injury"
    }

    fn evaluate(&self, mention: &Mention, ctx: &mut RuleContext<'_>) -> Verdict {
        if mention.has_llm_tag(Tag::InjuryPoisoning) && mention.ontology.contains(Tag::InjuryPoisoning) {
            ctx.stats.injury += 1;
            return Verdict::Finalize(Tag::InjuryPoisoning);
        }
        Verdict::Pass
    }
}

/// Regras 4 e 5: rótulo do NER pré-treinado confirmado pelo LLM ou pela ontologia.
pub struct NerBackedRule {
    label: NerLabel,
}

impl NerBackedRule {
    pub fn disease() -> Self {
        Self { label: NerLabel::Disease }
    }

    pub fn chemical() -> Self {
        Self { label: NerLabel::Chemical }
    }
}

impl Rule for NerBackedRule {
    fn name(&self) -> &'static str {
        match self.label {
            NerLabel::Disease => "ner_disease",
            NerLabel::Chemical => "ner_chemical",
        }
    }

    fn evaluate(&self, mention: &Mention, ctx: &mut RuleContext<'_>) -> Verdict {
        let tag = self.label.tag();
        if !mention.has_ner_label(self.label) {
            return Verdict::Pass;
        }
        if !mention.has_llm_tag(tag) && !mention.ontology.contains(tag) {
            return Verdict::Pass;
        }
        match self.label {
            NerLabel::Disease => ctx.stats.ner_disease += 1,
            NerLabel::Chemical => ctx.stats.ner_chemical += 1,
        }
        Verdict::Finalize(tag)
    }
}

/// Categorias candidatas da interseção LLM ∩ ontologia
pub const INTERSECTION_CANDIDATES: [Tag; 7] = [
    Tag::Finding,
    Tag::Diso,
    Tag::Anatomy,
    Tag::Phys,
    Tag::Chem,
    Tag::Labproc,
    Tag::Device,
];

/// Regra 6: voto da interseção entre LLM e ontologia.
///
/// Com mais de uma categoria na interseção, vence a de menor posição no ranking da
/// ontologia.
pub struct IntersectionVoteRule;

impl Rule for IntersectionVoteRule {
    fn name(&self) -> &'static str {
        "intersection"
    }

    fn evaluate(&self, mention: &Mention, ctx: &mut RuleContext<'_>) -> Verdict {
        let best = INTERSECTION_CANDIDATES
            .iter()
            .filter(|tag| mention.has_llm_tag(**tag))
            .filter_map(|tag| mention.ontology.rank_of(*tag).map(|rank| (rank, *tag)))
            .min_by_key(|(rank, _)| *rank);
        match best {
            Some((_, tag)) => {
                ctx.stats.intersection += 1;
                Verdict::Finalize(tag)
            }
            None => Verdict::Pass,
        }
    }
}

/// Regra 7: pergunta de múltipla escolha ao LLM (desligada por padrão).
pub struct SemanticTiebreakRule;

impl SemanticTiebreakRule {
    fn is_eligible(mention: &Mention, config: &EngineConfig) -> bool {
        let words = mention.word_count();
        !mention.is_abbreviation
            && !mention.contains_numeric
            && words >= config.tiebreak_min_tokens
            && words <= config.tiebreak_max_tokens
            && TIEBREAK_TAGS.iter().any(|t| mention.has_llm_tag(*t))
    }
}

impl Rule for SemanticTiebreakRule {
    fn name(&self) -> &'static str {
        "semantic_tiebreak"
    }

    fn evaluate(&self, mention: &Mention, ctx: &mut RuleContext<'_>) -> Verdict {
        if !ctx.config.enable_semantic_tiebreak || !Self::is_eligible(mention, ctx.config) {
            return Verdict::Pass;
        }
        let Some(llm) = ctx.llm else {
            return Verdict::Pass;
        };
        let sentence = mention.sentence.trim();
        if sentence == mention.text {
            return Verdict::Pass;
        }

        let request = CompletionRequest::new(
            tiebreak_prompt(&mention.text, sentence, &mention.ontology.semantic_types),
            tiebreak_max_tokens(&mention.text),
        )
        .with_samples(ctx.config.tiebreak_samples)
        .with_seed(ctx.config.llm_seed);

        let samples = match llm.complete(&request) {
            Ok(samples) => samples,
            Err(e) => {
                warn!("Desempate semântico sem resposta para '{}': {}", mention.text, e);
                ctx.stats.semantic_search_failed += 1;
                return Verdict::Pass;
            }
        };
        debug!("Desempate '{}': {:?}", mention.text, samples);

        let chosen = match tiebreak::decide(&samples) {
            TiebreakOutcome::Unanimous(tag) => {
                ctx.stats.semantic_search_succeeded += 1;
                tag
            }
            TiebreakOutcome::Ambiguous(tag) => {
                warn!("Desempate ambíguo para '{}', usando a primeira amostra ({})", mention.text, tag);
                ctx.stats.semantic_search_ambiguous += 1;
                tag
            }
            TiebreakOutcome::NoAnswer => {
                warn!("Desempate sem opção reconhecível para '{}'", mention.text);
                ctx.stats.semantic_search_failed += 1;
                return Verdict::Finalize(Tag::Other);
            }
        };
        if TIEBREAK_TAGS.contains(&chosen) {
            Verdict::Finalize(chosen)
        } else {
            Verdict::Pass
        }
    }
}

/// Regra 8: achado proposto pelo LLM com forma de sintagma (2 a 10 palavras, sem números).
pub struct FindingHeuristicRule;

impl Rule for FindingHeuristicRule {
    fn name(&self) -> &'static str {
        "custom_finding"
    }

    fn evaluate(&self, mention: &Mention, ctx: &mut RuleContext<'_>) -> Verdict {
        let config = ctx.config;
        let words = mention.word_count();
        let qualifies = !mention.is_abbreviation
            && mention.has_llm_tag(Tag::Finding)
            && !mention.looks_numeric
            && !mention.contains_numeric
            && mention.llm_mentions >= config.finding_min_mentions
            && words >= config.finding_min_tokens
            && words <= config.finding_max_tokens;
        if qualifies {
            ctx.stats.custom_findings += 1;
            return Verdict::Finalize(Tag::Finding);
        }
        Verdict::Pass
    }
}

/// Regra 9: menção frequente no LLM que nenhuma regra resolveu.
///
/// Só segue para o passe de aninhadas quando não é numérica e a ontologia não a conhece.
pub struct HighFrequencyRule;

impl Rule for HighFrequencyRule {
    fn name(&self) -> &'static str {
        "high_frequency"
    }

    fn evaluate(&self, mention: &Mention, ctx: &mut RuleContext<'_>) -> Verdict {
        if mention.is_abbreviation || mention.llm_mentions < ctx.config.high_frequency_threshold {
            return Verdict::Pass;
        }
        debug!(
            "'{}' citada {} vezes sem tag (LLM {:?}, ontologia {:?})",
            mention.text, mention.llm_mentions, mention.llm_tags, mention.ontology.tags
        );
        ctx.stats.unmatched_freq_entity += 1;
        if !mention.looks_numeric && !mention.contains_numeric && mention.ontology.contains(Tag::Unknown) {
            Verdict::Defer
        } else {
            Verdict::Pass
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockCompletionClient;
    use crate::mention::OntologyEvidence;
    use crate::text::Span;

    fn mention(text: &str) -> Mention {
        Mention::new(text, Span::new(0, text.len()), &format!("We observed {} today.", text))
    }

    fn run(rule: &dyn Rule, m: &Mention, config: &EngineConfig, llm: Option<&dyn CompletionClient>) -> (Verdict, DisambiguationStats) {
        let mut stats = DisambiguationStats::default();
        let mut ctx = RuleContext { config, llm, stats: &mut stats };
        let verdict = rule.evaluate(m, &mut ctx);
        (verdict, stats)
    }

    fn ontology(tags: &[Tag]) -> OntologyEvidence {
        OntologyEvidence { tags: tags.to_vec(), ..Default::default() }
    }

    #[test]
    fn test_standard_order() {
        let names: Vec<&str> = standard_rules().iter().map(|r| r.name()).collect();
        assert_eq!(
            names,
            vec![
                "manual_override", "exact_match", "injury", "ner_disease", "ner_chemical",
                "intersection", "semantic_tiebreak", "custom_finding", "high_frequency",
            ]
        );
    }

    #[test]
    fn test_exact_match_uses_top_tag() {
        let mut m = mention("sepsis");
        m.ontology = OntologyEvidence { exact_match: true, ..ontology(&[Tag::Diso, Tag::Finding]) };
        let (verdict, stats) = run(&ExactOntologyMatchRule, &m, &EngineConfig::default(), None);
        assert_eq!(verdict, Verdict::Finalize(Tag::Diso));
        assert_eq!(stats.exact_match, 1);
    }

    #[test]
    fn test_injury_requires_both_sources() {
        let mut m = mention("burn");
        m.llm_tags.insert(Tag::InjuryPoisoning);
        m.ontology = ontology(&[Tag::Finding]);
        let config = EngineConfig::default();
        assert_eq!(run(&InjuryPriorityRule, &m, &config, None).0, Verdict::Pass);
        m.ontology = ontology(&[Tag::Finding, Tag::InjuryPoisoning]);
        assert_eq!(run(&InjuryPriorityRule, &m, &config, None).0, Verdict::Finalize(Tag::InjuryPoisoning));
    }

    #[test]
    fn test_ner_backed_needs_confirmation() {
        let mut m = mention("cisplatin");
        m.ner_labels.insert(NerLabel::Chemical);
        let config = EngineConfig::default();
        assert_eq!(run(&NerBackedRule::chemical(), &m, &config, None).0, Verdict::Pass);
        m.ontology = ontology(&[Tag::Chem]);
        let (verdict, stats) = run(&NerBackedRule::chemical(), &m, &config, None);
        assert_eq!(verdict, Verdict::Finalize(Tag::Chem));
        assert_eq!(stats.ner_chemical, 1);
        assert_eq!(run(&NerBackedRule::disease(), &m, &config, None).0, Verdict::Pass);
    }

    #[test]
    fn test_intersection_prefers_ontology_rank() {
        let mut m = mention("cholesterol level");
        m.llm_tags.extend([Tag::Finding, Tag::Chem]);
        m.ontology = ontology(&[Tag::Chem, Tag::Finding, Tag::Phys]);
        let (verdict, _) = run(&IntersectionVoteRule, &m, &EngineConfig::default(), None);
        assert_eq!(verdict, Verdict::Finalize(Tag::Chem));
    }

    #[test]
    fn test_intersection_ignores_injury_and_unknown() {
        let mut m = mention("burn");
        m.llm_tags.insert(Tag::InjuryPoisoning);
        m.ontology = ontology(&[Tag::Unknown]);
        assert_eq!(run(&IntersectionVoteRule, &m, &EngineConfig::default(), None).0, Verdict::Pass);
    }

    #[test]
    fn test_finding_heuristic_guards() {
        let config = EngineConfig::default();
        let mut m = mention("reduced survival rate");
        m.llm_tags.insert(Tag::Finding);
        m.llm_mentions = 2;
        assert_eq!(run(&FindingHeuristicRule, &m, &config, None).0, Verdict::Finalize(Tag::Finding));

        m.llm_mentions = 1;
        assert_eq!(run(&FindingHeuristicRule, &m, &config, None).0, Verdict::Pass);

        let mut single = mention("survival");
        single.llm_tags.insert(Tag::Finding);
        single.llm_mentions = 2;
        assert_eq!(run(&FindingHeuristicRule, &single, &config, None).0, Verdict::Pass);

        let mut numeric = mention("12 deaths reported");
        numeric.llm_tags.insert(Tag::Finding);
        numeric.llm_mentions = 2;
        numeric.contains_numeric = true;
        assert_eq!(run(&FindingHeuristicRule, &numeric, &config, None).0, Verdict::Pass);
    }

    #[test]
    fn test_high_frequency_defers_only_unknown() {
        let config = EngineConfig::default();
        let mut m = mention("type 2 diabetes mellitus");
        m.llm_mentions = 6;
        m.ontology = OntologyEvidence::unknown();
        let (verdict, stats) = run(&HighFrequencyRule, &m, &config, None);
        assert_eq!(verdict, Verdict::Defer);
        assert_eq!(stats.unmatched_freq_entity, 1);

        m.ontology = ontology(&[Tag::Other]);
        let (verdict, stats) = run(&HighFrequencyRule, &m, &config, None);
        assert_eq!(verdict, Verdict::Pass);
        assert_eq!(stats.unmatched_freq_entity, 1);

        m.llm_mentions = 5;
        assert_eq!(run(&HighFrequencyRule, &m, &config, None).1.unmatched_freq_entity, 0);
    }

    fn tiebreak_config() -> EngineConfig {
        EngineConfig { enable_semantic_tiebreak: true, ..Default::default() }
    }

    fn epithelial() -> Mention {
        let mut m = mention("alveolar epithelial cells");
        m.llm_tags.extend([Tag::Anatomy, Tag::Phys]);
        m
    }

    #[test]
    fn test_tiebreak_disabled_makes_no_call() {
        let llm = MockCompletionClient::new().with_fixed_response("a. Anatomy");
        let (verdict, _) = run(&SemanticTiebreakRule, &epithelial(), &EngineConfig::default(), Some(&llm));
        assert_eq!(verdict, Verdict::Pass);
        assert_eq!(llm.call_count(), 0);
    }

    #[test]
    fn test_tiebreak_unanimous() {
        let llm = MockCompletionClient::new().with_fixed_response("a. Anatomy");
        let (verdict, stats) = run(&SemanticTiebreakRule, &epithelial(), &tiebreak_config(), Some(&llm));
        assert_eq!(verdict, Verdict::Finalize(Tag::Anatomy));
        assert_eq!(stats.semantic_search_succeeded, 1);
        let call = &llm.calls()[0];
        assert_eq!(call.samples, 2);
        assert!(call.prompt.starts_with("Identify term \"alveolar epithelial cells\""));
    }

    #[test]
    fn test_tiebreak_ambiguous_counts_once() {
        let llm = MockCompletionClient::new()
            .with_response_mapping("Identify term", ["b. Physiology", "a. Anatomy"]);
        let (verdict, stats) = run(&SemanticTiebreakRule, &epithelial(), &tiebreak_config(), Some(&llm));
        assert_eq!(verdict, Verdict::Finalize(Tag::Phys));
        assert_eq!(stats.semantic_search_ambiguous, 1);
        assert_eq!(stats.semantic_search_succeeded, 0);
    }

    #[test]
    fn test_tiebreak_no_answer_finalizes_other() {
        let llm = MockCompletionClient::new().with_fixed_response("hmm");
        let (verdict, stats) = run(&SemanticTiebreakRule, &epithelial(), &tiebreak_config(), Some(&llm));
        assert_eq!(verdict, Verdict::Finalize(Tag::Other));
        assert_eq!(stats.semantic_search_failed, 1);
    }

    #[test]
    fn test_tiebreak_disease_choice_continues() {
        let llm = MockCompletionClient::new().with_fixed_response("c. Disease");
        let (verdict, _) = run(&SemanticTiebreakRule, &epithelial(), &tiebreak_config(), Some(&llm));
        assert_eq!(verdict, Verdict::Pass);
    }

    #[test]
    fn test_tiebreak_single_parsed_sample_is_ambiguous() {
        let llm = MockCompletionClient::new()
            .with_response_mapping("Identify term", ["I cannot tell", "a. Anatomy"]);
        let (verdict, stats) = run(&SemanticTiebreakRule, &epithelial(), &tiebreak_config(), Some(&llm));
        assert_eq!(verdict, Verdict::Finalize(Tag::Anatomy));
        assert_eq!(stats.semantic_search_ambiguous, 1);
        assert_eq!(stats.semantic_search_succeeded, 0);
    }

    fn assert_tiebreak_skipped(m: &Mention) {
        let llm = MockCompletionClient::new().with_fixed_response("a. Anatomy");
        let (verdict, stats) = run(&SemanticTiebreakRule, m, &tiebreak_config(), Some(&llm));
        assert_eq!(verdict, Verdict::Pass, "'{}' não deveria ir ao desempate", m.text);
        assert_eq!(llm.call_count(), 0, "'{}' não deveria consultar o LLM", m.text);
        assert_eq!(stats, DisambiguationStats::default());
    }

    #[test]
    fn test_tiebreak_word_count_bounds() {
        let mut single = mention("alveoli");
        single.llm_tags.insert(Tag::Anatomy);
        assert_tiebreak_skipped(&single);

        let mut six = mention("thin alveolar epithelial lining barrier cells");
        six.llm_tags.insert(Tag::Anatomy);
        assert_eq!(six.word_count(), 6);
        assert_tiebreak_skipped(&six);
    }

    #[test]
    fn test_tiebreak_skips_numeric_and_abbreviations() {
        let mut numeric = mention("type 2 alveolar cells");
        numeric.llm_tags.insert(Tag::Anatomy);
        numeric.contains_numeric = true;
        assert_tiebreak_skipped(&numeric);

        let mut abbreviation = epithelial();
        abbreviation.is_abbreviation = true;
        assert_tiebreak_skipped(&abbreviation);
    }

    #[test]
    fn test_tiebreak_requires_candidate_llm_tag() {
        let mut finding = mention("reduced lung compliance");
        finding.llm_tags.extend([Tag::Finding, Tag::Diso]);
        assert_tiebreak_skipped(&finding);
    }

    #[test]
    fn test_tiebreak_skips_mention_that_is_the_whole_sentence() {
        let text = "alveolar epithelial cells";
        let mut m = Mention::new(text, Span::new(0, text.len()), " alveolar epithelial cells ");
        m.llm_tags.insert(Tag::Anatomy);
        assert_tiebreak_skipped(&m);
    }

    #[test]
    fn test_tiebreak_without_client_passes() {
        let (verdict, stats) = run(&SemanticTiebreakRule, &epithelial(), &tiebreak_config(), None);
        assert_eq!(verdict, Verdict::Pass);
        assert_eq!(stats, DisambiguationStats::default());
    }

    #[test]
    fn test_tiebreak_transport_error_is_no_evidence() {
        let llm = MockCompletionClient::new().failing();
        let (verdict, stats) = run(&SemanticTiebreakRule, &epithelial(), &tiebreak_config(), Some(&llm));
        assert_eq!(verdict, Verdict::Pass);
        assert_eq!(stats.semantic_search_failed, 1);
    }
}
