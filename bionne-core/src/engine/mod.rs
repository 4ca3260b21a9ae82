//! # Motor de Desambiguação
//!
//! Converte a evidência congelada de um documento em uma tag final por menção.
//!
//! ## Funcionamento
//!
//! 1. **Passe único**: cada menção sem tag percorre a cascata de regras
//!    ([`rules::standard_rules`]); a primeira regra que decide vence.
//! 2. **Passe de aninhadas**: menções frequentes adiadas pela última regra herdam a tag
//!    de uma menção resolvida contida nelas ([`nested::resolve_nested`]).
//!
//! Toda finalização passa por [`Resolution::finalize`]: a primeira atribuição vence e a
//! tag é propagada ao parceiro sigla/forma longa. Menções que nenhuma regra resolve
//! ficam sem tag e não aparecem na [`TagTable`].
//!
//! ## Exemplo
//!
//! ```rust
//! use bionne_core::config::EngineConfig;
//! use bionne_core::engine::DisambiguationEngine;
//! use bionne_core::mention::{EvidenceSnapshot, Mention, OntologyEvidence};
//! use bionne_core::tag::Tag;
//! use bionne_core::text::Span;
//!
//! let mut sepsis = Mention::new("sepsis", Span::new(0, 6), "sepsis kills.");
//! sepsis.ontology = OntologyEvidence { tags: vec![Tag::Diso], exact_match: true, ..Default::default() };
//! let snapshot: EvidenceSnapshot = [sepsis].into_iter().collect();
//!
//! let outcome = DisambiguationEngine::new(EngineConfig::default()).resolve(&snapshot, None);
//! assert_eq!(outcome.resolution.final_tag("sepsis"), Some(Tag::Diso));
//! assert_eq!(outcome.stats.exact_match, 1);
//! ```

pub mod nested;
pub mod resolution;
pub mod rules;
pub mod stats;
pub mod tiebreak;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use resolution::{Resolution, TagTable};
pub use rules::{Rule, RuleContext, Verdict};
pub use stats::DisambiguationStats;

use crate::config::EngineConfig;
use crate::llm::CompletionClient;
use crate::mention::EvidenceSnapshot;

/// Resultado de [`DisambiguationEngine::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisambiguationOutcome {
    pub resolution: Resolution,
    pub stats: DisambiguationStats,
    /// Menções enviadas ao passe de aninhadas, em ordem
    pub deferred: Vec<String>,
}

pub struct DisambiguationEngine {
    config: EngineConfig,
    rules: Vec<Box<dyn Rule>>,
}

impl DisambiguationEngine {
    /// Motor com a cascata padrão.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_rules(config, rules::standard_rules())
    }

    /// Motor com uma cascata própria (a ordem do vetor é a prioridade).
    pub fn with_rules(config: EngineConfig, rules: Vec<Box<dyn Rule>>) -> Self {
        Self { config, rules }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Resolve todas as menções do snapshot.
    ///
    /// `llm` só é usado pelo desempate semântico, quando habilitado na configuração.
    pub fn resolve(
        &self,
        snapshot: &EvidenceSnapshot,
        llm: Option<&dyn CompletionClient>,
    ) -> DisambiguationOutcome {
        let mut resolution = Resolution::new();
        let mut stats = DisambiguationStats::default();
        let mut deferred: Vec<String> = Vec::new();

        for mention in snapshot.iter() {
            // Já resolvida por propagação do parceiro
            if resolution.is_final(&mention.text) {
                continue;
            }
            let mut ctx = RuleContext {
                config: &self.config,
                llm,
                stats: &mut stats,
            };
            for rule in &self.rules {
                match rule.evaluate(mention, &mut ctx) {
                    Verdict::Finalize(tag) => {
                        debug!("[{}] '{}' → {}", rule.name(), mention.text, tag);
                        resolution.finalize(snapshot, &mention.text, tag);
                        break;
                    }
                    Verdict::Defer => {
                        debug!("[{}] '{}' adiada para o passe de aninhadas", rule.name(), mention.text);
                        deferred.push(mention.text.clone());
                        break;
                    }
                    Verdict::Pass => {}
                }
            }
        }

        nested::resolve_nested(snapshot, &mut resolution, &deferred, &mut stats);

        stats.unresolved = snapshot
            .iter()
            .filter(|m| !resolution.is_final(&m.text))
            .count() as u32;
        info!(
            "Desambiguação: {} menções, {} resolvidas, {} sem tag",
            snapshot.len(),
            resolution.final_tags().len(),
            stats.unresolved
        );

        DisambiguationOutcome { resolution, stats, deferred }
    }
}
