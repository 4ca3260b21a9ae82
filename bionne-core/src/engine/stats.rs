//! Contadores de diagnóstico de uma execução do motor.

use serde::{Deserialize, Serialize};

/// Contadores devolvidos por documento; somados pelo chamador com [`merge`](Self::merge).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisambiguationStats {
    pub manual_override: u32,
    pub exact_match: u32,
    pub injury: u32,
    pub ner_disease: u32,
    pub ner_chemical: u32,
    pub intersection: u32,
    pub semantic_search_succeeded: u32,
    pub semantic_search_ambiguous: u32,
    pub semantic_search_failed: u32,
    pub custom_findings: u32,
    /// Menções frequentes que nenhuma regra resolveu
    pub unmatched_freq_entity: u32,
    pub matched_nested: u32,
    /// Menções sem tag final ao término do documento
    pub unresolved: u32,
}

impl DisambiguationStats {
    pub fn merge(&mut self, other: &DisambiguationStats) {
        self.manual_override += other.manual_override;
        self.exact_match += other.exact_match;
        self.injury += other.injury;
        self.ner_disease += other.ner_disease;
        self.ner_chemical += other.ner_chemical;
        self.intersection += other.intersection;
        self.semantic_search_succeeded += other.semantic_search_succeeded;
        self.semantic_search_ambiguous += other.semantic_search_ambiguous;
        self.semantic_search_failed += other.semantic_search_failed;
        self.custom_findings += other.custom_findings;
        self.unmatched_freq_entity += other.unmatched_freq_entity;
        self.matched_nested += other.matched_nested;
        self.unresolved += other.unresolved;
    }
}
