//! # Avaliação contra anotações de referência
//!
//! Compara as entidades preditas com as de referência por casamento exato de texto,
//! sem diferenciar caixa. Cada entidade predita é um verdadeiro positivo se aparece na
//! referência, senão um falso positivo; cada entidade de referência ausente da predição
//! é um falso negativo.
//!
//! Convenções de pontuação:
//! - contagens todas zero → precisão, revocação e F1 iguais a 1;
//! - nenhum verdadeiro positivo → tudo zero.

use std::collections::{BTreeMap, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::TagTable;
use crate::tag::Tag;

/// Contagens de casamento de uma categoria.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCounts {
    pub true_positives: u32,
    pub false_positives: u32,
    pub false_negatives: u32,
}

impl MatchCounts {
    /// Conta TP/FP/FN entre a lista predita e a de referência.
    ///
    /// Duplicatas na lista predita são contadas uma vez cada, como as da referência.
    pub fn compare<P, G>(predicted: &[P], gold: &[G]) -> Self
    where
        P: AsRef<str>,
        G: AsRef<str>,
    {
        let gold_set: HashSet<String> = gold.iter().map(|g| g.as_ref().to_lowercase()).collect();
        let predicted_set: HashSet<String> =
            predicted.iter().map(|p| p.as_ref().to_lowercase()).collect();

        let mut counts = Self::default();
        for entity in predicted {
            if gold_set.contains(&entity.as_ref().to_lowercase()) {
                counts.true_positives += 1;
            } else {
                counts.false_positives += 1;
            }
        }
        counts.false_negatives = gold
            .iter()
            .filter(|g| !predicted_set.contains(&g.as_ref().to_lowercase()))
            .count() as u32;
        counts
    }

    pub fn merge(&mut self, other: &MatchCounts) {
        self.true_positives += other.true_positives;
        self.false_positives += other.false_positives;
        self.false_negatives += other.false_negatives;
    }

    pub fn scores(&self) -> Scores {
        precision_recall_f1(self.true_positives, self.false_positives, self.false_negatives)
    }
}

/// Precisão, revocação e F1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

pub fn precision_recall_f1(tp: u32, fp: u32, fn_: u32) -> Scores {
    if tp == 0 && fp == 0 && fn_ == 0 {
        return Scores { precision: 1.0, recall: 1.0, f1: 1.0 };
    }
    if tp == 0 {
        return Scores { precision: 0.0, recall: 0.0, f1: 0.0 };
    }
    let tp = tp as f64;
    let precision = tp / (tp + fp as f64);
    let recall = tp / (tp + fn_ as f64);
    let f1 = 2.0 * precision * recall / (precision + recall);
    Scores { precision, recall, f1 }
}

/// Anotação de referência de um documento: categoria → entidades.
pub type GoldAnnotations = BTreeMap<Tag, Vec<String>>;

/// Contagens de um documento, para cada categoria.
pub fn evaluate_document(predicted: &TagTable, gold: &GoldAnnotations) -> BTreeMap<Tag, MatchCounts> {
    Tag::CATEGORIES
        .iter()
        .map(|&tag| {
            let predicted: Vec<&String> = predicted
                .get(tag)
                .map(|set| set.iter().collect())
                .unwrap_or_default();
            let expected: &[String] = gold.get(&tag).map(Vec::as_slice).unwrap_or(&[]);
            (tag, MatchCounts::compare(&predicted, expected))
        })
        .collect()
}

/// Acumulador por categoria ao longo de um corpus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusEvaluation {
    per_category: BTreeMap<Tag, MatchCounts>,
    documents: usize,
}

impl CorpusEvaluation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_document(&mut self, predicted: &TagTable, gold: &GoldAnnotations) {
        self.add_counts(&evaluate_document(predicted, gold));
    }

    fn add_counts(&mut self, counts: &BTreeMap<Tag, MatchCounts>) {
        for (tag, c) in counts {
            self.per_category.entry(*tag).or_default().merge(c);
        }
        self.documents += 1;
    }

    /// Avalia vários documentos em paralelo e acumula o resultado.
    pub fn from_documents(documents: &[(TagTable, GoldAnnotations)]) -> Self {
        let per_document: Vec<BTreeMap<Tag, MatchCounts>> = documents
            .par_iter()
            .map(|(predicted, gold)| evaluate_document(predicted, gold))
            .collect();

        let mut evaluation = Self::new();
        for counts in &per_document {
            evaluation.add_counts(counts);
        }
        debug!("Avaliação de {} documentos concluída", evaluation.documents);
        evaluation
    }

    pub fn documents(&self) -> usize {
        self.documents
    }

    pub fn counts(&self, tag: Tag) -> MatchCounts {
        self.per_category.get(&tag).copied().unwrap_or_default()
    }

    pub fn scores(&self, tag: Tag) -> Scores {
        self.counts(tag).scores()
    }

    /// Média simples das pontuações das oito categorias.
    pub fn macro_average(&self) -> Scores {
        let n = Tag::CATEGORIES.len() as f64;
        let (p, r, f) = Tag::CATEGORIES.iter().fold((0.0, 0.0, 0.0), |(p, r, f), &tag| {
            let s = self.scores(tag);
            (p + s.precision, r + s.recall, f + s.f1)
        });
        Scores { precision: p / n, recall: r / n, f1: f / n }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Resolution;
    use crate::mention::{EvidenceSnapshot, Mention};
    use crate::text::Span;

    fn table(entries: &[(&str, Tag)]) -> TagTable {
        let snapshot: EvidenceSnapshot = entries
            .iter()
            .map(|(text, _)| Mention::new(text, Span::new(0, text.len()), ""))
            .collect();
        let mut resolution = Resolution::new();
        for (text, tag) in entries {
            resolution.finalize(&snapshot, text, *tag);
        }
        resolution.table().clone()
    }

    #[test]
    fn test_case_insensitive_counts() {
        let counts = MatchCounts::compare(&["Sepsis", "lung", "fever"], &["sepsis", "Fever", "ALI"]);
        assert_eq!(counts.true_positives, 2);
        assert_eq!(counts.false_positives, 1);
        assert_eq!(counts.false_negatives, 1);
    }

    #[test]
    fn test_score_conventions() {
        assert_eq!(precision_recall_f1(0, 0, 0).f1, 1.0);
        assert_eq!(precision_recall_f1(0, 3, 2).precision, 0.0);
        let s = precision_recall_f1(2, 2, 0);
        assert_eq!(s.precision, 0.5);
        assert_eq!(s.recall, 1.0);
        assert!((s.f1 - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_corpus_accumulation() {
        let mut gold = GoldAnnotations::new();
        gold.insert(Tag::Diso, vec!["sepsis".into(), "ALI".into()]);
        let predicted = table(&[("sepsis", Tag::Diso), ("lung", Tag::Anatomy)]);

        let evaluation = CorpusEvaluation::from_documents(&[
            (predicted.clone(), gold.clone()),
            (predicted, gold),
        ]);
        assert_eq!(evaluation.documents(), 2);
        let diso = evaluation.counts(Tag::Diso);
        assert_eq!((diso.true_positives, diso.false_positives, diso.false_negatives), (2, 0, 2));
        assert_eq!(evaluation.counts(Tag::Anatomy).false_positives, 2);
        // Categorias sem predição nem referência pontuam 1
        assert_eq!(evaluation.scores(Tag::Device).f1, 1.0);
    }

    #[test]
    fn test_macro_average() {
        let mut evaluation = CorpusEvaluation::new();
        let mut gold = GoldAnnotations::new();
        gold.insert(Tag::Chem, vec!["cisplatin".into()]);
        evaluation.add_document(&table(&[]), &gold);
        // Sete categorias perfeitas e CHEM zerada
        let avg = evaluation.macro_average();
        assert!((avg.f1 - 7.0 / 8.0).abs() < 1e-9);
    }
}
