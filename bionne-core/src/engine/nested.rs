//! Passe de entidades aninhadas.
//!
//! Uma menção frequente que nenhuma regra resolveu herda a tag da maior menção já
//! resolvida contida nela, desde que:
//!
//! - a menção contida não seja sigla;
//! - seu texto apareça na menção (sem diferenciar caixa);
//! - sua tag final esteja entre as tags do LLM da menção;
//! - as duas compartilhem ao menos uma palavra inteira.
//!
//! O último critério impede casamentos só de substring ("cell" dentro de "cellular").
//! Empates de tamanho são decididos pelo menor texto em ordem lexicográfica.

use std::collections::HashSet;

use tracing::debug;

use super::resolution::Resolution;
use super::stats::DisambiguationStats;
use crate::mention::{EvidenceSnapshot, Mention};
use crate::tag::Tag;
use crate::text::lowercase_words;

/// Melhor menção resolvida contida em `mention`, com sua tag.
pub fn best_nested_match<'s>(
    snapshot: &'s EvidenceSnapshot,
    resolution: &Resolution,
    mention: &Mention,
) -> Option<(&'s Mention, Tag)> {
    let lower = mention.text.to_lowercase();
    let words: HashSet<String> = lowercase_words(&mention.text).into_iter().collect();

    let mut best: Option<(&Mention, Tag, usize)> = None;
    for candidate in snapshot.iter() {
        if candidate.text == mention.text || candidate.is_abbreviation {
            continue;
        }
        let Some(tag) = resolution.final_tag(&candidate.text) else {
            continue;
        };
        if !mention.has_llm_tag(tag) || !lower.contains(&candidate.text.to_lowercase()) {
            continue;
        }
        if !lowercase_words(&candidate.text).iter().any(|w| words.contains(w)) {
            continue;
        }
        let length = candidate.text.chars().count();
        let better = match best {
            None => true,
            Some((current, _, current_len)) => {
                length > current_len || (length == current_len && candidate.text < current.text)
            }
        };
        if better {
            best = Some((candidate, tag, length));
        }
    }
    best.map(|(m, tag, _)| (m, tag))
}

/// Resolve os candidatos adiados, em ordem.
///
/// Um candidato resolvido aqui já pode servir de menção contida para os seguintes.
pub fn resolve_nested(
    snapshot: &EvidenceSnapshot,
    resolution: &mut Resolution,
    candidates: &[String],
    stats: &mut DisambiguationStats,
) {
    for text in candidates {
        if resolution.is_final(text) {
            continue;
        }
        let Some(mention) = snapshot.get(text) else {
            continue;
        };
        if let Some((inner, tag)) = best_nested_match(snapshot, resolution, mention) {
            debug!("Entidade aninhada: '{}' casou com '{}' ({})", text, inner.text, tag);
            resolution.finalize(snapshot, text, tag);
            stats.matched_nested += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::Span;

    fn mention(text: &str, llm: &[Tag]) -> Mention {
        let mut m = Mention::new(text, Span::new(0, text.len()), "");
        m.llm_tags.extend(llm.iter().copied());
        m
    }

    #[test]
    fn test_compound_inherits_inner_tag() {
        let snapshot: EvidenceSnapshot = [
            mention("diabetes", &[Tag::Diso]),
            mention("type 2 diabetes mellitus", &[Tag::Diso, Tag::Finding]),
        ]
        .into_iter()
        .collect();
        let mut resolution = Resolution::new();
        resolution.finalize(&snapshot, "diabetes", Tag::Diso);
        let mut stats = DisambiguationStats::default();
        resolve_nested(&snapshot, &mut resolution, &["type 2 diabetes mellitus".into()], &mut stats);
        assert_eq!(resolution.final_tag("type 2 diabetes mellitus"), Some(Tag::Diso));
        assert_eq!(stats.matched_nested, 1);
    }

    #[test]
    fn test_substring_without_shared_word_is_rejected() {
        let snapshot: EvidenceSnapshot = [
            mention("cell", &[]),
            mention("cellular", &[Tag::Anatomy]),
        ]
        .into_iter()
        .collect();
        let mut resolution = Resolution::new();
        resolution.finalize(&snapshot, "cell", Tag::Anatomy);
        let mut stats = DisambiguationStats::default();
        resolve_nested(&snapshot, &mut resolution, &["cellular".into()], &mut stats);
        assert!(!resolution.is_final("cellular"));
        assert_eq!(stats.matched_nested, 0);
    }

    #[test]
    fn test_inner_tag_must_be_proposed_by_llm() {
        let snapshot: EvidenceSnapshot = [
            mention("lung", &[]),
            mention("lung tissue damage", &[Tag::Diso]),
        ]
        .into_iter()
        .collect();
        let mut resolution = Resolution::new();
        resolution.finalize(&snapshot, "lung", Tag::Anatomy);
        assert!(best_nested_match(&snapshot, &resolution, snapshot.get("lung tissue damage").unwrap()).is_none());
    }

    #[test]
    fn test_longest_then_lexicographic() {
        let snapshot: EvidenceSnapshot = [
            mention("lung", &[]),
            mention("acute lung", &[]),
            mention("lung edema", &[]),
            mention("acute lung edema", &[Tag::Diso, Tag::Anatomy]),
        ]
        .into_iter()
        .collect();
        let mut resolution = Resolution::new();
        resolution.finalize(&snapshot, "lung", Tag::Anatomy);
        resolution.finalize(&snapshot, "lung edema", Tag::Diso);
        resolution.finalize(&snapshot, "acute lung", Tag::Anatomy);
        let (inner, tag) =
            best_nested_match(&snapshot, &resolution, snapshot.get("acute lung edema").unwrap()).unwrap();
        assert_eq!(inner.text, "acute lung");
        assert_eq!(tag, Tag::Anatomy);
    }

    #[test]
    fn test_abbreviations_never_match() {
        let mut abbr = mention("ALI", &[]);
        abbr.is_abbreviation = true;
        let snapshot: EvidenceSnapshot = [abbr, mention("ALI model", &[Tag::Diso])].into_iter().collect();
        let mut resolution = Resolution::new();
        resolution.finalize(&snapshot, "ALI", Tag::Diso);
        assert!(best_nested_match(&snapshot, &resolution, snapshot.get("ALI model").unwrap()).is_none());
    }
}
