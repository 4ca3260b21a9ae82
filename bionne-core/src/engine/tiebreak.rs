//! Desempate semântico via LLM.
//!
//! A resposta de cada amostra é reduzida à primeira palavra-chave de opção que aparece
//! nela (menor offset, sem diferenciar caixa). As amostras são então combinadas:
//! unanimidade, divergência (vence a primeira amostra) ou nenhuma resposta útil.

use serde::{Deserialize, Serialize};

use crate::tag::Tag;

/// Palavra-chave de cada opção e a tag correspondente
const OPTION_KEYWORDS: [(&str, Tag); 5] = [
    ("physiology", Tag::Phys),
    ("anatomy", Tag::Anatomy),
    ("disease", Tag::Diso),
    ("chemical", Tag::Chem),
    ("other", Tag::Other),
];

/// Categorias que o desempate pode atribuir
pub const TIEBREAK_TAGS: [Tag; 3] = [Tag::Anatomy, Tag::Phys, Tag::Chem];

/// Opção escolhida em uma única resposta.
pub fn parse_choice(response: &str) -> Option<Tag> {
    let lower = response.to_lowercase();
    OPTION_KEYWORDS
        .iter()
        .filter_map(|(keyword, tag)| lower.find(keyword).map(|at| (at, *tag)))
        .min_by_key(|(at, _)| *at)
        .map(|(_, tag)| tag)
}

/// Combinação das amostras.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TiebreakOutcome {
    /// Ao menos duas amostras com opção reconhecida, todas iguais
    Unanimous(Tag),
    /// Amostras divergentes; carrega a escolha da primeira
    Ambiguous(Tag),
    /// Nenhuma amostra trouxe opção reconhecível
    NoAnswer,
}

pub fn decide(samples: &[String]) -> TiebreakOutcome {
    let choices: Vec<Tag> = samples.iter().filter_map(|s| parse_choice(s)).collect();
    match choices.first() {
        None => TiebreakOutcome::NoAnswer,
        Some(&first) if choices.len() >= 2 && choices.iter().all(|c| *c == first) => {
            TiebreakOutcome::Unanimous(first)
        }
        Some(&first) => TiebreakOutcome::Ambiguous(first),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_earliest_keyword_wins() {
        assert_eq!(parse_choice("b. Physiology, not anatomy"), Some(Tag::Phys));
        assert_eq!(parse_choice("The answer is a. ANATOMY (physiology?)"), Some(Tag::Anatomy));
        assert_eq!(parse_choice("d. Chemical"), Some(Tag::Chem));
        assert_eq!(parse_choice("I am not sure"), None);
    }

    #[test]
    fn test_outcomes() {
        assert_eq!(decide(&samples(&["a. Anatomy", "Anatomy"])), TiebreakOutcome::Unanimous(Tag::Anatomy));
        assert_eq!(decide(&samples(&["d. Chemical", "b. Physiology"])), TiebreakOutcome::Ambiguous(Tag::Chem));
        assert_eq!(decide(&samples(&["???", "c. Disease"])), TiebreakOutcome::Ambiguous(Tag::Diso));
        assert_eq!(decide(&samples(&["", "no idea"])), TiebreakOutcome::NoAnswer);
        assert_eq!(decide(&[]), TiebreakOutcome::NoAnswer);
    }

    #[test]
    fn test_single_parsed_sample_is_not_unanimous() {
        assert_eq!(decide(&samples(&["I cannot tell", "a. Anatomy"])), TiebreakOutcome::Ambiguous(Tag::Anatomy));
        assert_eq!(decide(&samples(&["a. Anatomy"])), TiebreakOutcome::Ambiguous(Tag::Anatomy));
        assert_eq!(
            decide(&samples(&["a. Anatomy", "unclear", "Anatomy"])),
            TiebreakOutcome::Unanimous(Tag::Anatomy)
        );
    }
}
