//! Conversão das respostas do tagger LLM em menções ancoradas no texto.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::text::{flip_first_case, Span, TextAnalyzer};

/// Entidade extraída das amostras do LLM e ancorada no documento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmMention {
    /// Texto do span ancorado (chave no registro de menções)
    pub text: String,
    pub span: Span,
    /// Número de amostras distintas que citaram a entidade
    pub mentions: u32,
}

/// Equivalente a `str.islower()`: há letras com caixa e nenhuma é maiúscula.
fn is_lowercase_word(s: &str) -> bool {
    s.chars().any(char::is_lowercase) && !s.chars().any(char::is_uppercase)
}

/// Entrada descartada antes de qualquer busca no texto.
fn is_noise(raw: &str) -> bool {
    raw.chars().count() <= 1
        || raw == "None"
        || raw == "none"
        || (raw.chars().count() <= 2 && is_lowercase_word(raw))
}

/// Processa as amostras de uma chamada few-shot.
///
/// Cada amostra é uma lista separada por `;`. Entradas que não aparecem no texto são
/// tentadas de novo com a caixa da primeira letra invertida. A ordem de saída é a ordem
/// da primeira citação.
pub fn process_llm_output(analyzer: &TextAnalyzer, samples: &[String]) -> Vec<LlmMention> {
    let text = analyzer.text();
    let mut cited: Vec<(String, Vec<usize>)> = Vec::new();

    for (sample_idx, sample) in samples.iter().enumerate() {
        for raw in sample.trim().split(';') {
            if is_noise(raw) {
                continue;
            }
            let entity = raw.trim();
            if entity.is_empty() {
                continue;
            }
            let found = if text.contains(entity) {
                entity.to_string()
            } else {
                let flipped = flip_first_case(entity);
                if !text.contains(&flipped) {
                    continue;
                }
                flipped
            };
            match cited.iter_mut().find(|(name, _)| *name == found) {
                Some((_, seen)) => {
                    if !seen.contains(&sample_idx) {
                        seen.push(sample_idx);
                    }
                }
                None => cited.push((found, vec![sample_idx])),
            }
        }
    }

    let mut result: Vec<LlmMention> = Vec::new();
    for (entity, seen) in cited {
        let Some(span) = analyzer.anchor(&entity) else {
            debug!("Entidade do LLM sem âncora no texto: '{}'", entity);
            continue;
        };
        let anchored = span.text(text).to_string();
        if result.iter().any(|m| m.text == anchored) {
            continue;
        }
        result.push(LlmMention {
            text: anchored,
            span,
            mentions: seen.len() as u32,
        });
    }
    result
}
