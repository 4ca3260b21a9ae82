//! # Análise Textual: Tokens, Sentenças, Spans e Siglas
//!
//! Implementação embutida do "pipeline linguístico" consumido pelo núcleo:
//!
//! - **Tokenização** com offsets de byte preservados (para ancorar menções no texto).
//! - **Segmentação de sentenças** via `unicode-segmentation` (UAX #29).
//! - **`span_of`**: localiza uma substring e a alinha às fronteiras de token, em modo
//!   estrito ou expandindo até os tokens que a contêm.
//! - **Siglas entre parênteses**: "acute lung injury (ALI)" → `(ALI, acute lung injury)`.
//! - **Heurísticas numéricas** usadas nas flags de menção.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use bionne_core::text::{Alignment, TextAnalyzer};
//!
//! let analyzer = TextAnalyzer::new("Patients with acute lung injury (ALI) were enrolled.");
//! let span = analyzer.span_of("lung inj", Alignment::Expand).unwrap();
//! assert_eq!(span.text(analyzer.text()), "lung injury");
//!
//! let pairs = analyzer.detect_abbreviations();
//! assert_eq!(pairs[0].short_form, "ALI");
//! assert_eq!(pairs[0].long_form, "acute lung injury");
//! ```

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Um token extraído do texto original.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    /// O texto do token (ex: "injury", "(", "2").
    pub text: String,
    /// Índice de byte inicial no texto original (inclusive).
    pub start: usize,
    /// Índice de byte final no texto original (exclusivo).
    pub end: usize,
    /// Índice sequencial do token na lista (0, 1, 2...).
    pub index: usize,
}

/// Intervalo de bytes `[start, end)` no texto do documento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Recorta o span do texto de origem (vazio se o span for inválido para esse texto).
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, other: &Span) -> bool {
        other.start >= self.start && other.end <= self.end
    }
}

/// Uma sentença do documento com seus offsets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentence {
    pub text: String,
    pub span: Span,
}

/// Modo de alinhamento de um intervalo às fronteiras de token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// O intervalo precisa começar e terminar exatamente em fronteiras de token.
    Strict,
    /// O intervalo é expandido até cobrir os tokens que toca.
    Expand,
}

/// Par sigla / forma longa detectado no texto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbbreviationPair {
    pub short_form: String,
    pub long_form: String,
}

/// Abreviações comuns em textos científicos cujo ponto não encerra o token
const ABBREVIATIONS: &[&str] = &[
    "e.g", "i.e", "al", "vs", "Fig", "Figs", "Dr", "Ref", "approx", "No", "resp", "ca",
];

/// Palavras numéricas tratadas como números (equivalente ao `like_num` do spaCy)
const NUMBER_WORDS: &[&str] = &[
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
    "nineteen", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
    "hundred", "thousand", "million", "billion",
];

/// Documento pré-processado: tokens e sentenças com offsets.
///
/// Equivale ao `Doc` de uma biblioteca de NLP: construído uma vez por documento
/// e consultado pelo agregador e pelo pipeline.
pub struct TextAnalyzer {
    text: String,
    tokens: Vec<Token>,
    sentences: Vec<Sentence>,
}

impl TextAnalyzer {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            tokens: tokenize(text),
            sentences: segment_sentences(text),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    /// Tokens inteiramente contidos no span.
    pub fn tokens_in(&self, span: Span) -> &[Token] {
        let first = self.tokens.iter().position(|t| t.start >= span.start);
        match first {
            Some(first) => {
                let count = self.tokens[first..]
                    .iter()
                    .take_while(|t| t.end <= span.end)
                    .count();
                &self.tokens[first..first + count]
            }
            None => &[],
        }
    }

    /// Alinha `[start, end)` às fronteiras de token.
    ///
    /// Retorna `None` se o intervalo for vazio, não tocar nenhum token ou,
    /// em modo estrito, não coincidir com fronteiras de token.
    pub fn char_span(&self, start: usize, end: usize, alignment: Alignment) -> Option<Span> {
        if start >= end || end > self.text.len() {
            return None;
        }
        match alignment {
            Alignment::Strict => {
                let starts = self.tokens.iter().any(|t| t.start == start);
                let ends = self.tokens.iter().any(|t| t.end == end);
                (starts && ends).then(|| Span::new(start, end))
            }
            Alignment::Expand => {
                let first = self.tokens.iter().find(|t| t.end > start)?;
                let last = self.tokens.iter().rev().find(|t| t.start < end)?;
                if first.start > last.start {
                    return None;
                }
                Some(Span::new(first.start.min(start), last.end.max(end)))
            }
        }
    }

    /// Localiza a primeira ocorrência de `needle` e a alinha aos tokens.
    pub fn span_of(&self, needle: &str, alignment: Alignment) -> Option<Span> {
        if needle.is_empty() {
            return None;
        }
        let start = self.text.find(needle)?;
        self.char_span(start, start + needle.len(), alignment)
    }

    /// Localiza `needle` preferindo uma ocorrência alinhada estritamente;
    /// na falta dela, expande a primeira ocorrência que tocar algum token.
    pub fn anchor(&self, needle: &str) -> Option<Span> {
        if needle.is_empty() {
            return None;
        }
        let offsets: Vec<usize> = self.text.match_indices(needle).map(|(i, _)| i).collect();
        offsets
            .iter()
            .find_map(|&s| self.char_span(s, s + needle.len(), Alignment::Strict))
            .or_else(|| {
                offsets
                    .iter()
                    .find_map(|&s| self.char_span(s, s + needle.len(), Alignment::Expand))
            })
    }

    /// Sentença que contém o span; na falta dela, o próprio texto do span.
    pub fn sentence_of(&self, span: Span) -> String {
        self.sentences
            .iter()
            .find(|s| s.span.contains(&span))
            .map(|s| s.text.clone())
            .unwrap_or_else(|| span.text(&self.text).to_string())
    }

    /// Detecta pares `forma longa (SIGLA)`.
    ///
    /// A sigla deve começar com maiúscula e ter menos de três palavras. A forma longa
    /// são as N palavras anteriores (N = tamanho da sigla) quando suas iniciais
    /// formam a sigla; caso contrário, apenas a palavra imediatamente anterior.
    pub fn detect_abbreviations(&self) -> Vec<AbbreviationPair> {
        static BRACKET: OnceLock<Regex> = OnceLock::new();
        let re = BRACKET.get_or_init(|| Regex::new(r"\([A-Z].*?\)").expect("regex válida"));

        let mut pairs: Vec<AbbreviationPair> = Vec::new();
        for m in re.find_iter(&self.text) {
            let inner = &m.as_str()[1..m.as_str().len() - 1];
            if word_count(inner) >= 3 || pairs.iter().any(|p| p.short_form == inner) {
                continue;
            }
            let Some(bracket_at) = self.text.find(&format!("({})", inner)) else {
                continue;
            };
            let preceding: Vec<&str> = self.text[..bracket_at].split_whitespace().collect();
            let letter_count = inner.chars().count();
            let window = &preceding[preceding.len().saturating_sub(letter_count)..];
            let Some(last) = window.last() else {
                continue;
            };
            let initials: String = window.iter().filter_map(|w| w.chars().next()).collect();
            let long_form = if initials.to_lowercase() == inner.to_lowercase() {
                window.join(" ")
            } else {
                last.to_string()
            };
            pairs.push(AbbreviationPair {
                short_form: inner.to_string(),
                long_form,
            });
        }
        pairs
    }
}

/// Tokeniza um texto em palavras, números e pontuação, preservando offsets de byte.
///
/// - Hífens internos ficam no token ("IL-6", "COVID-19").
/// - Números decimais ficam inteiros ("2.5").
/// - Abreviações conhecidas mantêm o ponto ("e.g.", "Fig.").
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current_start = 0;
    let mut current_text = String::new();
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut i = 0;

    while i < chars.len() {
        let (byte_pos, ch) = chars[i];

        if ch.is_alphanumeric() || (ch == '-' && !current_text.is_empty()) {
            if current_text.is_empty() {
                current_start = byte_pos;
            }
            current_text.push(ch);
        } else if ch == '.' && !current_text.is_empty() {
            let is_abbrev = ABBREVIATIONS.contains(&current_text.as_str());
            let current_is_num = current_text.chars().all(char::is_numeric);
            let next = chars.get(i + 1).map(|(_, c)| *c);
            let next_is_num = next.map(|c| c.is_numeric()).unwrap_or(false);
            // "e.g." e "i.e." chegam aqui como "e" seguido de letra
            let inner_letter_dot = current_text.chars().count() == 1
                && next.map(|c| c.is_alphabetic()).unwrap_or(false);

            if is_abbrev || (current_is_num && next_is_num) || inner_letter_dot {
                current_text.push('.');
            } else {
                flush_token(&mut tokens, &mut current_text, current_start, byte_pos);
                push_token(&mut tokens, ".".to_string(), byte_pos, byte_pos + 1);
            }
        } else if ch.is_whitespace() {
            flush_token(&mut tokens, &mut current_text, current_start, byte_pos);
        } else {
            flush_token(&mut tokens, &mut current_text, current_start, byte_pos);
            push_token(&mut tokens, ch.to_string(), byte_pos, byte_pos + ch.len_utf8());
        }
        i += 1;
    }
    flush_token(&mut tokens, &mut current_text, current_start, text.len());

    for (i, token) in tokens.iter_mut().enumerate() {
        token.index = i;
    }
    tokens
}

/// Fecha o token acumulado e adiciona à lista (se não vazio)
fn flush_token(tokens: &mut Vec<Token>, text: &mut String, start: usize, end: usize) {
    if !text.is_empty() {
        tokens.push(Token {
            text: text.clone(),
            start,
            end,
            index: 0,
        });
        text.clear();
    }
}

/// Adiciona um token de pontuação diretamente
fn push_token(tokens: &mut Vec<Token>, text: String, start: usize, end: usize) {
    tokens.push(Token {
        text,
        start,
        end,
        index: 0,
    });
}

/// Divide o texto em sentenças (UAX #29), descartando espaços nas bordas.
pub fn segment_sentences(text: &str) -> Vec<Sentence> {
    text.split_sentence_bound_indices()
        .filter_map(|(offset, raw)| {
            let trimmed_start = raw.len() - raw.trim_start().len();
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return None;
            }
            let start = offset + trimmed_start;
            Some(Sentence {
                text: trimmed.to_string(),
                span: Span::new(start, start + trimmed.len()),
            })
        })
        .collect()
}

/// Número de palavras separadas por espaço.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Palavras em minúsculas separadas por espaço.
pub fn lowercase_words(text: &str) -> Vec<String> {
    text.split_whitespace().map(|w| w.to_lowercase()).collect()
}

/// Inverte a caixa da primeira letra ("Insulin" ↔ "insulin").
pub fn flip_first_case(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => first.to_lowercase().chain(chars).collect(),
        Some(first) if first.is_lowercase() => first.to_uppercase().chain(chars).collect(),
        _ => text.to_string(),
    }
}

/// Verdadeiro se houver ao menos uma letra e todas as letras forem maiúsculas ("ALI", "IL-6").
pub fn is_all_caps(text: &str) -> bool {
    let mut has_cased = false;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            has_cased = true;
        }
    }
    has_cased
}

/// O token se parece com um número: dígitos (com `.`/`,` internos), frações ou
/// palavras numéricas ("five").
pub fn like_num(token: &str) -> bool {
    let stripped = token.trim_start_matches(['+', '-', '~', '±']);
    if stripped.is_empty() {
        return false;
    }
    let cleaned: String = stripped.chars().filter(|c| *c != ',' && *c != '.').collect();
    if !cleaned.is_empty() && cleaned.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    if let Some((num, den)) = stripped.split_once('/') {
        if !num.is_empty()
            && !den.is_empty()
            && num.chars().all(|c| c.is_ascii_digit())
            && den.chars().all(|c| c.is_ascii_digit())
        {
            return true;
        }
    }
    NUMBER_WORDS.contains(&stripped.to_lowercase().as_str())
}

/// Verdadeiro se a menção inteira é um número ("42") ou um único token numérico.
pub fn looks_numeric(text: &str, tokens: &[Token]) -> bool {
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    tokens.len() == 1 && like_num(&tokens[0].text)
}

/// Verdadeiro se algum token da menção contém dígito ou se parece com número.
pub fn contains_numeric(tokens: &[Token]) -> bool {
    tokens
        .iter()
        .any(|t| like_num(&t.text) || t.text.chars().any(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_keeps_hyphen_and_decimal() {
        let tokens = tokenize("IL-6 rose 2.5 fold.");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["IL-6", "rose", "2.5", "fold", "."]);
        assert_eq!(tokens[2].start, 10);
        assert_eq!(tokens[2].end, 13);
    }

    #[test]
    fn test_tokenize_brackets() {
        let tokens = tokenize("injury (ALI)");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["injury", "(", "ALI", ")"]);
    }

    #[test]
    fn test_segment_sentences() {
        let sentences = segment_sentences("Sepsis is common. It kills many patients.");
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0].text, "Sepsis is common.");
        assert_eq!(sentences[1].text, "It kills many patients.");
        assert_eq!(sentences[1].span.start, 18);
    }

    #[test]
    fn test_span_of_strict_and_expand() {
        let analyzer = TextAnalyzer::new("The hepatocytes were damaged.");
        assert!(analyzer.span_of("hepato", Alignment::Strict).is_none());
        let span = analyzer.span_of("hepato", Alignment::Expand).unwrap();
        assert_eq!(span.text(analyzer.text()), "hepatocytes");
        let strict = analyzer.span_of("hepatocytes", Alignment::Strict).unwrap();
        assert_eq!(strict, span);
    }

    #[test]
    fn test_anchor_prefers_aligned_occurrence() {
        let analyzer = TextAnalyzer::new("cellular cell counts");
        let span = analyzer.anchor("cell").unwrap();
        assert_eq!(span.text(analyzer.text()), "cell");
        assert_eq!(span.start, 9);
    }

    #[test]
    fn test_sentence_of_span() {
        let analyzer = TextAnalyzer::new("Sepsis is common. Cisplatin was given.");
        let span = analyzer.span_of("Cisplatin", Alignment::Strict).unwrap();
        assert_eq!(analyzer.sentence_of(span), "Cisplatin was given.");
    }

    #[test]
    fn test_detect_abbreviations_initials() {
        let analyzer =
            TextAnalyzer::new("We studied acute lung injury (ALI) and chronic kidney disease (CKD).");
        let pairs = analyzer.detect_abbreviations();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].long_form, "acute lung injury");
        assert_eq!(pairs[1].short_form, "CKD");
        assert_eq!(pairs[1].long_form, "chronic kidney disease");
    }

    #[test]
    fn test_detect_abbreviations_fallback_to_previous_word() {
        let analyzer = TextAnalyzer::new("Levels of interleukin (IL6) increased.");
        let pairs = analyzer.detect_abbreviations();
        assert_eq!(pairs[0].long_form, "interleukin");
    }

    #[test]
    fn test_numeric_heuristics() {
        assert!(like_num("12"));
        assert!(like_num("1,000"));
        assert!(like_num("3/4"));
        assert!(like_num("five"));
        assert!(!like_num("IL-6"));
        let tokens = tokenize("type 2 diabetes");
        assert!(contains_numeric(&tokens));
        assert!(!looks_numeric("type 2 diabetes", &tokens));
        assert!(looks_numeric("42", &tokenize("42")));
    }

    #[test]
    fn test_case_helpers() {
        assert!(is_all_caps("ALI"));
        assert!(is_all_caps("IL-6"));
        assert!(!is_all_caps("Ali"));
        assert!(!is_all_caps("123"));
        assert_eq!(flip_first_case("Insulin"), "insulin");
        assert_eq!(flip_first_case("insulin"), "Insulin");
    }
}
