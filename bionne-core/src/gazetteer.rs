//! # Tagger Biomédico: Gazetteers e Padrões Morfológicos
//!
//! O núcleo consome um tagger biomédico pré-treinado (estilo BC5CDR) que devolve
//! spans rotulados como `DISEASE` ou `CHEMICAL`. O trait [`BiomedicalTagger`] é a
//! fronteira; [`GazetteerTagger`] é a implementação embutida:
//!
//! 1. Gazetteers de doenças e químicos (n-gramas, casamento do mais longo).
//! 2. Sufixos morfológicos típicos ("-itis", "-emia" → doença; "-mab", "-statin" → químico).

use serde::{Deserialize, Serialize};

use crate::tag::NerLabel;
use crate::text::{Span, TextAnalyzer, Token};

/// Uma entidade reconhecida pelo tagger pré-treinado
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedEntity {
    pub text: String,
    pub span: Span,
    pub label: NerLabel,
    /// Nome da regra que disparou (ex: "disease_gazetteer")
    pub source: String,
}

/// Fronteira com o modelo de NER biomédico pré-treinado.
pub trait BiomedicalTagger: Send + Sync {
    /// Entidades do documento, uma por texto de superfície (primeira ocorrência).
    fn tag(&self, analyzer: &TextAnalyzer) -> Vec<TaggedEntity>;
}

/// Tagger baseado em listas de termos e sufixos
pub struct GazetteerTagger {
    /// Doenças conhecidas (lowercase, tokenizadas)
    disease_names: Vec<Vec<String>>,
    /// Químicos e fármacos conhecidos (lowercase, tokenizados)
    chemical_names: Vec<Vec<String>>,
    disease_suffixes: Vec<String>,
    chemical_suffixes: Vec<String>,
}

impl GazetteerTagger {
    /// Tagger vazio, apenas com os sufixos morfológicos.
    pub fn new() -> Self {
        Self {
            disease_names: vec![],
            chemical_names: vec![],
            disease_suffixes: [
                "itis", "emia", "aemia", "oma", "osis", "opathy", "algia", "plegia",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            chemical_suffixes: [
                "mab", "nib", "cillin", "mycin", "statin", "pril", "sartan", "olol", "azole",
                "platin", "tide", "vir",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }

    /// Tagger com um vocabulário biomédico básico pré-carregado.
    pub fn with_defaults() -> Self {
        let mut tagger = Self::new();
        for name in [
            "diabetes", "diabetes mellitus", "type 2 diabetes mellitus", "hypertension",
            "sepsis", "pneumonia", "asthma", "cancer", "breast cancer", "lung cancer",
            "acute lung injury", "acute respiratory distress syndrome", "heart failure",
            "myocardial infarction", "stroke", "obesity", "depression", "tuberculosis",
            "covid-19", "fever", "pain", "inflammation", "fibrosis", "necrosis",
        ] {
            tagger.add_disease(name);
        }
        for name in [
            "insulin", "metformin", "cisplatin", "aspirin", "glucose", "dexamethasone",
            "lipopolysaccharide", "ethanol", "oxygen", "nitric oxide", "paracetamol",
            "doxorubicin", "vitamin d", "cholesterol", "heparin",
        ] {
            tagger.add_chemical(name);
        }
        tagger
    }

    pub fn add_disease(&mut self, name: &str) {
        let parts: Vec<String> = name.split_whitespace().map(|p| p.to_lowercase()).collect();
        if !parts.is_empty() {
            self.disease_names.push(parts);
        }
    }

    pub fn add_chemical(&mut self, name: &str) {
        let parts: Vec<String> = name.split_whitespace().map(|p| p.to_lowercase()).collect();
        if !parts.is_empty() {
            self.chemical_names.push(parts);
        }
    }

    /// Maior casamento de gazetteer começando no token `i`: (tamanho, rótulo).
    fn longest_match(&self, words: &[&Token], i: usize) -> Option<(usize, NerLabel)> {
        let mut best: Option<(usize, NerLabel)> = None;
        let lists = [
            (&self.disease_names, NerLabel::Disease),
            (&self.chemical_names, NerLabel::Chemical),
        ];
        for (names, label) in lists {
            for parts in names {
                if i + parts.len() > words.len() {
                    continue;
                }
                let matches = parts
                    .iter()
                    .enumerate()
                    .all(|(j, part)| words[i + j].text.to_lowercase() == *part);
                if matches && best.map(|(len, _)| parts.len() > len).unwrap_or(true) {
                    best = Some((parts.len(), label));
                }
            }
        }
        best
    }

    fn suffix_label(&self, word: &str) -> Option<NerLabel> {
        let lower = word.to_lowercase();
        if lower.chars().count() < 6 || !lower.chars().all(char::is_alphabetic) {
            return None;
        }
        if self.disease_suffixes.iter().any(|s| lower.ends_with(s.as_str())) {
            return Some(NerLabel::Disease);
        }
        if self.chemical_suffixes.iter().any(|s| lower.ends_with(s.as_str())) {
            return Some(NerLabel::Chemical);
        }
        None
    }
}

impl Default for GazetteerTagger {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl BiomedicalTagger for GazetteerTagger {
    fn tag(&self, analyzer: &TextAnalyzer) -> Vec<TaggedEntity> {
        let text = analyzer.text();
        // Pontuação não participa dos n-gramas
        let words: Vec<&Token> = analyzer
            .tokens()
            .iter()
            .filter(|t| t.text.chars().any(char::is_alphanumeric))
            .collect();

        let mut entities: Vec<TaggedEntity> = Vec::new();
        let mut i = 0;
        while i < words.len() {
            let (len, label, source) = if let Some((len, label)) = self.longest_match(&words, i) {
                let source = match label {
                    NerLabel::Disease => "disease_gazetteer",
                    NerLabel::Chemical => "chemical_gazetteer",
                };
                (len, label, source)
            } else if let Some(label) = self.suffix_label(&words[i].text) {
                (1, label, "suffix_pattern")
            } else {
                i += 1;
                continue;
            };

            let span = Span::new(words[i].start, words[i + len - 1].end);
            let surface = span.text(text).to_string();
            if !entities.iter().any(|e| e.text == surface) {
                entities.push(TaggedEntity {
                    text: surface,
                    span,
                    label,
                    source: source.to_string(),
                });
            }
            i += len;
        }
        entities
    }
}
