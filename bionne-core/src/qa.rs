//! # Normalização de respostas de perguntas biomédicas
//!
//! O LLM responde em texto livre no formato
//!
//! ```text
//! <resposta ideal> Exact answer: <resposta exata>
//! ```
//!
//! Este módulo converte essa saída no formato estrito esperado por tipo de pergunta e
//! combina várias amostras em uma resposta final:
//!
//! - **yesno**: a resposta exata é `yes` ou `no`; as amostras votam por maioria.
//! - **factoid** / **list**: entidades separadas por `;`, sem marcadores de lista; as
//!   amostras de `list` são ranqueadas por frequência.
//! - **summary**: apenas a resposta ideal.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

const EXACT_MARKER: &str = "Exact answer:";
const IDEAL_MAX_WORDS: usize = 200;
const FACTOID_MAX_ITEMS: usize = 5;
const LIST_MAX_ITEMS: usize = 100;
const LIST_DEFAULT_ITEMS: usize = 10;
const LIST_MAX_ITEM_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Yesno,
    Factoid,
    List,
    Summary,
}

impl QuestionType {
    pub fn name(&self) -> &'static str {
        match self {
            QuestionType::Yesno => "yesno",
            QuestionType::Factoid => "factoid",
            QuestionType::List => "list",
            QuestionType::Summary => "summary",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "yesno" => Some(QuestionType::Yesno),
            "factoid" => Some(QuestionType::Factoid),
            "list" => Some(QuestionType::List),
            "summary" => Some(QuestionType::Summary),
            _ => None,
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YesNo {
    Yes,
    No,
}

/// Resposta exata: `"yes"`/`"no"` ou lista de entidades `[["a"], ["b"]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExactAnswer {
    Decision(YesNo),
    Entities(Vec<Vec<String>>),
}

impl ExactAnswer {
    pub fn decision(&self) -> Option<YesNo> {
        match self {
            ExactAnswer::Decision(d) => Some(*d),
            ExactAnswer::Entities(_) => None,
        }
    }

    /// Entidades na ordem da resposta (vazio para yes/no).
    pub fn entities(&self) -> Vec<&str> {
        match self {
            ExactAnswer::Decision(_) => Vec::new(),
            ExactAnswer::Entities(items) => items
                .iter()
                .filter_map(|group| group.first().map(String::as_str))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaAnswer {
    pub ideal: String,
    pub exact: Option<ExactAnswer>,
}

/// Posição do primeiro trecho corrompido (`##` ou três crases), se houver.
pub fn garbled_position(text: &str) -> Option<usize> {
    [text.find("##"), text.find("```")].into_iter().flatten().min()
}

/// Texto até o primeiro trecho corrompido.
pub fn strip_garbled(text: &str) -> &str {
    match garbled_position(text) {
        Some(at) => &text[..at],
        None => text,
    }
}

/// As primeiras 200 palavras do texto.
pub fn first_words(text: &str) -> String {
    let trimmed = text.trim();
    let words: Vec<&str> = trimmed.split_whitespace().collect();
    if words.len() < IDEAL_MAX_WORDS {
        trimmed.to_string()
    } else {
        words[..IDEAL_MAX_WORDS].join(" ")
    }
}

/// Divide por `;`, descartando itens vazios.
pub fn split_entities(payload: &str) -> Vec<String> {
    payload
        .trim()
        .split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_list_marker(entity: &str) -> String {
    static NUMBERING: OnceLock<Regex> = OnceLock::new();
    let re = NUMBERING.get_or_init(|| Regex::new(r"^[0-9]+[.)]").expect("regex válida"));

    if let Some(rest) = entity.strip_prefix('*').or_else(|| entity.strip_prefix('-')) {
        return rest.trim().to_string();
    }
    match re.find(entity) {
        Some(m) => entity[m.end()..].trim().to_string(),
        None => entity.to_string(),
    }
}

/// Extrai a resposta exata do trecho após `Exact answer:`.
///
/// Para yes/no, `yes` é procurado antes de `no`, sem diferenciar caixa. Resumos não
/// têm resposta exata.
pub fn format_exact_answer(payload: &str, kind: QuestionType) -> Option<ExactAnswer> {
    let payload = payload.trim();
    match kind {
        QuestionType::Yesno => {
            let lower = payload.to_lowercase();
            if lower.contains("yes") {
                Some(ExactAnswer::Decision(YesNo::Yes))
            } else if lower.contains("no") {
                Some(ExactAnswer::Decision(YesNo::No))
            } else {
                None
            }
        }
        QuestionType::Factoid | QuestionType::List => {
            let mut seen = HashSet::new();
            let mut entities: Vec<Vec<String>> = split_entities(payload)
                .iter()
                .map(|e| strip_list_marker(e))
                .filter(|e| seen.insert(e.clone()))
                .map(|e| vec![e])
                .collect();
            let cap = if kind == QuestionType::Factoid { FACTOID_MAX_ITEMS } else { LIST_MAX_ITEMS };
            entities.truncate(cap);
            Some(ExactAnswer::Entities(entities))
        }
        QuestionType::Summary => None,
    }
}

/// Converte uma resposta do LLM em [`QaAnswer`].
///
/// O segundo valor indica que a amostra deve ser gerada de novo: a resposta ideal de
/// uma pergunta yes/no não pode ser só "yes" ou "no".
pub fn process_response(text: &str, kind: QuestionType) -> (QaAnswer, bool) {
    let text = strip_garbled(text);
    if kind == QuestionType::Summary {
        return (QaAnswer { ideal: first_words(text), exact: None }, false);
    }

    let mut answer = match text.find(EXACT_MARKER) {
        Some(at) => QaAnswer {
            ideal: first_words(&text[..at]),
            exact: format_exact_answer(&text[at + EXACT_MARKER.len()..], kind),
        },
        None => QaAnswer { ideal: first_words(text), exact: None },
    };

    let mut regenerate = false;
    if kind == QuestionType::Yesno {
        let lower = answer.ideal.to_lowercase();
        let starts_with_decision = lower.starts_with("yes") || lower.starts_with("no");
        if starts_with_decision && lower.chars().count() <= 4 {
            regenerate = true;
        }
        if answer.exact.is_none() {
            if lower.starts_with("yes") {
                answer.exact = Some(ExactAnswer::Decision(YesNo::Yes));
            } else if lower.starts_with("no") {
                answer.exact = Some(ExactAnswer::Decision(YesNo::No));
            }
        }
    }
    (answer, regenerate)
}

/// Voto por maioria entre amostras yes/no; em empate vence a primeira amostra.
pub fn majority_vote(samples: &[QaAnswer]) -> Option<QaAnswer> {
    let first = samples.first()?;
    let decided = |d: YesNo| samples.iter().filter(move |s| s.exact.as_ref().and_then(ExactAnswer::decision) == Some(d));
    let yes = decided(YesNo::Yes).count();
    let no = decided(YesNo::No).count();

    let winner = if yes > no {
        YesNo::Yes
    } else if no > yes {
        YesNo::No
    } else {
        return Some(first.clone());
    };
    decided(winner).next().map(|s| QaAnswer {
        ideal: s.ideal.clone(),
        exact: Some(ExactAnswer::Decision(winner)),
    })
}

/// Filtro básico de itens de lista: menos de 2 caracteres ou mais de uma vírgula.
fn passes_basic_filter(term: &str) -> bool {
    if term.chars().count() < 2 {
        debug!("Lista: '{}' removido pelo tamanho", term);
        return false;
    }
    if term.matches(',').count() > 1 {
        debug!("Lista: '{}' removido pelas vírgulas", term);
        return false;
    }
    true
}

/// Combina as amostras de uma pergunta `list`.
///
/// Os termos são ordenados pela frequência entre amostras. Ficam os que aparecem mais
/// de uma vez; se forem menos de 10, completa-se com os de frequência 1 na ordem da
/// primeira amostra em que surgiram.
pub fn aggregate_list_answers(samples: &[QaAnswer]) -> Option<QaAnswer> {
    let first = samples.first()?;

    let mut order: Vec<String> = Vec::new();
    let mut frequency: HashMap<String, usize> = HashMap::new();
    let mut first_sample: HashMap<String, usize> = HashMap::new();
    for (index, sample) in samples.iter().enumerate() {
        let Some(exact) = &sample.exact else { continue };
        for term in exact.entities() {
            let count = frequency.entry(term.to_string()).or_insert(0);
            if *count == 0 {
                order.push(term.to_string());
                first_sample.insert(term.to_string(), index);
            }
            *count += 1;
        }
    }

    // Ordenação estável: empates mantêm a ordem de aparição
    order.sort_by(|a, b| frequency[b].cmp(&frequency[a]));
    let ranked: Vec<String> = order
        .into_iter()
        .filter(|t| passes_basic_filter(t))
        .take(LIST_MAX_ITEMS)
        .filter(|t| t.chars().count() <= LIST_MAX_ITEM_CHARS)
        .collect();

    let (mut kept, mut singles): (Vec<String>, Vec<String>) =
        ranked.into_iter().partition(|t| frequency[t] > 1);
    if kept.len() < LIST_DEFAULT_ITEMS {
        singles.sort_by_key(|t| first_sample[t]);
        let missing = LIST_DEFAULT_ITEMS - kept.len();
        kept.extend(singles.into_iter().take(missing));
    }
    kept.truncate(LIST_MAX_ITEMS);

    Some(QaAnswer {
        ideal: first.ideal.clone(),
        exact: Some(ExactAnswer::Entities(kept.into_iter().map(|t| vec![t]).collect())),
    })
}

/// Resposta final a partir das amostras: voto (yesno), agregação (list) ou a primeira.
pub fn combine_samples(kind: QuestionType, samples: &[QaAnswer]) -> Option<QaAnswer> {
    match kind {
        QuestionType::Yesno => majority_vote(samples),
        QuestionType::List => aggregate_list_answers(samples),
        QuestionType::Factoid | QuestionType::Summary => samples.first().cloned(),
    }
}
