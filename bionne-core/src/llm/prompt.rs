//! Construção dos prompts enviados ao LLM.
//!
//! ## Prompt few-shot (um por categoria)
//!
//! ```text
//! Instruction: Return chemicals, ... in TEXT, in the CHEM concatenated by ';'
//!
//! [TEXT]: <resumo de exemplo 1>
//! [CHEM]: lactate;interleukin-6;dexamethasone
//! ###
//! [TEXT]: <resumo de exemplo 2>
//! [CHEM]: None
//! ###
//! [TEXT]: <documento alvo>
//!
//! [CHEM]:
//! ```

use crate::corpus::AnnotatedAbstract;
use crate::tag::Tag;
use crate::text::word_count;

/// Descrição da categoria usada na instrução do prompt.
pub fn category_description(tag: Tag) -> Option<&'static str> {
    let description = match tag {
        Tag::Anatomy => "Return phrases or entities that comprise organs, body part, cells and cell components, body substances in TEXT",
        Tag::Chem => "Return chemicals, including legal and illegal drugs, and biological molcules in TEXT",
        Tag::Device => "Return manufactured objects used for medical purposes in TEXT",
        Tag::Diso => "Return diseases, symptoms, dyfunctions, abnormality of organ, excluding injuries or poisoning in TEXT",
        Tag::Finding => "Return phrases or entities that convey the result of scientific study, experiments described in TEXT",
        Tag::InjuryPoisoning => "Return injuries on the body as a result of external force including poisoning in TEXT",
        Tag::Labproc => "Return testing body substances and other diagnostic procedures in TEXT",
        Tag::Phys => "Return biological function or process in organism including organism attribute (such as temperature) and excluding mental processes described in TEXT",
        Tag::Other | Tag::Unknown => return None,
    };
    Some(description)
}

/// Linha de instrução; vazia para as sentinelas.
pub fn instruction(tag: Tag) -> String {
    match category_description(tag) {
        Some(description) => format!(
            "Instruction: {}, in the {} concatenated by ';'\n\n",
            description,
            tag.name()
        ),
        None => String::new(),
    }
}

/// Prompt few-shot completo para extrair entidades da categoria `tag` de `text`.
pub fn few_shot_prompt(
    tag: Tag,
    examples: &[AnnotatedAbstract],
    text: &str,
    add_instruction: bool,
) -> String {
    let mut prompt = String::new();
    if add_instruction {
        prompt.push_str(&instruction(tag));
    }
    for example in examples {
        let entities = example.entities(tag);
        let answer = if entities.is_empty() {
            "None".to_string()
        } else {
            entities.join(";")
        };
        prompt.push_str(&format!(
            "[TEXT]: {}\n[{}]: {}\n###\n",
            example.text,
            tag.name(),
            answer
        ));
    }
    let text = if text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{}\n", text)
    };
    prompt.push_str(&format!("[TEXT]: {}\n[{}]: ", text, tag.name()));
    prompt
}

/// Opções da pergunta de desempate, na ordem apresentada ao LLM.
pub const TIEBREAK_OPTIONS: [&str; 5] = ["Anatomy", "Physiology", "Disease", "Chemical", "Other"];

/// Pergunta de múltipla escolha para o desempate semântico de uma menção.
///
/// Os tipos semânticos da ontologia, quando existem, entram como contexto.
pub fn tiebreak_prompt(word: &str, sentence: &str, semantic_types: &[String]) -> String {
    let mut prompt = format!(
        "Identify term \"{}\" in sentence \"{}\" refer to which of the following option\n",
        word, sentence
    );
    if !semantic_types.is_empty() {
        prompt.push_str(&format!(
            "(the term is listed in a medical ontology as: {})\n",
            semantic_types.join(", ")
        ));
    }
    for (letter, option) in ['a', 'b', 'c', 'd', 'e'].iter().zip(TIEBREAK_OPTIONS) {
        prompt.push_str(&format!("{}. {}\n", letter, option));
    }
    prompt.push_str("\nEnter the option:\n");
    prompt
}

/// Orçamento de tokens da resposta de desempate.
pub fn tiebreak_max_tokens(word: &str) -> usize {
    30 + word_count(word)
}
