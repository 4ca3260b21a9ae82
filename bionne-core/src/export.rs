//! Exportação das predições.
//!
//! Cada entidade da [`TagTable`] é localizada em todas as suas ocorrências no texto (na
//! forma exata e com a caixa da primeira letra invertida) e vira um triplo
//! `[início, fim, TAG]`. Os registros são gravados em JSONL:
//!
//! ```json
//! {"id": "25823269_en", "entity": [[0, 6, "DISO"], [29, 46, "DISO"]], "text": "..."}
//! ```

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::engine::TagTable;
use crate::error::Result;
use crate::tag::Tag;
use crate::text::{flip_first_case, Span};

/// Ocorrência de uma entidade predita, serializada como `[início, fim, TAG]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLocation(pub usize, pub usize, pub Tag);

impl EntityLocation {
    pub fn span(&self) -> Span {
        Span::new(self.0, self.1)
    }

    pub fn tag(&self) -> Tag {
        self.2
    }
}

/// Todas as ocorrências não sobrepostas de `entity` (e da forma com a primeira letra
/// invertida) em `text`.
pub fn find_all_locations(entity: &str, text: &str) -> Vec<Span> {
    if entity.is_empty() {
        return Vec::new();
    }
    let mut forms = vec![entity.to_string()];
    let flipped = flip_first_case(entity);
    if flipped != entity {
        forms.push(flipped);
    }
    forms
        .iter()
        .flat_map(|form| {
            text.match_indices(form.as_str())
                .map(|(at, m)| Span::new(at, at + m.len()))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Localiza no texto todas as entidades da tabela, categoria por categoria.
pub fn locate_entities(table: &TagTable, text: &str) -> Vec<EntityLocation> {
    let mut locations = Vec::new();
    for (tag, entities) in table.iter() {
        for entity in entities {
            for span in find_all_locations(entity, text) {
                locations.push(EntityLocation(span.start, span.end, tag));
            }
        }
    }
    locations
}

/// Uma linha do arquivo de predições.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: String,
    pub entity: Vec<EntityLocation>,
    pub text: String,
}

impl PredictionRecord {
    pub fn new(id: &str, table: &TagTable, text: &str) -> Self {
        Self {
            id: id.to_string(),
            entity: locate_entities(table, text),
            text: text.to_string(),
        }
    }
}

/// Grava os registros em JSONL (um objeto por linha).
pub fn write_jsonl<W: Write>(mut writer: W, records: &[PredictionRecord]) -> Result<()> {
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Resolution;
    use crate::mention::{EvidenceSnapshot, Mention};

    #[test]
    fn test_locations_include_case_flipped_form() {
        let text = "Insulin resistance precedes diabetes. insulin levels rose.";
        let spans = find_all_locations("Insulin", text);
        assert_eq!(spans, vec![Span::new(0, 7), Span::new(38, 45)]);
    }

    #[test]
    fn test_triples_serialize_as_arrays() {
        let json = serde_json::to_string(&EntityLocation(0, 6, Tag::Diso)).unwrap();
        assert_eq!(json, r#"[0,6,"DISO"]"#);
    }

    #[test]
    fn test_jsonl_record() {
        let text = "Sepsis causes ALI.";
        let snapshot: EvidenceSnapshot = [Mention::new("Sepsis", Span::new(0, 6), text)].into_iter().collect();
        let mut resolution = Resolution::new();
        resolution.finalize(&snapshot, "Sepsis", Tag::Diso);

        let record = PredictionRecord::new("doc1", resolution.table(), text);
        let mut out = Vec::new();
        write_jsonl(&mut out, &[record]).unwrap();
        let line = String::from_utf8(out).unwrap();
        assert_eq!(
            line,
            "{\"id\":\"doc1\",\"entity\":[[0,6,\"DISO\"]],\"text\":\"Sepsis causes ALI.\"}\n"
        );
    }
}
