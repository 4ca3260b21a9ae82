//! Tags finais de um documento e a tabela categoria → menções.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::mention::EvidenceSnapshot;
use crate::tag::Tag;

/// Menções finalizadas por categoria. Só as oito categorias têm balde.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagTable(BTreeMap<Tag, BTreeSet<String>>);

impl TagTable {
    pub fn new() -> Self {
        Self(Tag::CATEGORIES.iter().map(|t| (*t, BTreeSet::new())).collect())
    }

    pub fn get(&self, tag: Tag) -> Option<&BTreeSet<String>> {
        self.0.get(&tag)
    }

    pub fn contains(&self, tag: Tag, text: &str) -> bool {
        self.0.get(&tag).map(|set| set.contains(text)).unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Tag, &BTreeSet<String>)> {
        self.0.iter().map(|(t, set)| (*t, set))
    }

    /// Total de menções nos baldes
    pub fn len(&self) -> usize {
        self.0.values().map(|set| set.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&mut self, tag: Tag, text: &str) {
        if let Some(set) = self.0.get_mut(&tag) {
            set.insert(text.to_string());
        }
    }
}

impl Default for TagTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Resultado da desambiguação: no máximo uma tag final por menção.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    final_tags: BTreeMap<String, Tag>,
    table: TagTable,
}

impl Resolution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn final_tag(&self, text: &str) -> Option<Tag> {
        self.final_tags.get(text).copied()
    }

    pub fn is_final(&self, text: &str) -> bool {
        self.final_tags.contains_key(text)
    }

    pub fn final_tags(&self) -> &BTreeMap<String, Tag> {
        &self.final_tags
    }

    pub fn table(&self) -> &TagTable {
        &self.table
    }

    /// Fixa a tag final da menção.
    ///
    /// A primeira atribuição vence: retorna `false` se a menção já tinha tag. Uma tag de
    /// categoria é propagada ao parceiro sigla/forma longa ainda sem tag.
    pub fn finalize(&mut self, snapshot: &EvidenceSnapshot, text: &str, tag: Tag) -> bool {
        if self.is_final(text) {
            return false;
        }
        self.assign(text, tag);

        if !tag.is_category() {
            return true;
        }
        let partner = snapshot.get(text).and_then(|m| m.partner());
        if let Some(partner) = partner {
            if snapshot.contains(partner) && !self.is_final(partner) {
                debug!("Propagando {} de '{}' para '{}'", tag, text, partner);
                self.assign(partner, tag);
            }
        }
        true
    }

    fn assign(&mut self, text: &str, tag: Tag) {
        self.final_tags.insert(text.to_string(), tag);
        self.table.record(tag, text);
    }
}
