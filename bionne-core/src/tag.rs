//! # Categorias Biomédicas e Rótulos do NER Pré-treinado
//!
//! Define o conjunto **fechado** de categorias que uma menção pode receber ao final
//! da desambiguação, mais duas sentinelas usadas pelas fontes de evidência.
//!
//! ## Categorias
//!
//! | Tag                | Significado                                   | Exemplos                         |
//! |--------------------|-----------------------------------------------|----------------------------------|
//! | `DISO`             | Doença, sintoma, disfunção                    | diabetes, acute lung injury      |
//! | `FINDING`          | Achado, resultado de estudo                   | reduced survival rate            |
//! | `ANATOMY`          | Órgão, parte do corpo, célula, substância     | lung, hepatocytes                |
//! | `PHYS`             | Função ou processo biológico                  | apoptosis, body temperature      |
//! | `CHEM`             | Substância química, fármaco, biomolécula      | cisplatin, insulin               |
//! | `LABPROC`          | Procedimento laboratorial ou diagnóstico      | biopsy, blood test               |
//! | `INJURY_POISONING` | Lesão por força externa ou envenenamento      | burn, lead poisoning             |
//! | `DEVICE`           | Objeto manufaturado de uso médico             | stent, catheter                  |
//!
//! ## Sentinelas
//!
//! - `Unknown`: a ontologia não encontrou nenhum conceito para a menção.
//! - `Other`: tipo semântico fora das categorias, ou resposta "Other" do desempate via LLM.

use serde::{Deserialize, Serialize};

/// Tag de categoria atribuída a uma menção.
///
/// A ordem das variantes é a ordem canônica usada em relatórios e na tabela de tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tag {
    #[serde(rename = "DISO")]
    Diso,
    #[serde(rename = "FINDING")]
    Finding,
    #[serde(rename = "ANATOMY")]
    Anatomy,
    #[serde(rename = "PHYS")]
    Phys,
    #[serde(rename = "CHEM")]
    Chem,
    #[serde(rename = "LABPROC")]
    Labproc,
    #[serde(rename = "INJURY_POISONING")]
    InjuryPoisoning,
    #[serde(rename = "DEVICE")]
    Device,
    /// Tipo semântico sem categoria correspondente.
    #[serde(rename = "Other", alias = "OTHER", alias = "OTHERS")]
    Other,
    /// Ontologia sem resultados.
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Tag {
    /// As oito categorias reais, na ordem canônica.
    pub const CATEGORIES: [Tag; 8] = [
        Tag::Diso,
        Tag::Finding,
        Tag::Anatomy,
        Tag::Phys,
        Tag::Chem,
        Tag::Labproc,
        Tag::InjuryPoisoning,
        Tag::Device,
    ];

    /// Nome da tag como string (para prompts, serialização e UI)
    pub fn name(&self) -> &'static str {
        match self {
            Tag::Diso => "DISO",
            Tag::Finding => "FINDING",
            Tag::Anatomy => "ANATOMY",
            Tag::Phys => "PHYS",
            Tag::Chem => "CHEM",
            Tag::Labproc => "LABPROC",
            Tag::InjuryPoisoning => "INJURY_POISONING",
            Tag::Device => "DEVICE",
            Tag::Other => "Other",
            Tag::Unknown => "Unknown",
        }
    }

    /// `true` para as oito categorias; `false` para as sentinelas.
    pub fn is_category(&self) -> bool {
        !matches!(self, Tag::Other | Tag::Unknown)
    }

    /// Cor CSS para highlight na UI
    pub fn color(&self) -> &'static str {
        match self {
            Tag::Diso => "#ef4444",
            Tag::Finding => "#3b82f6",
            Tag::Anatomy => "#f59e0b",
            Tag::Phys => "#10b981",
            Tag::Chem => "#8b5cf6",
            Tag::Labproc => "#06b6d4",
            Tag::InjuryPoisoning => "#f97316",
            Tag::Device => "#64748b",
            Tag::Other | Tag::Unknown => "#9ca3af",
        }
    }

    /// Tenta parsear a partir de string (ex: "DISO" → Some(Diso)).
    ///
    /// Aceita as grafias históricas das sentinelas (`OTHER`, `OTHERS`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DISO" => Some(Tag::Diso),
            "FINDING" => Some(Tag::Finding),
            "ANATOMY" => Some(Tag::Anatomy),
            "PHYS" => Some(Tag::Phys),
            "CHEM" => Some(Tag::Chem),
            "LABPROC" => Some(Tag::Labproc),
            "INJURY_POISONING" => Some(Tag::InjuryPoisoning),
            "DEVICE" => Some(Tag::Device),
            "Other" | "OTHER" | "OTHERS" => Some(Tag::Other),
            "Unknown" => Some(Tag::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Rótulos emitidos pelo tagger biomédico pré-treinado (estilo BC5CDR).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NerLabel {
    Disease,
    Chemical,
}

impl NerLabel {
    pub fn name(&self) -> &'static str {
        match self {
            NerLabel::Disease => "DISEASE",
            NerLabel::Chemical => "CHEMICAL",
        }
    }

    /// Categoria equivalente no conjunto fechado de tags
    pub fn tag(&self) -> Tag {
        match self {
            NerLabel::Disease => Tag::Diso,
            NerLabel::Chemical => Tag::Chem,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_names_round_trip() {
        for tag in Tag::CATEGORIES {
            assert_eq!(Tag::parse(tag.name()), Some(tag));
        }
        assert_eq!(Tag::parse("OTHERS"), Some(Tag::Other));
        assert_eq!(Tag::parse("PER"), None);
    }

    #[test]
    fn test_sentinels_are_not_categories() {
        assert!(Tag::Diso.is_category());
        assert!(!Tag::Other.is_category());
        assert!(!Tag::Unknown.is_category());
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&Tag::InjuryPoisoning).unwrap();
        assert_eq!(json, "\"INJURY_POISONING\"");
        let parsed: Tag = serde_json::from_str("\"OTHERS\"").unwrap();
        assert_eq!(parsed, Tag::Other);
    }

    #[test]
    fn test_ner_label_maps_to_tag() {
        assert_eq!(NerLabel::Disease.tag(), Tag::Diso);
        assert_eq!(NerLabel::Chemical.tag(), Tag::Chem);
    }
}
