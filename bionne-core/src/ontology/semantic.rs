//! Mapeamento de tipos semânticos UMLS (tree numbers) para categorias.
//!
//! Cada tipo semântico da UMLS tem um *tree number* hierárquico (ex: `B2.2.1.2.1` para
//! "Disease or Syndrome"). A categoria é decidida por prefixo, na ordem da tabela.

use crate::tag::Tag;

/// Prefixos de tree number por categoria, na ordem de verificação
pub const TREE_PREFIXES: &[(Tag, &str)] = &[
    (Tag::Anatomy, "A1.2"),
    (Tag::Device, "A1.3.1"),
    (Tag::Chem, "A1.4.1"),
    (Tag::Finding, "A2.2"),
    (Tag::Labproc, "B1.3.1.1"),
    (Tag::Phys, "B2.2.1.1"),
    (Tag::Diso, "B2.2.1.2"),
    (Tag::InjuryPoisoning, "B2.3"),
];

/// "Body Location or Region", fora da subárvore A1.2
const BODY_LOCATION: &str = "A2.1.5.2";
/// "Diagnostic Procedure", irmão de "Laboratory Procedure"
const DIAGNOSTIC_PROCEDURE: &str = "B1.3.1.2";

/// Categoria de um tree number; `Tag::Other` se nenhum prefixo casar.
pub fn classify_tree_number(tree_number: &str) -> Tag {
    for &(tag, prefix) in TREE_PREFIXES {
        if tree_number.starts_with(prefix) {
            return tag;
        }
        if tag == Tag::Anatomy && tree_number == BODY_LOCATION {
            return tag;
        }
        if tag == Tag::Labproc && tree_number == DIAGNOSTIC_PROCEDURE {
            return tag;
        }
    }
    Tag::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_classification() {
        assert_eq!(classify_tree_number("B2.2.1.2.1"), Tag::Diso);
        assert_eq!(classify_tree_number("A1.4.1.1.1"), Tag::Chem);
        assert_eq!(classify_tree_number("A1.2.3.5"), Tag::Anatomy);
        assert_eq!(classify_tree_number("B2.3"), Tag::InjuryPoisoning);
        assert_eq!(classify_tree_number("A2.2.1"), Tag::Finding);
    }

    #[test]
    fn test_manual_overrides() {
        assert_eq!(classify_tree_number("A2.1.5.2"), Tag::Anatomy);
        assert_eq!(classify_tree_number("B1.3.1.2"), Tag::Labproc);
        // Apenas o código exato recebe a exceção
        assert_eq!(classify_tree_number("A2.1.5.1"), Tag::Other);
    }

    #[test]
    fn test_unmapped_is_other() {
        assert_eq!(classify_tree_number("A1.1.3"), Tag::Other);
        assert_eq!(classify_tree_number(""), Tag::Other);
    }
}
