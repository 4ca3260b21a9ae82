//! # Resumos Biomédicos Anotados
//!
//! Resumos curtos no estilo PubMed, anotados por categoria, usados como exemplos
//! few-shot nos prompts do tagger LLM, e textos de demonstração para a interface web.
//!
//! ## Seleção de Exemplos
//!
//! Cada categoria recebe dois exemplos fixos:
//! - `DEVICE` e `INJURY_POISONING` usam resumos próprios (as categorias são raras nos
//!   resumos gerais e o LLM precisa ver casos positivos).
//! - As demais categorias compartilham o mesmo par de resumos.

use crate::tag::Tag;

/// Um resumo com as entidades esperadas por categoria.
///
/// As entidades aparecem literalmente no texto (mesma caixa), na ordem em que devem
/// ser listadas no prompt.
pub struct AnnotatedAbstract {
    /// Identificador (PMID + idioma)
    pub id: &'static str,
    pub text: &'static str,
    pub annotations: &'static [(Tag, &'static [&'static str])],
}

impl AnnotatedAbstract {
    /// Entidades anotadas para a categoria (vazio se não houver nenhuma).
    pub fn entities(&self, tag: Tag) -> &'static [&'static str] {
        self.annotations
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, entities)| *entities)
            .unwrap_or(&[])
    }
}

/// Retorna todos os resumos anotados
pub fn get_corpus() -> Vec<AnnotatedAbstract> {
    vec![
        // ===== PAR GERAL =====
        AnnotatedAbstract {
            id: "25823269_en",
            text: "Sepsis is a leading cause of acute lung injury in critically ill patients. We measured serum lactate and interleukin-6 in 48 patients admitted to the intensive care unit. Elevated interleukin-6 was associated with alveolar damage and reduced oxygenation. Bronchoalveolar lavage confirmed neutrophil infiltration of the lung. Treatment with dexamethasone lowered mortality.",
            annotations: &[
                (Tag::Diso, &["Sepsis", "acute lung injury", "alveolar damage"]),
                (Tag::Finding, &["reduced oxygenation", "neutrophil infiltration", "lowered mortality"]),
                (Tag::Anatomy, &["serum", "lung", "neutrophil"]),
                (Tag::Phys, &["oxygenation", "mortality"]),
                (Tag::Chem, &["lactate", "interleukin-6", "dexamethasone"]),
                (Tag::Labproc, &["Bronchoalveolar lavage"]),
            ],
        },
        AnnotatedAbstract {
            id: "25842923_en",
            text: "Type 2 diabetes mellitus impairs insulin secretion by pancreatic beta cells. In this cohort, fasting plasma glucose and glycated hemoglobin were measured before and after metformin therapy. Patients with obesity showed insulin resistance and higher blood pressure. Metformin improved glycemic control without hypoglycemia.",
            annotations: &[
                (Tag::Diso, &["Type 2 diabetes mellitus", "obesity", "insulin resistance", "hypoglycemia"]),
                (Tag::Finding, &["higher blood pressure", "improved glycemic control"]),
                (Tag::Anatomy, &["pancreatic beta cells", "plasma"]),
                (Tag::Phys, &["insulin secretion", "blood pressure", "glycemic control"]),
                (Tag::Chem, &["insulin", "glucose", "glycated hemoglobin", "metformin", "Metformin"]),
                (Tag::Labproc, &["fasting plasma glucose"]),
            ],
        },
        // ===== DEVICE =====
        AnnotatedAbstract {
            id: "26281196_en",
            text: "Central venous catheter placement was guided by ultrasound in 120 children. Catheter-related bloodstream infection occurred in 4 patients. The use of a silicone catheter reduced thrombosis of the jugular vein.",
            annotations: &[
                (Tag::Device, &["Central venous catheter", "silicone catheter"]),
                (Tag::Diso, &["bloodstream infection", "thrombosis"]),
                (Tag::Anatomy, &["jugular vein"]),
                (Tag::Labproc, &["ultrasound"]),
            ],
        },
        AnnotatedAbstract {
            id: "26600613_en",
            text: "Drug-eluting stents were implanted in patients with coronary artery disease. Restenosis was assessed by coronary angiography at 12 months. Stent thrombosis was rare and no pacemaker was required.",
            annotations: &[
                (Tag::Device, &["Drug-eluting stents", "pacemaker"]),
                (Tag::Diso, &["coronary artery disease", "Restenosis", "Stent thrombosis"]),
                (Tag::Labproc, &["coronary angiography"]),
            ],
        },
        // ===== INJURY_POISONING =====
        AnnotatedAbstract {
            id: "26036067_en",
            text: "Traumatic brain injury and femur fracture were the most frequent injuries after road traffic accidents. Patients with burns covering more than 20% of the body surface required fluid resuscitation.",
            annotations: &[
                (Tag::InjuryPoisoning, &["Traumatic brain injury", "femur fracture", "injuries", "burns"]),
                (Tag::Anatomy, &["body surface"]),
            ],
        },
        AnnotatedAbstract {
            id: "26525480_en",
            text: "Carbon monoxide poisoning caused delayed neurological sequelae in 30% of survivors. Lead poisoning was detected in children living near the smelter, with elevated blood lead levels.",
            annotations: &[
                (Tag::InjuryPoisoning, &["Carbon monoxide poisoning", "Lead poisoning"]),
                (Tag::Diso, &["neurological sequelae"]),
                (Tag::Chem, &["Carbon monoxide", "Lead", "lead"]),
                (Tag::Finding, &["elevated blood lead levels"]),
                (Tag::Anatomy, &["blood"]),
            ],
        },
    ]
}

/// Os dois exemplos few-shot usados no prompt da categoria.
pub fn examples_for(tag: Tag) -> Vec<AnnotatedAbstract> {
    let ids: [&str; 2] = match tag {
        Tag::Device => ["26281196_en", "26600613_en"],
        Tag::InjuryPoisoning => ["26036067_en", "26525480_en"],
        _ => ["25823269_en", "25842923_en"],
    };
    get_corpus()
        .into_iter()
        .filter(|a| ids.contains(&a.id))
        .collect()
}

/// Textos de demonstração para a interface web
pub fn demo_texts() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "Lesão pulmonar",
            "Acute lung injury (ALI) is a frequent complication of sepsis. In a murine model, lipopolysaccharide induced ALI with marked apoptosis of alveolar epithelial cells in the lung. Cisplatin pretreatment worsened ALI, while dexamethasone reduced inflammation.",
        ),
        (
            "Diabetes",
            "Type 2 diabetes mellitus (T2DM) affects insulin secretion and glucose uptake. Patients with diabetes receiving metformin showed lower glycated hemoglobin. A skin biopsy revealed no signs of diabetic dermopathy.",
        ),
        (
            "Queimaduras",
            "Patients with a severe burn were treated in the intensive care unit. Burn wound infection with Pseudomonas aeruginosa increased mortality. Silver sulfadiazine dressings were applied daily.",
        ),
        (
            "Dispositivos",
            "A central venous catheter was inserted under ultrasound guidance. Catheter occlusion was treated with heparin. No pneumothorax was observed after the procedure.",
        ),
    ]
}
