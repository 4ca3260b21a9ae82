//! # bionne-core: Reconhecimento e Desambiguação de Entidades Biomédicas
//!
//! Este crate combina três fontes ruidosas de evidência (um tagger LLM few-shot, um NER
//! biomédico pré-treinado e a ontologia UMLS) em **uma única tag final por menção** de
//! um documento, em oito categorias aninháveis (DISO, FINDING, ANATOMY, PHYS, CHEM,
//! LABPROC, INJURY_POISONING, DEVICE).
//!
//! ## Arquitetura do Sistema
//!
//! O pipeline é linear e estritamente ordenado por documento:
//!
//! 1.  **Análise textual** ([`text`]): tokens com offsets, sentenças, pares de siglas.
//! 2.  **Agregação de evidências** ([`aggregator`]): o [`mention::MentionRegistry`] é
//!     preenchido com as siglas, as tags do LLM ([`llm`]), os rótulos do NER
//!     ([`gazetteer`]) e a evidência da ontologia ([`ontology`]), e então congelado.
//! 3.  **Desambiguação** ([`engine`]): cascata de regras por prioridade, desempate opcional
//!     pelo LLM e o passe de entidades aninhadas.
//! 4.  **Saída**: a [`engine::TagTable`] (categoria → menções), as localizações no texto
//!     ([`export`]) e, contra uma referência, as métricas ([`evaluation`]).
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use bionne_core::{DocumentPipeline, Tag};
//!
//! // Pipeline sem rede: LLM simulado e ontologia de demonstração
//! let mut pipeline = DocumentPipeline::demo();
//!
//! let result = pipeline.analyze("Acute lung injury (ALI) is a frequent complication of sepsis.");
//!
//! // A sigla herda a tag da forma longa
//! assert_eq!(result.final_tag("ALI"), Some(Tag::Diso));
//! for (tag, entities) in result.tag_table.iter() {
//!     println!("{}: {:?}", tag, entities);
//! }
//! ```
//!
//! ## Módulos Principais
//!
//! - [`pipeline`]: orquestrador que conecta todos os estágios e emite eventos.
//! - [`engine`]: o motor de desambiguação.
//! - [`ontology`]: cliente UMLS com cache persistente em JSON.
//! - [`qa`]: normalização das respostas de perguntas biomédicas.

pub mod aggregator;
pub mod config;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod evaluation;
pub mod export;
pub mod gazetteer;
pub mod llm;
pub mod mention;
pub mod ontology;
pub mod pipeline;
pub mod qa;
pub mod tag;
pub mod text;

pub use config::{EngineConfig, PipelineConfig};
pub use engine::{DisambiguationEngine, DisambiguationStats, TagTable};
pub use error::{Error, Result};
pub use mention::{EvidenceSnapshot, Mention};
pub use pipeline::{DocumentPipeline, DocumentResult, PipelineEvent};
pub use tag::{NerLabel, Tag};
