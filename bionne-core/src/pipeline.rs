//! # Pipeline de Documento: Orquestrador com Eventos Observáveis
//!
//! Coordena as fontes de evidência e o motor de desambiguação, emitindo eventos em cada
//! passo via um canal Rust (`mpsc`), para que o servidor WebSocket transmita o
//! progresso em tempo real.
//!
//! A ordem é estrita: toda a evidência do documento é agregada antes da cascata, e a
//! cascata termina antes do passe de aninhadas.

use std::sync::mpsc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aggregator::EvidenceAggregator;
use crate::config::PipelineConfig;
use crate::corpus::examples_for;
use crate::engine::{DisambiguationEngine, DisambiguationStats, TagTable};
use crate::error::Result;
use crate::export::{locate_entities, EntityLocation, PredictionRecord};
use crate::gazetteer::{BiomedicalTagger, GazetteerTagger, TaggedEntity};
use crate::llm::parse::{process_llm_output, LlmMention};
use crate::llm::prompt::few_shot_prompt;
use crate::llm::{CompletionClient, CompletionRequest, MockCompletionClient, TextSynthClient};
use crate::mention::Mention;
use crate::ontology::{FixtureOntology, OntologyAdapter, OntologyCache, OntologyService, UtsClient};
use crate::tag::Tag;
use crate::text::{AbbreviationPair, TextAnalyzer};

/// Eventos emitidos pelo pipeline durante o processamento.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PipelineEvent {
    /// **Passo 1**: texto tokenizado e segmentado.
    TextAnalyzed {
        tokens: usize,
        sentences: usize,
    },
    /// **Passo 2**: pares sigla / forma longa.
    AbbreviationsDetected {
        pairs: Vec<AbbreviationPair>,
    },
    /// **Passo 3** (uma vez por categoria): menções extraídas pelo LLM.
    LlmTagged {
        tag: Tag,
        mentions: Vec<LlmMention>,
    },
    /// **Passo 4**: entidades do NER pré-treinado.
    NerTagged {
        entities: Vec<TaggedEntity>,
    },
    /// **Passo 5**: evidência completa (inclui a ontologia), antes da cascata.
    EvidenceReady {
        mentions: Vec<Mention>,
    },
    /// **Passo 6**: tag final de uma menção.
    MentionResolved {
        text: String,
        tag: Tag,
    },
    /// Falha não fatal de uma fonte de evidência.
    Warning {
        message: String,
    },
    /// **Conclusão**
    Done {
        result: DocumentResult,
        processing_ms: u64,
    },
    /// **Falha**: erro irrecuperável (emitido pela camada de transporte).
    Error {
        message: String,
    },
}

/// Menção com sua tag final (ausente se não resolvida).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentionReport {
    pub mention: Mention,
    pub final_tag: Option<Tag>,
}

/// Resultado de um documento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentResult {
    pub text: String,
    pub mentions: Vec<MentionReport>,
    pub tag_table: TagTable,
    /// Ocorrências das entidades finais no texto
    pub locations: Vec<EntityLocation>,
    pub stats: DisambiguationStats,
}

impl DocumentResult {
    pub fn final_tag(&self, text: &str) -> Option<Tag> {
        self.mentions
            .iter()
            .find(|r| r.mention.text == text)
            .and_then(|r| r.final_tag)
    }

    /// Entidades finais de uma categoria, em ordem alfabética.
    pub fn entities(&self, tag: Tag) -> Vec<String> {
        self.tag_table
            .get(tag)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn to_prediction(&self, id: &str) -> PredictionRecord {
        PredictionRecord::new(id, &self.tag_table, &self.text)
    }
}

/// O pipeline de documento.
///
/// Mantém os colaboradores e o cache da ontologia, que é o único estado compartilhado
/// entre documentos. Os contadores de cada documento são somados em [`run_stats`](Self::run_stats).
pub struct DocumentPipeline {
    config: PipelineConfig,
    llm: Box<dyn CompletionClient>,
    tagger: Box<dyn BiomedicalTagger>,
    ontology: OntologyAdapter<Box<dyn OntologyService>>,
    engine: DisambiguationEngine,
    run_stats: DisambiguationStats,
    documents: usize,
}

impl DocumentPipeline {
    pub fn new(
        config: PipelineConfig,
        llm: Box<dyn CompletionClient>,
        tagger: Box<dyn BiomedicalTagger>,
        ontology: Box<dyn OntologyService>,
        cache: OntologyCache,
    ) -> Self {
        let engine = DisambiguationEngine::new(config.engine.clone());
        Self {
            config,
            llm,
            tagger,
            ontology: OntologyAdapter::new(ontology, cache),
            engine,
            run_stats: DisambiguationStats::default(),
            documents: 0,
        }
    }

    /// Monta o pipeline a partir da configuração e do ambiente.
    ///
    /// Sem `TEXTSYNTH_API_KEY` o LLM é substituído por um mock que não propõe entidades;
    /// sem `UMLS_API_KEY` a ontologia é a de demonstração. O cache é aberto em
    /// `config.cache_dir`.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let llm: Box<dyn CompletionClient> =
            match TextSynthClient::from_env(&config.llm_base_url, &config.llm_model) {
                Ok(client) => Box::new(client),
                Err(e) => {
                    warn!("LLM indisponível ({}); usando respostas vazias", e);
                    Box::new(MockCompletionClient::new().with_fixed_response("None"))
                }
            };
        let ontology: Box<dyn OntologyService> = match UtsClient::from_env(&config.ontology_base_url) {
            Ok(client) => Box::new(client),
            Err(e) => {
                warn!("UMLS indisponível ({}); usando a ontologia de demonstração", e);
                Box::new(FixtureOntology::demo())
            }
        };
        let cache = OntologyCache::open(&config.cache_dir)?;
        Ok(Self::new(config, llm, Box::new(GazetteerTagger::default()), ontology, cache))
    }

    /// Pipeline sem rede nem disco: LLM que não propõe entidades, ontologia de
    /// demonstração e cache em memória.
    pub fn demo() -> Self {
        Self::new(
            PipelineConfig::default(),
            Box::new(MockCompletionClient::new().with_fixed_response("None")),
            Box::new(GazetteerTagger::default()),
            Box::new(FixtureOntology::demo()),
            OntologyCache::in_memory(),
        )
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Contadores somados de todos os documentos processados.
    pub fn run_stats(&self) -> &DisambiguationStats {
        &self.run_stats
    }

    pub fn documents_processed(&self) -> usize {
        self.documents
    }

    pub fn ontology_cache(&self) -> &OntologyCache {
        self.ontology.cache()
    }

    /// Processa o documento de forma síncrona.
    pub fn analyze(&mut self, text: &str) -> DocumentResult {
        self.analyze_with_overrides(text, &[])
    }

    /// Processa o documento com tags manuais `(texto, tag)` que sempre vencem.
    pub fn analyze_with_overrides(&mut self, text: &str, overrides: &[(String, Tag)]) -> DocumentResult {
        self.run(text, overrides, None)
    }

    /// Executa o pipeline enviando eventos de progresso em tempo real.
    ///
    /// # Fluxo de Eventos
    /// 1. `TextAnalyzed`
    /// 2. `AbbreviationsDetected`
    /// 3. `LlmTagged` (uma vez por categoria) ou `Warning`
    /// 4. `NerTagged`
    /// 5. `EvidenceReady`
    /// 6. `MentionResolved` (loop)
    /// 7. `Done`
    pub fn analyze_streaming(
        &mut self,
        text: &str,
        overrides: &[(String, Tag)],
        tx: mpsc::Sender<PipelineEvent>,
    ) {
        let start = Instant::now();
        let result = self.run(text, overrides, Some(&tx));
        let _ = tx.send(PipelineEvent::Done {
            result,
            processing_ms: start.elapsed().as_millis() as u64,
        });
    }

    fn run(
        &mut self,
        text: &str,
        overrides: &[(String, Tag)],
        tx: Option<&mpsc::Sender<PipelineEvent>>,
    ) -> DocumentResult {
        let emit = |event: PipelineEvent| {
            if let Some(tx) = tx {
                let _ = tx.send(event);
            }
        };

        // === Passo 1: Análise textual ===
        let analyzer = TextAnalyzer::new(text);
        emit(PipelineEvent::TextAnalyzed {
            tokens: analyzer.tokens().len(),
            sentences: analyzer.sentences().len(),
        });
        let mut aggregator = EvidenceAggregator::new(&analyzer);

        // === Passo 2: Siglas ===
        let pairs = analyzer.detect_abbreviations();
        for pair in &pairs {
            aggregator.add_abbreviation_pair(pair);
        }
        emit(PipelineEvent::AbbreviationsDetected { pairs });

        // === Passo 3: Tagger LLM, uma categoria por vez ===
        for &tag in &self.config.categories {
            let prompt = few_shot_prompt(tag, &examples_for(tag), text, self.config.add_instruction);
            let mut request = CompletionRequest::new(prompt, self.config.llm_max_tokens)
                .with_samples(self.config.llm_samples)
                .with_seed(self.config.engine.llm_seed);
            if !self.config.stop.is_empty() {
                request = request.with_stop(self.config.stop.clone());
            }
            match self.llm.complete(&request) {
                Ok(samples) => {
                    let mentions = process_llm_output(&analyzer, &samples);
                    aggregator.add_llm_evidence(tag, &mentions);
                    emit(PipelineEvent::LlmTagged { tag, mentions });
                }
                Err(e) => {
                    warn!("Tagger LLM falhou para {}: {}", tag, e);
                    emit(PipelineEvent::Warning {
                        message: format!("LLM sem resposta para {}: {}", tag, e),
                    });
                }
            }
        }

        // === Passo 4: NER pré-treinado ===
        let entities = self.tagger.tag(&analyzer);
        aggregator.add_ner_evidence(&entities);
        emit(PipelineEvent::NerTagged { entities });

        // Tags manuais: a menção é criada na primeira ocorrência, se ainda não existe
        for (word, tag) in overrides {
            if let Some(span) = analyzer.anchor(word) {
                aggregator.seed_mention(word, span);
            }
            if let Err(e) = aggregator.set_manual_override(word, *tag) {
                emit(PipelineEvent::Warning {
                    message: format!("Tag manual ignorada: {}", e),
                });
            }
        }

        // === Passo 5: Ontologia e congelamento ===
        aggregator.populate_ontology(&mut self.ontology, self.config.ontology_top_k);
        let snapshot = aggregator.freeze();
        emit(PipelineEvent::EvidenceReady {
            mentions: snapshot.iter().cloned().collect(),
        });

        // === Passo 6: Desambiguação ===
        let outcome = self.engine.resolve(&snapshot, Some(self.llm.as_ref()));
        let mentions: Vec<MentionReport> = snapshot
            .iter()
            .map(|m| MentionReport {
                mention: m.clone(),
                final_tag: outcome.resolution.final_tag(&m.text),
            })
            .collect();
        for report in &mentions {
            if let Some(tag) = report.final_tag {
                emit(PipelineEvent::MentionResolved {
                    text: report.mention.text.clone(),
                    tag,
                });
            }
        }

        self.run_stats.merge(&outcome.stats);
        self.documents += 1;
        info!(
            "Documento {} processado: {} menções, {} entidades",
            self.documents,
            mentions.len(),
            outcome.resolution.table().len()
        );

        let tag_table = outcome.resolution.table().clone();
        DocumentResult {
            text: text.to_string(),
            locations: locate_entities(&tag_table, text),
            mentions,
            tag_table,
            stats: outcome.stats,
        }
    }

    /// Grava o cache da ontologia em disco.
    pub fn flush(&self) -> Result<()> {
        self.ontology.flush()
    }
}
