//! Servidor web Axum com WebSocket para acompanhar a desambiguação em tempo real

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use bionne_core::{
    corpus::demo_texts,
    pipeline::{DocumentPipeline, DocumentResult, PipelineEvent},
    DisambiguationStats, PipelineConfig, Tag,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

/// Estado compartilhado da aplicação.
///
/// Um documento por vez: o pipeline fica atrás de um mutex.
struct AppState {
    pipeline: Mutex<DocumentPipeline>,
}

impl AppState {
    /// Executa `f` com o pipeline travado, fora do runtime assíncrono.
    async fn with_pipeline<T, F>(self: &Arc<Self>, f: F) -> Result<T, String>
    where
        T: Send + 'static,
        F: FnOnce(&mut DocumentPipeline) -> T + Send + 'static,
    {
        let state = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            let mut pipeline = state
                .pipeline
                .lock()
                .map_err(|_| "pipeline indisponível após uma falha anterior".to_string())?;
            Ok(f(&mut pipeline))
        })
        .await
        .map_err(|e| format!("tarefa do pipeline abortada: {}", e))?
    }
}

/// Requisição de análise (HTTP e WebSocket)
#[derive(Deserialize)]
struct AnalyzeRequest {
    text: String,
    /// Tags manuais `[texto, TAG]`
    #[serde(default)]
    overrides: Vec<(String, Tag)>,
}

#[derive(Serialize)]
struct AnalyzeResponse {
    result: DocumentResult,
    processing_ms: u64,
}

#[derive(Serialize)]
struct StatsResponse {
    documents: usize,
    stats: DisambiguationStats,
    cached_concepts: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::var("BIONNE_CONFIG").ok().map(PathBuf::from);
    let config = PipelineConfig::load(config_path.as_deref())?;
    let pipeline = load_pipeline(config).await?;
    let state = Arc::new(AppState {
        pipeline: Mutex::new(pipeline),
    });
    let shared = Arc::clone(&state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/analyze", post(analyze_handler))
        .route("/ws", get(ws_handler))
        .route("/demo-texts", get(demo_texts_handler))
        .route("/stats", get(stats_handler))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    info!("🚀 Servidor BioNNE iniciado em http://localhost:3000");
    let served = axum::serve(listener, app).await;

    // Os clientes HTTP bloqueantes só podem ser descartados fora do runtime
    tokio::task::spawn_blocking(move || drop(shared)).await?;
    served?;
    Ok(())
}

/// Monta o pipeline numa thread de bloqueio.
///
/// Os clientes HTTP da UMLS e do TextSynth são bloqueantes e não podem ser criados
/// dentro do runtime assíncrono. Sem cache utilizável cai no modo demonstração.
async fn load_pipeline(config: PipelineConfig) -> Result<DocumentPipeline, tokio::task::JoinError> {
    tokio::task::spawn_blocking(move || match DocumentPipeline::from_config(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            warn!("Cache da ontologia indisponível ({}); usando o modo demonstração", e);
            DocumentPipeline::demo()
        }
    })
    .await
}

/// Análise via HTTP POST (sem streaming)
async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> impl IntoResponse {
    if req.text.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Texto vazio"})),
        )
            .into_response();
    }

    let outcome = state
        .with_pipeline(move |pipeline| {
            let start = Instant::now();
            let result = pipeline.analyze_with_overrides(&req.text, &req.overrides);
            if let Err(e) = pipeline.flush() {
                warn!("Falha ao gravar o cache da ontologia: {}", e);
            }
            AnalyzeResponse {
                result,
                processing_ms: start.elapsed().as_millis() as u64,
            }
        })
        .await;

    match outcome {
        Ok(response) => Json(response).into_response(),
        Err(message) => {
            error!("{}", message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": message})),
            )
                .into_response()
        }
    }
}

/// Retorna textos de demonstração
async fn demo_texts_handler() -> impl IntoResponse {
    let texts: Vec<serde_json::Value> = demo_texts()
        .iter()
        .map(|(title, text)| {
            serde_json::json!({
                "title": title,
                "text": text
            })
        })
        .collect();
    Json(texts)
}

/// Contadores acumulados desde o início do servidor
async fn stats_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let outcome = state
        .with_pipeline(|pipeline| StatsResponse {
            documents: pipeline.documents_processed(),
            stats: *pipeline.run_stats(),
            cached_concepts: pipeline.ontology_cache().concepts.len(),
        })
        .await;
    match outcome {
        Ok(stats) => Json(stats).into_response(),
        Err(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": message})),
        )
            .into_response(),
    }
}

/// Upgrade HTTP → WebSocket
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Recebe um texto, executa o pipeline e repassa os eventos ao cliente
async fn handle_websocket(mut socket: WebSocket, state: Arc<AppState>) {
    info!("WebSocket conectado");

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                // JSON {text, overrides} ou texto puro
                let req = serde_json::from_str::<AnalyzeRequest>(&text).unwrap_or_else(|_| AnalyzeRequest {
                    text: text.to_string(),
                    overrides: Vec::new(),
                });
                let document = req.text.trim().to_string();
                if document.is_empty() {
                    continue;
                }
                info!("Analisando via WebSocket: {} chars", document.len());

                let overrides = req.overrides;
                let events = state
                    .with_pipeline(move |pipeline| {
                        let (tx, rx) = std::sync::mpsc::channel::<PipelineEvent>();
                        pipeline.analyze_streaming(&document, &overrides, tx);
                        if let Err(e) = pipeline.flush() {
                            warn!("Falha ao gravar o cache da ontologia: {}", e);
                        }
                        rx.try_iter().collect::<Vec<_>>()
                    })
                    .await
                    .unwrap_or_else(|message| vec![PipelineEvent::Error { message }]);

                for event in &events {
                    let Ok(json) = serde_json::to_string(event) else {
                        continue;
                    };
                    if socket.send(Message::Text(json)).await.is_err() {
                        return; // cliente desconectou
                    }
                    // Pequena pausa para a animação passo a passo
                    tokio::time::sleep(tokio::time::Duration::from_millis(35)).await;
                }
            }
            Message::Close(_) => {
                info!("WebSocket desconectado");
                return;
            }
            Message::Ping(payload) => {
                let _ = socket.send(Message::Pong(payload)).await;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pipeline_with_http_clients_loads_inside_runtime() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("TEXTSYNTH_API_KEY", "chave-de-teste");
        std::env::set_var("UMLS_API_KEY", "chave-de-teste");
        let config = PipelineConfig {
            cache_dir: dir.path().to_path_buf(),
            ..PipelineConfig::default()
        };

        let pipeline = load_pipeline(config).await.unwrap();
        assert_eq!(pipeline.config().cache_dir, dir.path());
        assert_eq!(pipeline.documents_processed(), 0);

        let state = Arc::new(AppState {
            pipeline: Mutex::new(pipeline),
        });
        let documents = state
            .with_pipeline(|pipeline| pipeline.documents_processed())
            .await
            .unwrap();
        assert_eq!(documents, 0);

        tokio::task::spawn_blocking(move || drop(state)).await.unwrap();
    }
}
