//! HTTP front end: the same question and command handling as the console,
//! served as JSON.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::cli::{respond, Reply};
use crate::commands::{Command, CommandContext, CommandOutput, Session};
use crate::container::bootstrap::Services;
use crate::container::Container;
use crate::errors::Result;
use crate::models::{AskRequest, AskResponse, ErrorResponse, ResponseKind, StatusResponse};

type ApiError = (StatusCode, Json<ErrorResponse>);

pub struct AppState {
    services: Services,
    ctx: CommandContext,
    // One conversation shared by every client.
    session: Mutex<Session>,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        let ctx = services.command_context();
        Self {
            services,
            ctx,
            session: Mutex::new(Session::new()),
        }
    }
}

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/ask", post(ask_handler))
        .route("/api/status", get(status_handler))
        .route("/api/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

async fn ask_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AskRequest>,
) -> std::result::Result<Json<AskResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let question = request.question.trim().to_string();
    if question.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "No question provided"));
    }

    let command = match state.services.parser.parse(&question) {
        // Leaving only makes sense on a terminal.
        Ok(Command::Exit) => Command::Question(question.clone()),
        Ok(command) => command,
        Err(e) => {
            let output = CommandOutput::error(&e);
            return Ok(Json(AskResponse {
                answer: output.text,
                question,
                kind: Some(output.kind),
            }));
        }
    };

    tracing::info!("Request {}: {}", request_id, question);

    let reply = {
        let mut session = state.session.lock().await;
        respond(&state.services, &state.ctx, &mut session, command).await
    };

    let response = match reply {
        Ok(Reply::Command(output)) => AskResponse {
            answer: output.text,
            question,
            kind: Some(output.kind),
        },
        Ok(Reply::Answer(answer)) => AskResponse {
            answer: answer.text,
            question,
            kind: None,
        },
        Ok(Reply::Exit) | Ok(Reply::Skip) => AskResponse {
            answer: String::new(),
            question,
            kind: Some(ResponseKind::Info),
        },
        Err(e) => {
            tracing::error!("Request {} failed: {}", request_id, e);
            return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    tracing::info!("Request {} completed", request_id);
    Ok(Json(response))
}

async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let services = &state.services;
    let project_info = match services.project.info() {
        Ok(info) => info.to_string(),
        Err(e) => e.to_string(),
    };
    let indexed_chunks = match services.assistant.index().document_count().await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!("Could not count indexed chunks: {}", e);
            None
        }
    };

    Json(StatusResponse {
        status: "ready".to_string(),
        api_provider: services.config.api.provider.as_str().to_string(),
        embedding_provider: services.config.embedding.provider.as_str().to_string(),
        model: services.assistant.model_name().to_string(),
        project_info,
        indexed_chunks,
        timestamp: Utc::now().to_rfc3339(),
    })
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Prepares the index and serves until the process is stopped.
pub async fn serve(container: &Container) -> Result<()> {
    let services = Services::resolve(container)?;
    let state = services.assistant.prepare().await?;
    tracing::info!("Vector index ready: {:?}", state);

    let addr = format!("{}:{}", services.config.web.host, services.config.web.port);
    let app = router(Arc::new(AppState::new(services)));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Web server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::container::bootstrap::{bootstrap, EMBEDDINGS, LLM, VECTORSTORE};
    use crate::llm::ChatModel;
    use crate::rag::embeddings::EmbeddingProvider;
    use crate::rag::RagIndex;
    use crate::testing::{FakeEmbeddings, MemoryStore, MockChatModel};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::fs;
    use tower::ServiceExt;

    fn app(project: &std::path::Path, llm: MockChatModel) -> Router {
        let config = AppConfig::from_vars([
            ("ANTHROPIC_API_KEY", "test_key".to_string()),
            ("GODOT_PROJECT_PATH", project.display().to_string()),
        ])
        .unwrap();
        let llm = Arc::new(llm);
        let mut container = bootstrap(config);
        container.register_lazy_singleton(EMBEDDINGS, |_| {
            Ok(Arc::new(FakeEmbeddings::new(8)) as Arc<dyn EmbeddingProvider>)
        });
        container.register_factory(LLM, move |_| Ok(llm.clone() as Arc<dyn ChatModel>));
        container.register_lazy_singleton(VECTORSTORE, |r| {
            let embeddings: Arc<dyn EmbeddingProvider> = r.get(EMBEDDINGS)?;
            Ok(Arc::new(RagIndex::new(embeddings, Arc::new(MemoryStore::default()))))
        });
        let services = Services::resolve(&container).unwrap();
        router(Arc::new(AppState::new(services)))
    }

    async fn post_ask(app: &Router, question: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/ask")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "question": question }).to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), MockChatModel::new("unused"));

        let (status, body) = post_ask(&app, "   ").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No question provided");
    }

    #[tokio::test]
    async fn test_question_is_answered() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), MockChatModel::new("Use move_and_slide()."));

        let (status, body) = post_ask(&app, "How do I move?").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "Use move_and_slide().");
        assert_eq!(body["question"], "How do I move?");
        assert!(body.get("type").is_none());
    }

    #[tokio::test]
    async fn test_commands_share_session() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("enemy.gd"), "extends Node2D").unwrap();
        let app = app(dir.path(), MockChatModel::new("ok"));

        let (_, body) = post_ask(&app, "/read enemy.gd").await;
        assert_eq!(body["type"], "file_content");

        let (_, body) = post_ask(&app, "/clear").await;
        assert_eq!(body["type"], "success");
        assert_eq!(body["answer"], "✓ Cleared file context for: enemy.gd");
    }

    #[tokio::test]
    async fn test_command_error_is_reply() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), MockChatModel::new("ok"));

        let (status, body) = post_ask(&app, "/bogus").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "error");
        assert_eq!(body["answer"], "❌ Command error: Unknown command: /bogus");
    }

    #[tokio::test]
    async fn test_provider_error_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), MockChatModel::failing());

        let (status, body) = post_ask(&app, "Why?").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("request failed"));
    }

    #[tokio::test]
    async fn test_status_reports_index() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), MockChatModel::new("ok"));

        let request = Request::builder()
            .uri("/api/status")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(body["status"], "ready");
        assert_eq!(body["api_provider"], "anthropic");
        assert_eq!(body["model"], "mock-model");
        assert_eq!(body["indexed_chunks"], 0);
    }
}
