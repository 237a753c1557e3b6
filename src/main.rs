use std::convert::Infallible;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use clap::Parser;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use komath_chat::auth;
use komath_chat::chat::ChatClient;
use komath_chat::config::AppConfig;
use komath_chat::error::RetrievalError;
use komath_chat::models::{
    ChatRequest, LoginRequest, LoginResponse, TranscriptResponse, TurnRequest,
};
use komath_chat::rag::embeddings::EmbeddingClient;
use komath_chat::rag::RagEngine;
use komath_chat::state::SessionState;

struct AppState {
    config: AppConfig,
    session: SessionState,
    rag: RagEngine,
    chat: ChatClient,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    let config = AppConfig::parse();

    tracing::info!("corpus directory: {}", config.corpus_dir.display());
    tracing::info!("upstream API base: {}", config.api_base);
    tracing::info!("chat model: {}, embedding model: {}", config.chat_model, config.embedding_model);

    // system primer is read here; a missing file aborts startup
    let session = SessionState::init(&config)?;

    let http = reqwest::Client::new();
    let rag = RagEngine::new(
        EmbeddingClient::new(
            http.clone(),
            &config.api_base,
            config.api_key.clone(),
            config.embedding_model.clone(),
        ),
        config.top_k,
    );
    let chat = ChatClient::new(http, &config.api_base, config.api_key.clone());

    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState {
        config,
        session,
        rag,
        chat,
    });

    // CORS for the browser UI
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/v1/auth/login", post(login_handler))
        .route("/api/v1/chat", post(chat_handler))
        .route("/api/v1/messages", get(messages_handler))
        .route("/api/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("chat backend listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    match auth::verify_password(&request.password, &state.config.password_sha256) {
        Ok(()) => {
            state.session.mark_authenticated().await;
            tracing::info!("session authenticated");
            Ok(Json(LoginResponse {
                authenticated: true,
            }))
        }
        Err(e) => {
            tracing::warn!("login rejected");
            Err((StatusCode::UNAUTHORIZED, e.to_string()))
        }
    }
}

async fn messages_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TranscriptResponse>, (StatusCode, String)> {
    if !state.session.is_authenticated().await {
        return Err((StatusCode::UNAUTHORIZED, "login required".to_string()));
    }

    let session = state.session.session().lock().await;
    Ok(Json(TranscriptResponse {
        messages: session.transcript().to_vec(),
    }))
}

async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TurnRequest>,
) -> Result<Sse<ReceiverStream<Result<Event, Infallible>>>, (StatusCode, String)> {
    if !state.session.is_authenticated().await {
        return Err((StatusCode::UNAUTHORIZED, "login required".to_string()));
    }

    let request_id = Uuid::new_v4();

    // 1. the corpus may load here on the first turn of the session
    let corpus = state.session.corpus().map_err(|e| {
        tracing::error!("corpus load failed: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, format!("corpus error: {}", e))
    })?;

    // 2. persist the raw question; grounding never reaches stored history
    {
        let mut session = state.session.session().lock().await;
        session.append_user(&request.message);
    }

    // 3. retrieval: embed the question, rank the corpus, build the grounded turn
    let grounded = state
        .rag
        .retrieve(&request.message, corpus)
        .await
        .map_err(|e| match e {
            RetrievalError::Embedding(err) => {
                tracing::error!("embedding failed for request {}: {}", request_id, err);
                (StatusCode::BAD_GATEWAY, format!("embedding error: {}", err))
            }
            RetrievalError::Dimension(err) => {
                tracing::error!("dimension mismatch for request {}: {}", request_id, err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        })?;

    let request_messages = {
        let session = state.session.session().lock().await;
        session.build_request_messages(grounded)
    };

    // 4. streamed completion upstream
    let upstream = ChatRequest {
        model: state.config.chat_model.clone(),
        messages: request_messages,
        temperature: None,
        max_tokens: None,
        stream: Some(true),
    };

    let mut completion = state.chat.stream_chat(&upstream).await.map_err(|e| {
        tracing::error!("chat completion failed for request {}: {}", request_id, e);
        (StatusCode::BAD_GATEWAY, format!("chat error: {}", e))
    })?;

    // 5. forward deltas as they arrive, then persist the accumulated answer.
    // An early-terminated stream keeps whatever partial text accumulated.
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Event, Infallible>>(32);
    let state = Arc::clone(&state);
    tokio::spawn(async move {
        let mut full_response = String::new();
        loop {
            match completion.next_delta().await {
                Ok(Some(delta)) => {
                    if delta.is_empty() {
                        continue;
                    }
                    full_response.push_str(&delta);
                    // JSON framing keeps multi-line deltas intact over SSE
                    let event = match Event::default()
                        .json_data(serde_json::json!({ "content": delta }))
                    {
                        Ok(event) => event,
                        Err(e) => {
                            tracing::warn!("unsendable delta in request {}: {}", request_id, e);
                            continue;
                        }
                    };
                    if tx.send(Ok(event)).await.is_err() {
                        tracing::warn!("client disconnected during request {}", request_id);
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("stream error during request {}: {}", request_id, e);
                    break;
                }
            }
        }

        let mut session = state.session.session().lock().await;
        session.append_assistant(full_response);
        tracing::info!("request {} complete", request_id);
    });

    Ok(Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default()))
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let upstream_healthy = state.chat.health_check().await.unwrap_or(false);

    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "services": {
            "model_api": upstream_healthy
        }
    }))
}
