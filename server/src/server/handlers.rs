//! HTTP request handlers

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::deploy::launcher::build_launch_spec;
use crate::deploy::stream;
use crate::errors::DashboardError;
use crate::models::catalog::{ChatChunk, ChatMessage, ChatRequest, HealthReport};
use crate::models::deploy::{DeployRequest, DeployStarted, StdinRequest};
use crate::models::ApiResponse;
use crate::server::state::ServerState;
use crate::telemetry::collect_system_info;
use crate::utils::version_info;
use crate::validators::{validate_chat_request, validate_deploy_request};

fn upstream_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY)
}

fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::error(message))).into_response()
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "modelboard".to_string(),
        version: version.version,
    })
}

/// Version response
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

/// Start a new deployment
pub async fn deploy_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<DeployRequest>,
) -> Response {
    let params = match validate_deploy_request(&request) {
        Ok(params) => params,
        Err(details) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<()>::error_with_details(
                    "Invalid deploy request",
                    details,
                )),
            )
                .into_response()
        }
    };

    let spec = build_launch_spec(&state.script_root, &params);
    match state.registry.create(params.backend, spec).await {
        Ok(deploy_id) => Json(DeployStarted {
            deploy_id,
            status: "started".to_string(),
            message: format!("Deploying {} in {} mode", params.model, params.backend.as_str()),
        })
        .into_response(),
        Err(DashboardError::DeploymentInProgress) => api_error(
            StatusCode::CONFLICT,
            "A deployment is already in progress",
        ),
        Err(e) => {
            error!("Failed to start deployment: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    #[serde(rename = "deployId")]
    pub deploy_id: Option<String>,
}

/// Stream deployment events over SSE
pub async fn deploy_stream_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<StreamQuery>,
) -> Response {
    let Some(deploy_id) = query.deploy_id else {
        return (StatusCode::BAD_REQUEST, "Missing deployId parameter").into_response();
    };

    match stream::subscribe(state.registry.clone(), deploy_id).await {
        None => (StatusCode::NOT_FOUND, "Deployment not found").into_response(),
        Some(events) => {
            let sse_events = events.filter_map(|event| async move {
                Event::default()
                    .json_data(&event)
                    .ok()
                    .map(Ok::<_, Infallible>)
            });
            Sse::new(sse_events)
                .keep_alive(KeepAlive::default())
                .into_response()
        }
    }
}

/// Relay a line of input to a running deployment
pub async fn deploy_stdin_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<StdinRequest>,
) -> Response {
    let (Some(deploy_id), Some(input)) = (request.deploy_id, request.input) else {
        return api_error(StatusCode::BAD_REQUEST, "Missing deployId or input");
    };

    match state.registry.send_input(&deploy_id, &input).await {
        Ok(()) => Json(ApiResponse::<()>::success()).into_response(),
        Err(e @ DashboardError::DeploymentNotFound) => {
            api_error(StatusCode::NOT_FOUND, e.to_string())
        }
        Err(e @ DashboardError::DeploymentNotRunning) => {
            api_error(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// List installed models
pub async fn models_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let models = state.ollama.list_models().await;
    Json(ApiResponse::ok(models))
}

/// Details for one installed model
pub async fn model_details_handler(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> Response {
    match state.ollama.show_model(&name).await {
        Ok(details) => Json(ApiResponse::ok(details)).into_response(),
        Err(DashboardError::Upstream { status, message }) => {
            api_error(upstream_status(status), message)
        }
        Err(e) => api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Delete an installed model
pub async fn model_delete_handler(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> Response {
    match state.ollama.delete_model(&name).await {
        Ok(()) => Json(ApiResponse::ok(serde_json::Value::Null)).into_response(),
        Err(DashboardError::Upstream { status, message }) => {
            api_error(upstream_status(status), message)
        }
        Err(e) => api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

#[derive(Debug, Serialize)]
struct ModelActionResponse {
    message: String,
}

/// Load a model into memory
pub async fn model_start_handler(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> Response {
    match state.ollama.start_model(&name).await {
        Ok(()) => Json(ApiResponse::ok(ModelActionResponse {
            message: format!("Model \"{}\" started", name),
        }))
        .into_response(),
        Err(DashboardError::Upstream { status, message }) => {
            api_error(upstream_status(status), message)
        }
        Err(e) => api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Unload a model from memory
pub async fn model_stop_handler(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> Response {
    match state.ollama.stop_model(&name).await {
        Ok(()) => Json(ApiResponse::ok(ModelActionResponse {
            message: format!("Model \"{}\" stopped", name),
        }))
        .into_response(),
        Err(DashboardError::Upstream { status, message }) => {
            api_error(upstream_status(status), message)
        }
        Err(e) => api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub repo: Option<String>,
}

/// Look up remote model metadata on HuggingFace
pub async fn model_lookup_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<LookupQuery>,
) -> Response {
    let repo = query.repo.unwrap_or_default();
    if !repo.contains('/') {
        return api_error(
            StatusCode::BAD_REQUEST,
            "Missing or invalid repo parameter (expected org/name)",
        );
    }

    match state.hub.lookup(&repo).await {
        Ok(data) => Json(ApiResponse::ok(data)).into_response(),
        Err(DashboardError::Upstream { status, message }) => {
            api_error(upstream_status(status), message)
        }
        Err(e) => api_error(StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

/// Proxy a chat request to the inference runtime, re-emitting the NDJSON
/// stream as SSE chunks
pub async fn chat_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<ChatRequest>,
) -> Response {
    if let Err(details) = validate_chat_request(&request) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error_with_details(
                "Invalid chat request",
                details,
            )),
        )
            .into_response();
    }

    let model = request.model.unwrap_or_default();
    let mut messages = request.conversation_history;
    messages.push(ChatMessage {
        role: "user".to_string(),
        content: request.message.unwrap_or_default(),
    });

    let response = match state.ollama.chat_stream(&model, &messages).await {
        Ok(response) => response,
        Err(DashboardError::Upstream { status, message }) => {
            return api_error(upstream_status(status), message)
        }
        Err(e) => return api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    let chunks = chat_chunk_stream(response);
    let sse_events = chunks.filter_map(|chunk| async move {
        Event::default()
            .json_data(&chunk)
            .ok()
            .map(Ok::<_, Infallible>)
    });
    Sse::new(sse_events)
        .keep_alive(KeepAlive::default())
        .into_response()
}

#[derive(Debug, Deserialize)]
struct OllamaChatChunk {
    #[serde(default)]
    message: Option<OllamaChatMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaChatMessage {
    #[serde(default)]
    content: String,
}

/// Split the runtime's NDJSON chat body into [`ChatChunk`]s, skipping
/// malformed lines.
fn chat_chunk_stream(response: reqwest::Response) -> impl futures::Stream<Item = ChatChunk> {
    let body = response.bytes_stream();
    futures::stream::unfold(
        (body, String::new(), std::collections::VecDeque::new(), false),
        |(mut body, mut buffer, mut queue, mut finished)| async move {
            loop {
                if let Some(chunk) = queue.pop_front() {
                    return Some((chunk, (body, buffer, queue, finished)));
                }
                if finished {
                    return None;
                }

                match body.next().await {
                    Some(Ok(bytes)) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));
                        while let Some(pos) = buffer.find('\n') {
                            let line = buffer[..pos].trim().to_string();
                            buffer.drain(..=pos);
                            if line.is_empty() {
                                continue;
                            }
                            if let Ok(parsed) = serde_json::from_str::<OllamaChatChunk>(&line) {
                                let content =
                                    parsed.message.map(|m| m.content).unwrap_or_default();
                                queue.push_back(ChatChunk::content(content, parsed.done));
                            }
                        }
                    }
                    Some(Err(e)) => {
                        queue.push_back(ChatChunk::error(e.to_string()));
                        finished = true;
                    }
                    None => {
                        finished = true;
                    }
                }
            }
        },
    )
}

/// Host system facts
pub async fn system_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let mut info = collect_system_info().await;
    if info.gpu.is_some() {
        info.vllm_kv_cache_percent = state.vllm.kv_cache_usage().await;
    }
    Json(ApiResponse::ok(info))
}

/// Health of the inference runtimes
pub async fn runtime_health_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let ollama = state.ollama.probe().await;
    let vllm = state.vllm.probe_any().await;
    Json(ApiResponse::ok(HealthReport { ollama, vllm }))
}
