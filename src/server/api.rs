use crate::agent::{ AgentError, TutorAgent };
use crate::graph::RenderError;
use crate::llm::CompletionError;
use crate::models::chat::ChatMessage;
use std::sync::Arc;
use axum::{
    routing::{ get, post },
    Router,
    extract::{ rejection::JsonRejection, State },
    response::{ IntoResponse, Response },
    http::StatusCode,
    Json,
};
use serde::{ Deserialize, Serialize };
use serde_json::Value as JsonValue;
use tower_http::cors::{ Any, CorsLayer };
use log::{ debug, error };

#[derive(Deserialize)]
pub struct AskRequest {
    /// Informational; the question is already the last message.
    #[serde(default)]
    pub question: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum GraphContent {
    One(String),
    Many(Vec<String>),
}

impl GraphContent {
    pub fn into_functions(self) -> Vec<String> {
        match self {
            GraphContent::One(function) => vec![function],
            GraphContent::Many(functions) => functions,
        }
    }
}

#[derive(Deserialize)]
pub struct GraphRequest {
    pub content: GraphContent,
}

#[derive(Serialize)]
struct AskResponse {
    status: &'static str,
    whiteboard: Vec<JsonValue>,
    answer: String,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct GraphResponse {
    status: &'static str,
    image: String,
    config: JsonValue,
}

#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    message: String,
}

/// Error body `{status: "error", message}` with a matching HTTP status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        let status = match &err {
            AgentError::EmptyConversation => StatusCode::BAD_REQUEST,
            AgentError::Completion(CompletionError::Upstream { status, .. }) =>
                StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
            AgentError::Render(RenderError::Function { .. } | RenderError::InvalidRange { .. }) =>
                StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { status, message: err.to_string() }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        error!("Rejected request body: {}", rejection.body_text());
        Self { status: rejection.status(), message: rejection.body_text() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse { status: "error", message: self.message };
        (self.status, Json(body)).into_response()
    }
}

#[derive(Clone)]
struct AppState {
    agent: Arc<TutorAgent>,
}

pub fn router(agent: Arc<TutorAgent>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/ask", post(ask_handler))
        .route("/render_graph", post(render_graph_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(AppState { agent })
}

async fn ask_handler(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    debug!("/ask with {} message(s): {}", req.messages.len(), req.question);

    let outcome = state.agent.ask(req.messages).await.map_err(|e| {
        error!("Question answering error: {}", e);
        ApiError::from(e)
    })?;

    Ok(
        Json(AskResponse {
            status: "success",
            whiteboard: outcome.answer.widgets,
            answer: outcome.answer.answer,
            messages: outcome.conversation,
        })
    )
}

async fn render_graph_handler(
    State(state): State<AppState>,
    payload: Result<Json<GraphRequest>, JsonRejection>
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let functions = req.content.into_functions();
    debug!("/render_graph for {:?}", functions);

    let outcome = state.agent.render_graph(functions).await.map_err(|e| {
        error!("Graph generation error: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(GraphResponse { status: "success", image: outcome.image, config: outcome.config }))
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
