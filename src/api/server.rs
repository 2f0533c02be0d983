//! API Server module
//!
//! This module provides the HTTP API server functionality for the tasktree tool.
//! Every mutating route maps onto exactly one store command.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::models::{Command, TaskId};
use crate::store::StoreError;
use crate::view::{TaskTreeNode, TreeView};
use crate::Store;

/// Request to add a new task under the current selection
#[derive(Serialize, Deserialize)]
pub struct AddTaskRequest {
    pub title: String,
}

/// Request to jump the selection to a task
#[derive(Serialize, Deserialize)]
pub struct SelectTaskRequest {
    pub id: TaskId,
}

/// Request to toggle the log-book, or set it when `open` is given
#[derive(Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct LogBookRequest {
    pub open: Option<bool>,
}

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub address: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: ([127, 0, 0, 1], 3000).into(),
        }
    }
}

/// API responses
#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The missing task, when the request failed because of one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            task_id: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            task_id: None,
        }
    }

    fn from_store_error(error: &StoreError) -> Self {
        let mut response = Self::error(error.to_string());
        if let StoreError::TaskNotFound(id) = error {
            response.task_id = Some(*id);
        }
        response
    }
}

fn status_for(error: &StoreError) -> StatusCode {
    match error {
        StoreError::TaskNotFound(_) => StatusCode::NOT_FOUND,
        StoreError::RootTask | StoreError::UnknownDirection(_) => StatusCode::BAD_REQUEST,
    }
}

/// Helper function to map Store results to Axum responses
fn map_store_result<T: Serialize>(result: Result<T, StoreError>) -> Response {
    match result {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::success(data))).into_response(),
        Err(e) => (status_for(&e), Json(ApiResponse::<T>::from_store_error(&e))).into_response(),
    }
}

/// Builds the application router around a store
pub fn router(store: Store) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { Redirect::temporary("/ui") }))
        // --- State --- //
        .route("/api/state", get(get_state))
        .route("/api/view", get(get_view))
        .route("/api/history", get(get_history))
        // --- Tree mutation --- //
        .route("/api/tasks", post(add_task))
        .route("/api/tasks/:id", delete(delete_task))
        .route("/api/tasks/:id/toggle", post(toggle_sub_tasks_open))
        .route("/api/restore", post(restore_task))
        .route("/api/completed", delete(empty_completed_tasks))
        .route("/api/logbook", post(toggle_log_book_open))
        // --- Selection --- //
        .route("/api/select", post(select_task))
        .route("/api/select/:direction", post(select_direction))
        // --- Raw command dispatch --- //
        .route("/api/dispatch", post(dispatch))
        // --- UI --- //
        .route("/ui", get(ui_handler))
        .route("/events", get(events_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(store)
}

/// Starts the API server
pub async fn serve(store: Store, config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let app = router(store);

    // Start server
    tracing::info!("Starting server on {}", config.address);
    let listener = TcpListener::bind(config.address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- State Handlers --- //

async fn get_state(State(store): State<Store>) -> impl IntoResponse {
    map_store_result(Ok::<_, StoreError>(store.state()))
}

async fn get_view(State(store): State<Store>) -> impl IntoResponse {
    map_store_result(Ok::<_, StoreError>(store.view()))
}

async fn get_history(State(store): State<Store>) -> impl IntoResponse {
    map_store_result(Ok::<_, StoreError>(store.history()))
}

// --- Command Handlers --- //

async fn add_task(
    State(store): State<Store>,
    Json(payload): Json<AddTaskRequest>,
) -> impl IntoResponse {
    map_store_result(store.add_task(payload.title))
}

async fn delete_task(State(store): State<Store>, Path(id): Path<TaskId>) -> impl IntoResponse {
    map_store_result(store.delete_task(id))
}

async fn toggle_sub_tasks_open(
    State(store): State<Store>,
    Path(id): Path<TaskId>,
) -> impl IntoResponse {
    map_store_result(store.toggle_sub_tasks_open(id))
}

async fn restore_task(State(store): State<Store>) -> impl IntoResponse {
    map_store_result(store.restore_task())
}

async fn empty_completed_tasks(State(store): State<Store>) -> impl IntoResponse {
    map_store_result(store.empty_completed_tasks())
}

async fn toggle_log_book_open(State(store): State<Store>, body: Bytes) -> Response {
    // An empty body toggles; anything else must be a valid request
    let open = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        match serde_json::from_slice::<LogBookRequest>(&body) {
            Ok(request) => request.open,
            Err(e) => {
                let message = format!("Invalid log-book request: {}", e);
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::<()>::error(message)),
                )
                    .into_response();
            }
        }
    };
    map_store_result(store.toggle_log_book_open(open))
}

async fn select_task(
    State(store): State<Store>,
    Json(payload): Json<SelectTaskRequest>,
) -> impl IntoResponse {
    map_store_result(store.select_task(payload.id))
}

async fn select_direction(
    State(store): State<Store>,
    Path(direction): Path<String>,
) -> impl IntoResponse {
    map_store_result(store.select_direction(&direction))
}

async fn dispatch(State(store): State<Store>, Json(command): Json<Command>) -> impl IntoResponse {
    map_store_result(store.dispatch(command))
}

// --- UI and Event Handlers --- //

async fn events_handler(State(store): State<Store>) -> impl IntoResponse {
    let receiver = store.subscribe();

    let stream = futures::stream::unfold(receiver, |mut receiver| async move {
        match receiver.recv().await {
            // Missed notifications still mean the state changed
            Ok(()) | Err(RecvError::Lagged(_)) => Some((
                Ok::<_, Infallible>("event: update\ndata: change\n\n".to_string()),
                receiver,
            )),
            Err(RecvError::Closed) => None,
        }
    });

    // Set headers for event stream
    let headers = [
        (
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderValue::from_static("text/event-stream"),
        ),
        (
            axum::http::header::CACHE_CONTROL,
            axum::http::HeaderValue::from_static("no-cache"),
        ),
    ];

    (headers, axum::body::Body::from_stream(stream))
}

async fn ui_handler(State(store): State<Store>) -> impl IntoResponse {
    Html(render_ui(&store.view()))
}

/// Renders the tree and log-book as a small self-refreshing HTML page
fn render_ui(view: &TreeView) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html><html><head><title>Tasktree</title><style>");
    html.push_str(
        "body{font-family:monospace}.selected{font-weight:bold;color:#0a7}\
         .closed{color:#888}ul{list-style:none}",
    );
    html.push_str("</style></head><body><h1>Tasktree</h1><ul>");
    for node in &view.nodes {
        render_node(node, &mut html);
    }
    html.push_str("</ul>");

    if view.is_log_book_open {
        html.push_str("<h2>Log-book</h2><ol>");
        for entry in &view.log_book {
            html.push_str(&format!(
                "<li>#{} {} <small>(from {})</small></li>",
                entry.id,
                html_escape::encode_text(&entry.title),
                html_escape::encode_text(entry.parent_title.as_deref().unwrap_or("?")),
            ));
        }
        html.push_str("</ol>");
    } else {
        html.push_str(&format!("<p>{} deleted task(s)</p>", view.log_book.len()));
    }

    html.push_str(
        "<script>new EventSource('/events').addEventListener('update',\
         () => location.reload());</script></body></html>",
    );
    html
}

fn render_node(node: &TaskTreeNode, html: &mut String) {
    let mut classes = Vec::new();
    if node.is_selected {
        classes.push("selected");
    }
    if !node.is_open {
        classes.push("closed");
    }
    let marker = match (node.child_count, node.is_open) {
        (0, _) => "•",
        (_, true) => "▾",
        (_, false) => "▸",
    };

    html.push_str(&format!(
        "<li class=\"{}\" style=\"padding-left:{}em\">{} #{} {}</li>",
        classes.join(" "),
        node.depth * 2,
        marker,
        node.id,
        html_escape::encode_text(&node.title)
    ));
}
