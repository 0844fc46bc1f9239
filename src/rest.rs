// fsgate - REST Surface
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// HTTP front end over the same tool dispatcher the MCP server uses.
// GET routes read query parameters, POST routes read a JSON object body.
// Short parameter names (path, text, source, ...) are translated to tool
// argument names per tool. Handlers run on the blocking pool.

use crate::config::ServerConfig;
use crate::error::{FaultClass, Result};
use crate::images::{self, ImageArgs};
use crate::mcp::param_summary;
use crate::outcome::{Outcome, OutcomeKind};
use crate::tools::{self, parse_args};
use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, on, post, MethodFilter, MethodRouter},
    Router,
};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

type AppState = Arc<ServerConfig>;

/// Query-string values parsed as booleans
const BOOL_PARAMS: &[&str] = &[
    "recursive", "show_hidden", "overwrite", "case_sensitive", "regex",
    "as_base64", "is_base64", "parents",
];

/// Query-string values parsed as integers
const INT_PARAMS: &[&str] = &["max_depth", "max_results", "compression_level", "max_size", "quality"];

/// Tools whose `path` parameter names a directory
const DIRECTORY_TOOLS: &[&str] = &[
    "list_directory", "directory_tree", "create_directory", "delete_directory",
    "search_in_files", "find_files", "search_files", "list_images",
];

const HELP: &[(&str, &str)] = &[
    ("GET /api/read", "Read file - ?path=<file>&encoding=utf-8"),
    ("POST /api/write", "Write file - Body: {path, content, encoding}"),
    ("POST /api/append", "Append to file - Body: {path, content}"),
    ("DELETE /api/file", "Delete file - ?path=<file>"),
    ("GET /api/list", "List directory - ?path=<dir>&recursive=true&pattern=*.py"),
    ("GET /api/tree", "Directory tree - ?path=<dir>&max_depth=3"),
    ("POST /api/mkdir", "Create directory - Body: {path, parents}"),
    ("GET /api/search", "Search in files - ?path=<dir>&text=<query>&pattern=*.py"),
    ("GET /api/find", "Find files - ?path=<dir>&pattern=*.txt"),
    ("POST /api/copy", "Copy file - Body: {source, destination, overwrite}"),
    ("POST /api/move", "Move file - Body: {source, destination, overwrite}"),
    ("GET /api/hash", "File hash - ?path=<file>&algorithm=sha256"),
    ("POST /api/compress", "Create ZIP - Body: {path, output, level}"),
    ("POST /api/decompress", "Extract ZIP - Body: {path, output}"),
    ("GET /api/image", "Image bytes - ?path=<image>&max_size=1920"),
    ("GET /api/image/base64", "Image as data URL - ?path=<image>"),
    ("GET /api/images", "List images - ?path=<dir>&recursive=true"),
];

/// What a route does with its translated parameters
#[derive(Debug, Clone, Copy)]
enum Endpoint {
    Tool(&'static str),
    ImageBytes,
    ImageDataUrl,
}

impl Endpoint {
    fn tool(self) -> &'static str {
        match self {
            Endpoint::Tool(name) => name,
            Endpoint::ImageBytes | Endpoint::ImageDataUrl => "get_image",
        }
    }
}

// ============================================================================
// PARAMETER TRANSLATION
// ============================================================================

/// Tool argument name for a REST parameter
fn argument_name(tool: &str, key: &str) -> String {
    let renamed = match (key, tool) {
        ("path", "compress_file") => "source_path",
        ("path", "decompress_file") => "archive_path",
        ("path", t) if DIRECTORY_TOOLS.contains(&t) => "directory_path",
        ("path", _) => "file_path",
        ("paths", _) => "file_paths",
        ("text", "search_in_files") => "search_text",
        ("text", _) => "content",
        ("pattern", "search_in_files") => "file_pattern",
        ("source", _) => "source_path",
        ("destination", _) => "destination_path",
        ("output", "decompress_file") => "output_directory",
        ("output", _) => "output_path",
        ("level", _) => "compression_level",
        _ => key,
    };
    renamed.to_string()
}

/// Query strings carry only text; recover booleans and integers by name
fn coerce(key: &str, raw: String) -> Value {
    if BOOL_PARAMS.contains(&key) {
        match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => return Value::Bool(true),
            "false" | "0" | "no" => return Value::Bool(false),
            _ => {}
        }
    }
    if INT_PARAMS.contains(&key) {
        if let Ok(n) = raw.parse::<i64>() {
            return Value::from(n);
        }
    }
    Value::String(raw)
}

fn translate(tool: &str, params: Map<String, Value>) -> Value {
    let args = params
        .into_iter()
        .map(|(key, value)| (argument_name(tool, &key), value))
        .collect();
    Value::Object(args)
}

fn params_from_query(tool: &str, query: HashMap<String, String>) -> Value {
    let params = query
        .into_iter()
        .map(|(key, raw)| {
            let name = argument_name(tool, &key);
            let value = coerce(&name, raw);
            (key, value)
        })
        .collect();
    translate(tool, params)
}

fn params_from_body(tool: &str, body: &[u8]) -> std::result::Result<Value, String> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(translate(tool, Map::new()));
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(params)) => Ok(translate(tool, params)),
        Ok(_) => Err("Request body must be a JSON object".to_string()),
        Err(e) => Err(format!("Invalid JSON body: {}", e)),
    }
}

// ============================================================================
// RESPONSES
// ============================================================================

fn status_for(class: FaultClass) -> StatusCode {
    match class {
        FaultClass::BadRequest => StatusCode::BAD_REQUEST,
        FaultClass::NotFound => StatusCode::NOT_FOUND,
        FaultClass::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        FaultClass::NotImplemented => StatusCode::NOT_IMPLEMENTED,
        FaultClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure(status: StatusCode, error: impl Into<String>) -> Response {
    (status, Json(json!({ "success": false, "error": error.into() }))).into_response()
}

/// Envelope for a dispatcher result. Blocked and refused outcomes are
/// reported as failures with their own status codes.
fn respond(result: Result<Outcome>) -> Response {
    match result {
        Ok(outcome) => {
            let status = outcome.status();
            let text = outcome.render();
            match outcome.kind {
                OutcomeKind::Success => Json(json!({
                    "success": true,
                    "status": status,
                    "result": text,
                }))
                .into_response(),
                OutcomeKind::Blocked | OutcomeKind::Refused => {
                    let code = if outcome.kind == OutcomeKind::Blocked {
                        StatusCode::FORBIDDEN
                    } else {
                        StatusCode::CONFLICT
                    };
                    (code, Json(json!({ "success": false, "status": status, "error": text })))
                        .into_response()
                }
            }
        }
        Err(e) => failure(status_for(e.fault_class()), e.to_string()),
    }
}

fn respond_image(endpoint: Endpoint, args: Value, config: &ServerConfig) -> Response {
    let payload = match parse_args::<ImageArgs>("get_image", &args).and_then(|a| images::load_image(&a, config)) {
        Ok(p) => p,
        Err(e) => return failure(status_for(e.fault_class()), e.to_string()),
    };
    match endpoint {
        Endpoint::ImageDataUrl => Json(json!({
            "success": true,
            "status": "success",
            "result": payload,
            "data_url": payload.data_url(),
        }))
        .into_response(),
        _ => ([(header::CONTENT_TYPE, payload.mime_type.clone())], payload.data).into_response(),
    }
}

async fn invoke(config: AppState, endpoint: Endpoint, args: Value) -> Response {
    let tool = endpoint.tool();
    log::info!("REST {} | {}", tool, param_summary(tool, &args));

    let joined = tokio::task::spawn_blocking(move || match endpoint {
        Endpoint::Tool(name) => {
            let result = tools::dispatch(name, &args, &config);
            if let Err(e) = &result {
                log::warn!("FAIL {} | {}", name, e);
            }
            respond(result)
        }
        Endpoint::ImageBytes | Endpoint::ImageDataUrl => respond_image(endpoint, args, &config),
    })
    .await;

    match joined {
        Ok(response) => response,
        Err(e) => {
            log::error!("REST worker for {} failed: {}", tool, e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, format!("Worker failed: {}", e))
        }
    }
}

// ============================================================================
// ROUTES
// ============================================================================

fn via_query(filter: MethodFilter, endpoint: Endpoint) -> MethodRouter<AppState> {
    on(
        filter,
        move |State(config): State<AppState>, Query(query): Query<HashMap<String, String>>| async move {
            invoke(config, endpoint, params_from_query(endpoint.tool(), query)).await
        },
    )
}

fn via_body(endpoint: Endpoint) -> MethodRouter<AppState> {
    post(move |State(config): State<AppState>, body: Bytes| async move {
        match params_from_body(endpoint.tool(), &body) {
            Ok(args) => invoke(config, endpoint, args).await,
            Err(e) => failure(StatusCode::BAD_REQUEST, e),
        }
    })
}

/// GET with query parameters and POST with a JSON body
fn either(endpoint: Endpoint) -> MethodRouter<AppState> {
    via_query(MethodFilter::GET, endpoint).merge(via_body(endpoint))
}

async fn help() -> Json<Value> {
    let endpoints: Map<String, Value> = HELP
        .iter()
        .map(|(route, text)| (route.to_string(), Value::String(text.to_string())))
        .collect();
    Json(json!({
        "name": "fsgate",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": endpoints,
        "note": "GET endpoints also accept POST with the same parameters as a JSON body",
    }))
}

async fn unknown_route() -> Response {
    failure(StatusCode::NOT_FOUND, "Unknown endpoint; see GET /api")
}

/// Build the router
pub fn router(config: ServerConfig) -> Router {
    use Endpoint::Tool;

    Router::new()
        .route("/api", get(help))
        .route("/api/read", either(Tool("read_file")))
        .route("/api/write", via_body(Tool("write_file")))
        .route("/api/append", via_body(Tool("append_file")))
        .route("/api/file", via_query(MethodFilter::DELETE, Tool("delete_file")))
        .route("/api/delete", via_body(Tool("delete_file")))
        .route("/api/list", either(Tool("list_directory")))
        .route("/api/tree", either(Tool("directory_tree")))
        .route("/api/mkdir", via_body(Tool("create_directory")))
        .route("/api/search", either(Tool("search_in_files")))
        .route("/api/find", either(Tool("find_files")))
        .route("/api/copy", via_body(Tool("copy_file")))
        .route("/api/move", via_body(Tool("move_file")))
        .route("/api/hash", either(Tool("get_file_hash")))
        .route("/api/compress", via_body(Tool("compress_file")))
        .route("/api/decompress", via_body(Tool("decompress_file")))
        .route("/api/image", either(Endpoint::ImageBytes))
        .route("/api/image/base64", either(Endpoint::ImageDataUrl))
        .route("/api/images", either(Tool("list_images")))
        .fallback(unknown_route)
        .with_state(Arc::new(config))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("Shutdown signal received"),
        Err(e) => {
            log::error!("Cannot listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

/// Serve the REST API until ctrl-c
pub async fn serve(bind: SocketAddr, config: ServerConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    log::info!("REST API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(config))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("REST server failed")?;

    log::info!("REST API stopped");
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
