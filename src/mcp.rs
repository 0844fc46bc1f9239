// fsgate - MCP Server (JSON-RPC 2.0 over stdio)
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// One JSON-RPC message per line on stdin, one response per line on stdout.
// stdout carries protocol frames only; all logging goes through `log`.
// Exposes every file tool in tools::TOOL_NAMES.

use crate::config::ServerConfig;
use crate::images::{self, ImageArgs};
use crate::outcome::OutcomeKind;
use crate::tools::{self, parse_args};
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "fsgate";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// JSON-RPC error codes
const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}…", s.chars().take(max).collect::<String>())
    } else {
        s.to_string()
    }
}

/// Summarize tool params for logging (truncate large values)
pub fn param_summary(name: &str, args: &Value) -> String {
    let text = |key: &str| args.get(key).and_then(|v| v.as_str());
    match name {
        "write_file" | "append_file" => {
            let size = text("content").map(|s| s.len()).unwrap_or(0);
            format!("path={} content_len={}", text("file_path").unwrap_or("?"), size)
        }
        "copy_file" | "move_file" => format!(
            "from={} to={}",
            text("source_path").unwrap_or("?"),
            text("destination_path").unwrap_or("?")
        ),
        "compress_file" => format!(
            "source={} output={}",
            text("source_path").unwrap_or("?"),
            text("output_path").unwrap_or("?")
        ),
        "decompress_file" => format!(
            "archive={} output={}",
            text("archive_path").unwrap_or("?"),
            text("output_directory").unwrap_or("?")
        ),
        "search_in_files" | "find_files" | "search_files" => {
            let pattern = text("search_text")
                .or_else(|| text("pattern"))
                .or_else(|| text("content_pattern"))
                .or_else(|| text("name_pattern"))
                .unwrap_or("?");
            format!("dir={} pattern={}", text("directory_path").unwrap_or("?"), truncate(pattern, 150))
        }
        _ => {
            match text("file_path").or_else(|| text("directory_path")) {
                Some(path) => format!("path={}", path),
                None => truncate(&args.to_string(), 300),
            }
        }
    }
}

fn write_frame(frame: &Value) {
    let msg = match serde_json::to_string(frame) {
        Ok(m) => m,
        Err(e) => {
            log::error!("Failed to serialize response: {}", e);
            return;
        }
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let _ = out.write_all(msg.as_bytes());
    let _ = out.write_all(b"\n");
    let _ = out.flush();
}

/// Send JSON-RPC response
fn send_response(id: &Value, result: Value) {
    write_frame(&json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    }));
}

/// Send JSON-RPC error response
fn send_error(id: &Value, code: i64, message: &str) {
    write_frame(&json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message },
    }));
}

/// MCP tool definition helper
fn tool_def(name: &str, description: &str, properties: Value, required: Vec<&str>) -> Value {
    json!({
        "name": name,
        "description": description,
        "inputSchema": {
            "type": "object",
            "properties": properties,
            "required": required,
        }
    })
}

/// Return all tool definitions
pub fn tool_definitions() -> Vec<Value> {
    vec![
        // ====== FILES ======
        tool_def(
            "read_file",
            "Read a file. Text is decoded (encoding auto-detected unless given); binary content is returned as base64.",
            json!({
                "file_path": {"type": "string", "description": "Path to the file"},
                "encoding": {"type": "string", "description": "Text encoding (default: auto-detect)"},
                "as_base64": {"type": "boolean", "description": "Return raw bytes as base64", "default": false}
            }),
            vec!["file_path"],
        ),
        tool_def(
            "write_file",
            "Write a file, creating parent directories. Content is text in the given encoding, or base64 when is_base64 is set.",
            json!({
                "file_path": {"type": "string", "description": "Path to the file"},
                "content": {"type": "string", "description": "Content to write"},
                "encoding": {"type": "string", "description": "Text encoding (default: utf-8)"},
                "is_base64": {"type": "boolean", "description": "Content is base64-encoded bytes", "default": false}
            }),
            vec!["file_path", "content"],
        ),
        tool_def(
            "append_file",
            "Append text to a file, creating it and its parent directories if needed.",
            json!({
                "file_path": {"type": "string", "description": "Path to the file"},
                "content": {"type": "string", "description": "Text to append"},
                "encoding": {"type": "string", "description": "Text encoding (default: utf-8)"}
            }),
            vec!["file_path", "content"],
        ),
        tool_def(
            "delete_file",
            "Delete a file. Blocked for system-critical locations, and for dangerous extensions unless dangerous operations are enabled.",
            json!({
                "file_path": {"type": "string", "description": "Path to the file"}
            }),
            vec!["file_path"],
        ),
        tool_def(
            "file_exists",
            "Check whether a file exists; reports its type and size when it does.",
            json!({
                "file_path": {"type": "string", "description": "Path to check"}
            }),
            vec!["file_path"],
        ),
        tool_def(
            "get_file_info",
            "File metadata: type, size, permissions and timestamps.",
            json!({
                "file_path": {"type": "string", "description": "Path to the file"}
            }),
            vec!["file_path"],
        ),
        tool_def(
            "read_multiple_files",
            "Read several files in one call. Each file's failure is reported in its own section.",
            json!({
                "file_paths": {"type": "array", "items": {"type": "string"}, "description": "Paths to read"},
                "encoding": {"type": "string", "description": "Text encoding for every file (default: auto-detect)"}
            }),
            vec!["file_paths"],
        ),

        // ====== DIRECTORIES ======
        tool_def(
            "list_directory",
            "List a directory: directories first, then files, with sizes.",
            json!({
                "directory_path": {"type": "string", "description": "Directory to list"},
                "recursive": {"type": "boolean", "description": "Include subdirectories", "default": false},
                "show_hidden": {"type": "boolean", "description": "Include dot-files", "default": false},
                "pattern": {"type": "string", "description": "Glob filter (e.g. *.py)"}
            }),
            vec!["directory_path"],
        ),
        tool_def(
            "create_directory",
            "Create a directory. An existing directory is reported, not an error.",
            json!({
                "directory_path": {"type": "string", "description": "Directory to create"},
                "parents": {"type": "boolean", "description": "Create missing parents", "default": true}
            }),
            vec!["directory_path"],
        ),
        tool_def(
            "delete_directory",
            "Delete a directory. Non-empty directories need recursive=true. Gated like file deletion.",
            json!({
                "directory_path": {"type": "string", "description": "Directory to delete"},
                "recursive": {"type": "boolean", "description": "Delete contents too", "default": false}
            }),
            vec!["directory_path"],
        ),
        tool_def(
            "directory_tree",
            "Render a directory as a tree.",
            json!({
                "directory_path": {"type": "string", "description": "Root directory"},
                "max_depth": {"type": "integer", "description": "Maximum depth (default: 3)", "default": 3},
                "show_hidden": {"type": "boolean", "description": "Include dot-files", "default": false}
            }),
            vec!["directory_path"],
        ),

        // ====== COPY / MOVE ======
        tool_def(
            "copy_file",
            "Copy a file. Refuses to replace an existing destination unless overwrite is set.",
            json!({
                "source_path": {"type": "string", "description": "File to copy"},
                "destination_path": {"type": "string", "description": "Target path"},
                "overwrite": {"type": "boolean", "description": "Replace an existing destination", "default": false}
            }),
            vec!["source_path", "destination_path"],
        ),
        tool_def(
            "move_file",
            "Move a file. Both source and destination are checked by the security gate.",
            json!({
                "source_path": {"type": "string", "description": "File to move"},
                "destination_path": {"type": "string", "description": "Target path"},
                "overwrite": {"type": "boolean", "description": "Replace an existing destination", "default": false}
            }),
            vec!["source_path", "destination_path"],
        ),
        tool_def(
            "rename_file",
            "Rename a file within its directory. new_name must be a bare filename.",
            json!({
                "file_path": {"type": "string", "description": "File to rename"},
                "new_name": {"type": "string", "description": "New file name"},
                "overwrite": {"type": "boolean", "description": "Replace an existing file", "default": false}
            }),
            vec!["file_path", "new_name"],
        ),

        // ====== SEARCH ======
        tool_def(
            "search_in_files",
            "Search text files under a directory line by line. Binary files are skipped.",
            json!({
                "directory_path": {"type": "string", "description": "Directory to search"},
                "search_text": {"type": "string", "description": "Text (or regex) to find"},
                "file_pattern": {"type": "string", "description": "Glob filter for file names", "default": "*"},
                "case_sensitive": {"type": "boolean", "description": "Match case", "default": false},
                "regex": {"type": "boolean", "description": "Treat search_text as a regex", "default": false},
                "max_results": {"type": "integer", "description": "Result cap"}
            }),
            vec!["directory_path", "search_text"],
        ),
        tool_def(
            "find_files",
            "Find files by name pattern in a recursive walk.",
            json!({
                "directory_path": {"type": "string", "description": "Directory to search"},
                "pattern": {"type": "string", "description": "Glob pattern (e.g. *.py)"},
                "case_sensitive": {"type": "boolean", "description": "Match case", "default": false},
                "max_results": {"type": "integer", "description": "Result cap"}
            }),
            vec!["directory_path", "pattern"],
        ),
        tool_def(
            "search_files",
            "Combined search by file name and/or content. At least one pattern is required.",
            json!({
                "directory_path": {"type": "string", "description": "Directory to search"},
                "name_pattern": {"type": "string", "description": "Glob pattern for names"},
                "content_pattern": {"type": "string", "description": "Text to find in files"},
                "max_results": {"type": "integer", "description": "Result cap"}
            }),
            vec!["directory_path"],
        ),

        // ====== ARCHIVES / HASHING ======
        tool_def(
            "compress_file",
            "Compress a file or directory into a ZIP archive.",
            json!({
                "source_path": {"type": "string", "description": "File or directory to compress"},
                "output_path": {"type": "string", "description": "ZIP file to create"},
                "compression_level": {"type": "integer", "description": "0-9 (default: 6)", "default": 6}
            }),
            vec!["source_path", "output_path"],
        ),
        tool_def(
            "decompress_file",
            "Extract a ZIP archive. Archives with entries escaping the output directory are rejected before extraction.",
            json!({
                "archive_path": {"type": "string", "description": "ZIP file"},
                "output_directory": {"type": "string", "description": "Directory to extract into"}
            }),
            vec!["archive_path", "output_directory"],
        ),
        tool_def(
            "get_file_hash",
            "Hash a file with md5, sha1, sha256 or sha512.",
            json!({
                "file_path": {"type": "string", "description": "File to hash"},
                "algorithm": {"type": "string", "description": "md5 | sha1 | sha256 | sha512 (default: sha256)", "default": "sha256"}
            }),
            vec!["file_path"],
        ),

        // ====== IMAGES ======
        tool_def(
            "get_image",
            "Return an image for viewing. Large images are resized and re-encoded.",
            json!({
                "file_path": {"type": "string", "description": "Image file"},
                "max_size": {"type": "integer", "description": "Maximum width/height in pixels"},
                "quality": {"type": "integer", "description": "JPEG quality 1-100"}
            }),
            vec!["file_path"],
        ),
        tool_def(
            "list_images",
            "List image files in a directory.",
            json!({
                "directory_path": {"type": "string", "description": "Directory to scan"},
                "recursive": {"type": "boolean", "description": "Include subdirectories", "default": false}
            }),
            vec!["directory_path"],
        ),
    ]
}

/// Run one tool and build the MCP `tools/call` result
fn handle_tool_call(name: &str, args: &Value, config: &ServerConfig) -> Value {
    // get_image also carries the picture itself as an image content block
    if name == "get_image" {
        let loaded = parse_args::<ImageArgs>(name, args).and_then(|a| images::load_image(&a, config));
        return match loaded {
            Ok(payload) => json!({
                "content": [
                    {"type": "text", "text": payload.to_outcome().render()},
                    {"type": "image", "data": payload.to_base64(), "mimeType": payload.mime_type},
                ]
            }),
            Err(e) => {
                log::warn!("FAIL {} | {}", name, e);
                json!({"content": [{"type": "text", "text": format!("ERROR: {}", e)}], "isError": true})
            }
        };
    }

    let result = tools::dispatch(name, args, config);
    let text = tools::render_result(&result);

    match &result {
        Ok(outcome) if outcome.kind != OutcomeKind::Success => {
            log::warn!("{} {} | {}", outcome.status().marker(), name, outcome.headline);
        }
        Err(e) => log::warn!("FAIL {} | {}", name, e),
        Ok(_) => {}
    }

    json!({
        "content": [{"type": "text", "text": text}],
        "isError": result.is_err(),
    })
}

/// Handle one parsed JSON-RPC message
fn handle_message(msg: &Value, config: &ServerConfig) {
    let method = msg["method"].as_str().unwrap_or("");
    let id = &msg["id"];
    let params = &msg["params"];

    log::debug!("Received: {}", method);

    match method {
        "initialize" => {
            send_response(id, json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": SERVER_VERSION,
                }
            }));
        }

        "notifications/initialized" => {
            // No response needed
        }

        "tools/list" => {
            send_response(id, json!({ "tools": tool_definitions() }));
        }

        "tools/call" => {
            let name = params["name"].as_str().unwrap_or("");
            let args = params.get("arguments").cloned().unwrap_or(json!({}));

            log::info!("CALL {} | {}", name, param_summary(name, &args));
            send_response(id, handle_tool_call(name, &args, config));
        }

        "ping" => {
            send_response(id, json!({}));
        }

        _ => {
            // Notifications carry no id and get no reply
            if !id.is_null() {
                send_error(id, METHOD_NOT_FOUND, &format!("Method not found: {}", method));
            }
        }
    }
}

/// Serve MCP over stdio until stdin closes
pub fn run(config: &ServerConfig) {
    log::info!("Starting {} v{}", SERVER_NAME, SERVER_VERSION);
    log::info!(
        "Dangerous operations: {}",
        if config.enable_dangerous_operations { "ENABLED" } else { "disabled" }
    );

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                log::error!("stdin read error: {}", e);
                continue;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(line) {
            Ok(msg) => handle_message(&msg, config),
            Err(e) => {
                log::warn!("JSON parse error: {}", e);
                send_error(&Value::Null, PARSE_ERROR, &format!("Parse error: {}", e));
            }
        }
    }

    log::info!("stdin closed, shutting down");
}
