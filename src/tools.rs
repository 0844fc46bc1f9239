// fsgate - Tool Dispatch
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Maps a tool name plus a flat JSON argument object onto a handler.
// Shared by the MCP server, the REST surface and the `call` subcommand.

use crate::archive::{self, CompressArgs, DecompressArgs};
use crate::config::ServerConfig;
use crate::dirs::{self, CreateDirArgs, DeleteDirArgs, ListArgs, TreeArgs};
use crate::error::{FsError, Result};
use crate::files::{self, AppendArgs, PathArgs, ReadArgs, ReadManyArgs, WriteArgs};
use crate::hash::{self, HashArgs};
use crate::images::{self, ImageArgs, ListImagesArgs};
use crate::outcome::Outcome;
use crate::search::{self, ContentSearchArgs, FindArgs, SearchFilesArgs};
use crate::transfer::{self, RenameArgs, TransferArgs};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Every tool the server exposes, in listing order
pub const TOOL_NAMES: &[&str] = &[
    "read_file",
    "write_file",
    "append_file",
    "delete_file",
    "file_exists",
    "get_file_info",
    "list_directory",
    "create_directory",
    "delete_directory",
    "directory_tree",
    "copy_file",
    "move_file",
    "rename_file",
    "search_in_files",
    "find_files",
    "search_files",
    "read_multiple_files",
    "compress_file",
    "decompress_file",
    "get_file_hash",
    "get_image",
    "list_images",
];

/// Deserialize a tool's arguments; a missing or mistyped field is a
/// validation error naming the tool.
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: &Value) -> Result<T> {
    let args = if args.is_null() { Value::Object(Default::default()) } else { args.clone() };
    serde_json::from_value(args)
        .map_err(|e| FsError::validation(format!("Invalid arguments for {}: {}", tool, e)))
}

pub fn dispatch(name: &str, args: &Value, config: &ServerConfig) -> Result<Outcome> {
    match name {
        "read_file" => files::read_file(&parse_args::<ReadArgs>(name, args)?, config),
        "write_file" => files::write_file(&parse_args::<WriteArgs>(name, args)?, config),
        "append_file" => files::append_file(&parse_args::<AppendArgs>(name, args)?, config),
        "delete_file" => files::delete_file(&parse_args::<PathArgs>(name, args)?, config),
        "file_exists" => files::file_exists(&parse_args::<PathArgs>(name, args)?, config),
        "get_file_info" => files::get_file_info(&parse_args::<PathArgs>(name, args)?, config),
        "read_multiple_files" => {
            files::read_multiple_files(&parse_args::<ReadManyArgs>(name, args)?, config)
        }

        "list_directory" => dirs::list_directory(&parse_args::<ListArgs>(name, args)?, config),
        "create_directory" => dirs::create_directory(&parse_args::<CreateDirArgs>(name, args)?, config),
        "delete_directory" => dirs::delete_directory(&parse_args::<DeleteDirArgs>(name, args)?, config),
        "directory_tree" => dirs::directory_tree(&parse_args::<TreeArgs>(name, args)?, config),

        "copy_file" => transfer::copy_file(&parse_args::<TransferArgs>(name, args)?, config),
        "move_file" => transfer::move_file(&parse_args::<TransferArgs>(name, args)?, config),
        "rename_file" => transfer::rename_file(&parse_args::<RenameArgs>(name, args)?, config),

        "search_in_files" => search::search_in_files(&parse_args::<ContentSearchArgs>(name, args)?, config),
        "find_files" => search::find_files(&parse_args::<FindArgs>(name, args)?, config),
        "search_files" => search::search_files(&parse_args::<SearchFilesArgs>(name, args)?, config),

        "compress_file" => archive::compress_file(&parse_args::<CompressArgs>(name, args)?, config),
        "decompress_file" => archive::decompress_file(&parse_args::<DecompressArgs>(name, args)?, config),
        "get_file_hash" => hash::get_file_hash(&parse_args::<HashArgs>(name, args)?, config),

        "get_image" => images::get_image(&parse_args::<ImageArgs>(name, args)?, config),
        "list_images" => images::list_images(&parse_args::<ListImagesArgs>(name, args)?, config),

        _ => Err(FsError::UnknownTool(name.to_string())),
    }
}

/// Display text for a dispatch result: the rendered outcome, or `ERROR: ...`
pub fn render_result(result: &Result<Outcome>) -> String {
    match result {
        Ok(outcome) => outcome.render(),
        Err(e) => format!("ERROR: {}", e),
    }
}
