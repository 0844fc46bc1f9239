// fsgate - Library Root
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// All modules exported here for use by the binary and tests.

pub mod config;
pub mod error;
pub mod outcome;
pub mod paths;

// ============================================================================
// SECURITY LAYER - validation, classification, gating
// ============================================================================

pub mod validate;
pub mod security;
pub mod gate;

// ============================================================================
// OPERATION HANDLERS
// ============================================================================

pub mod inspect;
pub mod files;
pub mod dirs;
pub mod transfer;
pub mod search;
pub mod archive;
pub mod hash;
pub mod images;

// ============================================================================
// TRANSPORTS
// ============================================================================

/// Tool name -> handler, shared by every transport
pub mod tools;

/// MCP JSON-RPC 2.0 over stdio
pub mod mcp;

/// REST API over HTTP
pub mod rest;
