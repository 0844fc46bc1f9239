// fsgate - End-to-end tool behaviour
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Drives the shared dispatcher exactly as the MCP and REST transports do.

use fsgate::config::ServerConfig;
use fsgate::error::FsError;
use fsgate::gate::{self, Operation};
use fsgate::outcome::{Outcome, OutcomeKind, Status};
use fsgate::security::{self, Category};
use fsgate::tools::{dispatch, render_result};
use serde_json::{json, Value};
use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

fn s(p: &Path) -> &str {
    p.to_str().unwrap()
}

fn call(tool: &str, args: Value, config: &ServerConfig) -> Outcome {
    match dispatch(tool, &args, config) {
        Ok(outcome) => outcome,
        Err(e) => panic!("{} failed: {}", tool, e),
    }
}

fn overrides_on() -> ServerConfig {
    ServerConfig { enable_dangerous_operations: true, ..Default::default() }
}

#[cfg(unix)]
#[test]
fn critical_paths_are_never_destructible() {
    for raw in ["/etc/passwd", "/bin/sh", "/proc/self/status", "/usr/bin/env"] {
        let path = Path::new(raw);
        let classification = security::classify(path, &ServerConfig::default());
        assert!(classification.has(Category::SystemCritical), "{} not critical", raw);

        for config in [ServerConfig::default(), overrides_on()] {
            for op in [Operation::DeleteFile, Operation::DeleteDirectory, Operation::Move, Operation::Rename] {
                let decision = gate::process(op, &[path], &config);
                assert!(!decision.allowed, "{:?} allowed on {}", op, raw);
            }
        }
    }
}

#[cfg(unix)]
#[test]
fn tmp_is_not_critical() {
    let classification = security::classify(Path::new("/tmp/scratch.txt"), &ServerConfig::default());
    assert!(!classification.has(Category::SystemCritical));
}

#[test]
fn dangerous_extension_deleted_only_with_override() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("shutdown.exe");
    fs::write(&file, "MZ").unwrap();
    let args = json!({"file_path": s(&file)});

    let outcome = call("delete_file", args.clone(), &ServerConfig::default());
    assert_eq!(outcome.kind, OutcomeKind::Blocked);
    assert!(render_result(&Ok(outcome)).starts_with("BLOCKED"));
    assert!(file.exists());

    let outcome = call("delete_file", args, &overrides_on());
    assert_eq!(outcome.kind, OutcomeKind::Success);
    assert_eq!(outcome.status(), Status::Warning);
    assert!(!file.exists());
}

#[test]
fn move_to_a_blocked_directory_is_refused() {
    let dir = TempDir::new().unwrap();
    let vault = dir.path().join("vault");
    fs::create_dir(&vault).unwrap();
    let src = dir.path().join("plain.txt");
    fs::write(&src, "data").unwrap();

    let config = ServerConfig { blocked_directories: vec![vault.clone()], ..Default::default() };
    let args = json!({"source_path": s(&src), "destination_path": s(&vault.join("plain.txt"))});
    let outcome = call("move_file", args, &config);

    assert_eq!(outcome.kind, OutcomeKind::Blocked);
    assert!(src.exists());
    assert!(!vault.join("plain.txt").exists());
}

#[test]
fn text_round_trip() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("poem.txt");
    let config = ServerConfig::default();

    for content in ["Hello", "ünïcødé ✓\nsecond line\n", ""] {
        call("write_file", json!({"file_path": s(&file), "content": content}), &config);
        let outcome = call("read_file", json!({"file_path": s(&file)}), &config);
        assert_eq!(outcome.body.as_deref().unwrap_or(""), content);
    }
}

#[test]
fn base64_write_is_byte_exact() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("blob.bin");
    // 00 FF 10 80 7F
    let args = json!({"file_path": s(&file), "content": "AP8QgH8=", "is_base64": true});
    call("write_file", args, &ServerConfig::default());
    assert_eq!(fs::read(&file).unwrap(), vec![0x00, 0xFF, 0x10, 0x80, 0x7F]);
}

#[test]
fn nested_write_creates_parents() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("a/b/c.txt");
    call("write_file", json!({"file_path": s(&file), "content": "Hello"}), &ServerConfig::default());
    assert!(dir.path().join("a/b").is_dir());
    assert_eq!(fs::read_to_string(&file).unwrap(), "Hello");
}

#[test]
fn create_directory_twice() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("x/y");
    let args = json!({"directory_path": s(&target), "parents": true});
    let config = ServerConfig::default();

    let first = call("create_directory", args.clone(), &config);
    let second = call("create_directory", args, &config);
    assert_eq!(first.kind, OutcomeKind::Success);
    assert_eq!(second.kind, OutcomeKind::Success);
    assert!(second.headline.contains("already exists"));
}

#[test]
fn hash_is_stable_until_content_changes() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("h.txt");
    fs::write(&file, "abc").unwrap();
    let args = json!({"file_path": s(&file), "algorithm": "sha256"});
    let config = ServerConfig::default();

    let first = call("get_file_hash", args.clone(), &config);
    let again = call("get_file_hash", args.clone(), &config);
    assert_eq!(first.get("Hash"), again.get("Hash"));
    assert_eq!(
        first.get("Hash"),
        Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
    );

    fs::write(&file, "abd").unwrap();
    let changed = call("get_file_hash", args, &config);
    assert_ne!(first.get("Hash"), changed.get("Hash"));
}

#[test]
fn unknown_hash_algorithm_is_rejected() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("h.txt");
    fs::write(&file, "abc").unwrap();
    let err = dispatch("get_file_hash", &json!({"file_path": s(&file), "algorithm": "crc32"}), &ServerConfig::default())
        .unwrap_err();
    assert!(matches!(err, FsError::Validation(_)));
}

#[test]
fn compression_round_trip() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("project");
    fs::create_dir_all(src.join("docs/deep")).unwrap();
    fs::write(src.join("README.md"), "# project\n").unwrap();
    fs::write(src.join("docs/guide.txt"), "guide ".repeat(500)).unwrap();
    fs::write(src.join("docs/deep/data.bin"), (0u8..=255).collect::<Vec<_>>()).unwrap();

    let archive = dir.path().join("project.zip");
    let restored = dir.path().join("restored");
    let config = ServerConfig::default();

    call("compress_file", json!({"source_path": s(&src), "output_path": s(&archive)}), &config);
    call("decompress_file", json!({"archive_path": s(&archive), "output_directory": s(&restored)}), &config);

    for rel in ["README.md", "docs/guide.txt", "docs/deep/data.bin"] {
        assert_eq!(fs::read(src.join(rel)).unwrap(), fs::read(restored.join(rel)).unwrap(), "{}", rel);
    }
}

#[test]
fn traversal_archive_extracts_nothing() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("evil.zip");
    {
        let mut writer = zip::ZipWriter::new(File::create(&archive).unwrap());
        let options = zip::write::SimpleFileOptions::default();
        writer.start_file("innocent.txt", options).unwrap();
        writer.write_all(b"hi").unwrap();
        writer.start_file("../../evil.txt", options).unwrap();
        writer.write_all(b"gotcha").unwrap();
        writer.finish().unwrap();
    }

    let out = dir.path().join("a/b/out");
    let err = dispatch(
        "decompress_file",
        &json!({"archive_path": s(&archive), "output_directory": s(&out)}),
        &ServerConfig::default(),
    )
    .unwrap_err();

    assert!(err.to_string().contains("path traversal"));
    assert!(!out.join("innocent.txt").exists());
    assert!(!dir.path().join("a/evil.txt").exists());
    assert!(!dir.path().join("evil.txt").exists());
}

#[test]
fn literal_search_reports_line_one() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("x.txt"), "TODO: fix\nall good\n").unwrap();

    let outcome = call(
        "search_in_files",
        json!({"directory_path": s(dir.path()), "search_text": "TODO"}),
        &ServerConfig::default(),
    );
    assert_eq!(outcome.get("Matches found"), Some("1"));
    assert!(outcome.body.as_deref().unwrap().contains("Line 1: TODO: fix"));
}

#[test]
fn copy_refuses_existing_destination() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    fs::write(&a, "new").unwrap();
    fs::write(&b, "old").unwrap();
    let config = ServerConfig::default();

    let outcome = call("copy_file", json!({"source_path": s(&a), "destination_path": s(&b)}), &config);
    assert_eq!(outcome.kind, OutcomeKind::Refused);
    assert_eq!(fs::read_to_string(&b).unwrap(), "old");

    let args = json!({"source_path": s(&a), "destination_path": s(&b), "overwrite": true});
    assert_eq!(call("copy_file", args, &config).kind, OutcomeKind::Success);
    assert_eq!(fs::read_to_string(&b).unwrap(), "new");
}

#[test]
fn batch_read_isolates_failures() {
    let dir = TempDir::new().unwrap();
    let good = dir.path().join("good.txt");
    fs::write(&good, "fine").unwrap();
    let missing = dir.path().join("missing.txt");

    let outcome = call(
        "read_multiple_files",
        json!({"file_paths": [s(&good), s(&missing)]}),
        &ServerConfig::default(),
    );
    assert_eq!(outcome.kind, OutcomeKind::Success);
    assert_eq!(outcome.get("Succeeded"), Some("1"));
    assert_eq!(outcome.get("Failed"), Some("1"));
}

#[test]
fn disabled_features_report_disabled() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("f.txt");
    fs::write(&file, "x").unwrap();
    let config = ServerConfig { enable_hashing: false, enable_compression: false, ..Default::default() };

    let err = dispatch("get_file_hash", &json!({"file_path": s(&file)}), &config).unwrap_err();
    assert!(matches!(err, FsError::Disabled(_)));
    let err = dispatch(
        "compress_file",
        &json!({"source_path": s(&file), "output_path": s(&dir.path().join("f.zip"))}),
        &config,
    )
    .unwrap_err();
    assert!(matches!(err, FsError::Disabled(_)));
}
