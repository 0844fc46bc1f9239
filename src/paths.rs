// fsgate - Path Resolution
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Single source of truth for path normalisation and containment.
// Normalisation is lexical: absolute against the working directory,
// `.` dropped, `..` folded. No symlink resolution, no file access
// (same_file excepted).

use std::path::{Component, Path, PathBuf};

/// Make `path` absolute and fold `.`/`..` segments.
///
/// Uses `Path` components, so the result is OS-native: drive letters and
/// `\` survive on Windows, `/` elsewhere. A `..` at the root stays at the
/// root, matching what the OS does.
pub fn normalize(path: &Path) -> std::io::Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(fold(&joined))
}

fn fold(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // pop() refuses to remove the root
                out.pop();
            }
            Component::Normal(name) => out.push(name),
        }
    }
    out
}

/// True when `path` is `root` or lies beneath it. Component-wise, so
/// `/home/user2` is not inside `/home/user`.
pub fn is_within(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}

/// True when both paths name the same existing file, either lexically or
/// after resolving symlinks. The one place here that touches the disk.
pub fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Relative display path of `path` under `base`, falling back to the full path
pub fn relative_to(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| path.display().to_string())
}

/// File name for display, or the whole path for roots like `/`
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Lower-cased extension without the dot
pub fn extension_lower(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_dot_segments() {
        assert_eq!(fold(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(fold(Path::new("/a/b/../../..")), PathBuf::from("/"));
        assert_eq!(fold(Path::new("/../etc/passwd")), PathBuf::from("/etc/passwd"));
    }

    #[test]
    fn relative_paths_become_absolute() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(normalize(Path::new("x/../y.txt")).unwrap(), cwd.join("y.txt"));
    }

    #[test]
    fn containment_is_component_wise() {
        assert!(is_within(Path::new("/home/user/a.txt"), Path::new("/home/user")));
        assert!(is_within(Path::new("/home/user"), Path::new("/home/user")));
        assert!(!is_within(Path::new("/home/user2/a.txt"), Path::new("/home/user")));
    }

    #[cfg(unix)]
    #[test]
    fn same_file_sees_through_symlinks() {
        let dir = tempfile::TempDir::new().unwrap();
        let real = dir.path().join("real.txt");
        let alias = dir.path().join("alias.txt");
        std::fs::write(&real, "x").unwrap();
        std::os::unix::fs::symlink(&real, &alias).unwrap();

        assert!(same_file(&real, &real));
        assert!(same_file(&alias, &real));
        assert!(!same_file(&real, &dir.path().join("other.txt")));
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(extension_lower(Path::new("SHUTDOWN.EXE")).as_deref(), Some("exe"));
        assert_eq!(extension_lower(Path::new("Makefile")), None);
    }
}
