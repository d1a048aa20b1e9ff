use std::path::{Path, PathBuf};

/// Walk up from `start` looking for an entry named `name` (file or directory).
/// Returns the path to the directory containing it, or `None`.
pub fn find_ancestor_with(start: &Path, name: &str) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(name).exists() {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

/// List the `*.toml` files directly inside `dir`, sorted by file name.
pub fn toml_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "toml") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => home_dir().join(rest),
        None if path == "~" => home_dir(),
        None => PathBuf::from(path),
    }
}

fn home_dir() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
}
