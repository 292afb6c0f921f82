use std::fs;
use std::path::{Path, PathBuf};

fn core_dir(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("src/core")
        .join(relative)
}

fn dir_contains_rs(dir: &Path, needle: &str) -> Option<PathBuf> {
    assert!(dir.is_dir(), "missing module directory {}", dir.display());
    let mut stack = vec![dir.to_path_buf()];
    while let Some(path) = stack.pop() {
        if path.is_dir() {
            if let Ok(read) = fs::read_dir(&path) {
                for item in read.flatten() {
                    stack.push(item.path());
                }
            }
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("rs"))
        {
            let contents = fs::read_to_string(&path).unwrap_or_default();
            if contents.contains(needle) {
                return Some(path);
            }
        }
    }
    None
}

#[test]
fn store_has_no_engine_back_edges() {
    for needle in ["crate::core::action", "crate::core::commands"] {
        if let Some(path) = dir_contains_rs(&core_dir("store"), needle) {
            panic!("store must not depend on {needle}: {}", path.display());
        }
    }
}

#[test]
fn registry_stays_storage_agnostic() {
    for needle in ["crate::core::store", "crate::core::action", "rusqlite"] {
        if let Some(path) = dir_contains_rs(&core_dir("registry"), needle) {
            panic!("registry must not depend on {needle}: {}", path.display());
        }
    }
}

#[test]
fn wire_codec_does_not_touch_storage() {
    for needle in ["crate::core::store", "rusqlite"] {
        if let Some(path) = dir_contains_rs(&core_dir("wire"), needle) {
            panic!("wire must not depend on {needle}: {}", path.display());
        }
    }
}

#[test]
fn engine_reaches_storage_only_through_the_trait() {
    for needle in ["SqliteStore", "rusqlite", "crate::core::config"] {
        if let Some(path) = dir_contains_rs(&core_dir("action"), needle) {
            panic!("action must not name {needle}: {}", path.display());
        }
    }
}

#[test]
fn crates_that_log_declare_tracing() {
    let crates = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("crates directory");
    for item in fs::read_dir(crates).expect("read crates").flatten() {
        let root = item.path();
        let manifest = root.join("Cargo.toml");
        if !manifest.is_file() {
            continue;
        }
        if let Some(path) = dir_contains_rs(&root.join("src"), "tracing::") {
            let deps = fs::read_to_string(&manifest).expect("read manifest");
            assert!(
                deps.lines()
                    .map(str::trim_start)
                    .any(|line| line.starts_with("tracing.") || line.starts_with("tracing =")),
                "{} uses tracing but {} does not declare it",
                path.display(),
                manifest.display()
            );
        }
    }
}
