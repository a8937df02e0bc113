// SPDX-FileCopyrightText: © 2025 Lexibridge Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Resolves a `"owner/name"` model repository identifier to a local
//! snapshot directory, probing the Hugging Face Hub cache layouts before
//! falling back to a download.

use std::path::{Path, PathBuf};

use hf_hub::api::tokio::Api;
use lexibridge_core::{Error, Result};

/// Env var that, when `"1"` or `"true"`, forbids network downloads and
/// requires the model to already be present in the local cache.
pub const LOCAL_ONLY_ENV: &str = "HUGGINGFACE_LOCAL_ONLY";

fn local_only_enabled() -> bool {
    matches!(
        std::env::var(LOCAL_ONLY_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("True")
    )
}

fn cache_dir() -> PathBuf {
    dirs_cache_home().join("huggingface")
}

fn dirs_cache_home() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cache")
}

/// Converts `"owner/name"` into the cache directory name `"owner--name"`.
fn repo_dir_name(repository: &str) -> String {
    format!("models--{}", repository.replace('/', "--"))
}

/// Returns the first existing subdirectory of `snapshots_dir`, or `None` if
/// it does not exist or is empty.
fn first_snapshot_dir(snapshots_dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(snapshots_dir).ok()?;
    entries
        .filter_map(std::result::Result::ok)
        .map(|e| e.path())
        .find(|p| p.is_dir())
}

/// Returns `true` if `dir` looks like it holds model files (rather than
/// being empty or absent).
fn contains_model_files(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

fn log_cache_miss_diagnostics(cache: &Path) {
    let list_first_10 = |dir: &Path| -> Vec<String> {
        std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(std::result::Result::ok)
                    .take(10)
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default()
    };

    tracing::warn!(
        cache_dir = %cache.display(),
        entries = ?list_first_10(cache),
        "model not found in cache; listing cache directory contents"
    );
    let hub = cache.join("hub");
    tracing::warn!(
        hub_dir = %hub.display(),
        entries = ?list_first_10(&hub),
        "listing hub/ directory contents"
    );
}

/// Probes the four recognized on-disk layouts for `repository`
/// (`"owner/name"`), returning the first directory that exists and appears
/// to hold model files (or the first snapshot subdirectory found).
fn probe_cache(cache: &Path, repository: &str) -> Option<PathBuf> {
    let repo_name = repo_dir_name(repository);
    tracing::debug!(cache_dir = %cache.display(), repo_name = %repo_name, "probing asset cache");

    let hub_dir = cache.join("hub").join(&repo_name);
    let hub_snapshots = hub_dir.join("snapshots");
    if let Some(dir) = first_snapshot_dir(&hub_snapshots) {
        return Some(dir);
    }
    if hub_dir.is_dir() && contains_model_files(&hub_dir) {
        return Some(hub_dir);
    }

    let legacy_dir = cache.join(&repo_name);
    let legacy_snapshots = legacy_dir.join("snapshots");
    if let Some(dir) = first_snapshot_dir(&legacy_snapshots) {
        return Some(dir);
    }
    if legacy_dir.is_dir() && contains_model_files(&legacy_dir) {
        return Some(legacy_dir);
    }

    None
}

/// Resolves `repository` (`"owner/name"`) to a local snapshot directory.
///
/// Probes the cache first; if nothing is found and local-only mode is
/// disabled, downloads the full snapshot. Not safe to call concurrently for
/// the same repository — callers must resolve each model exactly once at
/// startup.
pub async fn resolve(repository: &str) -> Result<PathBuf> {
    let cache = cache_dir();

    if let Some(dir) = probe_cache(&cache, repository) {
        return Ok(dir);
    }

    if local_only_enabled() {
        log_cache_miss_diagnostics(&cache);
        return Err(Error::ModelNotFound(format!(
            "{repository} not found under {} and HUGGINGFACE_LOCAL_ONLY is set",
            cache.display()
        )));
    }

    tracing::info!(repository, "model snapshot not cached, downloading");
    let api = Api::new().map_err(|e| Error::Internal(format!("hub API init failed: {e}")))?;
    let repo = api.model(repository.to_string());
    let info = repo
        .info()
        .await
        .map_err(|e| Error::ModelNotFound(format!("{repository}: {e}")))?;

    let mut last_file = None;
    for sibling in info.siblings {
        let path = repo
            .get(&sibling.rfilename)
            .await
            .map_err(|e| Error::ModelNotFound(format!("{repository}: {e}")))?;
        last_file = Some(path);
    }

    let snapshot_dir = last_file
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .ok_or_else(|| Error::ModelNotFound(format!("{repository}: empty snapshot")))?;

    Ok(snapshot_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_dir_name() {
        assert_eq!(
            repo_dir_name("OpenNMT/nllb-200-distilled-600M-ct2-int8"),
            "models--OpenNMT--nllb-200-distilled-600M-ct2-int8"
        );
    }

    #[test]
    fn test_probe_hub_layout_with_snapshot() {
        let tmp = tempfile::tempdir().unwrap();
        let snapshot = tmp
            .path()
            .join("hub/models--owner--name/snapshots/abc123");
        std::fs::create_dir_all(&snapshot).unwrap();
        std::fs::write(snapshot.join("model.safetensors"), b"x").unwrap();

        let found = probe_cache(tmp.path(), "owner/name").unwrap();
        assert_eq!(found, snapshot);
    }

    #[test]
    fn test_probe_legacy_layout_with_snapshot() {
        let tmp = tempfile::tempdir().unwrap();
        let snapshot = tmp.path().join("models--owner--name/snapshots/def456");
        std::fs::create_dir_all(&snapshot).unwrap();
        std::fs::write(snapshot.join("model.safetensors"), b"x").unwrap();

        let found = probe_cache(tmp.path(), "owner/name").unwrap();
        assert_eq!(found, snapshot);
    }

    #[test]
    fn test_probe_hub_direct_without_snapshots_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let hub_dir = tmp.path().join("hub/models--owner--name");
        std::fs::create_dir_all(&hub_dir).unwrap();
        std::fs::write(hub_dir.join("model.safetensors"), b"x").unwrap();

        let found = probe_cache(tmp.path(), "owner/name").unwrap();
        assert_eq!(found, hub_dir);
    }

    #[test]
    fn test_probe_miss_returns_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(probe_cache(tmp.path(), "owner/nonexistent").is_none());
    }
}
