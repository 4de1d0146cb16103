//! Resolves the configured model location to a concrete ONNX file.
//!
//! Exported models are laid out as numbered version directories
//! (`model/1546946605/model.onnx`); the highest version wins.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const MODEL_FILE_NAME: &str = "model.onnx";

/// Resolve `configured` against `base_dir` when relative, then pick the model file.
pub fn resolve_model_path(configured: &Path, base_dir: &Path) -> Result<PathBuf> {
    let path = if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        base_dir.join(configured)
    };

    if path.is_file() {
        return Ok(path);
    }

    if !path.is_dir() {
        bail!("Model path {} does not exist", path.display());
    }

    if let Some((version, dir)) = latest_version_dir(&path)? {
        info!("Using model version {} from {:?}", version, dir);
        return Ok(dir.join(MODEL_FILE_NAME));
    }

    let direct = path.join(MODEL_FILE_NAME);
    if direct.is_file() {
        return Ok(direct);
    }

    bail!(
        "No {} found in {} or its version directories",
        MODEL_FILE_NAME,
        path.display()
    )
}

/// Resolve against the current working directory.
pub fn resolve_from_cwd(configured: &Path) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    resolve_model_path(configured, &cwd)
}

fn latest_version_dir(root: &Path) -> Result<Option<(u64, PathBuf)>> {
    let entries =
        fs::read_dir(root).context(format!("Failed to list model directory: {}", root.display()))?;

    let mut latest: Option<(u64, PathBuf)> = None;
    for entry in entries {
        let entry = entry?;
        let dir = entry.path();
        let Some(version) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.parse::<u64>().ok())
        else {
            continue;
        };

        if !dir.join(MODEL_FILE_NAME).is_file() {
            debug!("Skipping version {} without {}", version, MODEL_FILE_NAME);
            continue;
        }

        if latest.as_ref().is_none_or(|(best, _)| version > *best) {
            latest = Some((version, dir));
        }
    }

    Ok(latest)
}
