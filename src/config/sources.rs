// src/config/sources.rs
//! Publisher allow-list loading. The file extension picks the format:
//! `.toml` holds `sources = [...]`, `.json` a bare array of names.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::headlines::{default_allowed_sources, AllowList};

pub const ENV_ALLOWED_SOURCES_PATH: &str = "ALLOWED_SOURCES_PATH";

/// Checked in order when `$ALLOWED_SOURCES_PATH` is unset.
const DEFAULT_PATHS: [&str; 2] = ["config/allowed_sources.toml", "config/allowed_sources.json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

impl Format {
    fn of(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "toml" => Some(Format::Toml),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct SourcesFile {
    sources: Vec<String>,
}

/// Load the allow-list from an explicit `.toml` or `.json` file.
pub fn load_allowed_from(path: &Path) -> Result<AllowList> {
    let Some(format) = Format::of(path) else {
        bail!(
            "allowed sources file {} must end in .toml or .json",
            path.display()
        );
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading allowed sources from {}", path.display()))?;
    let names = match format {
        Format::Toml => toml::from_str::<SourcesFile>(&content)
            .with_context(|| format!("parsing TOML allow-list {}", path.display()))?
            .sources,
        Format::Json => serde_json::from_str::<Vec<String>>(&content)
            .with_context(|| format!("parsing JSON allow-list {}", path.display()))?,
    };
    Ok(tidy(names))
}

/// `$ALLOWED_SOURCES_PATH` if set (it must exist), else the first default
/// path present on disk, else the built-in list.
pub fn load_allowed_default() -> Result<AllowList> {
    if let Ok(p) = std::env::var(ENV_ALLOWED_SOURCES_PATH) {
        let path = PathBuf::from(p);
        if !path.exists() {
            bail!(
                "{ENV_ALLOWED_SOURCES_PATH} points to {}, which does not exist",
                path.display()
            );
        }
        return load_allowed_from(&path);
    }

    match DEFAULT_PATHS.iter().map(Path::new).find(|p| p.exists()) {
        Some(path) => load_allowed_from(path),
        None => Ok(default_allowed_sources()),
    }
}

// Membership is exact (case-sensitive); only surrounding whitespace is dropped.
fn tidy(names: Vec<String>) -> AllowList {
    names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect()
}
