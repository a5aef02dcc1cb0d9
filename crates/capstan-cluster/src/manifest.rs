//! Workload manifest templating.
//!
//! Templates carry `{{name}}` placeholders filled from a structured
//! substitution map; an unresolved placeholder is an error rather than a
//! manifest with literal braces applied to the cluster.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unresolved placeholder `{0}` in manifest")]
    UnresolvedPlaceholder(String),
}

/// A manifest template with `{{name}}` placeholders.
#[derive(Debug, Clone)]
pub struct ManifestTemplate {
    text: String,
}

impl ManifestTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { text })
    }

    /// Substitute every placeholder from the map.
    pub fn render(&self, vars: &BTreeMap<&str, String>) -> Result<String, ManifestError> {
        let mut out = self.text.clone();
        for (key, value) in vars {
            out = out.replace(&format!("{{{{{key}}}}}"), value);
        }

        if let Some(start) = out.find("{{") {
            let rest = &out[start + 2..];
            let name = rest.split("}}").next().unwrap_or("").trim();
            return Err(ManifestError::UnresolvedPlaceholder(name.to_string()));
        }

        Ok(out)
    }
}
