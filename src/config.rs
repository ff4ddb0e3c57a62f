//! Run configuration.
//!
//! Every field has a default, so a config file only lists what it changes:
//!
//! ```json
//! { "catalog_mode": "strict", "input_dims": { "height": 299, "width": 299, "channels": 3 } }
//! ```

use crate::catalog::CatalogMode;
use crate::graph::Dimension;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Skip or reject op types the catalog does not know.
    pub catalog_mode: CatalogMode,
    /// Suffix that marks weight tensors in a Caffe2 init net.
    pub weight_suffix: String,
    /// Network input tensor; detected from the graph when unset.
    pub input_name: Option<String>,
    /// Input dimension; overrides what the graph declares.
    pub input_dims: Option<Dimension>,
    /// Compare inferred shapes with the shapes the graph declares.
    pub check_annotations: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            catalog_mode: CatalogMode::Lenient,
            weight_suffix: "_w".to_string(),
            input_name: None,
            input_dims: None,
            check_annotations: true,
        }
    }
}

impl InferenceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog_mode(mut self, mode: CatalogMode) -> Self {
        self.catalog_mode = mode;
        self
    }

    pub fn with_weight_suffix(mut self, suffix: &str) -> Self {
        self.weight_suffix = suffix.to_string();
        self
    }

    pub fn with_input_name(mut self, name: &str) -> Self {
        self.input_name = Some(name.to_string());
        self
    }

    pub fn with_input_dims(mut self, dims: Dimension) -> Self {
        self.input_dims = Some(dims);
        self
    }

    pub fn with_check_annotations(mut self, check: bool) -> Self {
        self.check_annotations = check;
        self
    }

    /// Reads a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Ok(serde_json::from_str(&json)?)
    }
}
