//! Format adapters: turn a serialized graph into a [`CanonicalGraph`].
//!
//! Two ecosystems are supported:
//! - **Caffe2**: a predict net plus an init net that holds the parameter
//!   shapes ([`caffe2::Caffe2Adapter`]).
//! - **TensorFlow**: a single `GraphDef` whose nodes carry their own shape
//!   annotations ([`tensorflow::TensorFlowAdapter`]).
//!
//! # Example
//!
//! ```rust,ignore
//! use netshape::adapters::{caffe2::Caffe2Adapter, FormatAdapter};
//!
//! let adapter = Caffe2Adapter::new(&config);
//! let graph = adapter.load_files("predict_net.pb", Some("init_net.pb"))?;
//! ```

pub mod caffe2;
pub mod tensorflow;

use crate::catalog::UnknownOpError;
use crate::graph::{CanonicalGraph, TensorHandle};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Malformed or incomplete serialized input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("Protobuf decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("Required field '{field}' is missing in {context}")]
    MissingField { context: String, field: &'static str },

    #[error("Weight '{weight}' used by {context} has no entry in the weight shape table")]
    MissingWeight { context: String, weight: String },

    #[error("Invalid value for '{attribute}' in {context}: {value}")]
    InvalidValue {
        context: String,
        attribute: &'static str,
        value: String,
    },

    #[error("Graph has no network input")]
    NoInput,
}

/// Errors an adapter can return.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    UnknownOp(#[from] UnknownOpError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

type Result<T> = std::result::Result<T, AdapterError>;

/// Common contract of the format adapters.
pub trait FormatAdapter {
    /// Name of the format, for logs.
    fn name(&self) -> &'static str;

    /// Builds the canonical graph from the primary graph message and, for
    /// formats that keep parameter shapes apart, the auxiliary message.
    fn load(&self, graph: &[u8], weights: Option<&[u8]>) -> Result<CanonicalGraph>;

    /// Reads both messages from disk and calls [`load`](Self::load).
    fn load_files<P: AsRef<Path>>(&self, graph: P, weights: Option<P>) -> Result<CanonicalGraph>
    where
        Self: Sized,
    {
        let graph_bytes = std::fs::read(graph)?;
        let weight_bytes = weights.map(std::fs::read).transpose()?;
        self.load(&graph_bytes, weight_bytes.as_deref())
    }
}

/// Converts a serialized integer into a size.
pub(crate) fn to_size(
    value: i64,
    context: &str,
    attribute: &'static str,
) -> std::result::Result<usize, FormatError> {
    usize::try_from(value).map_err(|_| FormatError::InvalidValue {
        context: context.to_string(),
        attribute,
        value: value.to_string(),
    })
}

/// Maps source tensor names to canonical handles while a graph is scanned.
///
/// Handles two normalizations:
/// - *redefinition*: when allowed, a name produced a second time (Caffe2
///   in-place ops) gets a fresh handle `name#N`, and later readers see the
///   newest one;
/// - *aliases*: outputs of dropped ops forward to another handle.
#[derive(Debug, Default)]
pub(crate) struct HandleResolver {
    allow_redefinition: bool,
    current: HashMap<String, TensorHandle>,
    versions: HashMap<String, usize>,
}

impl HandleResolver {
    pub(crate) fn new(allow_redefinition: bool) -> Self {
        Self { allow_redefinition, ..Default::default() }
    }

    /// Handle a reader of `name` should use.
    pub(crate) fn read(&self, name: &str) -> TensorHandle {
        self.current.get(name).cloned().unwrap_or_else(|| name.to_string())
    }

    /// Registers `name` as produced by an op and returns its handle.
    pub(crate) fn define(&mut self, name: &str) -> TensorHandle {
        let version = self.versions.entry(name.to_string()).or_insert(0);
        let handle = if *version > 0 && self.allow_redefinition {
            format!("{name}#{version}")
        } else {
            name.to_string()
        };
        *version += 1;
        self.current.insert(name.to_string(), handle.clone());
        handle
    }

    /// Makes readers of `name` see `target` instead.
    pub(crate) fn alias(&mut self, name: &str, target: TensorHandle) {
        self.current.insert(name.to_string(), target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolver_versions_in_place_outputs() {
        let mut resolver = HandleResolver::new(true);
        assert_eq!(resolver.define("conv1"), "conv1");
        assert_eq!(resolver.read("conv1"), "conv1");
        // in-place Relu: reads conv1, writes conv1
        let input = resolver.read("conv1");
        let output = resolver.define("conv1");
        assert_eq!(input, "conv1");
        assert_eq!(output, "conv1#1");
        assert_eq!(resolver.read("conv1"), "conv1#1");
        assert_eq!(resolver.define("conv1"), "conv1#2");
    }

    #[test]
    fn test_resolver_without_redefinition() {
        let mut resolver = HandleResolver::new(false);
        assert_eq!(resolver.define("a"), "a");
        assert_eq!(resolver.define("a"), "a");
    }

    #[test]
    fn test_resolver_alias() {
        let mut resolver = HandleResolver::new(true);
        resolver.define("fc7");
        resolver.alias("drop7", resolver.read("fc7"));
        assert_eq!(resolver.read("drop7"), "fc7");
        assert_eq!(resolver.read("unseen"), "unseen");
    }

    #[test]
    fn test_load_files_reports_missing_file() {
        let adapter = caffe2::Caffe2Adapter::new(&crate::config::InferenceConfig::new());
        let err = adapter.load_files("/nonexistent/predict_net.pb", None).unwrap_err();
        assert!(matches!(err, AdapterError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
    }

    #[test]
    fn test_to_size_rejects_negative() {
        assert_eq!(to_size(3, "conv1", "kernel"), Ok(3));
        assert!(matches!(
            to_size(-1, "conv1", "kernel"),
            Err(FormatError::InvalidValue { attribute: "kernel", .. })
        ));
    }
}
