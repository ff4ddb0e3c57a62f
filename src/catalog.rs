//! Op catalog: maps source operation types to canonical kinds.
//!
//! Every canonical kind carries the shape rule the inference pass applies to
//! it. The tables are plain `match` expressions, so adding a kind without
//! giving it a rule does not compile.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Serialization ecosystem a graph comes from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Caffe2,
    TensorFlow,
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Caffe2 => write!(f, "caffe2"),
            SourceFormat::TensorFlow => write!(f, "tensorflow"),
        }
    }
}

/// Canonical operation kinds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    Conv,
    BatchNorm,
    Relu,
    MaxPool,
    AveragePool,
    Sum,
    FullyConnected,
    Softmax,
}

/// How an op kind transforms its input dimension.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShapeRule {
    /// Sliding window over the spatial axes (kernel/stride/padding).
    SpatialReducing,
    /// Output equals input.
    PassThrough,
    /// Spatial axes collapse, channel count comes from a weight tensor.
    ChannelRemapping,
}

impl OpKind {
    pub const fn rule(self) -> ShapeRule {
        match self {
            OpKind::Conv | OpKind::MaxPool | OpKind::AveragePool => ShapeRule::SpatialReducing,
            OpKind::BatchNorm | OpKind::Relu | OpKind::Sum | OpKind::Softmax => {
                ShapeRule::PassThrough
            }
            OpKind::FullyConnected => ShapeRule::ChannelRemapping,
        }
    }

    /// Kinds whose output channel count is fixed by a learned weight.
    pub const fn requires_weight(self) -> bool {
        matches!(self, OpKind::Conv | OpKind::FullyConnected)
    }

    /// Kinds that merge several data inputs (residual connections).
    pub const fn is_variadic(self) -> bool {
        matches!(self, OpKind::Sum)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            OpKind::Conv => "Conv",
            OpKind::BatchNorm => "BatchNorm",
            OpKind::Relu => "Relu",
            OpKind::MaxPool => "MaxPool",
            OpKind::AveragePool => "AveragePool",
            OpKind::Sum => "Sum",
            OpKind::FullyConnected => "FullyConnected",
            OpKind::Softmax => "Softmax",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens to op types the catalog does not know.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogMode {
    /// Drop the op and leave a note in the report.
    #[default]
    Lenient,
    /// Fail with [`UnknownOpError`].
    Strict,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown {format} operation type '{op_type}'{}. \
         Run in lenient mode to skip it.", .name.as_ref().map(|n| format!(" (node '{n}')")).unwrap_or_default())]
pub struct UnknownOpError {
    pub format: SourceFormat,
    pub op_type: String,
    pub name: Option<String>,
}

/// Caffe2 operator type names.
fn caffe2_kind(op_type: &str) -> Option<OpKind> {
    let kind = match op_type {
        "Conv" => OpKind::Conv,
        "SpatialBN" => OpKind::BatchNorm,
        "Relu" => OpKind::Relu,
        "MaxPool" => OpKind::MaxPool,
        "AveragePool" => OpKind::AveragePool,
        "Sum" => OpKind::Sum,
        "FC" => OpKind::FullyConnected,
        "Softmax" => OpKind::Softmax,
        _ => return None,
    };
    Some(kind)
}

/// TensorFlow op names.
fn tensorflow_kind(op_type: &str) -> Option<OpKind> {
    let kind = match op_type {
        "Conv2D" => OpKind::Conv,
        "FusedBatchNorm" | "FusedBatchNormV2" | "FusedBatchNormV3" => OpKind::BatchNorm,
        "Relu" => OpKind::Relu,
        "MaxPool" => OpKind::MaxPool,
        "AvgPool" => OpKind::AveragePool,
        "Add" | "AddV2" | "AddN" => OpKind::Sum,
        "MatMul" => OpKind::FullyConnected,
        "Softmax" => OpKind::Softmax,
        _ => return None,
    };
    Some(kind)
}

/// Catalog lookup bound to one source format and mode.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OpCatalog {
    format: SourceFormat,
    mode: CatalogMode,
}

impl OpCatalog {
    pub fn new(format: SourceFormat, mode: CatalogMode) -> Self {
        Self { format, mode }
    }

    pub fn lookup(&self, op_type: &str) -> Option<OpKind> {
        match self.format {
            SourceFormat::Caffe2 => caffe2_kind(op_type),
            SourceFormat::TensorFlow => tensorflow_kind(op_type),
        }
    }

    /// Like [`lookup`](Self::lookup), but unknown types are an error in
    /// strict mode. `Ok(None)` means "skip this op".
    pub fn resolve(&self, op_type: &str, name: Option<&str>) -> Result<Option<OpKind>, UnknownOpError> {
        match (self.lookup(op_type), self.mode) {
            (Some(kind), _) => Ok(Some(kind)),
            (None, CatalogMode::Lenient) => Ok(None),
            (None, CatalogMode::Strict) => Err(UnknownOpError {
                format: self.format,
                op_type: op_type.to_string(),
                name: name.map(str::to_string),
            }),
        }
    }
}
