//! Canonical graph: the format-independent representation adapters produce
//! and the shape inference pass consumes.

use crate::catalog::OpKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Record identifier (position in the canonical sequence).
pub type RecordId = usize;
/// Opaque name of a tensor flowing between operations.
pub type TensorHandle = String;

/// Spatial and channel extent of a tensor.
///
/// A *flat* dimension (`height == width == 0`) has no spatial extent; it is
/// what channel-remapping operations such as fully-connected layers produce.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl Dimension {
    pub const fn new(height: usize, width: usize, channels: usize) -> Self {
        Self { height, width, channels }
    }

    /// Dimension without spatial extent.
    pub const fn flat(channels: usize) -> Self {
        Self { height: 0, width: 0, channels }
    }

    pub const fn is_flat(&self) -> bool {
        self.height == 0 && self.width == 0
    }

    /// Number of features once the spatial axes are flattened; `None` when
    /// the product does not fit in `usize`.
    pub fn features(&self) -> Option<usize> {
        if self.is_flat() {
            return Some(self.channels);
        }
        self.height.checked_mul(self.width)?.checked_mul(self.channels)
    }
}

impl Default for Dimension {
    /// ImageNet-style input, the usual seed for the networks this tool compares.
    fn default() -> Self {
        Self::new(224, 224, 3)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_flat() {
            write!(f, "{}", self.channels)
        } else {
            write!(f, "{}x{}x{}", self.height, self.width, self.channels)
        }
    }
}

/// A (height, width) pair for kernels and strides.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Spatial {
    pub h: usize,
    pub w: usize,
}

impl Spatial {
    pub const fn new(h: usize, w: usize) -> Self {
        Self { h, w }
    }

    pub const fn square(size: usize) -> Self {
        Self { h: size, w: size }
    }
}

impl fmt::Display for Spatial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.h == self.w {
            write!(f, "{}", self.h)
        } else {
            write!(f, "{}x{}", self.h, self.w)
        }
    }
}

/// Explicit per-edge padding.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pads {
    pub top: usize,
    pub left: usize,
    pub bottom: usize,
    pub right: usize,
}

impl Pads {
    pub const fn uniform(pad: usize) -> Self {
        Self { top: pad, left: pad, bottom: pad, right: pad }
    }

    /// Total padding of the height axis.
    pub const fn vertical(&self) -> Option<usize> {
        self.top.checked_add(self.bottom)
    }

    /// Total padding of the width axis.
    pub const fn horizontal(&self) -> Option<usize> {
        self.left.checked_add(self.right)
    }

    pub const fn is_uniform(&self) -> bool {
        self.top == self.left && self.top == self.bottom && self.top == self.right
    }
}

impl fmt::Display for Pads {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_uniform() {
            write!(f, "{}", self.top)
        } else {
            write!(f, "{},{},{},{}", self.top, self.left, self.bottom, self.right)
        }
    }
}

/// Padding as declared by the source graph.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Padding {
    Explicit(Pads),
    /// TensorFlow "SAME": resolved against the input size during inference.
    Same,
}

/// Canonical attributes. `None` means the source did not declare the
/// attribute, which is not the same as an explicit zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub kernel: Option<Spatial>,
    pub stride: Option<Spatial>,
    pub padding: Option<Padding>,
    #[serde(default)]
    pub global_pooling: bool,
}

/// One operation in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRecord {
    pub id: RecordId,
    pub name: Option<String>,
    pub kind: OpKind,
    /// Operation type string as spelled by the source format.
    pub source_type: String,
    /// Data inputs; parameter tensors are not listed here.
    pub inputs: Vec<TensorHandle>,
    pub outputs: Vec<TensorHandle>,
    /// Learned weight tensor whose shape fixes the output channel count.
    pub weight: Option<TensorHandle>,
    pub attributes: Attributes,
    /// Output dimension declared by the source graph, if it carries one.
    pub annotated: Option<Dimension>,
}

impl GraphRecord {
    pub fn new(id: RecordId, kind: OpKind, source_type: impl Into<String>) -> Self {
        Self {
            id,
            name: None,
            kind,
            source_type: source_type.into(),
            inputs: vec![],
            outputs: vec![],
            weight: None,
            attributes: Attributes::default(),
            annotated: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TensorHandle>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_outputs<I, S>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TensorHandle>,
    {
        self.outputs = outputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_weight(mut self, weight: impl Into<TensorHandle>) -> Self {
        self.weight = Some(weight.into());
        self
    }

    pub fn with_kernel(mut self, kernel: Spatial) -> Self {
        self.attributes.kernel = Some(kernel);
        self
    }

    pub fn with_stride(mut self, stride: Spatial) -> Self {
        self.attributes.stride = Some(stride);
        self
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.attributes.padding = Some(padding);
        self
    }

    pub fn with_global_pooling(mut self) -> Self {
        self.attributes.global_pooling = true;
        self
    }

    /// Human-readable label for errors and notes.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("#{} {} '{}'", self.id, self.source_type, name),
            None => format!("#{} {}", self.id, self.source_type),
        }
    }
}

/// Shape facts about a learned weight tensor.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightShape {
    pub out_channels: usize,
    /// Spatial kernel extent, for convolution filters.
    pub kernel: Option<Spatial>,
}

/// Weight handle -> shape lookup, built by an adapter before the graph walk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightShapeTable {
    entries: BTreeMap<TensorHandle, WeightShape>,
}

impl WeightShapeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: impl Into<TensorHandle>, shape: WeightShape) {
        self.entries.insert(handle.into(), shape);
    }

    pub fn get(&self, handle: &str) -> Option<&WeightShape> {
        self.entries.get(handle)
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.entries.contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An operation dropped by a lenient adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedOp {
    /// Position of the op in the source graph.
    pub position: usize,
    pub name: Option<String>,
    pub op_type: String,
    /// Handle the op's outputs were forwarded to, if it had a data input.
    pub aliased_to: Option<TensorHandle>,
}

/// Adapter output: everything one inference run needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalGraph {
    pub records: Vec<GraphRecord>,
    pub weights: WeightShapeTable,
    /// Network input handle.
    pub input: TensorHandle,
    /// Input dimension declared by the source, if any.
    pub input_dims: Option<Dimension>,
    pub skipped: Vec<SkippedOp>,
}
