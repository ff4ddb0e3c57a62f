//! TensorFlow adapter.
//!
//! A frozen or training `GraphDef` keeps everything in one message. Nodes
//! usually carry `_output_shapes`; convolution kernels are not attributes but
//! come from the shape of the filter variable's read node.

use super::{to_size, FormatAdapter, FormatError, HandleResolver, Result};
use crate::catalog::{OpCatalog, OpKind, SourceFormat};
use crate::config::InferenceConfig;
use crate::graph::{
    Attributes, CanonicalGraph, Dimension, GraphRecord, Padding, Pads, SkippedOp, Spatial,
    TensorHandle, WeightShape,
};
use crate::proto::tensorflow::{GraphDef, NodeDef};
use prost::Message;
use std::collections::HashMap;

/// Tensor layout named by the `data_format` attribute.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Layout {
    Nhwc,
    Nchw,
}

impl Layout {
    fn of(node: &NodeDef, context: &str) -> std::result::Result<Self, FormatError> {
        match node.attr.get("data_format").and_then(|v| v.as_str()) {
            None | Some("NHWC") => Ok(Layout::Nhwc),
            Some("NCHW") => Ok(Layout::Nchw),
            Some(other) => Err(FormatError::InvalidValue {
                context: context.to_string(),
                attribute: "data_format",
                value: other.to_string(),
            }),
        }
    }

    /// Layout named by the first node that declares one; NHWC otherwise.
    fn of_graph(graph_def: &GraphDef) -> std::result::Result<Self, FormatError> {
        match graph_def.node.iter().find(|n| n.attr.contains_key("data_format")) {
            Some(node) => Self::of(node, &node.name),
            None => Ok(Layout::Nhwc),
        }
    }

    /// Positions of (height, width, channels) in a rank-4 list.
    const fn axes(self) -> (usize, usize, usize) {
        match self {
            Layout::Nhwc => (1, 2, 3),
            Layout::Nchw => (2, 3, 1),
        }
    }

    /// Dimension of a declared shape; `None` when a size is unknown.
    fn dimension(self, sizes: &[i64]) -> Option<Dimension> {
        let known = |s: i64| usize::try_from(s).ok();
        match sizes.len() {
            4 => {
                let (h, w, c) = self.axes();
                Some(Dimension::new(known(sizes[h])?, known(sizes[w])?, known(sizes[c])?))
            }
            2 => Some(Dimension::flat(known(sizes[1])?)),
            _ => None,
        }
    }

    /// Reads the spatial entries of a 4-element `strides`/`ksize` list.
    /// Batch and channel entries must be 1.
    fn window(
        self,
        values: &[i64],
        context: &str,
        attribute: &'static str,
    ) -> std::result::Result<Spatial, FormatError> {
        let invalid = || FormatError::InvalidValue {
            context: context.to_string(),
            attribute,
            value: format!("{values:?}"),
        };
        if values.len() != 4 {
            return Err(invalid());
        }
        let (h, w, c) = self.axes();
        if values[0] != 1 || values[c] != 1 {
            return Err(invalid());
        }
        Ok(Spatial::new(
            to_size(values[h], context, attribute)?,
            to_size(values[w], context, attribute)?,
        ))
    }
}

/// Drops control inputs and the `:0` output suffix.
fn normalize_input(name: &str) -> Option<&str> {
    if name.starts_with('^') {
        return None;
    }
    Some(name.strip_suffix(":0").unwrap_or(name))
}

/// First entry of `_output_shapes`.
fn output_shape(node: &NodeDef) -> Option<Vec<i64>> {
    node.attr
        .get("_output_shapes")
        .and_then(|v| v.as_shapes())
        .and_then(|shapes| shapes.first())
        .filter(|s| !s.unknown_rank)
        .map(|s| s.sizes())
}

/// Shape a variable, constant or placeholder declares for itself.
fn declared_shape(node: &NodeDef) -> Option<Vec<i64>> {
    output_shape(node).or_else(|| {
        node.attr
            .get("shape")
            .and_then(|v| v.as_shape())
            .filter(|s| !s.unknown_rank)
            .map(|s| s.sizes())
    })
}

pub struct TensorFlowAdapter {
    catalog: OpCatalog,
    input_name: Option<String>,
}

impl TensorFlowAdapter {
    pub fn new(config: &InferenceConfig) -> Self {
        Self {
            catalog: OpCatalog::new(SourceFormat::TensorFlow, config.catalog_mode),
            input_name: config.input_name.clone(),
        }
    }

    /// Builds the canonical graph from a decoded `GraphDef`.
    pub fn convert(&self, graph_def: &GraphDef) -> Result<CanonicalGraph> {
        // parameter tensor -> declared shape
        let mut params: HashMap<String, Option<Vec<i64>>> = HashMap::new();
        let mut resolver = HandleResolver::new(false);
        // network input handle and the sizes its placeholder declares
        let mut input: Option<(TensorHandle, Option<Vec<i64>>)> = None;
        let mut input_layout: Option<Layout> = None;
        let graph_layout = Layout::of_graph(graph_def)?;
        let mut graph = CanonicalGraph::default();

        for (position, node) in graph_def.node.iter().enumerate() {
            let context = format!("node #{position} {} '{}'", node.op, node.name);
            if node.op.is_empty() {
                return Err(FormatError::MissingField { context, field: "op" }.into());
            }
            if node.name.is_empty() {
                return Err(FormatError::MissingField { context, field: "name" }.into());
            }
            let inputs: Vec<&str> = node.input.iter().filter_map(|i| normalize_input(i)).collect();

            match node.op.as_str() {
                "Placeholder" | "PlaceholderV2" => {
                    let wanted = self.input_name.as_deref().map_or(input.is_none(), |n| n == node.name);
                    if wanted {
                        input = Some((resolver.define(&node.name), declared_shape(node)));
                    } else {
                        params.insert(node.name.clone(), declared_shape(node));
                    }
                    continue;
                }
                "VariableV2" | "Variable" | "VarHandleOp" | "Const" => {
                    params.insert(node.name.clone(), declared_shape(node));
                    continue;
                }
                "Identity" | "ReadVariableOp" => {
                    if let Some(shape) = inputs.first().and_then(|i| params.get(*i)) {
                        let shape = output_shape(node).or_else(|| shape.clone());
                        params.insert(node.name.clone(), shape);
                        continue;
                    }
                }
                _ => {}
            }

            let Some(kind) = self.catalog.resolve(&node.op, Some(&node.name))? else {
                let aliased_to = inputs
                    .iter()
                    .find(|i| !params.contains_key(**i))
                    .map(|i| resolver.read(i));
                if let Some(target) = &aliased_to {
                    resolver.alias(&node.name, target.clone());
                }
                tracing::warn!(position, op = %node.op, name = %node.name, "skipping unknown tensorflow op");
                graph.skipped.push(SkippedOp {
                    position,
                    name: Some(node.name.clone()),
                    op_type: node.op.clone(),
                    aliased_to,
                });
                continue;
            };

            let Some(&first) = inputs.first() else {
                return Err(FormatError::MissingField { context, field: "input" }.into());
            };
            let data_inputs: Vec<_> = if kind.is_variadic() {
                inputs.iter().filter(|i| !params.contains_key(**i)).map(|i| resolver.read(i)).collect()
            } else {
                vec![resolver.read(first)]
            };

            let mut attributes = Self::parse_attributes(node, kind, &context)?;
            let weight = if kind.requires_weight() {
                let name = inputs
                    .get(1)
                    .ok_or_else(|| FormatError::MissingField { context: context.clone(), field: "input" })?;
                let shape = Self::weight_shape(node, kind, name, params.get(*name), &context)?;
                if kind == OpKind::Conv {
                    attributes.kernel = shape.kernel;
                }
                graph.weights.insert(*name, shape);
                Some(name.to_string())
            } else {
                None
            };

            let layout = if node.attr.contains_key("data_format") {
                let layout = Layout::of(node, &context)?;
                if input_layout.is_none() && input.as_ref().is_some_and(|(h, _)| data_inputs.contains(h)) {
                    input_layout = Some(layout);
                }
                layout
            } else {
                graph_layout
            };
            let annotated = output_shape(node).and_then(|sizes| layout.dimension(&sizes));

            let mut record = GraphRecord::new(graph.records.len(), kind, node.op.clone())
                .with_name(node.name.clone())
                .with_inputs(data_inputs)
                .with_outputs([resolver.define(&node.name)]);
            record.weight = weight;
            record.attributes = attributes;
            record.annotated = annotated;
            graph.records.push(record);
        }

        let (input, declared) = input.ok_or(FormatError::NoInput)?;
        let input_layout = input_layout.unwrap_or(graph_layout);
        graph.input = input;
        graph.input_dims = declared.and_then(|sizes| input_layout.dimension(&sizes));

        tracing::info!(
            records = graph.records.len(),
            weights = graph.weights.len(),
            skipped = graph.skipped.len(),
            input = %graph.input,
            "loaded tensorflow graph"
        );
        Ok(graph)
    }

    fn parse_attributes(
        node: &NodeDef,
        kind: OpKind,
        context: &str,
    ) -> std::result::Result<Attributes, FormatError> {
        let mut attributes = Attributes::default();
        if !matches!(kind, OpKind::Conv | OpKind::MaxPool | OpKind::AveragePool) {
            return Ok(attributes);
        }
        let layout = Layout::of(node, context)?;

        if let Some(strides) = node.attr.get("strides").and_then(|v| v.as_ints()) {
            attributes.stride = Some(layout.window(strides, context, "strides")?);
        }
        if let Some(ksize) = node.attr.get("ksize").and_then(|v| v.as_ints()) {
            attributes.kernel = Some(layout.window(ksize, context, "ksize")?);
        }

        attributes.padding = match node.attr.get("padding").and_then(|v| v.as_str()) {
            None => None,
            Some("VALID") => Some(Padding::Explicit(Pads::default())),
            Some("SAME") => Some(Padding::Same),
            Some("EXPLICIT") => Some(Self::explicit_padding(node, layout, context)?),
            Some(other) => {
                return Err(FormatError::InvalidValue {
                    context: context.to_string(),
                    attribute: "padding",
                    value: other.to_string(),
                })
            }
        };

        Ok(attributes)
    }

    /// `explicit_paddings` lists (before, after) pairs for each of the four
    /// axes in layout order.
    fn explicit_padding(
        node: &NodeDef,
        layout: Layout,
        context: &str,
    ) -> std::result::Result<Padding, FormatError> {
        let values = node
            .attr
            .get("explicit_paddings")
            .and_then(|v| v.as_ints())
            .ok_or_else(|| FormatError::MissingField {
                context: context.to_string(),
                field: "explicit_paddings",
            })?;
        if values.len() != 8 {
            return Err(FormatError::InvalidValue {
                context: context.to_string(),
                attribute: "explicit_paddings",
                value: format!("{values:?}"),
            });
        }
        let (h, w, _) = layout.axes();
        let pad = |i: usize| to_size(values[i], context, "explicit_paddings");
        Ok(Padding::Explicit(Pads {
            top: pad(2 * h)?,
            bottom: pad(2 * h + 1)?,
            left: pad(2 * w)?,
            right: pad(2 * w + 1)?,
        }))
    }

    /// Shape facts of the filter/matrix read by a weighted op. Filters are
    /// HWIO; `MatMul` weights are `[in, out]` unless `transpose_b`.
    fn weight_shape(
        node: &NodeDef,
        kind: OpKind,
        weight: &str,
        declared: Option<&Option<Vec<i64>>>,
        context: &str,
    ) -> std::result::Result<WeightShape, FormatError> {
        let missing = || FormatError::MissingWeight {
            context: context.to_string(),
            weight: weight.to_string(),
        };
        let sizes = declared.ok_or_else(missing)?.as_ref().ok_or_else(missing)?;
        let dims = sizes
            .iter()
            .map(|&s| to_size(s, context, "weight shape"))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let invalid = || FormatError::InvalidValue {
            context: context.to_string(),
            attribute: "weight shape",
            value: format!("{dims:?}"),
        };

        match kind {
            OpKind::Conv if dims.len() == 4 => Ok(WeightShape {
                out_channels: dims[3],
                kernel: Some(Spatial::new(dims[0], dims[1])),
            }),
            OpKind::FullyConnected if dims.len() == 2 => {
                let transposed = node.attr.get("transpose_b").and_then(|v| v.as_bool()).unwrap_or(false);
                let out_channels = if transposed { dims[0] } else { dims[1] };
                Ok(WeightShape { out_channels, kernel: None })
            }
            _ => Err(invalid()),
        }
    }
}

impl FormatAdapter for TensorFlowAdapter {
    fn name(&self) -> &'static str {
        "tensorflow"
    }

    /// The auxiliary message is unused: TensorFlow keeps shapes in the graph.
    fn load(&self, graph: &[u8], _weights: Option<&[u8]>) -> Result<CanonicalGraph> {
        let graph_def = GraphDef::decode(graph).map_err(FormatError::from)?;
        self.convert(&graph_def)
    }
}
