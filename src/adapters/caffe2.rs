//! Caffe2 adapter.
//!
//! A Caffe2 model is a pair of `NetDef`s: the predict net holds the
//! operators, the init net holds the operators that fill the parameters. Only
//! the `shape` argument of the init net is read; the bulk values are ignored.

use super::{to_size, AdapterError, FormatAdapter, FormatError, HandleResolver, Result};
use crate::catalog::{OpCatalog, SourceFormat};
use crate::config::InferenceConfig;
use crate::graph::{
    Attributes, CanonicalGraph, GraphRecord, Padding, Pads, SkippedOp, Spatial, WeightShape,
    WeightShapeTable,
};
use crate::proto::caffe2::{NetDef, OperatorDef};
use prost::Message;
use std::collections::BTreeSet;

pub struct Caffe2Adapter {
    catalog: OpCatalog,
    weight_suffix: String,
    input_name: Option<String>,
}

impl Caffe2Adapter {
    pub fn new(config: &InferenceConfig) -> Self {
        Self {
            catalog: OpCatalog::new(SourceFormat::Caffe2, config.catalog_mode),
            weight_suffix: config.weight_suffix.clone(),
            input_name: config.input_name.clone(),
        }
    }

    /// Scans the init net.
    ///
    /// Returns the weight shape table (ops whose output carries the weight
    /// suffix) and the names of every parameter the init net produces.
    pub fn weight_table(&self, init: &NetDef) -> Result<(WeightShapeTable, BTreeSet<String>)> {
        let mut table = WeightShapeTable::new();
        let mut params = BTreeSet::new();

        for (position, op) in init.op.iter().enumerate() {
            params.extend(op.output.iter().cloned());

            let Some(output) = op.output.first() else {
                continue;
            };
            if !output.ends_with(&self.weight_suffix) {
                continue;
            }

            let context = format!("init op #{position} '{output}'");
            let shape = op
                .find_arg("shape")
                .ok_or_else(|| FormatError::MissingField { context: context.clone(), field: "shape" })?;
            let dims = shape
                .ints
                .iter()
                .map(|&d| to_size(d, &context, "shape"))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let Some(&out_channels) = dims.first() else {
                return Err(FormatError::InvalidValue {
                    context,
                    attribute: "shape",
                    value: "[]".to_string(),
                }
                .into());
            };

            // OIHW filters also give the kernel extent.
            let kernel = (dims.len() == 4).then(|| Spatial::new(dims[2], dims[3]));
            table.insert(output.clone(), WeightShape { out_channels, kernel });
        }

        Ok((table, params))
    }

    /// Builds the canonical graph from decoded nets.
    pub fn convert(&self, predict: &NetDef, init: Option<&NetDef>) -> Result<CanonicalGraph> {
        let (weights, params) = match init {
            Some(init) => {
                let (weights, params) = self.weight_table(init)?;
                if weights.is_empty() {
                    tracing::warn!(
                        suffix = %self.weight_suffix,
                        "init net produces no tensor with the weight suffix"
                    );
                }
                (weights, params)
            }
            None => (WeightShapeTable::new(), BTreeSet::new()),
        };

        let input = self
            .input_name
            .clone()
            .or_else(|| predict.external_input.iter().find(|n| !params.contains(*n)).cloned())
            .or_else(|| predict.op.first().and_then(|op| op.input.first()).cloned())
            .ok_or(FormatError::NoInput)?;

        let mut resolver = HandleResolver::new(true);
        let input = resolver.define(&input);
        let mut graph = CanonicalGraph { input, weights, ..Default::default() };

        for (position, op) in predict.op.iter().enumerate() {
            let context = op_context(position, op);
            let op_type = op
                .r#type
                .as_deref()
                .ok_or_else(|| FormatError::MissingField { context: context.clone(), field: "type" })?;
            if op.input.is_empty() {
                return Err(FormatError::MissingField { context, field: "input" }.into());
            }
            let Some(first_output) = op.output.first() else {
                return Err(FormatError::MissingField { context, field: "output" }.into());
            };
            let name = op
                .name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| first_output.clone());

            let Some(kind) = self.catalog.resolve(op_type, Some(&name))? else {
                let aliased_to = op
                    .input
                    .iter()
                    .find(|i| !params.contains(*i))
                    .map(|i| resolver.read(i));
                if let Some(target) = &aliased_to {
                    for output in &op.output {
                        resolver.alias(output, target.clone());
                    }
                }
                tracing::warn!(position, op_type, name = %name, "skipping unknown caffe2 op");
                graph.skipped.push(SkippedOp {
                    position,
                    name: Some(name),
                    op_type: op_type.to_string(),
                    aliased_to,
                });
                continue;
            };

            let inputs: Vec<_> = if kind.is_variadic() {
                op.input.iter().filter(|i| !params.contains(*i)).map(|i| resolver.read(i)).collect()
            } else {
                vec![resolver.read(&op.input[0])]
            };

            let weight = if kind.requires_weight() {
                let weight = op
                    .input
                    .get(1)
                    .ok_or_else(|| FormatError::MissingField { context: context.clone(), field: "input" })?;
                if !graph.weights.contains(weight) {
                    return Err(FormatError::MissingWeight { context, weight: weight.clone() }.into());
                }
                Some(weight.clone())
            } else {
                None
            };

            let attributes = parse_attributes(op, &context)?;
            let output = resolver.define(first_output);
            // Secondary outputs (saved BN statistics, masks) read as the main output.
            for extra in &op.output[1..] {
                tracing::debug!(position, output = %extra, aliased_to = %output, "aliasing secondary output");
                resolver.alias(extra, output.clone());
            }

            let mut record = GraphRecord::new(graph.records.len(), kind, op_type)
                .with_name(name)
                .with_inputs(inputs)
                .with_outputs([output]);
            record.weight = weight;
            record.attributes = attributes;
            graph.records.push(record);
        }

        tracing::info!(
            records = graph.records.len(),
            weights = graph.weights.len(),
            skipped = graph.skipped.len(),
            input = %graph.input,
            "loaded caffe2 net"
        );
        Ok(graph)
    }
}

impl FormatAdapter for Caffe2Adapter {
    fn name(&self) -> &'static str {
        "caffe2"
    }

    fn load(&self, graph: &[u8], weights: Option<&[u8]>) -> Result<CanonicalGraph> {
        let predict = NetDef::decode(graph).map_err(FormatError::from)?;
        let init = weights
            .map(NetDef::decode)
            .transpose()
            .map_err(|e| AdapterError::Format(e.into()))?;
        self.convert(&predict, init.as_ref())
    }
}

fn op_context(position: usize, op: &OperatorDef) -> String {
    match (op.r#type.as_deref(), op.name.as_deref()) {
        (Some(t), Some(n)) if !n.is_empty() => format!("op #{position} {t} '{n}'"),
        (Some(t), _) => format!("op #{position} {t}"),
        (None, _) => format!("op #{position}"),
    }
}

fn int_arg(op: &OperatorDef, name: &'static str, context: &str) -> std::result::Result<Option<usize>, FormatError> {
    op.find_arg(name)
        .and_then(|a| a.i)
        .map(|v| to_size(v, context, name))
        .transpose()
}

fn ints_arg(op: &OperatorDef, name: &'static str, context: &str) -> std::result::Result<Option<Vec<usize>>, FormatError> {
    op.find_arg(name)
        .map(|a| a.ints.iter().map(|&v| to_size(v, context, name)).collect())
        .transpose()
}

/// Reads a 2-D window argument given as `name`, `name_h`/`name_w`, or the
/// list form `names`.
fn spatial_arg(
    op: &OperatorDef,
    context: &str,
    single: &'static str,
    (h, w): (&'static str, &'static str),
    list: &'static str,
) -> std::result::Result<Option<Spatial>, FormatError> {
    if let Some(v) = int_arg(op, single, context)? {
        return Ok(Some(Spatial::square(v)));
    }
    if let (Some(h), Some(w)) = (int_arg(op, h, context)?, int_arg(op, w, context)?) {
        return Ok(Some(Spatial::new(h, w)));
    }
    match ints_arg(op, list, context)? {
        None => Ok(None),
        Some(values) if values.len() == 2 => Ok(Some(Spatial::new(values[0], values[1]))),
        Some(values) => Err(FormatError::InvalidValue {
            context: context.to_string(),
            attribute: list,
            value: format!("{values:?}"),
        }),
    }
}

fn parse_padding(op: &OperatorDef, context: &str) -> std::result::Result<Option<Padding>, FormatError> {
    if let Some(p) = int_arg(op, "pad", context)? {
        return Ok(Some(Padding::Explicit(Pads::uniform(p))));
    }

    let edges = [
        int_arg(op, "pad_t", context)?,
        int_arg(op, "pad_l", context)?,
        int_arg(op, "pad_b", context)?,
        int_arg(op, "pad_r", context)?,
    ];
    if edges.iter().any(Option::is_some) {
        let [top, left, bottom, right] = edges.map(|e| e.unwrap_or(0));
        return Ok(Some(Padding::Explicit(Pads { top, left, bottom, right })));
    }

    match ints_arg(op, "pads", context)? {
        None => Ok(None),
        Some(values) if values.len() == 4 => Ok(Some(Padding::Explicit(Pads {
            top: values[0],
            left: values[1],
            bottom: values[2],
            right: values[3],
        }))),
        Some(values) => Err(FormatError::InvalidValue {
            context: context.to_string(),
            attribute: "pads",
            value: format!("{values:?}"),
        }),
    }
}

fn parse_attributes(op: &OperatorDef, context: &str) -> std::result::Result<Attributes, FormatError> {
    Ok(Attributes {
        kernel: spatial_arg(op, context, "kernel", ("kernel_h", "kernel_w"), "kernels")?,
        stride: spatial_arg(op, context, "stride", ("stride_h", "stride_w"), "strides")?,
        padding: parse_padding(op, context)?,
        global_pooling: op.find_arg("global_pooling").and_then(|a| a.i).is_some_and(|v| v != 0),
    })
}
