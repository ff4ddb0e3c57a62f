//! Module for shape inference over canonical graph records.
//!
//! Walks the records in order, keeps a table of tensor dimensions, and
//! determines the output dimension of each record from its input dimension,
//! its attributes, and the weight shape table.

use crate::catalog::{OpKind, ShapeRule};
use crate::graph::{
    Dimension, GraphRecord, Padding, Pads, Spatial, TensorHandle, WeightShape, WeightShapeTable,
};
use crate::report::{Note, OpDescription, Report};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeInferenceError {
    #[error("Record {record} reads tensor '{handle}' before any record produces it. \
             Records must be listed in topological order.")]
    UndefinedTensor { record: String, handle: TensorHandle },

    #[error("Inputs of merge record {record} disagree: '{handle}' is {found}, expected {expected}.")]
    ShapeMismatch {
        record: String,
        handle: TensorHandle,
        expected: Dimension,
        found: Dimension,
    },

    #[error("Tensor '{handle}' produced by record {record} is already bound. \
             Every tensor must be produced exactly once.")]
    DuplicateBinding { record: String, handle: TensorHandle },

    #[error("Record {0} has no data input.")]
    MissingInput(String),

    #[error("Record {record} needs weight '{weight}', which is not in the weight shape table.")]
    MissingWeight { record: String, weight: String },

    #[error("Record {record} has no '{attribute}' and none can be derived.")]
    MissingAttribute { record: String, attribute: &'static str },

    #[error("Record {record} has an invalid window: {reason}.")]
    InvalidWindow { record: String, reason: String },

    #[error("Record {0} slides a window over a tensor without spatial extent.")]
    FlatInput(String),

    #[error("Record {record} overflows the size range computing its {quantity}.")]
    Overflow { record: String, quantity: &'static str },
}

type Result<T> = std::result::Result<T, ShapeInferenceError>;

/// Tensor handle -> dimension bindings for one inference run.
///
/// Append-only: a handle is bound at most once.
#[derive(Debug, Clone, Default)]
pub struct DimensionTable {
    bindings: BTreeMap<TensorHandle, Dimension>,
}

impl DimensionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, handle: &str) -> Option<Dimension> {
        self.bindings.get(handle).copied()
    }

    fn bind(&mut self, record: &GraphRecord, handle: &str, dim: Dimension) -> Result<()> {
        if self.bindings.contains_key(handle) {
            return Err(ShapeInferenceError::DuplicateBinding {
                record: record.label(),
                handle: handle.to_string(),
            });
        }
        self.bindings.insert(handle.to_string(), dim);
        Ok(())
    }
}

/// Resolved window parameters of a spatial-reducing record.
struct Window {
    kernel: Spatial,
    stride: Spatial,
    pads: Pads,
}

/// Structure that performs shape inference over a record sequence.
pub struct ShapeInference;

impl ShapeInference {
    /// Runs shape inference.
    ///
    /// # Arguments
    /// * `records` - Canonical records in topological order.
    /// * `weights` - Weight shape table supplied by the adapter.
    /// * `input` - Network input handle and its dimension; seeds the table.
    pub fn run(
        records: &[GraphRecord],
        weights: &WeightShapeTable,
        input: (&str, Dimension),
    ) -> Result<Report> {
        let mut table = DimensionTable::new();
        let mut report = Report::default();

        let (input_handle, input_dim) = input;
        table.bindings.insert(input_handle.to_string(), input_dim);
        tracing::debug!(input = input_handle, dims = %input_dim, "seeded dimension table");

        for record in records {
            let row = Self::infer_record(&mut table, weights, record)?;
            let inferred = row.output();

            if let Some(annotated) = record.annotated {
                if annotated != inferred {
                    tracing::warn!(
                        record = %record.label(),
                        %inferred,
                        %annotated,
                        "declared output shape differs from inferred shape"
                    );
                    report.notes.push(Note::AnnotationMismatch {
                        record: record.id,
                        inferred,
                        annotated,
                    });
                }
            }

            tracing::debug!(record = %record.label(), output = %inferred, "inferred");
            report.rows.push(row);
        }

        Ok(report)
    }

    /// Shape logic for a single record; binds its outputs.
    fn infer_record(
        table: &mut DimensionTable,
        weights: &WeightShapeTable,
        record: &GraphRecord,
    ) -> Result<OpDescription> {
        let input = Self::resolve_inputs(table, record)?;
        let weight = Self::resolve_weight(weights, record)?;

        let mut row = OpDescription {
            id: record.id,
            name: record.name.clone(),
            kind: record.kind,
            in_channels: input.channels,
            out_channels: input.channels,
            kernel_h: None,
            kernel_w: None,
            padding: None,
            stride: None,
            out_h: None,
            out_w: None,
        };

        let output = match record.kind.rule() {
            ShapeRule::SpatialReducing => {
                if input.is_flat() {
                    return Err(ShapeInferenceError::FlatInput(record.label()));
                }
                let window = Self::resolve_window(record, input, weight)?;
                let vertical = window.pads.vertical().ok_or_else(|| Self::overflow(record, "padding"))?;
                let horizontal = window.pads.horizontal().ok_or_else(|| Self::overflow(record, "padding"))?;
                let out_h = Self::window_output(record, input.height, window.kernel.h, vertical, window.stride.h)?;
                let out_w = Self::window_output(record, input.width, window.kernel.w, horizontal, window.stride.w)?;
                let channels = weight.map_or(input.channels, |w| w.out_channels);

                row.kernel_h = Some(window.kernel.h);
                row.kernel_w = Some(window.kernel.w);
                row.padding = Some(window.pads);
                row.stride = Some(window.stride);
                Dimension::new(out_h, out_w, channels)
            }

            ShapeRule::PassThrough => input,

            ShapeRule::ChannelRemapping => {
                let weight = weight.ok_or_else(|| Self::weight_required(record))?;
                row.in_channels = input
                    .features()
                    .ok_or_else(|| Self::overflow(record, "flattened feature count"))?;
                Dimension::flat(weight.out_channels)
            }
        };

        row.out_channels = output.channels;
        if !output.is_flat() {
            row.out_h = Some(output.height);
            row.out_w = Some(output.width);
        }

        for handle in &record.outputs {
            table.bind(record, handle, output)?;
        }

        Ok(row)
    }

    /// Looks up every data input and checks that merge points agree.
    fn resolve_inputs(table: &DimensionTable, record: &GraphRecord) -> Result<Dimension> {
        let mut resolved: Option<Dimension> = None;

        for handle in &record.inputs {
            let dim = table.get(handle).ok_or_else(|| ShapeInferenceError::UndefinedTensor {
                record: record.label(),
                handle: handle.clone(),
            })?;

            match resolved {
                None => resolved = Some(dim),
                Some(expected) if expected != dim => {
                    return Err(ShapeInferenceError::ShapeMismatch {
                        record: record.label(),
                        handle: handle.clone(),
                        expected,
                        found: dim,
                    });
                }
                Some(_) => {}
            }
        }

        resolved.ok_or_else(|| ShapeInferenceError::MissingInput(record.label()))
    }

    fn resolve_weight<'a>(
        weights: &'a WeightShapeTable,
        record: &GraphRecord,
    ) -> Result<Option<&'a WeightShape>> {
        match &record.weight {
            Some(handle) => weights
                .get(handle)
                .map(Some)
                .ok_or_else(|| ShapeInferenceError::MissingWeight {
                    record: record.label(),
                    weight: handle.clone(),
                }),
            None if record.kind.requires_weight() => Err(Self::weight_required(record)),
            None => Ok(None),
        }
    }

    fn overflow(record: &GraphRecord, quantity: &'static str) -> ShapeInferenceError {
        ShapeInferenceError::Overflow { record: record.label(), quantity }
    }

    fn weight_required(record: &GraphRecord) -> ShapeInferenceError {
        ShapeInferenceError::MissingWeight {
            record: record.label(),
            weight: "<none>".to_string(),
        }
    }

    fn resolve_window(
        record: &GraphRecord,
        input: Dimension,
        weight: Option<&WeightShape>,
    ) -> Result<Window> {
        let attrs = &record.attributes;

        // Global pooling covers the whole input.
        if attrs.global_pooling {
            return Ok(Window {
                kernel: Spatial::new(input.height, input.width),
                stride: Spatial::square(1),
                pads: Pads::default(),
            });
        }

        let kernel = attrs
            .kernel
            .or_else(|| weight.and_then(|w| w.kernel))
            .ok_or_else(|| ShapeInferenceError::MissingAttribute {
                record: record.label(),
                attribute: "kernel",
            })?;
        let stride = attrs.stride.unwrap_or(Spatial::square(1));

        if kernel.h == 0 || kernel.w == 0 {
            return Err(ShapeInferenceError::InvalidWindow {
                record: record.label(),
                reason: format!("kernel {kernel} has a zero extent"),
            });
        }
        if stride.h == 0 || stride.w == 0 {
            return Err(ShapeInferenceError::InvalidWindow {
                record: record.label(),
                reason: format!("stride {stride} has a zero step"),
            });
        }

        let pads = match attrs.padding {
            None => Pads::default(),
            Some(Padding::Explicit(pads)) => pads,
            Some(Padding::Same) => {
                let (top, bottom) = Self::same_padding(input.height, kernel.h, stride.h)
                    .ok_or_else(|| Self::overflow(record, "padding"))?;
                let (left, right) = Self::same_padding(input.width, kernel.w, stride.w)
                    .ok_or_else(|| Self::overflow(record, "padding"))?;
                Pads { top, left, bottom, right }
            }
        };

        Ok(Window { kernel, stride, pads })
    }

    /// TensorFlow SAME padding: output is `ceil(size / stride)`, the extra
    /// padding goes to the end.
    fn same_padding(size: usize, kernel: usize, stride: usize) -> Option<(usize, usize)> {
        let out = size.div_ceil(stride);
        let covered = out.saturating_sub(1).checked_mul(stride)?.checked_add(kernel)?;
        let needed = covered.saturating_sub(size);
        let begin = needed / 2;
        Some((begin, needed - begin))
    }

    /// `floor((size - kernel + padding) / stride) + 1`, where `padding` is the
    /// total over both edges of the axis.
    fn window_output(
        record: &GraphRecord,
        size: usize,
        kernel: usize,
        padding: usize,
        stride: usize,
    ) -> Result<usize> {
        let padded = size
            .checked_add(padding)
            .ok_or_else(|| Self::overflow(record, "padded extent"))?;
        if padded < kernel {
            return Err(ShapeInferenceError::InvalidWindow {
                record: record.label(),
                reason: format!("kernel {kernel} exceeds padded extent {padded}"),
            });
        }
        Ok((padded - kernel) / stride + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RecordId;

    fn conv(id: RecordId, input: &str, output: &str, weight: &str) -> GraphRecord {
        GraphRecord::new(id, OpKind::Conv, "Conv")
            .with_inputs([input])
            .with_outputs([output])
            .with_weight(weight)
    }

    fn weights(entries: &[(&str, usize, Option<usize>)]) -> WeightShapeTable {
        let mut table = WeightShapeTable::new();
        for &(name, out_channels, kernel) in entries {
            table.insert(
                name,
                WeightShape { out_channels, kernel: kernel.map(Spatial::square) },
            );
        }
        table
    }

    fn stem() -> Vec<GraphRecord> {
        vec![
            conv(0, "data", "conv1", "conv1_w")
                .with_kernel(Spatial::square(7))
                .with_stride(Spatial::square(2))
                .with_padding(Padding::Explicit(Pads::uniform(3))),
            GraphRecord::new(1, OpKind::MaxPool, "MaxPool")
                .with_inputs(["conv1"])
                .with_outputs(["pool1"])
                .with_kernel(Spatial::square(3))
                .with_stride(Spatial::square(2))
                .with_padding(Padding::Explicit(Pads::uniform(1))),
        ]
    }

    const INPUT: (&str, Dimension) = ("data", Dimension::new(224, 224, 3));

    #[test]
    fn test_conv_then_maxpool() {
        let table = weights(&[("conv1_w", 64, Some(7))]);
        let report = ShapeInference::run(&stem(), &table, INPUT).unwrap();

        assert_eq!(report.rows[0].output(), Dimension::new(112, 112, 64));
        assert_eq!(report.rows[0].in_channels, 3);
        assert_eq!(report.rows[0].padding, Some(Pads::uniform(3)));
        assert_eq!(report.rows[1].output(), Dimension::new(56, 56, 64));
        assert_eq!(report.rows[1].in_channels, 64);
        assert!(report.notes.is_empty());
    }

    #[test]
    fn test_pass_through_is_identity() {
        let input = Dimension::new(56, 56, 256);
        for kind in [OpKind::Relu, OpKind::BatchNorm, OpKind::Softmax, OpKind::Sum] {
            let record = GraphRecord::new(0, kind, kind.as_str())
                .with_inputs(["x"])
                .with_outputs(["y"]);
            let report =
                ShapeInference::run(&[record], &WeightShapeTable::new(), ("x", input)).unwrap();
            let row = &report.rows[0];
            assert_eq!(row.output(), input);
            assert_eq!(row.kernel_h, None);
            assert_eq!(row.stride, None);
            assert_eq!(row.padding, None);
        }
    }

    #[test]
    fn test_residual_sum() {
        let table = weights(&[("branch_w", 256, Some(1)), ("shortcut_w", 256, Some(1))]);
        let records = vec![
            conv(0, "x", "branch", "branch_w"),
            conv(1, "x", "shortcut", "shortcut_w"),
            GraphRecord::new(2, OpKind::Sum, "Sum")
                .with_inputs(["branch", "shortcut"])
                .with_outputs(["sum"]),
        ];
        let report =
            ShapeInference::run(&records, &table, ("x", Dimension::new(56, 56, 64))).unwrap();
        assert_eq!(report.rows[2].output(), Dimension::new(56, 56, 256));
    }

    #[test]
    fn test_residual_sum_mismatch() {
        let table = weights(&[("branch_w", 256, Some(1)), ("shortcut_w", 256, Some(1))]);
        let records = vec![
            conv(0, "x", "branch", "branch_w"),
            conv(1, "x", "shortcut", "shortcut_w").with_stride(Spatial::square(2)),
            GraphRecord::new(2, OpKind::Sum, "Sum")
                .with_inputs(["branch", "shortcut"])
                .with_outputs(["sum"]),
        ];
        let err =
            ShapeInference::run(&records, &table, ("x", Dimension::new(56, 56, 64))).unwrap_err();
        assert_eq!(
            err,
            ShapeInferenceError::ShapeMismatch {
                record: "#2 Sum".to_string(),
                handle: "shortcut".to_string(),
                expected: Dimension::new(56, 56, 256),
                found: Dimension::new(28, 28, 256),
            }
        );
    }

    #[test]
    fn test_mismatch_detected_past_first_pair() {
        let records = vec![GraphRecord::new(0, OpKind::Sum, "AddN")
            .with_inputs(["x", "x", "y"])
            .with_outputs(["z"])];
        let mut table = DimensionTable::new();
        table.bindings.insert("x".into(), Dimension::new(8, 8, 4));
        table.bindings.insert("y".into(), Dimension::new(8, 8, 5));
        let err = ShapeInference::infer_record(&mut table, &WeightShapeTable::new(), &records[0])
            .unwrap_err();
        assert!(matches!(err, ShapeInferenceError::ShapeMismatch { ref handle, .. } if handle == "y"));
    }

    #[test]
    fn test_undefined_tensor() {
        let records = vec![GraphRecord::new(0, OpKind::Relu, "Relu")
            .with_inputs(["never_produced"])
            .with_outputs(["y"])];
        let err = ShapeInference::run(&records, &WeightShapeTable::new(), INPUT).unwrap_err();
        assert!(matches!(
            err,
            ShapeInferenceError::UndefinedTensor { ref handle, .. } if handle == "never_produced"
        ));
    }

    #[test]
    fn test_duplicate_binding() {
        let records = vec![
            GraphRecord::new(0, OpKind::Relu, "Relu").with_inputs(["data"]).with_outputs(["y"]),
            GraphRecord::new(1, OpKind::Relu, "Relu").with_inputs(["data"]).with_outputs(["y"]),
        ];
        let err = ShapeInference::run(&records, &WeightShapeTable::new(), INPUT).unwrap_err();
        assert!(matches!(err, ShapeInferenceError::DuplicateBinding { ref handle, .. } if handle == "y"));

        let rebinding_input = vec![GraphRecord::new(0, OpKind::Relu, "Relu")
            .with_inputs(["data"])
            .with_outputs(["data"])];
        assert!(matches!(
            ShapeInference::run(&rebinding_input, &WeightShapeTable::new(), INPUT),
            Err(ShapeInferenceError::DuplicateBinding { .. })
        ));
    }

    #[test]
    fn test_absent_defaults_match_explicit_zero() {
        let pool = |padding: Option<Padding>| {
            let mut record = GraphRecord::new(0, OpKind::AveragePool, "AveragePool")
                .with_inputs(["data"])
                .with_outputs(["pool"])
                .with_kernel(Spatial::square(2));
            record.attributes.padding = padding;
            record
        };
        let implicit = ShapeInference::run(&[pool(None)], &WeightShapeTable::new(), INPUT).unwrap();
        let explicit = ShapeInference::run(
            &[pool(Some(Padding::Explicit(Pads::uniform(0))))],
            &WeightShapeTable::new(),
            INPUT,
        )
        .unwrap();
        // stride defaults to 1
        assert_eq!(implicit.rows[0].output(), Dimension::new(223, 223, 3));
        assert_eq!(implicit.rows, explicit.rows);
        assert_eq!(implicit.rows[0].stride, Some(Spatial::square(1)));
    }

    #[test]
    fn test_zero_stride_rejected() {
        let record = GraphRecord::new(0, OpKind::MaxPool, "MaxPool")
            .with_inputs(["data"])
            .with_outputs(["pool"])
            .with_kernel(Spatial::square(2))
            .with_stride(Spatial::new(2, 0));
        let err = ShapeInference::run(&[record], &WeightShapeTable::new(), INPUT).unwrap_err();
        assert!(matches!(err, ShapeInferenceError::InvalidWindow { .. }));
    }

    #[test]
    fn test_kernel_from_weight_and_anisotropic_stride() {
        let table = weights(&[("w", 32, Some(3))]);
        let record = conv(0, "data", "y", "w").with_stride(Spatial::new(2, 1));
        let report = ShapeInference::run(&[record], &table, INPUT).unwrap();
        let row = &report.rows[0];
        assert_eq!(row.kernel_h, Some(3));
        assert_eq!(row.output(), Dimension::new(111, 222, 32));
    }

    #[test]
    fn test_missing_kernel() {
        let table = weights(&[("w", 32, None)]);
        let err = ShapeInference::run(&[conv(0, "data", "y", "w")], &table, INPUT).unwrap_err();
        assert!(matches!(
            err,
            ShapeInferenceError::MissingAttribute { attribute: "kernel", .. }
        ));
    }

    #[test]
    fn test_same_padding() {
        assert_eq!(ShapeInference::same_padding(224, 7, 2), Some((2, 3)));
        assert_eq!(ShapeInference::same_padding(56, 3, 1), Some((1, 1)));
        assert_eq!(ShapeInference::same_padding(56, 1, 2), Some((0, 0)));

        let table = weights(&[("w", 64, Some(7))]);
        let record = conv(0, "data", "y", "w")
            .with_stride(Spatial::square(2))
            .with_padding(Padding::Same);
        let report = ShapeInference::run(&[record], &table, INPUT).unwrap();
        assert_eq!(report.rows[0].output(), Dimension::new(112, 112, 64));
        assert_eq!(report.rows[0].padding, Some(Pads { top: 2, left: 2, bottom: 3, right: 3 }));
    }

    #[test]
    fn test_global_pooling_then_fc() {
        let table = weights(&[("fc_w", 1000, None)]);
        let records = vec![
            GraphRecord::new(0, OpKind::AveragePool, "AveragePool")
                .with_inputs(["x"])
                .with_outputs(["pool"])
                .with_global_pooling(),
            GraphRecord::new(1, OpKind::FullyConnected, "FC")
                .with_inputs(["pool"])
                .with_outputs(["fc"])
                .with_weight("fc_w"),
            GraphRecord::new(2, OpKind::Softmax, "Softmax")
                .with_inputs(["fc"])
                .with_outputs(["prob"]),
        ];
        let report =
            ShapeInference::run(&records, &table, ("x", Dimension::new(7, 7, 2048))).unwrap();

        assert_eq!(report.rows[0].output(), Dimension::new(1, 1, 2048));
        assert_eq!(report.rows[0].kernel_h, Some(7));
        let fc = &report.rows[1];
        assert_eq!(fc.in_channels, 2048);
        assert_eq!(fc.out_channels, 1000);
        assert_eq!((fc.out_h, fc.out_w), (None, None));
        assert_eq!(report.final_output(), Some(Dimension::flat(1000)));
    }

    #[test]
    fn test_fc_flattens_spatial_input() {
        let table = weights(&[("fc6_w", 4096, None)]);
        let record = GraphRecord::new(0, OpKind::FullyConnected, "FC")
            .with_inputs(["pool5"])
            .with_outputs(["fc6"])
            .with_weight("fc6_w");
        let report =
            ShapeInference::run(&[record], &table, ("pool5", Dimension::new(7, 7, 512))).unwrap();
        assert_eq!(report.rows[0].in_channels, 25088);
    }

    #[test]
    fn test_oversized_values_overflow() {
        let pool = GraphRecord::new(0, OpKind::MaxPool, "MaxPool")
            .with_inputs(["data"])
            .with_outputs(["pool"])
            .with_kernel(Spatial::square(3))
            .with_padding(Padding::Explicit(Pads::uniform(usize::MAX / 2 + 1)));
        let err = ShapeInference::run(&[pool], &WeightShapeTable::new(), INPUT).unwrap_err();
        assert!(matches!(err, ShapeInferenceError::Overflow { quantity: "padding", .. }));

        let pool = GraphRecord::new(0, OpKind::MaxPool, "MaxPool")
            .with_inputs(["data"])
            .with_outputs(["pool"])
            .with_kernel(Spatial::square(3))
            .with_padding(Padding::Explicit(Pads { top: usize::MAX, left: 0, bottom: 0, right: 0 }));
        let err = ShapeInference::run(&[pool], &WeightShapeTable::new(), INPUT).unwrap_err();
        assert!(matches!(err, ShapeInferenceError::Overflow { quantity: "padded extent", .. }));

        let same = GraphRecord::new(0, OpKind::MaxPool, "MaxPool")
            .with_inputs(["data"])
            .with_outputs(["pool"])
            .with_kernel(Spatial::square(usize::MAX))
            .with_stride(Spatial::square(2))
            .with_padding(Padding::Same);
        let err = ShapeInference::run(&[same], &WeightShapeTable::new(), INPUT).unwrap_err();
        assert!(matches!(err, ShapeInferenceError::Overflow { quantity: "padding", .. }));

        let table = weights(&[("fc_w", 10, None)]);
        let fc = GraphRecord::new(0, OpKind::FullyConnected, "MatMul")
            .with_inputs(["data"])
            .with_outputs(["fc"])
            .with_weight("fc_w");
        let err = ShapeInference::run(&[fc], &table, ("data", Dimension::new(1 << 40, 1 << 40, 3)))
            .unwrap_err();
        assert!(matches!(
            err,
            ShapeInferenceError::Overflow { quantity: "flattened feature count", .. }
        ));
    }

    #[test]
    fn test_window_over_flat_input() {
        let record = GraphRecord::new(0, OpKind::MaxPool, "MaxPool")
            .with_inputs(["x"])
            .with_outputs(["y"])
            .with_kernel(Spatial::square(2));
        let err = ShapeInference::run(&[record], &WeightShapeTable::new(), ("x", Dimension::flat(10)))
            .unwrap_err();
        assert!(matches!(err, ShapeInferenceError::FlatInput(_)));
    }

    #[test]
    fn test_weight_errors() {
        let missing = conv(0, "data", "y", "absent_w").with_kernel(Spatial::square(3));
        assert!(matches!(
            ShapeInference::run(&[missing], &WeightShapeTable::new(), INPUT),
            Err(ShapeInferenceError::MissingWeight { ref weight, .. }) if weight == "absent_w"
        ));

        let unweighted = GraphRecord::new(0, OpKind::FullyConnected, "FC")
            .with_inputs(["data"])
            .with_outputs(["fc"]);
        assert!(matches!(
            ShapeInference::run(&[unweighted], &WeightShapeTable::new(), INPUT),
            Err(ShapeInferenceError::MissingWeight { .. })
        ));
    }

    #[test]
    fn test_annotation_mismatch_is_a_note() {
        let mut record = GraphRecord::new(0, OpKind::Relu, "Relu")
            .with_inputs(["data"])
            .with_outputs(["y"]);
        record.annotated = Some(Dimension::new(112, 112, 3));
        let report = ShapeInference::run(&[record], &WeightShapeTable::new(), INPUT).unwrap();
        assert_eq!(
            report.notes,
            vec![Note::AnnotationMismatch {
                record: 0,
                inferred: Dimension::new(224, 224, 3),
                annotated: Dimension::new(112, 112, 3),
            }]
        );
    }

    #[test]
    fn test_runs_are_deterministic() {
        let table = weights(&[("conv1_w", 64, Some(7))]);
        let first = ShapeInference::run(&stem(), &table, INPUT).unwrap();
        let second = ShapeInference::run(&stem(), &table, INPUT).unwrap();
        assert_eq!(first, second);
    }
}
