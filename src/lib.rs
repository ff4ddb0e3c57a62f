//! # netshape: static shape inference for CNN graphs
//!
//! **netshape** reads a serialized convolutional network (a Caffe2
//! `NetDef` pair or a TensorFlow `GraphDef`), lowers it to a canonical
//! record sequence, and infers the dimension of every tensor without
//! executing anything.
//!
//! ```text
//! bytes -> FormatAdapter -> CanonicalGraph -> ShapeInference -> Report
//! ```
//!
//! ## Usage Example
//!
//! ```no_run
//! use netshape::catalog::SourceFormat;
//! use netshape::config::InferenceConfig;
//!
//! let predict = std::fs::read("predict_net.pb")?;
//! let init = std::fs::read("init_net.pb")?;
//! let config = InferenceConfig::new();
//!
//! let report = netshape::analyze(SourceFormat::Caffe2, &predict, Some(&init), &config)?;
//! for row in &report.rows {
//!     println!("{:?} -> {}", row.kind, row.output());
//! }
//! # Ok::<(), netshape::Error>(())
//! ```

pub mod adapters;
pub mod analysis;
pub mod catalog;
pub mod config;
pub mod error;
pub mod graph;
pub mod proto;
pub mod report;

pub use error::{Error, Result};

use adapters::caffe2::Caffe2Adapter;
use adapters::tensorflow::TensorFlowAdapter;
use adapters::FormatAdapter;
use analysis::shape_inference::ShapeInference;
use catalog::SourceFormat;
use config::InferenceConfig;
use graph::{CanonicalGraph, Dimension, GraphRecord};
use report::{Note, Report};
use std::borrow::Cow;

/// Returns the adapter for `format`, configured from `config`.
pub fn adapter(format: SourceFormat, config: &InferenceConfig) -> Box<dyn FormatAdapter> {
    match format {
        SourceFormat::Caffe2 => Box::new(Caffe2Adapter::new(config)),
        SourceFormat::TensorFlow => Box::new(TensorFlowAdapter::new(config)),
    }
}

/// Runs shape inference over an already loaded graph.
///
/// The input dimension is taken from `config.input_dims`, then from the
/// graph's own declaration, then [`Dimension::default`]. Ops the adapter
/// skipped are reported as notes ahead of any annotation mismatches.
pub fn infer(graph: &CanonicalGraph, config: &InferenceConfig) -> Result<Report> {
    let input_dims = config
        .input_dims
        .or(graph.input_dims)
        .unwrap_or_default();

    let records: Cow<'_, [GraphRecord]> = if config.check_annotations {
        Cow::Borrowed(&graph.records)
    } else {
        Cow::Owned(
            graph
                .records
                .iter()
                .cloned()
                .map(|record| GraphRecord { annotated: None, ..record })
                .collect(),
        )
    };

    let mut report = ShapeInference::run(&records, &graph.weights, (graph.input.as_str(), input_dims))?;

    let mut notes: Vec<Note> = graph.skipped.iter().map(Note::from).collect();
    notes.append(&mut report.notes);
    report.notes = notes;

    tracing::info!(
        records = report.rows.len(),
        notes = report.notes.len(),
        input = %input_dims,
        output = %report.final_output().unwrap_or(input_dims),
        "shape inference finished"
    );
    Ok(report)
}

/// Decodes a serialized graph and runs shape inference over it.
///
/// `weights` is the Caffe2 init net; TensorFlow graphs carry their own
/// parameter shapes and ignore it.
pub fn analyze(
    format: SourceFormat,
    graph: &[u8],
    weights: Option<&[u8]>,
    config: &InferenceConfig,
) -> Result<Report> {
    let adapter = adapter(format, config);
    let canonical = adapter.load(graph, weights)?;
    tracing::debug!(
        format = adapter.name(),
        records = canonical.records.len(),
        weights = canonical.weights.len(),
        skipped = canonical.skipped.len(),
        "loaded graph"
    );
    infer(&canonical, config)
}
