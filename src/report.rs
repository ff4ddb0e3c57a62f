//! Inference output: one description row per canonical record, plus notes.

use crate::catalog::OpKind;
use crate::graph::{Dimension, Pads, RecordId, SkippedOp, Spatial, TensorHandle};
use serde::Serialize;

/// Per-op summary. Fields that do not apply to the op kind are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpDescription {
    pub id: RecordId,
    pub name: Option<String>,
    pub kind: OpKind,
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel_h: Option<usize>,
    pub kernel_w: Option<usize>,
    pub padding: Option<Pads>,
    pub stride: Option<Spatial>,
    pub out_h: Option<usize>,
    pub out_w: Option<usize>,
}

impl OpDescription {
    /// Output dimension this row describes.
    pub fn output(&self) -> Dimension {
        match (self.out_h, self.out_w) {
            (Some(h), Some(w)) => Dimension::new(h, w, self.out_channels),
            _ => Dimension::flat(self.out_channels),
        }
    }
}

/// Warning-level remarks attached to a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "note", rename_all = "snake_case")]
pub enum Note {
    /// An op type the catalog does not know was dropped.
    SkippedOp {
        position: usize,
        name: Option<String>,
        op_type: String,
        aliased_to: Option<TensorHandle>,
    },
    /// The source graph declares a different output shape than inferred.
    AnnotationMismatch {
        record: RecordId,
        inferred: Dimension,
        annotated: Dimension,
    },
}

impl From<&SkippedOp> for Note {
    fn from(op: &SkippedOp) -> Self {
        Note::SkippedOp {
            position: op.position,
            name: op.name.clone(),
            op_type: op.op_type.clone(),
            aliased_to: op.aliased_to.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub rows: Vec<OpDescription>,
    pub notes: Vec<Note>,
}

impl Report {
    /// Dimension of the last described op, i.e. the network output.
    pub fn final_output(&self) -> Option<Dimension> {
        self.rows.last().map(OpDescription::output)
    }
}
