//! # Graph Analysis Module
//!
//! Analysis passes over the canonical record sequence.
//!
//! ## Available Passes
//!
//! - [`ShapeInference`](shape_inference::ShapeInference): propagates tensor
//!   dimensions through the records, rejecting out-of-order references,
//!   disagreeing merge points and duplicate bindings.
//!
//! ```text
//! CanonicalGraph -> Shape Inference -> Report (one row per record)
//! ```
//!
//! ## Example
//!
//! ```
//! use netshape::analysis::shape_inference::ShapeInference;
//! use netshape::catalog::OpKind;
//! use netshape::graph::{Dimension, GraphRecord, Spatial, WeightShapeTable};
//!
//! let pool = GraphRecord::new(0, OpKind::MaxPool, "MaxPool")
//!     .with_inputs(["data"])
//!     .with_outputs(["pool"])
//!     .with_kernel(Spatial::square(2))
//!     .with_stride(Spatial::square(2));
//!
//! let report = ShapeInference::run(
//!     &[pool],
//!     &WeightShapeTable::new(),
//!     ("data", Dimension::new(224, 224, 3)),
//! )?;
//! assert_eq!(report.final_output(), Some(Dimension::new(112, 112, 3)));
//! # Ok::<(), netshape::analysis::shape_inference::ShapeInferenceError>(())
//! ```

pub mod shape_inference;
