//! Channel-first TensorFlow graphs and size values at the edge of the
//! integer range, run through the public entry points.

use netshape::analysis::shape_inference::ShapeInferenceError;
use netshape::catalog::SourceFormat;
use netshape::config::InferenceConfig;
use netshape::graph::Dimension;
use netshape::proto::caffe2::{Argument, NetDef, OperatorDef};
use netshape::proto::tensorflow::{AttrValue, GraphDef, NodeDef};
use netshape::Error;
use prost::Message;

fn nchw_graph() -> GraphDef {
    GraphDef {
        node: vec![
            NodeDef::new("images", "Placeholder", &[])
                .with_attr("shape", AttrValue::shape(&[-1, 3, 32, 32])),
            NodeDef::new("conv/filter", "Const", &[])
                .with_attr("shape", AttrValue::shape(&[3, 3, 3, 8])),
            NodeDef::new("conv", "Conv2D", &["images", "conv/filter"])
                .with_attr("data_format", AttrValue::string("NCHW"))
                .with_attr("strides", AttrValue::ints(&[1, 1, 1, 1]))
                .with_attr("padding", AttrValue::string("VALID"))
                .with_attr("_output_shapes", AttrValue::shapes(&[&[-1, 8, 30, 30]])),
            NodeDef::new("relu", "Relu", &["conv"])
                .with_attr("_output_shapes", AttrValue::shapes(&[&[-1, 8, 30, 30]])),
            NodeDef::new("pool", "MaxPool", &["relu"])
                .with_attr("data_format", AttrValue::string("NCHW"))
                .with_attr("ksize", AttrValue::ints(&[1, 1, 2, 2]))
                .with_attr("strides", AttrValue::ints(&[1, 1, 2, 2]))
                .with_attr("padding", AttrValue::string("VALID"))
                .with_attr("_output_shapes", AttrValue::shapes(&[&[-1, 8, 15, 15]])),
        ],
    }
}

#[test]
fn test_nchw_graph() {
    let report = netshape::analyze(
        SourceFormat::TensorFlow,
        &nchw_graph().encode_to_vec(),
        None,
        &InferenceConfig::new(),
    )
    .unwrap();

    assert_eq!(report.rows[0].in_channels, 3);
    assert_eq!(report.rows[0].output(), Dimension::new(30, 30, 8));
    assert_eq!(report.rows[1].output(), Dimension::new(30, 30, 8));
    assert_eq!(report.final_output(), Some(Dimension::new(15, 15, 8)));
    assert!(report.notes.is_empty(), "{:?}", report.notes);
}

#[test]
fn test_huge_caffe2_padding_is_an_error() {
    let predict = NetDef {
        op: vec![OperatorDef::new("MaxPool", &["data"], &["pool"])
            .with_arg(Argument::int("kernel", 3))
            .with_arg(Argument::int("pad", i64::MAX))],
        external_input: vec!["data".into()],
        ..Default::default()
    };

    let err = netshape::analyze(
        SourceFormat::Caffe2,
        &predict.encode_to_vec(),
        None,
        &InferenceConfig::new(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::ShapeInference(ShapeInferenceError::Overflow { .. })));
}

#[test]
fn test_huge_tensorflow_input_is_an_error() {
    let graph = GraphDef {
        node: vec![
            NodeDef::new("x", "Placeholder", &[])
                .with_attr("shape", AttrValue::shape(&[-1, 1 << 40, 1 << 40, 3])),
            NodeDef::new("w", "Const", &[]).with_attr("shape", AttrValue::shape(&[3, 10])),
            NodeDef::new("fc", "MatMul", &["x", "w"]),
        ],
    };

    let err = netshape::analyze(
        SourceFormat::TensorFlow,
        &graph.encode_to_vec(),
        None,
        &InferenceConfig::new(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::ShapeInference(ShapeInferenceError::Overflow { quantity: "flattened feature count", .. })
    ));
}
