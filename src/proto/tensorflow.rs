//! Subset of TensorFlow `graph.proto`, `node_def.proto`, `attr_value.proto`
//! and `tensor_shape.proto` (proto3).

use prost::Message;
use std::collections::BTreeMap;

#[derive(Clone, PartialEq, Message)]
pub struct GraphDef {
    #[prost(message, repeated, tag = "1")]
    pub node: Vec<NodeDef>,
}

#[derive(Clone, PartialEq, Message)]
pub struct NodeDef {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub op: String,
    #[prost(string, repeated, tag = "3")]
    pub input: Vec<String>,
    #[prost(string, tag = "4")]
    pub device: String,
    #[prost(btree_map = "string, message", tag = "5")]
    pub attr: BTreeMap<String, AttrValue>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AttrValue {
    #[prost(oneof = "attr_value::Value", tags = "1, 2, 3, 4, 5, 6, 7, 9")]
    pub value: Option<attr_value::Value>,
}

pub mod attr_value {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Value {
        #[prost(message, tag = "1")]
        List(super::ListValue),
        #[prost(bytes = "vec", tag = "2")]
        S(Vec<u8>),
        #[prost(int64, tag = "3")]
        I(i64),
        #[prost(float, tag = "4")]
        F(f32),
        #[prost(bool, tag = "5")]
        B(bool),
        #[prost(int32, tag = "6")]
        Type(i32),
        #[prost(message, tag = "7")]
        Shape(super::TensorShapeProto),
        #[prost(string, tag = "9")]
        Placeholder(String),
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct ListValue {
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub s: Vec<Vec<u8>>,
    #[prost(int64, repeated, tag = "3")]
    pub i: Vec<i64>,
    #[prost(float, repeated, tag = "4")]
    pub f: Vec<f32>,
    #[prost(bool, repeated, tag = "5")]
    pub b: Vec<bool>,
    #[prost(message, repeated, tag = "7")]
    pub shape: Vec<TensorShapeProto>,
}

#[derive(Clone, PartialEq, Message)]
pub struct TensorShapeProto {
    #[prost(message, repeated, tag = "2")]
    pub dim: Vec<tensor_shape_proto::Dim>,
    #[prost(bool, tag = "3")]
    pub unknown_rank: bool,
}

pub mod tensor_shape_proto {
    use prost::Message;

    #[derive(Clone, PartialEq, Message)]
    pub struct Dim {
        /// -1 for an unknown size.
        #[prost(int64, tag = "1")]
        pub size: i64,
        #[prost(string, tag = "2")]
        pub name: String,
    }
}

impl TensorShapeProto {
    pub fn from_sizes(sizes: &[i64]) -> Self {
        Self {
            dim: sizes
                .iter()
                .map(|&size| tensor_shape_proto::Dim { size, name: String::new() })
                .collect(),
            unknown_rank: false,
        }
    }

    pub fn sizes(&self) -> Vec<i64> {
        self.dim.iter().map(|d| d.size).collect()
    }
}

impl AttrValue {
    pub fn string(value: &str) -> Self {
        Self { value: Some(attr_value::Value::S(value.as_bytes().to_vec())) }
    }

    pub fn bool(value: bool) -> Self {
        Self { value: Some(attr_value::Value::B(value)) }
    }

    pub fn ints(values: &[i64]) -> Self {
        Self {
            value: Some(attr_value::Value::List(ListValue { i: values.to_vec(), ..Default::default() })),
        }
    }

    pub fn shape(sizes: &[i64]) -> Self {
        Self { value: Some(attr_value::Value::Shape(TensorShapeProto::from_sizes(sizes))) }
    }

    pub fn shapes(shapes: &[&[i64]]) -> Self {
        Self {
            value: Some(attr_value::Value::List(ListValue {
                shape: shapes.iter().map(|s| TensorShapeProto::from_sizes(s)).collect(),
                ..Default::default()
            })),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Some(attr_value::Value::S(bytes)) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &self.value {
            Some(attr_value::Value::B(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_ints(&self) -> Option<&[i64]> {
        match &self.value {
            Some(attr_value::Value::List(list)) => Some(&list.i),
            _ => None,
        }
    }

    pub fn as_shape(&self) -> Option<&TensorShapeProto> {
        match &self.value {
            Some(attr_value::Value::Shape(shape)) => Some(shape),
            _ => None,
        }
    }

    pub fn as_shapes(&self) -> Option<&[TensorShapeProto]> {
        match &self.value {
            Some(attr_value::Value::List(list)) => Some(&list.shape),
            _ => None,
        }
    }
}

impl NodeDef {
    pub fn new(name: &str, op: &str, input: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            op: op.to_string(),
            input: input.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, key: &str, value: AttrValue) -> Self {
        self.attr.insert(key.to_string(), value);
        self
    }
}
