//! Subset of `caffe2/proto/caffe2.proto` (proto2).

use prost::Message;

#[derive(Clone, PartialEq, Message)]
pub struct Argument {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(float, optional, tag = "2")]
    pub f: Option<f32>,
    #[prost(int64, optional, tag = "3")]
    pub i: Option<i64>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub s: Option<Vec<u8>>,
    #[prost(float, repeated, packed = "false", tag = "5")]
    pub floats: Vec<f32>,
    #[prost(int64, repeated, packed = "false", tag = "6")]
    pub ints: Vec<i64>,
    #[prost(bytes = "vec", repeated, tag = "7")]
    pub strings: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub struct OperatorDef {
    #[prost(string, repeated, tag = "1")]
    pub input: Vec<String>,
    #[prost(string, repeated, tag = "2")]
    pub output: Vec<String>,
    #[prost(string, optional, tag = "3")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub r#type: Option<String>,
    #[prost(message, repeated, tag = "5")]
    pub arg: Vec<Argument>,
}

#[derive(Clone, PartialEq, Message)]
pub struct NetDef {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(message, repeated, tag = "2")]
    pub op: Vec<OperatorDef>,
    #[prost(string, optional, tag = "3")]
    pub r#type: Option<String>,
    #[prost(message, repeated, tag = "6")]
    pub arg: Vec<Argument>,
    #[prost(string, repeated, tag = "7")]
    pub external_input: Vec<String>,
    #[prost(string, repeated, tag = "8")]
    pub external_output: Vec<String>,
}

impl Argument {
    pub fn int(name: &str, value: i64) -> Self {
        Self { name: Some(name.to_string()), i: Some(value), ..Default::default() }
    }

    pub fn ints(name: &str, values: impl IntoIterator<Item = i64>) -> Self {
        Self {
            name: Some(name.to_string()),
            ints: values.into_iter().collect(),
            ..Default::default()
        }
    }
}

impl OperatorDef {
    pub fn new(op_type: &str, input: &[&str], output: &[&str]) -> Self {
        Self {
            input: input.iter().map(|s| s.to_string()).collect(),
            output: output.iter().map(|s| s.to_string()).collect(),
            r#type: Some(op_type.to_string()),
            ..Default::default()
        }
    }

    pub fn with_arg(mut self, arg: Argument) -> Self {
        self.arg.push(arg);
        self
    }

    /// First argument with the given name.
    pub fn find_arg(&self, name: &str) -> Option<&Argument> {
        self.arg.iter().find(|a| a.name.as_deref() == Some(name))
    }
}
