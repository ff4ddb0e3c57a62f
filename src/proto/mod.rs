//! Protobuf message definitions for the graph formats.
//!
//! Only the fields the adapters read are declared; prost skips the rest when
//! decoding. Tags follow the upstream `.proto` files.

pub mod caffe2;
pub mod tensorflow;
