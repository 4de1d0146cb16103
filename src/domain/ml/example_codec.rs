//! `tensorflow.Example` wire format.
//!
//! Message definitions follow `tensorflow/core/example/example.proto` and
//! `feature.proto` field for field, so bytes produced here are accepted by any
//! serving graph that parses examples.

use crate::domain::errors::BackendError;
use crate::domain::ml::feature_record::{FeatureRecord, FeatureValue};
use prost::Message;
use std::collections::HashMap;

#[derive(Clone, PartialEq, Message)]
pub struct Example {
    #[prost(message, optional, tag = "1")]
    pub features: Option<Features>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Features {
    #[prost(map = "string, message", tag = "1")]
    pub feature: HashMap<String, Feature>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Feature {
    #[prost(oneof = "feature::Kind", tags = "1, 2, 3")]
    pub kind: Option<feature::Kind>,
}

pub mod feature {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "1")]
        BytesList(super::BytesList),
        #[prost(message, tag = "2")]
        FloatList(super::FloatList),
        #[prost(message, tag = "3")]
        Int64List(super::Int64List),
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct BytesList {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub value: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub struct FloatList {
    #[prost(float, repeated, tag = "1")]
    pub value: Vec<f32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Int64List {
    #[prost(int64, repeated, tag = "1")]
    pub value: Vec<i64>,
}

impl Feature {
    fn from_value(value: &FeatureValue) -> Self {
        let kind = match value {
            FeatureValue::String(bytes) => feature::Kind::BytesList(BytesList {
                value: vec![bytes.clone()],
            }),
            FeatureValue::Float(values) => feature::Kind::FloatList(FloatList {
                value: values.clone(),
            }),
        };
        Self { kind: Some(kind) }
    }
}

impl Example {
    /// Looks up a feature by name.
    pub fn feature(&self, name: &str) -> Option<&feature::Kind> {
        self.features
            .as_ref()
            .and_then(|f| f.feature.get(name))
            .and_then(|f| f.kind.as_ref())
    }
}

pub fn to_example(record: &FeatureRecord) -> Example {
    let feature = record
        .iter()
        .map(|(name, value)| (name.to_string(), Feature::from_value(value)))
        .collect();

    Example {
        features: Some(Features { feature }),
    }
}

/// Serializes a record into example bytes.
pub fn serialize(record: &FeatureRecord) -> Result<Vec<u8>, BackendError> {
    let example = to_example(record);
    let mut buf = Vec::with_capacity(example.encoded_len());
    example
        .encode(&mut buf)
        .map_err(|e| BackendError::Serialization {
            reason: e.to_string(),
        })?;
    Ok(buf)
}

pub fn deserialize(bytes: &[u8]) -> Result<Example, BackendError> {
    Example::decode(bytes).map_err(|e| BackendError::Deserialization {
        reason: e.to_string(),
    })
}
