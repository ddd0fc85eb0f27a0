//! Value codecs
//!
//! Values are opaque to the backing store and the cache; both only see the
//! bytes a `Codec` produces. Codecs must round-trip every `Value` variant.

use crate::error::{CodecError, CodecResult, ConfigError};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Pluggable serializer for setting values
pub trait Codec: Send + Sync + std::fmt::Debug {
    /// Codec name for logging
    fn name(&self) -> &'static str;

    /// Encode a single value
    fn encode(&self, value: &Value) -> CodecResult<Vec<u8>>;

    /// Decode a single value
    fn decode(&self, bytes: &[u8]) -> CodecResult<Value>;

    /// Encode a whole category mapping
    fn encode_map(&self, map: &BTreeMap<String, Value>) -> CodecResult<Vec<u8>> {
        self.encode(&Value::Map(map.clone()))
    }

    /// Decode a whole category mapping
    fn decode_map(&self, bytes: &[u8]) -> CodecResult<BTreeMap<String, Value>> {
        match self.decode(bytes)? {
            Value::Map(map) => Ok(map),
            other => Err(CodecError::UnexpectedShape {
                expected: "map",
                actual: other.kind(),
            }),
        }
    }

    /// Encode a set of names (used for the cache registry)
    fn encode_names(&self, names: &BTreeSet<String>) -> CodecResult<Vec<u8>> {
        self.encode(&Value::List(
            names.iter().map(|n| Value::String(n.clone())).collect(),
        ))
    }

    /// Decode a set of names. Non-string entries are rejected.
    fn decode_names(&self, bytes: &[u8]) -> CodecResult<BTreeSet<String>> {
        match self.decode(bytes)? {
            Value::List(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(CodecError::UnexpectedShape {
                        expected: "string",
                        actual: other.kind(),
                    }),
                })
                .collect(),
            other => Err(CodecError::UnexpectedShape {
                expected: "list",
                actual: other.kind(),
            }),
        }
    }
}

/// Compact binary encoding (default)
#[derive(Debug, Default, Clone, Copy)]
pub struct BincodeCodec;

impl Codec for BincodeCodec {
    fn name(&self) -> &'static str {
        "bincode"
    }

    fn encode(&self, value: &Value) -> CodecResult<Vec<u8>> {
        Ok(bincode::serialize(value)?)
    }

    fn decode(&self, bytes: &[u8]) -> CodecResult<Value> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Human-readable JSON encoding (externally tagged variants)
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, value: &Value) -> CodecResult<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode(&self, bytes: &[u8]) -> CodecResult<Value> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Codec selection in configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    #[default]
    Bincode,
    Json,
}

impl CodecKind {
    /// Instantiate the selected codec
    #[must_use]
    pub fn build(self) -> Arc<dyn Codec> {
        match self {
            Self::Bincode => Arc::new(BincodeCodec),
            Self::Json => Arc::new(JsonCodec),
        }
    }
}

impl std::str::FromStr for CodecKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bincode" => Ok(Self::Bincode),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::UnknownCodec(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        let mut inner = BTreeMap::new();
        inner.insert("depth".to_string(), Value::Int(-7));
        inner.insert("ratio".to_string(), Value::Float(0.25));
        inner.insert("precise".to_string(), Value::Float(0.123_456_789_012_345_68));
        Value::List(vec![
            Value::Null,
            Value::Bool(false),
            Value::from("dark"),
            Value::Bytes(vec![0, 255, 7]),
            Value::Map(inner),
        ])
    }

    #[test]
    fn test_codecs_preserve_nested_values() {
        let codecs: [Arc<dyn Codec>; 2] = [CodecKind::Bincode.build(), CodecKind::Json.build()];
        for codec in codecs {
            let bytes = codec.encode(&sample()).unwrap();
            assert_eq!(codec.decode(&bytes).unwrap(), sample(), "codec {}", codec.name());
        }
    }

    #[test]
    fn test_codecs_preserve_edge_floats() {
        let floats = [
            1.071_566_039_146_582_6e-75,
            0.1 + 0.2,
            std::f64::consts::PI,
            f64::MAX,
            f64::MIN_POSITIVE,
            5e-324,
            -0.0,
            f64::INFINITY,
            f64::NEG_INFINITY,
        ];
        let codecs: [Arc<dyn Codec>; 2] = [CodecKind::Bincode.build(), CodecKind::Json.build()];
        for codec in codecs {
            for f in floats {
                let bytes = codec.encode(&Value::Float(f)).unwrap();
                let Value::Float(back) = codec.decode(&bytes).unwrap() else {
                    panic!("codec {} changed the variant of {f:e}", codec.name());
                };
                assert_eq!(back.to_bits(), f.to_bits(), "codec {} on {f:e}", codec.name());
            }

            let bytes = codec.encode(&Value::Float(f64::NAN)).unwrap();
            let decoded = codec.decode(&bytes).unwrap();
            assert!(decoded.as_f64().is_some_and(f64::is_nan), "codec {}", codec.name());
        }
    }

    #[test]
    fn test_json_non_finite_floats_are_named() {
        let bytes = JsonCodec.encode(&Value::Float(f64::NEG_INFINITY)).unwrap();
        assert_eq!(bytes, br#"{"Float":"-inf"}"#.to_vec());
        assert!(JsonCodec.decode(br#"{"Float":"huge"}"#).is_err());
    }

    #[test]
    fn test_decode_map_rejects_scalar() {
        let codec = BincodeCodec;
        let bytes = codec.encode(&Value::Int(1)).unwrap();
        let err = codec.decode_map(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::UnexpectedShape { expected: "map", .. }));
    }

    #[test]
    fn test_names() {
        let codec = JsonCodec;
        let names: BTreeSet<String> = ["system", "ui"].iter().map(ToString::to_string).collect();
        let bytes = codec.encode_names(&names).unwrap();
        assert_eq!(codec.decode_names(&bytes).unwrap(), names);

        let bytes = codec.encode(&Value::List(vec![Value::Int(1)])).unwrap();
        assert!(codec.decode_names(&bytes).is_err());
    }

    #[test]
    fn test_garbage_fails_to_decode() {
        assert!(JsonCodec.decode(b"{not json").is_err());
        assert!(BincodeCodec.decode(&[0xff, 0xff, 0xff, 0xff, 0xff]).is_err());
    }

    #[test]
    fn test_codec_kind_parse() {
        assert_eq!("JSON".parse::<CodecKind>().unwrap(), CodecKind::Json);
        assert!("yaml".parse::<CodecKind>().is_err());
    }
}
