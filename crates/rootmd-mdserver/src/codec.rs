//! Deterministic record codec
//!
//! Signatures and content hashes are computed over encoded bytes, so the
//! encoding must be canonical: the same value always produces the same bytes.
//! DAG-CBOR gives that (sorted map keys, shortest integer forms).

use crate::error::CodecError;
use serde::{de::DeserializeOwned, Serialize};

/// Encode/decode of structured records to and from bytes
pub trait Codec: Send + Sync {
    /// Encode a value to bytes
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    /// Decode bytes into a value
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError>;
}

/// DAG-CBOR codec
#[derive(Clone, Copy, Debug, Default)]
pub struct DagCborCodec;

impl Codec for DagCborCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_ipld_dagcbor::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        serde_ipld_dagcbor::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
    struct Sample {
        name: String,
        value: u64,
        #[serde(with = "serde_bytes")]
        blob: Vec<u8>,
    }

    #[test]
    fn test_decode_returns_encoded_value() {
        let codec = DagCborCodec;
        let sample = Sample {
            name: "root".to_string(),
            value: 42,
            blob: vec![1, 2, 3],
        };

        let bytes = codec.encode(&sample).unwrap();
        let decoded: Sample = codec.decode(&bytes).unwrap();
        assert_eq!(sample, decoded);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let codec = DagCborCodec;
        let mut a = BTreeMap::new();
        a.insert("zeta", 1u8);
        a.insert("alpha", 2u8);
        let mut b = BTreeMap::new();
        b.insert("alpha", 2u8);
        b.insert("zeta", 1u8);

        assert_eq!(codec.encode(&a).unwrap(), codec.encode(&b).unwrap());
    }

    #[test]
    fn test_decode_garbage_fails() {
        let codec = DagCborCodec;
        let result: Result<Sample, _> = codec.decode(&[0xff, 0x00, 0x13]);
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }
}
