#![forbid(unsafe_code)]

use crate::HarnessError;
use crate::registry::{Sample, TopicHandler};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}

/// SHA-256 of the sample's canonical JSON (members in sorted order).
pub fn sample_fingerprint(handler: &TopicHandler, sample: &Sample) -> Result<String, HarnessError> {
    let value = handler.to_value(sample)?;
    let bytes = serde_json::to_vec(&value).map_err(|err| HarnessError::Codec {
        type_name: handler.name(),
        codec: "serde_json",
        stage: "fingerprint",
        detail: err.to_string(),
    })?;
    Ok(sha256_hex(&bytes))
}

#[must_use]
pub fn wire_b64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

pub fn decode_wire_b64(encoded: &str) -> Result<Vec<u8>, String> {
    BASE64
        .decode(encoded)
        .map_err(|err| format!("base64 decode failed: {err}"))
}
