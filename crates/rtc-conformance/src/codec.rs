#![forbid(unsafe_code)]

use rtc_layout::TypeDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Serialization boundary under test. The harness hands the codec the
/// descriptor together with a self-describing value tree of the instance.
pub trait WireCodec {
    fn name(&self) -> &'static str;

    fn encode(&self, descriptor: &TypeDescriptor, value: &Value) -> Result<Vec<u8>, String>;

    fn decode(&self, descriptor: &TypeDescriptor, bytes: &[u8]) -> Result<Value, String>;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoopbackFrame {
    type_name: String,
    extensibility: String,
    payload: Value,
}

/// Reference codec: a JSON frame tagged with the type name and
/// extensibility kind it was encoded for.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLoopbackCodec;

impl WireCodec for JsonLoopbackCodec {
    fn name(&self) -> &'static str {
        "json_loopback"
    }

    fn encode(&self, descriptor: &TypeDescriptor, value: &Value) -> Result<Vec<u8>, String> {
        let frame = LoopbackFrame {
            type_name: descriptor.type_name.to_string(),
            extensibility: descriptor.extensibility.name().to_string(),
            payload: value.clone(),
        };
        serde_json::to_vec(&frame).map_err(|err| format!("failed encoding frame: {err}"))
    }

    fn decode(&self, descriptor: &TypeDescriptor, bytes: &[u8]) -> Result<Value, String> {
        let frame: LoopbackFrame =
            serde_json::from_slice(bytes).map_err(|err| format!("invalid frame: {err}"))?;
        if frame.type_name != descriptor.type_name {
            return Err(format!(
                "frame type mismatch expected={} actual={}",
                descriptor.type_name, frame.type_name
            ));
        }
        if frame.extensibility != descriptor.extensibility.name() {
            return Err(format!(
                "frame extensibility mismatch expected={} actual={}",
                descriptor.extensibility.name(),
                frame.extensibility
            ));
        }
        Ok(frame.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::{JsonLoopbackCodec, WireCodec};
    use crate::topics::{AlignmentCheckTopic, ArrayInt32Topic, TopicRecord};
    use serde_json::json;

    #[test]
    fn loopback_preserves_payload() {
        let codec = JsonLoopbackCodec;
        let descriptor = AlignmentCheckTopic::descriptor();
        let value = serde_json::to_value(AlignmentCheckTopic::from_seed(7)).expect("serialize");
        let bytes = codec.encode(&descriptor, &value).expect("encode");
        assert_eq!(codec.decode(&descriptor, &bytes).expect("decode"), value);
    }

    #[test]
    fn decode_rejects_foreign_frames() {
        let codec = JsonLoopbackCodec;
        let bytes = codec
            .encode(&AlignmentCheckTopic::descriptor(), &json!({"id": 1}))
            .expect("encode");
        let err = codec
            .decode(&ArrayInt32Topic::descriptor(), &bytes)
            .expect_err("type differs");
        assert!(err.starts_with("frame type mismatch"), "{err}");

        let err = codec
            .decode(&ArrayInt32Topic::descriptor(), b"{\"type_name\":1")
            .expect_err("truncated");
        assert!(err.starts_with("invalid frame"), "{err}");
    }
}
