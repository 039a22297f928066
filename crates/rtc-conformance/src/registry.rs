#![forbid(unsafe_code)]

use crate::HarnessError;
use crate::codec::WireCodec;
use crate::compare::Tolerance;
use crate::shape_check::check_against_descriptor;
use crate::topics::{
    AlignmentCheckTopic, AllPrimitivesAtomicTopic, ArrayFloat64Topic, ArrayInt32Topic,
    ArrayStringTopic, IoTDeviceMutableTopic, OffsetKeyTopic, RobotStateTopic, TopicRecord,
};
use rtc_layout::TypeDescriptor;
use rtc_runtime::{LifecycleLedger, ValidationMode};
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::LazyLock;

/// Owned instance of some registered topic type.
pub struct Sample {
    type_name: &'static str,
    seed: Option<i32>,
    value: Box<dyn Any + Send>,
}

impl Sample {
    #[must_use]
    pub fn new<T: TopicRecord>(value: T) -> Self {
        Self {
            type_name: T::TYPE_NAME,
            seed: None,
            value: Box::new(value),
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Seed of the last fill; `None` for samples produced by a decoder.
    #[must_use]
    pub fn seed(&self) -> Option<i32> {
        self.seed
    }

    #[must_use]
    pub fn downcast_ref<T: TopicRecord>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn downcast_mut<T: TopicRecord>(&mut self) -> Option<&mut T> {
        self.value.downcast_mut::<T>()
    }
}

impl fmt::Debug for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sample")
            .field("type_name", &self.type_name)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

fn typed<T: TopicRecord>(sample: &Sample) -> Result<&T, HarnessError> {
    sample
        .downcast_ref::<T>()
        .ok_or(HarnessError::SampleTypeMismatch {
            expected: T::TYPE_NAME,
            actual: sample.type_name,
        })
}

fn typed_mut<T: TopicRecord>(sample: &mut Sample) -> Result<&mut T, HarnessError> {
    let actual = sample.type_name;
    sample
        .downcast_mut::<T>()
        .ok_or(HarnessError::SampleTypeMismatch {
            expected: T::TYPE_NAME,
            actual,
        })
}

fn alloc_erased<T: TopicRecord>() -> Sample {
    Sample::new(T::default())
}

fn fill_erased<T: TopicRecord>(sample: &mut Sample, seed: i32) -> Result<(), HarnessError> {
    typed_mut::<T>(sample)?.fill(seed);
    sample.seed = Some(seed);
    Ok(())
}

fn validate_erased<T: TopicRecord>(
    sample: &Sample,
    seed: i32,
    mode: ValidationMode,
    tolerance: &Tolerance,
) -> Result<(), HarnessError> {
    typed::<T>(sample)?
        .validate(seed, mode, tolerance)
        .map_err(|mismatch| HarnessError::Validation {
            type_name: T::TYPE_NAME,
            seed,
            mismatch,
        })
}

fn compare_erased<T: TopicRecord>(
    expected: &Sample,
    actual: &Sample,
    tolerance: &Tolerance,
) -> Result<(), HarnessError> {
    typed::<T>(expected)?
        .compare(typed::<T>(actual)?, tolerance)
        .map_err(|mismatch| HarnessError::Comparison {
            type_name: T::TYPE_NAME,
            seed: expected.seed.or(actual.seed),
            mismatch,
        })
}

fn to_value_erased<T: TopicRecord>(sample: &Sample) -> Result<Value, HarnessError> {
    serde_json::to_value(typed::<T>(sample)?).map_err(|err| HarnessError::Codec {
        type_name: T::TYPE_NAME,
        codec: "serde_json",
        stage: "to_value",
        detail: err.to_string(),
    })
}

fn from_value_erased<T: TopicRecord>(value: Value) -> Result<Sample, HarnessError> {
    serde_json::from_value::<T>(value)
        .map(Sample::new)
        .map_err(|err| HarnessError::Codec {
            type_name: T::TYPE_NAME,
            codec: "serde_json",
            stage: "from_value",
            detail: err.to_string(),
        })
}

fn owned_buffers_erased<T: TopicRecord>(sample: &Sample) -> Result<usize, HarnessError> {
    Ok(typed::<T>(sample)?.owned_buffers())
}

/// Per-type entry points, monomorphized once per registered topic.
pub struct TopicHandler {
    name: &'static str,
    size: usize,
    descriptor: TypeDescriptor,
    alloc_fn: fn() -> Sample,
    fill_fn: fn(&mut Sample, i32) -> Result<(), HarnessError>,
    validate_fn: fn(&Sample, i32, ValidationMode, &Tolerance) -> Result<(), HarnessError>,
    compare_fn: fn(&Sample, &Sample, &Tolerance) -> Result<(), HarnessError>,
    to_value_fn: fn(&Sample) -> Result<Value, HarnessError>,
    from_value_fn: fn(Value) -> Result<Sample, HarnessError>,
    owned_buffers_fn: fn(&Sample) -> Result<usize, HarnessError>,
}

impl TopicHandler {
    #[must_use]
    pub fn of<T: TopicRecord>() -> Self {
        Self {
            name: T::TYPE_NAME,
            size: std::mem::size_of::<T>(),
            descriptor: T::descriptor(),
            alloc_fn: alloc_erased::<T>,
            fill_fn: fill_erased::<T>,
            validate_fn: validate_erased::<T>,
            compare_fn: compare_erased::<T>,
            to_value_fn: to_value_erased::<T>,
            from_value_fn: from_value_erased::<T>,
            owned_buffers_fn: owned_buffers_erased::<T>,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// In-memory size of one instance.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Default-initialized storage, recorded in the ledger.
    pub fn alloc(&self, ledger: &mut LifecycleLedger) -> Sample {
        ledger.record_alloc(self.name);
        (self.alloc_fn)()
    }

    /// Overwrites `sample` from `seed` and checks the result against the
    /// descriptor.
    pub fn fill(&self, sample: &mut Sample, seed: i32) -> Result<(), HarnessError> {
        (self.fill_fn)(sample, seed)?;
        let value = (self.to_value_fn)(sample)?;
        check_against_descriptor(&self.descriptor, &value).map_err(|detail| {
            HarnessError::Generation {
                type_name: self.name,
                seed,
                detail,
            }
        })
    }

    /// `alloc` followed by `fill`; the storage is released again when the
    /// fill fails.
    pub fn generate(&self, seed: i32, ledger: &mut LifecycleLedger) -> Result<Sample, HarnessError> {
        let mut sample = self.alloc(ledger);
        match self.fill(&mut sample, seed) {
            Ok(()) => Ok(sample),
            Err(err) => {
                self.release(sample, ledger)?;
                Err(err)
            }
        }
    }

    pub fn validate(
        &self,
        sample: &Sample,
        seed: i32,
        mode: ValidationMode,
        tolerance: &Tolerance,
    ) -> Result<(), HarnessError> {
        (self.validate_fn)(sample, seed, mode, tolerance)
    }

    pub fn compare(
        &self,
        expected: &Sample,
        actual: &Sample,
        tolerance: &Tolerance,
    ) -> Result<(), HarnessError> {
        (self.compare_fn)(expected, actual, tolerance)
    }

    pub fn to_value(&self, sample: &Sample) -> Result<Value, HarnessError> {
        (self.to_value_fn)(sample)
    }

    pub fn encode(&self, sample: &Sample, codec: &dyn WireCodec) -> Result<Vec<u8>, HarnessError> {
        let value = self.to_value(sample)?;
        codec
            .encode(&self.descriptor, &value)
            .map_err(|detail| self.codec_error(codec, "encode", detail))
    }

    /// Decodes into a fresh sample, recorded in the ledger like `alloc`.
    /// The decoded tree must conform to the descriptor before it is
    /// materialized.
    pub fn decode(
        &self,
        bytes: &[u8],
        codec: &dyn WireCodec,
        ledger: &mut LifecycleLedger,
    ) -> Result<Sample, HarnessError> {
        let value = codec
            .decode(&self.descriptor, bytes)
            .map_err(|detail| self.codec_error(codec, "decode", detail))?;
        check_against_descriptor(&self.descriptor, &value)
            .map_err(|detail| self.codec_error(codec, "decode", detail))?;
        let sample = (self.from_value_fn)(value)?;
        ledger.record_alloc(self.name);
        Ok(sample)
    }

    /// Consumes the sample and records the owned buffers it frees.
    pub fn release(&self, sample: Sample, ledger: &mut LifecycleLedger) -> Result<(), HarnessError> {
        let owned_buffers = (self.owned_buffers_fn)(&sample)?;
        ledger.record_release(self.name, owned_buffers);
        drop(sample);
        Ok(())
    }

    fn codec_error(&self, codec: &dyn WireCodec, stage: &'static str, detail: String) -> HarnessError {
        HarnessError::Codec {
            type_name: self.name,
            codec: codec.name(),
            stage,
            detail,
        }
    }
}

impl fmt::Debug for TopicHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopicHandler")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("extensibility", &self.descriptor.extensibility)
            .finish_non_exhaustive()
    }
}

/// Read-only table of topic handlers in registration order.
#[derive(Debug)]
pub struct TopicRegistry {
    handlers: Vec<TopicHandler>,
}

impl TopicRegistry {
    fn builtin() -> Self {
        Self {
            handlers: vec![
                TopicHandler::of::<OffsetKeyTopic>(),
                TopicHandler::of::<RobotStateTopic>(),
                TopicHandler::of::<IoTDeviceMutableTopic>(),
                TopicHandler::of::<AlignmentCheckTopic>(),
                TopicHandler::of::<ArrayInt32Topic>(),
                TopicHandler::of::<ArrayFloat64Topic>(),
                TopicHandler::of::<ArrayStringTopic>(),
                TopicHandler::of::<AllPrimitivesAtomicTopic>(),
            ],
        }
    }

    pub fn lookup(&self, name: &str) -> Result<&TopicHandler, HarnessError> {
        self.handlers
            .iter()
            .find(|handler| handler.name == name)
            .ok_or_else(|| HarnessError::UnknownType {
                name: name.to_string(),
            })
    }

    #[must_use]
    pub fn type_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|handler| handler.name).collect()
    }

    #[must_use]
    pub fn handlers(&self) -> &[TopicHandler] {
        &self.handlers
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

static REGISTRY: LazyLock<TopicRegistry> = LazyLock::new(TopicRegistry::builtin);

#[must_use]
pub fn registry() -> &'static TopicRegistry {
    &REGISTRY
}

pub fn lookup(name: &str) -> Result<&'static TopicHandler, HarnessError> {
    registry().lookup(name)
}
