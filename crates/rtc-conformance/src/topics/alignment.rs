#![forbid(unsafe_code)]

use super::{
    TopicRecord, expect_close, expect_eq, letter_for, seed_at, seed_len, seed_mod, seed_rem,
};
use crate::compare::{Mismatch, StructuralEq, Tolerance, field};
use rtc_layout::{Extensibility, FieldDescriptor, FieldShape, ScalarKind, TypeDescriptor};
use serde::{Deserialize, Serialize};

const D1_SCALE: f64 = 1.234_567_89;
const D1_TOLERANCE: f64 = 1e-6;
const CHECK_VALUE_SCALE: u64 = 123_456_789;

/// Mixed 1/2/4/8-byte scalars with a trailing u64 after variable data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignmentCheckTopic {
    pub id: i32,
    pub b1: u8,
    pub d1: f64,
    pub s1: i16,
    pub c1: u8,
    pub l1: i32,
    pub blob: Vec<u8>,
    pub check_value: u64,
}

impl TopicRecord for AlignmentCheckTopic {
    const TYPE_NAME: &'static str = "AtomicTests::AlignmentCheckTopic";

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new(
            Self::TYPE_NAME,
            Extensibility::Final,
            vec![
                FieldDescriptor::scalar("id", ScalarKind::Int32).key(),
                FieldDescriptor::scalar("b1", ScalarKind::Octet),
                FieldDescriptor::scalar("d1", ScalarKind::Float64),
                FieldDescriptor::scalar("s1", ScalarKind::Int16),
                FieldDescriptor::scalar("c1", ScalarKind::Char),
                FieldDescriptor::scalar("l1", ScalarKind::Int32),
                FieldDescriptor::new(
                    "blob",
                    FieldShape::sequence(FieldShape::Scalar(ScalarKind::Octet), None),
                ),
                FieldDescriptor::scalar("check_value", ScalarKind::UInt64),
            ],
        )
    }

    fn from_seed(seed: i32) -> Self {
        let blob = (0..seed_len(seed, 5, 10))
            .map(|i| low_byte(seed_at(seed, i)))
            .collect();
        Self {
            id: seed,
            b1: low_byte(seed),
            d1: f64::from(seed) * D1_SCALE,
            s1: short_for(seed),
            c1: letter_for(seed),
            l1: seed.wrapping_mul(1000),
            blob,
            check_value: check_value_for(seed),
        }
    }

    fn validate_minimal(&self, seed: i32, _tolerance: &Tolerance) -> Result<(), Mismatch> {
        expect_eq("id", seed, self.id)?;
        expect_eq("b1", low_byte(seed), self.b1)?;
        expect_close("d1", f64::from(seed) * D1_SCALE, self.d1, D1_TOLERANCE)?;
        expect_eq("s1", short_for(seed), self.s1)?;
        expect_eq("c1", char::from(letter_for(seed)), char::from(self.c1))?;
        expect_eq("l1", seed.wrapping_mul(1000), self.l1)?;
        expect_eq("check_value", check_value_for(seed), self.check_value)
    }

    fn owned_buffers(&self) -> usize {
        1
    }
}

fn low_byte(value: i32) -> u8 {
    u8::try_from(seed_mod(value, 256)).unwrap_or_default()
}

fn short_for(seed: i32) -> i16 {
    i16::try_from(seed_rem(seed, 30_000)).unwrap_or_default()
}

fn check_value_for(seed: i32) -> u64 {
    (seed as u64).wrapping_mul(CHECK_VALUE_SCALE)
}

impl StructuralEq for AlignmentCheckTopic {
    fn structural_eq(&self, other: &Self, path: &str, tolerance: &Tolerance) -> Result<(), Mismatch> {
        field(path, "id", &self.id, &other.id, tolerance)?;
        field(path, "b1", &self.b1, &other.b1, tolerance)?;
        field(path, "d1", &self.d1, &other.d1, tolerance)?;
        field(path, "s1", &self.s1, &other.s1, tolerance)?;
        field(path, "c1", &self.c1, &other.c1, tolerance)?;
        field(path, "l1", &self.l1, &other.l1, tolerance)?;
        field(path, "blob", &self.blob, &other.blob, tolerance)?;
        field(path, "check_value", &self.check_value, &other.check_value, tolerance)
    }
}
