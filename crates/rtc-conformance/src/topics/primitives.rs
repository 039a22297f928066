#![forbid(unsafe_code)]

use super::{TopicRecord, letter_for, seed_mod};
use crate::compare::{Mismatch, StructuralEq, Tolerance, field};
use rtc_layout::{Extensibility, FieldDescriptor, ScalarKind, TypeDescriptor};
use serde::{Deserialize, Serialize};

/// One field of every primitive kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllPrimitivesAtomicTopic {
    pub id: i32,
    pub bool_field: bool,
    pub char_field: u8,
    pub octet_field: u8,
    pub short_field: i16,
    pub ushort_field: u16,
    pub long_field: i32,
    pub ulong_field: u32,
    pub llong_field: i64,
    pub ullong_field: u64,
    pub float_field: f32,
    pub double_field: f64,
}

impl TopicRecord for AllPrimitivesAtomicTopic {
    const TYPE_NAME: &'static str = "AtomicTests::AllPrimitivesAtomicTopic";

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new(
            Self::TYPE_NAME,
            Extensibility::Appendable,
            vec![
                FieldDescriptor::scalar("id", ScalarKind::Int32).key(),
                FieldDescriptor::scalar("bool_field", ScalarKind::Bool),
                FieldDescriptor::scalar("char_field", ScalarKind::Char),
                FieldDescriptor::scalar("octet_field", ScalarKind::Octet),
                FieldDescriptor::scalar("short_field", ScalarKind::Int16),
                FieldDescriptor::scalar("ushort_field", ScalarKind::UInt16),
                FieldDescriptor::scalar("long_field", ScalarKind::Int32),
                FieldDescriptor::scalar("ulong_field", ScalarKind::UInt32),
                FieldDescriptor::scalar("llong_field", ScalarKind::Int64),
                FieldDescriptor::scalar("ullong_field", ScalarKind::UInt64),
                FieldDescriptor::scalar("float_field", ScalarKind::Float32),
                FieldDescriptor::scalar("double_field", ScalarKind::Float64),
            ],
        )
    }

    // Narrowing casts keep the low bits of the wrapped product.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn from_seed(seed: i32) -> Self {
        Self {
            id: seed,
            bool_field: seed_mod(seed, 2) == 0,
            char_field: letter_for(seed),
            octet_field: (seed & 0xFF) as u8,
            short_field: seed.wrapping_mul(2) as i16,
            ushort_field: seed.wrapping_mul(3) as u16,
            long_field: seed.wrapping_mul(4),
            ulong_field: seed.wrapping_mul(5) as u32,
            llong_field: i64::from(seed.wrapping_mul(6)),
            ullong_field: seed.wrapping_mul(7) as i64 as u64,
            float_field: seed as f32 * 8.0,
            double_field: f64::from(seed) * 9.0,
        }
    }

    /// Every field is load-bearing for this scenario.
    fn validate_minimal(&self, seed: i32, tolerance: &Tolerance) -> Result<(), Mismatch> {
        Self::from_seed(seed).structural_eq(self, "", tolerance)
    }

    fn owned_buffers(&self) -> usize {
        0
    }
}

impl StructuralEq for AllPrimitivesAtomicTopic {
    fn structural_eq(&self, other: &Self, path: &str, tolerance: &Tolerance) -> Result<(), Mismatch> {
        field(path, "id", &self.id, &other.id, tolerance)?;
        field(path, "bool_field", &self.bool_field, &other.bool_field, tolerance)?;
        field(path, "char_field", &self.char_field, &other.char_field, tolerance)?;
        field(path, "octet_field", &self.octet_field, &other.octet_field, tolerance)?;
        field(path, "short_field", &self.short_field, &other.short_field, tolerance)?;
        field(path, "ushort_field", &self.ushort_field, &other.ushort_field, tolerance)?;
        field(path, "long_field", &self.long_field, &other.long_field, tolerance)?;
        field(path, "ulong_field", &self.ulong_field, &other.ulong_field, tolerance)?;
        field(path, "llong_field", &self.llong_field, &other.llong_field, tolerance)?;
        field(path, "ullong_field", &self.ullong_field, &other.ullong_field, tolerance)?;
        field(path, "float_field", &self.float_field, &other.float_field, tolerance)?;
        field(path, "double_field", &self.double_field, &other.double_field, tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::AllPrimitivesAtomicTopic;
    use crate::compare::Tolerance;
    use crate::topics::TopicRecord;
    use rtc_runtime::ValidationMode;

    #[test]
    fn primitives_follow_seed_multiples() {
        let topic = AllPrimitivesAtomicTopic::from_seed(10);
        assert!(topic.bool_field);
        assert_eq!(topic.char_field, b'K');
        assert_eq!(topic.octet_field, 10);
        assert_eq!(topic.short_field, 20);
        assert_eq!(topic.ushort_field, 30);
        assert_eq!(topic.long_field, 40);
        assert_eq!(topic.ulong_field, 50);
        assert_eq!(topic.llong_field, 60);
        assert_eq!(topic.ullong_field, 70);
        assert_eq!(topic.float_field, 80.0);
        assert_eq!(topic.double_field, 90.0);
    }

    #[test]
    fn narrowing_wraps_instead_of_panicking() {
        let topic = AllPrimitivesAtomicTopic::from_seed(20_000);
        assert_eq!(topic.short_field, 40_000u32 as i16);
        assert_eq!(topic.octet_field, (20_000 & 0xFF) as u8);
        let negative = AllPrimitivesAtomicTopic::from_seed(-1);
        assert_eq!(negative.ushort_field, u16::MAX - 2);
        assert_eq!(negative.ullong_field, u64::MAX - 6);
    }

    #[test]
    fn wide_fields_wrap_in_32_bits_before_widening() {
        let topic = AllPrimitivesAtomicTopic::from_seed(400_000_000);
        assert_eq!(topic.llong_field, -1_894_967_296);
        assert_eq!(topic.ullong_field, (-1_494_967_296_i64) as u64);
        assert_eq!(topic.long_field, 1_600_000_000);
    }

    #[test]
    fn minimal_mode_checks_every_field() {
        let tol = Tolerance::default();
        let mut topic = AllPrimitivesAtomicTopic::from_seed(5);
        topic.ulong_field += 1;
        let err = topic
            .validate(5, ValidationMode::Minimal, &tol)
            .expect_err("ulong differs");
        assert_eq!(err.path, "ulong_field");
        assert_eq!(err.expected, "25");
    }
}
