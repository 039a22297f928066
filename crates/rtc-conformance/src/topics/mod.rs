#![forbid(unsafe_code)]

//! Registered topic records and their seed-driven behavior.

mod alignment;
mod arrays;
mod iot_device;
mod offset_key;
mod primitives;
mod robot_state;

pub use alignment::AlignmentCheckTopic;
pub use arrays::{ArrayFloat64Topic, ArrayInt32Topic, ArrayStringTopic};
pub use iot_device::IoTDeviceMutableTopic;
pub use offset_key::OffsetKeyTopic;
pub use primitives::AllPrimitivesAtomicTopic;
pub use robot_state::RobotStateTopic;

use crate::compare::{Mismatch, StructuralEq, Tolerance, f64_within};
use rtc_layout::TypeDescriptor;
use rtc_runtime::ValidationMode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// A topic type the harness can generate, check and round-trip.
///
/// `from_seed` is the generator; every other operation is derived from it
/// or from the structural comparator.
pub trait TopicRecord:
    StructuralEq + Default + Clone + fmt::Debug + Serialize + DeserializeOwned + Send + 'static
{
    const TYPE_NAME: &'static str;

    fn descriptor() -> TypeDescriptor;

    fn from_seed(seed: i32) -> Self;

    /// Key fields plus the fields the scenario treats as load-bearing.
    fn validate_minimal(&self, seed: i32, tolerance: &Tolerance) -> Result<(), Mismatch>;

    /// Out-of-line buffers this instance owns: strings, sequences, present
    /// optionals and string union payloads.
    fn owned_buffers(&self) -> usize;

    /// Overwrites every field; prior contents are never read.
    fn fill(&mut self, seed: i32) {
        *self = Self::from_seed(seed);
    }

    fn validate(
        &self,
        seed: i32,
        mode: ValidationMode,
        tolerance: &Tolerance,
    ) -> Result<(), Mismatch> {
        self.validate_minimal(seed, tolerance)?;
        match mode {
            ValidationMode::Minimal => Ok(()),
            ValidationMode::Full => Self::from_seed(seed).compare(self, tolerance),
        }
    }

    fn compare(&self, other: &Self, tolerance: &Tolerance) -> Result<(), Mismatch> {
        self.structural_eq(other, "", tolerance)
    }
}

/// `seed % modulus` with a non-negative result. Used where the value picks
/// a length, an ordinal or a presence flag.
pub(crate) const fn seed_mod(seed: i32, modulus: i32) -> i32 {
    seed.rem_euclid(modulus)
}

/// Truncating `seed % modulus`; negative seeds give negative values, as the
/// peer generators produce them.
pub(crate) const fn seed_rem(seed: i32, modulus: i32) -> i32 {
    seed % modulus
}

/// Length of a seed-sized collection: `base + seed % range`.
pub(crate) fn seed_len(seed: i32, base: usize, range: i32) -> usize {
    base + usize::try_from(seed_mod(seed, range)).unwrap_or_default()
}

/// Element `i` of a seed-indexed collection sees `seed + i`.
pub(crate) fn seed_at(seed: i32, index: usize) -> i32 {
    seed.wrapping_add(i32::try_from(index).unwrap_or(i32::MAX))
}

pub(crate) fn expect_eq<T>(path: &str, expected: T, actual: T) -> Result<(), Mismatch>
where
    T: PartialEq + fmt::Display,
{
    if expected == actual {
        Ok(())
    } else {
        Err(Mismatch::new(path, expected, actual))
    }
}

pub(crate) fn expect_close(path: &str, expected: f64, actual: f64, tolerance: f64) -> Result<(), Mismatch> {
    if f64_within(expected, actual, tolerance) {
        Ok(())
    } else {
        Err(Mismatch::new(path, expected, actual))
    }
}

/// Truncates to at most `bound` bytes on a character boundary.
pub(crate) fn bounded(mut text: String, bound: usize) -> String {
    if text.len() > bound {
        let mut cut = bound;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }
    text
}

pub(crate) fn letter_for(seed: i32) -> u8 {
    u8::try_from(i32::from(b'A') + seed_rem(seed, 26)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{bounded, letter_for, seed_len, seed_mod, seed_rem};

    #[test]
    fn sizing_arithmetic_is_euclidean() {
        assert_eq!(seed_mod(7, 5), 2);
        assert_eq!(seed_mod(-3, 5), 2);
        assert_eq!(seed_len(-1, 3, 5), 7);
        assert_eq!(letter_for(7), b'H');
    }

    #[test]
    fn plain_values_truncate_toward_zero() {
        assert_eq!(seed_rem(-1, 100), -1);
        assert_eq!(seed_rem(-1234, 1000), -234);
        assert_eq!(seed_rem(i32::MIN, 30_000), -23_648);
        assert_eq!(letter_for(-1), b'@');
        assert_eq!(letter_for(-25), b'(');
    }

    #[test]
    fn bounded_truncates_by_bytes() {
        assert_eq!(bounded("S_1234567890_2".to_string(), 16), "S_1234567890_2");
        assert_eq!(bounded("S_-2147483648_2".to_string(), 8), "S_-21474");
        assert_eq!(bounded("abc\u{e9}".to_string(), 4), "abc");
    }
}
