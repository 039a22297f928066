#![forbid(unsafe_code)]

use serde::Serialize;
use std::fmt;

pub const DEFAULT_F64_TOLERANCE: f64 = 1e-4;
pub const DEFAULT_F32_TOLERANCE: f32 = 1e-2;

/// Absolute tolerances applied to floating-point fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tolerance {
    pub f32_abs: f32,
    pub f64_abs: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            f32_abs: DEFAULT_F32_TOLERANCE,
            f64_abs: DEFAULT_F64_TOLERANCE,
        }
    }
}

/// First disagreement found between two values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub path: String,
    pub expected: String,
    pub actual: String,
    /// Offending element for strings and sequences.
    pub index: Option<usize>,
}

impl Mismatch {
    pub fn new(
        path: impl Into<String>,
        expected: impl fmt::Display,
        actual: impl fmt::Display,
    ) -> Self {
        Self {
            path: path.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
            index: None,
        }
    }

    #[must_use]
    pub fn at_index(mut self, index: usize) -> Self {
        self.index.get_or_insert(index);
        self
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected={} actual={}",
            self.path, self.expected, self.actual
        )?;
        if let Some(index) = self.index {
            write!(f, " index={index}")?;
        }
        Ok(())
    }
}

/// Round-trip equivalence: `self` is the expected side, `other` the
/// observed side.
pub trait StructuralEq {
    fn structural_eq(&self, other: &Self, path: &str, tolerance: &Tolerance)
    -> Result<(), Mismatch>;
}

#[must_use]
pub fn child_path(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_string()
    } else {
        format!("{parent}.{field}")
    }
}

/// Compares one named member of a record.
pub fn field<T: StructuralEq + ?Sized>(
    parent: &str,
    name: &str,
    expected: &T,
    actual: &T,
    tolerance: &Tolerance,
) -> Result<(), Mismatch> {
    expected.structural_eq(actual, &child_path(parent, name), tolerance)
}

macro_rules! exact_structural_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl StructuralEq for $ty {
                fn structural_eq(
                    &self,
                    other: &Self,
                    path: &str,
                    _tolerance: &Tolerance,
                ) -> Result<(), Mismatch> {
                    if self == other {
                        Ok(())
                    } else {
                        Err(Mismatch::new(path, self, other))
                    }
                }
            }
        )*
    };
}

exact_structural_eq!(bool, i8, i16, i32, i64, u8, u16, u32, u64);

#[must_use]
pub fn f64_within(expected: f64, actual: f64, tolerance: f64) -> bool {
    if expected.is_nan() || actual.is_nan() {
        return expected.is_nan() && actual.is_nan();
    }
    expected == actual || (expected - actual).abs() <= tolerance
}

#[must_use]
pub fn f32_within(expected: f32, actual: f32, tolerance: f32) -> bool {
    if expected.is_nan() || actual.is_nan() {
        return expected.is_nan() && actual.is_nan();
    }
    expected == actual || (expected - actual).abs() <= tolerance
}

impl StructuralEq for f64 {
    fn structural_eq(
        &self,
        other: &Self,
        path: &str,
        tolerance: &Tolerance,
    ) -> Result<(), Mismatch> {
        if f64_within(*self, *other, tolerance.f64_abs) {
            Ok(())
        } else {
            Err(Mismatch::new(path, self, other))
        }
    }
}

impl StructuralEq for f32 {
    fn structural_eq(
        &self,
        other: &Self,
        path: &str,
        tolerance: &Tolerance,
    ) -> Result<(), Mismatch> {
        if f32_within(*self, *other, tolerance.f32_abs) {
            Ok(())
        } else {
            Err(Mismatch::new(path, self, other))
        }
    }
}

impl StructuralEq for str {
    fn structural_eq(
        &self,
        other: &Self,
        path: &str,
        _tolerance: &Tolerance,
    ) -> Result<(), Mismatch> {
        if self.len() != other.len() {
            return Err(Mismatch::new(
                format!("{path}.length"),
                format!("{} ({self:?})", self.len()),
                format!("{} ({other:?})", other.len()),
            ));
        }
        for (idx, (lhs, rhs)) in self.chars().zip(other.chars()).enumerate() {
            if lhs != rhs {
                return Err(
                    Mismatch::new(format!("{path}[{idx}]"), format!("{lhs:?}"), format!("{rhs:?}"))
                        .at_index(idx),
                );
            }
        }
        Ok(())
    }
}

impl StructuralEq for String {
    fn structural_eq(
        &self,
        other: &Self,
        path: &str,
        tolerance: &Tolerance,
    ) -> Result<(), Mismatch> {
        self.as_str().structural_eq(other.as_str(), path, tolerance)
    }
}

impl<T: StructuralEq> StructuralEq for [T] {
    fn structural_eq(
        &self,
        other: &Self,
        path: &str,
        tolerance: &Tolerance,
    ) -> Result<(), Mismatch> {
        if self.len() != other.len() {
            return Err(Mismatch::new(
                format!("{path}.length"),
                self.len(),
                other.len(),
            ));
        }
        for (idx, (lhs, rhs)) in self.iter().zip(other).enumerate() {
            lhs.structural_eq(rhs, &format!("{path}[{idx}]"), tolerance)
                .map_err(|mismatch| mismatch.at_index(idx))?;
        }
        Ok(())
    }
}

impl<T: StructuralEq> StructuralEq for Vec<T> {
    fn structural_eq(
        &self,
        other: &Self,
        path: &str,
        tolerance: &Tolerance,
    ) -> Result<(), Mismatch> {
        self.as_slice()
            .structural_eq(other.as_slice(), path, tolerance)
    }
}

impl<T: StructuralEq, const N: usize> StructuralEq for [T; N] {
    fn structural_eq(
        &self,
        other: &Self,
        path: &str,
        tolerance: &Tolerance,
    ) -> Result<(), Mismatch> {
        self.as_slice()
            .structural_eq(other.as_slice(), path, tolerance)
    }
}

impl<T: StructuralEq> StructuralEq for Option<T> {
    fn structural_eq(
        &self,
        other: &Self,
        path: &str,
        tolerance: &Tolerance,
    ) -> Result<(), Mismatch> {
        match (self, other) {
            (None, None) => Ok(()),
            (Some(lhs), Some(rhs)) => lhs.structural_eq(rhs, path, tolerance),
            (Some(_), None) => Err(Mismatch::new(path, "present", "absent")),
            (None, Some(_)) => Err(Mismatch::new(path, "absent", "present")),
        }
    }
}

impl<T: StructuralEq + ?Sized> StructuralEq for Box<T> {
    fn structural_eq(
        &self,
        other: &Self,
        path: &str,
        tolerance: &Tolerance,
    ) -> Result<(), Mismatch> {
        (**self).structural_eq(&**other, path, tolerance)
    }
}
