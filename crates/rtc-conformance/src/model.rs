#![forbid(unsafe_code)]

//! Nested types shared by several topics.

use crate::compare::{Mismatch, StructuralEq, Tolerance, child_path, field};
use rtc_layout::{FieldDescriptor, FieldShape, ScalarKind, StructDescriptor, UnionCase, UnionDescriptor};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    #[must_use]
    pub fn shape() -> FieldShape {
        FieldShape::Struct(StructDescriptor {
            name: "AtomicTests::Point2D",
            fields: vec![
                FieldDescriptor::scalar("x", ScalarKind::Float64),
                FieldDescriptor::scalar("y", ScalarKind::Float64),
            ],
        })
    }
}

impl StructuralEq for Point2D {
    fn structural_eq(&self, other: &Self, path: &str, tolerance: &Tolerance) -> Result<(), Mismatch> {
        field(path, "x", &self.x, &other.x, tolerance)?;
        field(path, "y", &self.y, &other.y, tolerance)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    #[must_use]
    pub fn shape() -> FieldShape {
        FieldShape::Struct(StructDescriptor {
            name: "AtomicTests::Point3D",
            fields: vec![
                FieldDescriptor::scalar("x", ScalarKind::Float64),
                FieldDescriptor::scalar("y", ScalarKind::Float64),
                FieldDescriptor::scalar("z", ScalarKind::Float64),
            ],
        })
    }

    /// `(seed * sx, seed * sy, seed * sz)`
    #[must_use]
    pub fn scaled(seed: i32, sx: f64, sy: f64, sz: f64) -> Self {
        let base = f64::from(seed);
        Self {
            x: base * sx,
            y: base * sy,
            z: base * sz,
        }
    }
}

impl StructuralEq for Point3D {
    fn structural_eq(&self, other: &Self, path: &str, tolerance: &Tolerance) -> Result<(), Mismatch> {
        field(path, "x", &self.x, &other.x, tolerance)?;
        field(path, "y", &self.y, &other.y, tolerance)?;
        field(path, "z", &self.z, &other.z, tolerance)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub count: i32,
    pub center: Point3D,
    pub radius: f64,
}

impl Container {
    #[must_use]
    pub fn shape() -> FieldShape {
        FieldShape::Struct(StructDescriptor {
            name: "AtomicTests::Container",
            fields: vec![
                FieldDescriptor::scalar("count", ScalarKind::Int32),
                FieldDescriptor::new("center", Point3D::shape()),
                FieldDescriptor::scalar("radius", ScalarKind::Float64),
            ],
        })
    }
}

impl StructuralEq for Container {
    fn structural_eq(&self, other: &Self, path: &str, tolerance: &Tolerance) -> Result<(), Mismatch> {
        field(path, "count", &self.count, &other.count, tolerance)?;
        field(path, "center", &self.center, &other.center, tolerance)?;
        field(path, "radius", &self.radius, &other.radius, tolerance)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimpleEnum {
    #[default]
    First,
    Second,
    Third,
}

impl SimpleEnum {
    pub const VARIANTS: &'static [&'static str] = &["FIRST", "SECOND", "THIRD"];

    #[must_use]
    pub const fn from_ordinal(ordinal: i32) -> Option<Self> {
        match ordinal {
            0 => Some(Self::First),
            1 => Some(Self::Second),
            2 => Some(Self::Third),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::First => "FIRST",
            Self::Second => "SECOND",
            Self::Third => "THIRD",
        }
    }

    #[must_use]
    pub fn shape() -> FieldShape {
        FieldShape::Enum {
            name: "AtomicTests::SimpleEnum",
            variants: Self::VARIANTS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColorEnum {
    #[default]
    Red,
    Green,
    Blue,
    Yellow,
}

impl ColorEnum {
    pub const VARIANTS: &'static [&'static str] = &["RED", "GREEN", "BLUE", "YELLOW"];

    #[must_use]
    pub const fn from_ordinal(ordinal: i32) -> Option<Self> {
        match ordinal {
            0 => Some(Self::Red),
            1 => Some(Self::Green),
            2 => Some(Self::Blue),
            3 => Some(Self::Yellow),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Red => "RED",
            Self::Green => "GREEN",
            Self::Blue => "BLUE",
            Self::Yellow => "YELLOW",
        }
    }

    #[must_use]
    pub fn shape() -> FieldShape {
        FieldShape::Enum {
            name: "AtomicTests::ColorEnum",
            variants: Self::VARIANTS,
        }
    }
}

impl StructuralEq for SimpleEnum {
    fn structural_eq(&self, other: &Self, path: &str, _tolerance: &Tolerance) -> Result<(), Mismatch> {
        if self == other {
            Ok(())
        } else {
            Err(Mismatch::new(path, self.name(), other.name()))
        }
    }
}

impl StructuralEq for ColorEnum {
    fn structural_eq(&self, other: &Self, path: &str, _tolerance: &Tolerance) -> Result<(), Mismatch> {
        if self == other {
            Ok(())
        } else {
            Err(Mismatch::new(path, self.name(), other.name()))
        }
    }
}

/// `union SimpleUnion switch (long)`; the variant is the discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimpleUnion {
    IntValue(i32),
    DoubleValue(f64),
    StringValue(String),
}

impl Default for SimpleUnion {
    fn default() -> Self {
        Self::IntValue(0)
    }
}

impl SimpleUnion {
    pub const INT_VALUE: i32 = 1;
    pub const DOUBLE_VALUE: i32 = 2;
    pub const STRING_VALUE: i32 = 3;

    #[must_use]
    pub const fn discriminator(&self) -> i32 {
        match self {
            Self::IntValue(_) => Self::INT_VALUE,
            Self::DoubleValue(_) => Self::DOUBLE_VALUE,
            Self::StringValue(_) => Self::STRING_VALUE,
        }
    }

    #[must_use]
    pub fn shape() -> FieldShape {
        FieldShape::Union(UnionDescriptor {
            name: "AtomicTests::SimpleUnion",
            discriminator: ScalarKind::Int32,
            cases: vec![
                UnionCase {
                    label: i64::from(Self::INT_VALUE),
                    name: "IntValue",
                    shape: FieldShape::Scalar(ScalarKind::Int32),
                },
                UnionCase {
                    label: i64::from(Self::DOUBLE_VALUE),
                    name: "DoubleValue",
                    shape: FieldShape::Scalar(ScalarKind::Float64),
                },
                UnionCase {
                    label: i64::from(Self::STRING_VALUE),
                    name: "StringValue",
                    shape: FieldShape::String { bound: None },
                },
            ],
        })
    }
}

impl StructuralEq for SimpleUnion {
    fn structural_eq(&self, other: &Self, path: &str, tolerance: &Tolerance) -> Result<(), Mismatch> {
        let expected_d = self.discriminator();
        let actual_d = other.discriminator();
        let discriminator_mismatch = || Mismatch::new(child_path(path, "_d"), expected_d, actual_d);
        if expected_d != actual_d {
            return Err(discriminator_mismatch());
        }
        match (self, other) {
            (Self::IntValue(lhs), Self::IntValue(rhs)) => {
                field(path, "int_value", lhs, rhs, tolerance)
            }
            (Self::DoubleValue(lhs), Self::DoubleValue(rhs)) => {
                field(path, "double_value", lhs, rhs, tolerance)
            }
            (Self::StringValue(lhs), Self::StringValue(rhs)) => {
                field(path, "string_value", lhs, rhs, tolerance)
            }
            _ => Err(discriminator_mismatch()),
        }
    }
}
