#![forbid(unsafe_code)]

use super::{TopicRecord, bounded, expect_eq, seed_at};
use crate::compare::{Mismatch, StructuralEq, Tolerance, field};
use rtc_layout::{Extensibility, FieldDescriptor, FieldShape, ScalarKind, TypeDescriptor};
use serde::{Deserialize, Serialize};

const INT32_LEN: usize = 5;
const FLOAT64_LEN: usize = 5;
const NAME_COUNT: usize = 3;
const NAME_BOUND: usize = 16;

fn keyed_descriptor(type_name: &'static str, values: FieldDescriptor) -> TypeDescriptor {
    TypeDescriptor::new(
        type_name,
        Extensibility::Final,
        vec![FieldDescriptor::scalar("id", ScalarKind::Int32).key(), values],
    )
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayInt32Topic {
    pub id: i32,
    pub values: [i32; INT32_LEN],
}

impl TopicRecord for ArrayInt32Topic {
    const TYPE_NAME: &'static str = "AtomicTests::ArrayInt32Topic";

    fn descriptor() -> TypeDescriptor {
        keyed_descriptor(
            Self::TYPE_NAME,
            FieldDescriptor::new(
                "values",
                FieldShape::array(FieldShape::Scalar(ScalarKind::Int32), INT32_LEN),
            ),
        )
    }

    fn from_seed(seed: i32) -> Self {
        Self {
            id: seed,
            values: std::array::from_fn(|i| seed_at(seed, i)),
        }
    }

    fn validate_minimal(&self, seed: i32, tolerance: &Tolerance) -> Result<(), Mismatch> {
        expect_eq("id", seed, self.id)?;
        Self::from_seed(seed)
            .values
            .structural_eq(&self.values, "values", tolerance)
    }

    fn owned_buffers(&self) -> usize {
        0
    }
}

impl StructuralEq for ArrayInt32Topic {
    fn structural_eq(&self, other: &Self, path: &str, tolerance: &Tolerance) -> Result<(), Mismatch> {
        field(path, "id", &self.id, &other.id, tolerance)?;
        field(path, "values", &self.values, &other.values, tolerance)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayFloat64Topic {
    pub id: i32,
    pub values: [f64; FLOAT64_LEN],
}

impl TopicRecord for ArrayFloat64Topic {
    const TYPE_NAME: &'static str = "AtomicTests::ArrayFloat64Topic";

    fn descriptor() -> TypeDescriptor {
        keyed_descriptor(
            Self::TYPE_NAME,
            FieldDescriptor::new(
                "values",
                FieldShape::array(FieldShape::Scalar(ScalarKind::Float64), FLOAT64_LEN),
            ),
        )
    }

    fn from_seed(seed: i32) -> Self {
        Self {
            id: seed,
            values: std::array::from_fn(|i| f64::from(seed_at(seed, i)) * 1.1),
        }
    }

    fn validate_minimal(&self, seed: i32, tolerance: &Tolerance) -> Result<(), Mismatch> {
        expect_eq("id", seed, self.id)?;
        Self::from_seed(seed)
            .values
            .structural_eq(&self.values, "values", tolerance)
    }

    fn owned_buffers(&self) -> usize {
        0
    }
}

impl StructuralEq for ArrayFloat64Topic {
    fn structural_eq(&self, other: &Self, path: &str, tolerance: &Tolerance) -> Result<(), Mismatch> {
        field(path, "id", &self.id, &other.id, tolerance)?;
        field(path, "values", &self.values, &other.values, tolerance)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayStringTopic {
    pub id: i32,
    pub names: [String; NAME_COUNT],
}

impl TopicRecord for ArrayStringTopic {
    const TYPE_NAME: &'static str = "AtomicTests::ArrayStringTopic";

    fn descriptor() -> TypeDescriptor {
        keyed_descriptor(
            Self::TYPE_NAME,
            FieldDescriptor::new(
                "names",
                FieldShape::array(
                    FieldShape::String {
                        bound: Some(NAME_BOUND),
                    },
                    NAME_COUNT,
                ),
            ),
        )
    }

    fn from_seed(seed: i32) -> Self {
        Self {
            id: seed,
            names: std::array::from_fn(|i| bounded(format!("S_{seed}_{i}"), NAME_BOUND)),
        }
    }

    fn validate_minimal(&self, seed: i32, tolerance: &Tolerance) -> Result<(), Mismatch> {
        expect_eq("id", seed, self.id)?;
        Self::from_seed(seed)
            .names
            .structural_eq(&self.names, "names", tolerance)
    }

    fn owned_buffers(&self) -> usize {
        NAME_COUNT
    }
}

impl StructuralEq for ArrayStringTopic {
    fn structural_eq(&self, other: &Self, path: &str, tolerance: &Tolerance) -> Result<(), Mismatch> {
        field(path, "id", &self.id, &other.id, tolerance)?;
        field(path, "names", &self.names, &other.names, tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::{ArrayFloat64Topic, ArrayInt32Topic, ArrayStringTopic};
    use crate::compare::Tolerance;
    use crate::topics::TopicRecord;
    use rtc_runtime::ValidationMode;

    #[test]
    fn int32_values_count_up_from_seed() {
        let topic = ArrayInt32Topic::from_seed(10);
        assert_eq!(topic.values, [10, 11, 12, 13, 14]);
        assert_eq!(ArrayInt32Topic::from_seed(i32::MAX).values[1], i32::MIN);
    }

    #[test]
    fn float64_values_within_tolerance() {
        let tol = Tolerance::default();
        let mut topic = ArrayFloat64Topic::from_seed(3);
        assert!((topic.values[4] - 7.7).abs() < 1e-9);
        topic.values[2] += 5e-5;
        assert!(topic.validate(3, ValidationMode::Minimal, &tol).is_ok());
        topic.values[2] += 1e-3;
        let err = topic
            .validate(3, ValidationMode::Minimal, &tol)
            .expect_err("value drifted");
        assert_eq!(err.path, "values[2]");
    }

    #[test]
    fn minimal_mode_honors_caller_tolerance() {
        let mut topic = ArrayFloat64Topic::from_seed(3);
        topic.values[1] += 0.05;
        let loose = Tolerance {
            f64_abs: 0.1,
            ..Tolerance::default()
        };
        assert!(topic.validate(3, ValidationMode::Minimal, &loose).is_ok());
        assert!(topic.validate(3, ValidationMode::Full, &loose).is_ok());
        let err = topic
            .validate(3, ValidationMode::Minimal, &Tolerance::default())
            .expect_err("outside default tolerance");
        assert_eq!(err.path, "values[1]");
    }

    #[test]
    fn string_names_are_bounded() {
        let topic = ArrayStringTopic::from_seed(12);
        assert_eq!(topic.names, ["S_12_0", "S_12_1", "S_12_2"]);
        let wide = ArrayStringTopic::from_seed(i32::MIN);
        assert_eq!(wide.names[0], "S_-2147483648_0");
        assert!(wide.names.iter().all(|name| name.len() <= 16));
    }

    #[test]
    fn string_mismatch_reports_character_index() {
        let tol = Tolerance::default();
        let mut topic = ArrayStringTopic::from_seed(12);
        topic.names[1] = "S_12_9".to_string();
        let err = topic
            .validate(12, ValidationMode::Minimal, &tol)
            .expect_err("name differs");
        assert_eq!(err.path, "names[1][5]");
        assert_eq!(err.index, Some(5));
    }
}
