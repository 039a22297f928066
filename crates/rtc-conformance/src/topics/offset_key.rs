#![forbid(unsafe_code)]

use super::{TopicRecord, expect_eq, seed_at, seed_len, seed_rem};
use crate::compare::{Mismatch, StructuralEq, Tolerance, field};
use crate::model::Point3D;
use rtc_layout::{Extensibility, FieldDescriptor, FieldShape, ScalarKind, TypeDescriptor};
use serde::{Deserialize, Serialize};

const GROUP_NAME_BOUND: usize = 32;

/// Keys placed after a bounded string and a float sequence, so their wire
/// offsets move with the variable data in front of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OffsetKeyTopic {
    pub group_name: String,
    pub sensor_id: i32,
    pub calibration_data: Vec<f32>,
    pub instance_sub_id: i16,
    pub final_pos: Point3D,
}

impl TopicRecord for OffsetKeyTopic {
    const TYPE_NAME: &'static str = "AtomicTests::OffsetKeyTopic";

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new(
            Self::TYPE_NAME,
            Extensibility::Final,
            vec![
                FieldDescriptor::new(
                    "group_name",
                    FieldShape::String {
                        bound: Some(GROUP_NAME_BOUND),
                    },
                ),
                FieldDescriptor::scalar("sensor_id", ScalarKind::Int32).key(),
                FieldDescriptor::new(
                    "calibration_data",
                    FieldShape::sequence(FieldShape::Scalar(ScalarKind::Float32), None),
                ),
                FieldDescriptor::scalar("instance_sub_id", ScalarKind::Int16).key(),
                FieldDescriptor::new("final_pos", Point3D::shape()),
            ],
        )
    }

    fn from_seed(seed: i32) -> Self {
        let calibration_data = (0..seed_len(seed, 3, 5))
            .map(|i| seed_at(seed, i) as f32 * 0.1)
            .collect();
        Self {
            group_name: format!("Group_{}", seed_rem(seed, 100)),
            sensor_id: seed,
            calibration_data,
            instance_sub_id: sub_id_for(seed),
            final_pos: Point3D::scaled(seed, 1.1, 2.2, 3.3),
        }
    }

    fn validate_minimal(&self, seed: i32, _tolerance: &Tolerance) -> Result<(), Mismatch> {
        expect_eq("sensor_id", seed, self.sensor_id)?;
        expect_eq("instance_sub_id", sub_id_for(seed), self.instance_sub_id)
    }

    fn owned_buffers(&self) -> usize {
        2
    }
}

fn sub_id_for(seed: i32) -> i16 {
    i16::try_from(seed_rem(seed, 1000)).unwrap_or_default()
}

impl StructuralEq for OffsetKeyTopic {
    fn structural_eq(&self, other: &Self, path: &str, tolerance: &Tolerance) -> Result<(), Mismatch> {
        field(path, "group_name", &self.group_name, &other.group_name, tolerance)?;
        field(path, "sensor_id", &self.sensor_id, &other.sensor_id, tolerance)?;
        field(
            path,
            "calibration_data",
            &self.calibration_data,
            &other.calibration_data,
            tolerance,
        )?;
        field(path, "instance_sub_id", &self.instance_sub_id, &other.instance_sub_id, tolerance)?;
        field(path, "final_pos", &self.final_pos, &other.final_pos, tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::OffsetKeyTopic;
    use crate::compare::Tolerance;
    use crate::topics::TopicRecord;
    use rtc_runtime::ValidationMode;

    #[test]
    fn keys_survive_variable_prefix_at_seed_42() {
        let topic = OffsetKeyTopic::from_seed(42);
        assert_eq!(topic.sensor_id, 42);
        assert_eq!(topic.instance_sub_id, 42);
        assert_eq!(topic.group_name, "Group_42");
        assert_eq!(topic.calibration_data.len(), 5);
        assert!((topic.calibration_data[1] - 4.3).abs() < 1e-5);
        assert!((topic.final_pos.z - 138.6).abs() < 1e-9);
        assert_eq!(OffsetKeyTopic::descriptor().key_field_names(), ["sensor_id", "instance_sub_id"]);
    }

    #[test]
    fn fill_ignores_prior_contents() {
        let mut topic = OffsetKeyTopic::from_seed(999);
        topic.calibration_data.extend([1.0; 20]);
        topic.fill(42);
        assert_eq!(topic, OffsetKeyTopic::from_seed(42));
    }

    #[test]
    fn minimal_checks_keys_and_full_checks_payload() {
        let tol = Tolerance::default();
        let mut topic = OffsetKeyTopic::from_seed(42);
        topic.group_name = "Group_4x".to_string();
        assert!(topic.validate(42, ValidationMode::Minimal, &tol).is_ok());
        let err = topic
            .validate(42, ValidationMode::Full, &tol)
            .expect_err("group name differs");
        assert_eq!(err.path, "group_name[7]");

        topic.instance_sub_id = 43;
        let err = topic
            .validate(42, ValidationMode::Minimal, &tol)
            .expect_err("key differs");
        assert_eq!(err.path, "instance_sub_id");
    }

    #[test]
    fn negative_seed_keys_keep_their_sign() {
        let topic = OffsetKeyTopic::from_seed(-1);
        assert_eq!(topic.instance_sub_id, -1);
        assert_eq!(topic.group_name, "Group_-1");
        assert_eq!(topic.calibration_data.len(), 7);

        let topic = OffsetKeyTopic::from_seed(-12_345);
        assert_eq!(topic.instance_sub_id, -345);
        assert_eq!(topic.group_name, "Group_-45");
        assert!(topic.validate(-12_345, ValidationMode::Full, &Tolerance::default()).is_ok());
    }
}
