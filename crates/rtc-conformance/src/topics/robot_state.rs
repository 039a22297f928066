#![forbid(unsafe_code)]

use super::{TopicRecord, expect_eq, seed_at, seed_len, seed_mod, seed_rem};
use crate::compare::{Mismatch, StructuralEq, Tolerance, field};
use crate::model::{Container, Point2D, Point3D, SimpleEnum, SimpleUnion};
use rtc_layout::{Extensibility, FieldDescriptor, FieldShape, ScalarKind, TypeDescriptor};
use serde::{Deserialize, Serialize};

const ROBOT_ID_BOUND: usize = 64;
const TRANSFORM_LEN: usize = 9;
#[allow(clippy::approx_constant)]
const ACTION_SCALE: f64 = 3.14;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RobotStateTopic {
    pub robot_id: String,
    pub timestamp_ns: u64,
    pub operational_mode: SimpleEnum,
    pub transform_matrix: [f64; TRANSFORM_LEN],
    pub current_path: Vec<Point2D>,
    pub current_action: SimpleUnion,
    pub cargo_hold: Option<Container>,
    pub battery_voltage: Option<f64>,
}

impl TopicRecord for RobotStateTopic {
    const TYPE_NAME: &'static str = "AtomicTests::RobotStateTopic";

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new(
            Self::TYPE_NAME,
            Extensibility::Appendable,
            vec![
                FieldDescriptor::new(
                    "robot_id",
                    FieldShape::String {
                        bound: Some(ROBOT_ID_BOUND),
                    },
                )
                .key(),
                FieldDescriptor::scalar("timestamp_ns", ScalarKind::UInt64),
                FieldDescriptor::new("operational_mode", SimpleEnum::shape()),
                FieldDescriptor::new(
                    "transform_matrix",
                    FieldShape::array(FieldShape::Scalar(ScalarKind::Float64), TRANSFORM_LEN),
                ),
                FieldDescriptor::new("current_path", FieldShape::sequence(Point2D::shape(), None)),
                FieldDescriptor::new("current_action", SimpleUnion::shape()),
                FieldDescriptor::new("cargo_hold", Container::shape()).optional(),
                FieldDescriptor::scalar("battery_voltage", ScalarKind::Float64).optional(),
            ],
        )
    }

    fn from_seed(seed: i32) -> Self {
        let mut transform_matrix = [0.0; TRANSFORM_LEN];
        for (idx, slot) in transform_matrix.iter_mut().enumerate() {
            let (row, col) = (idx / 3, idx % 3);
            *slot = f64::from(seed_at(seed, row * 10 + col));
        }
        let current_path = (0..seed_len(seed, 2, 4))
            .map(|i| {
                let base = f64::from(seed_at(seed, i));
                Point2D {
                    x: base * 10.0,
                    y: base * 20.0,
                }
            })
            .collect();
        let cargo_hold = (seed_mod(seed, 2) == 0).then(|| Container {
            count: seed,
            center: Point3D::scaled(seed, 10.0, 20.0, 30.0),
            radius: f64::from(seed) * 5.0,
        });
        let battery_voltage =
            (seed_mod(seed, 3) == 0).then(|| 12.5 + f64::from(seed_rem(seed, 100)) * 0.01);
        Self {
            robot_id: robot_id_for(seed),
            timestamp_ns: timestamp_for(seed),
            operational_mode: SimpleEnum::from_ordinal(seed_mod(seed, 3)).unwrap_or_default(),
            transform_matrix,
            current_path,
            current_action: action_for(seed),
            cargo_hold,
            battery_voltage,
        }
    }

    fn validate_minimal(&self, seed: i32, _tolerance: &Tolerance) -> Result<(), Mismatch> {
        expect_eq("robot_id", robot_id_for(seed).as_str(), self.robot_id.as_str())?;
        expect_eq("timestamp_ns", timestamp_for(seed), self.timestamp_ns)
    }

    fn owned_buffers(&self) -> usize {
        let action_string = usize::from(matches!(self.current_action, SimpleUnion::StringValue(_)));
        2 + action_string
            + usize::from(self.cargo_hold.is_some())
            + usize::from(self.battery_voltage.is_some())
    }
}

fn robot_id_for(seed: i32) -> String {
    format!("ROBOT_{seed:04}")
}

fn timestamp_for(seed: i32) -> u64 {
    (seed as u64).wrapping_mul(1_000_000)
}

fn action_for(seed: i32) -> SimpleUnion {
    match 1 + seed_mod(seed, 3) {
        SimpleUnion::INT_VALUE => SimpleUnion::IntValue(seed.wrapping_mul(100)),
        SimpleUnion::DOUBLE_VALUE => SimpleUnion::DoubleValue(f64::from(seed) * ACTION_SCALE),
        _ => SimpleUnion::StringValue(format!("Action_{seed}")),
    }
}

impl StructuralEq for RobotStateTopic {
    fn structural_eq(&self, other: &Self, path: &str, tolerance: &Tolerance) -> Result<(), Mismatch> {
        field(path, "robot_id", &self.robot_id, &other.robot_id, tolerance)?;
        field(path, "timestamp_ns", &self.timestamp_ns, &other.timestamp_ns, tolerance)?;
        field(path, "operational_mode", &self.operational_mode, &other.operational_mode, tolerance)?;
        field(path, "transform_matrix", &self.transform_matrix, &other.transform_matrix, tolerance)?;
        field(path, "current_path", &self.current_path, &other.current_path, tolerance)?;
        field(path, "current_action", &self.current_action, &other.current_action, tolerance)?;
        field(path, "cargo_hold", &self.cargo_hold, &other.cargo_hold, tolerance)?;
        field(path, "battery_voltage", &self.battery_voltage, &other.battery_voltage, tolerance)
    }
}
