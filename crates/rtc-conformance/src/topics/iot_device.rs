#![forbid(unsafe_code)]

use super::{TopicRecord, expect_close, expect_eq, seed_at, seed_len, seed_mod, seed_rem};
use crate::compare::{Mismatch, StructuralEq, Tolerance, field};
use crate::model::{ColorEnum, Point3D};
use rtc_layout::{Extensibility, FieldDescriptor, FieldShape, ScalarKind, TypeDescriptor};
use serde::{Deserialize, Serialize};

const LOCATION_LABEL_BOUND: usize = 128;
const TEMPERATURE_SMOKE_TOLERANCE: f64 = 0.01;

/// Mutable topic with sparse, explicitly assigned member ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IoTDeviceMutableTopic {
    pub device_serial: i32,
    pub temperature: f32,
    pub location_label: Option<String>,
    pub status_leds: Vec<ColorEnum>,
    pub last_ping_geo: Point3D,
}

impl TopicRecord for IoTDeviceMutableTopic {
    const TYPE_NAME: &'static str = "AtomicTests::IoTDeviceMutableTopic";

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new(
            Self::TYPE_NAME,
            Extensibility::Mutable,
            vec![
                FieldDescriptor::scalar("device_serial", ScalarKind::Int32)
                    .key()
                    .with_id(10),
                FieldDescriptor::scalar("temperature", ScalarKind::Float32).with_id(50),
                FieldDescriptor::new(
                    "location_label",
                    FieldShape::String {
                        bound: Some(LOCATION_LABEL_BOUND),
                    },
                )
                .optional()
                .with_id(60),
                FieldDescriptor::new("status_leds", FieldShape::sequence(ColorEnum::shape(), None))
                    .with_id(70),
                FieldDescriptor::new("last_ping_geo", Point3D::shape()).with_id(80),
            ],
        )
    }

    fn from_seed(seed: i32) -> Self {
        let status_leds = (0..seed_len(seed, 1, 4))
            .map(|i| ColorEnum::from_ordinal(seed_mod(seed_at(seed, i), 4)).unwrap_or_default())
            .collect();
        Self {
            device_serial: seed,
            temperature: temperature_for(seed),
            location_label: (seed_mod(seed, 2) == 0).then(|| format!("Location_{seed}")),
            status_leds,
            last_ping_geo: Point3D::scaled(seed, 0.1, 0.2, 0.3),
        }
    }

    fn validate_minimal(&self, seed: i32, _tolerance: &Tolerance) -> Result<(), Mismatch> {
        expect_eq("device_serial", seed, self.device_serial)?;
        expect_close(
            "temperature",
            f64::from(temperature_for(seed)),
            f64::from(self.temperature),
            TEMPERATURE_SMOKE_TOLERANCE,
        )
    }

    fn owned_buffers(&self) -> usize {
        1 + usize::from(self.location_label.is_some())
    }
}

fn temperature_for(seed: i32) -> f32 {
    20.0 + seed_rem(seed, 50) as f32
}

impl StructuralEq for IoTDeviceMutableTopic {
    fn structural_eq(&self, other: &Self, path: &str, tolerance: &Tolerance) -> Result<(), Mismatch> {
        field(path, "device_serial", &self.device_serial, &other.device_serial, tolerance)?;
        field(path, "temperature", &self.temperature, &other.temperature, tolerance)?;
        field(path, "location_label", &self.location_label, &other.location_label, tolerance)?;
        field(path, "status_leds", &self.status_leds, &other.status_leds, tolerance)?;
        field(path, "last_ping_geo", &self.last_ping_geo, &other.last_ping_geo, tolerance)
    }
}
