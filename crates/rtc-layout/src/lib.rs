#![forbid(unsafe_code)]

use serde::Serialize;
use std::collections::BTreeSet;

/// XCDR2 caps primitive alignment at 4 bytes.
pub const XCDR2_MAX_ALIGNMENT: usize = 4;
/// Classic CDR aligns 8-byte primitives on 8.
pub const XCDR1_MAX_ALIGNMENT: usize = 8;
/// Size of the DHEADER prefixed to appendable and mutable payloads.
pub const DELIMITER_HEADER_SIZE: usize = 4;

pub const LAYOUT_REASON_CODES: [&str; 7] = [
    "layout_duplicate_field_name",
    "layout_member_id_missing",
    "layout_member_id_duplicate",
    "layout_array_length_zero",
    "layout_union_without_cases",
    "layout_invalid_alignment",
    "layout_offset_overflow",
];

/// Wire-level primitive kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Bool,
    Char,
    Octet,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
}

impl ScalarKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::Char => "char",
            Self::Octet => "octet",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Float32 => "float",
            Self::Float64 => "double",
        }
    }

    #[must_use]
    pub const fn wire_size(self) -> usize {
        match self {
            Self::Bool | Self::Char | Self::Octet => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "boolean" | "bool" => Some(Self::Bool),
            "char" => Some(Self::Char),
            "octet" | "uint8" | "u8" => Some(Self::Octet),
            "int16" | "short" | "i16" => Some(Self::Int16),
            "uint16" | "unsigned short" | "u16" => Some(Self::UInt16),
            "int32" | "long" | "i32" => Some(Self::Int32),
            "uint32" | "unsigned long" | "u32" => Some(Self::UInt32),
            "int64" | "long long" | "i64" => Some(Self::Int64),
            "uint64" | "unsigned long long" | "u64" => Some(Self::UInt64),
            "float" | "float32" | "f32" => Some(Self::Float32),
            "double" | "float64" | "f64" => Some(Self::Float64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Extensibility {
    Final,
    Appendable,
    Mutable,
}

impl Extensibility {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Final => "final",
            Self::Appendable => "appendable",
            Self::Mutable => "mutable",
        }
    }

    /// Bytes the encoder emits before the first member.
    #[must_use]
    pub const fn header_size(self) -> usize {
        match self {
            Self::Final => 0,
            Self::Appendable | Self::Mutable => DELIMITER_HEADER_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldShape {
    Scalar(ScalarKind),
    /// 32-bit enumeration; `variants` are the serialized variant names in
    /// ordinal order.
    Enum {
        name: &'static str,
        variants: &'static [&'static str],
    },
    String {
        bound: Option<usize>,
    },
    Array {
        element: Box<FieldShape>,
        len: usize,
    },
    Sequence {
        element: Box<FieldShape>,
        bound: Option<usize>,
    },
    Struct(StructDescriptor),
    Union(UnionDescriptor),
}

impl FieldShape {
    #[must_use]
    pub fn array(element: FieldShape, len: usize) -> Self {
        Self::Array {
            element: Box::new(element),
            len,
        }
    }

    #[must_use]
    pub fn sequence(element: FieldShape, bound: Option<usize>) -> Self {
        Self::Sequence {
            element: Box::new(element),
            bound,
        }
    }

    /// Natural alignment before any encoding cap is applied.
    #[must_use]
    pub fn alignment(&self) -> usize {
        match self {
            Self::Scalar(kind) => kind.wire_size(),
            Self::Enum { .. } | Self::String { .. } | Self::Sequence { .. } => 4,
            Self::Array { element, .. } => element.alignment(),
            Self::Struct(inner) => inner
                .fields
                .iter()
                .map(|field| field.shape.alignment())
                .max()
                .unwrap_or(1),
            Self::Union(inner) => inner
                .cases
                .iter()
                .map(|case| case.shape.alignment())
                .fold(inner.discriminator.wire_size(), usize::max),
        }
    }

    /// Encoded size when it does not depend on the instance; `None` for
    /// strings, sequences, unions and anything containing them.
    #[must_use]
    pub fn fixed_size(&self, max_alignment: usize) -> Option<usize> {
        match self {
            Self::Scalar(kind) => Some(kind.wire_size()),
            Self::Enum { .. } => Some(4),
            Self::String { .. } | Self::Sequence { .. } | Self::Union(_) => None,
            Self::Array { element, len } => element.fixed_size(max_alignment)?.checked_mul(*len),
            Self::Struct(inner) => {
                let mut offset = 0usize;
                for field in &inner.fields {
                    if field.optional {
                        return None;
                    }
                    let size = field.shape.fixed_size(max_alignment)?;
                    let align = field.shape.alignment().min(max_alignment);
                    offset = aligned_offset(offset, align).ok()?.checked_add(size)?;
                }
                Some(offset)
            }
        }
    }

    #[must_use]
    pub fn is_variable(&self) -> bool {
        self.fixed_size(XCDR2_MAX_ALIGNMENT).is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructDescriptor {
    pub name: &'static str,
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnionCase {
    pub label: i64,
    /// Serialized variant name carrying this case's payload.
    pub name: &'static str,
    pub shape: FieldShape,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnionDescriptor {
    pub name: &'static str,
    pub discriminator: ScalarKind,
    pub cases: Vec<UnionCase>,
}

impl UnionDescriptor {
    #[must_use]
    pub fn case_named(&self, name: &str) -> Option<&UnionCase> {
        self.cases.iter().find(|case| case.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub shape: FieldShape,
    pub member_id: Option<u32>,
    pub key: bool,
    pub optional: bool,
}

impl FieldDescriptor {
    #[must_use]
    pub fn new(name: &'static str, shape: FieldShape) -> Self {
        Self {
            name,
            shape,
            member_id: None,
            key: false,
            optional: false,
        }
    }

    #[must_use]
    pub fn scalar(name: &'static str, kind: ScalarKind) -> Self {
        Self::new(name, FieldShape::Scalar(kind))
    }

    #[must_use]
    pub fn key(mut self) -> Self {
        self.key = true;
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub fn with_id(mut self, member_id: u32) -> Self {
        self.member_id = Some(member_id);
        self
    }
}

/// Static per-topic layout metadata handed to codecs unmodified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDescriptor {
    pub type_name: &'static str,
    pub extensibility: Extensibility,
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldOffset {
    pub name: &'static str,
    pub offset: usize,
    pub size: usize,
    pub padding_before: usize,
}

impl TypeDescriptor {
    #[must_use]
    pub fn new(
        type_name: &'static str,
        extensibility: Extensibility,
        fields: Vec<FieldDescriptor>,
    ) -> Self {
        Self {
            type_name,
            extensibility,
            fields,
        }
    }

    pub fn key_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|field| field.key)
    }

    #[must_use]
    pub fn key_field_names(&self) -> Vec<&'static str> {
        self.key_fields().map(|field| field.name).collect()
    }

    /// Position of each key field in declaration order. Keys need not be
    /// leading nor contiguous.
    #[must_use]
    pub fn key_positions(&self) -> Vec<usize> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, field)| field.key)
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn validate(&self) -> Result<(), DescriptorError> {
        validate_struct_fields(self.type_name, &self.fields)?;

        if self.extensibility == Extensibility::Mutable {
            let mut seen = BTreeSet::new();
            for field in &self.fields {
                let Some(member_id) = field.member_id else {
                    return Err(DescriptorError::MemberIdMissing {
                        type_name: self.type_name,
                        field: field.name,
                    });
                };
                if !seen.insert(member_id) {
                    return Err(DescriptorError::DuplicateMemberId {
                        type_name: self.type_name,
                        member_id,
                    });
                }
            }
        }
        Ok(())
    }

    /// Offsets of the members preceding the first variable-size or optional
    /// member, as the encoder would lay them out after its header.
    pub fn fixed_prefix_layout(
        &self,
        max_alignment: usize,
    ) -> Result<Vec<FieldOffset>, DescriptorError> {
        if !max_alignment.is_power_of_two() {
            return Err(DescriptorError::InvalidAlignment(max_alignment));
        }
        if self.extensibility == Extensibility::Mutable {
            // every mutable member carries its own EMHEADER
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        let mut offset = self.extensibility.header_size();
        for field in &self.fields {
            if field.optional {
                break;
            }
            let Some(size) = field.shape.fixed_size(max_alignment) else {
                break;
            };
            let align = field.shape.alignment().min(max_alignment);
            let aligned = aligned_offset(offset, align)?;
            out.push(FieldOffset {
                name: field.name,
                offset: aligned,
                size,
                padding_before: aligned - offset,
            });
            offset = aligned
                .checked_add(size)
                .ok_or(DescriptorError::OffsetOverflow)?;
        }
        Ok(out)
    }
}

fn validate_struct_fields(
    owner: &'static str,
    fields: &[FieldDescriptor],
) -> Result<(), DescriptorError> {
    let mut names = BTreeSet::new();
    for field in fields {
        if !names.insert(field.name) {
            return Err(DescriptorError::DuplicateFieldName {
                type_name: owner,
                field: field.name,
            });
        }
        validate_shape(owner, field.name, &field.shape)?;
    }
    Ok(())
}

fn validate_shape(
    owner: &'static str,
    field: &'static str,
    shape: &FieldShape,
) -> Result<(), DescriptorError> {
    match shape {
        FieldShape::Scalar(_) | FieldShape::Enum { .. } | FieldShape::String { .. } => Ok(()),
        FieldShape::Array { element, len } => {
            if *len == 0 {
                return Err(DescriptorError::ZeroLengthArray {
                    type_name: owner,
                    field,
                });
            }
            validate_shape(owner, field, element)
        }
        FieldShape::Sequence { element, .. } => validate_shape(owner, field, element),
        FieldShape::Struct(inner) => validate_struct_fields(inner.name, &inner.fields),
        FieldShape::Union(inner) => {
            if inner.cases.is_empty() {
                return Err(DescriptorError::UnionWithoutCases {
                    type_name: inner.name,
                });
            }
            inner
                .cases
                .iter()
                .try_for_each(|case| validate_shape(inner.name, case.name, &case.shape))
        }
    }
}

pub fn aligned_offset(offset: usize, alignment: usize) -> Result<usize, DescriptorError> {
    if !alignment.is_power_of_two() {
        return Err(DescriptorError::InvalidAlignment(alignment));
    }
    let mask = alignment - 1;
    offset
        .checked_add(mask)
        .map(|value| value & !mask)
        .ok_or(DescriptorError::OffsetOverflow)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    DuplicateFieldName {
        type_name: &'static str,
        field: &'static str,
    },
    MemberIdMissing {
        type_name: &'static str,
        field: &'static str,
    },
    DuplicateMemberId {
        type_name: &'static str,
        member_id: u32,
    },
    ZeroLengthArray {
        type_name: &'static str,
        field: &'static str,
    },
    UnionWithoutCases {
        type_name: &'static str,
    },
    InvalidAlignment(usize),
    OffsetOverflow,
}

impl DescriptorError {
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::DuplicateFieldName { .. } => "layout_duplicate_field_name",
            Self::MemberIdMissing { .. } => "layout_member_id_missing",
            Self::DuplicateMemberId { .. } => "layout_member_id_duplicate",
            Self::ZeroLengthArray { .. } => "layout_array_length_zero",
            Self::UnionWithoutCases { .. } => "layout_union_without_cases",
            Self::InvalidAlignment(_) => "layout_invalid_alignment",
            Self::OffsetOverflow => "layout_offset_overflow",
        }
    }
}

impl std::fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateFieldName { type_name, field } => {
                write!(f, "{type_name}: field '{field}' declared twice")
            }
            Self::MemberIdMissing { type_name, field } => {
                write!(f, "{type_name}: mutable member '{field}' has no member id")
            }
            Self::DuplicateMemberId {
                type_name,
                member_id,
            } => write!(f, "{type_name}: member id {member_id} used twice"),
            Self::ZeroLengthArray { type_name, field } => {
                write!(f, "{type_name}: array field '{field}' has length 0")
            }
            Self::UnionWithoutCases { type_name } => {
                write!(f, "union {type_name} declares no cases")
            }
            Self::InvalidAlignment(align) => {
                write!(f, "alignment {align} is not a power of two")
            }
            Self::OffsetOverflow => write!(f, "offset arithmetic overflow"),
        }
    }
}

impl std::error::Error for DescriptorError {}

#[cfg(test)]
mod tests {
    use super::{
        DescriptorError, Extensibility, FieldDescriptor, FieldShape, LAYOUT_REASON_CODES,
        ScalarKind, StructDescriptor, TypeDescriptor, UnionCase, UnionDescriptor,
        XCDR1_MAX_ALIGNMENT, XCDR2_MAX_ALIGNMENT, aligned_offset,
    };

    #[test]
    fn layout_reason_codes_are_unique_and_cover_errors() {
        let mut codes = LAYOUT_REASON_CODES.to_vec();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), LAYOUT_REASON_CODES.len());

        let errors = [
            DescriptorError::DuplicateFieldName {
                type_name: "T",
                field: "a",
            },
            DescriptorError::MemberIdMissing {
                type_name: "T",
                field: "a",
            },
            DescriptorError::DuplicateMemberId {
                type_name: "T",
                member_id: 1,
            },
            DescriptorError::ZeroLengthArray {
                type_name: "T",
                field: "a",
            },
            DescriptorError::UnionWithoutCases { type_name: "U" },
            DescriptorError::InvalidAlignment(3),
            DescriptorError::OffsetOverflow,
        ];
        for err in &errors {
            assert!(LAYOUT_REASON_CODES.contains(&err.reason_code()), "{err}");
        }
        assert_eq!(errors.len(), LAYOUT_REASON_CODES.len());
    }

    fn alignment_torture() -> TypeDescriptor {
        TypeDescriptor::new(
            "AtomicTests::AlignmentCheckTopic",
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

    #[test]
    fn scalar_names_round_trip_through_parse() {
        for kind in [
            ScalarKind::Bool,
            ScalarKind::Char,
            ScalarKind::Octet,
            ScalarKind::Int16,
            ScalarKind::UInt16,
            ScalarKind::Int32,
            ScalarKind::UInt32,
            ScalarKind::Int64,
            ScalarKind::UInt64,
            ScalarKind::Float32,
            ScalarKind::Float64,
        ] {
            assert_eq!(ScalarKind::parse(kind.name()), Some(kind));
        }
        assert_eq!(ScalarKind::parse("wchar"), None);
    }

    #[test]
    fn aligned_offset_rounds_up() {
        assert_eq!(aligned_offset(5, 4).expect("align"), 8);
        assert_eq!(aligned_offset(8, 4).expect("align"), 8);
        assert_eq!(aligned_offset(0, 8).expect("align"), 0);
        assert_eq!(
            aligned_offset(3, 3).expect_err("non power of two"),
            DescriptorError::InvalidAlignment(3)
        );
    }

    #[test]
    fn fixed_prefix_stops_at_first_sequence() {
        let layout = alignment_torture()
            .fixed_prefix_layout(XCDR2_MAX_ALIGNMENT)
            .expect("layout");
        let names: Vec<_> = layout.iter().map(|entry| entry.name).collect();
        assert_eq!(names, vec!["id", "b1", "d1", "s1", "c1", "l1"]);

        // id@0, b1@4, d1 aligned to 4 under XCDR2 -> 8, s1@16, c1@18, l1@20
        let offsets: Vec<_> = layout.iter().map(|entry| entry.offset).collect();
        assert_eq!(offsets, vec![0, 4, 8, 16, 18, 20]);
        assert_eq!(layout[2].padding_before, 3);
        assert_eq!(layout[5].padding_before, 1);
    }

    #[test]
    fn classic_cdr_aligns_doubles_on_eight() {
        let descriptor = TypeDescriptor::new(
            "AtomicTests::Probe",
            Extensibility::Appendable,
            vec![
                FieldDescriptor::scalar("flag", ScalarKind::Bool),
                FieldDescriptor::scalar("value", ScalarKind::Float64),
            ],
        );
        let xcdr1 = descriptor
            .fixed_prefix_layout(XCDR1_MAX_ALIGNMENT)
            .expect("layout");
        let xcdr2 = descriptor
            .fixed_prefix_layout(XCDR2_MAX_ALIGNMENT)
            .expect("layout");
        // DHEADER occupies the first four bytes
        assert_eq!(xcdr1[0].offset, 4);
        assert_eq!(xcdr1[1].offset, 8);
        assert_eq!(xcdr2[1].offset, 8);
        assert_eq!(xcdr1[1].padding_before, 3);
    }

    #[test]
    fn key_positions_follow_declaration_order() {
        let descriptor = TypeDescriptor::new(
            "AtomicTests::OffsetKeyTopic",
            Extensibility::Final,
            vec![
                FieldDescriptor::new("group_name", FieldShape::String { bound: Some(32) }),
                FieldDescriptor::scalar("sensor_id", ScalarKind::Int32).key(),
                FieldDescriptor::new(
                    "calibration_data",
                    FieldShape::sequence(FieldShape::Scalar(ScalarKind::Float32), None),
                ),
                FieldDescriptor::scalar("instance_sub_id", ScalarKind::Int16).key(),
            ],
        );
        assert_eq!(descriptor.key_positions(), vec![1, 3]);
        assert_eq!(
            descriptor.key_field_names(),
            vec!["sensor_id", "instance_sub_id"]
        );
        // leading string is variable, so nothing is at a fixed offset
        assert!(
            descriptor
                .fixed_prefix_layout(XCDR2_MAX_ALIGNMENT)
                .expect("layout")
                .is_empty()
        );
    }

    #[test]
    fn mutable_descriptor_requires_unique_member_ids() {
        let missing = TypeDescriptor::new(
            "AtomicTests::Sparse",
            Extensibility::Mutable,
            vec![
                FieldDescriptor::scalar("a", ScalarKind::Int32).with_id(10),
                FieldDescriptor::scalar("b", ScalarKind::Int32),
            ],
        );
        assert!(matches!(
            missing.validate(),
            Err(DescriptorError::MemberIdMissing { field: "b", .. })
        ));

        let duplicate = TypeDescriptor::new(
            "AtomicTests::Sparse",
            Extensibility::Mutable,
            vec![
                FieldDescriptor::scalar("a", ScalarKind::Int32).with_id(10),
                FieldDescriptor::scalar("b", ScalarKind::Int32).with_id(10),
            ],
        );
        let err = duplicate.validate().expect_err("duplicate ids");
        assert_eq!(err.reason_code(), "layout_member_id_duplicate");
    }

    #[test]
    fn nested_shapes_are_validated() {
        let descriptor = TypeDescriptor::new(
            "AtomicTests::Nested",
            Extensibility::Final,
            vec![
                FieldDescriptor::new(
                    "inner",
                    FieldShape::Struct(StructDescriptor {
                        name: "AtomicTests::Inner",
                        fields: vec![FieldDescriptor::new(
                            "values",
                            FieldShape::array(FieldShape::Scalar(ScalarKind::Int32), 0),
                        )],
                    }),
                ),
                FieldDescriptor::new(
                    "choice",
                    FieldShape::Union(UnionDescriptor {
                        name: "AtomicTests::Choice",
                        discriminator: ScalarKind::Int32,
                        cases: vec![UnionCase {
                            label: 1,
                            name: "IntValue",
                            shape: FieldShape::Scalar(ScalarKind::Int32),
                        }],
                    }),
                ),
            ],
        );
        let err = descriptor.validate().expect_err("zero length array");
        assert_eq!(
            err,
            DescriptorError::ZeroLengthArray {
                type_name: "AtomicTests::Inner",
                field: "values",
            }
        );
    }

    #[test]
    fn struct_fixed_size_includes_inner_padding() {
        let point = FieldShape::Struct(StructDescriptor {
            name: "AtomicTests::Mixed",
            fields: vec![
                FieldDescriptor::scalar("tag", ScalarKind::Octet),
                FieldDescriptor::scalar("value", ScalarKind::Float64),
            ],
        });
        assert_eq!(point.fixed_size(XCDR2_MAX_ALIGNMENT), Some(12));
        assert_eq!(point.fixed_size(XCDR1_MAX_ALIGNMENT), Some(16));
        assert_eq!(point.alignment(), 8);
        assert!(
            FieldShape::sequence(FieldShape::Scalar(ScalarKind::Octet), Some(4)).is_variable()
        );
    }
}
