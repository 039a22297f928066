#![forbid(unsafe_code)]

//! Checks a serialized instance against its layout descriptor: string and
//! sequence bounds, fixed array lengths, enum names, union exclusivity and
//! scalar ranges.

use rtc_layout::{FieldDescriptor, FieldShape, ScalarKind, TypeDescriptor, UnionDescriptor};
use serde_json::{Map, Value};

/// Returns the first descriptor violation as `"<path>: <problem>"`.
pub fn check_against_descriptor(descriptor: &TypeDescriptor, value: &Value) -> Result<(), String> {
    check_members("", &descriptor.fields, value)
}

fn check_members(path: &str, fields: &[FieldDescriptor], value: &Value) -> Result<(), String> {
    let Value::Object(members) = value else {
        return Err(format!("{}: expected object, found {}", display_path(path), kind_of(value)));
    };
    for field in fields {
        let member_path = join(path, field.name);
        match members.get(field.name) {
            None => return Err(format!("{member_path}: missing member")),
            Some(Value::Null) if field.optional => {}
            Some(member) => check_shape(&member_path, &field.shape, member)?,
        }
    }
    if let Some(extra) = members
        .keys()
        .find(|name| fields.iter().all(|field| field.name != name.as_str()))
    {
        return Err(format!("{}: undeclared member {extra}", display_path(path)));
    }
    Ok(())
}

fn check_shape(path: &str, shape: &FieldShape, value: &Value) -> Result<(), String> {
    match shape {
        FieldShape::Scalar(kind) => check_scalar(path, *kind, value),
        FieldShape::Enum { name, variants } => match value.as_str() {
            Some(variant) if variants.iter().any(|known| *known == variant) => Ok(()),
            _ => Err(format!("{path}: {value} is not a variant of {name}")),
        },
        FieldShape::String { bound } => {
            let Some(text) = value.as_str() else {
                return Err(format!("{path}: expected string, found {}", kind_of(value)));
            };
            check_bound(path, text.len(), *bound)
        }
        FieldShape::Array { element, len } => {
            let items = expect_array(path, value)?;
            if items.len() != *len {
                return Err(format!(
                    "{path}: fixed array length expected={len} actual={}",
                    items.len()
                ));
            }
            check_elements(path, element, items)
        }
        FieldShape::Sequence { element, bound } => {
            let items = expect_array(path, value)?;
            check_bound(path, items.len(), *bound)?;
            check_elements(path, element, items)
        }
        FieldShape::Struct(inner) => check_members(path, &inner.fields, value),
        FieldShape::Union(inner) => check_union(path, inner, value),
    }
}

fn check_union(path: &str, union: &UnionDescriptor, value: &Value) -> Result<(), String> {
    let Value::Object(arms) = value else {
        return Err(format!("{path}: expected union object, found {}", kind_of(value)));
    };
    let (arm, payload) = single_arm(path, arms)?;
    let Some(case) = union.case_named(arm) else {
        return Err(format!("{path}: {arm} is not a case of {}", union.name));
    };
    check_shape(&join(path, case.name), &case.shape, payload)
}

fn single_arm<'a>(path: &str, arms: &'a Map<String, Value>) -> Result<(&'a str, &'a Value), String> {
    let mut iter = arms.iter();
    match (iter.next(), iter.next()) {
        (Some((name, payload)), None) => Ok((name.as_str(), payload)),
        (None, _) => Err(format!("{path}: union has no active case")),
        (Some(_), Some(_)) => Err(format!(
            "{path}: union has {} active cases, expected exactly one",
            arms.len()
        )),
    }
}

fn check_scalar(path: &str, kind: ScalarKind, value: &Value) -> Result<(), String> {
    let in_range = match kind {
        ScalarKind::Bool => value.is_boolean(),
        ScalarKind::Float32 | ScalarKind::Float64 => value.is_number(),
        ScalarKind::Char | ScalarKind::Octet => fits_unsigned(value, u64::from(u8::MAX)),
        ScalarKind::UInt16 => fits_unsigned(value, u64::from(u16::MAX)),
        ScalarKind::UInt32 => fits_unsigned(value, u64::from(u32::MAX)),
        ScalarKind::UInt64 => value.is_u64(),
        ScalarKind::Int16 => fits_signed(value, i64::from(i16::MIN), i64::from(i16::MAX)),
        ScalarKind::Int32 => fits_signed(value, i64::from(i32::MIN), i64::from(i32::MAX)),
        ScalarKind::Int64 => value.is_i64(),
    };
    if in_range {
        Ok(())
    } else {
        Err(format!("{path}: {value} does not fit {}", kind.name()))
    }
}

fn fits_unsigned(value: &Value, max: u64) -> bool {
    value.as_u64().is_some_and(|raw| raw <= max)
}

fn fits_signed(value: &Value, min: i64, max: i64) -> bool {
    value.as_i64().is_some_and(|raw| (min..=max).contains(&raw))
}

fn check_bound(path: &str, len: usize, bound: Option<usize>) -> Result<(), String> {
    match bound {
        Some(bound) if len > bound => Err(format!("{path}: length {len} exceeds bound {bound}")),
        _ => Ok(()),
    }
}

fn expect_array<'a>(path: &str, value: &'a Value) -> Result<&'a [Value], String> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| format!("{path}: expected array, found {}", kind_of(value)))
}

fn check_elements(path: &str, element: &FieldShape, items: &[Value]) -> Result<(), String> {
    items
        .iter()
        .enumerate()
        .try_for_each(|(idx, item)| check_shape(&format!("{path}[{idx}]"), element, item))
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "<root>" } else { path }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
