//! Mu values to serde_json::Value
//!
//! - nil -> null
//! - number -> integer when exact, float otherwise
//! - text -> string (invalid UTF-8 replaced)
//! - dense table -> array
//! - any other table -> object, keys in canonical text
//! - function -> error
use std::collections::HashSet;

use serde_json::{Map, Number, Value as JsonValue};

use crate::mu_runtime::mu_limits::MU_DEFAULT_DEPTH;
use crate::mu_value::{MuValue, MuValueKind, TableRef, mu_num};

use super::MuJsonError;

pub fn to_value(value: &MuValue) -> Result<JsonValue, MuJsonError> {
    let mut visited = HashSet::new();
    to_value_internal(value, &mut visited)
}

pub fn to_string(value: &MuValue, pretty: bool) -> Result<String, MuJsonError> {
    let json = to_value(value)?;
    let text = if pretty {
        serde_json::to_string_pretty(&json)?
    } else {
        serde_json::to_string(&json)?
    };
    Ok(text)
}

fn to_value_internal(
    value: &MuValue,
    visited: &mut HashSet<usize>,
) -> Result<JsonValue, MuJsonError> {
    match value.kind() {
        MuValueKind::Nil => Ok(JsonValue::Null),
        MuValueKind::Number => number_to_json(value),
        MuValueKind::Text => {
            let bytes = value.as_bytes().unwrap_or_default();
            Ok(JsonValue::String(String::from_utf8_lossy(bytes).into_owned()))
        }
        MuValueKind::Table | MuValueKind::FrozenTable => match value.as_table() {
            Some(table) => table_to_json(&table, visited),
            None => Ok(JsonValue::Null),
        },
        MuValueKind::Function => Err(MuJsonError::Function),
    }
}

fn number_to_json(value: &MuValue) -> Result<JsonValue, MuJsonError> {
    let n = value.get_float();
    if !n.is_finite() {
        return Err(MuJsonError::NonFiniteNumber(n));
    }
    if n.fract() == 0.0 && n.abs() < (1u64 << 53) as f64 {
        return Ok(JsonValue::Number(Number::from(n as i64)));
    }
    Number::from_f64(n)
        .map(JsonValue::Number)
        .ok_or(MuJsonError::NonFiniteNumber(n))
}

fn table_to_json(table: &TableRef, visited: &mut HashSet<usize>) -> Result<JsonValue, MuJsonError> {
    let addr = table.addr();
    if !visited.insert(addr) {
        return Err(MuJsonError::Cycle);
    }

    let result = if is_array_like(table) {
        table
            .iter()
            .map(|(_, _, value)| to_value_internal(&value, visited))
            .collect::<Result<Vec<_>, _>>()
            .map(JsonValue::Array)
    } else {
        let mut object = Map::new();
        for (_, key, value) in table.iter() {
            let name = key_to_string(&key)?;
            object.insert(name, to_value_internal(&value, visited)?);
        }
        Ok(JsonValue::Object(object))
    };

    visited.remove(&addr);
    result
}

/// Keys `0..len` in order, nothing else
fn is_array_like(table: &TableRef) -> bool {
    table
        .iter()
        .all(|(position, key, _)| key.as_index() == Some(position))
}

fn key_to_string(key: &MuValue) -> Result<String, MuJsonError> {
    if let Some(bytes) = key.as_bytes() {
        return Ok(String::from_utf8_lossy(bytes).into_owned());
    }
    if key.is_num() {
        return Ok(mu_num::repr(key.get_float()));
    }
    Ok(key.repr(MU_DEFAULT_DEPTH)?)
}
