//! serde_json::Value to Mu values
//!
//! - null -> nil
//! - bool -> 1 or 0
//! - number -> number
//! - string -> text
//! - array -> table keyed `0..`
//! - object -> table keyed by text
use serde_json::Value as JsonValue;

use crate::mu_value::{MuValue, TableRef};

use super::MuJsonError;

pub fn from_value(json: &JsonValue) -> Result<MuValue, MuJsonError> {
    let value = match json {
        JsonValue::Null => MuValue::nil(),
        JsonValue::Bool(b) => MuValue::uint(*b as u64),
        JsonValue::Number(n) => {
            if let Some(u) = n.as_u64() {
                MuValue::uint(u)
            } else if let Some(i) = n.as_i64() {
                MuValue::int(i)
            } else {
                MuValue::float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        JsonValue::String(s) => MuValue::string(s),
        JsonValue::Array(items) => {
            let table = TableRef::with_capacity(items.len())?;
            for (index, item) in items.into_iter().enumerate() {
                table.insert(MuValue::uint(index as u64), from_value(item)?)?;
            }
            MuValue::table(table)
        }
        JsonValue::Object(entries) => {
            let table = TableRef::with_capacity(entries.len())?;
            for (key, item) in entries {
                table.insert(MuValue::string(key), from_value(item)?)?;
            }
            MuValue::table(table)
        }
    };
    Ok(value)
}

pub fn from_str(text: &str) -> Result<MuValue, MuJsonError> {
    let json: JsonValue = serde_json::from_str(text)?;
    from_value(&json)
}
