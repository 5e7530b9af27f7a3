//! Values as literals.
//!
//! Grammar (whitespace allowed between tokens):
//! ```text
//! value   = table | text | number | word
//! table   = "[" [ entry { "," entry } [ "," ] ] "]"
//! entry   = value [ ":" value ]
//! text    = "'" ... "'" | '"' ... '"'
//! number  = [ "+" | "-" ] ( numeral | "inf" | "nan" )
//! word    = identifier, "nil" being the nil value
//! ```
use tracing::debug;

use crate::mu_runtime::mu_limits::MU_MAX_NESTING;
use crate::mu_runtime::{MuError, MuResult};
use crate::mu_value::mu_string::{self, is_ident_continue, is_ident_start};
use crate::mu_value::{MuValue, MuValueKind, TableRef, mu_num};

impl MuValue {
    /// Append the literal form of this value, tables expanded up to `depth`
    pub(crate) fn repr_into(&self, out: &mut String, depth: usize) -> MuResult<()> {
        match self.kind() {
            MuValueKind::Nil => out.push_str("nil"),
            MuValueKind::Number => out.push_str(&mu_num::repr(self.get_float())),
            MuValueKind::Text => {
                mu_string::repr_into(self.as_bytes().unwrap_or_default(), out)
            }
            MuValueKind::Table | MuValueKind::FrozenTable => {
                if let Some(table) = self.as_table() {
                    table.repr_into(out, depth)?;
                }
            }
            MuValueKind::Function => out.push_str(&format!("<fn 0x{:x}>", self.addr())),
        }
        Ok(())
    }
}

#[inline]
pub(crate) fn skip_whitespace(text: &[u8], pos: &mut usize) {
    while text.get(*pos).is_some_and(u8::is_ascii_whitespace) {
        *pos += 1;
    }
}

fn parse_number(text: &[u8], pos: &mut usize, negative: bool) -> Option<MuValue> {
    let rest = &text[*pos..];
    let n = if rest.starts_with(b"inf") {
        *pos += 3;
        f64::INFINITY
    } else if rest.starts_with(b"nan") {
        *pos += 3;
        f64::NAN
    } else {
        let (n, used) = mu_num::parse(rest)?;
        *pos += used;
        n
    };
    Some(MuValue::float(if negative { -n } else { n }))
}

fn parse_word(text: &[u8], pos: &mut usize) -> MuValue {
    let start = *pos;
    *pos += 1;
    while text.get(*pos).copied().is_some_and(is_ident_continue) {
        *pos += 1;
    }
    match &text[start..*pos] {
        b"nil" => MuValue::nil(),
        b"inf" => MuValue::float(f64::INFINITY),
        b"nan" => MuValue::float(f64::NAN),
        word => MuValue::bytes(word),
    }
}

/// Parse one value starting at `*pos`.
///
/// On success `*pos` points past the value; on failure it is left untouched
/// and any partially built table is dropped. Tables nested deeper than
/// `MU_MAX_NESTING` fail.
pub fn parse_value(text: &[u8], pos: &mut usize) -> Option<MuValue> {
    parse_value_at(text, pos, MU_MAX_NESTING)
}

/// `parse_value` allowing at most `nesting` more table levels
pub(crate) fn parse_value_at(text: &[u8], pos: &mut usize, nesting: usize) -> Option<MuValue> {
    let mut p = *pos;
    skip_whitespace(text, &mut p);
    let c = *text.get(p)?;

    let value = match c {
        b'[' => TableRef::parse_at(text, &mut p, nesting).map(MuValue::table)?,
        b'\'' | b'"' => {
            let bytes = mu_string::parse_quoted(text, &mut p)?;
            MuValue::bytes(&bytes)
        }
        b'+' | b'-' => {
            p += 1;
            parse_number(text, &mut p, c == b'-')?
        }
        b'0'..=b'9' | b'.' => parse_number(text, &mut p, false)?,
        c if is_ident_start(c) => parse_word(text, &mut p),
        _ => return None,
    };

    *pos = p;
    Some(value)
}

/// Parse `text` as exactly one value, surrounding whitespace allowed
pub fn parse(text: &str) -> MuResult<MuValue> {
    let bytes = text.as_bytes();
    let mut pos = 0;
    let value = parse_value(bytes, &mut pos);
    skip_whitespace(bytes, &mut pos);
    match value {
        Some(value) if pos == bytes.len() => Ok(value),
        _ => {
            debug!(target: "murs::parse", offset = pos, "malformed literal");
            Err(MuError::MalformedLiteral)
        }
    }
}
