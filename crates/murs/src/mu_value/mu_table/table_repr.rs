use tracing::debug;

use crate::mu_runtime::mu_limits::{MU_MAXLEN, MU_MAX_NESTING};
use crate::mu_runtime::{MuError, MuResult};
use crate::mu_value::MuValue;
use crate::mu_value::mu_parse::{parse_value_at, skip_whitespace};

use super::TableRef;

impl TableRef {
    /// Literal form of the table, nested tables expanded up to `depth` levels.
    ///
    /// Depth 0 gives the `<tbl 0x...>` placeholder. Tables with no holes in
    /// their integer keys print as `[v, v]`, any other as `[k: v, k: v]`.
    pub fn repr(&self, depth: usize) -> MuResult<String> {
        let mut out = String::new();
        self.repr_into(&mut out, depth)?;
        Ok(out)
    }

    pub(crate) fn repr_into(&self, out: &mut String, depth: usize) -> MuResult<()> {
        if depth == 0 {
            out.push_str(&format!("<tbl 0x{:x}>", self.addr()));
            return Ok(());
        }

        let table = self.borrow();
        let dense = table.is_dense();
        let mut slot = 0;
        let mut first = true;

        out.push('[');
        while let Some((key, value)) = table.next(&mut slot) {
            if !first {
                out.push_str(", ");
            }
            first = false;
            if !dense {
                key.repr_into(out, depth - 1)?;
                out.push_str(": ");
            }
            value.repr_into(out, depth - 1)?;
            if out.len() > MU_MAXLEN {
                return Err(MuError::LengthOverflow("text"));
            }
        }
        out.push(']');
        Ok(())
    }

    /// Parse a table literal spanning all of `text`
    pub fn parse(text: &str) -> Option<TableRef> {
        let bytes = text.as_bytes();
        let mut pos = 0;
        let table = Self::parse_at(bytes, &mut pos, MU_MAX_NESTING).and_then(|table| {
            skip_whitespace(bytes, &mut pos);
            (pos == bytes.len()).then_some(table)
        });
        if table.is_none() {
            debug!(target: "murs::parse", offset = pos, "malformed table literal");
        }
        table
    }

    /// Parse a table literal starting at `*pos`, leaving `*pos` after the
    /// closing bracket. Position is untouched on failure, which includes
    /// opening more than `nesting` levels.
    pub(crate) fn parse_at(text: &[u8], pos: &mut usize, nesting: usize) -> Option<TableRef> {
        if nesting == 0 {
            return None;
        }
        let mut p = *pos;
        skip_whitespace(text, &mut p);
        if text.get(p) != Some(&b'[') {
            return None;
        }
        p += 1;

        let table = TableRef::new();
        let mut index = 0u64;
        loop {
            skip_whitespace(text, &mut p);
            if *text.get(p)? == b']' {
                break;
            }

            let first = parse_value_at(text, &mut p, nesting - 1)?;
            skip_whitespace(text, &mut p);
            if text.get(p) == Some(&b':') {
                p += 1;
                let value = parse_value_at(text, &mut p, nesting - 1)?;
                table.insert(first, value).ok()?;
            } else {
                table.insert(MuValue::uint(index), first).ok()?;
                index += 1;
            }

            skip_whitespace(text, &mut p);
            match *text.get(p)? {
                b',' => p += 1,
                b']' => break,
                _ => return None,
            }
        }

        *pos = p + 1;
        Some(table)
    }
}
