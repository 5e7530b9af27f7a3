// Whole-table operations: positional insert/remove, slicing, joining and
// key-set algebra. Results are always fresh, unfrozen tables.
use std::cmp::Ordering;

use crate::mu_runtime::MuResult;
use crate::mu_runtime::mu_limits::MU_MAXLEN;
use crate::mu_value::{MuValue, MuValueKind, MultiValue};

use super::{TableRef, check_len};

/// Resolve a possibly negative position against `len`, clamped to `[0, upper]`
fn resolve_index(index: i64, len: usize, upper: usize) -> usize {
    let len = len as i64;
    let index = if index < 0 { index + len } else { index };
    index.clamp(0, upper as i64) as usize
}

impl TableRef {
    /// Insert `value` at `index`, moving integer keys at or above it up by one.
    ///
    /// Negative indexes count back from the length.
    pub fn push(&self, value: MuValue, index: i64) -> MuResult<()> {
        let mut table = self.borrow_mut()?;
        let len = table.len();
        check_len(len + 1)?;
        let index = resolve_index(index, len, len);
        table.insert_at(index, value)
    }

    /// Remove the entry at `index`, moving integer keys above it down by one.
    ///
    /// Returns nil on an empty table.
    pub fn pop(&self, index: i64) -> MuResult<MuValue> {
        let mut table = self.borrow_mut()?;
        let len = table.len();
        if len == 0 {
            return Ok(MuValue::nil());
        }
        let index = resolve_index(index, len, len - 1);
        table.remove_at(index)
    }

    /// Entries of `self` followed by those of `other`, numeric keys of `other`
    /// shifted by `offset` (`self.len()` by default, negative counts from it)
    pub fn concat(&self, other: &TableRef, offset: Option<&MuValue>) -> MuResult<TableRef> {
        let len = self.len();
        let total = len + other.len();
        check_len(total)?;

        let base = MuValue::uint(len as u64);
        let offset = match offset {
            None => base,
            Some(offset) if offset.num_cmp(&MuValue::uint(0)) == Ordering::Less => {
                offset.num_add(&base)
            }
            Some(offset) => offset.clone(),
        };

        let joined = TableRef::with_capacity(total)?;
        for (_, key, value) in self.iter() {
            joined.insert(key, value)?;
        }
        for (_, key, value) in other.iter() {
            let key = if key.is_num() { key.num_add(&offset) } else { key };
            joined.insert(key, value)?;
        }
        Ok(joined)
    }

    /// Entries with integer keys in `[lower, upper)`, renumbered from 0.
    ///
    /// Negative bounds count back from the length.
    pub fn subset(&self, lower: i64, upper: i64) -> MuResult<TableRef> {
        let len = self.len();
        let lower = resolve_index(lower, len, len);
        let upper = resolve_index(upper, len, len);
        if lower >= upper {
            return Ok(TableRef::new());
        }

        let slice = TableRef::with_capacity(upper - lower)?;
        let table = self.borrow();
        for index in lower..upper {
            if let Some(value) = table.get(&MuValue::uint(index as u64)) {
                slice.insert(MuValue::uint((index - lower) as u64), value)?;
            }
        }
        Ok(slice)
    }

    /// Entries of `self` whose key is also present in `other`
    pub fn and(&self, other: &TableRef) -> MuResult<TableRef> {
        let result = TableRef::with_capacity(self.len().min(other.len()))?;
        for (_, key, value) in self.iter() {
            if !other.lookup(&key).is_nil() {
                result.insert(key, value)?;
            }
        }
        Ok(result)
    }

    /// Entries of both tables, `self` winning on shared keys
    pub fn or(&self, other: &TableRef) -> MuResult<TableRef> {
        let total = self.len() + other.len();
        check_len(total)?;
        let result = TableRef::with_capacity(total)?;
        for (_, key, value) in other.iter() {
            result.insert(key, value)?;
        }
        for (_, key, value) in self.iter() {
            result.insert(key, value)?;
        }
        Ok(result)
    }

    /// Entries whose key is present in exactly one of the tables
    pub fn xor(&self, other: &TableRef) -> MuResult<TableRef> {
        let total = self.len() + other.len();
        check_len(total)?;
        let result = TableRef::with_capacity(total)?;
        for (_, key, value) in self.iter() {
            if other.lookup(&key).is_nil() {
                result.insert(key, value)?;
            }
        }
        for (_, key, value) in other.iter() {
            if self.lookup(&key).is_nil() {
                result.insert(key, value)?;
            }
        }
        Ok(result)
    }

    /// Entries of `self` whose key is absent from `other`
    pub fn diff(&self, other: &TableRef) -> MuResult<TableRef> {
        let result = TableRef::with_capacity(self.len())?;
        for (_, key, value) in self.iter() {
            if other.lookup(&key).is_nil() {
                result.insert(key, value)?;
            }
        }
        Ok(result)
    }

    /// Table holding the n-th of `values` under key n. A nil value leaves
    /// its key empty without moving the ones after it.
    pub fn from_list(values: impl IntoIterator<Item = MuValue>) -> MuResult<TableRef> {
        let values = values.into_iter();
        let table = TableRef::with_capacity(values.size_hint().0.min(MU_MAXLEN))?;
        for (index, value) in values.enumerate() {
            table.insert(MuValue::uint(index as u64), value)?;
        }
        Ok(table)
    }

    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (MuValue, MuValue)>,
    ) -> MuResult<TableRef> {
        let pairs = pairs.into_iter();
        let table = TableRef::with_capacity(pairs.size_hint().0.min(MU_MAXLEN))?;
        for (key, value) in pairs {
            table.insert(key, value)?;
        }
        Ok(table)
    }

    /// Convert any value into a table.
    ///
    /// - nil: empty table
    /// - number: empty table pre-sized for that many entries
    /// - text: its bytes as one-byte texts under keys `0..`
    /// - table: copy of its own entries, tail not followed
    /// - function: called until it returns nothing; single results go under
    ///   keys `0..` counting every single result, pairs are inserted as key
    ///   and value
    pub fn from_value(value: MuValue) -> MuResult<TableRef> {
        match value.kind() {
            MuValueKind::Nil => Ok(TableRef::new()),
            MuValueKind::Number => {
                TableRef::with_capacity(value.clamp_uint(0, MU_MAXLEN as u64) as usize)
            }
            MuValueKind::Text => {
                let bytes = value.as_bytes().unwrap_or_default();
                TableRef::from_list(bytes.iter().map(|b| MuValue::bytes(std::slice::from_ref(b))))
            }
            MuValueKind::Table | MuValueKind::FrozenTable => match value.as_table() {
                Some(table) => TableRef::from_pairs(table.iter().map(|(_, k, v)| (k, v))),
                None => Ok(TableRef::new()),
            },
            MuValueKind::Function => {
                let table = TableRef::new();
                let Some(function) = value.as_function() else {
                    return Ok(table);
                };
                let mut index = 0u64;
                loop {
                    let (key, value) = match function.call()? {
                        MultiValue::Empty => break,
                        MultiValue::Single(value) => (None, value),
                        MultiValue::Many(values) => {
                            let mut values = values.into_iter();
                            let first = values.next().unwrap_or_default();
                            match values.next() {
                                Some(value) => (Some(first), value),
                                None => (None, first),
                            }
                        }
                    };
                    match key {
                        Some(key) => table.insert(key, value)?,
                        None => {
                            table.insert(MuValue::uint(index), value)?;
                            index += 1;
                        }
                    }
                }
                Ok(table)
            }
        }
    }
}
