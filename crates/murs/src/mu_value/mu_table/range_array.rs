use crate::mu_runtime::MuResult;
use crate::mu_value::MuValue;

use super::{MuInsertResult, MuTableImpl, check_len};

/// Storage-free layout: key `i` in `0..len` holds `offset + i`
pub struct RangeArray {
    len: usize,
    offset: u64,
    npw2: u8,
}

impl RangeArray {
    pub fn new(npw2: u8) -> Self {
        Self {
            len: 0,
            offset: 0,
            npw2,
        }
    }

    #[inline(always)]
    pub fn npw2(&self) -> u8 {
        self.npw2
    }

    #[inline(always)]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[inline(always)]
    pub fn value_at(&self, index: usize) -> MuValue {
        MuValue::uint(self.offset + index as u64)
    }

    fn push(&mut self) -> MuResult<()> {
        check_len(self.len + 1)?;
        self.len += 1;
        if self.len > self.capacity() {
            self.npw2 += 1;
        }
        Ok(())
    }
}

impl MuTableImpl for RangeArray {
    fn get(&self, key: &MuValue) -> Option<MuValue> {
        let index = key.as_index()?;
        (index < self.len).then(|| self.value_at(index))
    }

    fn set(&mut self, key: MuValue, value: MuValue) -> MuResult<MuInsertResult> {
        let Some(index) = key.as_index() else {
            if value.is_nil() {
                return Ok(MuInsertResult::Success);
            }
            return Ok(MuInsertResult::NeedConvertToList(key, value));
        };

        if value.is_nil() {
            if index >= self.len {
                return Ok(MuInsertResult::Success);
            }
            if index + 1 == self.len {
                self.len -= 1;
                return Ok(MuInsertResult::Success);
            }
            return Ok(MuInsertResult::NeedConvertToList(key, value));
        }

        if index == self.len {
            if self.len == 0
                && let Some(first) = value.as_index()
            {
                self.offset = first as u64;
            }
            if value == self.value_at(index) {
                self.push()?;
                return Ok(MuInsertResult::Success);
            }
        } else if index < self.len && value == self.value_at(index) {
            return Ok(MuInsertResult::Success);
        }

        Ok(MuInsertResult::NeedConvertToList(key, value))
    }

    fn insert_at(&mut self, index: usize, value: MuValue) -> MuResult<MuInsertResult> {
        if index == self.len {
            return self.set(MuValue::uint(index as u64), value);
        }
        Ok(MuInsertResult::NeedConvertToList(
            MuValue::uint(index as u64),
            value,
        ))
    }

    fn remove_at(&mut self, index: usize) -> MuResult<Option<MuValue>> {
        if index >= self.len {
            return Ok(Some(MuValue::nil()));
        }
        if index + 1 == self.len {
            self.len -= 1;
            return Ok(Some(self.value_at(index)));
        }
        Ok(None)
    }

    fn next(&self, cursor: &mut usize) -> Option<(MuValue, MuValue)> {
        let index = *cursor;
        if index >= self.len {
            return None;
        }
        *cursor += 1;
        Some((MuValue::uint(index as u64), self.value_at(index)))
    }

    fn len(&self) -> usize {
        self.len
    }

    fn tombstones(&self) -> usize {
        0
    }

    fn capacity(&self) -> usize {
        1 << self.npw2
    }
}
