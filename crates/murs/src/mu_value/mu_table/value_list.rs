use tracing::trace;

use crate::mu_runtime::MuResult;
use crate::mu_value::MuValue;

use super::range_array::RangeArray;
use super::{MuInsertResult, MuTableImpl, check_len};

/// Dense layout keyed `0..extent`. Nil slots are tombstones.
pub struct ValueList {
    pub(super) array: Vec<MuValue>,
    len: usize,
    nils: usize,
    npw2: u8,
}

impl ValueList {
    pub fn new(npw2: u8) -> Self {
        Self {
            array: Vec::new(),
            len: 0,
            nils: 0,
            npw2,
        }
    }

    /// Materialize every implied entry of a range
    pub fn from_range(range: &RangeArray) -> MuResult<Self> {
        let mut list = Self::new(range.npw2());
        list.array.try_reserve_exact(range.len())?;
        list.array
            .extend((0..range.len()).map(|index| range.value_at(index)));
        list.len = range.len();
        Ok(list)
    }

    #[inline(always)]
    pub fn npw2(&self) -> u8 {
        self.npw2
    }

    /// Live entries plus tombstones
    #[inline(always)]
    pub fn extent(&self) -> usize {
        self.array.len()
    }

    /// Make room for one more slot at the end, doubling the capacity when full.
    /// False when the list is full and still carries tombstones.
    fn reserve_slot(&mut self) -> MuResult<bool> {
        if self.array.len() >= self.capacity() {
            if self.nils > 0 {
                return Ok(false);
            }
            self.npw2 += 1;
            trace!(target: "murs::table", capacity = self.capacity(), "list grown");
        }
        self.array.try_reserve(1)?;
        Ok(true)
    }

    fn trim_tombstones(&mut self) {
        while self.array.last().is_some_and(MuValue::is_nil) {
            self.array.pop();
            self.nils -= 1;
        }
    }
}

impl MuTableImpl for ValueList {
    fn get(&self, key: &MuValue) -> Option<MuValue> {
        let value = self.array.get(key.as_index()?)?;
        (!value.is_nil()).then(|| value.clone())
    }

    fn set(&mut self, key: MuValue, value: MuValue) -> MuResult<MuInsertResult> {
        let Some(index) = key.as_index() else {
            if value.is_nil() {
                return Ok(MuInsertResult::Success);
            }
            return Ok(MuInsertResult::NeedConvertToPairs(key, value));
        };
        let extent = self.array.len();

        if value.is_nil() {
            if index >= extent || self.array[index].is_nil() {
                return Ok(MuInsertResult::Success);
            }
            self.len -= 1;
            if index + 1 == extent {
                self.array.pop();
                self.trim_tombstones();
            } else {
                self.array[index] = value;
                self.nils += 1;
            }
            return Ok(MuInsertResult::Success);
        }

        if index < extent {
            if self.array[index].is_nil() {
                check_len(self.len + 1)?;
                self.nils -= 1;
                self.len += 1;
            }
            self.array[index] = value;
            return Ok(MuInsertResult::Success);
        }

        if index == extent {
            check_len(self.len + 1)?;
            if self.reserve_slot()? {
                self.array.push(value);
                self.len += 1;
                return Ok(MuInsertResult::Success);
            }
        }

        Ok(MuInsertResult::NeedConvertToPairs(key, value))
    }

    fn insert_at(&mut self, index: usize, value: MuValue) -> MuResult<MuInsertResult> {
        let extent = self.array.len();
        if index > extent {
            return Ok(MuInsertResult::NeedConvertToPairs(
                MuValue::uint(index as u64),
                value,
            ));
        }
        if value.is_nil() && index == extent {
            return Ok(MuInsertResult::Success);
        }

        check_len(self.len + 1)?;
        if !self.reserve_slot()? {
            return Ok(MuInsertResult::NeedConvertToPairs(
                MuValue::uint(index as u64),
                value,
            ));
        }

        if value.is_nil() {
            self.nils += 1;
        } else {
            self.len += 1;
        }
        self.array.insert(index, value);
        Ok(MuInsertResult::Success)
    }

    fn remove_at(&mut self, index: usize) -> MuResult<Option<MuValue>> {
        if index >= self.array.len() {
            return Ok(Some(MuValue::nil()));
        }
        let value = self.array.remove(index);
        if value.is_nil() {
            self.nils -= 1;
        } else {
            self.len -= 1;
        }
        self.trim_tombstones();
        Ok(Some(value))
    }

    fn next(&self, cursor: &mut usize) -> Option<(MuValue, MuValue)> {
        while let Some(value) = self.array.get(*cursor) {
            let index = *cursor;
            *cursor += 1;
            if !value.is_nil() {
                return Some((MuValue::uint(index as u64), value.clone()));
            }
        }
        None
    }

    fn len(&self) -> usize {
        self.len
    }

    fn tombstones(&self) -> usize {
        self.nils
    }

    fn capacity(&self) -> usize {
        1 << self.npw2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(values: &[&str]) -> ValueList {
        let mut list = ValueList::new(2);
        for (i, s) in values.iter().enumerate() {
            let r = list
                .set(MuValue::uint(i as u64), MuValue::string(s))
                .unwrap();
            assert!(matches!(r, MuInsertResult::Success));
        }
        list
    }

    #[test]
    fn test_append_doubles() {
        let list = list_of(&["a", "b", "c", "d", "e"]);
        assert_eq!(list.len(), 5);
        assert_eq!(list.capacity(), 8);
        assert_eq!(list.get(&MuValue::uint(4)), Some(MuValue::string("e")));
    }

    #[test]
    fn test_tombstones() {
        let mut list = list_of(&["a", "b", "c", "d"]);
        list.set(MuValue::uint(1), MuValue::nil()).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.tombstones(), 1);
        assert!(list.get(&MuValue::uint(1)).is_none());

        // reviving the slot clears the tombstone
        list.set(MuValue::uint(1), MuValue::string("B")).unwrap();
        assert_eq!(list.tombstones(), 0);
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn test_delete_last_trims_trailing_tombstones() {
        let mut list = list_of(&["a", "b", "c", "d"]);
        list.set(MuValue::uint(2), MuValue::nil()).unwrap();
        list.set(MuValue::uint(1), MuValue::nil()).unwrap();
        assert_eq!(list.tombstones(), 2);
        list.set(MuValue::uint(3), MuValue::nil()).unwrap();
        assert_eq!(list.extent(), 1);
        assert_eq!(list.tombstones(), 0);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_growth_with_tombstones_upgrades() {
        let mut list = list_of(&["a", "b", "c", "d"]);
        list.set(MuValue::uint(0), MuValue::nil()).unwrap();
        let r = list
            .set(MuValue::uint(4), MuValue::string("e"))
            .unwrap();
        assert!(matches!(r, MuInsertResult::NeedConvertToPairs(_, _)));
    }

    #[test]
    fn test_sparse_key_upgrades() {
        let mut list = list_of(&["a"]);
        let r = list
            .set(MuValue::uint(5), MuValue::string("x"))
            .unwrap();
        assert!(matches!(r, MuInsertResult::NeedConvertToPairs(_, _)));
        let r = list.set(MuValue::float(0.5), MuValue::nil()).unwrap();
        assert!(matches!(r, MuInsertResult::Success));
    }

    #[test]
    fn test_block_moves() {
        let mut list = list_of(&["a", "b", "c"]);
        list.insert_at(1, MuValue::string("v")).unwrap();
        assert_eq!(list.get(&MuValue::uint(1)), Some(MuValue::string("v")));
        assert_eq!(list.get(&MuValue::uint(3)), Some(MuValue::string("c")));

        let first = list.remove_at(0).unwrap();
        assert_eq!(first, Some(MuValue::string("a")));
        assert_eq!(list.len(), 3);
        assert_eq!(list.get(&MuValue::uint(0)), Some(MuValue::string("v")));
    }

    #[test]
    fn test_next_skips_tombstones() {
        let mut list = list_of(&["a", "b", "c"]);
        list.set(MuValue::uint(1), MuValue::nil()).unwrap();
        let mut cursor = 0;
        let mut keys = Vec::new();
        while let Some((k, _)) = list.next(&mut cursor) {
            keys.push(k.get_uint());
        }
        assert_eq!(keys, vec![0, 2]);
    }
}
