// MuTable - hybrid container that upgrades its layout on demand
//
// RANGE  -> no storage, keys 0..len map to offset + key
// LIST   -> dense array keyed 0..extent, nil slots are tombstones
// PAIRS  -> open-addressed key/value slots, tombstones keep their key
//
// Layouts only move forward; each one reports the insert it cannot take and
// the table migrates before retrying it.
mod pairs_table;
mod range_array;
mod table_iter;
mod table_ops;
mod table_ref;
mod table_repr;
mod value_list;

use tracing::debug;

use crate::mu_runtime::mu_limits::{MU_MAXLEN, MU_MINNPW2};
use crate::mu_runtime::{MuError, MuResult};
use crate::mu_value::MuValue;
use pairs_table::PairsTable;
use range_array::RangeArray;
use value_list::ValueList;

pub use table_iter::{TableCursor, TableIter};
pub use table_ref::TableRef;

/// Layout a table currently uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    Range,
    List,
    Pairs,
}

pub(crate) enum MuTableDetail {
    Range(RangeArray),
    List(ValueList),
    Pairs(PairsTable),
}

pub(crate) enum MuInsertResult {
    Success,
    NeedConvertToList(MuValue, MuValue),
    NeedConvertToPairs(MuValue, MuValue),
}

pub(crate) trait MuTableImpl {
    fn get(&self, key: &MuValue) -> Option<MuValue>;

    /// Store `value` under `key`; a nil value deletes
    fn set(&mut self, key: MuValue, value: MuValue) -> MuResult<MuInsertResult>;

    /// Store at `index` after moving integer keys >= index up by one
    fn insert_at(&mut self, index: usize, value: MuValue) -> MuResult<MuInsertResult>;

    /// Take `index` out and move integer keys above it down by one.
    /// `None` when the layout cannot do this in place.
    fn remove_at(&mut self, index: usize) -> MuResult<Option<MuValue>>;

    /// Next live entry at or after slot `*cursor`, advancing the cursor past it
    fn next(&self, cursor: &mut usize) -> Option<(MuValue, MuValue)>;

    fn len(&self) -> usize;

    fn tombstones(&self) -> usize;

    fn capacity(&self) -> usize;
}

/// Room needed to hold `count` entries at the pairs load factor
#[inline(always)]
pub(crate) fn ncap(count: usize) -> usize {
    count + (count >> 1)
}

/// Smallest power of two (as its log2, at least the minimum) holding `count`
pub(crate) fn npw2_for(count: usize) -> u8 {
    if count <= 1 << MU_MINNPW2 {
        MU_MINNPW2
    } else {
        (usize::BITS - (count - 1).leading_zeros()) as u8
    }
}

#[inline]
pub(crate) fn check_len(len: usize) -> MuResult<()> {
    if len > MU_MAXLEN {
        return Err(MuError::LengthOverflow("table"));
    }
    Ok(())
}

#[repr(align(8))]
pub(crate) struct MuTable {
    pub(crate) detail: MuTableDetail,
    pub(crate) tail: MuValue,
}

impl MuTable {
    /// Table with room for `npw2` slots as a power of two
    pub fn new(npw2: u8) -> Self {
        MuTable {
            detail: MuTableDetail::Range(RangeArray::new(npw2)),
            tail: MuValue::nil(),
        }
    }

    fn as_impl(&self) -> &dyn MuTableImpl {
        match &self.detail {
            MuTableDetail::Range(range) => range,
            MuTableDetail::List(list) => list,
            MuTableDetail::Pairs(pairs) => pairs,
        }
    }

    fn as_impl_mut(&mut self) -> &mut dyn MuTableImpl {
        match &mut self.detail {
            MuTableDetail::Range(range) => range,
            MuTableDetail::List(list) => list,
            MuTableDetail::Pairs(pairs) => pairs,
        }
    }

    pub fn state(&self) -> TableState {
        match &self.detail {
            MuTableDetail::Range(_) => TableState::Range,
            MuTableDetail::List(_) => TableState::List,
            MuTableDetail::Pairs(_) => TableState::Pairs,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.as_impl().len()
    }

    #[inline]
    pub fn tombstones(&self) -> usize {
        self.as_impl().tombstones()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.as_impl().capacity()
    }

    /// Dense tables print as plain value lists
    pub fn is_dense(&self) -> bool {
        match &self.detail {
            MuTableDetail::Range(_) => true,
            MuTableDetail::List(list) => list.tombstones() == 0,
            MuTableDetail::Pairs(_) => false,
        }
    }

    #[inline]
    pub fn get(&self, key: &MuValue) -> Option<MuValue> {
        if key.is_nil() {
            return None;
        }
        self.as_impl().get(key)
    }

    #[inline]
    pub fn contains(&self, key: &MuValue) -> bool {
        self.get(key).is_some()
    }

    #[inline]
    pub fn next(&self, cursor: &mut usize) -> Option<(MuValue, MuValue)> {
        self.as_impl().next(cursor)
    }

    /// Local insert; a nil key is ignored and a nil value deletes
    pub fn raw_set(&mut self, key: MuValue, value: MuValue) -> MuResult<()> {
        if key.is_nil() {
            return Ok(());
        }
        let mut result = self.as_impl_mut().set(key, value)?;
        loop {
            result = match result {
                MuInsertResult::Success => return Ok(()),
                MuInsertResult::NeedConvertToList(key, value) => {
                    self.migrate_to_list()?;
                    self.as_impl_mut().set(key, value)?
                }
                MuInsertResult::NeedConvertToPairs(key, value) => {
                    self.migrate_to_pairs()?;
                    self.as_impl_mut().set(key, value)?
                }
            };
        }
    }

    pub fn insert_at(&mut self, index: usize, value: MuValue) -> MuResult<()> {
        let mut result = self.as_impl_mut().insert_at(index, value)?;
        loop {
            result = match result {
                MuInsertResult::Success => return Ok(()),
                MuInsertResult::NeedConvertToList(_, value) => {
                    self.migrate_to_list()?;
                    self.as_impl_mut().insert_at(index, value)?
                }
                MuInsertResult::NeedConvertToPairs(_, value) => {
                    self.migrate_to_pairs()?;
                    self.as_impl_mut().insert_at(index, value)?
                }
            };
        }
    }

    pub fn remove_at(&mut self, index: usize) -> MuResult<MuValue> {
        if let Some(value) = self.as_impl_mut().remove_at(index)? {
            return Ok(value);
        }
        self.migrate_to_list()?;
        Ok(self.as_impl_mut().remove_at(index)?.unwrap_or_default())
    }

    fn migrate_to_list(&mut self) -> MuResult<()> {
        if let MuTableDetail::Range(range) = &self.detail {
            let list = ValueList::from_range(range)?;
            debug!(target: "murs::table", len = list.len(), "range -> list");
            self.detail = MuTableDetail::List(list);
        }
        Ok(())
    }

    fn migrate_to_pairs(&mut self) -> MuResult<()> {
        let pairs = match &mut self.detail {
            MuTableDetail::Range(range) => PairsTable::from_range(range)?,
            MuTableDetail::List(list) => PairsTable::from_list(list)?,
            MuTableDetail::Pairs(_) => return Ok(()),
        };
        debug!(
            target: "murs::table",
            len = pairs.len(),
            capacity = pairs.capacity(),
            "-> pairs"
        );
        self.detail = MuTableDetail::Pairs(pairs);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: u64) -> MuValue {
        MuValue::uint(n)
    }

    #[test]
    fn test_sizing() {
        assert_eq!(ncap(4), 6);
        assert_eq!(npw2_for(0), MU_MINNPW2);
        assert_eq!(npw2_for(4), 2);
        assert_eq!(npw2_for(5), 3);
        assert_eq!(npw2_for(8), 3);
        assert_eq!(npw2_for(9), 4);
        assert!(check_len(MU_MAXLEN).is_ok());
        assert_eq!(
            check_len(MU_MAXLEN + 1),
            Err(MuError::LengthOverflow("table"))
        );
    }

    #[test]
    fn test_range_to_list_to_pairs() {
        let mut t = MuTable::new(MU_MINNPW2);
        for i in 0..10 {
            t.raw_set(num(i), num(i)).unwrap();
        }
        assert_eq!(t.state(), TableState::Range);
        assert_eq!(t.len(), 10);

        t.raw_set(num(3), MuValue::string("x")).unwrap();
        assert_eq!(t.state(), TableState::List);
        assert_eq!(t.get(&num(3)), Some(MuValue::string("x")));
        assert_eq!(t.get(&num(9)), Some(num(9)));

        t.raw_set(MuValue::string("k"), num(1)).unwrap();
        assert_eq!(t.state(), TableState::Pairs);
        assert_eq!(t.len(), 11);
        for i in 0..10 {
            assert!(t.contains(&num(i)));
        }
    }

    #[test]
    fn test_nil_key_ignored() {
        let mut t = MuTable::new(MU_MINNPW2);
        t.raw_set(MuValue::nil(), num(1)).unwrap();
        assert_eq!(t.len(), 0);
        assert!(t.get(&MuValue::nil()).is_none());
    }

    #[test]
    fn test_insert_and_remove_at_shift() {
        let mut t = MuTable::new(MU_MINNPW2);
        for s in ["a", "b", "c"] {
            let len = t.len() as u64;
            t.raw_set(num(len), MuValue::string(s)).unwrap();
        }
        t.insert_at(1, MuValue::string("v")).unwrap();
        assert_eq!(t.get(&num(1)), Some(MuValue::string("v")));
        assert_eq!(t.get(&num(3)), Some(MuValue::string("c")));

        assert_eq!(t.remove_at(0).unwrap(), MuValue::string("a"));
        assert_eq!(t.len(), 3);
        assert_eq!(t.get(&num(0)), Some(MuValue::string("v")));
        assert!(t.get(&num(3)).is_none());
    }

    #[test]
    fn test_range_interior_remove_materializes() {
        let mut t = MuTable::new(MU_MINNPW2);
        for i in 0..5 {
            t.raw_set(num(i), num(i)).unwrap();
        }
        assert_eq!(t.remove_at(4).unwrap(), num(4));
        assert_eq!(t.state(), TableState::Range);

        assert_eq!(t.remove_at(1).unwrap(), num(1));
        assert_eq!(t.state(), TableState::List);
        assert_eq!(t.get(&num(1)), Some(num(2)));
        assert_eq!(t.len(), 3);
    }
}
