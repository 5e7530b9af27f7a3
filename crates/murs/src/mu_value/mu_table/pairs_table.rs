use tracing::trace;

use crate::mu_runtime::MuResult;
use crate::mu_value::MuValue;

use super::range_array::RangeArray;
use super::value_list::ValueList;
use super::{MuInsertResult, MuTableImpl, check_len, ncap, npw2_for};

/// Open-addressed key/value slots.
///
/// A slot is empty when its key is nil and a tombstone when its key is set but
/// its value is nil. Tombstones keep probe chains intact until the next rehash.
pub struct PairsTable {
    slots: Vec<(MuValue, MuValue)>,
    len: usize,
    nils: usize,
    npw2: u8,
}

fn empty_slots(npw2: u8) -> MuResult<Vec<(MuValue, MuValue)>> {
    let capacity = 1usize << npw2;
    let mut slots = Vec::new();
    slots.try_reserve_exact(capacity)?;
    slots.resize_with(capacity, Default::default);
    Ok(slots)
}

/// Slot holding `key`, or the empty slot that ends its probe chain
#[inline]
fn probe(slots: &[(MuValue, MuValue)], key: &MuValue) -> usize {
    let mask = slots.len() - 1;
    let mut i = key.hash_key() as usize;
    loop {
        let slot = i & mask;
        let existing = &slots[slot].0;
        if existing.is_nil() || existing == key {
            return slot;
        }
        i = i.wrapping_mul(5).wrapping_add(1);
    }
}

impl PairsTable {
    /// Empty table sized for `count` entries
    #[cfg(test)]
    pub fn with_entries(count: usize) -> MuResult<Self> {
        Self::with_npw2(npw2_for(ncap(count)))
    }

    fn with_npw2(npw2: u8) -> MuResult<Self> {
        Ok(Self {
            slots: empty_slots(npw2)?,
            len: 0,
            nils: 0,
            npw2,
        })
    }

    pub fn from_range(range: &RangeArray) -> MuResult<Self> {
        let npw2 = range.npw2().max(npw2_for(ncap(range.len() + 1)));
        let mut pairs = Self::with_npw2(npw2)?;
        let mut cursor = 0;
        while let Some((key, value)) = range.next(&mut cursor) {
            pairs.place(key, value);
        }
        Ok(pairs)
    }

    /// Move the live entries out of a list
    pub fn from_list(list: &mut ValueList) -> MuResult<Self> {
        let npw2 = list.npw2().max(npw2_for(ncap(list.len() + 1)));
        let mut pairs = Self::with_npw2(npw2)?;
        for (index, value) in std::mem::take(&mut list.array).into_iter().enumerate() {
            if !value.is_nil() {
                pairs.place(MuValue::uint(index as u64), value);
            }
        }
        Ok(pairs)
    }

    /// Put a key known to be absent; room is the caller's concern
    fn place(&mut self, key: MuValue, value: MuValue) {
        let slot = probe(&self.slots, &key);
        self.slots[slot] = (key, value);
        self.len += 1;
    }

    #[inline(always)]
    fn needs_grow(&self) -> bool {
        ncap(self.len + self.nils + 1) > self.capacity()
    }

    /// Rebuild with room for `count` live entries, dropping tombstones
    fn rehash(&mut self, count: usize) -> MuResult<()> {
        let npw2 = npw2_for(ncap(count));
        let old = std::mem::replace(&mut self.slots, empty_slots(npw2)?);
        self.npw2 = npw2;
        self.len = 0;
        self.nils = 0;
        for (key, value) in old {
            if !key.is_nil() && !value.is_nil() {
                self.place(key, value);
            }
        }
        trace!(
            target: "murs::table",
            capacity = self.capacity(),
            len = self.len,
            "pairs rehashed"
        );
        Ok(())
    }

    /// Rebuild with every integer key `k` selected by `moved` replaced by `k + 1`
    /// (or `k - 1` when `up` is false)
    fn renumber(&mut self, up: bool, moved: impl Fn(usize) -> bool) -> MuResult<()> {
        let npw2 = self.npw2.max(npw2_for(ncap(self.len + 1)));
        let old = std::mem::replace(&mut self.slots, empty_slots(npw2)?);
        self.npw2 = npw2;
        self.len = 0;
        self.nils = 0;
        for (key, value) in old {
            if key.is_nil() || value.is_nil() {
                continue;
            }
            let key = match key.as_index() {
                Some(k) if moved(k) => {
                    let shifted = if up { k + 1 } else { k - 1 };
                    MuValue::uint(shifted as u64)
                }
                _ => key,
            };
            self.place(key, value);
        }
        trace!(target: "murs::table", capacity = self.capacity(), "pairs renumbered");
        Ok(())
    }
}

impl MuTableImpl for PairsTable {
    fn get(&self, key: &MuValue) -> Option<MuValue> {
        let (k, v) = &self.slots[probe(&self.slots, key)];
        (!k.is_nil() && !v.is_nil()).then(|| v.clone())
    }

    fn set(&mut self, key: MuValue, value: MuValue) -> MuResult<MuInsertResult> {
        if value.is_nil() {
            let slot = probe(&self.slots, &key);
            let entry = &mut self.slots[slot];
            if !entry.0.is_nil() && !entry.1.is_nil() {
                entry.1 = value;
                self.len -= 1;
                self.nils += 1;
            }
            return Ok(MuInsertResult::Success);
        }

        if self.needs_grow() {
            self.rehash(self.len + 1)?;
        }

        let slot = probe(&self.slots, &key);
        let entry = &mut self.slots[slot];
        if entry.0.is_nil() {
            check_len(self.len + 1)?;
            *entry = (key, value);
            self.len += 1;
        } else if entry.1.is_nil() {
            check_len(self.len + 1)?;
            entry.1 = value;
            self.nils -= 1;
            self.len += 1;
        } else {
            entry.1 = value;
        }
        Ok(MuInsertResult::Success)
    }

    fn insert_at(&mut self, index: usize, value: MuValue) -> MuResult<MuInsertResult> {
        check_len(self.len + 1)?;
        self.renumber(true, |k| k >= index)?;
        self.set(MuValue::uint(index as u64), value)
    }

    fn remove_at(&mut self, index: usize) -> MuResult<Option<MuValue>> {
        let key = MuValue::uint(index as u64);
        let value = self.get(&key).unwrap_or_default();
        self.set(key, MuValue::nil())?;
        self.renumber(false, |k| k > index)?;
        Ok(Some(value))
    }

    fn next(&self, cursor: &mut usize) -> Option<(MuValue, MuValue)> {
        while let Some((key, value)) = self.slots.get(*cursor) {
            *cursor += 1;
            if !key.is_nil() && !value.is_nil() {
                return Some((key.clone(), value.clone()));
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
