use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::mu_runtime::mu_limits::MU_MINNPW2;
use crate::mu_runtime::{MuError, MuResult};
use crate::mu_value::MuValue;

use super::{MuTable, TableState, check_len, ncap, npw2_for};

/// Shared handle to a table.
///
/// Handles are cheap to clone and all clones see the same entries. A frozen
/// handle reads like any other but every write through it fails with
/// `MuError::ConstViolation`.
#[derive(Clone)]
pub struct TableRef {
    inner: Rc<RefCell<MuTable>>,
    frozen: bool,
}

impl TableRef {
    pub(crate) fn from_inner(inner: Rc<RefCell<MuTable>>, frozen: bool) -> Self {
        TableRef { inner, frozen }
    }

    pub(crate) fn into_inner(self) -> Rc<RefCell<MuTable>> {
        self.inner
    }

    #[inline(always)]
    pub(crate) fn borrow(&self) -> std::cell::Ref<'_, MuTable> {
        self.inner.borrow()
    }

    /// Mutable access, refused through a frozen handle
    pub(crate) fn borrow_mut(&self) -> MuResult<std::cell::RefMut<'_, MuTable>> {
        if self.frozen {
            return Err(MuError::ConstViolation("table"));
        }
        Ok(self.inner.borrow_mut())
    }

    pub fn new() -> Self {
        Self::from_inner(Rc::new(RefCell::new(MuTable::new(MU_MINNPW2))), false)
    }

    /// Empty table pre-sized for `len` entries
    pub fn with_capacity(len: usize) -> MuResult<Self> {
        check_len(len)?;
        let table = MuTable::new(npw2_for(ncap(len)));
        Ok(Self::from_inner(Rc::new(RefCell::new(table)), false))
    }

    /// Empty table whose lookups fall through to `tail`
    pub fn with_tail(len: usize, tail: Option<TableRef>) -> MuResult<Self> {
        let table = Self::with_capacity(len)?;
        table.inner.borrow_mut().tail = MuValue::from(tail);
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.borrow().capacity()
    }

    pub fn tombstones(&self) -> usize {
        self.inner.borrow().tombstones()
    }

    pub fn state(&self) -> TableState {
        self.inner.borrow().state()
    }

    /// Read-only handle to the same table
    pub fn freeze(&self) -> TableRef {
        Self::from_inner(self.inner.clone(), true)
    }

    #[inline(always)]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Same table, regardless of either handle being frozen
    pub fn ptr_eq(&self, other: &TableRef) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.inner) as usize
    }

    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    pub fn tail(&self) -> Option<TableRef> {
        self.inner.borrow().tail.as_table()
    }

    pub fn set_tail(&self, tail: Option<TableRef>) -> MuResult<()> {
        let old = std::mem::replace(&mut self.borrow_mut()?.tail, MuValue::from(tail));
        drop(old);
        Ok(())
    }

    /// Value under `key` in this table or the first table down its tail chain
    /// that has one, nil otherwise
    pub fn lookup(&self, key: &MuValue) -> MuValue {
        if key.is_nil() {
            return MuValue::nil();
        }
        let mut current = Some(self.clone());
        while let Some(table) = current {
            let inner = table.inner.borrow();
            if let Some(value) = inner.get(key) {
                return value;
            }
            current = inner.tail.as_table();
        }
        MuValue::nil()
    }

    /// Own entry under `key`, ignoring the tail chain
    pub fn get(&self, key: &MuValue) -> MuValue {
        self.inner.borrow().get(key).unwrap_or_default()
    }

    pub fn contains_key(&self, key: &MuValue) -> bool {
        self.inner.borrow().contains(key)
    }

    /// Store `value` under `key` in this table only.
    ///
    /// A nil key is ignored and a nil value removes the entry.
    pub fn insert(&self, key: MuValue, value: MuValue) -> MuResult<()> {
        self.borrow_mut()?.raw_set(key, value)
    }

    /// Store `value` under the next integer key
    pub fn append(&self, value: MuValue) -> MuResult<()> {
        let mut table = self.borrow_mut()?;
        let key = MuValue::uint(table.len() as u64);
        table.raw_set(key, value)
    }

    /// Store `value` in the nearest table of the chain that already holds `key`.
    ///
    /// When that table is reached through a frozen handle, or no table holds the
    /// key, the value goes into this table instead.
    pub fn assign(&self, key: MuValue, value: MuValue) -> MuResult<()> {
        if key.is_nil() {
            return Ok(());
        }

        let mut readonly = false;
        let mut current = Some(self.clone());
        while let Some(table) = current {
            readonly |= table.frozen;
            if table.contains_key(&key) {
                if !readonly {
                    return table.insert(key, value);
                }
                break;
            }
            current = table.tail();
        }

        self.insert(key, value)
    }
}

impl Default for TableRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.inner.borrow();
        f.debug_struct("TableRef")
            .field("addr", &format_args!("0x{:x}", self.addr()))
            .field("frozen", &self.frozen)
            .field("state", &table.state())
            .field("len", &table.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: u64) -> MuValue {
        MuValue::uint(n)
    }

    #[test]
    fn test_insert_lookup() {
        let t = TableRef::new();
        t.insert(MuValue::string("a"), num(1)).unwrap();
        t.insert(num(0), MuValue::string("zero")).unwrap();
        assert_eq!(t.lookup(&MuValue::string("a")), num(1));
        assert_eq!(t.lookup(&num(0)), MuValue::string("zero"));
        assert!(t.lookup(&MuValue::string("b")).is_nil());
        assert!(t.lookup(&MuValue::nil()).is_nil());
        assert_eq!(t.len(), 2);

        t.insert(MuValue::string("a"), MuValue::nil()).unwrap();
        assert!(t.lookup(&MuValue::string("a")).is_nil());
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_with_capacity() {
        let t = TableRef::with_capacity(100).unwrap();
        assert!(t.capacity() >= 150);
        assert!(t.is_empty());
        assert_eq!(TableRef::new().capacity(), 4);
        assert!(matches!(
            TableRef::with_capacity(usize::MAX),
            Err(MuError::LengthOverflow(_))
        ));
    }

    #[test]
    fn test_append() {
        let t = TableRef::new();
        for i in 0..5 {
            t.append(num(i * 2)).unwrap();
        }
        assert_eq!(t.len(), 5);
        assert_eq!(t.lookup(&num(4)), num(8));
    }

    #[test]
    fn test_frozen_handle_rejects_writes() {
        let t = TableRef::new();
        t.insert(num(0), num(1)).unwrap();
        let frozen = t.freeze();
        assert!(frozen.is_frozen());
        assert!(frozen.ptr_eq(&t));
        assert_eq!(frozen.lookup(&num(0)), num(1));

        let err = MuError::ConstViolation("table");
        assert_eq!(frozen.insert(num(1), num(2)), Err(err));
        assert_eq!(frozen.append(num(2)), Err(err));
        assert_eq!(frozen.assign(num(0), num(5)), Err(err));
        assert_eq!(frozen.set_tail(None), Err(err));
        assert_eq!(t.len(), 1);

        // writes through the original handle show up in the frozen one
        t.insert(num(1), num(2)).unwrap();
        assert_eq!(frozen.len(), 2);
    }

    #[test]
    fn test_tail_keeps_frozen_bit() {
        let base = TableRef::new();
        let t = TableRef::with_tail(0, Some(base.freeze())).unwrap();
        let tail = t.tail().unwrap();
        assert!(tail.is_frozen());
        assert!(tail.ptr_eq(&base));
        drop(tail);

        t.set_tail(None).unwrap();
        assert!(t.tail().is_none());
        assert_eq!(base.ref_count(), 1);
    }
}
