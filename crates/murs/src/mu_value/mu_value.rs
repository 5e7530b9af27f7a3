// MuValue - one tagged 64-bit word per value
//
// Tag layout (low 3 bits):
// - 0: nil, the whole word is zero
// - 1: number, the remaining bits are an f64 with its 3 low mantissa bits cleared
// - 2: text, pointer to an Rc<MuString>
// - 3: function, pointer to an Rc<MuFunction>
// - 6: table, pointer to an Rc<RefCell<MuTable>>
// - 7: frozen table, same pointer seen through a read-only handle
//
// Heap payloads are 8-aligned so the pointer bits never overlap the tag.
// Copying a word bumps the strong count of its payload, dropping it releases it.
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::rc::Rc;

use crate::mu_runtime::MuResult;
use crate::mu_runtime::mu_limits::{MU_DEFAULT_DEPTH, MU_NUM_EXACT_LIMIT};
use crate::mu_value::mu_function::MuFunction;
use crate::mu_value::mu_num;
use crate::mu_value::mu_string::{self, MuString};
use crate::mu_value::mu_table::{MuTable, TableRef};

// ============ Type tags ============
pub const MU_TNIL: u64 = 0;
pub const MU_TNUM: u64 = 1;
pub const MU_TSTR: u64 = 2;
pub const MU_TFN: u64 = 3;
pub const MU_TTBL: u64 = 6;
pub const MU_TRTBL: u64 = 7;

pub const MU_TAG_MASK: u64 = 0x7;

/// Coarse kind of a value, frozen tables reported separately
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MuValueKind {
    Nil,
    Number,
    Text,
    Table,
    FrozenTable,
    Function,
}

impl MuValueKind {
    pub fn name(self) -> &'static str {
        match self {
            MuValueKind::Nil => "nil",
            MuValueKind::Number => "num",
            MuValueKind::Text => "str",
            MuValueKind::Table | MuValueKind::FrozenTable => "tbl",
            MuValueKind::Function => "fn",
        }
    }
}

/// A Mu value. Holding one keeps its heap payload alive.
///
/// Values are confined to the thread that created them.
#[repr(transparent)]
pub struct MuValue {
    bits: u64,
    _not_send: PhantomData<*const ()>,
}

impl MuValue {
    #[inline(always)]
    const fn from_bits(bits: u64) -> Self {
        MuValue {
            bits,
            _not_send: PhantomData,
        }
    }

    #[inline(always)]
    pub const fn nil() -> Self {
        Self::from_bits(MU_TNIL)
    }

    /// Encode a float. The 3 least significant mantissa bits are dropped.
    #[inline(always)]
    pub fn float(n: f64) -> Self {
        Self::from_bits((n.to_bits() & !MU_TAG_MASK) | MU_TNUM)
    }

    #[inline(always)]
    pub fn uint(n: u64) -> Self {
        Self::float(n as f64)
    }

    #[inline(always)]
    pub fn int(n: i64) -> Self {
        Self::float(n as f64)
    }

    /// Intern `s` and wrap it as a text value
    pub fn string(s: &str) -> Self {
        Self::bytes(s.as_bytes())
    }

    pub fn bytes(b: &[u8]) -> Self {
        Self::from_mu_string(mu_string::intern(b))
    }

    pub(crate) fn from_mu_string(s: Rc<MuString>) -> Self {
        Self::from_rc(s, MU_TSTR)
    }

    pub fn table(t: TableRef) -> Self {
        let tag = if t.is_frozen() { MU_TRTBL } else { MU_TTBL };
        Self::from_rc(t.into_inner(), tag)
    }

    pub fn function(f: MuFunction) -> Self {
        Self::from_rc(Rc::new(f), MU_TFN)
    }

    #[inline(always)]
    fn from_rc<T>(rc: Rc<T>, tag: u64) -> Self {
        let raw = Rc::into_raw(rc) as usize as u64;
        debug_assert_eq!(raw & MU_TAG_MASK, 0, "heap payload must be 8-aligned");
        Self::from_bits(raw | tag)
    }

    // ============ Tag checks ============

    #[inline(always)]
    pub(crate) fn tag(&self) -> u64 {
        self.bits & MU_TAG_MASK
    }

    #[inline(always)]
    pub(crate) fn raw_bits(&self) -> u64 {
        self.bits
    }

    #[inline(always)]
    fn payload<T>(&self) -> *const T {
        (self.bits & !MU_TAG_MASK) as usize as *const T
    }

    #[inline(always)]
    pub fn is_nil(&self) -> bool {
        self.bits == MU_TNIL
    }

    #[inline(always)]
    pub fn is_num(&self) -> bool {
        self.tag() == MU_TNUM
    }

    #[inline(always)]
    pub fn is_str(&self) -> bool {
        self.tag() == MU_TSTR
    }

    #[inline(always)]
    pub fn is_fn(&self) -> bool {
        self.tag() == MU_TFN
    }

    /// True for both mutable and frozen table handles
    #[inline(always)]
    pub fn is_tbl(&self) -> bool {
        self.bits & MU_TTBL == MU_TTBL
    }

    #[inline(always)]
    pub fn is_frozen_tbl(&self) -> bool {
        self.tag() == MU_TRTBL
    }

    pub fn kind(&self) -> MuValueKind {
        match self.tag() {
            MU_TNUM => MuValueKind::Number,
            MU_TSTR => MuValueKind::Text,
            MU_TFN => MuValueKind::Function,
            MU_TTBL => MuValueKind::Table,
            MU_TRTBL => MuValueKind::FrozenTable,
            _ => MuValueKind::Nil,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }

    // ============ Numbers ============

    /// Decode a number. Only meaningful when `is_num()`.
    #[inline(always)]
    pub fn get_float(&self) -> f64 {
        debug_assert!(self.is_num(), "get_float on {}", self.type_name());
        f64::from_bits(self.bits & !MU_TAG_MASK)
    }

    /// Truncating conversion, saturating at the integer bounds
    #[inline(always)]
    pub fn get_uint(&self) -> u64 {
        self.get_float() as u64
    }

    #[inline(always)]
    pub fn get_int(&self) -> i64 {
        self.get_float() as i64
    }

    pub fn clamp_uint(&self, lower: u64, upper: u64) -> u64 {
        self.get_uint().clamp(lower, upper)
    }

    pub fn clamp_int(&self, lower: i64, upper: i64) -> i64 {
        self.get_int().clamp(lower, upper)
    }

    pub fn as_float(&self) -> Option<f64> {
        self.is_num().then(|| self.get_float())
    }

    /// Position this number denotes as a table key: a non-negative integer
    /// small enough to be represented exactly.
    pub fn as_index(&self) -> Option<usize> {
        if !self.is_num() {
            return None;
        }
        let n = self.get_float();
        if n >= 0.0 && n < MU_NUM_EXACT_LIMIT as f64 && n.fract() == 0.0 {
            Some(n as usize)
        } else {
            None
        }
    }

    /// Numeric reading of any value, see `mu_num::from_mu`
    pub fn to_num(&self) -> Option<MuValue> {
        mu_num::from_mu(self)
    }

    pub fn num_cmp(&self, other: &MuValue) -> Ordering {
        self.get_float().total_cmp(&other.get_float())
    }

    pub fn num_add(&self, other: &MuValue) -> MuValue {
        MuValue::float(self.get_float() + other.get_float())
    }

    pub fn num_sub(&self, other: &MuValue) -> MuValue {
        MuValue::float(self.get_float() - other.get_float())
    }

    // ============ Heap payloads ============

    pub fn as_mu_string(&self) -> Option<&MuString> {
        if self.is_str() {
            // Safety: tag says the payload is a live MuString kept by this word
            Some(unsafe { &*self.payload::<MuString>() })
        } else {
            None
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.as_mu_string().map(MuString::as_bytes)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_mu_string().and_then(MuString::as_str)
    }

    /// New handle to the table this value refers to
    pub fn as_table(&self) -> Option<TableRef> {
        if !self.is_tbl() {
            return None;
        }
        let ptr = self.payload::<RefCell<MuTable>>();
        // Safety: the word owns one strong count, so the allocation is live
        let inner = unsafe {
            Rc::increment_strong_count(ptr);
            Rc::from_raw(ptr)
        };
        Some(TableRef::from_inner(inner, self.is_frozen_tbl()))
    }

    /// Consume the value, handing its strong count to the returned handle
    pub fn into_table(self) -> Result<TableRef, MuValue> {
        if !self.is_tbl() {
            return Err(self);
        }
        let this = ManuallyDrop::new(self);
        // Safety: ownership of the count moves from the word to the Rc
        let inner = unsafe { Rc::from_raw(this.payload::<RefCell<MuTable>>()) };
        Ok(TableRef::from_inner(inner, this.is_frozen_tbl()))
    }

    pub fn as_function(&self) -> Option<Rc<MuFunction>> {
        if !self.is_fn() {
            return None;
        }
        let ptr = self.payload::<MuFunction>();
        // Safety: see as_table
        Some(unsafe {
            Rc::increment_strong_count(ptr);
            Rc::from_raw(ptr)
        })
    }

    /// Address of the heap payload, 0 for immediates
    pub fn addr(&self) -> usize {
        match self.tag() {
            MU_TNIL | MU_TNUM => 0,
            _ => (self.bits & !MU_TAG_MASK) as usize,
        }
    }

    /// Hash used to place this value as a table key.
    ///
    /// Numbers use the numeric hash, texts their cached content hash and
    /// objects a mix of their address. Values that compare equal hash equal.
    pub fn hash_key(&self) -> u64 {
        match self.tag() {
            MU_TNIL => 0,
            MU_TNUM => mu_num::hash(self.get_float()),
            MU_TSTR => self.as_mu_string().map_or(0, MuString::cached_hash),
            _ => {
                let h = (self.bits >> 3).wrapping_mul(0x9E37_79B9_7F4A_7C15);
                h ^ (h >> 32)
            }
        }
    }

    /// Canonical text of this value, nested tables expanded up to `depth`
    pub fn repr(&self, depth: usize) -> MuResult<String> {
        let mut out = String::new();
        self.repr_into(&mut out, depth)?;
        Ok(out)
    }
}

impl Default for MuValue {
    fn default() -> Self {
        MuValue::nil()
    }
}

impl Clone for MuValue {
    #[inline]
    fn clone(&self) -> Self {
        // Safety: every heap tag carries a live strong count owned by self
        unsafe {
            match self.tag() {
                MU_TSTR => Rc::increment_strong_count(self.payload::<MuString>()),
                MU_TFN => Rc::increment_strong_count(self.payload::<MuFunction>()),
                MU_TTBL | MU_TRTBL => {
                    Rc::increment_strong_count(self.payload::<RefCell<MuTable>>())
                }
                _ => {}
            }
        }
        Self::from_bits(self.bits)
    }
}

impl Drop for MuValue {
    #[inline]
    fn drop(&mut self) {
        // Safety: releases the count taken in from_rc or clone
        unsafe {
            match self.tag() {
                MU_TSTR => Rc::decrement_strong_count(self.payload::<MuString>()),
                MU_TFN => Rc::decrement_strong_count(self.payload::<MuFunction>()),
                MU_TTBL | MU_TRTBL => {
                    Rc::decrement_strong_count(self.payload::<RefCell<MuTable>>())
                }
                _ => {}
            }
        }
    }
}

impl PartialEq for MuValue {
    fn eq(&self, other: &Self) -> bool {
        if self.bits == other.bits {
            return true;
        }
        match (self.as_mu_string(), other.as_mu_string()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for MuValue {}

impl Hash for MuValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_key());
    }
}

impl fmt::Debug for MuValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            MuValueKind::Nil => write!(f, "nil"),
            MuValueKind::Number => write!(f, "{}", mu_num::repr(self.get_float())),
            MuValueKind::Text => {
                let mut out = String::new();
                mu_string::repr_into(self.as_bytes().unwrap_or_default(), &mut out);
                f.write_str(&out)
            }
            MuValueKind::Table => write!(f, "<tbl 0x{:x}>", self.addr()),
            MuValueKind::FrozenTable => write!(f, "<rtbl 0x{:x}>", self.addr()),
            MuValueKind::Function => write!(f, "<fn 0x{:x}>", self.addr()),
        }
    }
}

impl fmt::Display for MuValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => f.write_str(s),
            None => f.write_str(&self.repr(MU_DEFAULT_DEPTH).map_err(|_| fmt::Error)?),
        }
    }
}

impl From<f64> for MuValue {
    fn from(n: f64) -> Self {
        MuValue::float(n)
    }
}

impl From<i64> for MuValue {
    fn from(n: i64) -> Self {
        MuValue::int(n)
    }
}

impl From<u64> for MuValue {
    fn from(n: u64) -> Self {
        MuValue::uint(n)
    }
}

impl From<usize> for MuValue {
    fn from(n: usize) -> Self {
        MuValue::uint(n as u64)
    }
}

impl From<&str> for MuValue {
    fn from(s: &str) -> Self {
        MuValue::string(s)
    }
}

impl From<TableRef> for MuValue {
    fn from(t: TableRef) -> Self {
        MuValue::table(t)
    }
}

impl<T: Into<MuValue>> From<Option<T>> for MuValue {
    fn from(v: Option<T>) -> Self {
        v.map_or_else(MuValue::nil, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_size() {
        assert_eq!(std::mem::size_of::<MuValue>(), 8);
        assert_eq!(std::mem::size_of::<Option<TableRef>>(), 16);
    }

    #[test]
    fn test_nil_is_zero_word() {
        let v = MuValue::nil();
        assert!(v.is_nil());
        assert_eq!(v.raw_bits(), 0);
        assert_eq!(v.kind(), MuValueKind::Nil);
        assert_eq!(MuValue::default(), v);
    }

    #[test]
    fn test_number_encoding() {
        for n in [0u64, 1, 2, 42, 1 << 20, (1 << 50) - 1] {
            let v = MuValue::uint(n);
            assert!(v.is_num());
            assert_eq!(v.get_uint(), n);
            assert_eq!(v.as_index(), Some(n as usize));
        }
        assert_eq!(MuValue::int(-7).get_int(), -7);
        assert_eq!(MuValue::float(0.5).get_float(), 0.5);
        assert!(MuValue::float(-1.0).as_index().is_none());
        assert!(MuValue::float(1.5).as_index().is_none());
    }

    #[test]
    fn test_number_truncation() {
        // the low 3 mantissa bits do not survive
        let n = f64::from_bits(1.0f64.to_bits() | 0x7);
        let v = MuValue::float(n);
        assert_eq!(v.get_float(), 1.0);
        assert_eq!(v, MuValue::uint(1));
    }

    #[test]
    fn test_clamp() {
        let v = MuValue::float(-5.5);
        assert_eq!(v.clamp_uint(0, 10), 0);
        assert_eq!(v.clamp_int(-3, 3), -3);
        assert_eq!(MuValue::uint(1000).clamp_uint(0, 10), 10);
    }

    #[test]
    fn test_to_num() {
        assert_eq!(MuValue::nil().to_num(), Some(MuValue::uint(0)));
        assert_eq!(MuValue::string("0b11").to_num(), Some(MuValue::uint(3)));
        assert!(MuValue::table(TableRef::new()).to_num().is_none());
    }

    #[test]
    fn test_text_equality() {
        let a = MuValue::string("hello");
        let b = MuValue::bytes(b"hello");
        assert!(a.is_str());
        assert_eq!(a, b);
        assert_eq!(a.hash_key(), b.hash_key());
        assert_ne!(a, MuValue::string("world"));
        assert_eq!(a.as_str(), Some("hello"));
        assert_ne!(a, MuValue::uint(5));
    }

    #[test]
    fn test_refcounting() {
        let t = TableRef::new();
        let v = MuValue::table(t.clone());
        assert_eq!(t.ref_count(), 2);
        let w = v.clone();
        assert_eq!(t.ref_count(), 3);
        drop(v);
        drop(w);
        assert_eq!(t.ref_count(), 1);

        let v = MuValue::table(t.clone());
        let back = v.into_table().unwrap();
        assert_eq!(t.ref_count(), 2);
        assert!(back.ptr_eq(&t));
    }

    #[test]
    fn test_frozen_tag() {
        let t = TableRef::new();
        let v = MuValue::table(t.freeze());
        assert!(v.is_tbl());
        assert!(v.is_frozen_tbl());
        assert_eq!(v.kind(), MuValueKind::FrozenTable);
        assert!(v.as_table().unwrap().is_frozen());
        assert!(!MuValue::table(t.clone()).is_frozen_tbl());
        // a frozen and a mutable handle are distinct keys
        assert_ne!(MuValue::table(t.clone()), v);
        assert_eq!(MuValue::table(t.clone()), MuValue::table(t));
    }

    #[test]
    fn test_small_integer_hash() {
        for k in 0..64u64 {
            assert_eq!(MuValue::uint(k).hash_key(), k);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(MuValue::string("a b").to_string(), "a b");
        assert_eq!(MuValue::uint(3).to_string(), "3");
        assert_eq!(MuValue::nil().to_string(), "nil");
        assert_eq!(format!("{:?}", MuValue::string("a b")), "'a b'");
    }
}
