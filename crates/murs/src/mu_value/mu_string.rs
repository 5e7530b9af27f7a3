use ahash::RandomState;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Write;
use std::hash::{BuildHasher, Hash, Hasher};
use std::rc::{Rc, Weak};

/// Immutable byte text with its content hash computed once at creation
#[repr(align(8))]
pub struct MuString {
    hash: u64,
    data: Box<[u8]>,
}

impl MuString {
    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    #[inline(always)]
    pub fn cached_hash(&self) -> u64 {
        self.hash
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl PartialEq for MuString {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.data == other.data
    }
}

impl Eq for MuString {}

// Fixed seeds keep text hashes stable for the whole process
const INTERN_SEEDS: [u64; 4] = [
    0x243F_6A88_85A3_08D3,
    0x1319_8A2E_0370_7344,
    0xA409_3822_299F_31D0,
    0x082E_FA98_EC4E_6C89,
];

/// Text interner - identical bytes share one MuString while any value holds it
/// - Content hash -> weak entries, so the interner never keeps text alive
/// - Dead entries are pruned when their bucket is next visited
pub struct StringInterner {
    map: HashMap<u64, Vec<Weak<MuString>>, RandomState>,
    hashbuilder: RandomState,
}

impl StringInterner {
    pub fn new() -> Self {
        Self {
            map: HashMap::with_capacity_and_hasher(256, RandomState::new()),
            hashbuilder: RandomState::with_seeds(
                INTERN_SEEDS[0],
                INTERN_SEEDS[1],
                INTERN_SEEDS[2],
                INTERN_SEEDS[3],
            ),
        }
    }

    /// Return the live text for `bytes`, creating it when none exists
    pub fn intern(&mut self, bytes: &[u8]) -> Rc<MuString> {
        let hash = self.hash_bytes(bytes);
        let entries = self.map.entry(hash).or_default();
        entries.retain(|entry| entry.strong_count() > 0);

        for entry in entries.iter() {
            if let Some(existing) = entry.upgrade()
                && *existing.data == *bytes
            {
                return existing;
            }
        }

        let created = Rc::new(MuString {
            hash,
            data: bytes.into(),
        });
        entries.push(Rc::downgrade(&created));
        created
    }

    #[inline(always)]
    fn hash_bytes(&self, bytes: &[u8]) -> u64 {
        let mut hasher = self.hashbuilder.build_hasher();
        bytes.hash(&mut hasher);
        hasher.finish()
    }

    /// Number of texts still alive
    pub fn live_count(&self) -> usize {
        self.map
            .values()
            .flatten()
            .filter(|entry| entry.strong_count() > 0)
            .count()
    }

    /// Drop every bucket whose texts are all gone
    pub fn prune(&mut self) {
        self.map.retain(|_, entries| {
            entries.retain(|entry| entry.strong_count() > 0);
            !entries.is_empty()
        });
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

thread_local! {
    static INTERNER: RefCell<StringInterner> = RefCell::new(StringInterner::new());
}

/// Intern through the thread's interner
pub(crate) fn intern(bytes: &[u8]) -> Rc<MuString> {
    INTERNER.with(|interner| interner.borrow_mut().intern(bytes))
}

/// Run `f` against the thread's interner
pub fn with_interner<R>(f: impl FnOnce(&mut StringInterner) -> R) -> R {
    INTERNER.with(|interner| f(&mut interner.borrow_mut()))
}

// ============ Literal form ============

#[inline]
pub(crate) fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

#[inline]
pub(crate) fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// Words the value parser reads as something other than text
pub(crate) fn is_reserved_word(bytes: &[u8]) -> bool {
    matches!(bytes, b"nil" | b"inf" | b"nan")
}

/// True when `bytes` can be written without quotes and read back as text
pub fn is_bare(bytes: &[u8]) -> bool {
    match bytes.split_first() {
        Some((&first, rest)) => {
            is_ident_start(first)
                && rest.iter().all(|&c| is_ident_continue(c))
                && !is_reserved_word(bytes)
        }
        None => false,
    }
}

/// Append the literal form of a text to `out`
pub fn repr_into(bytes: &[u8], out: &mut String) {
    if is_bare(bytes) {
        out.extend(bytes.iter().map(|&c| c as char));
        return;
    }

    out.push('\'');
    for &c in bytes {
        match c {
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0 => out.push_str("\\0"),
            0x20..=0x7e => out.push(c as char),
            _ => {
                let _ = write!(out, "\\x{:02x}", c);
            }
        }
    }
    out.push('\'');
}

pub fn repr(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    repr_into(bytes, &mut out);
    out
}

fn hex_value(c: u8) -> Option<u8> {
    (c as char).to_digit(16).map(|d| d as u8)
}

/// Read a quoted text starting at `*pos` (which must hold the quote).
/// On success `*pos` points past the closing quote.
pub(crate) fn parse_quoted(text: &[u8], pos: &mut usize) -> Option<Vec<u8>> {
    let quote = *text.get(*pos)?;
    let mut p = *pos + 1;
    let mut out = Vec::new();

    loop {
        let c = *text.get(p)?;
        p += 1;
        if c == quote {
            break;
        }
        if c != b'\\' {
            out.push(c);
            continue;
        }

        let escaped = *text.get(p)?;
        p += 1;
        match escaped {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'0' => out.push(0),
            b'x' => {
                let hi = hex_value(*text.get(p)?)?;
                let lo = hex_value(*text.get(p + 1)?)?;
                out.push(hi << 4 | lo);
                p += 2;
            }
            b'\\' | b'\'' | b'"' => out.push(escaped),
            _ => return None,
        }
    }

    *pos = p;
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_shares_live_text() {
        let mut interner = StringInterner::new();
        let a = interner.intern(b"hello");
        let b = interner.intern(b"hello");
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(interner.live_count(), 1);

        let c = interner.intern(b"world");
        assert!(!Rc::ptr_eq(&a, &c));
        assert_eq!(interner.live_count(), 2);
    }

    #[test]
    fn test_intern_forgets_dead_text() {
        let mut interner = StringInterner::new();
        let hash = interner.intern(b"gone").cached_hash();
        assert_eq!(interner.live_count(), 0);
        interner.prune();
        assert!(interner.map.is_empty());

        // same content, same hash after recreation
        let again = interner.intern(b"gone");
        assert_eq!(again.cached_hash(), hash);
    }

    #[test]
    fn test_hash_is_stable_across_interners() {
        let a = StringInterner::new().intern(b"stable");
        let b = StringInterner::new().intern(b"stable");
        assert_eq!(a.cached_hash(), b.cached_hash());
        assert!(*a == *b);
    }

    #[test]
    fn test_bare_words() {
        assert!(is_bare(b"abc"));
        assert!(is_bare(b"_x1"));
        assert!(!is_bare(b""));
        assert!(!is_bare(b"1abc"));
        assert!(!is_bare(b"a b"));
        assert!(!is_bare(b"nil"));
        assert!(!is_bare(b"inf"));
    }

    #[test]
    fn test_repr_escapes() {
        assert_eq!(repr(b"abc"), "abc");
        assert_eq!(repr(b"a b"), "'a b'");
        assert_eq!(repr(b"it's"), "'it\\'s'");
        assert_eq!(repr(b"a\nb\t"), "'a\\nb\\t'");
        assert_eq!(repr(b"\x01\xff"), "'\\x01\\xff'");
        assert_eq!(repr(b"nil"), "'nil'");
        assert_eq!(repr(b""), "''");
    }

    #[test]
    fn test_parse_quoted() {
        let mut pos = 0;
        assert_eq!(parse_quoted(b"'a\\'b' rest", &mut pos), Some(b"a'b".to_vec()));
        assert_eq!(pos, 6);

        let mut pos = 0;
        assert_eq!(parse_quoted(b"\"\\x41\\n\"", &mut pos), Some(b"A\n".to_vec()));

        let mut pos = 0;
        assert_eq!(parse_quoted(b"'open", &mut pos), None);
        assert_eq!(pos, 0);

        let mut pos = 0;
        assert_eq!(parse_quoted(b"'\\q'", &mut pos), None);
    }

    #[test]
    fn test_repr_parses_back() {
        for text in [&b"plain"[..], b"with space", b"quote'd", b"\x00\x7f\x80", b"tab\there"] {
            let literal = repr(text);
            let mut pos = 0;
            let back = if literal.starts_with('\'') {
                parse_quoted(literal.as_bytes(), &mut pos).unwrap()
            } else {
                literal.as_bytes().to_vec()
            };
            assert_eq!(back, text);
        }
    }
}
