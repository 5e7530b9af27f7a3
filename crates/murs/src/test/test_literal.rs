/// Literal text for whole value trees
use crate::mu_runtime::MuError;
use crate::mu_value::{MuValue, TableRef, TableState, mu_parse};

fn same_entries(a: &TableRef, b: &TableRef) {
    assert_eq!(a.len(), b.len());
    for (_, key, value) in a.iter() {
        let other = b.get(&key);
        match (value.as_table(), other.as_table()) {
            (Some(x), Some(y)) => same_entries(&x, &y),
            _ => assert_eq!(value, other, "{key:?}"),
        }
    }
}

#[test]
fn test_repr_parse_round_trip() {
    for literal in [
        "[]",
        "[a, b, c]",
        "[0, 1, 2, 3]",
        "[x: 1, y: [2, 3], 'two words': nil_not]",
        "[1: a, 3: b]",
        "[[[deep]], 'it\\'s', -0.5, inf]",
        "[0.5: half, -1: neg, '': empty]",
    ] {
        let t = TableRef::parse(literal).unwrap_or_else(|| panic!("{literal}"));
        let text = t.repr(8).unwrap();
        let back = TableRef::parse(&text).unwrap_or_else(|| panic!("{text}"));
        same_entries(&t, &back);
    }
}

#[test]
fn test_table_keys_keep_identity() {
    let t = TableRef::parse("[[k]: v]").unwrap();
    let (_, key, _) = t.iter().next().unwrap();
    assert_eq!(t.get(&key), MuValue::string("v"));

    // a reparsed key is a different table
    let back = TableRef::parse(&t.repr(2).unwrap()).unwrap();
    assert!(back.get(&key).is_nil());
    assert_eq!(back.len(), 1);
}

#[test]
fn test_canonical_form() {
    let t = TableRef::parse("[ 'a' ,b,  \"c\" ]").unwrap();
    assert_eq!(t.repr(1).unwrap(), "[a, b, c]");

    let t = TableRef::parse("[k: 'it\\'s', n: '\\n']").unwrap();
    let text = t.repr(1).unwrap();
    assert!(text.contains("'it\\'s'"));
    assert!(text.contains("'\\n'"));
}

#[test]
fn test_nil_elements() {
    // a nil element still uses up its position
    let t = TableRef::parse("[a, nil, c]").unwrap();
    assert_eq!(t.len(), 2);
    assert_eq!(t.get(&MuValue::uint(2)), MuValue::string("c"));
    assert_eq!(t.state(), TableState::Pairs);
}

#[test]
fn test_value_parse_wraps_tables() {
    let value = mu_parse::parse("[1, [2]]").unwrap();
    let t = value.as_table().unwrap();
    assert_eq!(t.state(), TableState::List);
    assert_eq!(value.repr(2).unwrap(), "[1, [2]]");
    assert_eq!(value.to_string(), format!("[1, <tbl 0x{:x}>]", t.get(&MuValue::uint(1)).addr()));

    assert_eq!(mu_parse::parse("[1, 2"), Err(MuError::MalformedLiteral));
    assert_eq!(mu_parse::parse("[1] [2]"), Err(MuError::MalformedLiteral));
}

#[test]
fn test_cycles_stop_at_depth() {
    let t = TableRef::parse("[a]").unwrap();
    t.append(MuValue::table(t.clone())).unwrap();
    let text = t.repr(3).unwrap();
    assert!(text.starts_with("[a, [a, [a, <tbl 0x"));

    // break the cycle so the table is released
    t.pop(1).unwrap();
    assert_eq!(t.ref_count(), 1);
}
