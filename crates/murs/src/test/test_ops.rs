/// Positional edits and whole-table operations
use crate::mu_value::{MuValue, TableRef, TableState};

fn text(s: &str) -> MuValue {
    MuValue::string(s)
}

fn parse(literal: &str) -> TableRef {
    TableRef::parse(literal).unwrap()
}

#[test]
fn test_push_pop_scenario() {
    let t = parse("[a, b, c]");
    t.push(text("v"), 1).unwrap();
    assert_eq!(t.repr(1).unwrap(), "[a, v, b, c]");
    assert_eq!(t.pop(0).unwrap(), text("a"));
    assert_eq!(t.repr(1).unwrap(), "[v, b, c]");
}

#[test]
fn test_push_pop_clamp() {
    let t = parse("[a, b]");
    t.push(text("z"), 100).unwrap();
    t.push(text("y"), -100).unwrap();
    assert_eq!(t.repr(1).unwrap(), "[y, a, b, z]");
    assert_eq!(t.pop(100).unwrap(), text("z"));
    assert_eq!(t.pop(-100).unwrap(), text("y"));
    assert_eq!(t.repr(1).unwrap(), "[a, b]");
}

#[test]
fn test_pop_drains() {
    let t = TableRef::from_list((0..4).map(MuValue::uint)).unwrap();
    let mut seen = Vec::new();
    while !t.is_empty() {
        seen.push(t.pop(-1).unwrap().get_uint());
    }
    assert_eq!(seen, vec![3, 2, 1, 0]);
    assert!(t.pop(0).unwrap().is_nil());
    assert_eq!(t.state(), TableState::Range);
}

#[test]
fn test_push_with_tombstones() {
    let t = parse("[a, b, c, d]");
    t.insert(MuValue::uint(1), MuValue::nil()).unwrap();
    t.push(text("x"), 0).unwrap();
    assert_eq!(t.get(&MuValue::uint(0)), text("x"));
    assert_eq!(t.get(&MuValue::uint(1)), text("a"));
    assert!(t.get(&MuValue::uint(2)).is_nil());
    assert_eq!(t.get(&MuValue::uint(4)), text("d"));
}

#[test]
fn test_ops_results_are_fresh() {
    let a = parse("[a, b]");
    let b = parse("[c]");
    let frozen = a.freeze();
    let joined = frozen.concat(&b, None).unwrap();
    assert!(!joined.is_frozen());
    assert_eq!(joined.repr(1).unwrap(), "[a, b, c]");
    joined.append(text("d")).unwrap();
    assert_eq!(a.len(), 2);
}

#[test]
fn test_subset_of_pairs() {
    let t = parse("[a, b, c, k: v]");
    let s = t.subset(1, -1).unwrap();
    // len counts the keyed entry too
    assert_eq!(s.repr(1).unwrap(), "[b, c]");
}

#[test]
fn test_set_algebra_on_literals() {
    let a = parse("[x: 1, y: 2, 0: z]");
    let b = parse("[y: 0, 0: q]");
    assert_eq!(a.and(&b).unwrap().len(), 2);
    assert_eq!(a.diff(&b).unwrap().repr(1).unwrap(), "[x: 1]");
    assert_eq!(a.xor(&b).unwrap().len(), 1);
    assert_eq!(a.or(&b).unwrap().get(&MuValue::uint(0)), text("z"));
}
