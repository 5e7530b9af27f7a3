use crate::mu_runtime::MuResult;
use crate::mu_value::{MuFunction, MuStepFn, MuValue, MultiValue};

use super::TableRef;

/// Resumable position inside a table's own entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCursor {
    slot: usize,
    position: usize,
}

impl TableCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries produced so far
    pub fn position(&self) -> usize {
        self.position
    }
}

impl TableRef {
    /// Next own entry after `cursor` in layout order, tombstones skipped
    pub fn next(&self, cursor: &mut TableCursor) -> Option<(MuValue, MuValue)> {
        let entry = self.borrow().next(&mut cursor.slot)?;
        cursor.position += 1;
        Some(entry)
    }

    pub fn iter(&self) -> TableIter {
        TableIter::new(self.clone())
    }

    /// Function value yielding each value in turn
    pub fn iter_fn(&self) -> MuResult<MuValue> {
        self.iteration_fn(step_values)
    }

    /// Function value yielding each key and value in turn
    pub fn pairs_fn(&self) -> MuResult<MuValue> {
        self.iteration_fn(step_pairs)
    }

    fn iteration_fn(&self, step: MuStepFn) -> MuResult<MuValue> {
        let scope = TableRef::from_list([MuValue::table(self.clone()), MuValue::uint(0)])?;
        Ok(MuValue::function(MuFunction::new(step, scope)))
    }
}

/// Advance the `[table, slot]` scope of an iteration function
fn step_scope(scope: &TableRef) -> MuResult<Option<(MuValue, MuValue)>> {
    let Ok(table) = scope.lookup(&MuValue::uint(0)).into_table() else {
        return Ok(None);
    };
    let slot = scope.lookup(&MuValue::uint(1));
    let mut slot = slot.as_index().unwrap_or(0);

    let entry = table.borrow().next(&mut slot);
    scope.insert(MuValue::uint(1), MuValue::uint(slot as u64))?;
    Ok(entry)
}

fn step_values(scope: &TableRef) -> MuResult<MultiValue> {
    Ok(match step_scope(scope)? {
        Some((_, value)) => MultiValue::single(value),
        None => MultiValue::empty(),
    })
}

fn step_pairs(scope: &TableRef) -> MuResult<MultiValue> {
    Ok(match step_scope(scope)? {
        Some((key, value)) => MultiValue::two(key, value),
        None => MultiValue::empty(),
    })
}

/// Iterator over `(position, key, value)` of a table's own entries
pub struct TableIter {
    table: TableRef,
    cursor: TableCursor,
}

impl TableIter {
    pub fn new(table: TableRef) -> Self {
        Self::resume(table, TableCursor::default())
    }

    /// Continue from a cursor saved earlier
    pub fn resume(table: TableRef, cursor: TableCursor) -> Self {
        TableIter { table, cursor }
    }

    /// Start over from the first entry
    pub fn restart(&mut self) {
        self.cursor = TableCursor::default();
    }

    pub fn cursor(&self) -> TableCursor {
        self.cursor
    }
}

impl Iterator for TableIter {
    type Item = (usize, MuValue, MuValue);

    fn next(&mut self) -> Option<Self::Item> {
        let position = self.cursor.position;
        let (key, value) = self.table.next(&mut self.cursor)?;
        Some((position, key, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> MuValue {
        MuValue::string(s)
    }

    #[test]
    fn test_iter_positions() {
        let t = TableRef::from_list([text("a"), text("b"), text("c")]).unwrap();
        let entries: Vec<_> = t.iter().collect();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], (0, MuValue::uint(0), text("a")));
        assert_eq!(entries[2], (2, MuValue::uint(2), text("c")));
    }

    #[test]
    fn test_iter_skips_tombstones() {
        let t = TableRef::from_list([text("a"), text("b"), text("c")]).unwrap();
        t.insert(MuValue::uint(1), MuValue::nil()).unwrap();
        let keys: Vec<_> = t.iter().map(|(_, k, _)| k.get_uint()).collect();
        assert_eq!(keys, vec![0, 2]);
    }

    #[test]
    fn test_resume_and_restart() {
        let t = TableRef::from_list((0..5).map(MuValue::uint)).unwrap();
        let mut iter = t.iter();
        iter.next();
        iter.next();
        let saved = iter.cursor();
        assert_eq!(saved.position(), 2);

        let rest: Vec<_> = TableIter::resume(t.clone(), saved).collect();
        assert_eq!(rest.len(), 3);
        assert_eq!(rest[0].0, 2);
        assert_eq!(rest[0].2, MuValue::uint(2));

        iter.restart();
        assert_eq!(iter.next().map(|(p, _, _)| p), Some(0));
    }

    #[test]
    fn test_cursor_next() {
        let t = TableRef::from_pairs([(text("k"), text("v"))]).unwrap();
        let mut cursor = TableCursor::new();
        assert_eq!(t.next(&mut cursor), Some((text("k"), text("v"))));
        assert!(t.next(&mut cursor).is_none());
        assert!(t.next(&mut cursor).is_none());
    }

    #[test]
    fn test_iteration_functions() {
        let t = TableRef::from_list([text("a"), text("b")]).unwrap();

        let values = t.iter_fn().unwrap().as_function().unwrap();
        assert_eq!(values.call().unwrap().get(0), text("a"));
        assert_eq!(values.call().unwrap().get(0), text("b"));
        assert!(values.call().unwrap().is_empty());
        assert!(values.call().unwrap().is_empty());

        let pairs = t.pairs_fn().unwrap().as_function().unwrap();
        let first = pairs.call().unwrap();
        assert_eq!(first.get(0), MuValue::uint(0));
        assert_eq!(first.get(1), text("a"));

        // draining a pairs function rebuilds the table
        let copy = TableRef::from_value(t.pairs_fn().unwrap()).unwrap();
        assert_eq!(copy.len(), 2);
        assert_eq!(copy.get(&MuValue::uint(1)), text("b"));

        let appended = TableRef::from_value(t.iter_fn().unwrap()).unwrap();
        assert_eq!(appended.get(&MuValue::uint(0)), text("a"));
    }
}
