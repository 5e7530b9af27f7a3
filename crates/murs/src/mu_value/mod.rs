// Mu value representation
// One 64-bit tagged word per value, numbers immediate, objects behind Rc
mod mu_function;
pub mod mu_num;
pub mod mu_parse;
pub mod mu_string;
mod mu_table;
mod mu_value;

pub use mu_function::{MuFunction, MuStepFn};
pub use mu_string::MuString;
pub use mu_table::{TableCursor, TableIter, TableRef, TableState};
pub use mu_value::{MuValue, MuValueKind};

/// Values produced by one step of a function
/// - Empty: the sequence is exhausted
/// - Single: one value (no heap allocation, most common case)
/// - Many: 2+ values stored in Vec
#[derive(Debug, Clone, Default)]
pub enum MultiValue {
    #[default]
    Empty,
    Single(MuValue),
    Many(Vec<MuValue>),
}

impl MultiValue {
    #[inline(always)]
    pub fn empty() -> Self {
        MultiValue::Empty
    }

    #[inline(always)]
    pub fn single(value: MuValue) -> Self {
        MultiValue::Single(value)
    }

    #[inline(always)]
    pub fn two(v1: MuValue, v2: MuValue) -> Self {
        MultiValue::Many(vec![v1, v2])
    }

    pub fn multiple(mut values: Vec<MuValue>) -> Self {
        match values.len() {
            0 => MultiValue::Empty,
            1 => MultiValue::Single(values.remove(0)),
            _ => MultiValue::Many(values),
        }
    }

    #[inline(always)]
    pub fn all_values(self) -> Vec<MuValue> {
        match self {
            MultiValue::Empty => Vec::new(),
            MultiValue::Single(v) => vec![v],
            MultiValue::Many(v) => v,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        match self {
            MultiValue::Empty => 0,
            MultiValue::Single(_) => 1,
            MultiValue::Many(v) => v.len(),
        }
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        matches!(self, MultiValue::Empty)
    }

    /// Get value at index (0-based), nil when missing
    pub fn get(&self, index: usize) -> MuValue {
        match self {
            MultiValue::Single(v) if index == 0 => v.clone(),
            MultiValue::Many(v) => v.get(index).cloned().unwrap_or_default(),
            _ => MuValue::nil(),
        }
    }
}
