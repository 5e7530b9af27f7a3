// Mu Runtime
// Tagged-word values and a hybrid range/list/pairs table engine

#[cfg(test)]
mod test;

pub mod mu_runtime;
pub mod mu_value;

#[cfg(feature = "serde")]
pub mod serde;

pub use mu_runtime::{MuError, MuResult};
pub use mu_value::{
    MuFunction, MuStepFn, MuValue, MuValueKind, MultiValue, TableCursor, TableIter, TableRef,
    TableState, mu_num, mu_parse,
};
