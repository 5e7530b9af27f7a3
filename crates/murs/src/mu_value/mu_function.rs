use std::fmt;

use crate::mu_runtime::MuResult;
use crate::mu_value::{MultiValue, TableRef};

/// Native step function. Receives the function's scope table.
pub type MuStepFn = fn(&TableRef) -> MuResult<MultiValue>;

/// Native function value: a step function plus the table it keeps its state in
#[repr(align(8))]
pub struct MuFunction {
    step: MuStepFn,
    scope: TableRef,
}

impl MuFunction {
    pub fn new(step: MuStepFn, scope: TableRef) -> Self {
        MuFunction { step, scope }
    }

    #[inline(always)]
    pub fn scope(&self) -> &TableRef {
        &self.scope
    }

    /// Run one step. `MultiValue::Empty` ends a sequence.
    #[inline]
    pub fn call(&self) -> MuResult<MultiValue> {
        (self.step)(&self.scope)
    }
}

impl fmt::Debug for MuFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MuFunction")
            .field("scope", &self.scope.addr())
            .finish()
    }
}
