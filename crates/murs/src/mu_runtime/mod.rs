// Runtime plumbing shared by every value kind: errors and limits
mod mu_error;
pub mod mu_limits;

pub use mu_error::{MuError, MuResult};
