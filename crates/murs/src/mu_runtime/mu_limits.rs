//! Centralized Mu limits and configuration constants.
//!
//! All magic numbers that control table sizing, text limits and number
//! formatting are collected here for easy tuning.

// ===== Lengths =====

/// Maximum length of a table or a text.
/// Counts above this raise `MuError::LengthOverflow`.
pub const MU_MAXLEN: usize = u32::MAX as usize;

// ===== Tables =====

/// log2 of the smallest capacity a table reserves (4 slots).
pub const MU_MINNPW2: u8 = 2;

/// Default nesting depth for `repr` when the caller gives none.
pub const MU_DEFAULT_DEPTH: usize = 1;

/// Deepest table nesting a literal may open before it is rejected.
pub const MU_MAX_NESTING: usize = 256;

// ===== Numbers =====

/// Total digit budget of a number's canonical text.
pub const MU_NUMLEN: i32 = 12;

/// Largest decimal exponent still printed in fixed notation.
pub const MU_NUM_FIXED_MAXEXP: i32 = MU_NUMLEN - 2;

/// Smallest decimal exponent still printed in fixed notation.
pub const MU_NUM_FIXED_MINEXP: i32 = -(MU_NUMLEN - 3);

/// Significant digits kept in exponential notation.
pub const MU_NUM_EXP_DIGITS: usize = (MU_NUMLEN - 5) as usize;

/// Integers below this magnitude survive the tagged encoding exactly.
pub const MU_NUM_EXACT_LIMIT: u64 = 1 << 50;
