pub mod test_literal;
pub mod test_ops;
