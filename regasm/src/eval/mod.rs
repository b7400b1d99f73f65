//! Operand evaluation

pub mod value;

pub use value::ValueResolver;
