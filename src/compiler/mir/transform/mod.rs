//! This handles transforming the resolved AST of a compilation unit into
//! its MIR representation.

mod error;
mod function;
mod module;

#[cfg(test)]
mod tests;

pub use error::TransformError;
pub use module::build_mir;
