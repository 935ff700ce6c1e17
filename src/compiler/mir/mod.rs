/*!
 The middle intermediate representation for the mat compiler.  Function
 bodies are flattened into lists of statements whose only control flow is
 explicit jumps between labels, and expressions are annotated with the
 width of the values they produce.  This is the form the code generator
 consumes.

 This module consists of the following major tools:

 1. IR Model: the types which represent a program in MIR form.
 2. MIR Builder: converts a resolved AST into its MIR representation.
 3. Validation: checks of the invariants the code generator relies on.
*/

pub mod builder;
mod fold;
pub mod ir;
mod op;
mod transform;
pub mod validate;

pub use fold::fold_constant;
pub use ir::Mir;
pub use op::Op;
pub use transform::{build_mir, TransformError};
