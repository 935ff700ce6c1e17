/**
 * The Compiler takes a resolved program unit, one whose names are bound to
 * entities and whose expressions carry their types, and converts it into
 * i386 assembly language.
 *
 * The work is split into three stages:
 * 1. `types`: register every type the unit uses, compute sizes, alignments
 * and member offsets, and check that user defined types are well formed.
 * This is the last stage where the shape of a type can be a User error.
 * 2. `mir`: lower every function body to a flat list of statements whose
 * only control flow is explicit jumps.  Misplaced `break`s, bad `goto`s and
 * non constant static initializers are reported here.
 * 3. `x86`: lay out the stack frames, place every entity and select
 * instructions for the MIR.
 *
 * Once the first two stages have finished without errors the program is
 * considered correct, so any fault in code generation can only be a bug in
 * the compiler itself.  Such faults are never reported as diagnostics: the
 * policy is to panic from exactly the point where the fault was discovered.
 */
pub mod compiler;

pub mod arch;
pub mod ast;
pub mod entity;
mod error;
mod location;
pub mod mir;
mod resolution;
pub mod stringtable;
pub mod types;
pub mod x86;

pub use error::CompilerError;
pub use location::Location;
pub use resolution::Resolution;
