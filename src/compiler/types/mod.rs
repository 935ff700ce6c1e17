//! The type system for mat programs: every type used by a compilation unit
//! lives in a single [`TypeTable`], which also computes the memory layout
//! (size, alignment and member offsets) of each type and validates that
//! user defined types are well formed.

mod definition;
mod error;
pub mod layout;
mod ty;
mod typeref;
mod typetable;


pub use definition::{MemberDecl, TypeDefinition};
pub use error::TypeError;
pub use layout::{align, Layout};
pub use ty::{CompositeKind, CompositeType, FunctionType, IntegerType, Slot, Type, TypeId, UserType};
pub use typeref::{IntegerRank, TypeRef};
pub use typetable::{TypeSummary, TypeTable, WidthProfile};
