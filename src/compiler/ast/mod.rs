//! The resolved program handed to the back end: every name is bound to an
//! entity and every expression carries its type.

mod expr;
mod program;
mod stmt;

pub use expr::{BinaryOp, Expr, ExprKind, IncDec, LogicalOp, UnaryOp};
pub use program::{Program, ProgramUnit};
pub use stmt::{Block, Case, Stmt, StmtKind};
