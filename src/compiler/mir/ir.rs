//! The MIR abstractions: a function body is a flat list of statements whose
//! only control flow is explicit jumps between labels.  Expressions are
//! trees of machine level operations tagged with the width of the value
//! they produce.

use std::fmt::Display;

use serde::Serialize;

use crate::compiler::{
    arch::registers::RegSize,
    entity::{EntityId, EntityTable, LocalScope},
    stringtable::{ConstantId, ConstantTable},
    Location,
};

use super::Op;

/// A MIR expression.  `width` is the size of the value it produces.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Expr {
    pub width: RegSize,
    pub kind: ExprKind,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub enum ExprKind {
    /// An integer literal
    Int(i64),
    /// The address of a string literal in the constant table
    Str(ConstantId),
    /// The value of a variable
    Var(EntityId),
    /// The address of a variable or a function
    Addr(EntityId),
    /// The value stored at an address
    Mem(Box<Expr>),
    /// A unary operation, including casts
    Uni(Op, Box<Expr>),
    /// A binary operation
    Bin(Op, Box<Expr>, Box<Expr>),
    /// A call of the function at `callee`.  Arguments are in source order.
    Call { callee: Box<Expr>, args: Vec<Expr> },
}

impl Expr {
    pub fn new(width: RegSize, kind: ExprKind) -> Expr {
        Expr { width, kind }
    }

    pub fn int(width: RegSize, value: i64) -> Expr {
        Expr::new(width, ExprKind::Int(value))
    }

    pub fn var(width: RegSize, entity: EntityId) -> Expr {
        Expr::new(width, ExprKind::Var(entity))
    }

    pub fn addr(width: RegSize, entity: EntityId) -> Expr {
        Expr::new(width, ExprKind::Addr(entity))
    }

    pub fn mem(width: RegSize, addr: Expr) -> Expr {
        Expr::new(width, ExprKind::Mem(Box::new(addr)))
    }

    pub fn uni(width: RegSize, op: Op, expr: Expr) -> Expr {
        Expr::new(width, ExprKind::Uni(op, Box::new(expr)))
    }

    pub fn bin(width: RegSize, op: Op, left: Expr, right: Expr) -> Expr {
        Expr::new(width, ExprKind::Bin(op, Box::new(left), Box::new(right)))
    }

    pub fn is_var(&self) -> bool {
        matches!(self.kind, ExprKind::Var(_))
    }

    pub fn is_constant(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Int(_) | ExprKind::Str(_) | ExprKind::Addr(_)
        )
    }

    /// The address of the location this expression reads, if it reads one.
    /// `Var(v)` becomes `Addr(v)` and `Mem(a)` becomes `a`.
    pub fn address_of(self, pointer_width: RegSize) -> Option<Expr> {
        match self.kind {
            ExprKind::Var(v) => Some(Expr::addr(pointer_width, v)),
            ExprKind::Mem(addr) => Some(*addr),
            _ => None,
        }
    }

    /// The function entity this call expression's callee names directly,
    /// if any.
    pub fn static_callee(&self, entities: &EntityTable) -> Option<EntityId> {
        match &self.kind {
            ExprKind::Call { callee, .. } => match callee.kind {
                ExprKind::Var(e) | ExprKind::Addr(e) if entities.get(e).is_function() => Some(e),
                _ => None,
            },
            _ => None,
        }
    }

    /// A call is static when its callee directly names a function entity.
    /// Anything else, such as a call through a pointer variable, is
    /// dynamic.
    pub fn is_static_call(&self, entities: &EntityTable) -> bool {
        self.static_callee(entities).is_some()
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ExprKind::Int(i) => f.write_fmt(format_args!("{}{}", i, self.width)),
            ExprKind::Str(s) => f.write_fmt(format_args!("{}", s)),
            ExprKind::Var(v) => f.write_fmt(format_args!("{}:{}", v, self.width)),
            ExprKind::Addr(v) => f.write_fmt(format_args!("&{}", v)),
            ExprKind::Mem(a) => f.write_fmt(format_args!("*{}({})", self.width, a)),
            ExprKind::Uni(op, e) => f.write_fmt(format_args!("{}:{}({})", op, self.width, e)),
            ExprKind::Bin(op, l, r) => {
                f.write_fmt(format_args!("{}:{}({}, {})", op, self.width, l, r))
            }
            ExprKind::Call { callee, args } => {
                f.write_fmt(format_args!("call {}(", callee))?;
                for (idx, arg) in args.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_fmt(format_args!("{}", arg))?;
                }
                f.write_str(")")
            }
        }
    }
}

/// A jump target within one function.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize)]
pub struct Label(pub u32);

impl Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(".L{}", self.0))
    }
}

/// Hands out labels.  One allocator is shared by every function of a unit
/// and then by the code generator, so label names never collide in the
/// emitted assembly.
#[derive(Debug, Default, Clone, Serialize)]
pub struct LabelAllocator {
    next: u32,
}

impl LabelAllocator {
    pub fn new() -> LabelAllocator {
        LabelAllocator { next: 0 }
    }

    pub fn new_label(&mut self) -> Label {
        let label = Label(self.next);
        self.next += 1;
        label
    }
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub location: Option<Location>,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub enum StmtKind {
    /// Evaluates an expression for its side effects
    ExprStmt(Expr),
    /// Stores `rhs` at the address computed by `lhs`
    Assign { lhs: Expr, rhs: Expr },
    Jump(Label),
    /// Jumps to `then` if `cond` is not zero and to `els` otherwise
    CJump { cond: Expr, then: Label, els: Label },
    LabelStmt(Label),
    Return(Option<Expr>),
}

impl Stmt {
    pub fn new(kind: StmtKind, location: Option<Location>) -> Stmt {
        Stmt { kind, location }
    }

    /// The labels this statement may jump to.
    pub fn targets(&self) -> Vec<Label> {
        match &self.kind {
            StmtKind::Jump(l) => vec![*l],
            StmtKind::CJump { then, els, .. } => vec![*then, *els],
            _ => vec![],
        }
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            StmtKind::ExprStmt(e) => f.write_fmt(format_args!("{}", e)),
            StmtKind::Assign { lhs, rhs } => f.write_fmt(format_args!("[{}] := {}", lhs, rhs)),
            StmtKind::Jump(l) => f.write_fmt(format_args!("goto {}", l)),
            StmtKind::CJump { cond, then, els } => {
                f.write_fmt(format_args!("if {} then {} else {}", cond, then, els))
            }
            StmtKind::LabelStmt(l) => f.write_fmt(format_args!("{}:", l)),
            StmtKind::Return(Some(e)) => f.write_fmt(format_args!("return {}", e)),
            StmtKind::Return(None) => f.write_str("return"),
        }
    }
}

/// The MIR of one defined function.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Function {
    pub entity: EntityId,
    pub params: Vec<EntityId>,
    /// The variables of the function body plus the temporaries created
    /// while lowering it.
    pub scope: LocalScope,
    pub body: Vec<Stmt>,
}

impl Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("fn {}(", self.entity))?;
        for (idx, p) in self.params.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            f.write_fmt(format_args!("{}", p))?;
        }
        f.write_str("):\n")?;
        for stmt in &self.body {
            match &stmt.kind {
                StmtKind::LabelStmt(_) => f.write_fmt(format_args!("{}", stmt))?,
                _ => f.write_fmt(format_args!("    {}", stmt))?,
            }
            match stmt.location {
                Some(loc) => f.write_fmt(format_args!("  // {}\n", loc))?,
                None => f.write_str("\n")?,
            }
        }
        Ok(())
    }
}

/// A variable with static storage: a global or a static local.  Its
/// initializer, if any, is a constant expression: `Int`, `Str` or `Addr`.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct StaticVariable {
    pub entity: EntityId,
    pub init: Option<Expr>,
}

/// A named constant and its value, reduced to a literal or an address.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct NamedConstant {
    pub entity: EntityId,
    pub value: Option<Expr>,
}

/// The MIR of a whole compilation unit.
#[derive(Debug, Serialize)]
pub struct Mir {
    pub entities: EntityTable,
    pub constants: ConstantTable,
    /// Global variables in declaration order followed by the static local
    /// variables of every function.
    pub variables: Vec<StaticVariable>,
    pub functions: Vec<Function>,
    pub named_constants: Vec<NamedConstant>,
    /// Variables and functions this unit uses but does not define
    pub undefined: Vec<EntityId>,
    pub labels: LabelAllocator,
}

impl Display for Mir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for var in &self.variables {
            let entity = self.entities.get(var.entity);
            f.write_fmt(format_args!("var {} {}", var.entity, entity.symbol()))?;
            match &var.init {
                Some(init) => f.write_fmt(format_args!(" = {}\n", init))?,
                None => f.write_str("\n")?,
            }
        }
        for func in &self.functions {
            f.write_fmt(format_args!("{}\n", func))?;
        }
        Ok(())
    }
}
