use serde::{Deserialize, Serialize};

use crate::compiler::{entity::EntityId, types::TypeRef, Location};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use BinaryOp::*;
        f.write_str(match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Mod => "%",
            BitAnd => "&",
            BitOr => "|",
            BitXor => "^",
            Shl => "<<",
            Shr => ">>",
            Eq => "==",
            Ne => "!=",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Plus,
    Minus,
    BitNot,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncDec {
    Inc,
    Dec,
}

/// An expression of a resolved program.  `ty` is the type of the value the
/// expression produces.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: TypeRef,
    #[serde(default)]
    pub location: Option<Location>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum ExprKind {
    Int {
        value: i64,
    },
    Str {
        value: String,
    },
    /// A reference to a variable, parameter, function or constant.
    Var {
        entity: EntityId,
    },
    SizeofType {
        of: TypeRef,
    },
    SizeofExpr {
        expr: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Assign {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `lhs op= rhs`
    OpAssign {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Prefix {
        op: IncDec,
        expr: Box<Expr>,
    },
    Suffix {
        op: IncDec,
        expr: Box<Expr>,
    },
    Cond {
        cond: Box<Expr>,
        then: Box<Expr>,
        #[serde(rename = "else")]
        els: Box<Expr>,
    },
    /// Converts `expr` to the type of this node.
    Cast {
        expr: Box<Expr>,
    },
    Addr {
        expr: Box<Expr>,
    },
    Deref {
        expr: Box<Expr>,
    },
    Member {
        expr: Box<Expr>,
        name: String,
    },
    PtrMember {
        expr: Box<Expr>,
        name: String,
    },
    Index {
        expr: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, ty: TypeRef) -> Expr {
        Expr {
            kind,
            ty,
            location: None,
        }
    }

    pub fn at(mut self, location: Location) -> Expr {
        self.location = Some(location);
        self
    }

    /// Calls `f` on this expression and every expression nested in it, in
    /// evaluation order, parents before children.
    pub fn for_each<F: FnMut(&Expr)>(&self, f: &mut F) {
        f(self);
        match &self.kind {
            ExprKind::Int { .. }
            | ExprKind::Str { .. }
            | ExprKind::Var { .. }
            | ExprKind::SizeofType { .. } => (),
            ExprKind::SizeofExpr { expr }
            | ExprKind::Unary { expr, .. }
            | ExprKind::Prefix { expr, .. }
            | ExprKind::Suffix { expr, .. }
            | ExprKind::Cast { expr }
            | ExprKind::Addr { expr }
            | ExprKind::Deref { expr }
            | ExprKind::Member { expr, .. }
            | ExprKind::PtrMember { expr, .. } => expr.for_each(f),
            ExprKind::Binary { lhs, rhs, .. }
            | ExprKind::Logical { lhs, rhs, .. }
            | ExprKind::Assign { lhs, rhs }
            | ExprKind::OpAssign { lhs, rhs, .. } => {
                lhs.for_each(f);
                rhs.for_each(f);
            }
            ExprKind::Cond { cond, then, els } => {
                cond.for_each(f);
                then.for_each(f);
                els.for_each(f);
            }
            ExprKind::Index { expr, index } => {
                expr.for_each(f);
                index.for_each(f);
            }
            ExprKind::Call { callee, args } => {
                callee.for_each(f);
                args.iter().for_each(|a| a.for_each(f));
            }
        }
    }
}
