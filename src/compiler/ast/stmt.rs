use serde::{Deserialize, Serialize};

use crate::compiler::{
    entity::{EntityId, EntityTable},
    Location,
};

use super::Expr;

/// A `{ ... }` block: the variables it declares, in declaration order, and
/// its statements.  Initializers of the declared variables run when the
/// block is entered.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub variables: Vec<EntityId>,
    #[serde(default)]
    pub stmts: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    #[serde(default)]
    pub location: Option<Location>,
}

/// One arm of a switch.  A case with no values is the `default` arm.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Case {
    #[serde(default)]
    pub values: Vec<Expr>,
    pub body: Block,
}

impl Case {
    pub fn is_default(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum StmtKind {
    Expr {
        expr: Expr,
    },
    Block {
        block: Block,
    },
    If {
        cond: Expr,
        then: Box<Stmt>,
        #[serde(default, rename = "else")]
        els: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    For {
        #[serde(default)]
        init: Option<Expr>,
        #[serde(default)]
        cond: Option<Expr>,
        #[serde(default)]
        incr: Option<Expr>,
        body: Box<Stmt>,
    },
    Switch {
        cond: Expr,
        cases: Vec<Case>,
    },
    Break,
    Continue,
    Goto {
        target: String,
    },
    Label {
        name: String,
        stmt: Box<Stmt>,
    },
    Return {
        #[serde(default)]
        expr: Option<Expr>,
    },
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Stmt {
        Stmt {
            kind,
            location: None,
        }
    }

    pub fn at(mut self, location: Location) -> Stmt {
        self.location = Some(location);
        self
    }

    /// Calls `f` on every expression in this statement, including the
    /// initializers of variables declared by nested blocks.
    pub fn for_each_expr<F: FnMut(&Expr)>(&self, entities: &EntityTable, f: &mut F) {
        match &self.kind {
            StmtKind::Expr { expr } => expr.for_each(f),
            StmtKind::Block { block } => block.for_each_expr(entities, f),
            StmtKind::If { cond, then, els } => {
                cond.for_each(f);
                then.for_each_expr(entities, f);
                if let Some(els) = els {
                    els.for_each_expr(entities, f);
                }
            }
            StmtKind::While { cond, body } | StmtKind::DoWhile { body, cond } => {
                cond.for_each(f);
                body.for_each_expr(entities, f);
            }
            StmtKind::For {
                init,
                cond,
                incr,
                body,
            } => {
                for e in [init, cond, incr].into_iter().flatten() {
                    e.for_each(f);
                }
                body.for_each_expr(entities, f);
            }
            StmtKind::Switch { cond, cases } => {
                cond.for_each(f);
                for case in cases {
                    case.values.iter().for_each(|v| v.for_each(f));
                    case.body.for_each_expr(entities, f);
                }
            }
            StmtKind::Label { stmt, .. } => stmt.for_each_expr(entities, f),
            StmtKind::Return { expr: Some(expr) } => expr.for_each(f),
            StmtKind::Return { expr: None }
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Goto { .. } => (),
        }
    }

    /// The blocks directly nested in this statement, without descending into
    /// those blocks.
    pub fn child_blocks(&self) -> Vec<&Block> {
        match &self.kind {
            StmtKind::Block { block } => vec![block],
            StmtKind::If { then, els, .. } => {
                let mut blocks = then.child_blocks();
                if let Some(els) = els {
                    blocks.extend(els.child_blocks());
                }
                blocks
            }
            StmtKind::While { body, .. }
            | StmtKind::DoWhile { body, .. }
            | StmtKind::For { body, .. }
            | StmtKind::Label { stmt: body, .. } => body.child_blocks(),
            StmtKind::Switch { cases, .. } => cases.iter().map(|c| &c.body).collect(),
            StmtKind::Expr { .. }
            | StmtKind::Return { .. }
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Goto { .. } => vec![],
        }
    }
}

impl Block {
    pub fn new(variables: Vec<EntityId>, stmts: Vec<Stmt>) -> Block {
        Block { variables, stmts }
    }

    pub fn for_each_expr<F: FnMut(&Expr)>(&self, entities: &EntityTable, f: &mut F) {
        for var in &self.variables {
            if let Some(init) = entities.get(*var).initializer() {
                init.for_each(f);
            }
        }
        for stmt in &self.stmts {
            stmt.for_each_expr(entities, f);
        }
    }
}
