use log::trace;

use crate::compiler::{
    entity::{EntityId, EntityTable, LocalScope},
    types::{TypeId, TypeTable},
    Location,
};

use super::ir::*;

/// Provides a Builder interface for constructing the MIR of a function.
/// Statements are appended in order to the function body; this also owns the
/// local scope of the function so that temporaries created while lowering
/// its body are placed in that scope.
pub struct MirFunctionBuilder {
    func: Function,
}

impl MirFunctionBuilder {
    /// Creates a new [`MirFunctionBuilder`] for the function `entity`.  The
    /// function starts with no statements.
    pub fn new(entity: EntityId, params: Vec<EntityId>, scope: LocalScope) -> MirFunctionBuilder {
        MirFunctionBuilder {
            func: Function {
                entity,
                params,
                scope,
                body: vec![],
            },
        }
    }

    /// Finalizes the construction of the function and returns its MIR.
    pub fn complete(self) -> Function {
        self.func
    }

    /// The number of statements added so far.
    pub fn len(&self) -> usize {
        self.func.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.func.body.is_empty()
    }

    pub fn scope(&self) -> &LocalScope {
        &self.func.scope
    }

    /// Creates a temporary variable of type `ty` in the outermost scope of
    /// the function.
    pub fn temp(&mut self, entities: &mut EntityTable, types: &TypeTable, ty: TypeId) -> EntityId {
        self.func.scope.allocate_tmp(entities, types, ty)
    }

    fn push(&mut self, kind: StmtKind, location: Option<Location>) {
        let stmt = Stmt::new(kind, location);
        trace!("{}", stmt);
        self.func.body.push(stmt)
    }

    /// Evaluate `expr` for its side effects.
    pub fn expr_stmt(&mut self, location: Option<Location>, expr: Expr) {
        self.push(StmtKind::ExprStmt(expr), location)
    }

    /// Store `rhs` at the address `lhs`.
    pub fn assign(&mut self, location: Option<Location>, lhs: Expr, rhs: Expr) {
        self.push(StmtKind::Assign { lhs, rhs }, location)
    }

    pub fn jump(&mut self, location: Option<Location>, target: Label) {
        self.push(StmtKind::Jump(target), location)
    }

    pub fn cjump(&mut self, location: Option<Location>, cond: Expr, then: Label, els: Label) {
        self.push(StmtKind::CJump { cond, then, els }, location)
    }

    /// Places `label` at the current end of the function.
    pub fn label(&mut self, label: Label) {
        self.push(StmtKind::LabelStmt(label), None)
    }

    pub fn ret(&mut self, location: Option<Location>, value: Option<Expr>) {
        self.push(StmtKind::Return(value), location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{arch::registers::RegSize, types::TypeRef};

    #[test]
    fn statements_are_appended_in_order() {
        let mut labels = LabelAllocator::new();
        let mut mir = MirFunctionBuilder::new(EntityId(0), vec![], LocalScope::default());
        let l = labels.new_label();
        mir.label(l);
        mir.expr_stmt(None, Expr::int(RegSize::R32, 1));
        mir.jump(None, l);
        assert_eq!(mir.len(), 3);

        let func = mir.complete();
        assert_eq!(func.body[0].kind, StmtKind::LabelStmt(l));
        assert_eq!(func.body[2].kind, StmtKind::Jump(l));
    }

    #[test]
    fn temporaries_go_in_the_function_scope() {
        let types = TypeTable::ilp32();
        let mut entities = EntityTable::new();
        let mut mir = MirFunctionBuilder::new(EntityId(0), vec![], LocalScope::default());
        let t = mir.temp(&mut entities, &types, types.int());

        assert_eq!(mir.scope().variables, vec![t]);
        assert!(entities.get(t).is_temporary());
        assert_eq!(entities.get(t).type_ref, TypeRef::int());
    }
}
