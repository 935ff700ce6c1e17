use log::debug;
use serde::Serialize;

use crate::{
    compiler::{
        ast::{Block, Stmt},
        types::{TypeId, TypeTable},
    },
    diagnostics::ErrorHandler,
};

use super::{EntityId, EntityTable};

/// The variables declared by one block of a function body, plus the scopes
/// of the blocks nested inside it.  The scope of the outermost block of a
/// function also holds the temporaries the compiler creates for it.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LocalScope {
    pub variables: Vec<EntityId>,
    pub children: Vec<LocalScope>,
}

impl LocalScope {
    /// Builds the scope tree of `block`.
    pub fn of_block(block: &Block) -> LocalScope {
        let mut children = vec![];
        for stmt in &block.stmts {
            Self::collect_children(stmt, &mut children);
        }
        LocalScope {
            variables: block.variables.clone(),
            children,
        }
    }

    fn collect_children(stmt: &Stmt, children: &mut Vec<LocalScope>) {
        for block in stmt.child_blocks() {
            children.push(Self::of_block(block));
        }
    }

    /// Every scope in this tree, this scope first.
    fn all_scopes(&self) -> Vec<&LocalScope> {
        let mut scopes = vec![self];
        for child in &self.children {
            scopes.extend(child.all_scopes());
        }
        scopes
    }

    /// All variables of this scope and its nested scopes which live on the
    /// stack.  Static local variables are not included.
    pub fn all_local_variables(&self, entities: &EntityTable) -> Vec<EntityId> {
        self.all_scopes()
            .iter()
            .flat_map(|s| s.variables.iter().copied())
            .filter(|v| !entities.get(*v).private)
            .collect()
    }

    /// All static local variables of this scope and its nested scopes.
    pub fn static_local_variables(&self, entities: &EntityTable) -> Vec<EntityId> {
        self.all_scopes()
            .iter()
            .flat_map(|s| s.variables.iter().copied())
            .filter(|v| entities.get(*v).private)
            .collect()
    }

    /// Creates a temporary in this scope.
    pub fn allocate_tmp(
        &mut self,
        entities: &mut EntityTable,
        types: &TypeTable,
        ty: TypeId,
    ) -> EntityId {
        let tmp = entities.allocate_tmp(types, ty);
        debug!("Allocate temporary {} of type {}", tmp, types.name_of(ty));
        self.variables.push(tmp);
        tmp
    }

    /// Warns about every variable in this tree which is never used.
    pub fn check_references(&self, entities: &EntityTable, handler: &mut ErrorHandler) {
        for var in &self.variables {
            let entity = entities.get(*var);
            if !entity.is_referred() && !entity.is_temporary() {
                handler.warn(
                    entity.location,
                    format!("unused variable: {}", entity.name),
                );
            }
        }
        for child in &self.children {
            child.check_references(entities, handler);
        }
    }
}
