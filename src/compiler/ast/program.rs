use serde::{Deserialize, Serialize};

use crate::compiler::{
    entity::{EntityId, EntityKind, EntityTable},
    types::TypeDefinition,
};

/// A name resolved, type annotated compilation unit: everything the back
/// end needs to generate code for one source file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgramUnit {
    #[serde(default)]
    pub types: Vec<TypeDefinition>,
    pub program: Program,
}

/// Every entity of the unit plus the order in which its top level entities
/// were declared.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub entities: EntityTable,
    pub declarations: Vec<EntityId>,
}

impl Program {
    pub fn new(entities: EntityTable, declarations: Vec<EntityId>) -> Program {
        Program {
            entities,
            declarations,
        }
    }

    fn declared<P: Fn(&EntityKind) -> bool>(&self, pred: P) -> Vec<EntityId> {
        self.declarations
            .iter()
            .copied()
            .filter(|id| pred(&self.entities.get(*id).kind))
            .collect()
    }

    /// Global variables with storage in this unit.
    pub fn defined_variables(&self) -> Vec<EntityId> {
        self.declared(|k| matches!(k, EntityKind::DefinedVariable { .. }))
    }

    pub fn defined_functions(&self) -> Vec<EntityId> {
        self.declared(|k| matches!(k, EntityKind::DefinedFunction { .. }))
    }

    pub fn constants(&self) -> Vec<EntityId> {
        self.declared(|k| matches!(k, EntityKind::Constant { .. }))
    }

    /// Entities which are declared here but defined in another unit.
    pub fn undefined_entities(&self) -> Vec<EntityId> {
        self.declared(|k| {
            matches!(
                k,
                EntityKind::UndefinedVariable | EntityKind::UndefinedFunction
            )
        })
    }

    /// Counts every use of every entity.  Uses inside function bodies,
    /// global initializers and constant values all count.
    pub fn mark_references(&mut self) {
        let mut uses = vec![];
        let mut record = |e: &super::Expr| {
            if let super::ExprKind::Var { entity } = e.kind {
                uses.push(entity)
            }
        };

        for id in &self.declarations {
            match &self.entities.get(*id).kind {
                EntityKind::DefinedFunction { body, .. } => {
                    body.for_each_expr(&self.entities, &mut record)
                }
                EntityKind::DefinedVariable {
                    initializer: Some(init),
                } => init.for_each(&mut record),
                EntityKind::Constant { value } => value.for_each(&mut record),
                _ => (),
            }
        }

        for id in uses {
            self.entities.get_mut(id).referred();
        }
    }
}
