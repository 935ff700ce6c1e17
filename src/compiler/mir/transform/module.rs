//! Transforms a whole compilation unit: static variables, constants and
//! every defined function.

use std::collections::HashMap;

use log::debug;

use crate::{
    compiler::{
        ast::Program,
        entity::{EntityId, EntityTable},
        mir::ir::{Expr, LabelAllocator, Mir, NamedConstant, StaticVariable},
        stringtable::ConstantTable,
        types::TypeTable,
        CompilerError,
    },
    diagnostics::ErrorHandler,
};

use super::{function::FuncTransformer, TransformError};

/// State shared by the transformation of every function of a unit.
pub(super) struct UnitContext<'a> {
    pub types: &'a mut TypeTable,
    pub entities: EntityTable,
    pub constants: ConstantTable,
    pub labels: LabelAllocator,
    pub handler: &'a mut ErrorHandler,
}

/// Lowers every function body of `program` to MIR and reduces the
/// initializers of static variables and the values of constants to
/// assembler constants.  Problems in the input are reported to `handler`;
/// the returned MIR must not be used for code generation if any error was
/// reported.
pub fn build_mir(program: Program, types: &mut TypeTable, handler: &mut ErrorHandler) -> Mir {
    let Program {
        entities,
        declarations,
    } = program;
    debug!("Build MIR for {} declarations", declarations.len());

    let mut unit = UnitContext {
        types,
        entities,
        constants: ConstantTable::new(),
        labels: LabelAllocator::new(),
        handler,
    };

    let mut variables = vec![];
    let mut named_constants = vec![];
    let mut undefined = vec![];
    let mut function_ids = vec![];
    for id in declarations {
        let entity = unit.entities.get(id);
        if entity.is_parameter() {
            panic!("Parameter {} declared at the top level", entity.name)
        } else if !entity.is_defined() {
            undefined.push(id)
        } else if entity.is_constant() {
            let value = entity.constant_value().cloned();
            let value = value.and_then(|v| static_value(&mut unit, id, &v));
            named_constants.push(NamedConstant { entity: id, value });
        } else if entity.is_function() {
            function_ids.push(id)
        } else {
            let init = static_initializer(&mut unit, id);
            variables.push(StaticVariable { entity: id, init });
        }
    }

    let mut functions = vec![];
    let mut sequence: HashMap<String, u64> = HashMap::new();
    for id in function_ids {
        let func = FuncTransformer::new(&mut unit, id).transform();
        for var in func.scope.static_local_variables(&unit.entities) {
            number_static_local(&mut unit.entities, &mut sequence, var);
            let init = static_initializer(&mut unit, var);
            variables.push(StaticVariable { entity: var, init });
        }
        functions.push(func);
    }

    let UnitContext {
        entities,
        constants,
        labels,
        ..
    } = unit;

    Mir {
        entities,
        constants,
        variables,
        functions,
        named_constants,
        undefined,
        labels,
    }
}

/// Static locals of the same name are numbered in the order they are met
/// across the unit so their symbols are distinct.
fn number_static_local(entities: &mut EntityTable, sequence: &mut HashMap<String, u64>, var: EntityId) {
    let entity = entities.get_mut(var);
    let seq = sequence.entry(entity.name.clone()).or_insert(0);
    entity.set_sequence(*seq);
    *seq += 1;
}

fn static_initializer(unit: &mut UnitContext, var: EntityId) -> Option<Expr> {
    let entity = unit.entities.get(var);
    let init = entity.initializer()?.clone();
    if unit.types.is_aggregate(entity.ty()) {
        let err = TransformError::NonConstantInitializer(entity.name.clone());
        let location = init.location.or(entity.location);
        unit.handler.report_error(CompilerError::new(location, err));
        return None;
    }
    static_value(unit, var, &init)
}

fn static_value(unit: &mut UnitContext, id: EntityId, init: &crate::compiler::ast::Expr) -> Option<Expr> {
    let value = FuncTransformer::constant(unit, id, init);
    if value.is_none() {
        let entity = unit.entities.get(id);
        let err = TransformError::NonConstantInitializer(entity.name.clone());
        let location = init.location.or(entity.location);
        unit.handler.report_error(CompilerError::new(location, err));
    }
    value
}
