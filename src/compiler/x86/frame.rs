//! Stack frame layout for one function.  Locals are placed below `%ebp`
//! with the same alignment rules as struct members; parameters are above
//! the saved `%ebp` and the return address, one stack word each.

use log::trace;

use crate::compiler::{
    arch::registers::RegSize,
    entity::{EntityId, EntityTable, Storage},
    mir::ir::Function,
    types::{align, layout::SequentialAllocator, TypeTable},
    x86::assembly::{MemRef, RegClass},
};

/// Size of one stack word.
pub const STACK_WORD: u64 = 4;

/// Distance from `%ebp` to the first parameter: the saved `%ebp` and the
/// return address.
pub const PARAM_BASE: i64 = 8;

#[derive(Debug, PartialEq)]
pub struct FrameLayout {
    /// Bytes reserved below `%ebp`, a multiple of the stack word.
    pub size: u64,
    pub params: Vec<(EntityId, i64)>,
    pub locals: Vec<(EntityId, i64)>,
}

impl FrameLayout {
    /// Computes the offsets from `%ebp` of every parameter and stack
    /// variable of `func`.  Temporaries are in the function's scope and
    /// get slots like any other local.
    pub fn compute(func: &Function, entities: &EntityTable, types: &TypeTable) -> FrameLayout {
        let params = func
            .params
            .iter()
            .enumerate()
            .map(|(idx, p)| (*p, PARAM_BASE + (idx as u64 * STACK_WORD) as i64))
            .collect();

        let mut alloc = SequentialAllocator::new();
        let locals = func
            .scope
            .all_local_variables(entities)
            .into_iter()
            .map(|v| {
                let ty = entities.get(v).ty();
                let offset = alloc.allocate_down(types.size(ty), types.alignment(ty));
                (v, -(offset as i64))
            })
            .collect();

        FrameLayout {
            size: align(alloc.size(), STACK_WORD),
            params,
            locals,
        }
    }

    /// Records the slot of every parameter and local as its storage.
    pub fn assign(&self, entities: &mut EntityTable) {
        let ebp = RegClass::Bp.for_type(RegSize::R32);
        for (id, offset) in self.params.iter().chain(self.locals.iter()) {
            trace!("{} at {}(%ebp)", entities.get(*id).name, offset);
            entities
                .get_mut(*id)
                .set_storage(Storage::Memory(MemRef::based(ebp, *offset)));
        }
    }
}
