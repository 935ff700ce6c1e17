use std::collections::HashMap;

use serde::Serialize;

use crate::compiler::x86::assembly::MemRef;

/// The unique identifier of a string literal in the [`ConstantTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ConstantId(u32);

impl ConstantId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ConstantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("S{}", self.0))
    }
}

/// A string literal and, once the code generator has placed it, the label
/// of its data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstantEntry {
    pub value: String,
    pub symbol: Option<String>,
}

impl ConstantEntry {
    /// The memory holding the string.
    ///
    /// # Panics
    /// If the code generator has not placed the string yet.
    pub fn memref(&self) -> MemRef {
        match &self.symbol {
            Some(sym) => MemRef::symbol(sym),
            None => panic!("String constant {:?} has no label", self.value),
        }
    }
}

/**
Stores a table of all distinct string literals used by a program.  MIR
refers to a literal by its [`ConstantId`] and the code generator emits one
read only data entry per literal.

Inserting a string which is already in the table returns the existing ID, so
each distinct literal is emitted once.  Entries are kept in insertion order.
 */
#[derive(Debug, Default, Serialize)]
pub struct ConstantTable {
    entries: Vec<ConstantEntry>,
    #[serde(skip)]
    index: HashMap<String, ConstantId>,
}

impl ConstantTable {
    pub fn new() -> ConstantTable {
        ConstantTable::default()
    }

    /// Inserts a string into the table and returns the assigned ID for that
    /// string value.
    pub fn intern(&mut self, s: &str) -> ConstantId {
        if let Some(id) = self.index.get(s) {
            return *id;
        }

        let id = ConstantId(self.entries.len() as u32);
        self.entries.push(ConstantEntry {
            value: s.into(),
            symbol: None,
        });
        self.index.insert(s.into(), id);
        id
    }

    pub fn find(&self, s: &str) -> Option<ConstantId> {
        self.index.get(s).copied()
    }

    pub fn get(&self, id: ConstantId) -> &ConstantEntry {
        &self.entries[id.index()]
    }

    pub fn get_mut(&mut self, id: ConstantId) -> &mut ConstantEntry {
        &mut self.entries[id.index()]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConstantId, &ConstantEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(idx, e)| (ConstantId(idx as u32), e))
    }

    pub fn ids(&self) -> Vec<ConstantId> {
        (0..self.entries.len() as u32).map(ConstantId).collect()
    }
}
