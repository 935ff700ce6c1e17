use serde::{Deserialize, Serialize};

use crate::compiler::{
    ast::{Block, Expr},
    types::{TypeId, TypeRef, TypeTable},
    x86::assembly::{Immediate, MemRef, Operand, Reg},
    Location, Resolution,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u32);

impl EntityId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("E{}", self.0))
    }
}

/// Where the value of an entity lives once the code generator has placed
/// it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Storage {
    Register(Reg),
    /// The value is in memory: a stack slot or labelled data.
    Memory(MemRef),
    /// The value is a constant known to the assembler: a function's address
    /// or the value of a constant.
    Immediate(Immediate),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum EntityKind {
    DefinedVariable {
        #[serde(default)]
        initializer: Option<Expr>,
    },
    UndefinedVariable,
    Parameter,
    DefinedFunction {
        params: Vec<EntityId>,
        body: Block,
    },
    UndefinedFunction,
    Constant {
        value: Expr,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
    /// Private entities are not visible outside the unit: `static` globals
    /// and functions, and static local variables.
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub location: Option<Location>,
    pub kind: EntityKind,

    #[serde(skip_deserializing)]
    ty: Resolution<TypeId>,
    #[serde(skip_deserializing)]
    storage: Resolution<Storage>,
    #[serde(skip)]
    n_referred: u64,
    #[serde(skip)]
    sequence: Option<u64>,
}

impl Entity {
    pub fn new(name: &str, type_ref: TypeRef, kind: EntityKind) -> Entity {
        Entity {
            name: name.into(),
            type_ref,
            private: false,
            location: None,
            kind,
            ty: Resolution::Unresolved,
            storage: Resolution::Unresolved,
            n_referred: 0,
            sequence: None,
        }
    }

    pub fn private(mut self) -> Entity {
        self.private = true;
        self
    }

    pub fn at(mut self, location: Location) -> Entity {
        self.location = Some(location);
        self
    }

    pub fn ty(&self) -> TypeId {
        *self.ty.get(&format!("type of {}", self.name))
    }

    pub fn is_type_resolved(&self) -> bool {
        self.ty.is_resolved()
    }

    pub fn set_type(&mut self, ty: TypeId) {
        let what = format!("type of {}", self.name);
        self.ty.resolve(ty, &what)
    }

    pub fn storage(&self) -> &Storage {
        self.storage.get(&format!("storage of {}", self.name))
    }

    pub fn has_storage(&self) -> bool {
        self.storage.is_resolved()
    }

    /// Places this entity.  An entity is placed exactly once.
    pub fn set_storage(&mut self, storage: Storage) {
        let what = format!("storage of {}", self.name);
        self.storage.resolve(storage, &what)
    }

    /// The address of this entity as an immediate, if the assembler knows
    /// it: labelled data and functions.
    pub fn address(&self) -> Option<Operand> {
        match self.storage() {
            Storage::Memory(MemRef {
                base: None,
                index: None,
                offset,
                symbol: Some(sym),
            }) => Some(Operand::Immediate(Immediate::Symbol(if *offset == 0 {
                sym.clone()
            } else {
                format!("{}+{}", sym, offset)
            }))),
            Storage::Immediate(Immediate::Symbol(sym)) if self.is_function() => {
                Some(Operand::Immediate(Immediate::Symbol(sym.clone())))
            }
            _ => None,
        }
    }

    pub fn referred(&mut self) {
        self.n_referred += 1
    }

    pub fn is_referred(&self) -> bool {
        self.n_referred > 0
    }

    pub fn set_sequence(&mut self, seq: u64) {
        self.sequence = Some(seq)
    }

    /// The assembler symbol for this entity.  Static local variables are
    /// numbered so that two of them with the same name do not collide.
    pub fn symbol(&self) -> String {
        match self.sequence {
            Some(seq) => format!("{}.{}", self.name, seq),
            None => self.name.clone(),
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(
            self.kind,
            EntityKind::DefinedVariable { .. } | EntityKind::UndefinedVariable | EntityKind::Parameter
        )
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self.kind, EntityKind::Parameter)
    }

    pub fn is_function(&self) -> bool {
        matches!(
            self.kind,
            EntityKind::DefinedFunction { .. } | EntityKind::UndefinedFunction
        )
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, EntityKind::Constant { .. })
    }

    pub fn is_defined(&self) -> bool {
        !matches!(
            self.kind,
            EntityKind::UndefinedVariable | EntityKind::UndefinedFunction
        )
    }

    /// Temporaries are created by the compiler, never by the user.
    pub fn is_temporary(&self) -> bool {
        self.name.starts_with('@')
    }

    pub fn initializer(&self) -> Option<&Expr> {
        match &self.kind {
            EntityKind::DefinedVariable { initializer } => initializer.as_ref(),
            _ => None,
        }
    }

    pub fn constant_value(&self) -> Option<&Expr> {
        match &self.kind {
            EntityKind::Constant { value } => Some(value),
            _ => None,
        }
    }
}

/// Owns every entity of a compilation unit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityTable {
    entities: Vec<Entity>,
}

impl EntityTable {
    pub fn new() -> EntityTable {
        EntityTable { entities: vec![] }
    }

    pub fn add(&mut self, entity: Entity) -> EntityId {
        self.entities.push(entity);
        EntityId(self.entities.len() as u32 - 1)
    }

    pub fn get(&self, id: EntityId) -> &Entity {
        self.entities
            .get(id.index())
            .unwrap_or_else(|| panic!("{} is not in the entity table", id))
    }

    pub fn get_mut(&mut self, id: EntityId) -> &mut Entity {
        self.entities
            .get_mut(id.index())
            .unwrap_or_else(|| panic!("{} is not in the entity table", id))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities
            .iter()
            .enumerate()
            .map(|(idx, e)| (EntityId(idx as u32), e))
    }

    /// Looks up the type of every entity in `types`.  Parameters declared
    /// as arrays get pointer types.
    pub fn resolve_types(&mut self, types: &mut TypeTable) {
        for entity in self.entities.iter_mut().filter(|e| !e.is_type_resolved()) {
            let ty = if entity.is_parameter() {
                types.param_type(&entity.type_ref)
            } else {
                types.get(&entity.type_ref)
            };
            entity.set_type(ty);
        }
    }

    /// Creates a compiler temporary of type `ty`.
    pub fn allocate_tmp(&mut self, types: &TypeTable, ty: TypeId) -> EntityId {
        let name = format!("@tmp{}", self.entities.len());
        let mut tmp = Entity::new(
            &name,
            types.type_ref(ty),
            EntityKind::DefinedVariable { initializer: None },
        );
        tmp.set_type(ty);
        self.add(tmp)
    }
}
