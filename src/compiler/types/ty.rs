use serde::Serialize;

use crate::compiler::{Location, Resolution};

use super::TypeRef;

/// Handle to a [`Type`] stored in a [`TypeTable`](super::TypeTable).  Two
/// structurally identical type references always map to the same TypeId.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TypeId(pub(super) u32);

impl TypeId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("T{}", self.0))
    }
}

/// Every type a mat program can use.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Type {
    Void,
    Integer(IntegerType),
    Pointer { base: TypeId },
    Array { base: TypeId, length: Option<u64> },
    Composite(CompositeType),
    Function(FunctionType),
    User(UserType),
}

impl Type {
    /// The name used when the type is referred to in a diagnostic.  Only
    /// named types (composites and typedefs) have one.
    pub fn name(&self) -> Option<String> {
        match self {
            Type::Composite(ct) => Some(format!("{} {}", ct.kind, ct.name)),
            Type::User(ut) => Some(ut.name.clone()),
            _ => None,
        }
    }

    pub fn location(&self) -> Option<Location> {
        match self {
            Type::Composite(ct) => ct.location,
            Type::User(ut) => ut.location,
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IntegerType {
    pub size: u64,
    pub signed: bool,
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CompositeKind {
    Struct,
    Union,
}

impl std::fmt::Display for CompositeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompositeKind::Struct => f.write_str("struct"),
            CompositeKind::Union => f.write_str("union"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompositeType {
    pub kind: CompositeKind,
    pub name: String,
    pub members: Vec<Slot>,
    pub location: Option<Location>,
}

impl CompositeType {
    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|s| s.name == name)
    }
}

/// A member of a struct or union.  The type of the member is resolved once
/// every user defined type has been registered; the byte offset of the
/// member is part of the composite's [`Layout`](super::Layout).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Slot {
    pub name: String,
    pub type_ref: TypeRef,
    pub ty: Resolution<TypeId>,
    pub location: Option<Location>,
}

impl Slot {
    pub fn ty(&self) -> TypeId {
        *self.ty.get("member type")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FunctionType {
    pub ret: TypeId,
    pub params: Vec<TypeId>,
    pub vararg: bool,
}

/// A typedef: a new name for an existing type.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserType {
    pub name: String,
    pub real_ref: TypeRef,
    pub real: Resolution<TypeId>,
    pub location: Option<Location>,
}
