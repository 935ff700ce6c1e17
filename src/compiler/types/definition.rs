use serde::{Deserialize, Serialize};

use crate::compiler::Location;

use super::TypeRef;

/// A user defined type, as handed over by the upstream resolver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeDefinition {
    Struct {
        name: String,
        members: Vec<MemberDecl>,
        #[serde(default)]
        location: Option<Location>,
    },
    Union {
        name: String,
        members: Vec<MemberDecl>,
        #[serde(default)]
        location: Option<Location>,
    },
    Typedef {
        name: String,
        real: TypeRef,
        #[serde(default)]
        location: Option<Location>,
    },
}

impl TypeDefinition {
    /// The reference which names this definition.
    pub fn type_ref(&self) -> TypeRef {
        match self {
            TypeDefinition::Struct { name, .. } => TypeRef::Struct(name.clone()),
            TypeDefinition::Union { name, .. } => TypeRef::Union(name.clone()),
            TypeDefinition::Typedef { name, .. } => TypeRef::User(name.clone()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemberDecl {
    pub name: String,
    pub ty: TypeRef,
    #[serde(default)]
    pub location: Option<Location>,
}

impl MemberDecl {
    pub fn new(name: &str, ty: TypeRef) -> MemberDecl {
        MemberDecl {
            name: name.into(),
            ty,
            location: None,
        }
    }
}
