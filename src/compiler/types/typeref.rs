use serde::{Deserialize, Serialize};

/// The C style integer ranks.  How many bytes each rank takes is decided by
/// the width profile of the [`TypeTable`](super::TypeTable).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegerRank {
    Char,
    Short,
    Int,
    Long,
}

impl std::fmt::Display for IntegerRank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegerRank::Char => f.write_str("char"),
            IntegerRank::Short => f.write_str("short"),
            IntegerRank::Int => f.write_str("int"),
            IntegerRank::Long => f.write_str("long"),
        }
    }
}

/**
A structural reference to a type.  This is what upstream passes attach to
declarations and expressions, and it is the key used to look up the
canonical [`Type`](super::Type) in the [`TypeTable`](super::TypeTable).

Named references (structs, unions and typedefs) must be registered in the
table before they are looked up.  Pointer, array and function references are
derived from the references they contain the first time they are looked up.
 */
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    Void,
    Integer { rank: IntegerRank, signed: bool },
    Struct(String),
    Union(String),
    User(String),
    Pointer(Box<TypeRef>),
    /// An array with no length is an incomplete array: a flexible trailing
    /// member or an array parameter.
    Array(Box<TypeRef>, Option<u64>),
    Function {
        ret: Box<TypeRef>,
        params: Vec<TypeRef>,
        #[serde(default)]
        vararg: bool,
    },
}

impl TypeRef {
    pub fn signed(rank: IntegerRank) -> TypeRef {
        TypeRef::Integer { rank, signed: true }
    }

    pub fn unsigned(rank: IntegerRank) -> TypeRef {
        TypeRef::Integer {
            rank,
            signed: false,
        }
    }

    pub fn char() -> TypeRef {
        Self::signed(IntegerRank::Char)
    }

    pub fn short() -> TypeRef {
        Self::signed(IntegerRank::Short)
    }

    pub fn int() -> TypeRef {
        Self::signed(IntegerRank::Int)
    }

    pub fn long() -> TypeRef {
        Self::signed(IntegerRank::Long)
    }

    pub fn uchar() -> TypeRef {
        Self::unsigned(IntegerRank::Char)
    }

    pub fn uint() -> TypeRef {
        Self::unsigned(IntegerRank::Int)
    }

    pub fn ulong() -> TypeRef {
        Self::unsigned(IntegerRank::Long)
    }

    pub fn pointer_to(base: TypeRef) -> TypeRef {
        TypeRef::Pointer(Box::new(base))
    }

    pub fn array_of(base: TypeRef, length: u64) -> TypeRef {
        TypeRef::Array(Box::new(base), Some(length))
    }

    pub fn function(ret: TypeRef, params: Vec<TypeRef>, vararg: bool) -> TypeRef {
        TypeRef::Function {
            ret: Box::new(ret),
            params,
            vararg,
        }
    }

    /// Returns true if this reference names a user defined type, which must
    /// be registered explicitly rather than derived.
    pub fn is_named(&self) -> bool {
        matches!(self, TypeRef::Struct(_) | TypeRef::Union(_) | TypeRef::User(_))
    }
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeRef::Void => f.write_str("void"),
            TypeRef::Integer { rank, signed: true } => f.write_fmt(format_args!("{}", rank)),
            TypeRef::Integer {
                rank,
                signed: false,
            } => f.write_fmt(format_args!("unsigned {}", rank)),
            TypeRef::Struct(name) => f.write_fmt(format_args!("struct {}", name)),
            TypeRef::Union(name) => f.write_fmt(format_args!("union {}", name)),
            TypeRef::User(name) => f.write_str(name),
            TypeRef::Pointer(base) => f.write_fmt(format_args!("{}*", base)),
            TypeRef::Array(base, Some(len)) => f.write_fmt(format_args!("{}[{}]", base, len)),
            TypeRef::Array(base, None) => f.write_fmt(format_args!("{}[]", base)),
            TypeRef::Function {
                ret,
                params,
                vararg,
            } => {
                f.write_fmt(format_args!("{}(", ret))?;
                for (idx, p) in params.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_fmt(format_args!("{}", p))?;
                }
                if *vararg {
                    f.write_str(", ...")?;
                }
                f.write_str(")")
            }
        }
    }
}
