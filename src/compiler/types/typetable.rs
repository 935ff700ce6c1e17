//! The system for keeping track of and defining the types used by a mat
//! compilation unit.

use std::{cell::OnceCell, collections::HashMap};

use log::debug;
use serde::Serialize;

use crate::{
    compiler::{CompilerError, Location, Resolution},
    diagnostics::ErrorHandler,
};

use super::{
    layout::{struct_layout, union_layout},
    CompositeKind, CompositeType, FunctionType, IntegerRank, IntegerType, Layout, Slot, Type,
    TypeDefinition, TypeError, TypeId, TypeRef, UserType,
};

/// How many bytes each integer rank and a pointer take.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct WidthProfile {
    pub name: &'static str,
    pub char_size: u64,
    pub short_size: u64,
    pub int_size: u64,
    pub long_size: u64,
    pub pointer_size: u64,
}

impl WidthProfile {
    pub const ILP32: WidthProfile = WidthProfile::new("ilp32", 4, 4, 4);
    pub const LP64: WidthProfile = WidthProfile::new("lp64", 4, 8, 8);
    pub const ILP64: WidthProfile = WidthProfile::new("ilp64", 8, 8, 8);
    pub const LLP64: WidthProfile = WidthProfile::new("llp64", 4, 4, 8);

    const fn new(name: &'static str, int_size: u64, long_size: u64, pointer_size: u64) -> Self {
        WidthProfile {
            name,
            char_size: 1,
            short_size: 2,
            int_size,
            long_size,
            pointer_size,
        }
    }

    pub fn by_name(name: &str) -> Option<WidthProfile> {
        [Self::ILP32, Self::LP64, Self::ILP64, Self::LLP64]
            .into_iter()
            .find(|p| p.name == name)
    }

    fn rank_size(&self, rank: IntegerRank) -> u64 {
        match rank {
            IntegerRank::Char => self.char_size,
            IntegerRank::Short => self.short_size,
            IntegerRank::Int => self.int_size,
            IntegerRank::Long => self.long_size,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Mark {
    Unvisited,
    Checking,
    Checked,
}

/// One line of a type table dump.
#[derive(Debug, Serialize)]
pub struct TypeSummary {
    pub id: TypeId,
    pub name: String,
    pub size: Option<u64>,
    pub alignment: Option<u64>,
    pub offsets: Vec<u64>,
}

/// Owns every [`Type`] used by one compilation unit.  Types are referred to
/// by [`TypeId`] and looked up by structural [`TypeRef`].  Pointer, array and
/// function types are created the first time they are looked up, user
/// defined types must be registered before use.
///
/// The layout of each type is computed on first request and cached.
#[derive(Debug)]
pub struct TypeTable {
    profile: WidthProfile,
    table: Vec<Type>,
    layouts: Vec<OnceCell<Layout>>,
    index: HashMap<TypeRef, TypeId>,
}

impl TypeTable {
    pub fn new(profile: WidthProfile) -> TypeTable {
        let mut table = TypeTable {
            profile,
            table: vec![],
            layouts: vec![],
            index: HashMap::new(),
        };

        table.put(TypeRef::Void, Type::Void);
        for rank in [
            IntegerRank::Char,
            IntegerRank::Short,
            IntegerRank::Int,
            IntegerRank::Long,
        ] {
            for signed in [true, false] {
                let tref = TypeRef::Integer { rank, signed };
                let ty = Type::Integer(IntegerType {
                    size: profile.rank_size(rank),
                    signed,
                    name: tref.to_string(),
                });
                table.put(tref, ty);
            }
        }

        table
    }

    pub fn ilp32() -> TypeTable {
        Self::new(WidthProfile::ILP32)
    }

    pub fn lp64() -> TypeTable {
        Self::new(WidthProfile::LP64)
    }

    pub fn ilp64() -> TypeTable {
        Self::new(WidthProfile::ILP64)
    }

    pub fn llp64() -> TypeTable {
        Self::new(WidthProfile::LLP64)
    }

    pub fn profile(&self) -> &WidthProfile {
        &self.profile
    }

    pub fn int_size(&self) -> u64 {
        self.profile.int_size
    }

    pub fn long_size(&self) -> u64 {
        self.profile.long_size
    }

    pub fn pointer_size(&self) -> u64 {
        self.profile.pointer_size
    }

    pub fn max_int_size(&self) -> u64 {
        self.profile.pointer_size
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &Type)> {
        self.table
            .iter()
            .enumerate()
            .map(|(idx, ty)| (TypeId(idx as u32), ty))
    }

    /// Registers `ty` under `tref`.
    ///
    /// # Panics
    /// If a type is already registered under `tref`.
    pub fn put(&mut self, tref: TypeRef, ty: Type) -> TypeId {
        if self.index.contains_key(&tref) {
            panic!("Duplicated type definition: {}", tref)
        }

        let id = TypeId(self.table.len() as u32);
        self.table.push(ty);
        self.layouts.push(OnceCell::new());
        self.index.insert(tref, id);
        id
    }

    pub fn is_defined(&self, tref: &TypeRef) -> bool {
        self.index.contains_key(tref)
    }

    /// Returns the [`TypeId`] for `tref` if it is already in the table.
    pub fn lookup(&self, tref: &TypeRef) -> Option<TypeId> {
        self.index.get(tref).copied()
    }

    /// Returns the canonical [`TypeId`] for `tref`, deriving pointer, array
    /// and function types which have not been seen before.
    ///
    /// # Panics
    /// If `tref` names a struct, union or typedef which was never registered.
    pub fn get(&mut self, tref: &TypeRef) -> TypeId {
        if let Some(id) = self.lookup(tref) {
            return id;
        }

        let ty = match tref {
            TypeRef::Pointer(base) => Type::Pointer {
                base: self.get(base),
            },
            TypeRef::Array(base, length) => Type::Array {
                base: self.get(base),
                length: *length,
            },
            TypeRef::Function {
                ret,
                params,
                vararg,
            } => {
                let ret = self.get(ret);
                let params = params.iter().map(|p| self.param_type(p)).collect();
                Type::Function(FunctionType {
                    ret,
                    params,
                    vararg: *vararg,
                })
            }
            TypeRef::Struct(_) | TypeRef::Union(_) | TypeRef::User(_) => {
                panic!("Undefined type: {}", tref)
            }
            TypeRef::Void | TypeRef::Integer { .. } => panic!("Unregistered type: {}", tref),
        };

        self.put(tref.clone(), ty)
    }

    /// The type of a parameter declared as `tref`: arrays are really
    /// pointers to their element type in parameter position.
    pub fn param_type(&mut self, tref: &TypeRef) -> TypeId {
        match tref {
            TypeRef::Array(base, _) => self.get(&TypeRef::Pointer(base.clone())),
            _ => self.get(tref),
        }
    }

    pub fn pointer_to(&mut self, base: TypeId) -> TypeId {
        let base_ref = self.type_ref(base);
        self.get(&TypeRef::pointer_to(base_ref))
    }

    /// Registers a user defined type.  The types of its members (or the
    /// real type of a typedef) are resolved by [`Self::resolve_definitions`]
    /// once every definition is registered.
    pub fn define(&mut self, def: &TypeDefinition) -> TypeId {
        let ty = match def {
            TypeDefinition::Struct {
                name,
                members,
                location,
            }
            | TypeDefinition::Union {
                name,
                members,
                location,
            } => {
                let kind = match def {
                    TypeDefinition::Struct { .. } => CompositeKind::Struct,
                    _ => CompositeKind::Union,
                };
                Type::Composite(CompositeType {
                    kind,
                    name: name.clone(),
                    members: members
                        .iter()
                        .map(|m| Slot {
                            name: m.name.clone(),
                            type_ref: m.ty.clone(),
                            ty: Resolution::Unresolved,
                            location: m.location,
                        })
                        .collect(),
                    location: *location,
                })
            }
            TypeDefinition::Typedef {
                name,
                real,
                location,
            } => Type::User(UserType {
                name: name.clone(),
                real_ref: real.clone(),
                real: Resolution::Unresolved,
                location: *location,
            }),
        };

        debug!("Define {}", def.type_ref());
        self.put(def.type_ref(), ty)
    }

    /// Resolves the member types of every struct and union and the real type
    /// of every typedef.
    pub fn resolve_definitions(&mut self) {
        for idx in 0..self.table.len() {
            let refs: Vec<TypeRef> = match &self.table[idx] {
                Type::Composite(ct) => ct
                    .members
                    .iter()
                    .filter(|s| !s.ty.is_resolved())
                    .map(|s| s.type_ref.clone())
                    .collect(),
                Type::User(ut) if !ut.real.is_resolved() => vec![ut.real_ref.clone()],
                _ => continue,
            };

            let ids: Vec<TypeId> = refs.iter().map(|r| self.get(r)).collect();
            match &mut self.table[idx] {
                Type::Composite(ct) => {
                    for (slot, id) in ct
                        .members
                        .iter_mut()
                        .filter(|s| !s.ty.is_resolved())
                        .zip(ids)
                    {
                        slot.ty.resolve(id, "member type");
                    }
                }
                Type::User(ut) => ut.real.resolve(ids[0], "typedef"),
                _ => unreachable!(),
            }
        }
    }

    pub fn def(&self, id: TypeId) -> &Type {
        &self.table[id.index()]
    }

    /// Returns the structural reference which was used to register `id`.
    pub fn type_ref(&self, id: TypeId) -> TypeRef {
        self.index
            .iter()
            .find(|(_, v)| **v == id)
            .map(|(k, _)| k.clone())
            .unwrap_or_else(|| panic!("{} is not in the type table", id))
    }

    /// Follows typedefs until a type which is not a typedef is found.
    ///
    /// # Panics
    /// If the typedefs form a cycle.
    pub fn real_type(&self, id: TypeId) -> TypeId {
        self.try_real_type(id)
            .unwrap_or_else(|| panic!("Cyclic typedef: {}", self.name_of(id)))
    }

    /// Like [`TypeTable::real_type`], but returns `None` if the typedefs
    /// form a cycle.
    fn try_real_type(&self, id: TypeId) -> Option<TypeId> {
        let mut current = id;
        for _ in 0..=self.table.len() {
            match self.def(current) {
                Type::User(ut) => current = *ut.real.get("typedef"),
                _ => return Some(current),
            }
        }
        None
    }

    fn real_def(&self, id: TypeId) -> &Type {
        self.def(self.real_type(id))
    }

    pub fn is_void(&self, id: TypeId) -> bool {
        matches!(self.real_def(id), Type::Void)
    }

    pub fn is_integer(&self, id: TypeId) -> bool {
        matches!(self.real_def(id), Type::Integer(_))
    }

    /// Pointers compare and divide as unsigned values.
    pub fn is_signed(&self, id: TypeId) -> bool {
        match self.real_def(id) {
            Type::Integer(it) => it.signed,
            _ => false,
        }
    }

    pub fn is_pointer(&self, id: TypeId) -> bool {
        matches!(self.real_def(id), Type::Pointer { .. })
    }

    pub fn is_array(&self, id: TypeId) -> bool {
        matches!(self.real_def(id), Type::Array { .. })
    }

    pub fn is_composite(&self, id: TypeId) -> bool {
        matches!(self.real_def(id), Type::Composite(_))
    }

    pub fn is_function(&self, id: TypeId) -> bool {
        matches!(self.real_def(id), Type::Function(_))
    }

    /// Integers and pointers: the types whose values fit in a register.
    pub fn is_scalar(&self, id: TypeId) -> bool {
        self.is_integer(id) || self.is_pointer(id)
    }

    /// Structs, unions and arrays: the types which are only accessed through
    /// their address.
    pub fn is_aggregate(&self, id: TypeId) -> bool {
        self.is_composite(id) || self.is_array(id)
    }

    /// Arrays and pointers both have an element type.
    pub fn is_pointer_like(&self, id: TypeId) -> bool {
        self.is_pointer(id) || self.is_array(id)
    }

    /// The element type of a pointer or an array.
    pub fn base_type(&self, id: TypeId) -> TypeId {
        match self.real_def(id) {
            Type::Pointer { base } | Type::Array { base, .. } => *base,
            _ => panic!("{} has no base type", self.name_of(id)),
        }
    }

    pub fn composite(&self, id: TypeId) -> &CompositeType {
        match self.real_def(id) {
            Type::Composite(ct) => ct,
            _ => panic!("{} is not a struct or union", self.name_of(id)),
        }
    }

    /// The function type of `id`, looking through one level of pointer.
    pub fn function(&self, id: TypeId) -> &FunctionType {
        match self.real_def(id) {
            Type::Function(ft) => ft,
            Type::Pointer { base } => match self.real_def(*base) {
                Type::Function(ft) => ft,
                _ => panic!("{} is not callable", self.name_of(id)),
            },
            _ => panic!("{} is not callable", self.name_of(id)),
        }
    }

    /// Looks up the member `name` of the struct or union `id` and returns
    /// its type and byte offset.
    pub fn member(&self, id: TypeId, name: &str) -> Option<(TypeId, u64)> {
        let ct = self.composite(id);
        let idx = ct.member_index(name)?;
        let offset = self.layout(id).offsets[idx];
        Some((ct.members[idx].ty(), offset))
    }

    pub fn size(&self, id: TypeId) -> u64 {
        self.layout(id).size
    }

    pub fn alignment(&self, id: TypeId) -> u64 {
        self.layout(id).alignment
    }

    /// Computes the layout of `id` on first use and caches it.
    ///
    /// # Panics
    /// For function types, which have no size, and for types which contain
    /// themselves.
    pub fn layout(&self, id: TypeId) -> &Layout {
        self.layouts[id.index()].get_or_init(|| self.compute_layout(id))
    }

    fn compute_layout(&self, id: TypeId) -> Layout {
        match self.def(id) {
            Type::Void => Layout::scalar(1, 1),
            Type::Integer(it) => Layout::scalar(it.size, it.size),
            Type::Pointer { .. } => {
                Layout::scalar(self.profile.pointer_size, self.profile.pointer_size)
            }
            Type::Array { base, length } => Layout::scalar(
                self.size(*base) * length.unwrap_or(0),
                self.alignment(*base),
            ),
            Type::Composite(ct) => {
                let members = ct
                    .members
                    .iter()
                    .map(|s| (self.size(s.ty()), self.alignment(s.ty())));
                match ct.kind {
                    CompositeKind::Struct => struct_layout(members),
                    CompositeKind::Union => union_layout(members),
                }
            }
            Type::Function(_) => panic!("Function type has no size"),
            Type::User(ut) => self.layout(*ut.real.get("typedef")).clone(),
        }
    }

    /// The signed integer type with the same size as a pointer.
    ///
    /// # Panics
    /// If the profile has no such integer type.
    pub fn ptr_diff_type(&self) -> TypeId {
        let rank = [IntegerRank::Long, IntegerRank::Int, IntegerRank::Short]
            .into_iter()
            .find(|r| self.profile.rank_size(*r) == self.profile.pointer_size)
            .unwrap_or_else(|| {
                panic!(
                    "No integer type has the size of a pointer in {}",
                    self.profile.name
                )
            });
        self.integer(rank, true)
    }

    pub fn signed_stack_type(&self) -> TypeId {
        self.integer(IntegerRank::Long, true)
    }

    pub fn unsigned_stack_type(&self) -> TypeId {
        self.integer(IntegerRank::Long, false)
    }

    pub fn integer(&self, rank: IntegerRank, signed: bool) -> TypeId {
        self.lookup(&TypeRef::Integer { rank, signed })
            .expect("Base integer types are always registered")
    }

    pub fn void(&self) -> TypeId {
        self.lookup(&TypeRef::Void)
            .expect("Void is always registered")
    }

    pub fn int(&self) -> TypeId {
        self.integer(IntegerRank::Int, true)
    }

    /// A readable name for `id`, used in diagnostics and dumps.
    pub fn name_of(&self, id: TypeId) -> String {
        match self.def(id) {
            Type::Void => "void".into(),
            Type::Integer(it) => it.name.clone(),
            Type::Pointer { base } => format!("{}*", self.name_of(*base)),
            Type::Array {
                base,
                length: Some(len),
            } => format!("{}[{}]", self.name_of(*base), len),
            Type::Array { base, length: None } => format!("{}[]", self.name_of(*base)),
            Type::Composite(ct) => format!("{} {}", ct.kind, ct.name),
            Type::Function(ft) => {
                let mut params: Vec<String> =
                    ft.params.iter().map(|p| self.name_of(*p)).collect();
                if ft.vararg {
                    params.push("...".into());
                }
                format!("{}({})", self.name_of(ft.ret), params.join(", "))
            }
            Type::User(ut) => ut.name.clone(),
        }
    }

    /// Validates every type in the table: composites and arrays must not
    /// contain void, member names must be unique, and no type may contain
    /// itself by value.  Problems are reported to `handler`.
    pub fn semantic_check(&self, handler: &mut ErrorHandler) {
        let mut marks = vec![Mark::Unvisited; self.table.len()];
        let mut path = vec![];

        for (id, ty) in self.iter() {
            match ty {
                Type::Composite(ct) => {
                    self.check_void_members(ct, handler);
                    self.check_duplicated_members(ct, handler);
                }
                Type::Array { base, .. } => {
                    if self.is_void_member(*base) {
                        handler.report_error(CompilerError::new(None, TypeError::VoidArrayElement))
                    }
                }
                _ => (),
            }
            self.check_recursive_definition(id, &mut marks, &mut path, handler);
        }
    }

    /// Cyclic typedefs are left to the recursion check.
    fn is_void_member(&self, id: TypeId) -> bool {
        self.try_real_type(id)
            .map_or(false, |t| matches!(self.def(t), Type::Void))
    }

    fn check_void_members(&self, ct: &CompositeType, handler: &mut ErrorHandler) {
        for slot in &ct.members {
            if self.is_void_member(slot.ty()) {
                handler.report_error(CompilerError::new(
                    ct.location,
                    TypeError::VoidMember(format!("{} {}", ct.kind, ct.name)),
                ))
            }
        }
    }

    fn check_duplicated_members(&self, ct: &CompositeType, handler: &mut ErrorHandler) {
        let mut seen = std::collections::HashSet::new();
        for slot in &ct.members {
            if !seen.insert(slot.name.as_str()) {
                handler.report_error(CompilerError::new(
                    ct.location,
                    TypeError::DuplicatedMember(
                        format!("{} {}", ct.kind, ct.name),
                        slot.name.clone(),
                    ),
                ))
            }
        }
    }

    /// Depth first walk over the by-value edges of the type graph: members
    /// of composites, elements of arrays, and the real type of typedefs.
    /// Pointers break cycles so they are not followed.
    fn check_recursive_definition(
        &self,
        id: TypeId,
        marks: &mut Vec<Mark>,
        path: &mut Vec<TypeId>,
        handler: &mut ErrorHandler,
    ) {
        match marks[id.index()] {
            Mark::Checked => (),
            Mark::Checking => {
                let start = path.iter().position(|p| *p == id).unwrap_or(0);
                let culprit = path[start..]
                    .iter()
                    .copied()
                    .find(|t| self.def(*t).name().is_some())
                    .unwrap_or(id);
                self.report_recursion(culprit, handler);
                marks[id.index()] = Mark::Checked;
            }
            Mark::Unvisited => {
                marks[id.index()] = Mark::Checking;
                path.push(id);
                for next in self.value_edges(id) {
                    self.check_recursive_definition(next, marks, path, handler);
                }
                path.pop();
                marks[id.index()] = Mark::Checked;
            }
        }
    }

    fn value_edges(&self, id: TypeId) -> Vec<TypeId> {
        match self.def(id) {
            Type::Composite(ct) => ct.members.iter().map(|s| s.ty()).collect(),
            Type::Array { base, .. } => vec![*base],
            Type::User(ut) => vec![*ut.real.get("typedef")],
            _ => vec![],
        }
    }

    fn report_recursion(&self, id: TypeId, handler: &mut ErrorHandler) {
        let location: Option<Location> = self.def(id).location();
        handler.report_error(CompilerError::new(
            location,
            TypeError::RecursiveDefinition(self.name_of(id)),
        ))
    }

    /// Summarizes every type in the table.  Sizes are only computed for
    /// types that have one.
    pub fn dump(&self) -> Vec<TypeSummary> {
        self.iter()
            .map(|(id, _)| {
                let sized = !self.is_function(id);
                let layout = if sized { Some(self.layout(id)) } else { None };
                TypeSummary {
                    id,
                    name: self.name_of(id),
                    size: layout.map(|l| l.size),
                    alignment: layout.map(|l| l.alignment),
                    offsets: layout.map(|l| l.offsets.clone()).unwrap_or_default(),
                }
            })
            .collect()
    }
}
