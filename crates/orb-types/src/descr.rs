//! The composite type shapes a [`crate::TypeId`] can denote: decorated
//! descriptors, tuples, named data types, and callables (spec.md §3).

use crate::primitive::Primitive;
use orb_common::NameId;
use smallvec::SmallVec;

/// A tagged handle into the [`crate::TypeTable`]. Two `TypeId`s compare
/// equal iff they denote the same canonical type (spec.md "Type
/// registration is canonicalizing").
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TypeId {
    Primitive(Primitive),
    /// Index into the table's descriptor arena.
    Descr(u32),
    /// Index into the table's tuple arena.
    Tuple(u32),
    /// Index into the table's named-alias arena (`sym T : type = ...`).
    NamedCustom(u32),
    /// Index into the table's named-data arena (`data` definitions).
    NamedData(u32),
    /// Index into the table's callable-signature arena.
    Callable(u32),
}

/// One decorator layer, left-to-right from the base outward.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Decor {
    Pointer,
    Array(u64),
    ArrayPointer,
}

/// A base type plus a decorator stack and a per-layer constness bit
/// (spec.md §3 "TypeDescr").
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct TypeDescr {
    pub base: TypeId,
    pub base_cn: bool,
    /// `decors[i]` pairs with `decor_cns[i]`; `decors` is ordered
    /// outward from the base (index 0 is closest to the base).
    pub decors: SmallVec<[Decor; 4]>,
    pub decor_cns: SmallVec<[bool; 4]>,
}

impl TypeDescr {
    #[must_use]
    pub fn base_only(base: TypeId, base_cn: bool) -> Self {
        Self {
            base,
            base_cn,
            decors: SmallVec::new(),
            decor_cns: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn is_singleton(&self) -> bool {
        self.decors.is_empty() && !self.base_cn
    }

    pub fn push_decor(&mut self, decor: Decor, cn: bool) {
        self.decors.push(decor);
        self.decor_cns.push(cn);
    }

    /// The constness of the outermost layer: the last decorator's bit if
    /// there is one, else the base's bit.
    #[must_use]
    pub fn outer_cn(&self) -> bool {
        self.decor_cns.last().copied().unwrap_or(self.base_cn)
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Tuple {
    pub members: SmallVec<[TypeId; 4]>,
}

#[derive(Clone, Debug)]
pub struct DataMember {
    pub name: NameId,
    pub ty: TypeId,
}

/// A named record type. `members.is_empty()` before the definition is
/// seen means "declared but opaque" (spec.md §3 "DataType").
#[derive(Clone, Debug)]
pub struct DataType {
    pub name: NameId,
    pub members: Vec<DataMember>,
}

impl DataType {
    #[must_use]
    pub fn is_declared_only(&self) -> bool {
        self.members.is_empty()
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Callable {
    pub is_func: bool,
    pub arg_types: SmallVec<[TypeId; 4]>,
    pub ret_type: Option<TypeId>,
    pub variadic: bool,
}

#[derive(Clone, Debug)]
pub struct NamedCustom {
    pub name: NameId,
    pub target: TypeId,
}
