//! The canonical type registry (spec.md §3, §4.1), grounded on
//! `original_source/src/TypeTable.cpp`'s `worksAs*`/`isImplicitCastable`
//! family, re-expressed with hash-based canonicalization instead of the
//! original's linear scans (spec.md explicitly permits either).

use crate::descr::{Callable, DataMember, DataType, Decor, NamedCustom, Tuple, TypeDescr, TypeId};
use crate::primitive::Primitive;
use orb_common::NameId;
use rustc_hash::FxHashMap;

/// Failure modes from table operations that ask the caller (the
/// processor, which owns `CompilationMessages`) to raise a diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeError {
    EmptyTuple,
    DataNameTaken,
    DataAlreadyDefined,
    InvalidType,
}

pub struct TypeTable {
    descrs: Vec<TypeDescr>,
    descr_lookup: FxHashMap<TypeDescr, u32>,

    tuples: Vec<Tuple>,
    tuple_lookup: FxHashMap<Tuple, u32>,

    callables: Vec<Callable>,
    callable_lookup: FxHashMap<Callable, u32>,

    data_types: Vec<DataType>,
    data_by_name: FxHashMap<NameId, u32>,

    customs: Vec<NamedCustom>,
    custom_by_name: FxHashMap<NameId, u32>,

    str_type: TypeId,
}

impl TypeTable {
    #[must_use]
    pub fn new() -> Self {
        let mut t = Self {
            descrs: Vec::new(),
            descr_lookup: FxHashMap::default(),
            tuples: Vec::new(),
            tuple_lookup: FxHashMap::default(),
            callables: Vec::new(),
            callable_lookup: FxHashMap::default(),
            data_types: Vec::new(),
            data_by_name: FxHashMap::default(),
            customs: Vec::new(),
            custom_by_name: FxHashMap::default(),
            str_type: TypeId::Primitive(Primitive::C8),
        };
        let mut str_descr = TypeDescr::base_only(TypeId::Primitive(Primitive::C8), true);
        str_descr.push_decor(Decor::ArrayPointer, false);
        t.str_type = t.add_type_descr(str_descr);
        t
    }

    // ---- registration ----------------------------------------------

    pub fn add_type_descr(&mut self, descr: TypeDescr) -> TypeId {
        if descr.is_singleton() {
            return descr.base;
        }
        if let Some(&idx) = self.descr_lookup.get(&descr) {
            return TypeId::Descr(idx);
        }
        let idx = u32::try_from(self.descrs.len()).expect("type descriptor arena overflow");
        self.descr_lookup.insert(descr.clone(), idx);
        self.descrs.push(descr);
        TypeId::Descr(idx)
    }

    pub fn add_tuple(&mut self, members: Vec<TypeId>) -> Result<TypeId, TypeError> {
        if members.is_empty() {
            return Err(TypeError::EmptyTuple);
        }
        if members.len() == 1 {
            return Ok(members[0]);
        }
        let tuple = Tuple {
            members: members.into_iter().collect(),
        };
        if let Some(&idx) = self.tuple_lookup.get(&tuple) {
            return Ok(TypeId::Tuple(idx));
        }
        let idx = u32::try_from(self.tuples.len()).expect("tuple arena overflow");
        self.tuple_lookup.insert(tuple.clone(), idx);
        self.tuples.push(tuple);
        Ok(TypeId::Tuple(idx))
    }

    pub fn add_callable(&mut self, sig: Callable) -> TypeId {
        if let Some(&idx) = self.callable_lookup.get(&sig) {
            return TypeId::Callable(idx);
        }
        let idx = u32::try_from(self.callables.len()).expect("callable arena overflow");
        self.callable_lookup.insert(sig.clone(), idx);
        self.callables.push(sig);
        TypeId::Callable(idx)
    }

    /// First call with `fields.is_empty()` forward-declares; the matching
    /// later call with non-empty fields defines it once. A second
    /// non-empty call fails (spec.md §4.1 `addDataType`).
    pub fn add_data_type(
        &mut self,
        name: NameId,
        fields: Vec<DataMember>,
    ) -> Result<TypeId, TypeError> {
        if let Some(&idx) = self.data_by_name.get(&name) {
            let existing = &mut self.data_types[idx as usize];
            if fields.is_empty() {
                return Ok(TypeId::NamedData(idx));
            }
            if !existing.is_declared_only() {
                return Err(TypeError::DataAlreadyDefined);
            }
            existing.members = fields;
            return Ok(TypeId::NamedData(idx));
        }
        if self.custom_by_name.contains_key(&name) {
            return Err(TypeError::DataNameTaken);
        }
        let idx = u32::try_from(self.data_types.len()).expect("data type arena overflow");
        self.data_types.push(DataType { name, members: fields });
        self.data_by_name.insert(name, idx);
        Ok(TypeId::NamedData(idx))
    }

    pub fn add_named_custom(&mut self, name: NameId, target: TypeId) -> Result<TypeId, TypeError> {
        if self.data_by_name.contains_key(&name) || self.custom_by_name.contains_key(&name) {
            return Err(TypeError::DataNameTaken);
        }
        let idx = u32::try_from(self.customs.len()).expect("named custom arena overflow");
        self.customs.push(NamedCustom { name, target });
        self.custom_by_name.insert(name, idx);
        Ok(TypeId::NamedCustom(idx))
    }

    // ---- derived constructors ---------------------------------------

    #[must_use]
    pub fn add_deref_of(&mut self, t: TypeId) -> Option<TypeId> {
        let descr = self.outer_descr(t)?;
        match descr.decors.last() {
            Some(Decor::Pointer) => {
                let mut d = descr.clone();
                d.decors.pop();
                d.decor_cns.pop();
                Some(self.add_type_descr(d))
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn add_index_of(&mut self, t: TypeId) -> Option<TypeId> {
        let descr = self.outer_descr(t)?;
        match descr.decors.last() {
            Some(Decor::Array(_) | Decor::ArrayPointer) => {
                let mut d = descr.clone();
                d.decors.pop();
                d.decor_cns.pop();
                Some(self.add_type_descr(d))
            }
            _ => None,
        }
    }

    pub fn add_addr_of(&mut self, t: TypeId) -> TypeId {
        let mut d = self.descr_of(t);
        d.push_decor(Decor::Pointer, false);
        self.add_type_descr(d)
    }

    pub fn add_arr_of_len(&mut self, t: TypeId, len: u64) -> TypeId {
        let mut d = self.descr_of(t);
        d.push_decor(Decor::Array(len), false);
        self.add_type_descr(d)
    }

    pub fn add_cn_of(&mut self, t: TypeId) -> TypeId {
        let mut d = self.descr_of(t);
        if let Some(last) = d.decor_cns.last_mut() {
            *last = true;
        } else {
            d.base_cn = true;
        }
        self.add_type_descr(d)
    }

    /// Recursively strips const from every layer, including tuple
    /// members (spec.md §4.1 `dropCns`).
    pub fn drop_cns(&mut self, t: TypeId) -> TypeId {
        match t {
            TypeId::Descr(idx) => {
                let old = self.descrs[idx as usize].clone();
                let base = self.drop_cns(old.base);
                let mut d = TypeDescr::base_only(base, false);
                for decor in &old.decors {
                    d.push_decor(*decor, false);
                }
                self.add_type_descr(d)
            }
            TypeId::Tuple(idx) => {
                let members: Vec<TypeId> = self.tuples[idx as usize].members.to_vec();
                let stripped: Vec<TypeId> = members.into_iter().map(|m| self.drop_cns(m)).collect();
                self.add_tuple(stripped).unwrap_or(t)
            }
            other => other,
        }
    }

    fn descr_of(&self, t: TypeId) -> TypeDescr {
        match t {
            TypeId::Descr(idx) => self.descrs[idx as usize].clone(),
            other => TypeDescr::base_only(other, false),
        }
    }

    fn outer_descr(&self, t: TypeId) -> Option<TypeDescr> {
        match t {
            TypeId::Descr(idx) => Some(self.descrs[idx as usize].clone()),
            _ => None,
        }
    }

    // ---- lookups -----------------------------------------------------

    #[must_use]
    pub fn get_descr(&self, idx: u32) -> &TypeDescr {
        &self.descrs[idx as usize]
    }

    #[must_use]
    pub fn get_tuple(&self, idx: u32) -> &Tuple {
        &self.tuples[idx as usize]
    }

    #[must_use]
    pub fn get_callable(&self, idx: u32) -> &Callable {
        &self.callables[idx as usize]
    }

    #[must_use]
    pub fn get_data_type(&self, idx: u32) -> &DataType {
        &self.data_types[idx as usize]
    }

    #[must_use]
    pub fn get_data_type_mut(&mut self, idx: u32) -> &mut DataType {
        &mut self.data_types[idx as usize]
    }

    #[must_use]
    pub fn data_type_by_name(&self, name: NameId) -> Option<TypeId> {
        self.data_by_name.get(&name).map(|&idx| TypeId::NamedData(idx))
    }

    #[must_use]
    pub fn named_custom_by_name(&self, name: NameId) -> Option<TypeId> {
        self.custom_by_name.get(&name).map(|&idx| TypeId::NamedCustom(idx))
    }

    #[must_use]
    pub fn str_type(&self) -> TypeId {
        self.str_type
    }

    /// Follows named-custom aliases and no-decorator descriptors down to
    /// the underlying shape (the "works as" traversal of spec.md §4.1).
    #[must_use]
    pub fn underlying(&self, mut t: TypeId) -> TypeId {
        for _ in 0..orb_common::limits::MAX_TYPE_DECORATORS {
            match t {
                TypeId::NamedCustom(idx) => t = self.customs[idx as usize].target,
                TypeId::Descr(idx) if self.descrs[idx as usize].decors.is_empty() => {
                    t = self.descrs[idx as usize].base;
                }
                _ => return t,
            }
        }
        t
    }

    // ---- works-as predicates ------------------------------------------

    #[must_use]
    pub fn works_as_primitive(&self, t: TypeId) -> Option<Primitive> {
        match self.underlying(t) {
            TypeId::Primitive(p) => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub fn works_as_i(&self, t: TypeId) -> bool {
        self.works_as_primitive(t).is_some_and(Primitive::is_signed_int)
    }

    #[must_use]
    pub fn works_as_u(&self, t: TypeId) -> bool {
        self.works_as_primitive(t).is_some_and(Primitive::is_unsigned_int)
    }

    #[must_use]
    pub fn works_as_f(&self, t: TypeId) -> bool {
        self.works_as_primitive(t).is_some_and(Primitive::is_float)
    }

    #[must_use]
    pub fn works_as_c(&self, t: TypeId) -> bool {
        self.works_as_primitive(t) == Some(Primitive::C8)
    }

    #[must_use]
    pub fn works_as_bool(&self, t: TypeId) -> bool {
        self.works_as_primitive(t) == Some(Primitive::Bool)
    }

    /// The untyped `ptr` primitive, with no decorators crossed.
    #[must_use]
    pub fn works_as_ptr(&self, t: TypeId) -> bool {
        self.works_as_primitive(t) == Some(Primitive::Ptr)
    }

    /// A single `pointer` decorator as the outermost layer.
    #[must_use]
    pub fn works_as_p(&self, t: TypeId) -> bool {
        if self.works_as_ptr(t) {
            return true;
        }
        match self.outer_descr(t) {
            Some(d) => matches!(d.decors.last(), Some(Decor::Pointer)),
            None => false,
        }
    }

    /// `ptr` or a decorated pointer: anything address-like.
    #[must_use]
    pub fn works_as_any_p(&self, t: TypeId) -> bool {
        self.works_as_p(t) || self.works_as_arr_p(t)
    }

    #[must_use]
    pub fn works_as_arr(&self, t: TypeId) -> bool {
        matches!(
            self.outer_descr(t).and_then(|d| d.decors.last().copied()),
            Some(Decor::Array(_))
        )
    }

    #[must_use]
    pub fn works_as_arr_of_len(&self, t: TypeId, len: u64) -> bool {
        matches!(
            self.outer_descr(t).and_then(|d| d.decors.last().copied()),
            Some(Decor::Array(n)) if n == len
        )
    }

    #[must_use]
    pub fn works_as_arr_p(&self, t: TypeId) -> bool {
        matches!(
            self.outer_descr(t).and_then(|d| d.decors.last().copied()),
            Some(Decor::ArrayPointer)
        )
    }

    /// `str` is the singleton const-c8 array-pointer (spec.md §4.1).
    #[must_use]
    pub fn works_as_str(&self, t: TypeId) -> bool {
        t == self.str_type
    }

    #[must_use]
    pub fn works_as_char_arr_of_len(&self, t: TypeId, len: u64) -> bool {
        match self.outer_descr(t) {
            Some(d) if d.decors.len() == 1 && self.works_as_c(d.base) => {
                matches!(d.decors[0], Decor::Array(n) if n == len)
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn works_as_cn(&self, t: TypeId) -> bool {
        match t {
            TypeId::Descr(idx) => self.descrs[idx as usize].outer_cn(),
            TypeId::Tuple(idx) => self.tuples[idx as usize]
                .members
                .iter()
                .any(|&m| self.works_as_cn(m)),
            _ => false,
        }
    }

    #[must_use]
    pub fn works_as_tuple(&self, t: TypeId) -> bool {
        matches!(self.underlying(t), TypeId::Tuple(_))
    }

    #[must_use]
    pub fn works_as_callable(&self, t: TypeId) -> bool {
        matches!(t, TypeId::Callable(_))
    }

    #[must_use]
    pub fn works_as_data(&self, t: TypeId) -> bool {
        matches!(t, TypeId::NamedData(_))
    }

    #[must_use]
    pub fn works_as_descr(&self, t: TypeId) -> bool {
        matches!(t, TypeId::Descr(_))
    }

    // ---- fit and cast --------------------------------------------------

    #[must_use]
    pub fn fits_i(&self, value: i128, t: TypeId) -> bool {
        let (lo, hi) = match self.works_as_primitive(t) {
            Some(Primitive::I8) => (i128::from(i8::MIN), i128::from(i8::MAX)),
            Some(Primitive::I16) => (i128::from(i16::MIN), i128::from(i16::MAX)),
            Some(Primitive::I32) => (i128::from(i32::MIN), i128::from(i32::MAX)),
            Some(Primitive::I64) => (i128::from(i64::MIN), i128::from(i64::MAX)),
            _ => return false,
        };
        value >= lo && value <= hi
    }

    #[must_use]
    pub fn fits_u(&self, value: i128, t: TypeId) -> bool {
        if value < 0 {
            return false;
        }
        let hi: i128 = match self.works_as_primitive(t) {
            Some(Primitive::U8) => i128::from(u8::MAX),
            Some(Primitive::U16) => i128::from(u16::MAX),
            Some(Primitive::U32) => i128::from(u32::MAX),
            Some(Primitive::U64) => i128::from(u64::MAX),
            _ => return false,
        };
        value <= hi
    }

    #[must_use]
    pub fn fits_f(&self, value: f64, t: TypeId) -> bool {
        match self.works_as_primitive(t) {
            Some(Primitive::F32) => {
                value.is_infinite() || value.is_nan() || value.abs() <= f64::from(f32::MAX)
            }
            Some(Primitive::F64) => true,
            _ => false,
        }
    }

    /// Picks the narrowest signed primitive at or above `i32` that fits
    /// `value`, per the resolved literal-promotion ambiguity: plain
    /// decimal integer literals never implicitly promote to an unsigned
    /// type.
    #[must_use]
    pub fn shortest_fitting_prim_i(&self, value: i128) -> Option<Primitive> {
        if value >= i128::from(i32::MIN) && value <= i128::from(i32::MAX) {
            Some(Primitive::I32)
        } else if value >= i128::from(i64::MIN) && value <= i128::from(i64::MAX) {
            Some(Primitive::I64)
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_implicit_castable(&self, from: TypeId, into: TypeId) -> bool {
        if from == into {
            return true;
        }
        let from = self.underlying_keep_decors(from);
        let into = self.underlying_keep_decors(into);
        if from == into {
            return true;
        }

        if (self.works_as_ptr(from) && self.works_as_any_p(into))
            || (self.works_as_ptr(into) && self.works_as_any_p(from))
        {
            return true;
        }

        match (from, into) {
            (TypeId::Primitive(s), TypeId::Primitive(d)) => {
                if s == d {
                    return true;
                }
                (s.is_signed_int() && d.is_signed_int() && d.width_rank() >= s.width_rank())
                    || (s.is_unsigned_int() && d.is_unsigned_int() && d.width_rank() >= s.width_rank())
                    || (s.is_float() && d.is_float() && d.width_rank() >= s.width_rank())
            }
            (TypeId::Tuple(a), TypeId::Tuple(b)) => a == b,
            (TypeId::Descr(a), TypeId::Descr(b)) => self.descr_castable(a, b),
            _ => false,
        }
    }

    /// Like [`Self::underlying`] but only unwraps a named-custom alias,
    /// never a no-decorator descriptor — cast comparisons need to see the
    /// descriptor shape, not just its base.
    fn underlying_keep_decors(&self, mut t: TypeId) -> TypeId {
        for _ in 0..orb_common::limits::MAX_TYPE_DECORATORS {
            match t {
                TypeId::NamedCustom(idx) => t = self.customs[idx as usize].target,
                _ => return t,
            }
        }
        t
    }

    fn descr_castable(&self, from_idx: u32, into_idx: u32) -> bool {
        let s = &self.descrs[from_idx as usize];
        let d = &self.descrs[into_idx as usize];
        if s.decors.len() != d.decors.len() || s.base != d.base {
            return false;
        }
        let mut past_ref = false;
        for i in (0..s.decors.len()).rev() {
            if s.decors[i] != d.decors[i] {
                return false;
            }
            if past_ref && s.decor_cns[i] && !d.decor_cns[i] {
                return false;
            }
            if matches!(d.decors[i], Decor::Pointer | Decor::ArrayPointer) {
                past_ref = true;
            }
        }
        if past_ref && s.base_cn && !d.base_cn {
            return false;
        }
        true
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orb_common::NamePool;

    #[test]
    fn singleton_descr_collapses_to_base() {
        let mut t = TypeTable::new();
        let d = TypeDescr::base_only(TypeId::Primitive(Primitive::I32), false);
        assert_eq!(t.add_type_descr(d), TypeId::Primitive(Primitive::I32));
    }

    #[test]
    fn canonicalizes_structurally_equal_descriptors() {
        let mut t = TypeTable::new();
        let mut a = TypeDescr::base_only(TypeId::Primitive(Primitive::I32), false);
        a.push_decor(Decor::Pointer, false);
        let mut b = TypeDescr::base_only(TypeId::Primitive(Primitive::I32), false);
        b.push_decor(Decor::Pointer, false);
        assert_eq!(t.add_type_descr(a), t.add_type_descr(b));
    }

    #[test]
    fn singleton_tuple_collapses_and_empty_fails() {
        let mut t = TypeTable::new();
        let single = t.add_tuple(vec![TypeId::Primitive(Primitive::I32)]).unwrap();
        assert_eq!(single, TypeId::Primitive(Primitive::I32));
        assert_eq!(t.add_tuple(vec![]), Err(TypeError::EmptyTuple));
    }

    #[test]
    fn data_type_defines_once() {
        let mut names = NamePool::new();
        let mut t = TypeTable::new();
        let name = names.add("Point");
        let decl = t.add_data_type(name, vec![]).unwrap();
        let field_x = names.add("x");
        let defined = t
            .add_data_type(
                name,
                vec![DataMember {
                    name: field_x,
                    ty: TypeId::Primitive(Primitive::I32),
                }],
            )
            .unwrap();
        assert_eq!(decl, defined);
        assert_eq!(
            t.add_data_type(
                name,
                vec![DataMember {
                    name: field_x,
                    ty: TypeId::Primitive(Primitive::I32)
                }]
            ),
            Err(TypeError::DataAlreadyDefined)
        );
    }

    #[test]
    fn pointer_to_const_cannot_implicit_cast_to_pointer_to_mutable() {
        let mut t = TypeTable::new();
        let mut cn_i32 = TypeDescr::base_only(TypeId::Primitive(Primitive::I32), true);
        cn_i32.push_decor(Decor::Pointer, false);
        let ptr_to_cn = t.add_type_descr(cn_i32);

        let mut plain_i32 = TypeDescr::base_only(TypeId::Primitive(Primitive::I32), false);
        plain_i32.push_decor(Decor::Pointer, false);
        let ptr_to_mut = t.add_type_descr(plain_i32);

        assert!(!t.is_implicit_castable(ptr_to_cn, ptr_to_mut));
        assert!(t.is_implicit_castable(ptr_to_mut, ptr_to_cn));
    }

    #[test]
    fn widening_int_cast_allowed_narrowing_is_not() {
        let t = TypeTable::new();
        assert!(t.is_implicit_castable(
            TypeId::Primitive(Primitive::I32),
            TypeId::Primitive(Primitive::I64)
        ));
        assert!(!t.is_implicit_castable(
            TypeId::Primitive(Primitive::I64),
            TypeId::Primitive(Primitive::I32)
        ));
        assert!(!t.is_implicit_castable(
            TypeId::Primitive(Primitive::I32),
            TypeId::Primitive(Primitive::U32)
        ));
    }

    #[test]
    fn null_casts_to_any_pointer_shape() {
        let mut t = TypeTable::new();
        let mut descr = TypeDescr::base_only(TypeId::Primitive(Primitive::I32), false);
        descr.push_decor(Decor::Pointer, false);
        let i32_ptr = t.add_type_descr(descr);
        assert!(t.is_implicit_castable(TypeId::Primitive(Primitive::Ptr), i32_ptr));
    }

    #[test]
    fn shortest_fitting_prim_prefers_i32_never_unsigned() {
        let t = TypeTable::new();
        assert_eq!(t.shortest_fitting_prim_i(5), Some(Primitive::I32));
        assert_eq!(
            t.shortest_fitting_prim_i(i128::from(i32::MAX) + 1),
            Some(Primitive::I64)
        );
    }
}
