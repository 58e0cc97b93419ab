//! Zero-initialization and cast logic for eval-values.
//!
//! Grounded on `original_source/src/Evaluator.cpp`'s `performRegister`
//! (the zero-value overload) and `makeCast`/`assignBasedOnType{I,U,F,C,B}`
//! (the cascading cast-attempt chain), re-expressed over the typed
//! `EvalPayload`/`ScalarVal` shapes instead of a raw tagged union.

use orb_ast::{EvalPayload, LiteralKind, NodeVal, ScalarVal};
use orb_common::CodeLoc;
use orb_processor::Ctx;
use orb_types::{Primitive, TypeId};

/// Builds the zero value of `ty`, following `original_source`'s rule
/// that every primitive family has an obvious zero and every aggregate
/// zero-inits its members; anything pointer-shaped (including `str`,
/// itself a const-c8 array-pointer) is the null pointer.
pub(crate) fn zero_value(ctx: &mut Ctx, ty: TypeId, loc: CodeLoc) -> NodeVal {
    let payload = zero_payload(ctx, ty, loc);
    NodeVal::eval(ty, payload, loc)
}

fn zero_payload(ctx: &mut Ctx, ty: TypeId, loc: CodeLoc) -> EvalPayload {
    let underlying = ctx.types.underlying(ty);
    match underlying {
        TypeId::Primitive(p) => EvalPayload::Scalar(zero_scalar(ctx, p)),
        TypeId::NamedData(idx) => {
            let members: Vec<TypeId> = ctx.types.get_data_type(idx).members.iter().map(|m| m.ty).collect();
            EvalPayload::Children(members.into_iter().map(|m| zero_value(ctx, m, loc)).collect())
        }
        TypeId::Tuple(idx) => {
            let members = ctx.types.get_tuple(idx).members.to_vec();
            EvalPayload::Children(members.into_iter().map(|m| zero_value(ctx, m, loc)).collect())
        }
        TypeId::Descr(_) if ctx.types.works_as_any_p(underlying) => EvalPayload::Scalar(ScalarVal::Ptr(0)),
        TypeId::Descr(_) => match orb_processor::coerce::array_len(&ctx.types, underlying) {
            Some(len) => {
                let Some(elem_ty) = ctx.types.add_index_of(underlying) else {
                    return EvalPayload::Children(Vec::new());
                };
                let elems: Vec<NodeVal> = (0..len).map(|_| zero_value(ctx, elem_ty, loc)).collect();
                EvalPayload::Children(elems)
            }
            None => EvalPayload::Scalar(ScalarVal::Ptr(0)),
        },
        // Callables and anything else with no sensible compile-time zero
        // (declaration-only `data` types included) fall back to a bare
        // null-pointer scalar rather than panicking.
        _ => EvalPayload::Scalar(ScalarVal::Ptr(0)),
    }
}

fn zero_scalar(ctx: &mut Ctx, p: Primitive) -> ScalarVal {
    match p {
        Primitive::Bool => ScalarVal::Bool(false),
        Primitive::I8 | Primitive::I16 | Primitive::I32 | Primitive::I64 => ScalarVal::I(0),
        Primitive::U8 | Primitive::U16 | Primitive::U32 | Primitive::U64 => ScalarVal::U(0),
        Primitive::F32 | Primitive::F64 => ScalarVal::F(0.0),
        Primitive::C8 => ScalarVal::C8(0),
        Primitive::Ptr => ScalarVal::Ptr(0),
        // `id` and `type` have no natural zero value; these are
        // placeholders that a well-formed program never observes, since
        // both are only ever produced by explicit reflection forms.
        Primitive::Id => ScalarVal::Id(ctx.names.add("")),
        Primitive::Type => ScalarVal::Type(TypeId::Primitive(Primitive::Ptr)),
        Primitive::Raw => ScalarVal::Raw(Box::new(orb_ast::Node::leaf(LiteralKind::Null, CodeLoc::point(ctx.strings.add(""), 0)))),
    }
}

/// Attempts to build `val` as a value of `ty`, following the source
/// category's cascading assignment chain; returns `None` when no cast
/// path exists (the caller is expected to have already gated castability
/// via `TypeTable::is_implicit_castable`/explicit-cast rules, so a
/// `None` here means an internal inconsistency, not a user error).
pub(crate) fn make_cast(ctx: &mut Ctx, val: &NodeVal, ty: TypeId, loc: CodeLoc) -> Option<NodeVal> {
    let orb_ast::NodeValData::Eval(ev) = &val.data else { return None };
    if ev.ty == ty {
        return Some(NodeVal::eval(ty, ev.payload.clone(), loc));
    }

    let dest = ctx.types.underlying(ty);

    // Any-pointer-to-any-pointer (including `str`, and int/uint literal
    // zero standing in for `null`) is always a reinterpretation of the
    // same 8-byte address, never a value transformation.
    if ctx.types.works_as_any_p(dest) {
        if let EvalPayload::Scalar(ScalarVal::Ptr(addr)) = &ev.payload {
            return Some(NodeVal::eval(ty, EvalPayload::Scalar(ScalarVal::Ptr(*addr)), loc));
        }
        if let EvalPayload::Scalar(ScalarVal::I(0) | ScalarVal::U(0)) = &ev.payload {
            return Some(NodeVal::eval(ty, EvalPayload::Scalar(ScalarVal::Ptr(0)), loc));
        }
    }

    match &ev.payload {
        EvalPayload::Scalar(ScalarVal::I(v)) => assign_i(ctx, dest, *v).map(|s| NodeVal::eval(ty, s, loc)),
        EvalPayload::Scalar(ScalarVal::U(v)) => assign_u(ctx, dest, *v).map(|s| NodeVal::eval(ty, s, loc)),
        EvalPayload::Scalar(ScalarVal::F(v)) => assign_f(ctx, dest, *v).map(|s| NodeVal::eval(ty, s, loc)),
        EvalPayload::Scalar(ScalarVal::C8(v)) => assign_c(ctx, dest, *v).map(|s| NodeVal::eval(ty, s, loc)),
        EvalPayload::Scalar(ScalarVal::Bool(v)) => assign_bool(ctx, dest, *v).map(|s| NodeVal::eval(ty, s, loc)),
        // Arrays, tuples, `raw`, `id` and `type` only ever change
        // constness, never representation; the value itself is reused.
        _ if ctx.types.is_implicit_castable(ev.ty, ty) => Some(NodeVal::eval(ty, ev.payload.clone(), loc)),
        _ => None,
    }
}

fn assign_i(ctx: &Ctx, dest: TypeId, v: i64) -> Option<EvalPayload> {
    if ctx.types.works_as_i(dest) {
        return Some(EvalPayload::Scalar(ScalarVal::I(truncate_i(dest, v))));
    }
    if ctx.types.works_as_u(dest) {
        return Some(EvalPayload::Scalar(ScalarVal::U(truncate_u(dest, v as u64))));
    }
    if ctx.types.works_as_f(dest) {
        return Some(EvalPayload::Scalar(ScalarVal::F(v as f64)));
    }
    if ctx.types.works_as_c(dest) {
        return Some(EvalPayload::Scalar(ScalarVal::C8(v as u8)));
    }
    if ctx.types.works_as_bool(dest) {
        return Some(EvalPayload::Scalar(ScalarVal::Bool(v != 0)));
    }
    None
}

fn assign_u(ctx: &Ctx, dest: TypeId, v: u64) -> Option<EvalPayload> {
    if ctx.types.works_as_u(dest) {
        return Some(EvalPayload::Scalar(ScalarVal::U(truncate_u(dest, v))));
    }
    if ctx.types.works_as_i(dest) {
        return Some(EvalPayload::Scalar(ScalarVal::I(truncate_i(dest, v as i64))));
    }
    if ctx.types.works_as_f(dest) {
        return Some(EvalPayload::Scalar(ScalarVal::F(v as f64)));
    }
    if ctx.types.works_as_c(dest) {
        return Some(EvalPayload::Scalar(ScalarVal::C8(v as u8)));
    }
    if ctx.types.works_as_bool(dest) {
        return Some(EvalPayload::Scalar(ScalarVal::Bool(v != 0)));
    }
    None
}

fn assign_f(ctx: &Ctx, dest: TypeId, v: f64) -> Option<EvalPayload> {
    if ctx.types.works_as_f(dest) {
        let narrowed = if ctx.types.works_as_primitive(dest) == Some(Primitive::F32) {
            f64::from(v as f32)
        } else {
            v
        };
        return Some(EvalPayload::Scalar(ScalarVal::F(narrowed)));
    }
    if ctx.types.works_as_i(dest) {
        return Some(EvalPayload::Scalar(ScalarVal::I(truncate_i(dest, v as i64))));
    }
    if ctx.types.works_as_u(dest) {
        return Some(EvalPayload::Scalar(ScalarVal::U(truncate_u(dest, v as u64))));
    }
    if ctx.types.works_as_bool(dest) {
        return Some(EvalPayload::Scalar(ScalarVal::Bool(v != 0.0)));
    }
    None
}

fn assign_c(ctx: &Ctx, dest: TypeId, v: u8) -> Option<EvalPayload> {
    if ctx.types.works_as_c(dest) {
        return Some(EvalPayload::Scalar(ScalarVal::C8(v)));
    }
    if ctx.types.works_as_i(dest) {
        return Some(EvalPayload::Scalar(ScalarVal::I(truncate_i(dest, i64::from(v)))));
    }
    if ctx.types.works_as_u(dest) {
        return Some(EvalPayload::Scalar(ScalarVal::U(truncate_u(dest, u64::from(v)))));
    }
    None
}

fn assign_bool(ctx: &Ctx, dest: TypeId, v: bool) -> Option<EvalPayload> {
    if ctx.types.works_as_bool(dest) {
        return Some(EvalPayload::Scalar(ScalarVal::Bool(v)));
    }
    if ctx.types.works_as_i(dest) {
        return Some(EvalPayload::Scalar(ScalarVal::I(i64::from(v))));
    }
    if ctx.types.works_as_u(dest) {
        return Some(EvalPayload::Scalar(ScalarVal::U(u64::from(v))));
    }
    None
}

pub(crate) fn truncate_i(dest: TypeId, v: i64) -> i64 {
    match dest {
        TypeId::Primitive(Primitive::I8) => i64::from(v as i8),
        TypeId::Primitive(Primitive::I16) => i64::from(v as i16),
        TypeId::Primitive(Primitive::I32) => i64::from(v as i32),
        _ => v,
    }
}

pub(crate) fn truncate_u(dest: TypeId, v: u64) -> u64 {
    match dest {
        TypeId::Primitive(Primitive::U8) => u64::from(v as u8),
        TypeId::Primitive(Primitive::U16) => u64::from(v as u16),
        TypeId::Primitive(Primitive::U32) => u64::from(v as u32),
        _ => v,
    }
}

/// Byte size used for `sizeOf`: flat, no padding or alignment, matching
/// the table's lack of any layout model (spec.md "Non-goals" exclude a
/// memory layout pass entirely, so this is the best-effort analogue
/// `original_source`'s `sizeof` gave for free from the host C++ ABI).
pub(crate) fn size_of(ctx: &mut Ctx, ty: TypeId) -> u64 {
    let underlying = ctx.types.underlying(ty);
    match underlying {
        TypeId::Primitive(p) => primitive_size(p),
        TypeId::NamedData(idx) => {
            let members: Vec<TypeId> = ctx.types.get_data_type(idx).members.iter().map(|m| m.ty).collect();
            members.into_iter().map(|m| size_of(ctx, m)).sum()
        }
        TypeId::Tuple(idx) => {
            let members = ctx.types.get_tuple(idx).members.to_vec();
            members.into_iter().map(|m| size_of(ctx, m)).sum()
        }
        TypeId::Descr(_) if ctx.types.works_as_any_p(underlying) => 8,
        TypeId::Descr(_) => match orb_processor::coerce::array_len(&ctx.types, underlying) {
            Some(len) => {
                let Some(elem_ty) = ctx.types.add_index_of(underlying) else { return 0 };
                len * size_of(ctx, elem_ty)
            }
            None => 0,
        },
        TypeId::Callable(_) => 8,
        _ => 0,
    }
}

fn primitive_size(p: Primitive) -> u64 {
    match p {
        Primitive::Bool | Primitive::I8 | Primitive::U8 | Primitive::C8 => 1,
        Primitive::I16 | Primitive::U16 => 2,
        Primitive::I32 | Primitive::U32 | Primitive::F32 | Primitive::Id | Primitive::Type => 4,
        Primitive::I64 | Primitive::U64 | Primitive::F64 | Primitive::Ptr => 8,
        Primitive::Raw => 0,
    }
}
