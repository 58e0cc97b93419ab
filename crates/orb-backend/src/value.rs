//! Zero-initialization, casting and `sizeOf` for backend-lowered
//! values.
//!
//! Grounded on `original_source/src/Codegen_expr.cpp`'s `codegenArr`/
//! `codegenTuple` (alloca a slot, GEP+store each member, load the whole
//! aggregate back out) and `codegenCast`'s promotion-then-cast pair,
//! mirroring `orb-eval`'s `zero_value`/`make_cast`/`size_of` recursion
//! shape but emitting instructions instead of folding `ScalarVal`s.

use orb_ast::{BackendToken, BackendValue, EvalPayload, EvalValue, NodeVal, NodeValData, ScalarVal};
use orb_common::CodeLoc;
use orb_processor::Ctx;
use orb_types::{Primitive, TypeId};

use crate::Compiler;
use crate::ir::Instr;

/// Reads `v`'s type and value token regardless of which variant it
/// arrived in: an already-lowered [`NodeValData::Backend`] is returned
/// as-is, while a literal or tuple-constructed [`NodeValData::Eval`]
/// (orb-processor's own aggregate-construction path never delegates to
/// the backend, so a `Children` payload can still hold raw scalars at
/// this point) is folded into fresh `Const`/`Alloca`/`FieldGep`/`Store`
/// instructions first. Anything else isn't a value at all.
pub(crate) fn to_backend(compiler: &mut Compiler, ctx: &mut Ctx, v: &NodeVal, loc: CodeLoc) -> Option<(TypeId, BackendToken)> {
    match &v.data {
        NodeValData::Backend(bv) => Some((bv.ty, bv.token)),
        NodeValData::Eval(ev) => Some((ev.ty, eval_to_token(compiler, ctx, ev, loc))),
        _ => None,
    }
}

fn eval_to_token(compiler: &mut Compiler, ctx: &mut Ctx, ev: &EvalValue, loc: CodeLoc) -> BackendToken {
    match &ev.payload {
        EvalPayload::Scalar(s) => compiler.push(Instr::Const(s.clone())),
        EvalPayload::Children(members) => {
            let slot = compiler.push(Instr::Alloca(ev.ty));
            for (i, member) in members.iter().enumerate() {
                let Some((_, tok)) = to_backend(compiler, ctx, member, loc) else { continue };
                let field_ptr = compiler.push(Instr::FieldGep { base: slot, field: i as u32 });
                compiler.push(Instr::Store { ptr: field_ptr, val: tok });
            }
            compiler.push(Instr::Load(slot))
        }
    }
}

/// Gives `token` its own addressable slot — every registered variable
/// needs one so a later assignment or [`perform_load`'s][crate::Compiler]
/// re-`Load` has somewhere to read the current value from, unlike a bare
/// intermediate expression result.
pub(crate) fn materialize(compiler: &mut Compiler, ty: TypeId, token: BackendToken, loc: CodeLoc) -> NodeVal {
    let slot = compiler.push(Instr::Alloca(ty));
    compiler.push(Instr::Store { ptr: slot, val: token });
    let loaded = compiler.push(Instr::Load(slot));
    backend_node(ty, loaded, Some(slot), loc)
}

/// Builds `ty`'s zero value the way `codegenArr`/`codegenTuple` build any
/// aggregate: allocate a slot, store each member's own zero into it by
/// position, then load the whole thing back as a value. Primitives skip
/// the alloca entirely and fold straight to a `Const`.
pub(crate) fn zero_value(compiler: &mut Compiler, ctx: &mut Ctx, ty: TypeId, loc: CodeLoc) -> NodeVal {
    let underlying = ctx.types.underlying(ty);
    match underlying {
        TypeId::Primitive(p) => {
            let tok = compiler.push(Instr::Const(zero_scalar(ctx, p)));
            backend_node(ty, tok, None, loc)
        }
        TypeId::NamedData(idx) => {
            let members: Vec<TypeId> = ctx.types.get_data_type(idx).members.iter().map(|m| m.ty).collect();
            build_aggregate(compiler, ctx, ty, &members, loc)
        }
        TypeId::Tuple(idx) => {
            let members = ctx.types.get_tuple(idx).members.to_vec();
            build_aggregate(compiler, ctx, ty, &members, loc)
        }
        TypeId::Descr(_) if ctx.types.works_as_any_p(underlying) => {
            let tok = compiler.push(Instr::Const(ScalarVal::Ptr(0)));
            backend_node(ty, tok, None, loc)
        }
        TypeId::Descr(_) => match orb_processor::coerce::array_len(&ctx.types, underlying) {
            Some(len) => {
                let Some(elem_ty) = ctx.types.add_index_of(underlying) else {
                    let tok = compiler.push(Instr::Const(ScalarVal::Ptr(0)));
                    return backend_node(ty, tok, None, loc);
                };
                let members: Vec<TypeId> = (0..len).map(|_| elem_ty).collect();
                build_aggregate(compiler, ctx, ty, &members, loc)
            }
            None => {
                let tok = compiler.push(Instr::Const(ScalarVal::Ptr(0)));
                backend_node(ty, tok, None, loc)
            }
        },
        _ => {
            let tok = compiler.push(Instr::Const(ScalarVal::Ptr(0)));
            backend_node(ty, tok, None, loc)
        }
    }
}

fn build_aggregate(compiler: &mut Compiler, ctx: &mut Ctx, ty: TypeId, members: &[TypeId], loc: CodeLoc) -> NodeVal {
    let slot = compiler.push(Instr::Alloca(ty));
    for (i, member_ty) in members.iter().enumerate() {
        let member = zero_value(compiler, ctx, *member_ty, loc);
        let Some(member_tok) = compiler.token_of(&member) else { continue };
        let field_ptr = compiler.push(Instr::FieldGep { base: slot, field: i as u32 });
        compiler.push(Instr::Store { ptr: field_ptr, val: member_tok });
    }
    let loaded = compiler.push(Instr::Load(slot));
    backend_node(ty, loaded, Some(slot), loc)
}

fn zero_scalar(ctx: &mut Ctx, p: Primitive) -> ScalarVal {
    match p {
        Primitive::Bool => ScalarVal::Bool(false),
        Primitive::I8 | Primitive::I16 | Primitive::I32 | Primitive::I64 => ScalarVal::I(0),
        Primitive::U8 | Primitive::U16 | Primitive::U32 | Primitive::U64 => ScalarVal::U(0),
        Primitive::F32 | Primitive::F64 => ScalarVal::F(0.0),
        Primitive::C8 => ScalarVal::C8(0),
        Primitive::Ptr => ScalarVal::Ptr(0),
        Primitive::Id => ScalarVal::Id(ctx.names.add("")),
        Primitive::Type => ScalarVal::Type(TypeId::Primitive(Primitive::Ptr)),
        Primitive::Raw => ScalarVal::Raw(Box::new(orb_ast::Node::leaf(
            orb_ast::LiteralKind::Null,
            CodeLoc::point(ctx.strings.add(""), 0),
        ))),
    }
}

/// Emits a `Cast` instruction for an already-validated conversion
/// (`codegenCast`); the caller (`orb-processor::coerce`) has already
/// confirmed the source/destination pair is castable, so this never
/// needs to reject one.
pub(crate) fn make_cast(compiler: &mut Compiler, ctx: &mut Ctx, val: &NodeVal, ty: TypeId, loc: CodeLoc) -> Option<NodeVal> {
    if let NodeValData::Backend(bv) = &val.data {
        if bv.ty == ty {
            return Some(backend_node(ty, bv.token, bv.reference, loc));
        }
    }
    let (from_ty, tok) = to_backend(compiler, ctx, val, loc)?;
    if from_ty == ty {
        return Some(backend_node(ty, tok, None, loc));
    }
    let tok = compiler.push(Instr::Cast { val: tok, to: ty });
    Some(backend_node(ty, tok, None, loc))
}

/// Byte size used for `sizeOf`: the same flat, no-padding layout model
/// `orb-eval::value::size_of` uses, since the table itself carries no
/// alignment/padding information for either backend to disagree on
/// (spec.md "Non-goals" exclude a real memory-layout pass).
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

#[must_use]
pub(crate) fn backend_node(ty: TypeId, token: BackendToken, reference: Option<BackendToken>, loc: CodeLoc) -> NodeVal {
    NodeVal::new(NodeValData::Backend(BackendValue { ty, token, reference }), loc)
}
