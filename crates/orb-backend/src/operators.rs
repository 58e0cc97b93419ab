//! Unary, regular-binary, comparison, assignment, index and member
//! operator lowering.
//!
//! Grounded on `original_source/src/Codegen_expr.cpp`'s `codegenOper`
//! (binary-op `CreateAdd`/`CreateSub`/... switch), `codegenOperUnary`,
//! `codegenOperInd` and `codegenOperDot` (GEP-then-load off a `.ref`
//! address, or alloca-store-then-GEP when the base has none). Operand
//! type unification, divide/shift guard checks and the raw-string
//! concatenation special case already happen in `orb-processor`'s own
//! operator dispatch before these are reached (mirroring `orb-eval`'s
//! `operators.rs`, which documents the same division of labor), so none
//! of that re-appears here — every function below only has to emit one
//! instruction's worth of IR for an already-validated operation. An
//! operand can still arrive as a bare literal (`orb-processor` never
//! normalizes a leaf constant into a backend value before handing it to
//! an operator), so each function runs it through
//! [`value::to_backend`] first rather than assuming `NodeValData::Backend`.

use orb_ast::{NodeVal, NodeValData};
use orb_common::reserved::Oper;
use orb_common::{CodeLoc, DiagKind, NameId};
use orb_processor::{ComparisonState, Ctx};
use orb_types::TypeId;

use crate::ir::Instr;
use crate::value::{backend_node, to_backend};
use crate::Compiler;

fn op_text(op: Oper) -> String {
    format!("{op:?}")
}

fn bad_operand(ctx: &mut Ctx, loc: CodeLoc, op: Oper, ty: Option<TypeId>) -> NodeVal {
    let ty_name = ty.map_or_else(|| "?".to_string(), |t| orb_processor::coerce::type_name(&ctx.types, &ctx.names, t));
    ctx.messages.raise(loc, DiagKind::OperBadOperandType { op: op_text(op), ty: ty_name });
    NodeVal::invalid(loc)
}

pub(crate) fn perform_oper_unary(compiler: &mut Compiler, ctx: &mut Ctx, op: Oper, val: NodeVal, loc: CodeLoc) -> NodeVal {
    let Some((ty, src)) = to_backend(compiler, ctx, &val, loc) else {
        return bad_operand(ctx, loc, op, val.type_id());
    };
    let tok = compiler.push(Instr::Unary { op, val: src });
    backend_node(ty, tok, None, loc)
}

pub(crate) fn perform_oper_regular(compiler: &mut Compiler, ctx: &mut Ctx, op: Oper, lhs: NodeVal, rhs: NodeVal, loc: CodeLoc) -> NodeVal {
    // `orb-processor::operators::perform_regular` already ran
    // `coerce::coerce_pair` on `lhs`/`rhs`, so both already share one
    // type; the result of a regular binary op is that same type.
    let lhs_ty = lhs.type_id();
    let Some((ty, l)) = to_backend(compiler, ctx, &lhs, loc) else {
        return bad_operand(ctx, loc, op, lhs_ty);
    };
    let Some((_, r)) = to_backend(compiler, ctx, &rhs, loc) else {
        return bad_operand(ctx, loc, op, rhs.type_id());
    };
    let tok = compiler.push(Instr::Binary { op, lhs: l, rhs: r });
    backend_node(ty, tok, None, loc)
}

/// Stores through `lhs`'s own address (`codegenOper`'s assignment
/// branch: `ref` must be non-null, then `CreateStore(rhs.val, lhs.ref)`).
/// `lhs` always reaches here as `NodeValData::Backend` — only an
/// addressable value has a `RefTarget`/`BackendToken` reference to
/// assign through in the first place, and `orb-processor::operators`
/// already rejected anything without one before calling
/// `perform_oper_assignment`.
pub(crate) fn perform_oper_assignment(compiler: &mut Compiler, ctx: &mut Ctx, lhs: NodeVal, rhs: NodeVal, loc: CodeLoc) -> NodeVal {
    let NodeValData::Backend(lbv) = &lhs.data else { return NodeVal::invalid(loc) };
    let Some(ptr) = lbv.reference else { return NodeVal::invalid(loc) };
    let Some((ty, val)) = to_backend(compiler, ctx, &rhs, loc) else {
        return bad_operand(ctx, loc, Oper::Asgn, rhs.type_id());
    };
    compiler.push(Instr::Store { ptr, val });
    backend_node(ty, val, Some(ptr), loc)
}

/// Array/pointer element access. When `base` is itself addressable, a
/// `GEP`+`Load` off its address aliases the original storage, just like
/// `codegenOperInd`'s `worksAsTypeArrP`/has-`ref` branches. When `base`
/// is a temporary with no address — an aggregate just built from a
/// `codegenArr`-style literal — allocate a throwaway slot, store the
/// whole base into it, and `GEP` off that instead (`codegenOperInd`'s
/// comment: "llvm's extractvalue requires compile-time known indices").
pub(crate) fn perform_oper_index(compiler: &mut Compiler, ctx: &mut Ctx, base: NodeVal, index: NodeVal, loc: CodeLoc) -> NodeVal {
    let base_ref = if let NodeValData::Backend(bbv) = &base.data { bbv.reference } else { None };
    let Some((ty, base_tok)) = to_backend(compiler, ctx, &base, loc) else {
        return bad_operand(ctx, loc, Oper::Ind, base.type_id());
    };
    let Some((_, idx_tok)) = to_backend(compiler, ctx, &index, loc) else {
        return bad_operand(ctx, loc, Oper::Ind, index.type_id());
    };
    let base_addr = match base_ref {
        Some(addr) => addr,
        None => {
            let slot = compiler.push(Instr::Alloca(ty));
            compiler.push(Instr::Store { ptr: slot, val: base_tok });
            slot
        }
    };
    let elem_ptr = compiler.push(Instr::IndexGep { base: base_addr, index: idx_tok });
    let loaded = compiler.push(Instr::Load(elem_ptr));
    backend_node(ty, loaded, Some(elem_ptr), loc)
}

/// Data-member access, the `FieldGep` analogue of [`perform_oper_index`]
/// (`codegenOperDot`).
pub(crate) fn perform_oper_member(compiler: &mut Compiler, ctx: &mut Ctx, base: NodeVal, field: NameId, loc: CodeLoc) -> NodeVal {
    let base_ref = if let NodeValData::Backend(bbv) = &base.data { bbv.reference } else { None };
    let Some((base_ty, base_tok)) = to_backend(compiler, ctx, &base, loc) else {
        return bad_operand(ctx, loc, Oper::Ind, base.type_id());
    };
    let TypeId::NamedData(idx) = ctx.types.underlying(base_ty) else {
        return NodeVal::invalid(loc);
    };
    let data_type = ctx.types.get_data_type(idx);
    let Some(pos) = data_type.members.iter().position(|m| m.name == field) else {
        return NodeVal::invalid(loc);
    };
    let ty = data_type.members[pos].ty;
    let base_addr = match base_ref {
        Some(addr) => addr,
        None => {
            let slot = compiler.push(Instr::Alloca(base_ty));
            compiler.push(Instr::Store { ptr: slot, val: base_tok });
            slot
        }
    };
    let field_ptr = compiler.push(Instr::FieldGep { base: base_addr, field: pos as u32 });
    let loaded = compiler.push(Instr::Load(field_ptr));
    backend_node(ty, loaded, Some(field_ptr), loc)
}

pub(crate) fn comparison_set_up() -> ComparisonState {
    ComparisonState { short_circuited: false, result: true }
}

/// Accumulates one step's `Binary` comparison token; `ComparisonState`
/// has no token slot of its own (it is shared, boolean-folding state
/// with the evaluator), so the per-step tokens live on `compiler`
/// instead, joined by [`comparison_tear_down`].
pub(crate) fn comparison_step(compiler: &mut Compiler, ctx: &mut Ctx, state: &mut ComparisonState, op: Oper, lhs: &NodeVal, rhs: &NodeVal, loc: CodeLoc) {
    let (Some((_, l)), Some((_, r))) = (to_backend(compiler, ctx, lhs, loc), to_backend(compiler, ctx, rhs, loc)) else {
        bad_operand(ctx, loc, op, lhs.type_id());
        state.short_circuited = true;
        return;
    };
    let tok = compiler.push(Instr::Binary { op, lhs: l, rhs: r });
    compiler.comparison_steps.push(tok);
}

pub(crate) fn comparison_tear_down(compiler: &mut Compiler, state: ComparisonState, loc: CodeLoc) -> NodeVal {
    let _ = state;
    let steps = std::mem::take(&mut compiler.comparison_steps);
    let tok = compiler.push(Instr::ComparisonJoin { steps });
    backend_node(TypeId::Primitive(orb_types::Primitive::Bool), tok, None, loc)
}
