//! Unary, regular-binary, comparison, assignment, index and member
//! operator semantics for compile-time values.
//!
//! Grounded on `original_source/src/Evaluator.cpp`'s `performOperUnary`,
//! `performOperRegular`, `performOperComparisonSetUp/Comparison/TearDown`,
//! `performOperAssignment`, `performOperIndex` and `performOperMember`.
//! Raw-concatenation and divide/shift guard checks already happen in
//! `orb-processor`'s own operator dispatch before these are reached, so
//! none of that re-appears here.

use orb_ast::{EvalPayload, NodeVal, NodeValData, PathStep, RefTarget, ScalarVal};
use orb_common::reserved::Oper;
use orb_common::{CodeLoc, DiagKind};
use orb_processor::{ComparisonState, Ctx};
use orb_symbols::VarId;
use orb_types::TypeId;

use crate::value::{truncate_i, truncate_u};

/// `Oper` carries no `Display`; diagnostics just want a short token, and
/// `Debug`'s derived spelling (`Add`, `BitAnd`, ...) is good enough for
/// an internal error string.
fn op_text(op: Oper) -> String {
    format!("{op:?}")
}

fn bad_operand(ctx: &mut Ctx, loc: CodeLoc, op: Oper, ty: Option<TypeId>) -> NodeVal {
    let ty_name = ty.map_or_else(|| "?".to_string(), |t| orb_processor::coerce::type_name(&ctx.types, &ctx.names, t));
    ctx.messages.raise(loc, DiagKind::OperBadOperandType { op: op_text(op), ty: ty_name });
    NodeVal::invalid(loc)
}

fn var_id_from_ref(r: &RefTarget) -> VarId {
    VarId {
        callable_depth: r.callable_depth,
        block_depth: r.block_depth,
        index: r.index,
    }
}

/// Walks `path` through `root`'s own aggregate storage and overwrites
/// the payload at the end of it, so that an assignment through an
/// `arr[i]`/`data.field` lvalue mutates the variable's own slot in
/// place rather than replacing it wholesale.
fn write_through(root: &mut NodeVal, path: &[PathStep], ty: TypeId, payload: EvalPayload) {
    let Some((step, rest)) = path.split_first() else {
        if let NodeValData::Eval(ev) = &mut root.data {
            ev.ty = ty;
            ev.payload = payload;
        }
        return;
    };
    let NodeValData::Eval(ev) = &mut root.data else { return };
    let EvalPayload::Children(children) = &mut ev.payload else { return };
    let pos = match step {
        PathStep::Index(i) | PathStep::Member(i) => *i as usize,
    };
    let Some(slot) = children.get_mut(pos) else { return };
    write_through(slot, rest, ty, payload);
}

pub(crate) fn perform_oper_unary(ctx: &mut Ctx, op: Oper, val: NodeVal, loc: CodeLoc) -> NodeVal {
    let NodeValData::Eval(ev) = &val.data else {
        return bad_operand(ctx, loc, op, val.type_id());
    };
    let ty = ev.ty;
    let scalar = match (&ev.payload, op) {
        (EvalPayload::Scalar(ScalarVal::I(v)), Oper::Add) => Some(ScalarVal::I(*v)),
        (EvalPayload::Scalar(ScalarVal::I(v)), Oper::Sub) => Some(ScalarVal::I(truncate_i(ty, v.wrapping_neg()))),
        (EvalPayload::Scalar(ScalarVal::I(v)), Oper::BitNot) => Some(ScalarVal::I(truncate_i(ty, !v))),
        (EvalPayload::Scalar(ScalarVal::U(v)), Oper::Add) => Some(ScalarVal::U(*v)),
        (EvalPayload::Scalar(ScalarVal::U(v)), Oper::BitNot) => Some(ScalarVal::U(truncate_u(ty, !v))),
        (EvalPayload::Scalar(ScalarVal::F(v)), Oper::Add) => Some(ScalarVal::F(*v)),
        (EvalPayload::Scalar(ScalarVal::F(v)), Oper::Sub) => Some(ScalarVal::F(-v)),
        (EvalPayload::Scalar(ScalarVal::Bool(v)), Oper::Not) => Some(ScalarVal::Bool(!v)),
        _ => None,
    };
    match scalar {
        Some(s) => NodeVal::eval(ty, EvalPayload::Scalar(s), loc),
        None => bad_operand(ctx, loc, op, Some(ty)),
    }
}

pub(crate) fn perform_oper_regular(ctx: &mut Ctx, op: Oper, lhs: NodeVal, rhs: NodeVal, loc: CodeLoc) -> NodeVal {
    let (NodeValData::Eval(lev), NodeValData::Eval(rev)) = (&lhs.data, &rhs.data) else {
        return bad_operand(ctx, loc, op, lhs.type_id());
    };
    let ty = lev.ty;
    let scalar = match (&lev.payload, &rev.payload) {
        (EvalPayload::Scalar(ScalarVal::I(l)), EvalPayload::Scalar(ScalarVal::I(r))) => regular_i(ty, op, *l, *r),
        (EvalPayload::Scalar(ScalarVal::U(l)), EvalPayload::Scalar(ScalarVal::U(r))) => regular_u(ty, op, *l, *r),
        (EvalPayload::Scalar(ScalarVal::F(l)), EvalPayload::Scalar(ScalarVal::F(r))) => regular_f(op, *l, *r),
        _ => None,
    };
    match scalar {
        Some(s) => NodeVal::eval(ty, EvalPayload::Scalar(s), loc),
        None => bad_operand(ctx, loc, op, Some(ty)),
    }
}

fn regular_i(ty: TypeId, op: Oper, l: i64, r: i64) -> Option<ScalarVal> {
    let v = match op {
        Oper::Add => l.wrapping_add(r),
        Oper::Sub => l.wrapping_sub(r),
        Oper::Mul => l.wrapping_mul(r),
        Oper::Div => l.wrapping_div(r),
        Oper::Rem => l.wrapping_rem(r),
        Oper::Shl => l.wrapping_shl(r as u32),
        Oper::Shr => l.wrapping_shr(r as u32),
        Oper::BitAnd => l & r,
        Oper::BitOr => l | r,
        Oper::BitXor => l ^ r,
        _ => return None,
    };
    Some(ScalarVal::I(truncate_i(ty, v)))
}

fn regular_u(ty: TypeId, op: Oper, l: u64, r: u64) -> Option<ScalarVal> {
    let v = match op {
        Oper::Add => l.wrapping_add(r),
        Oper::Sub => l.wrapping_sub(r),
        Oper::Mul => l.wrapping_mul(r),
        Oper::Div => l.wrapping_div(r),
        Oper::Rem => l.wrapping_rem(r),
        Oper::Shl => l.wrapping_shl(r as u32),
        Oper::Shr => l.wrapping_shr(r as u32),
        Oper::BitAnd => l & r,
        Oper::BitOr => l | r,
        Oper::BitXor => l ^ r,
        _ => return None,
    };
    Some(ScalarVal::U(truncate_u(ty, v)))
}

fn regular_f(op: Oper, l: f64, r: f64) -> Option<ScalarVal> {
    let v = match op {
        Oper::Add => l + r,
        Oper::Sub => l - r,
        Oper::Mul => l * r,
        Oper::Div => l / r,
        Oper::Rem => l % r,
        _ => return None,
    };
    Some(ScalarVal::F(v))
}

/// Writes through `lhs`'s `RefTarget`, including whatever sub-path an
/// `arr[i]`/`data.field` chain attached to it, so the write lands in the
/// owning variable's own storage rather than a disconnected copy.
pub(crate) fn perform_oper_assignment(ctx: &mut Ctx, lhs: NodeVal, rhs: NodeVal, loc: CodeLoc) -> NodeVal {
    let NodeValData::Eval(lev) = &lhs.data else { return NodeVal::invalid(loc) };
    let Some(target) = lev.reference.clone() else { return NodeVal::invalid(loc) };
    let NodeValData::Eval(rev) = &rhs.data else { return NodeVal::invalid(loc) };
    let ty = rev.ty;
    let payload = rev.payload.clone();

    let var_id = var_id_from_ref(&target);
    let entry = ctx.symbols.get_var_mut(var_id);
    write_through(&mut entry.value, &target.path, ty, payload.clone());

    let mut result = NodeVal::eval(ty, payload, loc);
    if let NodeValData::Eval(out) = &mut result.data {
        out.reference = Some(target);
    }
    result
}

/// Array/tuple-element access: the result aliases `base`'s own storage
/// when `base` itself carries a reference, by chaining one more
/// `PathStep::Index` onto it (spec.md §4.5 — index is an lvalue on
/// arrays/tuples).
pub(crate) fn perform_oper_index(base: NodeVal, index: NodeVal, loc: CodeLoc) -> NodeVal {
    let NodeValData::Eval(bev) = &base.data else { return NodeVal::invalid(loc) };
    let EvalPayload::Children(elems) = &bev.payload else { return NodeVal::invalid(loc) };
    let NodeValData::Eval(iev) = &index.data else { return NodeVal::invalid(loc) };
    let idx = match &iev.payload {
        EvalPayload::Scalar(ScalarVal::I(i)) if *i >= 0 => *i as usize,
        EvalPayload::Scalar(ScalarVal::U(u)) => *u as usize,
        _ => return NodeVal::invalid(loc),
    };
    let Some(elem) = elems.get(idx) else { return NodeVal::invalid(loc) };
    let mut result = elem.clone();
    attach_sub_ref(&mut result, bev.reference.as_ref(), PathStep::Index(idx as u32));
    result
}

/// Data-member access: the result aliases `base`'s own storage when
/// `base` itself carries a reference, by chaining one more
/// `PathStep::Member` onto it (spec.md §4.5 — index-by-field-name is an
/// lvalue on data types).
pub(crate) fn perform_oper_member(ctx: &Ctx, base: NodeVal, field: orb_common::NameId, loc: CodeLoc) -> NodeVal {
    let NodeValData::Eval(bev) = &base.data else { return NodeVal::invalid(loc) };
    let TypeId::NamedData(idx) = ctx.types.underlying(bev.ty) else {
        return NodeVal::invalid(loc);
    };
    let Some(pos) = ctx.types.get_data_type(idx).members.iter().position(|m| m.name == field) else {
        return NodeVal::invalid(loc);
    };
    let EvalPayload::Children(elems) = &bev.payload else { return NodeVal::invalid(loc) };
    let Some(member) = elems.get(pos) else { return NodeVal::invalid(loc) };
    let mut result = member.clone();
    attach_sub_ref(&mut result, bev.reference.as_ref(), PathStep::Member(pos as u32));
    result
}

fn attach_sub_ref(result: &mut NodeVal, base_ref: Option<&RefTarget>, step: PathStep) {
    let Some(base_ref) = base_ref else { return };
    let NodeValData::Eval(out) = &mut result.data else { return };
    out.reference = Some(base_ref.clone().with_step(step));
}

pub(crate) fn comparison_set_up() -> ComparisonState {
    ComparisonState {
        short_circuited: false,
        result: true,
    }
}

pub(crate) fn comparison_step(ctx: &mut Ctx, state: &mut ComparisonState, op: Oper, lhs: &NodeVal, rhs: &NodeVal, loc: CodeLoc) {
    match compare_pair(ctx, op, lhs, rhs) {
        Some(ok) => {
            state.result = state.result && ok;
            if !ok {
                state.short_circuited = true;
            }
        }
        None => {
            bad_operand(ctx, loc, op, lhs.type_id());
            state.result = false;
            state.short_circuited = true;
        }
    }
}

pub(crate) fn comparison_tear_down(state: ComparisonState, loc: CodeLoc) -> NodeVal {
    NodeVal::eval(TypeId::Primitive(orb_types::Primitive::Bool), EvalPayload::Scalar(ScalarVal::Bool(state.result)), loc)
}

fn compare_pair(ctx: &Ctx, op: Oper, lhs: &NodeVal, rhs: &NodeVal) -> Option<bool> {
    let NodeValData::Eval(lev) = &lhs.data else { return None };
    let NodeValData::Eval(rev) = &rhs.data else { return None };
    let ty = lev.ty;

    if ctx.types.works_as_i(ty) {
        let (EvalPayload::Scalar(ScalarVal::I(l)), EvalPayload::Scalar(ScalarVal::I(r))) = (&lev.payload, &rev.payload) else {
            return None;
        };
        return order_cmp(op, l, r);
    }
    if ctx.types.works_as_u(ty) {
        let (EvalPayload::Scalar(ScalarVal::U(l)), EvalPayload::Scalar(ScalarVal::U(r))) = (&lev.payload, &rev.payload) else {
            return None;
        };
        return order_cmp(op, l, r);
    }
    if ctx.types.works_as_c(ty) {
        let (EvalPayload::Scalar(ScalarVal::C8(l)), EvalPayload::Scalar(ScalarVal::C8(r))) = (&lev.payload, &rev.payload) else {
            return None;
        };
        return order_cmp(op, l, r);
    }
    if ctx.types.works_as_f(ty) {
        let (EvalPayload::Scalar(ScalarVal::F(l)), EvalPayload::Scalar(ScalarVal::F(r))) = (&lev.payload, &rev.payload) else {
            return None;
        };
        return order_cmp(op, l, r);
    }
    if ctx.types.works_as_str(ty) {
        let (EvalPayload::Scalar(ScalarVal::Str(l)), EvalPayload::Scalar(ScalarVal::Str(r))) = (&lev.payload, &rev.payload) else {
            return None;
        };
        return eq_only(op, l == r);
    }
    if ctx.types.works_as_any_p(ty) {
        let (EvalPayload::Scalar(ScalarVal::Ptr(l)), EvalPayload::Scalar(ScalarVal::Ptr(r))) = (&lev.payload, &rev.payload) else {
            return None;
        };
        return eq_only(op, l == r);
    }
    if ctx.types.works_as_bool(ty) {
        let (EvalPayload::Scalar(ScalarVal::Bool(l)), EvalPayload::Scalar(ScalarVal::Bool(r))) = (&lev.payload, &rev.payload) else {
            return None;
        };
        return eq_only(op, l == r);
    }
    None
}

fn order_cmp<T: PartialOrd>(op: Oper, l: &T, r: &T) -> Option<bool> {
    Some(match op {
        Oper::Eq => l == r,
        Oper::Neq => l != r,
        Oper::Lt => l < r,
        Oper::LtEq => l <= r,
        Oper::Gt => l > r,
        Oper::GtEq => l >= r,
        _ => return None,
    })
}

fn eq_only(op: Oper, eq: bool) -> Option<bool> {
    match op {
        Oper::Eq => Some(eq),
        Oper::Neq => Some(!eq),
        _ => None,
    }
}
