//! Operator dispatch (spec.md §4.5), grounded on
//! `original_source/src/Processor_impl.cpp`'s `processOper*` family.

use crate::dispatch::{ref_target_of, Processor};
use orb_ast::{EvalPayload, Node, NodeVal, NodeValData, RefTarget, ScalarVal};
use orb_common::reserved::{oper_info, Oper};
use orb_common::DiagKind;
use orb_types::{Primitive, TypeId};

pub fn dispatch_operator(p: &mut Processor<'_>, op: Oper, node: &Node, rest: &[Node]) -> NodeVal {
    let info = oper_info(op);
    match rest.len() {
        1 if info.unary => perform_unary(p, op, node, &rest[0]),
        _ if info.comparison => perform_comparison_chain(p, op, node, rest),
        2 if info.binary && op == Oper::Asgn => perform_assignment(p, node, &rest[0], &rest[1]),
        2 if info.binary && op == Oper::Ind => perform_index(p, node, &rest[0], &rest[1]),
        2 if info.binary => perform_regular(p, op, node, &rest[0], &rest[1]),
        n if info.unary => {
            let name = op_name(op);
            p.ctx.messages.raise(node.loc, DiagKind::OperNonBinary { op: format!("{name}({n} args)") });
            NodeVal::invalid(node.loc)
        }
        _ => {
            p.ctx.messages.raise(node.loc, DiagKind::OperNonBinary { op: op_name(op).to_string() });
            NodeVal::invalid(node.loc)
        }
    }
}

fn perform_unary(p: &mut Processor<'_>, op: Oper, node: &Node, operand: &Node) -> NodeVal {
    let val = p.process_node(operand);
    if val.is_invalid() {
        return val;
    }
    match op {
        Oper::Addr => {
            let Some(target) = ref_target_of(&val) else {
                p.ctx.messages.raise(node.loc, DiagKind::AddressOfNonRef);
                return NodeVal::invalid(node.loc);
            };
            let _ = target;
            let Some(ty) = val.type_id() else { return NodeVal::invalid(node.loc) };
            let ptr_ty = p.ctx.types.add_addr_of(ty);
            { let (__b, __c) = p.active_and_ctx(); __b.perform_oper_unary(__c, op, val, node.loc) }.with_type_hint(ptr_ty)
        }
        Oper::Shr if val.type_id().is_some() => perform_move(p, node, val),
        Oper::Mul => {
            let Some(ty) = val.type_id() else { return NodeVal::invalid(node.loc) };
            if p.ctx.types.add_deref_of(ty).is_none() {
                let ty_name = crate::coerce::type_name(&p.ctx.types, &p.ctx.names, ty);
                p.ctx.messages.raise(node.loc, DiagKind::DerefNonPointer { ty: ty_name });
                return NodeVal::invalid(node.loc);
            }
            { let (__b, __c) = p.active_and_ctx(); __b.perform_oper_unary(__c, op, val, node.loc) }
        }
        _ => { let (__b, __c) = p.active_and_ctx(); __b.perform_oper_unary(__c, op, val, node.loc) },
    }
}

/// `>>` with a single operand: the move operator (spec.md §4.5's unary
/// bullet), contextually distinguished from the `Shr` binary shift by
/// arity since both share the `>>` token.
fn perform_move(p: &mut Processor<'_>, node: &Node, val: NodeVal) -> NodeVal {
    let Some(target) = ref_target_of(&val) else {
        p.ctx.messages.raise(node.loc, DiagKind::MoveOnInvocationArg);
        return NodeVal::invalid(node.loc);
    };
    let Some(ty) = val.type_id() else { return NodeVal::invalid(node.loc) };
    if p.ctx.symbols.get_drop_func(ty).is_none() {
        p.ctx.messages.raise(node.loc, DiagKind::MoveOnNoDrop);
        return NodeVal::invalid(node.loc);
    }
    if p.ctx.types.works_as_cn(ty) {
        p.ctx.messages.raise(node.loc, DiagKind::MoveOnConst);
        return NodeVal::invalid(node.loc);
    }
    mark_moved(p, target);
    { let (__b, __c) = p.active_and_ctx(); __b.perform_oper_unary(__c, Oper::Move, val, node.loc) }
}

fn mark_moved(p: &mut Processor<'_>, target: RefTarget) {
    let var_id = orb_symbols::VarId {
        callable_depth: target.callable_depth,
        block_depth: target.block_depth,
        index: target.index,
    };
    p.ctx.symbols.get_var_mut(var_id).skip_drop = true;
}

fn perform_assignment(p: &mut Processor<'_>, node: &Node, lhs_node: &Node, rhs_node: &Node) -> NodeVal {
    let lhs = p.process_node(lhs_node);
    if lhs.is_invalid() {
        return lhs;
    }
    let Some(target) = ref_target_of(&lhs) else {
        p.ctx.messages.raise(node.loc, DiagKind::AddressOfNonRef);
        return NodeVal::invalid(node.loc);
    };
    let Some(lhs_ty) = lhs.type_id() else { return NodeVal::invalid(node.loc) };
    if p.ctx.types.works_as_cn(lhs_ty) {
        p.ctx.messages.raise(node.loc, DiagKind::MoveOnConst);
        return NodeVal::invalid(node.loc);
    }
    let _ = target;
    let rhs = crate::coerce::process_and_implicit_cast(p, rhs_node, lhs_ty);
    if rhs.is_invalid() {
        return rhs;
    }
    { let (__b, __c) = p.active_and_ctx(); __b.perform_oper_assignment(__c, lhs, rhs, node.loc) }
}

fn perform_index(p: &mut Processor<'_>, node: &Node, base_node: &Node, index_node: &Node) -> NodeVal {
    let base = p.process_node(base_node);
    if base.is_invalid() {
        return NodeVal::invalid(node.loc);
    }
    let Some(base_ty) = base.type_id() else { return NodeVal::invalid(node.loc) };

    // Data-member access reads the index position as a bare field name,
    // never as a resolved expression (spec.md §4.5 "on data types (by
    // field name id)").
    if p.ctx.types.works_as_data(base_ty) {
        let Some(field) = index_node.as_id() else {
            p.ctx.messages.raise(node.loc, DiagKind::IndexNotIntegral);
            return NodeVal::invalid(node.loc);
        };
        return { let (__b, __c) = p.active_and_ctx(); __b.perform_oper_member(__c, base, field, node.loc) };
    }

    let index = p.process_node(index_node);
    if index.is_invalid() {
        return NodeVal::invalid(node.loc);
    }

    if p.ctx.types.works_as_tuple(base_ty) {
        let Some(literal_index) = as_literal_index(&index) else {
            p.ctx.messages.raise(node.loc, DiagKind::IndexNotIntegral);
            return NodeVal::invalid(node.loc);
        };
        let arity = match base_ty {
            TypeId::Tuple(idx) => p.ctx.types.get_tuple(idx).members.len(),
            _ => 1,
        };
        if literal_index < 0 || literal_index as usize >= arity {
            p.ctx.messages.raise(node.loc, DiagKind::IndexOutOfBounds { index: literal_index, len: arity as u64 });
            return NodeVal::invalid(node.loc);
        }
        if let NodeValData::Eval(ev) = &base.data {
            if let EvalPayload::Children(members) = &ev.payload {
                return members[literal_index as usize].clone();
            }
        }
        return { let (__b, __c) = p.active_and_ctx(); __b.perform_oper_index(__c, base, index, node.loc) };
    }

    if !p.ctx.types.works_as_arr(base_ty) && !p.ctx.types.works_as_arr_p(base_ty) && !p.ctx.types.works_as_p(base_ty) {
        let ty_name = crate::coerce::type_name(&p.ctx.types, &p.ctx.names, base_ty);
        p.ctx.messages.raise(node.loc, DiagKind::IndexNonIndexable { ty: ty_name });
        return NodeVal::invalid(node.loc);
    }
    if !p.ctx.types.works_as_i(index.type_id().unwrap_or(TypeId::Primitive(Primitive::Ptr)))
        && !p.ctx.types.works_as_u(index.type_id().unwrap_or(TypeId::Primitive(Primitive::Ptr)))
    {
        p.ctx.messages.raise(node.loc, DiagKind::IndexNotIntegral);
        return NodeVal::invalid(node.loc);
    }
    if let (Some(len), Some(lit)) = (crate::coerce::array_len(&p.ctx.types, base_ty), as_literal_index(&index)) {
        if lit < 0 || lit as u64 >= len {
            p.ctx.messages.raise(node.loc, DiagKind::WarnIndexOutOfBounds { index: lit, len });
        }
    }
    { let (__b, __c) = p.active_and_ctx(); __b.perform_oper_index(__c, base, index, node.loc) }
}

fn as_literal_index(val: &NodeVal) -> Option<i128> {
    match &val.data {
        NodeValData::Eval(ev) => match &ev.payload {
            EvalPayload::Scalar(ScalarVal::I(n)) => Some(i128::from(*n)),
            EvalPayload::Scalar(ScalarVal::U(n)) => Some(i128::from(*n)),
            _ => None,
        },
        _ => None,
    }
}

fn perform_regular(p: &mut Processor<'_>, op: Oper, node: &Node, lhs_node: &Node, rhs_node: &Node) -> NodeVal {
    let lhs = p.process_node(lhs_node);
    let rhs = p.process_node(rhs_node);
    if lhs.is_invalid() || rhs.is_invalid() {
        return NodeVal::invalid(node.loc);
    }

    if let (Some(lt), Some(rt)) = (lhs.type_id(), rhs.type_id()) {
        if lt == TypeId::Primitive(Primitive::Raw) && rt == TypeId::Primitive(Primitive::Raw) && op == Oper::Add {
            return concat_raw(lhs, rhs, node);
        }
    }

    let Some((lhs, rhs)) = crate::coerce::coerce_pair(p, lhs.clone(), rhs.clone(), node.loc) else {
        let from = crate::coerce::type_name(&p.ctx.types, &p.ctx.names, lhs.type_id().unwrap_or(TypeId::Primitive(Primitive::Ptr)));
        let into = crate::coerce::type_name(&p.ctx.types, &p.ctx.names, rhs.type_id().unwrap_or(TypeId::Primitive(Primitive::Ptr)));
        p.ctx.messages.raise(node.loc, DiagKind::TypeCannotImplicitCast { from, into });
        return NodeVal::invalid(node.loc);
    };

    if matches!(op, Oper::Div | Oper::Rem) {
        if let NodeValData::Eval(ev) = &rhs.data {
            if is_zero(&ev.payload) {
                p.ctx.messages.raise(node.loc, DiagKind::DivByZero);
                return NodeVal::invalid(node.loc);
            }
        }
    }
    if op == Oper::Shl || op == Oper::Shr {
        if let NodeValData::Eval(ev) = &lhs.data {
            if is_negative(&ev.payload) {
                p.ctx.messages.raise(node.loc, DiagKind::ShiftOfNegative);
                return NodeVal::invalid(node.loc);
            }
        }
    }

    { let (__b, __c) = p.active_and_ctx(); __b.perform_oper_regular(__c, op, lhs, rhs, node.loc) }
}

fn concat_raw(lhs: NodeVal, rhs: NodeVal, node: &Node) -> NodeVal {
    let extract = |v: NodeVal| -> Vec<Node> {
        match v.data {
            NodeValData::Eval(ev) => match ev.payload {
                EvalPayload::Scalar(ScalarVal::Raw(n)) => vec![*n],
                EvalPayload::Children(children) => children
                    .into_iter()
                    .filter_map(|c| match c.data {
                        NodeValData::Eval(ev) => match ev.payload {
                            EvalPayload::Scalar(ScalarVal::Raw(n)) => Some(*n),
                            _ => None,
                        },
                        _ => None,
                    })
                    .collect(),
                _ => vec![],
            },
            _ => vec![],
        }
    };
    let mut combined = extract(lhs);
    combined.extend(extract(rhs));
    let score = combined.iter().map(|n| n.escape_score).min().unwrap_or(1);
    let children = combined
        .into_iter()
        .map(|n| NodeVal::eval(TypeId::Primitive(Primitive::Raw), EvalPayload::Scalar(ScalarVal::Raw(Box::new(n))), node.loc))
        .collect();
    NodeVal::eval(TypeId::Primitive(Primitive::Raw), EvalPayload::Children(children), node.loc).with_escape(score)
}

fn is_zero(payload: &EvalPayload) -> bool {
    match payload {
        EvalPayload::Scalar(ScalarVal::I(n)) => *n == 0,
        EvalPayload::Scalar(ScalarVal::U(n)) => *n == 0,
        EvalPayload::Scalar(ScalarVal::F(n)) => *n == 0.0,
        _ => false,
    }
}

fn is_negative(payload: &EvalPayload) -> bool {
    matches!(payload, EvalPayload::Scalar(ScalarVal::I(n)) if *n < 0)
}

fn perform_comparison_chain(p: &mut Processor<'_>, op: Oper, node: &Node, rest: &[Node]) -> NodeVal {
    if rest.len() < 2 {
        p.ctx.messages.raise(node.loc, DiagKind::OperNonBinary { op: op_name(op).to_string() });
        return NodeVal::invalid(node.loc);
    }
    let mut operands = Vec::with_capacity(rest.len());
    for child in rest {
        let v = p.process_node(child);
        if v.is_invalid() {
            return NodeVal::invalid(node.loc);
        }
        operands.push(v);
    }
    let mut state = { let (__b, __c) = p.active_and_ctx(); __b.perform_oper_comparison_set_up(__c) };
    for pair in operands.windows(2) {
        if state.short_circuited {
            break;
        }
        { let (__b, __c) = p.active_and_ctx(); __b
            .perform_oper_comparison_step(__c, &mut state, op, &pair[0], &pair[1], node.loc) };
    }
    { let (__b, __c) = p.active_and_ctx(); __b.perform_oper_comparison_tear_down(__c, state, node.loc) }
}

fn op_name(op: Oper) -> &'static str {
    match op {
        Oper::Add => "+",
        Oper::Sub => "-",
        Oper::Mul => "*",
        Oper::Div => "/",
        Oper::Rem => "%",
        Oper::Shl => "<<",
        Oper::Shr => ">>",
        Oper::BitAnd => "&",
        Oper::BitXor => "^",
        Oper::BitOr => "|",
        Oper::Eq => "==",
        Oper::Neq => "!=",
        Oper::Lt => "<",
        Oper::LtEq => "<=",
        Oper::Gt => ">",
        Oper::GtEq => ">=",
        Oper::Asgn => "=",
        Oper::Not => "!",
        Oper::BitNot => "~",
        Oper::Ind => "[]",
        Oper::Addr => "&",
        Oper::Move => ">>",
    }
}

trait WithTypeHint {
    fn with_type_hint(self, ty: TypeId) -> NodeVal;
}

impl WithTypeHint for NodeVal {
    /// Overwrites an eval-/backend-value's carried type; used when the
    /// processor derives a more specific type (e.g. `&x`'s pointer type)
    /// than what the backend's generic `performOperUnary` assumed.
    fn with_type_hint(mut self, ty: TypeId) -> NodeVal {
        match &mut self.data {
            NodeValData::Eval(ev) => ev.ty = ty,
            NodeValData::Backend(bv) => bv.ty = ty,
            _ => {}
        }
        self
    }
}
