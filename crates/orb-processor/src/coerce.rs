//! Implicit-cast coercion and type-name rendering (spec.md §4.1, §4.3
//! "Coercion"), grounded on `original_source/src/Processor.cpp`'s
//! `processAndImplicitCast` and `TypeTable::toString` helpers.

use crate::dispatch::Processor;
use orb_ast::{Node, NodeVal};
use orb_common::{CodeLoc, DiagKind, NamePool};
use orb_types::{Decor, TypeDescr, TypeId, TypeTable};

/// Processes `node`, then requires the result be implicitly castable
/// into `ty`, then performs the cast (spec.md §4.3).
pub fn process_and_implicit_cast(p: &mut Processor<'_>, node: &Node, ty: TypeId) -> NodeVal {
    let val = p.process_node(node);
    if val.is_invalid() {
        return val;
    }
    process_and_implicit_cast_value(p, val, ty, node.loc)
}

pub fn process_and_implicit_cast_value(p: &mut Processor<'_>, val: NodeVal, ty: TypeId, loc: CodeLoc) -> NodeVal {
    let Some(from) = val.type_id() else {
        return val;
    };
    if from == ty {
        return val;
    }
    if !p.ctx.types.is_implicit_castable(from, ty) {
        let from_name = type_name(&p.ctx.types, &p.ctx.names, from);
        let into_name = type_name(&p.ctx.types, &p.ctx.names, ty);
        p.ctx
            .messages
            .raise(loc, DiagKind::TypeCannotImplicitCast { from: from_name, into: into_name });
        return NodeVal::invalid(loc);
    }
    { let (__b, __c) = p.active_and_ctx(); __b.perform_cast(__c, val, ty, false, loc) }
}

/// Attempts `lhs → rhs`'s type, then `rhs → lhs`'s type; used for
/// regular binary operators that need a common type (spec.md §4.3
/// "Two-operand coercion attempts one-way then the other").
pub fn coerce_pair(p: &mut Processor<'_>, lhs: NodeVal, rhs: NodeVal, loc: CodeLoc) -> Option<(NodeVal, NodeVal)> {
    let lt = lhs.type_id()?;
    let rt = rhs.type_id()?;
    if lt == rt {
        return Some((lhs, rhs));
    }
    if p.ctx.types.is_implicit_castable(rt, lt) {
        let rhs = { let (__b, __c) = p.active_and_ctx(); __b.perform_cast(__c, rhs, lt, false, loc) };
        return Some((lhs, rhs));
    }
    if p.ctx.types.is_implicit_castable(lt, rt) {
        let lhs = { let (__b, __c) = p.active_and_ctx(); __b.perform_cast(__c, lhs, rt, false, loc) };
        return Some((lhs, rhs));
    }
    None
}

/// `cast(TYPE, EXPR)`: an explicit cast, which additionally permits the
/// pointer/`ptr` family conversions implicit casting forbids outright
/// (e.g. `cast(i32, cast(ptr, 0))`, spec.md §8 scenario 4).
pub fn perform_cast_form(p: &mut Processor<'_>, node: &Node, rest: &[Node]) -> NodeVal {
    let (Some(type_node), Some(expr_node)) = (rest.first(), rest.get(1)) else {
        return p.internal_error(node.loc, "cast requires a type and an expression");
    };
    let type_val = p.process_node(type_node);
    let Some(ty) = crate::dispatch::as_type_value(&type_val) else {
        p.ctx.messages.raise(type_node.loc, DiagKind::TypeNonTypeWhereTypeRequired);
        return NodeVal::invalid(node.loc);
    };
    let val = p.process_node(expr_node);
    if val.is_invalid() {
        return val;
    }
    let Some(from) = val.type_id() else {
        return NodeVal::invalid(node.loc);
    };
    if !is_explicit_castable(&p.ctx.types, from, ty) {
        let from_name = type_name(&p.ctx.types, &p.ctx.names, from);
        let into_name = type_name(&p.ctx.types, &p.ctx.names, ty);
        p.ctx.messages.raise(node.loc, DiagKind::TypeCannotCast { from: from_name, into: into_name });
        return NodeVal::invalid(node.loc);
    }
    { let (__b, __c) = p.active_and_ctx(); __b.perform_cast(__c, val, ty, true, node.loc) }
}

fn is_explicit_castable(types: &TypeTable, from: TypeId, into: TypeId) -> bool {
    if types.is_implicit_castable(from, into) {
        return true;
    }
    let from_is_num = types.works_as_i(from) || types.works_as_u(from) || types.works_as_f(from);
    let into_is_num = types.works_as_i(into) || types.works_as_u(into) || types.works_as_f(into);
    if from_is_num && into_is_num {
        return true;
    }
    if types.works_as_any_p(from) && types.works_as_any_p(into) {
        return true;
    }
    false
}

#[must_use]
pub fn array_len(types: &TypeTable, ty: TypeId) -> Option<u64> {
    match ty {
        TypeId::Descr(_) if types.works_as_arr(ty) => {
            let descr = descr_of(types, ty);
            match descr.decors.last() {
                Some(Decor::Array(n)) => Some(*n),
                _ => None,
            }
        }
        _ => None,
    }
}

#[must_use]
pub fn descr_of(types: &TypeTable, t: TypeId) -> TypeDescr {
    match t {
        TypeId::Descr(idx) => types.get_descr(idx).clone(),
        other => TypeDescr::base_only(other, false),
    }
}

/// Renders a type for diagnostic text; not a full pretty-printer, just
/// enough for error messages to name the offending type.
#[must_use]
pub fn type_name(types: &TypeTable, names: &NamePool, ty: TypeId) -> String {
    match ty {
        TypeId::Primitive(p) => p.name().to_string(),
        TypeId::NamedData(idx) => names.get(types.get_data_type(idx).name).to_string(),
        TypeId::Tuple(idx) => {
            let members = &types.get_tuple(idx).members;
            let rendered: Vec<String> = members.iter().map(|&m| type_name(types, names, m)).collect();
            format!("({})", rendered.join(" "))
        }
        TypeId::Callable(idx) => {
            let c = types.get_callable(idx);
            let kind = if c.is_func { "fnc" } else { "mac" };
            format!("{kind}(...)")
        }
        TypeId::Descr(idx) => {
            let descr = types.get_descr(idx);
            let mut s = if descr.base_cn { format!("cn {}", type_name(types, names, descr.base)) } else { type_name(types, names, descr.base) };
            for (decor, cn) in descr.decors.iter().zip(descr.decor_cns.iter()) {
                let piece = match decor {
                    Decor::Pointer => "*".to_string(),
                    Decor::ArrayPointer => "[]".to_string(),
                    Decor::Array(n) => format!("[{n}]"),
                };
                s = if *cn { format!("{s} cn {piece}") } else { format!("{s} {piece}") };
            }
            s
        }
        TypeId::NamedCustom(idx) => {
            let _ = idx;
            "custom".to_string()
        }
    }
}
