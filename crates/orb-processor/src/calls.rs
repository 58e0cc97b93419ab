//! Function declaration/definition and overload-resolved call dispatch
//! (spec.md §4.6), grounded on `original_source/include/SymbolTable.h`'s
//! `FunctionValue` overload-set shape and
//! `tsz-checker/src/resolve.rs`'s candidate-filtering idiom.

use crate::dispatch::{as_type_value, Processor};
use orb_ast::{EvalPayload, Node, NodeVal, ScalarVal};
use orb_common::reserved::Meaningful;
use orb_common::{CodeLoc, DiagKind};
use orb_symbols::{CalleeInfo, FuncId, FuncValue, RegisterOutcome};
use orb_types::{Callable, TypeId};
use smallvec::SmallVec;

/// `fnc NAME (arg1::ty1 … […]) retTy BODY?`: declares, or declares and
/// defines, one overload of `NAME`.
pub fn perform_fnc(p: &mut Processor<'_>, node: &Node, rest: &[Node]) -> NodeVal {
    let Some(name_node) = rest.first() else {
        return p.internal_error(node.loc, "fnc requires a name");
    };
    let Some(name) = name_node.as_id() else {
        return p.internal_error(node.loc, "fnc name must be an identifier");
    };
    let Some(args_node) = rest.get(1) else {
        return p.internal_error(node.loc, "fnc requires an argument list");
    };

    let mut arg_names: SmallVec<[orb_common::NameId; 4]> = SmallVec::new();
    let mut arg_types: SmallVec<[TypeId; 4]> = SmallVec::new();
    let mut variadic = false;
    let arg_children = args_node.children();
    for (i, arg) in arg_children.iter().enumerate() {
        let is_last = i + 1 == arg_children.len();
        if is_last {
            if let Some(id) = arg.as_id() {
                if p.ctx.reserved.meaningful(id) == Some(Meaningful::Ellipsis) {
                    variadic = true;
                    continue;
                }
            }
        }
        let Some(arg_name) = arg.as_id() else {
            return p.internal_error(arg.loc, "fnc argument must be a name");
        };
        if arg_names.contains(&arg_name) {
            let text = p.ctx.names.get(arg_name).to_string();
            p.ctx.messages.raise(arg.loc, DiagKind::SymbolArgNameDuplicate { name: text });
            return NodeVal::invalid(node.loc);
        }
        let Some(ty_node) = &arg.type_attr else {
            return p.internal_error(arg.loc, "fnc argument requires a type");
        };
        let ty_val = p.process_node(ty_node);
        let Some(ty) = as_type_value(&ty_val) else {
            p.ctx.messages.raise(ty_node.loc, DiagKind::TypeNonTypeWhereTypeRequired);
            return NodeVal::invalid(node.loc);
        };
        arg_names.push(arg_name);
        arg_types.push(ty);
    }

    let mut idx = 2;
    let ret_type = match rest.get(idx) {
        Some(n) if looks_like_type_slot(p, n) => {
            let v = p.process_node(n);
            idx += 1;
            as_type_value(&v)
        }
        _ => None,
    };
    let body_node = rest.get(idx);

    let no_name_mangle = has_flag(p, node, "noNameMangle");
    let evaluable = has_flag(p, node, "evaluable");
    let compiled = has_flag(p, node, "compiled") || !evaluable;

    let sig = p.ctx.types.add_callable(Callable {
        is_func: true,
        arg_types: arg_types.clone(),
        ret_type,
        variadic,
    });

    let existing = find_matching_declaration(p, name, sig);
    let func_id = match existing {
        Some(id) => {
            let existing_val = p.ctx.symbols.get_func(id);
            if existing_val.no_name_mangle != no_name_mangle {
                let text = p.ctx.names.get(name).to_string();
                p.ctx.messages.raise(node.loc, DiagKind::FuncRedefinitionMismatch { name: text });
                return NodeVal::invalid(node.loc);
            }
            id
        }
        None => {
            let func_val = FuncValue {
                name,
                arg_names: arg_names.clone(),
                sig,
                defined: false,
                no_name_mangle,
                evaluable,
                compiled,
            };
            match p.ctx.symbols.register_func(func_val, &p.ctx.types) {
                Ok(id) => id,
                Err(RegisterOutcome::NameTakenByOtherKind) => {
                    let text = p.ctx.names.get(name).to_string();
                    p.ctx.messages.raise(node.loc, DiagKind::SymbolNameTaken { name: text });
                    return NodeVal::invalid(node.loc);
                }
                Err(RegisterOutcome::SignatureCollision | RegisterOutcome::VariadicCollision) => {
                    let text = p.ctx.names.get(name).to_string();
                    p.ctx.messages.raise(node.loc, DiagKind::FuncSignatureCollision { name: text });
                    return NodeVal::invalid(node.loc);
                }
            }
        }
    };

    match body_node {
        None => {
            if compiled {
                p.compiler.perform_function_declaration(&mut p.ctx, func_id);
            } else {
                p.evaluator.perform_function_declaration(&mut p.ctx, func_id);
            }
            NodeVal::valid_void(node.loc)
        }
        Some(body) => {
            p.ctx.symbols.get_func_mut(func_id).defined = true;
            if evaluable {
                // Retained so a later call-site invocation can re-run the
                // body against its own bound arguments (see
                // `Ctx::func_bodies`); this definition-time pass only
                // validates the body once against zero-initialized args.
                p.ctx.func_bodies.insert(func_id, body.clone());
            }
            let info = CalleeInfo {
                is_func: true,
                is_eval: evaluable,
                is_lower: compiled,
                ret_type,
            };
            // A `compiled` overload needs its body actually lowered once,
            // here, into the function the compiler declares for it —
            // later call sites (`invoke`) only ever refer back to that
            // single lowering, the same flip-and-restore `compiling`
            // uses around a call.
            let was_compiling = p.compiling;
            p.compiling = compiled;
            if compiled {
                p.compiler.perform_function_declaration(&mut p.ctx, func_id);
            }
            let mut bindings = Vec::with_capacity(arg_names.len());
            for (&arg_name, &arg_ty) in arg_names.iter().zip(arg_types.iter()) {
                let zero = { let (__b, __c) = p.active_and_ctx(); __b.perform_zero(__c, arg_ty, node.loc) };
                let loaded = { let (__b, __c) = p.active_and_ctx(); __b.perform_register(__c, arg_name, arg_ty, Some(zero), node.loc) };
                bindings.push((arg_name, loaded));
            }
            let _ = crate::blocks::run_callable_body(p, info, body, &bindings);
            { let (__b, __c) = p.active_and_ctx(); __b.perform_function_definition(__c, func_id, body) };
            p.compiling = was_compiling;
            NodeVal::valid_void(node.loc)
        }
    }
}

fn find_matching_declaration(p: &Processor<'_>, name: orb_common::NameId, sig: TypeId) -> Option<FuncId> {
    p.ctx
        .symbols
        .func_ids(name)
        .into_iter()
        .find(|&id| !p.ctx.symbols.get_func(id).defined && p.ctx.symbols.get_func(id).sig == sig)
}

/// An `fnc` header slot is the return-type slot (rather than the start
/// of the body) iff it looks like a type expression head — checked via
/// read-only table lookups so peeking never runs a body statement.
fn looks_like_type_slot(p: &Processor<'_>, n: &Node) -> bool {
    match n.as_id() {
        Some(id) => {
            p.ctx.primitive_names.contains_key(&id)
                || p.ctx.types.data_type_by_name(id).is_some()
                || p.ctx.types.named_custom_by_name(id).is_some()
        }
        None => n.children().first().is_some_and(|h| looks_like_type_slot(p, h)),
    }
}

fn has_flag(p: &Processor<'_>, node: &Node, flag: &str) -> bool {
    node.attrs.iter().any(|(name, _)| p.ctx.names.get(*name) == flag)
}

/// Invocation of a resolved function-set: filters overloads by arity and
/// per-argument implicit-castability (spec.md §4.6 "Overload
/// resolution"), then dispatches per the calling-convention rule.
pub fn dispatch_call(p: &mut Processor<'_>, head: &NodeVal, node: &Node, rest: &[Node]) -> NodeVal {
    let orb_ast::NodeValData::Special(orb_ast::SpecialMarker::FuncSet(name)) = head.data else {
        return p.internal_error(node.loc, "dispatch_call on a non-function-set value");
    };

    let mut args = Vec::with_capacity(rest.len());
    for child in rest {
        let v = p.process_node(child);
        if v.is_invalid() {
            return v;
        }
        args.push(v);
    }

    let candidates: Vec<FuncId> = p
        .ctx
        .symbols
        .func_ids(name)
        .into_iter()
        .filter(|&id| arity_fits(p, id, args.len()))
        .filter(|&id| args_fit(p, id, &args))
        .collect();

    match candidates.as_slice() {
        [] => {
            let text = p.ctx.names.get(name).to_string();
            p.ctx.messages.raise(node.loc, DiagKind::FuncNotFound { name: text });
            NodeVal::invalid(node.loc)
        }
        [only] => invoke(p, *only, args, node.loc),
        many => {
            let text = p.ctx.names.get(name).to_string();
            let candidates = vec![node.loc; many.len()];
            p.ctx.messages.raise(node.loc, DiagKind::FuncCallAmbiguous { name: text, candidates });
            NodeVal::invalid(node.loc)
        }
    }
}

fn arity_fits(p: &Processor<'_>, id: FuncId, given: usize) -> bool {
    let f = p.ctx.symbols.get_func(id);
    let TypeId::Callable(idx) = f.sig else { return false };
    let sig = p.ctx.types.get_callable(idx);
    if sig.variadic {
        given >= sig.arg_types.len()
    } else {
        given == sig.arg_types.len()
    }
}

fn args_fit(p: &Processor<'_>, id: FuncId, args: &[NodeVal]) -> bool {
    let f = p.ctx.symbols.get_func(id);
    let TypeId::Callable(idx) = f.sig else { return false };
    let sig = p.ctx.types.get_callable(idx);
    sig.arg_types
        .iter()
        .zip(args.iter())
        .all(|(&formal, actual)| arg_fits(p, actual, formal))
}

/// A call-site actual fits a formal type either by the normal
/// implicit-cast rule, or — for a still-literal-valued eval result — by
/// fitting the formal primitive's value range directly (spec.md §4.6
/// "literal-typed actuals can match any primitive they fit").
fn arg_fits(p: &Processor<'_>, actual: &NodeVal, formal: TypeId) -> bool {
    if let Some(at) = actual.type_id() {
        if p.ctx.types.is_implicit_castable(at, formal) {
            return true;
        }
    }
    let orb_ast::NodeValData::Eval(ev) = &actual.data else { return false };
    match &ev.payload {
        EvalPayload::Scalar(ScalarVal::I(v)) => {
            p.ctx.types.fits_i(i128::from(*v), formal) || p.ctx.types.fits_u(i128::from(*v), formal)
        }
        EvalPayload::Scalar(ScalarVal::U(v)) => p.ctx.types.fits_u(i128::from(*v), formal),
        EvalPayload::Scalar(ScalarVal::F(v)) => p.ctx.types.fits_f(*v, formal),
        _ => false,
    }
}

/// Invokes a resolved overload. `evaluable` overloads called with
/// all-constant arguments are re-run here, directly against a fresh
/// copy of the stored body bound to those arguments — the evaluator's
/// own `Backend::perform_call` is never reached on this path, since
/// re-walking a body requires `Processor::process_node`, which no
/// `Backend` method has access to. Anything else goes through
/// `Backend::perform_call`: for a `compiled` overload that's the
/// compiler lowering a call instruction against the single IR body it
/// emitted at `perform_function_definition` time; an overload that is
/// `evaluable` but not `compiled`, called with a non-constant argument,
/// has no runtime form at all and is rejected.
pub(crate) fn invoke(p: &mut Processor<'_>, id: FuncId, args: Vec<NodeVal>, loc: CodeLoc) -> NodeVal {
    let f = p.ctx.symbols.get_func(id);
    let name = f.name;
    let evaluable = f.evaluable;
    let compiled = f.compiled;

    if evaluable && args.iter().all(is_eval_constant) {
        if let Some(result) = run_evaluable_body(p, id, args.clone(), loc) {
            return result;
        }
    }

    if !compiled {
        let text = p.ctx.names.get(name).to_string();
        p.ctx.messages.raise(loc, DiagKind::EvalCallNotEvaluable { name: text });
        return NodeVal::invalid(loc);
    }

    let was_compiling = p.compiling;
    p.compiling = true;
    let result = { let (__b, __c) = p.active_and_ctx(); __b.perform_call(__c, id, args, loc) };
    p.compiling = was_compiling;
    result
}

/// Re-runs a stored `evaluable` body bound to real call-site arguments,
/// inside a fresh callable frame (see `blocks::run_callable_body`).
/// Returns `None` when no body is on record (a declaration-only
/// overload), in which case the caller falls through to the backend.
fn run_evaluable_body(p: &mut Processor<'_>, id: FuncId, args: Vec<NodeVal>, loc: CodeLoc) -> Option<NodeVal> {
    let body = p.ctx.func_bodies.get(&id)?.clone();
    let f = p.ctx.symbols.get_func(id);
    let arg_names = f.arg_names.clone();
    let compiled = f.compiled;
    let TypeId::Callable(idx) = f.sig else { return None };
    let ret_type = p.ctx.types.get_callable(idx).ret_type;

    let info = CalleeInfo {
        is_func: true,
        is_eval: true,
        is_lower: compiled,
        ret_type,
    };
    let mut bindings = Vec::with_capacity(arg_names.len());
    for (&arg_name, value) in arg_names.iter().zip(args) {
        let Some(ty) = value.type_id() else { continue };
        let loaded = { let (__b, __c) = p.active_and_ctx(); __b.perform_register(__c, arg_name, ty, Some(value), loc) };
        bindings.push((arg_name, loaded));
    }
    Some(crate::blocks::run_callable_body(p, info, &body, &bindings))
}

fn is_eval_constant(v: &NodeVal) -> bool {
    matches!(v.data, orb_ast::NodeValData::Eval(_))
}
