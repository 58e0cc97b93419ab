//! Block control flow and the `sym`/`block`/`exit`/`loop`/`pass`/`ret`
//! keyword forms (spec.md §4.2, §4.7), grounded on
//! `original_source/src/SymbolTable.h`'s scoped block-chain design and
//! spec.md §4.7's evaluator state machine comment.

use crate::dispatch::{as_type_value, Processor};
use orb_ast::{Node, NodeVal, NodeValData, SpecialMarker};
use orb_common::reserved::Keyword;
use orb_common::{DiagKind, NameId};
use orb_symbols::{Block, CalleeInfo, VarEntry};

/// The unwind record threaded through a callable's nested blocks
/// (spec.md §4.7 "skipIssued reason... and optional target block name").
#[derive(Clone, Copy, Debug)]
pub struct Skip {
    pub kind: SkipKind,
    pub target: Option<NameId>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SkipKind {
    Exit,
    Loop,
    Ret,
}

/// `sym NAME [::TYPE] [INIT]`: declares a variable in the innermost
/// active block.
pub fn perform_sym(p: &mut Processor<'_>, node: &Node, rest: &[Node]) -> NodeVal {
    let Some(name_node) = rest.first() else {
        return p.internal_error(node.loc, "sym requires a name");
    };
    let Some(name) = name_node.as_id() else {
        return p.internal_error(node.loc, "sym name must be an identifier");
    };
    if !p.ctx.symbols.name_available(name) {
        let text = p.ctx.names.get(name).to_string();
        p.ctx.messages.raise(node.loc, DiagKind::SymbolNameTaken { name: text });
        return NodeVal::invalid(node.loc);
    }

    let declared_ty = match &name_node.type_attr {
        Some(ty_node) => {
            let v = p.process_node(ty_node);
            as_type_value(&v)
        }
        None => None,
    };
    let init_node = rest.get(1);

    let (value, ty) = match (declared_ty, init_node) {
        (Some(ty), Some(init)) => (crate::coerce::process_and_implicit_cast(p, init, ty), ty),
        (Some(ty), None) => ({ let (__b, __c) = p.active_and_ctx(); __b.perform_zero(__c, ty, node.loc) }, ty),
        (None, Some(init)) => {
            let v = p.process_node(init);
            let Some(ty) = v.type_id() else { return NodeVal::invalid(node.loc) };
            (v, ty)
        }
        (None, None) => {
            let text = p.ctx.names.get(name).to_string();
            p.ctx.messages.raise(node.loc, DiagKind::SymbolConstWithoutInit { name: text });
            return NodeVal::invalid(node.loc);
        }
    };
    if value.is_invalid() {
        return value;
    }
    if p.ctx.symbols.in_global_scope() && p.ctx.symbols.get_drop_func(ty).is_some() {
        let text = p.ctx.names.get(name).to_string();
        p.ctx.messages.raise(node.loc, DiagKind::SymbolOwningValueAtGlobalScope { name: text });
        return NodeVal::invalid(node.loc);
    }

    let registered = { let (__b, __c) = p.active_and_ctx(); __b.perform_register(__c, name, ty, Some(value), node.loc) };
    p.ctx.symbols.add_var(VarEntry::new(name, registered));
    NodeVal::valid_void(node.loc)
}

/// `block [NAME] [TYPE] BODY...`: runs the body in a fresh scope,
/// re-entering it on a matching `loop` and unwinding to here on a
/// matching `exit`/`pass` (spec.md §4.7's evaluator state machine).
pub fn perform_block(p: &mut Processor<'_>, node: &Node, rest: &[Node]) -> NodeVal {
    let mut idx = 0;
    let name = rest.first().filter(|n| looks_like_name_slot(p, n)).and_then(Node::as_id);
    if name.is_some() {
        idx += 1;
    }
    let passing_type = rest.get(idx).and_then(|n| {
        let v = p.process_node(n);
        as_type_value(&v)
    });
    if passing_type.is_some() {
        idx += 1;
    }
    let body = &rest[idx..];

    let template = Block {
        name,
        passing_type,
        ..Block::default()
    };
    let mut pass_value: Option<NodeVal> = None;

    loop {
        let set_up_ok = { let (__b, __c) = p.active_and_ctx(); __b.perform_block_set_up(__c, &template) };
        p.ctx.symbols.push_block(template.clone());
        if set_up_ok {
            for child in body {
                if p.skip.is_some() {
                    // Reachable-but-skipped: only `pass` forms need to be
                    // revisited, to report the unreachable-pass warning
                    // (spec.md §8 scenario 3); anything else is inert.
                    if is_pass_form(p, child) {
                        let _ = p.process_node(child);
                    }
                    continue;
                }
                p.process_node(child);
            }
        }

        let (popped, vars) = p.ctx.symbols.pop_block();
        tear_down_vars(p, vars);
        { let (__b, __c) = p.active_and_ctx(); __b.perform_block_tear_down(__c, &popped, set_up_ok) };

        match p.skip {
            Some(Skip { kind: SkipKind::Exit, target }) if target.is_none() || target == name => {
                p.skip = None;
                pass_value = p.pass_value.take();
                break;
            }
            Some(Skip { kind: SkipKind::Loop, target }) if target.is_none() || target == name => {
                p.skip = None;
            }
            _ => break,
        }
    }

    match passing_type {
        Some(ty) => match pass_value {
            Some(v) => v,
            None => {
                p.ctx.messages.raise(node.loc, DiagKind::ExpressionBlockNoPass);
                let _ = ty;
                NodeVal::invalid(node.loc)
            }
        },
        None => NodeVal::valid_void(node.loc),
    }
}

/// A block-header slot is a NAME (rather than the start of the TYPE
/// slot or the body) iff it is a bare identifier that isn't itself
/// reserved or resolvable as a type — reading it never has side effects.
fn looks_like_name_slot(p: &Processor<'_>, n: &Node) -> bool {
    n.as_id().is_some_and(|id| {
        p.ctx.reserved.keyword(id).is_none()
            && p.ctx.reserved.oper(id).is_none()
            && p.ctx.reserved.meaningful(id).is_none()
            && !p.ctx.primitive_names.contains_key(&id)
            && p.ctx.types.data_type_by_name(id).is_none()
            && p.ctx.types.named_custom_by_name(id).is_none()
    })
}

fn is_pass_form(p: &Processor<'_>, n: &Node) -> bool {
    n.children()
        .first()
        .and_then(Node::as_id)
        .is_some_and(|id| p.ctx.reserved.keyword(id) == Some(Keyword::Pass))
}

fn tear_down_vars(p: &mut Processor<'_>, vars: Vec<VarEntry>) {
    for entry in vars.into_iter().rev() {
        if entry.skip_drop {
            continue;
        }
        let Some(ty) = entry.value.type_id() else { continue };
        let Some(drop_fn) = p.ctx.symbols.get_drop_func(ty).cloned() else { continue };
        let NodeValData::Special(SpecialMarker::FuncSet(name)) = drop_fn.data else { continue };
        let loc = entry.value.loc;
        let candidates: Vec<_> = p
            .ctx
            .symbols
            .func_ids(name)
            .into_iter()
            .filter(|&id| p.ctx.symbols.get_func(id).arg_names.len() == 1)
            .collect();
        if let [drop_id] = candidates[..] {
            crate::calls::invoke(p, drop_id, vec![entry.value], loc);
        }
    }
}

pub fn perform_exit_form(p: &mut Processor<'_>, node: &Node, rest: &[Node]) -> NodeVal {
    let name = rest.first().and_then(Node::as_id);
    if let Some(n) = name {
        if p.ctx.symbols.get_block(n).is_none() {
            let text = p.ctx.names.get(n).to_string();
            p.ctx.messages.raise(node.loc, DiagKind::ExitNowhere { name: Some(text) });
            return NodeVal::invalid(node.loc);
        }
    } else if p.ctx.symbols.get_last_block().is_none() {
        p.ctx.messages.raise(node.loc, DiagKind::ExitNowhere { name: None });
        return NodeVal::invalid(node.loc);
    }
    let cond = eval_cond(p, rest.get(1));
    if cond {
        p.skip = Some(Skip { kind: SkipKind::Exit, target: name });
        p.pass_value = None;
    }
    { let (__b, __c) = p.active_and_ctx(); __b.perform_exit(__c, name, node.loc) };
    NodeVal::valid_void(node.loc)
}

pub fn perform_loop_form(p: &mut Processor<'_>, node: &Node, rest: &[Node]) -> NodeVal {
    let name = rest.first().and_then(Node::as_id);
    if let Some(n) = name {
        if p.ctx.symbols.get_block(n).is_none() {
            let text = p.ctx.names.get(n).to_string();
            p.ctx.messages.raise(node.loc, DiagKind::LoopNowhere { name: Some(text) });
            return NodeVal::invalid(node.loc);
        }
    } else if p.ctx.symbols.get_last_block().is_none() {
        p.ctx.messages.raise(node.loc, DiagKind::LoopNowhere { name: None });
        return NodeVal::invalid(node.loc);
    }
    let cond = eval_cond(p, rest.get(1));
    if cond {
        p.skip = Some(Skip { kind: SkipKind::Loop, target: name });
    }
    { let (__b, __c) = p.active_and_ctx(); __b.perform_loop(__c, name, node.loc) };
    NodeVal::valid_void(node.loc)
}

pub fn perform_pass_form(p: &mut Processor<'_>, node: &Node, rest: &[Node]) -> NodeVal {
    let Some(name_node) = rest.first() else {
        return p.internal_error(node.loc, "pass requires a block name");
    };
    let Some(name) = name_node.as_id() else {
        return p.internal_error(node.loc, "pass target must be an identifier");
    };
    let Some(block) = p.ctx.symbols.get_block(name).cloned() else {
        p.ctx.messages.raise(node.loc, DiagKind::PassOnBlockNoPass);
        return NodeVal::invalid(node.loc);
    };
    let Some(ty) = block.passing_type else {
        p.ctx.messages.raise(node.loc, DiagKind::PassOnNonPassingBlock);
        return NodeVal::invalid(node.loc);
    };
    if p.skip.is_some() {
        p.ctx.messages.raise(node.loc, DiagKind::WarnPassUnreachable);
        return NodeVal::valid_void(node.loc);
    }
    let Some(val_node) = rest.get(1) else {
        return p.internal_error(node.loc, "pass requires a value");
    };
    let val = crate::coerce::process_and_implicit_cast(p, val_node, ty);
    if val.is_invalid() {
        return val;
    }
    { let (__b, __c) = p.active_and_ctx(); __b.perform_pass(__c, Some(name), val.clone(), node.loc) };
    p.skip = Some(Skip { kind: SkipKind::Exit, target: Some(name) });
    p.pass_value = Some(val);
    NodeVal::valid_void(node.loc)
}

pub fn perform_ret_form(p: &mut Processor<'_>, node: &Node, rest: &[Node]) -> NodeVal {
    let Some(info) = p.ctx.symbols.curr_callee().cloned() else {
        p.ctx.messages.raise(node.loc, DiagKind::RetOutsideCallable);
        return NodeVal::invalid(node.loc);
    };
    let val = match (info.ret_type, rest.first()) {
        (Some(ty), Some(val_node)) => {
            let v = crate::coerce::process_and_implicit_cast(p, val_node, ty);
            if v.is_invalid() {
                return v;
            }
            Some(v)
        }
        (Some(_), None) => {
            p.ctx.messages.raise(node.loc, DiagKind::RetNoValue);
            return NodeVal::invalid(node.loc);
        }
        (None, Some(_)) => {
            p.ctx.messages.raise(node.loc, DiagKind::RetValue);
            return NodeVal::invalid(node.loc);
        }
        (None, None) => None,
    };
    { let (__b, __c) = p.active_and_ctx(); __b.perform_ret(__c, val.clone(), node.loc) };
    p.pass_value = val;
    p.skip = Some(Skip { kind: SkipKind::Ret, target: None });
    NodeVal::valid_void(node.loc)
}

fn eval_cond(p: &mut Processor<'_>, cond_node: Option<&Node>) -> bool {
    match cond_node {
        Some(n) => {
            let v = p.process_node(n);
            matches!(
                &v.data,
                NodeValData::Eval(ev) if matches!(&ev.payload, orb_ast::EvalPayload::Scalar(orb_ast::ScalarVal::Bool(true)))
            )
        }
        None => true,
    }
}

/// Runs a callable's body as a bare block inside a fresh callable frame,
/// binding `args` (already coerced to the formal parameter types and
/// loaded through the active backend) in a dedicated argument block
/// that sits below the body's own block, so the body can `loop`/`exit`
/// its own top level without ever re-binding or losing the arguments.
/// Tears the frame down regardless of how control left it.
pub fn run_callable_body(p: &mut Processor<'_>, info: CalleeInfo, body: &Node, args: &[(NameId, NodeVal)]) -> NodeVal {
    p.ctx.symbols.enter_callable(info);
    p.ctx.symbols.push_block(Block::default());
    for &(name, ref value) in args {
        p.ctx.symbols.add_var(VarEntry::new(name, value.clone()));
    }
    let result = perform_block(p, body, body.children());
    let (_, vars) = p.ctx.symbols.pop_block();
    tear_down_vars(p, vars);
    p.skip = None;
    p.ctx.symbols.exit_callable();
    result
}
