//! Macro registration and invocation (spec.md §4.4), grounded on
//! `original_source/src/SymbolTable.cpp`'s `MacroArg::Kind` collapse
//! and `tsz-checker`'s substitution-by-rebuild idiom for tree rewrites.

use crate::dispatch::Processor;
use orb_ast::{EvalPayload, LiteralKind, Node, NodeVal, NodeValData, ScalarVal};
use orb_common::{CodeLoc, DiagKind, NameId};
use orb_symbols::{MacroCallSite, MacroValue, PreHandling, RegisterOutcome};
use orb_types::Callable;
use smallvec::SmallVec;

/// `mac NAME (arg1 arg2 … […]) BODY`: registers a macro overload.
pub fn perform_mac(p: &mut Processor<'_>, node: &Node, rest: &[Node]) -> NodeVal {
    let Some(name_node) = rest.first() else {
        return p.internal_error(node.loc, "mac requires a name");
    };
    let Some(name) = name_node.as_id() else {
        return p.internal_error(node.loc, "mac name must be an identifier");
    };
    let Some(args_node) = rest.get(1) else {
        return p.internal_error(node.loc, "mac requires an argument list");
    };
    let Some(body) = rest.get(2) else {
        return p.internal_error(node.loc, "mac requires a body");
    };

    let mut arg_names: SmallVec<[NameId; 4]> = SmallVec::new();
    let mut arg_pre_handling: SmallVec<[PreHandling; 4]> = SmallVec::new();
    let mut variadic = false;
    let arg_children = args_node.children();
    for (i, arg) in arg_children.iter().enumerate() {
        let is_last = i + 1 == arg_children.len();
        if is_last {
            if let Some(id) = arg.as_id() {
                if p.ctx.reserved.meaningful(id) == Some(orb_common::reserved::Meaningful::Ellipsis) {
                    variadic = true;
                    continue;
                }
            }
        }
        let Some(arg_name) = arg.as_id() else {
            return p.internal_error(arg.loc, "mac argument must be a name");
        };
        if arg_names.contains(&arg_name) {
            let text = p.ctx.names.get(arg_name).to_string();
            p.ctx.messages.raise(arg.loc, DiagKind::SymbolArgNameDuplicate { name: text });
            return NodeVal::invalid(node.loc);
        }
        if arg.type_attr.is_some() {
            let text = p.ctx.names.get(arg_name).to_string();
            p.ctx.messages.raise(arg.loc, DiagKind::WarnMacroArgTyped { name: text });
        }
        let preprocess = has_arg_flag(p, arg, "preprocess");
        let plus_escape = has_arg_flag(p, arg, "plusEscape");
        if preprocess && plus_escape {
            let text = p.ctx.names.get(arg_name).to_string();
            p.ctx.messages.raise(arg.loc, DiagKind::MacroArgModeConflict { name: text });
            return NodeVal::invalid(node.loc);
        }
        let mode = if preprocess {
            PreHandling::Preprocess
        } else if plus_escape {
            PreHandling::PlusEscape
        } else {
            PreHandling::Regular
        };
        arg_names.push(arg_name);
        arg_pre_handling.push(mode);
    }
    if variadic && arg_children.len() > arg_names.len() + 1 {
        p.ctx.messages.raise(node.loc, DiagKind::MacroArgAfterVariadic);
        return NodeVal::invalid(node.loc);
    }

    let fixed_arg_count = u32::try_from(arg_names.len()).unwrap_or(u32::MAX);
    let sig = p.ctx.types.add_callable(Callable {
        is_func: false,
        arg_types: SmallVec::new(),
        ret_type: None,
        variadic,
    });
    let macro_val = MacroValue { name, arg_names, arg_pre_handling, fixed_arg_count, variadic, sig };

    let macro_id = match p.ctx.symbols.register_macro(macro_val) {
        Ok(id) => id,
        Err(RegisterOutcome::NameTakenByOtherKind) => {
            let text = p.ctx.names.get(name).to_string();
            p.ctx.messages.raise(node.loc, DiagKind::SymbolNameTaken { name: text });
            return NodeVal::invalid(node.loc);
        }
        Err(RegisterOutcome::SignatureCollision | RegisterOutcome::VariadicCollision) => {
            let text = p.ctx.names.get(name).to_string();
            p.ctx.messages.raise(node.loc, DiagKind::MacroConflict { name: text });
            return NodeVal::invalid(node.loc);
        }
    };

    { let (__b, __c) = p.active_and_ctx(); __b.perform_macro_definition(__c, macro_id) };
    p.ctx.macro_bodies.insert(macro_id, body.clone());
    NodeVal::valid_void(node.loc)
}

fn has_arg_flag(p: &Processor<'_>, arg: &Node, flag: &str) -> bool {
    arg.attrs.iter().any(|(name, _)| p.ctx.names.get(*name) == flag)
}

/// Invocation of a resolved macro-set: substitutes argument values into
/// the stored body and re-processes the result in place (spec.md
/// §4.4).
pub fn dispatch_invoke(p: &mut Processor<'_>, head: &NodeVal, node: &Node, rest: &[Node]) -> NodeVal {
    let NodeValData::Special(orb_ast::SpecialMarker::MacroSet(name)) = head.data else {
        return p.internal_error(node.loc, "dispatch_invoke on a non-macro-set value");
    };
    let call = MacroCallSite { name, arg_count: u32::try_from(rest.len()).unwrap_or(u32::MAX) };
    let Some(macro_id) = p.ctx.symbols.get_macro_id(call) else {
        let text = p.ctx.names.get(name).to_string();
        p.ctx.messages.raise(node.loc, DiagKind::FuncNotFound { name: text });
        return NodeVal::invalid(node.loc);
    };
    let mac = p.ctx.symbols.get_macro(macro_id).clone();
    let Some(body) = p.ctx.macro_bodies.get(&macro_id).cloned() else {
        return p.internal_error(node.loc, "macro body missing");
    };

    let fixed = mac.arg_names.len();
    let mut bindings: Vec<(NameId, Node)> = Vec::with_capacity(fixed + 1);
    for i in 0..fixed {
        let handling = mac.arg_pre_handling[i];
        let substituted = match handling {
            PreHandling::Preprocess => {
                let v = p.process_node(&rest[i]);
                value_to_node(&v, &rest[i])
            }
            PreHandling::Regular | PreHandling::PlusEscape => {
                let mut n = rest[i].clone();
                n.escape_score += handling.escape_score();
                n
            }
        };
        bindings.push((mac.arg_names[i], substituted));
    }
    if mac.variadic {
        let tail: SmallVec<[Node; 4]> = rest[fixed..].iter().cloned().collect();
        let tail_node = Node::composite(tail, node.loc);
        if let Some(&tail_name) = mac.arg_names.last() {
            bindings.push((tail_name, tail_node));
        }
    }

    let substituted_body = substitute(&body, &bindings, node.loc);
    p.process_node(&substituted_body)
}

/// Folds an already-processed preprocess-mode argument back into tree
/// form so it can occupy a leaf position in the rebuilt body. Literal
/// scalars round-trip exactly; anything else (aggregates, references,
/// backend tokens) falls back to the argument's own unprocessed tree,
/// since there is no AST leaf kind that embeds a live `NodeVal`.
fn value_to_node(v: &NodeVal, original: &Node) -> Node {
    let NodeValData::Eval(ev) = &v.data else {
        return original.clone();
    };
    match &ev.payload {
        EvalPayload::Scalar(ScalarVal::Bool(b)) => Node::leaf(LiteralKind::Bool(*b), v.loc),
        EvalPayload::Scalar(ScalarVal::I(i)) => Node::leaf(LiteralKind::SignedInt(i128::from(*i)), v.loc),
        EvalPayload::Scalar(ScalarVal::U(u)) => Node::leaf(LiteralKind::SignedInt(i128::from(*u)), v.loc),
        EvalPayload::Scalar(ScalarVal::F(f)) => Node::leaf(LiteralKind::Float(*f), v.loc),
        EvalPayload::Scalar(ScalarVal::C8(c)) => Node::leaf(LiteralKind::Char(*c as char), v.loc),
        EvalPayload::Scalar(ScalarVal::Str(s)) => Node::leaf(LiteralKind::Str(*s), v.loc),
        EvalPayload::Scalar(ScalarVal::Id(id)) => Node::leaf(LiteralKind::Id(*id), v.loc),
        EvalPayload::Scalar(ScalarVal::Raw(inner)) => (**inner).clone(),
        _ => original.clone(),
    }
}

fn substitute(n: &Node, bindings: &[(NameId, Node)], loc: CodeLoc) -> Node {
    if let Some(id) = n.as_id() {
        if let Some((_, replacement)) = bindings.iter().find(|(name, _)| *name == id) {
            let mut r = replacement.clone();
            r.loc = loc;
            return r;
        }
    }
    if n.children().is_empty() {
        return n.clone();
    }
    let children: SmallVec<[Node; 4]> = n.children().iter().map(|c| substitute(c, bindings, loc)).collect();
    let mut out = Node::composite(children, n.loc);
    out.escape_score = n.escape_score;
    out.type_attr = n.type_attr.clone();
    out.attrs = n.attrs.clone();
    out
}
