//! `process_node`, the processor's single entry point (spec.md §4.3).
//!
//! Grounded on `original_source/src/Processor.cpp`'s `processNode`
//! switch and `tsz-checker/src/dispatch.rs`'s `ExpressionDispatcher`
//! kind-matching style, adapted from "one match per syntax kind" to
//! "process the first child, then branch on what it turned out to be".

use crate::backend::{Backend, LoadTarget};
use crate::blocks::Skip;
use crate::ctx::Ctx;
use orb_ast::{
    EvalPayload, LiteralKind, Node, NodeKind, NodeVal, NodeValData, RefTarget, ScalarVal,
    SpecialMarker,
};
use orb_common::reserved::{Keyword, Meaningful, Oper};
use orb_common::{CodeLoc, DiagKind, NameId};
use orb_types::{Primitive, TypeId};

/// Drives one compilation unit's worth of `process_node` calls. Holds
/// both backends so call-site dispatch (spec.md §4.6, §6) can switch
/// between them without either backend needing a reference back to the
/// other — see [`crate::backend::Backend`]'s doc comment.
pub struct Processor<'b> {
    pub ctx: Ctx,
    pub evaluator: &'b mut dyn Backend,
    pub compiler: &'b mut dyn Backend,
    /// Which backend `active()` currently returns; flipped by `eval { … }`
    /// (forces the evaluator for its subtree) and by call dispatch.
    pub(crate) compiling: bool,
    /// The current frame's unwind record (spec.md §9 "skip-issued"),
    /// consulted by the block-body loop in `blocks.rs`.
    pub(crate) skip: Option<Skip>,
    /// The value carried by the `pass`/`ret` that issued the current
    /// (or most recently cleared) skip, picked up by the block or
    /// callable frame that absorbs it.
    pub(crate) pass_value: Option<NodeVal>,
}

impl<'b> Processor<'b> {
    #[must_use]
    pub fn new(ctx: Ctx, evaluator: &'b mut dyn Backend, compiler: &'b mut dyn Backend) -> Self {
        Self {
            ctx,
            evaluator,
            compiler,
            compiling: false,
            skip: None,
            pass_value: None,
        }
    }

    pub(crate) fn active(&mut self) -> &mut dyn Backend {
        if self.compiling {
            self.compiler
        } else {
            self.evaluator
        }
    }

    pub(crate) fn active_and_ctx(&mut self) -> (&mut dyn Backend, &mut Ctx) {
        let backend: &mut dyn Backend = if self.compiling {
            self.compiler
        } else {
            self.evaluator
        };
        (backend, &mut self.ctx)
    }

    /// Processes every top-level form in sequence, stopping early once
    /// compilation status reaches error (spec.md §5 "Cancellation").
    pub fn process_forms(&mut self, forms: &[Node]) -> Vec<NodeVal> {
        let mut out = Vec::with_capacity(forms.len());
        for form in forms {
            if self.ctx.messages.is_failing() {
                break;
            }
            out.push(self.process_node(form));
        }
        out
    }

    pub fn process_node(&mut self, node: &Node) -> NodeVal {
        if node.escape_score > 0 {
            return self.process_escaped(node);
        }
        let mut val = match &*node.kind {
            NodeKind::Leaf(lit) => self.process_leaf(node, lit),
            NodeKind::Composite(children) => self.process_composite(node, children),
        };
        self.apply_attrs(node, &mut val);
        val
    }

    /// An escaped leaf/subtree is returned uninterpreted, one quote layer
    /// lighter, as a raw-tree eval-value (spec.md §4.3 "Escape semantics").
    fn process_escaped(&mut self, node: &Node) -> NodeVal {
        let mut inner = node.clone();
        inner.unescape_one();
        let score = inner.escape_score;
        NodeVal::eval(
            TypeId::Primitive(Primitive::Raw),
            EvalPayload::Scalar(ScalarVal::Raw(Box::new(inner))),
            node.loc,
        )
        .with_escape(score)
    }

    fn process_leaf(&mut self, node: &Node, lit: &LiteralKind) -> NodeVal {
        match lit {
            LiteralKind::SignedInt(v) => match self.ctx.types.shortest_fitting_prim_i(*v) {
                Some(prim) => {
                    let truncated = truncate_to_primitive(*v, prim);
                    NodeVal::eval(
                        TypeId::Primitive(prim),
                        EvalPayload::Scalar(ScalarVal::I(truncated)),
                        node.loc,
                    )
                }
                None => self.internal_error(node.loc, "integer literal exceeds i64 range"),
            },
            LiteralKind::Float(v) => {
                let prim = if self.ctx.types.fits_f(*v, TypeId::Primitive(Primitive::F32)) {
                    Primitive::F32
                } else {
                    Primitive::F64
                };
                NodeVal::eval(TypeId::Primitive(prim), EvalPayload::Scalar(ScalarVal::F(*v)), node.loc)
            }
            LiteralKind::Char(c) => NodeVal::eval(
                TypeId::Primitive(Primitive::C8),
                EvalPayload::Scalar(ScalarVal::C8(*c as u8)),
                node.loc,
            ),
            LiteralKind::Bool(b) => NodeVal::eval(
                TypeId::Primitive(Primitive::Bool),
                EvalPayload::Scalar(ScalarVal::Bool(*b)),
                node.loc,
            ),
            LiteralKind::Str(s) => {
                NodeVal::eval(self.ctx.types.str_type(), EvalPayload::Scalar(ScalarVal::Str(*s)), node.loc)
            }
            LiteralKind::Null => NodeVal::eval(
                TypeId::Primitive(Primitive::Ptr),
                EvalPayload::Scalar(ScalarVal::Ptr(0)),
                node.loc,
            ),
            LiteralKind::Id(name) => self.resolve_identifier(*name, node.loc),
        }
    }

    /// Identifier lookup order per spec.md §4.3: "type / variable /
    /// function-set / macro-set", with reserved words recognized first
    /// since they are never shadowable.
    fn resolve_identifier(&mut self, name: NameId, loc: CodeLoc) -> NodeVal {
        if let Some(kw) = self.ctx.reserved.keyword(name) {
            return NodeVal::new(NodeValData::Special(SpecialMarker::Keyword(kw)), loc);
        }
        if let Some(op) = self.ctx.reserved.oper(name) {
            return NodeVal::new(NodeValData::Special(SpecialMarker::Oper(op)), loc);
        }
        if let Some(m) = self.ctx.reserved.meaningful(name) {
            return NodeVal::new(NodeValData::Special(SpecialMarker::Meaningful(m)), loc);
        }
        if let Some(&prim) = self.ctx.primitive_names.get(&name) {
            return NodeVal::eval(
                TypeId::Primitive(Primitive::Type),
                EvalPayload::Scalar(ScalarVal::Type(TypeId::Primitive(prim))),
                loc,
            );
        }
        if let Some(ty) = self.ctx.types.data_type_by_name(name) {
            return NodeVal::eval(TypeId::Primitive(Primitive::Type), EvalPayload::Scalar(ScalarVal::Type(ty)), loc);
        }
        if let Some(ty) = self.ctx.types.named_custom_by_name(name) {
            return NodeVal::eval(TypeId::Primitive(Primitive::Type), EvalPayload::Scalar(ScalarVal::Type(ty)), loc);
        }
        if let Some(var_id) = self.ctx.symbols.get_var_id(name) {
            return { let (__b, __c) = self.active_and_ctx(); __b.perform_load(__c, LoadTarget::Var(var_id), loc) };
        }
        if self.ctx.symbols.is_func_name(name) {
            return { let (__b, __c) = self.active_and_ctx(); __b.perform_load(__c, LoadTarget::FuncSet(name), loc) };
        }
        if self.ctx.symbols.is_macro_name(name) {
            return { let (__b, __c) = self.active_and_ctx(); __b.perform_load(__c, LoadTarget::MacroSet(name), loc) };
        }
        let text = self.ctx.names.get(name).to_string();
        self.ctx.messages.raise(loc, DiagKind::SymbolNotFound { name: text });
        NodeVal::invalid(loc)
    }

    fn process_composite(&mut self, node: &Node, children: &[Node]) -> NodeVal {
        let Some(first) = children.first() else {
            return NodeVal::valid_void(node.loc);
        };
        let head = self.process_node(first);
        if head.is_invalid() {
            return NodeVal::invalid(node.loc);
        }
        let rest = &children[1..];

        match &head.data {
            NodeValData::Special(SpecialMarker::Keyword(kw)) => self.dispatch_keyword(*kw, node, rest),
            NodeValData::Special(SpecialMarker::Oper(op)) => {
                crate::operators::dispatch_operator(self, *op, node, rest)
            }
            NodeValData::Special(SpecialMarker::FuncSet(_)) => {
                crate::calls::dispatch_call(self, &head, node, rest)
            }
            NodeValData::Special(SpecialMarker::MacroSet(_)) => {
                crate::macros::dispatch_invoke(self, &head, node, rest)
            }
            NodeValData::Eval(ev) if ev.ty == TypeId::Primitive(Primitive::Type) => {
                self.dispatch_type_construction(&head, node, rest)
            }
            _ => self.tuple_construct(node, &head, rest),
        }
    }

    /// Builds a descriptor or tuple type from a leading type value plus
    /// the remaining children (spec.md §4.3 "type-construction").
    fn dispatch_type_construction(&mut self, head: &NodeVal, node: &Node, rest: &[Node]) -> NodeVal {
        let base = match &head.data {
            NodeValData::Eval(ev) => match &ev.payload {
                EvalPayload::Scalar(ScalarVal::Type(t)) => *t,
                _ => return self.internal_error(node.loc, "type-construction head without a type payload"),
            },
            _ => return self.internal_error(node.loc, "type-construction head without a type payload"),
        };

        // A second type-valued child makes this a tuple constructor
        // instead of a decorator sequence.
        if let Some(second) = rest.first() {
            let second_val = self.process_node(second);
            if let Some(second_ty) = as_type_value(&second_val) {
                let mut members = vec![base, second_ty];
                for child in &rest[1..] {
                    let v = self.process_node(child);
                    match as_type_value(&v) {
                        Some(t) => members.push(t),
                        None => {
                            self.ctx.messages.raise(child.loc, DiagKind::TypeNonTypeWhereTypeRequired);
                            return NodeVal::invalid(node.loc);
                        }
                    }
                }
                return match self.ctx.types.add_tuple(members) {
                    Ok(t) => NodeVal::eval(
                        TypeId::Primitive(Primitive::Type),
                        EvalPayload::Scalar(ScalarVal::Type(t)),
                        node.loc,
                    ),
                    Err(_) => {
                        self.ctx.messages.raise(node.loc, DiagKind::TypeMalformedDescr);
                        NodeVal::invalid(node.loc)
                    }
                };
            }
        }

        let mut result = base;
        for child in rest {
            if let Some(name) = child.as_id() {
                if self.ctx.reserved.meaningful(name) == Some(Meaningful::Cn) {
                    result = self.ctx.types.add_cn_of(result);
                    continue;
                }
                if self.ctx.reserved.meaningful(name) == Some(Meaningful::Asterisk) {
                    result = self.ctx.types.add_addr_of(result);
                    continue;
                }
                if self.ctx.reserved.meaningful(name) == Some(Meaningful::Square) {
                    result = self.ctx.types.add_arr_of_len(result, 0);
                    continue;
                }
            }
            let len_val = self.process_node(child);
            if let NodeValData::Eval(ev) = &len_val.data {
                if let EvalPayload::Scalar(ScalarVal::I(n)) = &ev.payload {
                    result = self.ctx.types.add_arr_of_len(result, (*n).max(0) as u64);
                    continue;
                }
            }
            self.ctx.messages.raise(child.loc, DiagKind::TypeMalformedDescr);
            return NodeVal::invalid(node.loc);
        }
        NodeVal::eval(TypeId::Primitive(Primitive::Type), EvalPayload::Scalar(ScalarVal::Type(result)), node.loc)
    }

    fn dispatch_keyword(&mut self, kw: Keyword, node: &Node, rest: &[Node]) -> NodeVal {
        match kw {
            Keyword::Sym => crate::blocks::perform_sym(self, node, rest),
            Keyword::Cast => crate::coerce::perform_cast_form(self, node, rest),
            Keyword::Block => crate::blocks::perform_block(self, node, rest),
            Keyword::Exit => crate::blocks::perform_exit_form(self, node, rest),
            Keyword::Loop => crate::blocks::perform_loop_form(self, node, rest),
            Keyword::Pass => crate::blocks::perform_pass_form(self, node, rest),
            Keyword::Fnc => crate::calls::perform_fnc(self, node, rest),
            Keyword::Ret => crate::blocks::perform_ret_form(self, node, rest),
            Keyword::Mac => crate::macros::perform_mac(self, node, rest),
            Keyword::Eval => self.perform_eval_form(node, rest),
            Keyword::Tup => self.perform_tup_form(node, rest),
            Keyword::TypeOf => self.perform_type_of(node, rest),
            Keyword::LenOf => self.perform_len_of(node, rest),
            Keyword::SizeOf => self.perform_size_of_form(node, rest),
            Keyword::IsDef => self.perform_is_def(node, rest),
            Keyword::AttrOf => self.perform_attr_of(node, rest),
            Keyword::AttrIsDef => self.perform_attr_is_def(node, rest),
            Keyword::Import => self.perform_import(node, rest),
            Keyword::Message => self.perform_message(node, rest),
        }
    }

    fn perform_eval_form(&mut self, node: &Node, rest: &[Node]) -> NodeVal {
        let was_compiling = self.compiling;
        self.compiling = false;
        let mut result = NodeVal::valid_void(node.loc);
        for child in rest {
            result = self.process_node(child);
        }
        self.compiling = was_compiling;
        result
    }

    fn perform_tup_form(&mut self, node: &Node, rest: &[Node]) -> NodeVal {
        self.tuple_construct(node, &NodeVal::valid_void(node.loc), rest)
    }

    fn tuple_construct(&mut self, node: &Node, head: &NodeVal, rest: &[Node]) -> NodeVal {
        let head_is_empty = matches!(head.data, NodeValData::ValidVoid);
        let mut members = Vec::with_capacity(rest.len() + 1);
        if !head_is_empty {
            members.push(head.clone());
        }
        for child in rest {
            members.push(self.process_node(child));
        }
        if members.iter().any(NodeVal::is_invalid) {
            return NodeVal::invalid(node.loc);
        }
        if members.len() == 1 {
            return members.pop().unwrap();
        }
        let types: Result<Vec<TypeId>, ()> = members
            .iter()
            .map(|m| m.type_id().ok_or(()))
            .collect();
        let Ok(types) = types else {
            self.ctx.messages.raise(node.loc, DiagKind::TypeNonTypeWhereTypeRequired);
            return NodeVal::invalid(node.loc);
        };
        match self.ctx.types.add_tuple(types) {
            Ok(ty) => NodeVal::eval(ty, EvalPayload::Children(members), node.loc),
            Err(_) => {
                self.ctx.messages.raise(node.loc, DiagKind::TypeMalformedDescr);
                NodeVal::invalid(node.loc)
            }
        }
    }

    fn perform_type_of(&mut self, node: &Node, rest: &[Node]) -> NodeVal {
        let Some(expr) = rest.first() else {
            return self.internal_error(node.loc, "typeOf requires one argument");
        };
        let v = self.process_node(expr);
        match v.type_id() {
            Some(ty) => NodeVal::eval(TypeId::Primitive(Primitive::Type), EvalPayload::Scalar(ScalarVal::Type(ty)), node.loc),
            None => NodeVal::invalid(node.loc),
        }
    }

    fn perform_len_of(&mut self, node: &Node, rest: &[Node]) -> NodeVal {
        let Some(expr) = rest.first() else {
            return self.internal_error(node.loc, "lenOf requires one argument");
        };
        let v = self.process_node(expr);
        let Some(ty) = v.type_id() else { return NodeVal::invalid(node.loc) };
        let len = match self.ctx.types.add_index_of(ty) {
            Some(_) => crate::coerce::array_len(&self.ctx.types, ty),
            None => None,
        };
        match len {
            Some(n) => NodeVal::eval(TypeId::Primitive(Primitive::U64), EvalPayload::Scalar(ScalarVal::U(n)), node.loc),
            None => {
                let ty_name = crate::coerce::type_name(&self.ctx.types, &self.ctx.names, ty);
                self.ctx.messages.raise(node.loc, DiagKind::IndexNonIndexable { ty: ty_name });
                NodeVal::invalid(node.loc)
            }
        }
    }

    fn perform_size_of_form(&mut self, node: &Node, rest: &[Node]) -> NodeVal {
        let Some(type_node) = rest.first() else {
            return self.internal_error(node.loc, "sizeOf requires one argument");
        };
        let v = self.process_node(type_node);
        let Some(ty) = as_type_value(&v) else {
            self.ctx.messages.raise(type_node.loc, DiagKind::TypeNonTypeWhereTypeRequired);
            return NodeVal::invalid(node.loc);
        };
        let size = { let (__b, __c) = self.active_and_ctx(); __b.perform_size_of(__c, ty) };
        NodeVal::eval(TypeId::Primitive(Primitive::U64), EvalPayload::Scalar(ScalarVal::U(size)), node.loc)
    }

    fn perform_is_def(&mut self, node: &Node, rest: &[Node]) -> NodeVal {
        let Some(name_node) = rest.first() else {
            return self.internal_error(node.loc, "isDef requires a name");
        };
        let found = match name_node.as_id() {
            Some(name) => {
                self.ctx.reserved.keyword(name).is_some()
                    || self.ctx.primitive_names.contains_key(&name)
                    || self.ctx.types.data_type_by_name(name).is_some()
                    || self.ctx.types.named_custom_by_name(name).is_some()
                    || self.ctx.symbols.get_var_id(name).is_some()
                    || self.ctx.symbols.is_func_name(name)
                    || self.ctx.symbols.is_macro_name(name)
            }
            None => false,
        };
        NodeVal::eval(TypeId::Primitive(Primitive::Bool), EvalPayload::Scalar(ScalarVal::Bool(found)), node.loc)
    }

    fn perform_attr_of(&mut self, node: &Node, rest: &[Node]) -> NodeVal {
        let (Some(target), Some(attr_node)) = (rest.first(), rest.get(1)) else {
            return self.internal_error(node.loc, "attrOf requires a node and an attribute name");
        };
        let val = self.process_node(target);
        let Some(attr_name) = attr_node.as_id() else {
            return self.internal_error(node.loc, "attrOf attribute name must be an identifier");
        };
        match &val.attrs {
            Some(map) => map.get(&attr_name).cloned().unwrap_or_else(|| NodeVal::valid_void(node.loc)),
            None => NodeVal::valid_void(node.loc),
        }
    }

    fn perform_attr_is_def(&mut self, node: &Node, rest: &[Node]) -> NodeVal {
        let (Some(target), Some(attr_node)) = (rest.first(), rest.get(1)) else {
            return self.internal_error(node.loc, "attrIsDef requires a node and an attribute name");
        };
        let val = self.process_node(target);
        let Some(attr_name) = attr_node.as_id() else {
            return self.internal_error(node.loc, "attrIsDef attribute name must be an identifier");
        };
        let found = val.attrs.as_ref().is_some_and(|m| m.contains_key(&attr_name));
        NodeVal::eval(TypeId::Primitive(Primitive::Bool), EvalPayload::Scalar(ScalarVal::Bool(found)), node.loc)
    }

    fn perform_import(&mut self, node: &Node, rest: &[Node]) -> NodeVal {
        let Some(path_node) = rest.first() else {
            return self.internal_error(node.loc, "import requires a path");
        };
        let v = self.process_node(path_node);
        match &v.data {
            NodeValData::Eval(ev) => match &ev.payload {
                EvalPayload::Scalar(ScalarVal::Str(s)) => NodeVal::new(NodeValData::Import(*s), node.loc),
                _ => {
                    self.ctx.messages.raise(node.loc, DiagKind::ImportNotAString);
                    NodeVal::invalid(node.loc)
                }
            },
            _ => {
                self.ctx.messages.raise(node.loc, DiagKind::ImportNotAString);
                NodeVal::invalid(node.loc)
            }
        }
    }

    fn perform_message(&mut self, node: &Node, rest: &[Node]) -> NodeVal {
        let Some(text_node) = rest.first() else {
            return self.internal_error(node.loc, "message requires a text argument");
        };
        let v = self.process_node(text_node);
        if let NodeValData::Eval(ev) = &v.data {
            if let EvalPayload::Scalar(ScalarVal::Str(s)) = &ev.payload {
                let text = self.ctx.strings.get(*s).to_string();
                self.ctx.messages.raise(node.loc, DiagKind::UserMessage { text });
            }
        }
        NodeVal::valid_void(node.loc)
    }

    fn apply_attrs(&mut self, node: &Node, val: &mut NodeVal) {
        if let Some(type_attr) = &node.type_attr {
            let ty_val = self.process_node(type_attr);
            if let Some(ty) = as_type_value(&ty_val) {
                *val = crate::coerce::process_and_implicit_cast_value(self, val.clone(), ty, node.loc);
            }
        }
        if node.attrs.is_empty() {
            return;
        }
        let mut map = rustc_hash::FxHashMap::default();
        for (name, attr_node) in &node.attrs {
            map.insert(*name, self.process_node(attr_node));
        }
        val.attrs = Some(Box::new(map));
    }

    pub(crate) fn internal_error(&mut self, loc: CodeLoc, detail: &str) -> NodeVal {
        self.ctx.messages.raise(loc, DiagKind::Internal { detail: detail.to_string() });
        NodeVal::invalid(loc)
    }
}

pub(crate) fn as_type_value(v: &NodeVal) -> Option<TypeId> {
    match &v.data {
        NodeValData::Eval(ev) if ev.ty == TypeId::Primitive(Primitive::Type) => match &ev.payload {
            EvalPayload::Scalar(ScalarVal::Type(t)) => Some(*t),
            _ => None,
        },
        _ => None,
    }
}

fn truncate_to_primitive(v: i128, prim: Primitive) -> i64 {
    match prim {
        Primitive::I32 => i64::from(v as i32),
        _ => v as i64,
    }
}

pub(crate) fn ref_target_of(v: &NodeVal) -> Option<RefTarget> {
    match &v.data {
        NodeValData::Eval(ev) => ev.reference.clone(),
        _ => None,
    }
}
