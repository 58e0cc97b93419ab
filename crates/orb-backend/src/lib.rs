//! The compiler backend: a [`Backend`] that lowers into [`IrModule`]
//! instead of running code directly.
//!
//! Grounded on `original_source/src/Codegen.cpp`'s `Codegen` class,
//! which owns the `llvmModule`/`llvmBuilder` pair and every
//! `processXxx`-dispatched `codegenXxx` method; here that single class
//! is split the same way `orb-eval::Evaluator` splits `Evaluator.cpp`,
//! with the actual instruction-building logic factored into
//! `value`/`operators` so this file only holds the `Backend` impl and
//! the bookkeeping for where an emitted instruction currently belongs.

mod ir;
mod operators;
mod value;

pub use ir::{Instr, IrFunction, IrGlobal, IrModule};

use orb_ast::{BackendToken, Node, NodeVal, NodeValData, SpecialMarker};
use orb_common::reserved::Oper;
use orb_common::{CodeLoc, DiagKind, NameId};
use orb_processor::{Backend, ComparisonState, Ctx, LoadTarget};
use orb_symbols::{Block, FuncId, MacroId};
use orb_types::TypeId;
use rustc_hash::FxHashMap;

/// Lowers one compilation unit. Every `Instr` a `Backend` call produces
/// lands in whichever function is currently open, tracked by
/// [`Compiler::current_function`]; `push` is the only place that
/// decides where.
#[derive(Default)]
pub struct Compiler {
    module: IrModule,
    func_index: FxHashMap<FuncId, usize>,
    next_token: u64,
    /// Instructions computed at global scope for whichever `sym` is
    /// currently being registered; drained into a fresh [`IrGlobal`] at
    /// the end of `perform_register`'s global-scope branch.
    global_scratch: Vec<Instr>,
    /// The function a `perform_function_declaration` call most recently
    /// opened, consumed the moment lowering genuinely begins (see
    /// `perform_block_set_up`). Covers the gap between declaring a
    /// function and entering its first body block, where argument
    /// zero/register instructions are emitted while the symbol table
    /// still reports global scope.
    pending_function: Option<usize>,
    current_function: Option<usize>,
    /// Nesting depth of `perform_block_set_up`/`perform_block_tear_down`
    /// pairs; `pending_function` is promoted to `current_function` on
    /// the 0→1 transition and `current_function` is cleared on the
    /// matching 1→0 transition, so nested blocks inside a function body
    /// don't re-trigger either.
    block_depth: u32,
    comparison_steps: Vec<BackendToken>,
}

impl Compiler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The lowered module, once processing has finished.
    #[must_use]
    pub fn into_module(self) -> IrModule {
        self.module
    }

    fn new_token(&mut self) -> BackendToken {
        let tok = BackendToken(self.next_token);
        self.next_token += 1;
        tok
    }

    fn push(&mut self, instr: Instr) -> BackendToken {
        let tok = self.new_token();
        match self.current_function.or(self.pending_function) {
            Some(idx) => self.module.functions[idx].body.push(instr),
            None => self.global_scratch.push(instr),
        }
        tok
    }

    fn token_of(&self, v: &NodeVal) -> Option<BackendToken> {
        match &v.data {
            NodeValData::Backend(bv) => Some(bv.token),
            _ => None,
        }
    }
}

impl Backend for Compiler {
    fn is_evaluator(&self) -> bool {
        false
    }

    fn perform_load(&mut self, ctx: &mut Ctx, target: LoadTarget, loc: CodeLoc) -> NodeVal {
        match target {
            LoadTarget::Var(id) => {
                let stored = ctx.symbols.get_var(id).value.clone();
                let NodeValData::Backend(bv) = &stored.data else { return NodeVal::invalid(loc) };
                // A variable's address is re-read every time, not cached
                // from registration, so a `Store` an assignment emitted
                // since the last load is actually observed
                // (`codegenVar`'s `CreateLoad`).
                match bv.reference {
                    Some(addr) => {
                        let tok = self.push(Instr::Load(addr));
                        value::backend_node(bv.ty, tok, Some(addr), loc)
                    }
                    None => value::backend_node(bv.ty, bv.token, None, loc),
                }
            }
            LoadTarget::FuncSet(name) => NodeVal::new(NodeValData::Special(SpecialMarker::FuncSet(name)), loc),
            LoadTarget::MacroSet(name) => NodeVal::new(NodeValData::Special(SpecialMarker::MacroSet(name)), loc),
        }
    }

    fn perform_zero(&mut self, ctx: &mut Ctx, ty: TypeId, loc: CodeLoc) -> NodeVal {
        value::zero_value(self, ctx, ty, loc)
    }

    fn perform_register(&mut self, ctx: &mut Ctx, name: NameId, ty: TypeId, init: Option<NodeVal>, loc: CodeLoc) -> NodeVal {
        let src = match init {
            Some(v) => v,
            None => value::zero_value(self, ctx, ty, loc),
        };
        let registered = match value::to_backend(self, ctx, &src, loc) {
            Some((src_ty, tok)) => {
                let tok = if src_ty == ty { tok } else { self.push(Instr::Cast { val: tok, to: ty }) };
                value::materialize(self, ty, tok, loc)
            }
            None => {
                ctx.messages.raise(
                    loc,
                    DiagKind::Internal { detail: "could not construct a backend value for an already-validated registration".to_string() },
                );
                NodeVal::invalid(loc)
            }
        };
        if ctx.symbols.in_global_scope() && !registered.is_invalid() {
            let init_instrs = std::mem::take(&mut self.global_scratch);
            self.module.globals.push(IrGlobal { name, ty, init: init_instrs });
        }
        registered
    }

    fn perform_cast(&mut self, ctx: &mut Ctx, val: NodeVal, ty: TypeId, _explicit: bool, loc: CodeLoc) -> NodeVal {
        match value::make_cast(self, ctx, &val, ty, loc) {
            Some(v) => v,
            None => {
                ctx.messages.raise(
                    loc,
                    DiagKind::Internal { detail: "could not construct a value for an already-validated cast".to_string() },
                );
                NodeVal::invalid(loc)
            }
        }
    }

    fn perform_block_set_up(&mut self, _ctx: &mut Ctx, _block: &Block) -> bool {
        if self.block_depth == 0 {
            if let Some(idx) = self.pending_function.take() {
                self.current_function = Some(idx);
            }
        }
        self.block_depth += 1;
        true
    }

    fn perform_block_tear_down(&mut self, _ctx: &mut Ctx, _block: &Block, _success: bool) -> bool {
        self.block_depth -= 1;
        if self.block_depth == 0 {
            self.current_function = None;
        }
        true
    }

    fn perform_exit(&mut self, _ctx: &mut Ctx, _block_name: Option<NameId>, _loc: CodeLoc) -> bool {
        true
    }

    fn perform_loop(&mut self, _ctx: &mut Ctx, _block_name: Option<NameId>, _loc: CodeLoc) -> bool {
        true
    }

    fn perform_pass(&mut self, _ctx: &mut Ctx, _block_name: Option<NameId>, _val: NodeVal, _loc: CodeLoc) -> bool {
        true
    }

    fn perform_data_definition(&mut self, _ctx: &mut Ctx, _ty: TypeId) -> bool {
        true
    }

    fn perform_call(&mut self, ctx: &mut Ctx, func: FuncId, args: Vec<NodeVal>, loc: CodeLoc) -> NodeVal {
        let Some(&idx) = self.func_index.get(&func) else {
            ctx.messages.raise(
                loc,
                DiagKind::Internal { detail: "call to a function the compiler never declared".to_string() },
            );
            return NodeVal::invalid(loc);
        };
        let ret_type = self.module.functions[idx].ret_type;
        let mut arg_toks = Vec::with_capacity(args.len());
        for a in &args {
            match value::to_backend(self, ctx, a, loc) {
                Some((_, tok)) => arg_toks.push(tok),
                None => return NodeVal::invalid(loc),
            }
        }
        let tok = self.push(Instr::Call { func: idx, args: arg_toks });
        match ret_type {
            Some(ty) => value::backend_node(ty, tok, None, loc),
            None => NodeVal::valid_void(loc),
        }
    }

    /// Macro invocation never reaches a `Backend`: `orb-processor`'s own
    /// dispatch substitutes and re-processes a macro body directly
    /// (`macros::dispatch_invoke`), so no caller anywhere holds a
    /// `MacroId` to pass here.
    fn perform_invoke(&mut self, _ctx: &mut Ctx, _mac: MacroId, _args: Vec<Node>, _loc: CodeLoc) -> NodeVal {
        unreachable!("macro invocation is substituted and re-processed by the caller, never handed to a backend")
    }

    fn perform_function_declaration(&mut self, ctx: &mut Ctx, func: FuncId) -> bool {
        let idx = match self.func_index.get(&func) {
            Some(&idx) => idx,
            None => {
                let fv = ctx.symbols.get_func(func).clone();
                let TypeId::Callable(sig_idx) = fv.sig else { return false };
                let callable = ctx.types.get_callable(sig_idx).clone();
                let params: Vec<(NameId, TypeId)> = fv.arg_names.iter().copied().zip(callable.arg_types.iter().copied()).collect();
                let idx = self.module.functions.len();
                self.module.functions.push(IrFunction::declaration(fv.name, params, callable.ret_type, fv.no_name_mangle));
                self.func_index.insert(func, idx);
                idx
            }
        };
        self.pending_function = Some(idx);
        true
    }

    fn perform_function_definition(&mut self, _ctx: &mut Ctx, func: FuncId, _body: &Node) -> bool {
        if let Some(&idx) = self.func_index.get(&func) {
            self.module.functions[idx].defined = true;
        }
        true
    }

    fn perform_macro_definition(&mut self, _ctx: &mut Ctx, _mac: MacroId) -> bool {
        true
    }

    fn perform_ret(&mut self, _ctx: &mut Ctx, _val: Option<NodeVal>, _loc: CodeLoc) -> bool {
        true
    }

    fn perform_oper_unary(&mut self, ctx: &mut Ctx, op: Oper, val: NodeVal, loc: CodeLoc) -> NodeVal {
        operators::perform_oper_unary(self, ctx, op, val, loc)
    }

    fn perform_oper_regular(&mut self, ctx: &mut Ctx, op: Oper, lhs: NodeVal, rhs: NodeVal, loc: CodeLoc) -> NodeVal {
        operators::perform_oper_regular(self, ctx, op, lhs, rhs, loc)
    }

    fn perform_oper_assignment(&mut self, ctx: &mut Ctx, lhs: NodeVal, rhs: NodeVal, loc: CodeLoc) -> NodeVal {
        operators::perform_oper_assignment(self, ctx, lhs, rhs, loc)
    }

    fn perform_oper_index(&mut self, ctx: &mut Ctx, base: NodeVal, index: NodeVal, loc: CodeLoc) -> NodeVal {
        operators::perform_oper_index(self, ctx, base, index, loc)
    }

    fn perform_oper_member(&mut self, ctx: &mut Ctx, base: NodeVal, field: NameId, loc: CodeLoc) -> NodeVal {
        operators::perform_oper_member(self, ctx, base, field, loc)
    }

    fn perform_oper_comparison_set_up(&mut self, _ctx: &mut Ctx) -> ComparisonState {
        operators::comparison_set_up()
    }

    fn perform_oper_comparison_step(&mut self, ctx: &mut Ctx, state: &mut ComparisonState, op: Oper, lhs: &NodeVal, rhs: &NodeVal, loc: CodeLoc) {
        operators::comparison_step(self, ctx, state, op, lhs, rhs, loc);
    }

    fn perform_oper_comparison_tear_down(&mut self, _ctx: &mut Ctx, state: ComparisonState, loc: CodeLoc) -> NodeVal {
        operators::comparison_tear_down(self, state, loc)
    }

    fn perform_size_of(&mut self, ctx: &mut Ctx, ty: TypeId) -> u64 {
        value::size_of(ctx, ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orb_common::StringPool;
    use orb_types::Primitive;

    fn loc(ctx: &mut Ctx) -> CodeLoc {
        let file = ctx.strings.add("t.orb");
        CodeLoc::point(file, 0)
    }

    #[test]
    fn zero_value_of_i32_is_a_const_instruction() {
        let mut ctx = Ctx::new();
        let l = loc(&mut ctx);
        let mut compiler = Compiler::new();
        let v = compiler.perform_zero(&mut ctx, TypeId::Primitive(Primitive::I32), l);
        assert!(matches!(v.data, NodeValData::Backend(_)));
        let module = compiler.into_module();
        assert!(module.functions.is_empty());
    }

    #[test]
    fn registering_a_sym_at_global_scope_records_one_global() {
        let mut ctx = Ctx::new();
        let l = loc(&mut ctx);
        let mut compiler = Compiler::new();
        let name = ctx.names.add("counter");
        let ty = TypeId::Primitive(Primitive::I32);
        let zero = compiler.perform_zero(&mut ctx, ty, l);
        let _ = compiler.perform_register(&mut ctx, name, ty, Some(zero), l);
        let module = compiler.into_module();
        assert_eq!(module.globals.len(), 1);
        assert_eq!(module.globals[0].name, name);
    }

    #[test]
    fn regular_add_emits_one_binary_instruction() {
        use orb_ast::{EvalPayload, ScalarVal};
        let mut ctx = Ctx::new();
        let l = loc(&mut ctx);
        let mut compiler = Compiler::new();
        let ty = TypeId::Primitive(Primitive::I32);
        let lhs = NodeVal::eval(ty, EvalPayload::Scalar(ScalarVal::I(1)), l);
        let rhs = NodeVal::eval(ty, EvalPayload::Scalar(ScalarVal::I(2)), l);
        let v = compiler.perform_oper_regular(&mut ctx, Oper::Add, lhs, rhs, l);
        assert!(matches!(v.data, NodeValData::Backend(_)));
    }
}
