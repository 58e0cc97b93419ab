//! The tree-walking compile-time interpreter: a [`Backend`] that runs
//! evaluable code directly against [`Ctx`] instead of lowering it.
//!
//! Grounded on `original_source/src/Evaluator.cpp`, adapted to the
//! split where `orb-processor` owns every bit of control flow that
//! needs to walk the AST itself (blocks, calls, macro invocation) —
//! `Backend` methods only ever see one node's worth of work at a time,
//! so anything the original did by recursing back into the processor
//! (`performCall`'s body walk, `performInvoke`'s substitution-and-
//! reprocess) now lives in `orb-processor` (`calls::invoke`,
//! `macros::dispatch_invoke`) and calls into this backend only for the
//! pieces that really are single-node operations.

mod operators;
mod value;

use orb_ast::{Node, NodeVal, NodeValData, SpecialMarker};
use orb_common::reserved::Oper;
use orb_common::{CodeLoc, DiagKind, NameId};
use orb_processor::{Backend, ComparisonState, Ctx, LoadTarget};
use orb_symbols::{FuncId, MacroId};
use orb_types::TypeId;

/// Stateless: every piece of state a running program needs already
/// lives in [`Ctx`] (the symbol table's blocks, `func_bodies`, etc.).
#[derive(Default)]
pub struct Evaluator;

impl Backend for Evaluator {
    fn is_evaluator(&self) -> bool {
        true
    }

    fn perform_load(&mut self, ctx: &mut Ctx, target: LoadTarget, loc: CodeLoc) -> NodeVal {
        match target {
            LoadTarget::Var(id) => {
                let mut val = ctx.symbols.get_var(id).value.clone();
                if let NodeValData::Eval(ev) = &mut val.data {
                    ev.reference = Some(id.into());
                }
                val.loc = loc;
                val
            }
            LoadTarget::FuncSet(name) => NodeVal::new(NodeValData::Special(SpecialMarker::FuncSet(name)), loc),
            LoadTarget::MacroSet(name) => NodeVal::new(NodeValData::Special(SpecialMarker::MacroSet(name)), loc),
        }
    }

    fn perform_zero(&mut self, ctx: &mut Ctx, ty: TypeId, loc: CodeLoc) -> NodeVal {
        value::zero_value(ctx, ty, loc)
    }

    fn perform_register(&mut self, ctx: &mut Ctx, _name: NameId, ty: TypeId, init: Option<NodeVal>, loc: CodeLoc) -> NodeVal {
        match init {
            Some(v) => strip_ref_copy(ctx, v, ty, loc),
            None => value::zero_value(ctx, ty, loc),
        }
    }

    fn perform_cast(&mut self, ctx: &mut Ctx, val: NodeVal, ty: TypeId, _explicit: bool, loc: CodeLoc) -> NodeVal {
        match value::make_cast(ctx, &val, ty, loc) {
            Some(v) => v,
            None => {
                ctx.messages.raise(
                    loc,
                    DiagKind::Internal {
                        detail: "could not construct a value for an already-validated cast".to_string(),
                    },
                );
                NodeVal::invalid(loc)
            }
        }
    }

    fn perform_block_set_up(&mut self, _ctx: &mut Ctx, _block: &orb_symbols::Block) -> bool {
        true
    }

    fn perform_block_tear_down(&mut self, _ctx: &mut Ctx, _block: &orb_symbols::Block, _success: bool) -> bool {
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

    /// `orb-processor::calls::invoke` re-runs an `evaluable` overload's
    /// body directly and only falls through to `Backend::perform_call`
    /// for a `compiled` overload, which flips `p.compiling = true`
    /// immediately before the call — so `p.active()` always resolves to
    /// the compiler backend there, never this one.
    fn perform_call(&mut self, _ctx: &mut Ctx, _func: FuncId, _args: Vec<NodeVal>, _loc: CodeLoc) -> NodeVal {
        unreachable!("a compiled function is only ever invoked through the compiler backend")
    }

    /// Macro invocation is a purely syntactic substitute-and-reprocess
    /// transform that `orb-processor::macros::dispatch_invoke` performs
    /// directly against `ctx.macro_bodies`; no caller anywhere holds a
    /// `MacroId` to hand to a `Backend`.
    fn perform_invoke(&mut self, _ctx: &mut Ctx, _mac: MacroId, _args: Vec<Node>, _loc: CodeLoc) -> NodeVal {
        unreachable!("macro invocation is substituted and re-processed by the caller, never handed to a backend")
    }

    fn perform_function_declaration(&mut self, _ctx: &mut Ctx, _func: FuncId) -> bool {
        true
    }

    /// Body storage for re-execution already happened in
    /// `orb-processor::calls::perform_fnc` (`ctx.func_bodies`); nothing
    /// left for the backend to record.
    fn perform_function_definition(&mut self, _ctx: &mut Ctx, _func: FuncId, _body: &Node) -> bool {
        true
    }

    fn perform_macro_definition(&mut self, _ctx: &mut Ctx, _mac: MacroId) -> bool {
        true
    }

    fn perform_ret(&mut self, _ctx: &mut Ctx, _val: Option<NodeVal>, _loc: CodeLoc) -> bool {
        true
    }

    fn perform_oper_unary(&mut self, ctx: &mut Ctx, op: Oper, val: NodeVal, loc: CodeLoc) -> NodeVal {
        operators::perform_oper_unary(ctx, op, val, loc)
    }

    fn perform_oper_regular(&mut self, ctx: &mut Ctx, op: Oper, lhs: NodeVal, rhs: NodeVal, loc: CodeLoc) -> NodeVal {
        operators::perform_oper_regular(ctx, op, lhs, rhs, loc)
    }

    fn perform_oper_assignment(&mut self, ctx: &mut Ctx, lhs: NodeVal, rhs: NodeVal, loc: CodeLoc) -> NodeVal {
        operators::perform_oper_assignment(ctx, lhs, rhs, loc)
    }

    fn perform_oper_index(&mut self, _ctx: &mut Ctx, base: NodeVal, index: NodeVal, loc: CodeLoc) -> NodeVal {
        operators::perform_oper_index(base, index, loc)
    }

    fn perform_oper_member(&mut self, ctx: &mut Ctx, base: NodeVal, field: NameId, loc: CodeLoc) -> NodeVal {
        operators::perform_oper_member(ctx, base, field, loc)
    }

    fn perform_oper_comparison_set_up(&mut self, _ctx: &mut Ctx) -> ComparisonState {
        operators::comparison_set_up()
    }

    fn perform_oper_comparison_step(&mut self, ctx: &mut Ctx, state: &mut ComparisonState, op: Oper, lhs: &NodeVal, rhs: &NodeVal, loc: CodeLoc) {
        operators::comparison_step(ctx, state, op, lhs, rhs, loc);
    }

    fn perform_oper_comparison_tear_down(&mut self, _ctx: &mut Ctx, state: ComparisonState, loc: CodeLoc) -> NodeVal {
        operators::comparison_tear_down(state, loc)
    }

    fn perform_size_of(&mut self, ctx: &mut Ctx, ty: TypeId) -> u64 {
        value::size_of(ctx, ty)
    }
}

fn strip_ref_copy(ctx: &mut Ctx, v: NodeVal, ty: TypeId, loc: CodeLoc) -> NodeVal {
    match &v.data {
        NodeValData::Eval(ev) if ev.ty == ty => NodeVal::eval(ty, ev.payload.clone(), loc),
        NodeValData::Eval(_) => value::make_cast(ctx, &v, ty, loc).unwrap_or_else(|| NodeVal::invalid(loc)),
        _ => NodeVal::invalid(loc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orb_ast::{EvalPayload, ScalarVal};
    use orb_common::StringPool;
    use orb_types::Primitive;

    fn loc(ctx: &mut Ctx) -> CodeLoc {
        let file = ctx.strings.add("t.orb");
        CodeLoc::point(file, 0)
    }

    #[test]
    fn zero_value_of_i32_is_zero() {
        let mut ctx = Ctx::new();
        let l = loc(&mut ctx);
        let mut ev = Evaluator;
        let v = ev.perform_zero(&mut ctx, TypeId::Primitive(Primitive::I32), l);
        match v.data {
            NodeValData::Eval(e) => assert!(matches!(e.payload, EvalPayload::Scalar(ScalarVal::I(0)))),
            _ => panic!("expected eval value"),
        }
    }

    #[test]
    fn zero_value_of_str_is_null_pointer() {
        let mut ctx = Ctx::new();
        let l = loc(&mut ctx);
        let mut ev = Evaluator;
        let str_ty = ctx.types.str_type();
        let v = ev.perform_zero(&mut ctx, str_ty, l);
        match v.data {
            NodeValData::Eval(e) => assert!(matches!(e.payload, EvalPayload::Scalar(ScalarVal::Ptr(0)))),
            _ => panic!("expected eval value"),
        }
    }

    #[test]
    fn unary_sub_negates_signed_integer() {
        let mut ctx = Ctx::new();
        let l = loc(&mut ctx);
        let mut ev = Evaluator;
        let five = NodeVal::eval(TypeId::Primitive(Primitive::I32), EvalPayload::Scalar(ScalarVal::I(5)), l);
        let v = ev.perform_oper_unary(&mut ctx, Oper::Sub, five, l);
        match v.data {
            NodeValData::Eval(e) => assert!(matches!(e.payload, EvalPayload::Scalar(ScalarVal::I(-5)))),
            _ => panic!("expected eval value"),
        }
    }

    #[test]
    fn regular_add_wraps_within_destination_width() {
        let mut ctx = Ctx::new();
        let l = loc(&mut ctx);
        let mut ev = Evaluator;
        let ty = TypeId::Primitive(Primitive::I8);
        let lhs = NodeVal::eval(ty, EvalPayload::Scalar(ScalarVal::I(120)), l);
        let rhs = NodeVal::eval(ty, EvalPayload::Scalar(ScalarVal::I(10)), l);
        let v = ev.perform_oper_regular(&mut ctx, Oper::Add, lhs, rhs, l);
        match v.data {
            NodeValData::Eval(e) => assert!(matches!(e.payload, EvalPayload::Scalar(ScalarVal::I(-126)))),
            _ => panic!("expected eval value"),
        }
    }

    #[test]
    fn comparison_chain_short_circuits_on_first_mismatch() {
        let mut ctx = Ctx::new();
        let l = loc(&mut ctx);
        let mut ev = Evaluator;
        let ty = TypeId::Primitive(Primitive::I32);
        let a = NodeVal::eval(ty, EvalPayload::Scalar(ScalarVal::I(1)), l);
        let b = NodeVal::eval(ty, EvalPayload::Scalar(ScalarVal::I(2)), l);
        let mut state = ev.perform_oper_comparison_set_up(&mut ctx);
        ev.perform_oper_comparison_step(&mut ctx, &mut state, Oper::Eq, &a, &b, l);
        assert!(state.short_circuited);
        let result = ev.perform_oper_comparison_tear_down(&mut ctx, state, l);
        match result.data {
            NodeValData::Eval(e) => assert!(matches!(e.payload, EvalPayload::Scalar(ScalarVal::Bool(false)))),
            _ => panic!("expected eval value"),
        }
    }
}
