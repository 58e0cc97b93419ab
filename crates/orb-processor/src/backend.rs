//! The capability interface `Evaluator` and `Compiler` both implement
//! (spec.md §6 "Backend contract", §9 "capability interface" redesign
//! note).
//!
//! Grounded on `original_source/include/Processor.h`'s abstract
//! `IProcessorBackend` base class, re-expressed as a plain trait rather
//! than virtual dispatch through a base class — object-safe, so the
//! processor can hold it as `&mut dyn Backend` and switch between the
//! evaluator and the compiler per spec.md §4.6's call-site rule without
//! either backend needing a reference back to the other.

use crate::ctx::Ctx;
use orb_ast::Node;
use orb_common::reserved::Oper;
use orb_common::{CodeLoc, NameId};
use orb_symbols::{FuncId, MacroId, VarId};
use orb_types::TypeId;

/// What `performLoad` is asked to load (spec.md §6 `performLoad(var|func|macro)`).
#[derive(Clone, Copy, Debug)]
pub enum LoadTarget {
    Var(VarId),
    FuncSet(NameId),
    MacroSet(NameId),
}

/// Accumulator threaded through one `==`/`!=`/`<`/... comparison chain
/// (spec.md §4.5 "variadic chain... short-circuits on first failure").
/// Plain enough to serve both the evaluator (folds booleans) and the
/// compiler (would thread backend branch/phi tokens in a real backend).
#[derive(Debug, Default)]
pub struct ComparisonState {
    pub short_circuited: bool,
    pub result: bool,
}

/// The backend capability set a `Processor` drives (spec.md §6).
pub trait Backend {
    fn is_evaluator(&self) -> bool;

    fn perform_load(&mut self, ctx: &mut Ctx, target: LoadTarget, loc: CodeLoc) -> orb_ast::NodeVal;
    fn perform_zero(&mut self, ctx: &mut Ctx, ty: TypeId, loc: CodeLoc) -> orb_ast::NodeVal;
    fn perform_register(
        &mut self,
        ctx: &mut Ctx,
        name: NameId,
        ty: TypeId,
        init: Option<orb_ast::NodeVal>,
        loc: CodeLoc,
    ) -> orb_ast::NodeVal;
    fn perform_cast(
        &mut self,
        ctx: &mut Ctx,
        val: orb_ast::NodeVal,
        ty: TypeId,
        explicit: bool,
        loc: CodeLoc,
    ) -> orb_ast::NodeVal;

    fn perform_block_set_up(&mut self, ctx: &mut Ctx, block: &orb_symbols::Block) -> bool;
    fn perform_block_tear_down(&mut self, ctx: &mut Ctx, block: &orb_symbols::Block, success: bool) -> bool;

    fn perform_exit(&mut self, ctx: &mut Ctx, block_name: Option<NameId>, loc: CodeLoc) -> bool;
    fn perform_loop(&mut self, ctx: &mut Ctx, block_name: Option<NameId>, loc: CodeLoc) -> bool;
    fn perform_pass(
        &mut self,
        ctx: &mut Ctx,
        block_name: Option<NameId>,
        val: orb_ast::NodeVal,
        loc: CodeLoc,
    ) -> bool;

    fn perform_data_definition(&mut self, ctx: &mut Ctx, ty: TypeId) -> bool;

    fn perform_call(
        &mut self,
        ctx: &mut Ctx,
        func: FuncId,
        args: Vec<orb_ast::NodeVal>,
        loc: CodeLoc,
    ) -> orb_ast::NodeVal;
    /// The backend always delegates invocation to the evaluator: macros
    /// are a purely syntactic transform (spec.md §6 `performInvoke`
    /// comment "backend delegates to evaluator").
    fn perform_invoke(
        &mut self,
        ctx: &mut Ctx,
        mac: MacroId,
        args: Vec<Node>,
        loc: CodeLoc,
    ) -> orb_ast::NodeVal;

    fn perform_function_declaration(&mut self, ctx: &mut Ctx, func: FuncId) -> bool;
    fn perform_function_definition(&mut self, ctx: &mut Ctx, func: FuncId, body: &Node) -> bool;
    fn perform_macro_definition(&mut self, ctx: &mut Ctx, mac: MacroId) -> bool;

    fn perform_ret(&mut self, ctx: &mut Ctx, val: Option<orb_ast::NodeVal>, loc: CodeLoc) -> bool;

    fn perform_oper_unary(&mut self, ctx: &mut Ctx, op: Oper, val: orb_ast::NodeVal, loc: CodeLoc) -> orb_ast::NodeVal;
    fn perform_oper_regular(
        &mut self,
        ctx: &mut Ctx,
        op: Oper,
        lhs: orb_ast::NodeVal,
        rhs: orb_ast::NodeVal,
        loc: CodeLoc,
    ) -> orb_ast::NodeVal;
    fn perform_oper_assignment(
        &mut self,
        ctx: &mut Ctx,
        lhs: orb_ast::NodeVal,
        rhs: orb_ast::NodeVal,
        loc: CodeLoc,
    ) -> orb_ast::NodeVal;
    fn perform_oper_index(
        &mut self,
        ctx: &mut Ctx,
        base: orb_ast::NodeVal,
        index: orb_ast::NodeVal,
        loc: CodeLoc,
    ) -> orb_ast::NodeVal;
    fn perform_oper_member(
        &mut self,
        ctx: &mut Ctx,
        base: orb_ast::NodeVal,
        field: NameId,
        loc: CodeLoc,
    ) -> orb_ast::NodeVal;

    fn perform_oper_comparison_set_up(&mut self, ctx: &mut Ctx) -> ComparisonState;
    fn perform_oper_comparison_step(
        &mut self,
        ctx: &mut Ctx,
        state: &mut ComparisonState,
        op: Oper,
        lhs: &orb_ast::NodeVal,
        rhs: &orb_ast::NodeVal,
        loc: CodeLoc,
    );
    fn perform_oper_comparison_tear_down(&mut self, ctx: &mut Ctx, state: ComparisonState, loc: CodeLoc) -> orb_ast::NodeVal;

    fn perform_size_of(&mut self, ctx: &mut Ctx, ty: TypeId) -> u64;
}
