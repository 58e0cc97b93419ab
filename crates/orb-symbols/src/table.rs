//! The nested-scope symbol table (spec.md §3, §4.2).
//!
//! Grounded on `original_source/src/SymbolTable.h`'s `globalBlockChain` +
//! `localBlockChains` split: one always-active global chain, and a stack
//! of per-callable chains pushed on function/macro entry. Variable
//! lookup walks the active chain innermost-out, then the global chain.

use crate::block::{Block, BlockInternal, LifetimeNestLevel, VarEntry, VarId};
use crate::callable::{
    FuncId, FuncValue, MacroCallSite, MacroId, MacroValue, RegisterOutcome,
};
use orb_ast::NodeVal;
use orb_common::NameId;
use orb_types::{Callable, TypeId, TypeTable};
use rustc_hash::FxHashMap;

#[derive(Clone, Debug, Default)]
pub struct CalleeInfo {
    pub is_func: bool,
    pub is_eval: bool,
    pub is_lower: bool,
    pub ret_type: Option<TypeId>,
}

pub struct SymbolTable {
    funcs: FxHashMap<NameId, Vec<FuncValue>>,
    macros: FxHashMap<NameId, Vec<MacroValue>>,
    global_chain: Vec<BlockInternal>,
    local_chains: Vec<(CalleeInfo, Vec<BlockInternal>)>,
    drop_funcs: FxHashMap<TypeId, NodeVal>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            funcs: FxHashMap::default(),
            macros: FxHashMap::default(),
            global_chain: Vec::new(),
            local_chains: Vec::new(),
            drop_funcs: FxHashMap::default(),
        }
    }

    // ---- block lifecycle ----------------------------------------------

    pub fn enter_callable(&mut self, info: CalleeInfo) {
        self.local_chains.push((info, Vec::new()));
    }

    /// Pops the callable's chain. Panics if blocks remain unpopped —
    /// callers must balance every `push_block` with `pop_block` before
    /// leaving the callable.
    pub fn exit_callable(&mut self) -> CalleeInfo {
        let (info, remaining) = self.local_chains.pop().expect("exit_callable without enter_callable");
        debug_assert!(remaining.is_empty(), "callable chain left with open blocks");
        info
    }

    #[must_use]
    pub fn curr_callee(&self) -> Option<&CalleeInfo> {
        self.local_chains.last().map(|(info, _)| info)
    }

    fn active_chain_mut(&mut self) -> &mut Vec<BlockInternal> {
        match self.local_chains.last_mut() {
            Some((_, chain)) => chain,
            None => &mut self.global_chain,
        }
    }

    fn active_chain(&self) -> &Vec<BlockInternal> {
        match self.local_chains.last() {
            Some((_, chain)) => chain,
            None => &self.global_chain,
        }
    }

    pub fn push_block(&mut self, block: Block) {
        self.active_chain_mut().push(BlockInternal { block, vars: Vec::new() });
    }

    /// Pops the innermost block, returning it plus its variables in
    /// declaration order. Scope-tearing (spec.md §4.2 "destructor MUST
    /// ... drop function ... in reverse declaration order") is the
    /// caller's job: it has the backend/evaluator needed to actually
    /// invoke drop functions, this table only hands back the bookkeeping.
    pub fn pop_block(&mut self) -> (Block, Vec<VarEntry>) {
        let internal = self.active_chain_mut().pop().expect("pop_block without push_block");
        (internal.block, internal.vars)
    }

    #[must_use]
    pub fn in_global_scope(&self) -> bool {
        self.local_chains.is_empty()
    }

    #[must_use]
    pub fn curr_nest_level(&self) -> LifetimeNestLevel {
        LifetimeNestLevel {
            callable_depth: u32::try_from(self.local_chains.len()).unwrap_or(u32::MAX),
            block_depth: u32::try_from(self.active_chain().len()).unwrap_or(u32::MAX).saturating_sub(1),
        }
    }

    #[must_use]
    pub fn get_last_block(&self) -> Option<&Block> {
        self.active_chain().last().map(|b| &b.block)
    }

    #[must_use]
    pub fn get_block(&self, name: NameId) -> Option<&Block> {
        self.active_chain()
            .iter()
            .rev()
            .map(|b| &b.block)
            .find(|b| b.name == Some(name))
    }

    // ---- variables ------------------------------------------------------

    pub fn add_var(&mut self, entry: VarEntry) -> VarId {
        let callable_depth = u32::try_from(self.local_chains.len()).unwrap_or(u32::MAX);
        let chain = self.active_chain_mut();
        let block_depth = u32::try_from(chain.len().saturating_sub(1)).unwrap_or(u32::MAX);
        let block = chain.last_mut().expect("add_var requires an open block");
        let index = u32::try_from(block.vars.len()).unwrap_or(u32::MAX);
        block.vars.push(entry);
        VarId {
            callable_depth,
            block_depth,
            index,
        }
    }

    fn chain_for_depth(&self, callable_depth: u32) -> &Vec<BlockInternal> {
        if callable_depth == 0 {
            &self.global_chain
        } else {
            &self.local_chains[(callable_depth - 1) as usize].1
        }
    }

    fn chain_for_depth_mut(&mut self, callable_depth: u32) -> &mut Vec<BlockInternal> {
        if callable_depth == 0 {
            &mut self.global_chain
        } else {
            &mut self.local_chains[(callable_depth - 1) as usize].1
        }
    }

    #[must_use]
    pub fn get_var(&self, id: VarId) -> &VarEntry {
        &self.chain_for_depth(id.callable_depth)[id.block_depth as usize].vars[id.index as usize]
    }

    pub fn get_var_mut(&mut self, id: VarId) -> &mut VarEntry {
        &mut self.chain_for_depth_mut(id.callable_depth)[id.block_depth as usize].vars[id.index as usize]
    }

    /// Walks the active chain innermost-out, then the global chain,
    /// stopping at the first matching name (spec.md §4.2).
    #[must_use]
    pub fn get_var_id(&self, name: NameId) -> Option<VarId> {
        let callable_depth = u32::try_from(self.local_chains.len()).unwrap_or(u32::MAX);
        if let Some(found) = Self::search_chain(self.active_chain(), callable_depth, name) {
            return Some(found);
        }
        if !self.local_chains.is_empty() {
            return Self::search_chain(&self.global_chain, 0, name);
        }
        None
    }

    fn search_chain(chain: &[BlockInternal], callable_depth: u32, name: NameId) -> Option<VarId> {
        for (block_depth, block) in chain.iter().enumerate().rev() {
            for (index, var) in block.vars.iter().enumerate().rev() {
                if var.name == name {
                    return Some(VarId {
                        callable_depth,
                        block_depth: u32::try_from(block_depth).unwrap_or(u32::MAX),
                        index: u32::try_from(index).unwrap_or(u32::MAX),
                    });
                }
            }
        }
        None
    }

    #[must_use]
    pub fn is_var_name(&self, name: NameId) -> bool {
        self.get_var_id(name).is_some()
    }

    // ---- functions --------------------------------------------------------

    pub fn register_func(
        &mut self,
        val: FuncValue,
        types: &TypeTable,
    ) -> Result<FuncId, RegisterOutcome> {
        if self.macros.contains_key(&val.name) {
            return Err(RegisterOutcome::NameTakenByOtherKind);
        }
        let new_sig = callable_of(val.sig, types);
        let set = self.funcs.entry(val.name).or_default();
        for existing in set.iter() {
            let existing_sig = callable_of(existing.sig, types);
            if sig_collides(existing_sig, new_sig) {
                return Err(if existing_sig.variadic || new_sig.variadic {
                    RegisterOutcome::VariadicCollision
                } else {
                    RegisterOutcome::SignatureCollision
                });
            }
        }
        let index = u32::try_from(set.len()).unwrap_or(u32::MAX);
        let name = val.name;
        set.push(val);
        Ok(FuncId { name, index })
    }

    #[must_use]
    pub fn get_func(&self, id: FuncId) -> &FuncValue {
        &self.funcs[&id.name][id.index as usize]
    }

    pub fn get_func_mut(&mut self, id: FuncId) -> &mut FuncValue {
        &mut self.funcs.get_mut(&id.name).unwrap()[id.index as usize]
    }

    #[must_use]
    pub fn is_func_name(&self, name: NameId) -> bool {
        self.funcs.contains_key(&name)
    }

    #[must_use]
    pub fn func_ids(&self, name: NameId) -> Vec<FuncId> {
        match self.funcs.get(&name) {
            Some(set) => (0..set.len())
                .map(|i| FuncId {
                    name,
                    index: u32::try_from(i).unwrap_or(u32::MAX),
                })
                .collect(),
            None => Vec::new(),
        }
    }

    // ---- macros -------------------------------------------------------

    pub fn register_macro(&mut self, val: MacroValue) -> Result<MacroId, RegisterOutcome> {
        if self.funcs.contains_key(&val.name) {
            return Err(RegisterOutcome::NameTakenByOtherKind);
        }
        let set = self.macros.entry(val.name).or_default();
        for existing in set.iter() {
            if macro_collides(existing, &val) {
                return Err(if existing.variadic || val.variadic {
                    RegisterOutcome::VariadicCollision
                } else {
                    RegisterOutcome::SignatureCollision
                });
            }
        }
        let index = u32::try_from(set.len()).unwrap_or(u32::MAX);
        let name = val.name;
        set.push(val);
        Ok(MacroId { name, index })
    }

    #[must_use]
    pub fn get_macro(&self, id: MacroId) -> &MacroValue {
        &self.macros[&id.name][id.index as usize]
    }

    #[must_use]
    pub fn is_macro_name(&self, name: NameId) -> bool {
        self.macros.contains_key(&name)
    }

    #[must_use]
    pub fn get_macro_id(&self, call: MacroCallSite) -> Option<MacroId> {
        let set = self.macros.get(&call.name)?;
        for (index, m) in set.iter().enumerate() {
            let matches = if m.variadic {
                call.arg_count >= m.fixed_arg_count
            } else {
                call.arg_count == m.fixed_arg_count
            };
            if matches {
                return Some(MacroId {
                    name: call.name,
                    index: u32::try_from(index).unwrap_or(u32::MAX),
                });
            }
        }
        None
    }

    // ---- drop functions -------------------------------------------------

    pub fn register_drop_func(&mut self, ty: TypeId, func: NodeVal) {
        self.drop_funcs.insert(ty, func);
    }

    #[must_use]
    pub fn get_drop_func(&self, ty: TypeId) -> Option<&NodeVal> {
        self.drop_funcs.get(&ty)
    }

    #[must_use]
    pub fn name_available(&self, name: NameId) -> bool {
        !self.is_func_name(name) && !self.is_macro_name(name) && !self.is_var_name(name)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

fn callable_of(sig: TypeId, types: &TypeTable) -> &Callable {
    match sig {
        TypeId::Callable(idx) => types.get_callable(idx),
        _ => panic!("FuncValue/MacroValue signature must be a Callable TypeId"),
    }
}

fn sig_collides(a: &Callable, b: &Callable) -> bool {
    if a.arg_types == b.arg_types {
        return true;
    }
    if a.variadic || b.variadic {
        let (variadic, fixed) = if a.variadic { (a, b) } else { (b, a) };
        return fixed.arg_types.len() >= variadic.arg_types.len().saturating_sub(1);
    }
    false
}

fn macro_collides(a: &crate::callable::MacroValue, b: &crate::callable::MacroValue) -> bool {
    if a.variadic || b.variadic {
        let (variadic, fixed) = if a.variadic { (a, b) } else { (b, a) };
        fixed.fixed_arg_count >= variadic.fixed_arg_count
    } else {
        a.fixed_arg_count == b.fixed_arg_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use orb_common::NamePool;
    use orb_types::Primitive;
    use smallvec::smallvec;

    fn dummy_val() -> NodeVal {
        let mut strings = orb_common::StringPool::new();
        let f = strings.add("t.orb");
        NodeVal::eval(
            TypeId::Primitive(Primitive::I32),
            orb_ast::EvalPayload::Scalar(orb_ast::ScalarVal::I(0)),
            orb_common::CodeLoc::point(f, 0),
        )
    }

    #[test]
    fn variable_lookup_prefers_innermost_block() {
        let mut names = NamePool::new();
        let mut table = SymbolTable::new();
        let x = names.add("x");

        table.push_block(Block::default());
        table.add_var(VarEntry::new(x, dummy_val()));
        table.push_block(Block::default());
        let inner_id = table.add_var(VarEntry::new(x, dummy_val()));

        let found = table.get_var_id(x).unwrap();
        assert_eq!(found, inner_id);

        table.pop_block();
        let outer_found = table.get_var_id(x).unwrap();
        assert_ne!(outer_found, inner_id);
    }

    #[test]
    fn callable_chain_falls_through_to_global() {
        let mut names = NamePool::new();
        let mut table = SymbolTable::new();
        let g = names.add("g");

        table.push_block(Block::default());
        table.add_var(VarEntry::new(g, dummy_val()));

        table.enter_callable(CalleeInfo::default());
        table.push_block(Block::default());
        assert!(table.is_var_name(g));
        table.pop_block();
        table.exit_callable();
    }

    #[test]
    fn macro_variadic_collides_with_shorter_fixed_arity() {
        let mut names = NamePool::new();
        let mut types = TypeTable::new();
        let mut table = SymbolTable::new();
        let name = names.add("m");
        let sig = types.add_callable(Callable {
            is_func: false,
            arg_types: smallvec![],
            ret_type: None,
            variadic: true,
        });

        let fixed = MacroValue {
            name,
            arg_names: smallvec![],
            arg_pre_handling: smallvec![],
            fixed_arg_count: 1,
            variadic: false,
            sig,
        };
        table.register_macro(fixed).unwrap();

        let variadic = MacroValue {
            name,
            arg_names: smallvec![],
            arg_pre_handling: smallvec![],
            fixed_arg_count: 0,
            variadic: true,
            sig,
        };
        assert_eq!(
            table.register_macro(variadic),
            Err(RegisterOutcome::VariadicCollision)
        );
    }
}
