//! Per-compilation state bundle, owned by the orchestrator and borrowed
//! by every processor/backend call (spec.md §9 "Global processor state").

use orb_ast::Node;
use orb_common::{CompilationMessages, NameId, NamePool, ReservedTables, StringPool};
use orb_symbols::{FuncId, MacroId, SymbolTable};
use orb_types::{Primitive, TypeTable};
use rustc_hash::FxHashMap;

pub struct Ctx {
    pub names: NamePool,
    pub strings: StringPool,
    pub types: TypeTable,
    pub symbols: SymbolTable,
    pub messages: CompilationMessages,
    pub reserved: ReservedTables,
    /// Interned spellings of the fixed primitive set, so leaf/type-name
    /// resolution can recognize `i32`, `bool`, etc. without re-interning.
    pub primitive_names: FxHashMap<NameId, Primitive>,
    /// Unprocessed macro bodies, kept alongside the symbol table's
    /// `MacroValue` (which records only the signature) so invocation can
    /// rebuild a substituted copy of the original tree.
    pub macro_bodies: FxHashMap<MacroId, Node>,
    /// Unprocessed function bodies for `evaluable` overloads, kept
    /// alongside `FuncValue` (which records only the signature) so the
    /// evaluator can re-run a fresh copy of the body per call, bound to
    /// that call's actual arguments, instead of the single
    /// zero-initialized pass `fnc` itself runs to validate the body once.
    pub func_bodies: FxHashMap<FuncId, Node>,
}

impl Ctx {
    #[must_use]
    pub fn new() -> Self {
        let mut names = NamePool::new();
        let reserved = ReservedTables::build(&mut names);
        let primitive_names = Primitive::ALL
            .iter()
            .map(|&p| (names.add(p.name()), p))
            .collect();
        Self {
            names,
            strings: StringPool::new(),
            types: TypeTable::new(),
            symbols: SymbolTable::new(),
            messages: CompilationMessages::new(),
            reserved,
            primitive_names,
            macro_bodies: FxHashMap::default(),
            func_bodies: FxHashMap::default(),
        }
    }
}

impl Default for Ctx {
    fn default() -> Self {
        Self::new()
    }
}
