//! Nested-scope symbol table: variables, function/macro overload sets,
//! block control, and the drop-function registry (spec.md §3, §4.2).

pub mod block;
pub mod callable;
pub mod table;

pub use block::{Block, LifetimeNestLevel, VarEntry, VarId};
pub use callable::{
    FuncId, FuncValue, MacroCallSite, MacroId, MacroValue, PreHandling, RegisterOutcome,
};
pub use table::{CalleeInfo, SymbolTable};
