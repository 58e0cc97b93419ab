//! Block and variable-entry records (spec.md §3 "SymbolTable").

use orb_ast::{BackendToken, NodeVal};
use orb_common::NameId;
use orb_types::TypeId;

/// A `sym`-declared binding inside some block.
#[derive(Clone, Debug)]
pub struct VarEntry {
    pub name: NameId,
    pub value: NodeVal,
    /// Set when the value was moved out or is otherwise not this block's
    /// to drop (spec.md §4.3/ownership rules).
    pub skip_drop: bool,
}

impl VarEntry {
    #[must_use]
    pub fn new(name: NameId, value: NodeVal) -> Self {
        Self {
            name,
            value,
            skip_drop: false,
        }
    }
}

/// A lexical block, evaluator- or backend-flavored depending on which
/// set of handles is populated (spec.md §3 "Block").
#[derive(Clone, Debug, Default)]
pub struct Block {
    pub name: Option<NameId>,
    pub passing_type: Option<TypeId>,
    pub backend_exit: Option<BackendToken>,
    pub backend_loop: Option<BackendToken>,
    pub backend_phi: Option<BackendToken>,
    pub eval_pass_value: Option<NodeVal>,
}

impl Block {
    #[must_use]
    pub fn is_eval(&self) -> bool {
        self.backend_exit.is_none() && self.backend_loop.is_none() && self.backend_phi.is_none()
    }

    #[must_use]
    pub fn named(name: NameId) -> Self {
        Self {
            name: Some(name),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct BlockInternal {
    pub block: Block,
    pub vars: Vec<VarEntry>,
}

/// A `(callable_depth, block_depth, index)` coordinate into the table's
/// block storage; `callable_depth == 0` means the global chain.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct VarId {
    pub callable_depth: u32,
    pub block_depth: u32,
    pub index: u32,
}

impl From<VarId> for orb_ast::RefTarget {
    fn from(v: VarId) -> Self {
        orb_ast::RefTarget {
            callable_depth: v.callable_depth,
            block_depth: v.block_depth,
            index: v.index,
            path: smallvec::SmallVec::new(),
        }
    }
}

/// `(callable-depth, block-depth)`, used to compare lifetimes without
/// needing a full `VarId` (spec.md §3 "lifetime-nest-level").
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct LifetimeNestLevel {
    pub callable_depth: u32,
    pub block_depth: u32,
}
