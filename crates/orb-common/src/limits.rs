//! Centralized compiler limits (spec.md carries no explicit numbers here;
//! these are conservative ambient guards against pathological input,
//! matching the teacher's `tsz-common::limits` role).

/// Maximum nesting depth of blocks within one callable before the
/// processor gives up with an internal diagnostic rather than overflow
/// the native call stack during recursive `process_node`.
pub const MAX_BLOCK_NEST_DEPTH: usize = 4096;

/// Maximum number of decorator layers (`pointer`/`array`/`array-pointer`)
/// a single type descriptor may carry.
pub const MAX_TYPE_DECORATORS: usize = 64;

/// Maximum macro re-expansion chain length before
/// `errorInternal` ("macro expansion did not converge") fires.
pub const MAX_MACRO_EXPANSION_DEPTH: usize = 256;
