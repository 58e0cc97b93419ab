//! The native IR the compiler backend lowers into: functions built from
//! a flat list of typed, SSA-ish instructions addressed by
//! [`BackendToken`], plus the module that collects them.
//!
//! Grounded on `original_source/src/Codegen.h`'s `llvmContext`/
//! `llvmBuilder`/`llvmModule` triple and `include/LlvmVal.h`'s
//! `LlvmVal{type, val, ref}` handle: a value's token is its loaded
//! content, its `ref` is the address that produced it, exactly as
//! `Codegen_expr.cpp`'s `codegenVar`/`codegenOperInd`/`codegenOperDot`
//! use them. Real machine-code emission is out of scope (spec.md §1
//! "native code-emitter binding"); this module stops at the serialized
//! instruction list a real backend would consume next, the same
//! boundary `tsz-emitter`'s `emit_context.rs` draws between building an
//! AST-shaped intermediate form and actually printing JS text.

use orb_ast::{BackendToken, ScalarVal};
use orb_common::NameId;
use orb_common::reserved::Oper;
use orb_types::TypeId;

/// One instruction. Each instruction the compiler emits is handed a
/// fresh [`BackendToken`] by its caller at emission time (a monotonic
/// counter, not the instruction's position — a global's init list and a
/// function's body both draw from the same counter so a token is never
/// ambiguous between them).
#[derive(Clone, Debug)]
pub enum Instr {
    /// A folded compile-time constant reaching the backend unchanged
    /// (e.g. a literal operand of an otherwise-runtime expression).
    Const(ScalarVal),
    /// Reserves stack storage for `ty`; the result token is this slot's
    /// address (`codegenArr`/`codegenTuple`/`processSym`'s alloca).
    Alloca(TypeId),
    /// Reads the value currently held at `ptr` (`codegenVar`'s
    /// `CreateLoad`).
    Load(BackendToken),
    /// Writes `val` to `ptr`; produces no usable value of its own.
    Store { ptr: BackendToken, val: BackendToken },
    /// Addresses one element of the array/pointer at `base`
    /// (`codegenOperInd`'s `CreateGEP`).
    IndexGep { base: BackendToken, index: BackendToken },
    /// Addresses the `field`-th member of the tuple/data value at
    /// `base` (`codegenOperDot`'s `CreateStructGEP`).
    FieldGep { base: BackendToken, field: u32 },
    Unary { op: Oper, val: BackendToken },
    Binary { op: Oper, lhs: BackendToken, rhs: BackendToken },
    Cast { val: BackendToken, to: TypeId },
    /// A direct call to a declared function, addressed by its index
    /// into the owning [`IrModule`]'s `functions` (`codegenCall`'s
    /// `CreateCall`, resolved there through `getFuncForCall`'s overload
    /// pick rather than by bare name); the result token is the returned
    /// value, ignored by callers of a `void`-returning function.
    Call { func: usize, args: Vec<BackendToken> },
    /// Folds a chained comparison's (`a < b < c`) per-step booleans into
    /// one result with logical AND, mirroring `codegenOper`'s
    /// short-circuiting `CreateAnd` chain for variadic comparisons.
    ComparisonJoin { steps: Vec<BackendToken> },
}

/// One declared or defined function.
#[derive(Clone, Debug)]
pub struct IrFunction {
    pub name: NameId,
    pub params: Vec<(NameId, TypeId)>,
    pub ret_type: Option<TypeId>,
    pub no_name_mangle: bool,
    /// `false` until `perform_function_definition` lowers a body.
    pub defined: bool,
    pub body: Vec<Instr>,
}

impl IrFunction {
    #[must_use]
    pub fn declaration(name: NameId, params: Vec<(NameId, TypeId)>, ret_type: Option<TypeId>, no_name_mangle: bool) -> Self {
        Self {
            name,
            params,
            ret_type,
            no_name_mangle,
            defined: false,
            body: Vec::new(),
        }
    }
}

/// One module-scope `sym`, lowered as a global rather than living on
/// some function's stack (`Codegen_impl.cpp`'s `processSym` global-scope
/// branch). `init` still materializes through the same `Alloca`/`Store`/
/// `Load` sequence a local variable gets — this IR has no separate
/// `GlobalVariable` instruction kind — it is just collected into its own
/// list instead of a function body.
#[derive(Clone, Debug)]
pub struct IrGlobal {
    pub name: NameId,
    pub ty: TypeId,
    pub init: Vec<Instr>,
}

/// The complete lowering output: every function and global the source
/// defined, each as a flat instruction list rather than a real
/// basic-block graph — `orb-processor`'s own `blocks`/`calls` modules
/// already decide which branches of a program actually run (spec.md §4
/// compile-time `exit`/`loop` condition folding), so this IR only needs
/// to record what those decisions produced, not re-derive them with real
/// conditional branches the way `Codegen_impl.cpp`'s `handleExit`/
/// `handleLoop` do against a live LLVM `BasicBlock` graph.
#[derive(Clone, Debug, Default)]
pub struct IrModule {
    pub functions: Vec<IrFunction>,
    pub globals: Vec<IrGlobal>,
}

impl IrModule {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
