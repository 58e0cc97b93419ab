//! Function and macro overload-set entries (spec.md §4.2, §4.6).

use orb_common::NameId;
use orb_types::TypeId;
use smallvec::SmallVec;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FuncId {
    pub name: NameId,
    pub index: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct MacroId {
    pub name: NameId,
    pub index: u32,
}

#[derive(Clone, Debug)]
pub struct FuncValue {
    pub name: NameId,
    pub arg_names: SmallVec<[NameId; 4]>,
    /// A `TypeId::Callable` with `is_func == true`.
    pub sig: TypeId,
    pub defined: bool,
    pub no_name_mangle: bool,
    /// Has an `evaluable` body the evaluator can run at compile time.
    pub evaluable: bool,
    /// Has a `compiled` body the backend can lower.
    pub compiled: bool,
}

/// How a macro argument is substituted into the macro body before the
/// body is re-processed (spec.md §4.4). `Preprocess` and `PlusEscape`
/// are mutually exclusive per argument (enforced at registration).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PreHandling {
    Regular,
    Preprocess,
    PlusEscape,
}

impl PreHandling {
    /// The escape-score delta applied to a substituted argument value
    /// (spec.md §4.4: regular=1, preprocess=0, plus-escape=2).
    #[must_use]
    pub fn escape_score(self) -> u32 {
        match self {
            PreHandling::Regular => 1,
            PreHandling::Preprocess => 0,
            PreHandling::PlusEscape => 2,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MacroValue {
    pub name: NameId,
    pub arg_names: SmallVec<[NameId; 4]>,
    pub arg_pre_handling: SmallVec<[PreHandling; 4]>,
    /// Number of named arguments before the variadic tail, or the total
    /// argument count when `variadic` is false.
    pub fixed_arg_count: u32,
    pub variadic: bool,
    /// A `TypeId::Callable` with `is_func == false`.
    pub sig: TypeId,
}

#[derive(Clone, Copy, Debug)]
pub struct MacroCallSite {
    pub name: NameId,
    pub arg_count: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RegisterOutcome {
    NameTakenByOtherKind,
    SignatureCollision,
    VariadicCollision,
}
