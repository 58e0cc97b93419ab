//! The parser's output tree (`Node`) and the processor's universal value
//! type (`NodeVal`), spec.md §3 and §6.

pub mod node;
pub mod value;

pub use node::{LiteralKind, Node, NodeKind};
pub use value::{
    BackendToken, BackendValue, EvalPayload, EvalValue, NodeVal, NodeValData, PathStep,
    RefTarget, ScalarVal, SpecialMarker,
};
