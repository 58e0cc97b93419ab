//! Shared processing core: the `Backend` contract, `process_node`
//! dispatch, coercion, and the keyword-form handlers that plug into it
//! (spec.md §4, §6). Neither `orb-eval` nor `orb-backend` re-implement
//! dispatch; they only supply a `Backend` impl for [`Processor`] to
//! drive.

pub mod backend;
pub mod blocks;
pub mod calls;
pub mod coerce;
pub mod ctx;
pub mod dispatch;
pub mod macros;
pub mod operators;

pub use backend::{Backend, ComparisonState, LoadTarget};
pub use blocks::{Skip, SkipKind};
pub use ctx::Ctx;
pub use dispatch::Processor;
