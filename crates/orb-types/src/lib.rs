//! The canonical type registry: structural equality, decorator/constness
//! rules, implicit-cast and literal-fit predicates (spec.md §3, §4.1).

pub mod descr;
pub mod primitive;
pub mod table;

pub use descr::{Callable, DataMember, DataType, Decor, NamedCustom, Tuple, TypeDescr, TypeId};
pub use primitive::Primitive;
pub use table::{TypeError, TypeTable};
