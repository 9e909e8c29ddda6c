//! Live stream operators.

mod executed_each;
mod filtered;
mod looped;
mod mapped;
mod single;
mod values;
mod wrapped;

pub(crate) use executed_each::ExecutedEach;
pub(crate) use filtered::Filtered;
pub(crate) use looped::LoopedForward;
pub(crate) use mapped::Mapped;
pub(crate) use single::Single;
pub(crate) use values::Values;
pub(crate) use wrapped::Wrapped;
