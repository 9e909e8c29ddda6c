//! Warm cell operators.

mod held;
mod mapped;
mod mapped2;
mod mapped_at;
mod switched;

pub(crate) use held::Held;
pub(crate) use mapped::Mapped;
pub(crate) use mapped2::Mapped2;
pub(crate) use mapped_at::MappedAt;
pub(crate) use switched::Switched;
