//! Builtin stages.

mod contains;
mod cut;
mod func;
mod grep;
mod head;
mod nl;
mod replace;
mod rev;
mod sed;
mod skip;
mod sort;
mod tac;
mod tail;
mod tee;
mod tr;
mod uniq;
mod wc;

pub use contains::Contains;
pub use cut::Cut;
pub use func::{Filter, Map};
pub use grep::Grep;
pub use head::Head;
pub use nl::Nl;
pub use replace::Replace;
pub use rev::Rev;
pub use sed::Sed;
pub use skip::Skip;
pub use sort::Sort;
pub use tac::Tac;
pub use tail::Tail;
pub use tee::Tee;
pub use tr::Tr;
pub use uniq::Uniq;
pub use wc::Wc;

/// Count used by head and tail when none (or zero) is given.
pub const DEFAULT_COUNT: usize = 10;
