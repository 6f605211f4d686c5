mod dedup;
mod globber;
mod globber_builder;
mod state;
mod types;
mod visitor;

pub use globber::{GlobHandle, Globber};
pub use globber_builder::GlobberBuilder;
pub use state::GlobOutcome;
pub use types::DirFilter;
