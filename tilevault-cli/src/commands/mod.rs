//! Command implementations.

mod fetch;
mod locate;
mod sources;

pub use fetch::handle_fetch;
pub use locate::handle_locate;
pub use sources::handle_sources;
