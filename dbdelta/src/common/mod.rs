mod constants;
mod context;

pub use constants::*;
pub use context::*;
