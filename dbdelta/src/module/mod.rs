mod module;
mod registry;

pub use module::*;
pub use registry::*;
