mod catalog;
mod script;
mod template;

pub use catalog::*;
pub use script::*;
pub use template::*;
