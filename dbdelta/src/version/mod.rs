mod lexical;
mod resolver;
mod scheme;
mod semver1;
mod standard;
mod version;

pub use lexical::*;
pub use resolver::*;
pub use scheme::*;
pub use semver1::*;
pub use standard::*;
pub use version::*;
