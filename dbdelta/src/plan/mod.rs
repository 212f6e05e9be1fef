mod ordering;

pub use ordering::*;
