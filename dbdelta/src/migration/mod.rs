mod composer;
mod generator;
mod render;
mod settings;
mod sink;
mod template_writer;
mod writer;

pub use composer::*;
pub use generator::*;
pub use render::*;
pub use settings::*;
pub use sink::*;
pub use template_writer::*;
pub use writer::*;
