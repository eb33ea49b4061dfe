mod codegen;
mod names;
mod runtime;

pub use codegen::*;
pub use names::*;
pub use runtime::*;
