mod context;
mod thread;

pub use context::*;
pub use thread::*;
