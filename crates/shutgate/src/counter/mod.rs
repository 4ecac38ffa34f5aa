mod atomic;
mod guard;

pub use atomic::*;
pub use guard::*;
