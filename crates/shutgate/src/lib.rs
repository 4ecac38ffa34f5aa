#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod counter;
mod error;
#[cfg(feature = "futures")]
mod futures;
mod gate;
mod runtime;
mod status;
mod worker;

pub use crate::counter::*;
pub use crate::error::*;
#[cfg(feature = "futures")]
pub use crate::futures::*;
pub use crate::gate::*;
#[cfg(any(feature = "async-tokio", feature = "async-smol"))]
pub use crate::runtime::*;
pub use crate::status::*;
pub use crate::worker::*;
