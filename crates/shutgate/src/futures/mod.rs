mod counter;
mod gate;
mod group;
mod spawn_provider;

#[cfg_attr(docsrs, doc(cfg(feature = "futures")))]
pub use counter::*;
#[cfg_attr(docsrs, doc(cfg(feature = "futures")))]
pub use gate::*;
#[cfg_attr(docsrs, doc(cfg(feature = "futures")))]
pub use group::*;
#[cfg_attr(docsrs, doc(cfg(feature = "futures")))]
pub use spawn_provider::*;
