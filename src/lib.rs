//! Deferred completion at the checkpoints of a cooperative scheduler, async
//! predicate combinators under a sequential and a concurrent policy, and
//! taking the head of a lazy sequence that has to be closed.

pub mod config;
pub mod deferred;
pub mod error;
pub mod event_loop;
pub mod host;
pub mod lazy;
pub mod logging;
pub mod parallel;
pub mod sequential;
pub mod suspension;
#[cfg(feature = "tokio")]
pub mod tokio_host;

pub use config::LoopConfig;
pub use error::{ConfigError, HostError};
pub use event_loop::EventLoop;
pub use lazy::{LazySequence, first};
