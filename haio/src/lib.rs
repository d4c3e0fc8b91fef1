//! Hybrid Human+AI question answering.
//!
//! This crate re-exports the workspace's component crates behind
//! feature flags, the way a caller who just wants `HaioSession` doesn't
//! need to depend on `haio-engine` or `haio-cache` directly.
//!
//! With the default features, [`HaioSession`] and everything it needs
//! are available at the crate root. Types shared across every
//! component — [`Answer`], [`QuestionTemplate`], [`HaioError`] — are
//! always re-exported from `haio-core`.

pub use haio_core::*;

#[cfg(feature = "worker")]
pub use haio_worker as worker;
#[cfg(feature = "worker")]
pub use haio_worker::Worker;

#[cfg(feature = "cache")]
pub use haio_cache as cache;
#[cfg(feature = "cache")]
pub use haio_cache::FileCache;

#[cfg(feature = "engine")]
pub use haio_engine as engine;
#[cfg(feature = "engine")]
pub use haio_engine::{ExecutionConfig, ExecutionPolicy};

#[cfg(feature = "session")]
pub use haio_session as session;
#[cfg(feature = "session")]
pub use haio_session::{AskInput, AskedQuestion, HaioSession, HaioSessionBuilder, WaitOutcome};
