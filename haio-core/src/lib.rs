//! Shared types, content fingerprinting, and the error taxonomy used by
//! every other `haio` crate.
//!
//! This crate has no async runtime dependency and no I/O — it is the
//! vocabulary the rest of the workspace is built out of.

mod error;
mod fingerprint;
mod types;

pub use error::{HaioError, Result};
pub use fingerprint::{fp, uid};
pub use types::{insert_data, AnswerSpec, Answer, DataList, Node, QuestionConfig, QuestionTemplate, SlotValue, WorkerKind};
