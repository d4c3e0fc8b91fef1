//! The request router (C5) and the five assignment policies (C6):
//! `simple`, `cta`, `gta`, and the three `sequential_cta_*` variants.
//!
//! This crate owns every statistical decision in `haio` — the rest of
//! the workspace only supplies questions, answers, and storage.

mod cluster;
mod cta;
mod gta;
mod policy;
mod router;
mod sequential;
mod simple;
mod stats;

pub use cluster::{cluster_by_answer, TaskCluster};
pub use cta::{build_clusters, run_cta};
pub use gta::run_gta;
pub use policy::{ExecutionConfig, ExecutionPolicy, DEFAULT_GTA_ITERATION, DEFAULT_SIGNIFICANCE_LEVEL};
pub use router::Router;
pub use sequential::{run_sequential_cta_1, run_sequential_cta_2, run_sequential_cta_3, SequentialKey, SequentialRegistry, SequentialState};
pub use simple::run_simple;
pub use stats::{beta_draws, binomial_p_value_greater, weighted_mean};
