use std::collections::{BTreeMap, HashMap, HashSet};

use crate::cluster::TaskCluster;

/// Identifies one persistent sequential-policy instance: same method,
/// same template, same quality/significance parameters (compared by bit
/// pattern, since `f64` isn't `Eq`), and — for `sequential_cta_2` — the
/// same fixed sample size. Two calls that differ in any of these get
/// independent state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SequentialKey {
    pub method: &'static str,
    pub template_fp: String,
    pub quality_bits: u64,
    pub alpha_bits: u64,
    pub sample_size: Option<usize>,
}

impl SequentialKey {
    pub fn new(method: &'static str, template_fp: String, quality_requirement: f64, significance_level: f64, sample_size: Option<usize>) -> Self {
        Self { method, template_fp, quality_bits: quality_requirement.to_bits(), alpha_bits: significance_level.to_bits(), sample_size }
    }
}

/// The state one sequential policy instance carries across batches:
/// clusters accumulated so far, which of them are approved (or, for
/// `sequential_cta_2`, permanently checked — tested exactly once and
/// then frozen regardless of outcome), and a running counter so task
/// indices stay globally unique across calls.
///
/// `task_phases` is `sequential_cta_3`'s phase-aware reuse bookkeeping:
/// each call registers one phase keyed by the
/// cumulative task count at the time it started, holding the set of
/// global indices whose already-drawn human answer is still available
/// to stand in for another task in that same phase. Entries are removed
/// destructively as they are reused; the phase itself is never removed,
/// keyed by cumulative task count, since phases must stay ordered.
#[derive(Default)]
pub struct SequentialState {
    pub clusters: Vec<TaskCluster>,
    pub approved: Vec<bool>,
    pub checked: Vec<bool>,
    pub next_index: usize,
    pub task_phases: BTreeMap<usize, HashSet<usize>>,
}

impl SequentialState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Every live sequential-policy instance for one [`crate::HaioSession`]
/// analogue. Owned by the caller (the session façade); never shared
/// across sessions.
pub type SequentialRegistry = HashMap<SequentialKey, SequentialState>;
