use haio_core::{HaioError, Result, WorkerKind};
use serde::Deserialize;

/// The five statistical assignment policies plus the plain routing
/// policy, mirroring the `execution_config["method"]` values the
/// session façade dispatches on.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionPolicy {
    /// Route every ask directly to one named worker; no statistics.
    Simple { client: WorkerKind },

    /// Task-cluster approval: one exact binomial test per cluster,
    /// batch-local (no state persists across calls).
    Cta { quality_requirement: f64, significance_level: f64 },

    /// Bayesian generalisation via Monte-Carlo posterior sampling.
    Gta { quality_requirement: f64, significance_level: f64, iteration: usize },

    /// `cta` with persistent, cross-batch cluster state.
    SequentialCta1 { quality_requirement: f64, significance_level: f64 },

    /// `sequential_cta_1` with a fixed sample size: clusters stop
    /// accepting new human evidence once `sample_size` trials are
    /// reached, freezing their approval decision.
    SequentialCta2 { quality_requirement: f64, significance_level: f64, sample_size: usize },

    /// `sequential_cta_1` with phase-aware human-answer pooling:
    /// human answers already collected for a task are reused across
    /// phases before asking a fresh human.
    SequentialCta3 { quality_requirement: f64, significance_level: f64 },
}

impl ExecutionPolicy {
    pub fn requires_select_answer(&self) -> bool {
        !matches!(self, ExecutionPolicy::Simple { .. })
    }

    pub fn validate(&self) -> haio_core::Result<()> {
        use haio_core::HaioError::InvalidParameter;
        let in_unit_interval = |name: &str, value: f64| -> haio_core::Result<()> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(InvalidParameter { reason: format!("{name} must be between 0 and 1 inclusive, got {value}") })
            }
        };

        match self {
            ExecutionPolicy::Simple { .. } => Ok(()),
            ExecutionPolicy::Cta { quality_requirement, significance_level }
            | ExecutionPolicy::SequentialCta1 { quality_requirement, significance_level }
            | ExecutionPolicy::SequentialCta3 { quality_requirement, significance_level } => {
                in_unit_interval("quality_requirement", *quality_requirement)?;
                in_unit_interval("significance_level", *significance_level)
            }
            ExecutionPolicy::SequentialCta2 { quality_requirement, significance_level, sample_size } => {
                in_unit_interval("quality_requirement", *quality_requirement)?;
                in_unit_interval("significance_level", *significance_level)?;
                if *sample_size == 0 {
                    return Err(InvalidParameter { reason: "sample_size must be at least 1".into() });
                }
                Ok(())
            }
            ExecutionPolicy::Gta { quality_requirement, significance_level, iteration } => {
                in_unit_interval("quality_requirement", *quality_requirement)?;
                in_unit_interval("significance_level", *significance_level)?;
                if *iteration == 0 {
                    return Err(InvalidParameter { reason: "iteration must be at least 1".into() });
                }
                Ok(())
            }
        }
    }
}

/// The significance level every policy defaults to when the caller
/// omits it, matching `execution_config.get("significance_level", 0.05)`.
pub const DEFAULT_SIGNIFICANCE_LEVEL: f64 = 0.05;

/// `gta`'s default Monte-Carlo iteration count, matching
/// `execution_config.get("iteration", 1000)`.
pub const DEFAULT_GTA_ITERATION: usize = 1000;

/// The wire shape of `config` — a loosely-typed map the
/// caller builds from JSON or from Rust literals. `method` is a plain
/// string here (rather than a closed enum) specifically so an unknown
/// value surfaces as [`HaioError::InvalidMethod`] instead of a
/// deserialisation failure, matching the original package's
/// `execution_config["method"]` dispatch.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    pub method: String,
    pub client: Option<WorkerKind>,
    pub quality_requirement: Option<f64>,
    pub significance_level: Option<f64>,
    pub iteration: Option<usize>,
    pub sample_size: Option<usize>,
}

impl TryFrom<ExecutionConfig> for ExecutionPolicy {
    type Error = HaioError;

    fn try_from(raw: ExecutionConfig) -> Result<Self> {
        let quality_requirement = || {
            raw.quality_requirement
                .ok_or_else(|| HaioError::InvalidParameter { reason: "quality_requirement is required".into() })
        };
        let significance_level = raw.significance_level.unwrap_or(DEFAULT_SIGNIFICANCE_LEVEL);

        let policy = match raw.method.as_str() {
            "simple" => ExecutionPolicy::Simple {
                client: raw.client.ok_or_else(|| HaioError::InvalidParameter { reason: "client is required for method 'simple'".into() })?,
            },
            "cta" => ExecutionPolicy::Cta { quality_requirement: quality_requirement()?, significance_level },
            "gta" => ExecutionPolicy::Gta {
                quality_requirement: quality_requirement()?,
                significance_level,
                iteration: raw.iteration.unwrap_or(DEFAULT_GTA_ITERATION),
            },
            "sequential_cta_1" => ExecutionPolicy::SequentialCta1 { quality_requirement: quality_requirement()?, significance_level },
            "sequential_cta_2" => ExecutionPolicy::SequentialCta2 {
                quality_requirement: quality_requirement()?,
                significance_level,
                sample_size: raw
                    .sample_size
                    .ok_or_else(|| HaioError::InvalidParameter { reason: "sample_size is required for method 'sequential_cta_2'".into() })?,
            },
            "sequential_cta_3" => ExecutionPolicy::SequentialCta3 { quality_requirement: quality_requirement()?, significance_level },
            other => return Err(HaioError::InvalidMethod { method: other.to_string() }),
        };
        policy.validate()?;
        Ok(policy)
    }
}
