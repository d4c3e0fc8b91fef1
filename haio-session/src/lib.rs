//! The session façade (C7): the single entry point a caller uses to ask
//! one question, or a batch of questions under a named quality policy,
//! and get back answers.
//!
//! `HaioSession` owns the answer cache, the registered workers, and the
//! persistent state the `sequential_cta_*` policies carry across calls.
//! Everything else in the workspace is reachable only through it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use haio_cache::FileCache;
use haio_core::{fp, Answer, DataList, HaioError, QuestionTemplate, Result, WorkerKind};
use haio_engine::{
    run_cta, run_gta, run_sequential_cta_1, run_sequential_cta_2, run_sequential_cta_3, run_simple, ExecutionConfig, ExecutionPolicy, Router,
    SequentialKey, SequentialRegistry, SequentialState,
};
use haio_worker::Worker;

/// A question template bound to one data list, ready to be asked.
/// Building one is pure and never touches a worker or the cache.
#[derive(Debug, Clone)]
pub struct AskedQuestion {
    pub template: QuestionTemplate,
    pub data: DataList,
}

/// The duck-typed shape of `wait`'s first argument: a
/// single [`AskedQuestion`] or a batch of them, each routed through a
/// different code path.
pub enum AskInput {
    One(AskedQuestion),
    Many(Vec<AskedQuestion>),
}

impl From<AskedQuestion> for AskInput {
    fn from(ask: AskedQuestion) -> Self {
        AskInput::One(ask)
    }
}

impl From<Vec<AskedQuestion>> for AskInput {
    fn from(asks: Vec<AskedQuestion>) -> Self {
        AskInput::Many(asks)
    }
}

/// The duck-typed shape of `wait`'s return value: one answer for a
/// single ask, or the batch's full answer vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Single(Answer),
    Batch(Vec<Answer>),
}

impl WaitOutcome {
    pub fn into_single(self) -> Option<Answer> {
        match self {
            WaitOutcome::Single(answer) => Some(answer),
            WaitOutcome::Batch(_) => None,
        }
    }

    pub fn into_batch(self) -> Option<Vec<Answer>> {
        match self {
            WaitOutcome::Batch(answers) => Some(answers),
            WaitOutcome::Single(_) => None,
        }
    }
}

/// Builds a [`HaioSession`]: one required human worker, zero or more
/// named AI workers, and an optional cache directory override — the
/// same shape as `adk_runner::RunnerConfig` feeding `Runner::new`.
#[derive(Default)]
pub struct HaioSessionBuilder {
    human: Option<Arc<dyn Worker>>,
    ai_workers: HashMap<String, Arc<dyn Worker>>,
    cache_dir: Option<PathBuf>,
}

impl HaioSessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn human_worker(mut self, worker: Arc<dyn Worker>) -> Self {
        self.human = Some(worker);
        self
    }

    /// Register an AI worker under `name`, the key callers pass as
    /// `WorkerKind::ai(name)` (e.g. `"openai"`, `"gemini"`).
    pub fn ai_worker(mut self, name: impl Into<String>, worker: Arc<dyn Worker>) -> Self {
        self.ai_workers.insert(name.into(), worker);
        self
    }

    /// Override the cache directory (default: `haio_cache`
    /// beside the running executable).
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn build(self) -> Result<HaioSession> {
        let human = self.human.ok_or_else(|| HaioError::InvalidParameter { reason: "a human worker is required to build a HaioSession".into() })?;
        let dir = match self.cache_dir {
            Some(dir) => dir,
            None => FileCache::default_dir()?,
        };
        Ok(HaioSession { router: Router::new(FileCache::new(dir)), human, ai_workers: self.ai_workers, sequential: Mutex::new(SequentialRegistry::new()) })
    }
}

/// The single entry point a caller drives: register questions, ask one
/// directly, or `wait` on a batch under a named quality policy.
pub struct HaioSession {
    router: Router,
    human: Arc<dyn Worker>,
    ai_workers: HashMap<String, Arc<dyn Worker>>,
    sequential: Mutex<SequentialRegistry>,
}

impl HaioSession {
    pub fn builder() -> HaioSessionBuilder {
        HaioSessionBuilder::new()
    }

    /// Bind `data` into `template`'s record without asking anyone.
    /// `template` is cloned, never mutated.
    pub fn make_ask(&self, template: &QuestionTemplate, data: DataList) -> AskedQuestion {
        AskedQuestion { template: template.clone(), data }
    }

    /// Route one `(template, data)` ask to `client` and return its
    /// answer, reusing an unconsumed cached answer when one exists.
    pub async fn submit_one(&self, template: &QuestionTemplate, data: &DataList, client: &WorkerKind) -> Result<Answer> {
        let worker = self.resolve_worker(client)?;
        self.router.ask_or_reuse(worker.as_ref(), template, data).await
    }

    fn resolve_worker(&self, kind: &WorkerKind) -> Result<Arc<dyn Worker>> {
        match kind {
            WorkerKind::Human => Ok(self.human.clone()),
            WorkerKind::Ai(name) => self.ai_workers.get(name).cloned().ok_or_else(|| HaioError::InvalidClient { client: name.clone() }),
        }
    }

    /// The unified entry point: a single ask resolves against
    /// `config.client` directly; a batch is validated (same template
    /// throughout, well-formed policy parameters) and dispatched to the
    /// named assignment engine.
    pub async fn wait(&self, asks: impl Into<AskInput>, config: ExecutionConfig) -> Result<WaitOutcome> {
        match asks.into() {
            AskInput::One(ask) => {
                let client = config.client.ok_or_else(|| HaioError::InvalidParameter { reason: "client is required to wait on a single ask".into() })?;
                let answer = self.submit_one(&ask.template, &ask.data, &client).await?;
                Ok(WaitOutcome::Single(answer))
            }
            AskInput::Many(asks) => self.wait_batch(&asks, config).await.map(WaitOutcome::Batch),
        }
    }

    async fn wait_batch(&self, asks: &[AskedQuestion], config: ExecutionConfig) -> Result<Vec<Answer>> {
        if asks.is_empty() {
            return Ok(Vec::new());
        }

        let template_fp = fp(&asks[0].template)?;
        for (index, ask) in asks.iter().enumerate().skip(1) {
            if fp(&ask.template)? != template_fp {
                return Err(HaioError::MixedTemplates { index });
            }
        }

        let template = asks[0].template.clone();
        let data_lists: Vec<DataList> = asks.iter().map(|ask| ask.data.clone()).collect();

        let policy = ExecutionPolicy::try_from(config)?;
        if policy.requires_select_answer() && !template.answer.is_select() {
            return Err(HaioError::InvalidParameter { reason: "this method requires the template's answer type to be Select".into() });
        }
        if let ExecutionPolicy::Simple { client } = &policy {
            self.resolve_worker(client)?;
        }

        let mut rng = rand::rng();
        match policy {
            ExecutionPolicy::Simple { client } => {
                let worker = self.resolve_worker(&client)?;
                run_simple(&self.router, worker.as_ref(), &template, &data_lists).await
            }
            ExecutionPolicy::Cta { quality_requirement, significance_level } => {
                run_cta(&self.router, self.human.as_ref(), &self.ai_workers, &template, &data_lists, quality_requirement, significance_level, &mut rng).await
            }
            ExecutionPolicy::Gta { quality_requirement, significance_level, iteration } => {
                run_gta(&self.router, self.human.as_ref(), &self.ai_workers, &template, &data_lists, quality_requirement, significance_level, iteration, &mut rng).await
            }
            ExecutionPolicy::SequentialCta1 { quality_requirement, significance_level } => {
                let key = SequentialKey::new("sequential_cta_1", template_fp, quality_requirement, significance_level, None);
                let mut state = self.take_sequential_state(&key);
                let result =
                    run_sequential_cta_1(&mut state, &self.router, self.human.as_ref(), &self.ai_workers, &template, &data_lists, quality_requirement, significance_level, &mut rng)
                        .await;
                self.sequential.lock().unwrap().insert(key, state);
                result
            }
            ExecutionPolicy::SequentialCta2 { quality_requirement, significance_level, sample_size } => {
                let key = SequentialKey::new("sequential_cta_2", template_fp, quality_requirement, significance_level, Some(sample_size));
                let mut state = self.take_sequential_state(&key);
                let result = run_sequential_cta_2(
                    &mut state,
                    &self.router,
                    self.human.as_ref(),
                    &self.ai_workers,
                    &template,
                    &data_lists,
                    quality_requirement,
                    significance_level,
                    sample_size,
                    &mut rng,
                )
                .await;
                self.sequential.lock().unwrap().insert(key, state);
                result
            }
            ExecutionPolicy::SequentialCta3 { quality_requirement, significance_level } => {
                let key = SequentialKey::new("sequential_cta_3", template_fp, quality_requirement, significance_level, None);
                let mut state = self.take_sequential_state(&key);
                let result =
                    run_sequential_cta_3(&mut state, &self.router, self.human.as_ref(), &self.ai_workers, &template, &data_lists, quality_requirement, significance_level, &mut rng)
                        .await;
                self.sequential.lock().unwrap().insert(key, state);
                result
            }
        }
    }

    /// Takes this key's persistent state out of the registry (handing
    /// back a fresh default if this is the first call for it) so the
    /// registry lock is never held across the policy's `.await`.
    /// Callers must put the state back with `self.sequential.lock().unwrap().insert(key, state)`
    /// once the policy call returns, whether it succeeded or failed.
    fn take_sequential_state(&self, key: &SequentialKey) -> SequentialState {
        self.sequential.lock().unwrap().remove(key).unwrap_or_default()
    }
}
