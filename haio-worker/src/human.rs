use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use haio_core::{Answer, HaioError, QuestionConfig, Result, WorkerKind};

use crate::normalize::normalize_answer;
use crate::worker::Worker;

/// The interval humans are polled at when no override is given.
///
/// Matches `check_frequency = 5` in the original package's common
/// module; exposed as a named constant rather than a magic number so
/// tests can shrink it.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// A crowd marketplace's three primitive operations: post a HIT, check
/// whether it has been completed, and fetch the completed response.
/// Multiple HITs may be outstanding at once — unlike [`crate::Answerer`],
/// there is no single-shot guard here.
#[async_trait]
pub trait Marketplace: Send + Sync {
    async fn submit(&self, question: &QuestionConfig) -> Result<String>;
    async fn poll(&self, handle: &str) -> Result<bool>;
    async fn fetch(&self, handle: &str) -> Result<String>;
}

/// Wraps a [`Marketplace`] with cooperative polling and the shared
/// answer-normalisation pass every worker kind applies before its
/// answer reaches the cache or the assignment engine.
pub struct HumanWorker<M: Marketplace> {
    marketplace: M,
    poll_interval: Duration,
    outstanding: Mutex<HashMap<String, QuestionConfig>>,
}

impl<M: Marketplace> HumanWorker<M> {
    pub fn new(marketplace: M) -> Self {
        Self { marketplace, poll_interval: DEFAULT_POLL_INTERVAL, outstanding: Mutex::new(HashMap::new()) }
    }

    pub fn with_poll_interval(marketplace: M, poll_interval: Duration) -> Self {
        Self { marketplace, poll_interval, outstanding: Mutex::new(HashMap::new()) }
    }
}

#[async_trait]
impl<M: Marketplace> Worker for HumanWorker<M> {
    fn kind(&self) -> WorkerKind {
        WorkerKind::Human
    }

    async fn submit(&self, question: &QuestionConfig) -> Result<String> {
        let handle = self.marketplace.submit(question).await?;
        self.outstanding.lock().unwrap().insert(handle.clone(), question.clone());
        tracing::info!(handle = %handle, "posted HIT to marketplace");
        Ok(handle)
    }

    async fn is_done(&self, handle: &str) -> Result<bool> {
        self.marketplace.poll(handle).await
    }

    async fn take(&self, handle: &str) -> Result<Answer> {
        let question = self
            .outstanding
            .lock()
            .unwrap()
            .remove(handle)
            .ok_or_else(|| HaioError::NeverAsked { handle: handle.to_string() })?;
        let raw = self.marketplace.fetch(handle).await?;
        normalize_answer(&question.answer, &raw, "human")
    }

    async fn ask_and_wait(&self, question: &QuestionConfig) -> Result<Answer> {
        let handle = self.submit(question).await?;
        loop {
            if self.marketplace.poll(&handle).await? {
                return self.take(&handle).await;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
