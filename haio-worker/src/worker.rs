use async_trait::async_trait;
use haio_core::{Answer, QuestionConfig, Result, WorkerKind};

/// The uniform contract the router and assignment engine dispatch
/// against, regardless of whether a concrete implementation is backed
/// by a single-shot model call or a polled human marketplace.
///
/// `submit` issues work and returns a handle; `is_done`/`take` poll and
/// collect it. `ask_and_wait` is the common convenience path and has a
/// sensible default in terms of the other three.
#[async_trait]
pub trait Worker: Send + Sync {
    fn kind(&self) -> WorkerKind;

    async fn submit(&self, question: &QuestionConfig) -> Result<String>;

    async fn is_done(&self, handle: &str) -> Result<bool>;

    async fn take(&self, handle: &str) -> Result<Answer>;

    async fn ask_and_wait(&self, question: &QuestionConfig) -> Result<Answer> {
        let handle = self.submit(question).await?;
        loop {
            if self.is_done(&handle).await? {
                return self.take(&handle).await;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }
}
