use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use futures::future::join_all;
use haio_cache::FileCache;
use haio_core::{fp, insert_data, Answer, DataList, QuestionTemplate, Result};
use haio_worker::Worker;

/// Ids already consumed during this session, scoped by
/// `fp(template) -> fp(data_list) -> {cache ids}` — matches the
/// source package's nested `used_cache` bookkeeping. Reservations are
/// additive for the lifetime of the owning [`Router`]: nothing is ever
/// removed from it.
type UsedCache = HashMap<String, HashMap<String, HashSet<String>>>;

/// The request router (C5): dispatches `(template, data)` asks to a
/// worker, consulting and replenishing the answer cache so repeated
/// asks within a session never return the same historical answer twice.
pub struct Router {
    cache: FileCache,
    used: Mutex<UsedCache>,
}

impl Router {
    pub fn new(cache: FileCache) -> Self {
        Self { cache, used: Mutex::new(HashMap::new()) }
    }

    /// Resolve one ask: reuse an unconsumed cached answer if one exists
    /// for this exact `(template, data, worker)` triple, otherwise ask
    /// the worker and record the fresh answer. The cache lock is never
    /// held across the worker's `.await`, so concurrent asks to
    /// different workers never serialise on it.
    pub async fn ask_or_reuse(&self, worker: &dyn Worker, template: &QuestionTemplate, data: &DataList) -> Result<Answer> {
        let template_key = fp(template)?;
        let data_key = fp(data)?;
        let worker_kind = worker.kind();

        let cached = {
            let mut guard = self.used.lock().unwrap();
            let excluding = guard.entry(template_key.clone()).or_default().entry(data_key.clone()).or_default();
            match self.cache.find_unused(template, data, &worker_kind, excluding)? {
                Some(record) => {
                    excluding.insert(record.id.clone());
                    Some(record.answer)
                }
                None => None,
            }
        };
        if let Some(answer) = cached {
            tracing::debug!(worker = %worker_kind, "reused cached answer");
            return Ok(answer);
        }

        let question = insert_data(template, data)?;
        let answer = worker.ask_and_wait(&question).await?;

        let id = self.cache.insert(template, data, &worker_kind, answer.clone(), None)?;
        self.used.lock().unwrap().entry(template_key).or_default().entry(data_key).or_default().insert(id);

        Ok(answer)
    }

    /// Dispatch every route concurrently and collect answers in the
    /// original order, the `simple` method's contract.
    pub async fn route_all(&self, worker: &dyn Worker, template: &QuestionTemplate, data_lists: &[DataList]) -> Result<Vec<Answer>> {
        let futures = data_lists.iter().map(|data| self.ask_or_reuse(worker, template, data));
        join_all(futures).await.into_iter().collect()
    }
}
