use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use haio_core::{fp, Answer, HaioError, QuestionConfig, Result, WorkerKind};

use crate::normalize::normalize_answer;
use crate::worker::Worker;

/// A single model call that consumes a fully concrete question and
/// produces raw text. Rendering the question into a prompt or
/// multimodal request body is entirely the implementor's concern —
/// this crate never touches a provider SDK.
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn answer(&self, question: &QuestionConfig) -> Result<String>;
}

/// Wraps an [`Answerer`] with the single-shot "already asking" guard
/// described for AI workers: a second `submit` for a question whose
/// fingerprint is still pending (not yet `take`n) is rejected rather
/// than starting a duplicate request.
pub struct AiWorker<A: Answerer> {
    kind: WorkerKind,
    answerer: A,
    pending_fingerprints: Mutex<std::collections::HashSet<String>>,
    answers: Mutex<HashMap<String, Answer>>,
}

impl<A: Answerer> AiWorker<A> {
    pub fn new(name: impl Into<String>, answerer: A) -> Self {
        Self {
            kind: WorkerKind::ai(name),
            answerer,
            pending_fingerprints: Mutex::new(std::collections::HashSet::new()),
            answers: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<A: Answerer> Worker for AiWorker<A> {
    fn kind(&self) -> WorkerKind {
        self.kind.clone()
    }

    async fn submit(&self, question: &QuestionConfig) -> Result<String> {
        let fingerprint = fp(question)?;
        {
            let mut pending = self.pending_fingerprints.lock().unwrap();
            if !pending.insert(fingerprint.clone()) {
                return Err(HaioError::AlreadyAsking { fingerprint });
            }
        }

        tracing::info!(worker = %self.kind, fingerprint = %fingerprint, "dispatching question to AI worker");
        let raw = match self.answerer.answer(question).await {
            Ok(raw) => raw,
            Err(err) => {
                self.pending_fingerprints.lock().unwrap().remove(&fingerprint);
                return Err(err);
            }
        };
        let answer = normalize_answer(&question.answer, &raw, self.kind.as_str())?;

        let handle = haio_core::uid();
        self.answers.lock().unwrap().insert(handle.clone(), answer);
        Ok(handle)
    }

    async fn is_done(&self, handle: &str) -> Result<bool> {
        Ok(self.answers.lock().unwrap().contains_key(handle))
    }

    async fn take(&self, handle: &str) -> Result<Answer> {
        let answer = self
            .answers
            .lock()
            .unwrap()
            .remove(handle)
            .ok_or_else(|| HaioError::NeverAsked { handle: handle.to_string() })?;
        Ok(answer)
    }
}
