use std::collections::HashMap;
use std::sync::Arc;

use haio_core::{Answer, DataList, HaioError, QuestionTemplate, Result};
use haio_worker::Worker;
use rand::Rng;

use super::state::SequentialState;
use crate::cluster::TaskCluster;
use crate::router::Router;
use crate::stats::binomial_p_value_greater;

/// `sequential_cta_1` — approve-as-you-go: each newly submitted task is
/// resolved in submission order against `state`'s accumulated clusters,
/// instead of batching all of `cta`'s phase 1 and phase 2 together.
/// Once a cluster is approved it stays approved and every later task that lands in it,
/// whether in this call or a future one, is resolved without a human.
pub async fn run_sequential_cta_1(
    state: &mut SequentialState,
    router: &Router,
    human: &dyn Worker,
    ai_workers: &HashMap<String, Arc<dyn Worker>>,
    template: &QuestionTemplate,
    data_lists: &[DataList],
    quality_requirement: f64,
    significance_level: f64,
    _rng: &mut impl Rng,
) -> Result<Vec<Answer>> {
    if !template.answer.is_select() {
        return Err(HaioError::InvalidParameter { reason: "sequential_cta_1 requires a Select answer shape".into() });
    }

    let n = data_lists.len();
    let base_index = state.next_index;
    let mut output: Vec<Option<Answer>> = vec![None; n];

    for local_index in 0..n {
        let global_index = base_index + local_index;
        let data = &data_lists[local_index];

        for worker in ai_workers.values() {
            let ai_answer = router.ask_or_reuse(worker.as_ref(), template, data).await?;
            match state.clusters.iter().position(|c| c.client == worker.kind() && c.answer == ai_answer) {
                Some(pos) if state.approved[pos] => {
                    if output[local_index].is_none() {
                        output[local_index] = Some(ai_answer.clone());
                    }
                }
                Some(pos) => {
                    state.clusters[pos].task_indexes.insert(global_index);
                }
                None => {
                    let mut cluster = TaskCluster::new(worker.kind(), ai_answer.clone());
                    cluster.task_indexes.insert(global_index);
                    state.clusters.push(cluster);
                    state.approved.push(false);
                    state.checked.push(false);
                }
            }
        }

        if output[local_index].is_none() {
            let human_answer = router.ask_or_reuse(human, template, data).await?;
            output[local_index] = Some(human_answer.clone());

            for pos in 0..state.clusters.len() {
                if state.approved[pos] || !state.clusters[pos].task_indexes.contains(&global_index) {
                    continue;
                }
                state.clusters[pos].record(&human_answer);
                let p_value = binomial_p_value_greater(state.clusters[pos].correct_count, state.clusters[pos].trials(), quality_requirement)?;
                if p_value < significance_level {
                    state.approved[pos] = true;
                    tracing::info!(
                        answer = %state.clusters[pos].answer,
                        worker = %state.clusters[pos].client,
                        p_value,
                        "sequential_cta_1 cluster approved"
                    );
                }
            }
        }
    }

    state.next_index += n;
    output
        .into_iter()
        .enumerate()
        .map(|(i, answer)| answer.ok_or_else(|| HaioError::MissingAnswer { handle: format!("sequential_cta_1 task {i}") }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use haio_cache::FileCache;
    use haio_core::{AnswerSpec, Node, QuestionConfig, QuestionTemplate, SlotValue, WorkerKind};
    use rand::SeedableRng;
    use std::sync::Mutex;

    struct FixedWorker {
        kind: WorkerKind,
        answer: String,
    }

    #[async_trait]
    impl Worker for FixedWorker {
        fn kind(&self) -> WorkerKind {
            self.kind.clone()
        }
        async fn submit(&self, _q: &QuestionConfig) -> Result<String> {
            unreachable!()
        }
        async fn is_done(&self, _h: &str) -> Result<bool> {
            unreachable!()
        }
        async fn take(&self, _h: &str) -> Result<String> {
            unreachable!()
        }
        async fn ask_and_wait(&self, _q: &QuestionConfig) -> Result<String> {
            Ok(self.answer.clone())
        }
    }

    struct HumanOracle {
        correct: Mutex<HashMap<usize, String>>,
        data_to_index: HashMap<Vec<String>, usize>,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl Worker for HumanOracle {
        fn kind(&self) -> WorkerKind {
            WorkerKind::Human
        }
        async fn submit(&self, _q: &QuestionConfig) -> Result<String> {
            unreachable!()
        }
        async fn is_done(&self, _h: &str) -> Result<bool> {
            unreachable!()
        }
        async fn take(&self, _h: &str) -> Result<String> {
            unreachable!()
        }
        async fn ask_and_wait(&self, q: &QuestionConfig) -> Result<String> {
            *self.calls.lock().unwrap() += 1;
            let src = match &q.question[0] {
                Node::Image { src: SlotValue::Literal(s) } => s.clone(),
                _ => unreachable!(),
            };
            let index = *self.data_to_index.get(&vec![src]).unwrap();
            Ok(self.correct.lock().unwrap().get(&index).unwrap().clone())
        }
    }

    fn select_template() -> QuestionTemplate {
        QuestionTemplate::new("t", "d", vec![Node::Image { src: 0usize.into() }], AnswerSpec::Select { options: vec!["0".into(), "1".into()] })
    }

    #[tokio::test]
    async fn approval_persists_and_cuts_off_human_calls_across_batches() {
        let dir = tempfile::tempdir().unwrap();
        let router = Router::new(FileCache::new(dir.path()));
        let template = select_template();
        let mut state = SequentialState::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);

        let ai: Arc<dyn Worker> = Arc::new(FixedWorker { kind: WorkerKind::ai("openai"), answer: "1".into() });
        let mut ai_workers = HashMap::new();
        ai_workers.insert("openai".to_string(), ai);

        let mut global_index = 0usize;
        let mut all_correct = HashMap::new();
        let mut all_data_to_index = HashMap::new();
        for i in 0..40 {
            all_correct.insert(i, "1".to_string());
            all_data_to_index.insert(vec![format!("img-{i}")], i);
            global_index += 1;
        }
        let _ = global_index;

        let human = HumanOracle { correct: Mutex::new(all_correct), data_to_index: all_data_to_index, calls: Mutex::new(0) };

        for batch_start in (0..40).step_by(4) {
            let data_lists: Vec<DataList> = (batch_start..batch_start + 4).map(|i| vec![format!("img-{i}")]).collect();
            let results = run_sequential_cta_1(&mut state, &router, &human, &ai_workers, &template, &data_lists, 0.6, 0.2, &mut rng)
                .await
                .unwrap();
            assert_eq!(results.len(), 4);
            assert!(results.iter().all(|a| a == "1"));
        }

        // once the cluster is approved, later batches resolve without any human call
        assert!(*human.calls.lock().unwrap() < 40);
    }

    #[tokio::test]
    async fn rejects_non_select_templates() {
        let dir = tempfile::tempdir().unwrap();
        let router = Router::new(FileCache::new(dir.path()));
        let template = QuestionTemplate::new("t", "d", vec![], AnswerSpec::Text);
        let ai_workers = HashMap::new();
        let human = HumanOracle { correct: Mutex::new(HashMap::new()), data_to_index: HashMap::new(), calls: Mutex::new(0) };
        let mut state = SequentialState::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);

        let err = run_sequential_cta_1(&mut state, &router, &human, &ai_workers, &template, &[], 0.9, 0.05, &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(err, HaioError::InvalidParameter { .. }));
    }
}
