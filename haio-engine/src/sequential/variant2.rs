use std::collections::HashMap;
use std::sync::Arc;

use haio_core::{Answer, DataList, HaioError, QuestionTemplate, Result};
use haio_worker::Worker;
use rand::Rng;

use super::state::SequentialState;
use crate::cluster::TaskCluster;
use crate::router::Router;
use crate::stats::binomial_p_value_greater;

/// `sequential_cta_2` — `sequential_cta_1` with delayed, one-shot
/// approval: a cluster accumulates human evidence silently until its
/// trial count reaches `sample_size`, is tested exactly once at that
/// point, and is then `checked` forever — further human samples landing
/// in it neither update its counts nor retrigger the test, regardless
/// of whether it passed.
pub async fn run_sequential_cta_2(
    state: &mut SequentialState,
    router: &Router,
    human: &dyn Worker,
    ai_workers: &HashMap<String, Arc<dyn Worker>>,
    template: &QuestionTemplate,
    data_lists: &[DataList],
    quality_requirement: f64,
    significance_level: f64,
    sample_size: usize,
    _rng: &mut impl Rng,
) -> Result<Vec<Answer>> {
    if !template.answer.is_select() {
        return Err(HaioError::InvalidParameter { reason: "sequential_cta_2 requires a Select answer shape".into() });
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
                if state.checked[pos] || !state.clusters[pos].task_indexes.contains(&global_index) {
                    continue;
                }
                state.clusters[pos].record(&human_answer);
                if state.clusters[pos].trials() < sample_size as u64 {
                    continue;
                }

                state.checked[pos] = true;
                let p_value = binomial_p_value_greater(state.clusters[pos].correct_count, state.clusters[pos].trials(), quality_requirement)?;
                if p_value < significance_level {
                    state.approved[pos] = true;
                    tracing::info!(
                        answer = %state.clusters[pos].answer,
                        worker = %state.clusters[pos].client,
                        p_value,
                        "sequential_cta_2 cluster approved at fixed sample size"
                    );
                } else {
                    tracing::info!(
                        answer = %state.clusters[pos].answer,
                        worker = %state.clusters[pos].client,
                        p_value,
                        "sequential_cta_2 cluster frozen without approval at fixed sample size"
                    );
                }
            }
        }
    }

    state.next_index += n;
    output
        .into_iter()
        .enumerate()
        .map(|(i, answer)| answer.ok_or_else(|| HaioError::MissingAnswer { handle: format!("sequential_cta_2 task {i}") }))
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
    async fn cluster_freezes_after_exactly_one_test_at_the_fixed_sample_size() {
        let dir = tempfile::tempdir().unwrap();
        let router = Router::new(FileCache::new(dir.path()));
        let template = select_template();
        let mut state = SequentialState::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);

        let ai: Arc<dyn Worker> = Arc::new(FixedWorker { kind: WorkerKind::ai("openai"), answer: "1".into() });
        let mut ai_workers = HashMap::new();
        ai_workers.insert("openai".to_string(), ai);

        let correct = (0..10).map(|i| (i, "1".to_string())).collect();
        let data_to_index = (0..10).map(|i| (vec![format!("img-{i}")], i)).collect();
        let human = HumanOracle { correct: Mutex::new(correct), data_to_index };

        // sample_size = 2, q = 0.5, alpha = 0.5: the binomial test is run
        // exactly once, after the second human sample in the cluster.
        for i in 0..10 {
            let data_lists = vec![vec![format!("img-{i}")]];
            run_sequential_cta_2(&mut state, &router, &human, &ai_workers, &template, &data_lists, 0.5, 0.5, 2, &mut rng)
                .await
                .unwrap();
        }

        assert_eq!(state.clusters.len(), 1);
        assert!(state.checked[0]);
        assert_eq!(state.clusters[0].trials(), 2, "trials must stop accumulating once checked");
    }

    #[tokio::test]
    async fn rejects_non_select_templates() {
        let dir = tempfile::tempdir().unwrap();
        let router = Router::new(FileCache::new(dir.path()));
        let template = QuestionTemplate::new("t", "d", vec![], AnswerSpec::Text);
        let ai_workers = HashMap::new();
        let human = HumanOracle { correct: Mutex::new(HashMap::new()), data_to_index: HashMap::new() };
        let mut state = SequentialState::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);

        let err = run_sequential_cta_2(&mut state, &router, &human, &ai_workers, &template, &[], 0.9, 0.05, 1, &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(err, HaioError::InvalidParameter { .. }));
    }
}
