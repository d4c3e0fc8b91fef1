use std::collections::HashMap;
use std::sync::Arc;

use haio_core::{Answer, DataList, HaioError, QuestionTemplate, Result};
use haio_worker::Worker;
use rand::Rng;

use super::state::SequentialState;
use crate::cluster::TaskCluster;
use crate::router::Router;
use crate::stats::binomial_p_value_greater;

/// `sequential_cta_3` — `sequential_cta_1` with phase-aware human-answer
/// reuse. Each call opens one
/// phase covering its own global index range. Within that phase, the
/// first human answer drawn for any still-unresolved task is kept as a
/// spendable token: a later unresolved task in the *same* phase may
/// consume it instead of triggering a fresh human ask. Each token is
/// spent at most once (destructive removal from `state.task_phases`).
///
/// Which unresolved candidate a spent token should go to is left open by
/// design; here a spent token is always applied
/// to whichever unresolved candidate the round's random pick lands on —
/// the token's originating task already received its own answer when
/// the token was minted, so reuse only ever saves a *different* task
/// from a fresh ask.
pub async fn run_sequential_cta_3(
    state: &mut SequentialState,
    router: &Router,
    human: &dyn Worker,
    ai_workers: &HashMap<String, Arc<dyn Worker>>,
    template: &QuestionTemplate,
    data_lists: &[DataList],
    quality_requirement: f64,
    significance_level: f64,
    rng: &mut impl Rng,
) -> Result<Vec<Answer>> {
    if !template.answer.is_select() {
        return Err(HaioError::InvalidParameter { reason: "sequential_cta_3 requires a Select answer shape".into() });
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
    }

    state.task_phases.entry(base_index).or_default();
    let mut canonical_draws: HashMap<usize, Answer> = HashMap::new();
    let mut unresolved: Vec<usize> = (0..n).filter(|&i| output[i].is_none()).collect();

    while !unresolved.is_empty() {
        let pick_at = rng.random_range(0..unresolved.len());
        let local_index = unresolved[pick_at];
        let global_index = base_index + local_index;

        let reuse_set = state.task_phases.get_mut(&base_index).expect("phase registered above");
        let human_answer = if !reuse_set.is_empty() {
            let reused_index = if reuse_set.contains(&global_index) { global_index } else { *reuse_set.iter().next().unwrap() };
            reuse_set.remove(&reused_index);
            canonical_draws.get(&reused_index).cloned().expect("every reuse-set member has a recorded canonical draw")
        } else {
            let answer = router.ask_or_reuse(human, template, &data_lists[local_index]).await?;
            canonical_draws.insert(global_index, answer.clone());
            reuse_set.insert(global_index);
            answer
        };

        output[local_index] = Some(human_answer.clone());
        unresolved.remove(pick_at);

        for pos in 0..state.clusters.len() {
            if state.approved[pos] || !state.clusters[pos].task_indexes.contains(&global_index) {
                continue;
            }
            state.clusters[pos].record(&human_answer);
            let p_value = binomial_p_value_greater(state.clusters[pos].correct_count, state.clusters[pos].trials(), quality_requirement)?;
            if p_value >= significance_level {
                continue;
            }

            state.approved[pos] = true;
            let propagated = state.clusters[pos].answer.clone();
            tracing::info!(answer = %propagated, worker = %state.clusters[pos].client, p_value, "sequential_cta_3 cluster approved");

            let covered: Vec<usize> = state.clusters[pos].task_indexes.iter().copied().collect();
            for covered_global in covered {
                if covered_global < base_index {
                    continue;
                }
                let covered_local = covered_global - base_index;
                if covered_local < n && output[covered_local].is_none() {
                    output[covered_local] = Some(propagated.clone());
                    unresolved.retain(|&i| i != covered_local);
                }
            }
        }
    }

    state.next_index += n;
    output
        .into_iter()
        .enumerate()
        .map(|(i, answer)| answer.ok_or_else(|| HaioError::MissingAnswer { handle: format!("sequential_cta_3 task {i}") }))
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
    async fn phase_reuse_resolves_every_task_without_one_human_ask_per_task() {
        let dir = tempfile::tempdir().unwrap();
        let router = Router::new(FileCache::new(dir.path()));
        let template = select_template();
        let mut state = SequentialState::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(9);

        // an AI cluster that will never be approved (alpha is tiny), so
        // resolution always falls to the phase-aware human loop
        let ai: Arc<dyn Worker> = Arc::new(FixedWorker { kind: WorkerKind::ai("openai"), answer: "1".into() });
        let mut ai_workers = HashMap::new();
        ai_workers.insert("openai".to_string(), ai);

        let correct = (0..6).map(|i| (i, "1".to_string())).collect();
        let data_to_index = (0..6).map(|i| (vec![format!("img-{i}")], i)).collect();
        let human = HumanOracle { correct: Mutex::new(correct), data_to_index, calls: Mutex::new(0) };

        let data_lists: Vec<DataList> = (0..6).map(|i| vec![format!("img-{i}")]).collect();
        let results = run_sequential_cta_3(&mut state, &router, &human, &ai_workers, &template, &data_lists, 0.999999, 1e-9, &mut rng)
            .await
            .unwrap();

        assert_eq!(results.len(), 6);
        assert!(results.iter().all(|a| a == "1"));
        assert!(*human.calls.lock().unwrap() < 6, "phase reuse must save at least one human ask");
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

        let err = run_sequential_cta_3(&mut state, &router, &human, &ai_workers, &template, &[], 0.9, 0.05, &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(err, HaioError::InvalidParameter { .. }));
    }
}
