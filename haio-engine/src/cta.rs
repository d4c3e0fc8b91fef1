use std::collections::HashMap;
use std::sync::Arc;

use haio_core::{Answer, DataList, HaioError, QuestionTemplate, Result};
use haio_worker::Worker;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::cluster::{cluster_by_answer, TaskCluster};
use crate::router::Router;
use crate::stats::binomial_p_value_greater;

/// Ask every registered AI worker for every task, grouping each
/// worker's answers into `(worker, answer)` clusters (phase 1).
pub async fn build_clusters(router: &Router, ai_workers: &HashMap<String, Arc<dyn Worker>>, template: &QuestionTemplate, data_lists: &[DataList]) -> Result<Vec<TaskCluster>> {
    let mut clusters = Vec::new();
    for worker in ai_workers.values() {
        let mut answers = Vec::with_capacity(data_lists.len());
        for (index, data) in data_lists.iter().enumerate() {
            let answer = router.ask_or_reuse(worker.as_ref(), template, data).await?;
            answers.push((index, answer));
        }
        clusters.extend(cluster_by_answer(worker.kind(), answers));
    }
    Ok(clusters)
}

/// Task-cluster approval (`cta`): sample humans in a random order,
/// updating every cluster that covers the sampled task, and approve a
/// cluster once its one-sided exact binomial test against
/// `quality_requirement` clears `significance_level`. Approved clusters
/// propagate their answer to every task index they cover; tasks never
/// covered by an approved cluster fall back to the human answer
/// collected for that specific task during sampling.
pub async fn run_cta(
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
        return Err(HaioError::InvalidParameter { reason: "cta requires a Select answer shape".into() });
    }

    let mut clusters = build_clusters(router, ai_workers, template, data_lists).await?;

    let mut task_order: Vec<usize> = (0..data_lists.len()).collect();
    task_order.shuffle(rng);

    let mut output: Vec<Option<Answer>> = vec![None; data_lists.len()];
    let mut approved: Vec<bool> = vec![false; clusters.len()];

    for task_index in task_order {
        if output[task_index].is_some() {
            continue;
        }

        let human_answer = router.ask_or_reuse(human, template, &data_lists[task_index]).await?;
        output[task_index] = Some(human_answer.clone());

        for (cluster_index, cluster) in clusters.iter_mut().enumerate() {
            if !cluster.task_indexes.contains(&task_index) {
                continue;
            }
            cluster.record(&human_answer);
            let p_value = binomial_p_value_greater(cluster.correct_count, cluster.trials(), quality_requirement)?;
            if p_value < significance_level {
                approved[cluster_index] = true;
                tracing::info!(answer = %cluster.answer, worker = %cluster.client, p_value, "cta cluster approved");
                for &j in &cluster.task_indexes {
                    if output[j].is_none() {
                        output[j] = Some(cluster.answer.clone());
                    }
                }
            }
        }

        if approved.iter().all(|a| *a) {
            break;
        }
    }

    let mut results = Vec::with_capacity(data_lists.len());
    for (task_index, answer) in output.into_iter().enumerate() {
        let answer = match answer {
            Some(answer) => answer,
            None => router.ask_or_reuse(human, template, &data_lists[task_index]).await?,
        };
        results.push(answer);
    }

    Ok(results)
}
