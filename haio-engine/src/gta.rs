use std::collections::HashMap;
use std::sync::Arc;

use haio_core::{Answer, DataList, HaioError, QuestionTemplate, Result};
use haio_worker::Worker;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::cta::build_clusters;
use crate::router::Router;
use crate::stats::{beta_draws, weighted_mean};

/// Bayesian generalisation (`gta`): like `cta`, but a candidate cluster
/// is approved by Monte-Carlo evidence that the *size-weighted mean
/// quality across every already-approved cluster plus the candidate*
/// clears `quality_requirement`, not by the candidate's own accuracy in
/// isolation. This lets a large, slightly-below-threshold cluster ride
/// on the strength of already-approved clusters.
pub async fn run_gta(
    router: &Router,
    human: &dyn Worker,
    ai_workers: &HashMap<String, Arc<dyn Worker>>,
    template: &QuestionTemplate,
    data_lists: &[DataList],
    quality_requirement: f64,
    significance_level: f64,
    iteration: usize,
    rng: &mut impl Rng,
) -> Result<Vec<Answer>> {
    if !template.answer.is_select() {
        return Err(HaioError::InvalidParameter { reason: "gta requires a Select answer shape".into() });
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

        for cluster in clusters.iter_mut() {
            if cluster.task_indexes.contains(&task_index) {
                cluster.record(&human_answer);
            }
        }

        let candidate_indexes: Vec<usize> = approved.iter().enumerate().filter(|(_, a)| !**a).map(|(i, _)| i).collect();
        for candidate_index in candidate_indexes {
            let approved_sizes: Vec<(u64, u64, usize)> = clusters
                .iter()
                .zip(approved.iter())
                .filter(|(_, a)| **a)
                .map(|(c, _)| (c.correct_count, c.incorrect_count, c.size()))
                .collect();
            let candidate = &clusters[candidate_index];
            let candidate_size = candidate.size();
            let candidate_draws = beta_draws(candidate.correct_count, candidate.incorrect_count, iteration, rng)?;

            let mut approved_draws: Vec<Vec<f64>> = Vec::with_capacity(approved_sizes.len());
            for (correct, incorrect, _) in &approved_sizes {
                approved_draws.push(beta_draws(*correct, *incorrect, iteration, rng)?);
            }

            let mut success_count = 0usize;
            for i in 0..iteration {
                let mut weighted = Vec::with_capacity(approved_sizes.len() + 1);
                for (draws, (_, _, size)) in approved_draws.iter().zip(approved_sizes.iter()) {
                    weighted.push((draws[i], *size));
                }
                weighted.push((candidate_draws[i], candidate_size));
                if weighted_mean(&weighted) >= quality_requirement {
                    success_count += 1;
                }
            }

            let p_value = 1.0 - (success_count as f64 / iteration as f64);
            if p_value < significance_level {
                approved[candidate_index] = true;
                let candidate_cluster = &clusters[candidate_index];
                tracing::info!(answer = %candidate_cluster.answer, worker = %candidate_cluster.client, p_value, "gta cluster approved");
                for &j in &candidate_cluster.task_indexes {
                    if output[j].is_none() {
                        output[j] = Some(candidate_cluster.answer.clone());
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
