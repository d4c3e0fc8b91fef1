use std::collections::HashSet;

use haio_core::{Answer, WorkerKind};

/// A group of tasks that one AI worker answered identically.
///
/// Clusters are keyed by `(worker, answer)`: two AI workers that happen
/// to agree on the same answer still form separate clusters, each
/// accumulating its own human-verified correctness evidence.
#[derive(Debug, Clone)]
pub struct TaskCluster {
    pub client: WorkerKind,
    pub answer: Answer,
    pub task_indexes: HashSet<usize>,
    pub correct_count: u64,
    pub incorrect_count: u64,
}

impl TaskCluster {
    pub fn new(client: WorkerKind, answer: Answer) -> Self {
        Self { client, answer, task_indexes: HashSet::new(), correct_count: 0, incorrect_count: 0 }
    }

    pub fn trials(&self) -> u64 {
        self.correct_count + self.incorrect_count
    }

    pub fn record(&mut self, human_answer: &str) {
        if human_answer == self.answer {
            self.correct_count += 1;
        } else {
            self.incorrect_count += 1;
        }
    }

    pub fn size(&self) -> usize {
        self.task_indexes.len()
    }
}

/// Group `(task_index, answer)` pairs produced by a single AI worker
/// into one [`TaskCluster`] per distinct answer.
pub fn cluster_by_answer(client: WorkerKind, answers: impl IntoIterator<Item = (usize, Answer)>) -> Vec<TaskCluster> {
    let mut clusters: Vec<TaskCluster> = Vec::new();
    for (task_index, answer) in answers {
        match clusters.iter_mut().find(|cluster| cluster.answer == answer) {
            Some(cluster) => {
                cluster.task_indexes.insert(task_index);
            }
            None => {
                let mut cluster = TaskCluster::new(client.clone(), answer);
                cluster.task_indexes.insert(task_index);
                clusters.push(cluster);
            }
        }
    }
    clusters
}
