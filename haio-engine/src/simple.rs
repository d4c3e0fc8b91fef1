use haio_core::{Answer, DataList, QuestionTemplate, Result};
use haio_worker::Worker;

use crate::router::Router;

/// `simple`: route every ask in the batch to the same worker, dispatched
/// concurrently and collected in order. No statistics, no cache
/// consensus — a direct pass-through over the router.
pub async fn run_simple(router: &Router, worker: &dyn Worker, template: &QuestionTemplate, data_lists: &[DataList]) -> Result<Vec<Answer>> {
    router.route_all(worker, template, data_lists).await
}
