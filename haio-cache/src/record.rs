use std::collections::HashMap;

use haio_core::{Answer, DataList, QuestionTemplate, WorkerKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One historical answer stored against a `(template, data_list,
/// worker)` triple. `id` is the cache identifier consumers reserve
/// against — reusing the same `id` across sessions is how a
/// previously-taken answer is distinguished from a fresh one.
///
/// `id` is never itself serialized: on disk it is the key a record sits
/// under in [`DataListEntry::answer_list`] (spec.md §6's
/// `"answer_list": { id: { "client": K, "answer": A } }`), so
/// `FileCache::load` backfills it from the map key immediately after
/// deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    #[serde(skip)]
    pub id: String,
    pub client: WorkerKind,
    pub answer: Answer,
}

/// Every answer ever collected for one binding of a template's slots,
/// keyed by cache id. `IndexMap` rather than `HashMap` because
/// insertion order must survive a save/load round trip: `find_unused`
/// walks records in the order they were recorded to return the first
/// unreserved one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataListEntry {
    pub data_list: DataList,
    #[serde(rename = "answer_list")]
    pub answer_list: IndexMap<String, CacheRecord>,
}

/// The on-disk shape of one template's cache file:
/// `{"question_template": ..., "data_lists": {hash: {...}}}`, keyed by
/// the fingerprint of the data list that was bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheFile {
    pub question_template: QuestionTemplate,
    pub data_lists: HashMap<String, DataListEntry>,
}

impl CacheFile {
    pub fn new(question_template: QuestionTemplate) -> Self {
        Self { question_template, data_lists: HashMap::new() }
    }

    /// Backfill every record's `id` field from its `answer_list` key.
    /// Must run once after deserializing from disk, since `id` is
    /// `#[serde(skip)]` and comes back empty otherwise.
    pub fn backfill_ids(&mut self) {
        for entry in self.data_lists.values_mut() {
            for (id, record) in entry.answer_list.iter_mut() {
                record.id = id.clone();
            }
        }
    }
}
