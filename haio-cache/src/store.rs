use std::collections::HashSet;
use std::path::{Path, PathBuf};

use haio_core::{fp, uid, Answer, DataList, HaioError, QuestionTemplate, Result, WorkerKind};
use indexmap::IndexMap;

use crate::record::{CacheFile, CacheRecord, DataListEntry};

/// A file-backed, per-template answer history.
///
/// Each template gets its own JSON file named by `fp(template)` inside
/// `dir`. Every read and write goes straight to disk (re-read before
/// write on every mutation) so that concurrent `HaioSession`s sharing a
/// cache directory never silently clobber each other's history.
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The default cache directory: a `haio_cache` directory next to
    /// the running executable, matching the original package's
    /// `_get_cache_dir_path` (sibling of `sys.argv[0]`'s directory).
    pub fn default_dir() -> Result<PathBuf> {
        let exe = std::env::current_exe().map_err(|source| HaioError::Io { path: "<current_exe>".into(), source })?;
        let parent = exe.parent().unwrap_or_else(|| Path::new("."));
        Ok(parent.join("haio_cache"))
    }

    fn file_path(&self, template: &QuestionTemplate) -> Result<PathBuf> {
        Ok(self.dir.join(format!("{}.json", fp(template)?)))
    }

    fn load(&self, template: &QuestionTemplate) -> Result<CacheFile> {
        let path = self.file_path(template)?;
        match std::fs::read(&path) {
            Ok(bytes) => {
                let mut file: CacheFile = serde_json::from_slice(&bytes)
                    .map_err(|source| HaioError::Serde { path: path.display().to_string(), source })?;
                file.backfill_ids();
                Ok(file)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(CacheFile::new(template.clone())),
            Err(source) => Err(HaioError::Io { path: path.display().to_string(), source }),
        }
    }

    fn save(&self, template: &QuestionTemplate, file: &CacheFile) -> Result<()> {
        let path = self.file_path(template)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| HaioError::Io { path: parent.display().to_string(), source })?;
        }

        let body = serde_json::to_vec_pretty(file).map_err(|source| HaioError::Serde { path: path.display().to_string(), source })?;
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &body).map_err(|source| HaioError::Io { path: tmp_path.display().to_string(), source })?;
        std::fs::rename(&tmp_path, &path).map_err(|source| HaioError::Io { path: path.display().to_string(), source })?;
        tracing::debug!(path = %path.display(), "wrote answer cache");
        Ok(())
    }

    /// Find the first historical answer for `(template, data, worker)`
    /// whose cache id is not in `excluding`. Callers decide what
    /// `excluding` contains — a per-session reservation set, typically.
    pub fn find_unused(&self, template: &QuestionTemplate, data: &DataList, worker: &WorkerKind, excluding: &HashSet<String>) -> Result<Option<CacheRecord>> {
        let file = self.load(template)?;
        let data_key = fp(data)?;
        let Some(entry) = file.data_lists.get(&data_key) else { return Ok(None) };
        Ok(entry.answer_list.values().find(|record| &record.client == worker && !excluding.contains(&record.id)).cloned())
    }

    /// Record a fresh answer, minting a cache id unless one was already
    /// reserved by a prior cache-miss lookup. Always re-reads the file
    /// before writing so concurrent writers never lose each other's
    /// history.
    pub fn insert(&self, template: &QuestionTemplate, data: &DataList, worker: &WorkerKind, answer: impl Into<Answer>, id: Option<String>) -> Result<String> {
        let mut file = self.load(template)?;
        let data_key = fp(data)?;
        let entry = file.data_lists.entry(data_key).or_insert_with(|| DataListEntry { data_list: data.clone(), answer_list: IndexMap::new() });

        let record_id = id.unwrap_or_else(uid);
        entry
            .answer_list
            .insert(record_id.clone(), CacheRecord { id: record_id.clone(), client: worker.clone(), answer: answer.into() });

        self.save(template, &file)?;
        tracing::debug!(worker = %worker, id = %record_id, "stored answer in cache");
        Ok(record_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haio_core::{insert_data, AnswerSpec, QuestionTemplate};

    fn sample_template() -> QuestionTemplate {
        QuestionTemplate::new("t", "d", vec![], AnswerSpec::Text)
    }

    #[test]
    fn find_unused_returns_none_when_nothing_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        let template = sample_template();
        let data = vec!["x".to_string()];

        let result = cache.find_unused(&template, &data, &WorkerKind::Human, &HashSet::new()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn insert_then_find_unused_round_trips_the_answer() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        let template = sample_template();
        let data = vec!["x".to_string()];

        let id = cache.insert(&template, &data, &WorkerKind::Human, "hello", None).unwrap();
        let found = cache.find_unused(&template, &data, &WorkerKind::Human, &HashSet::new()).unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.answer, "hello");
    }

    #[test]
    fn find_unused_excludes_reserved_ids() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        let template = sample_template();
        let data = vec!["x".to_string()];

        let id = cache.insert(&template, &data, &WorkerKind::Human, "hello", None).unwrap();
        let mut excluding = HashSet::new();
        excluding.insert(id);

        let result = cache.find_unused(&template, &data, &WorkerKind::Human, &excluding).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn distinct_answers_coexist_and_are_returned_in_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        let template = sample_template();
        let data = vec!["x".to_string()];

        let first = cache.insert(&template, &data, &WorkerKind::Human, "alpha", None).unwrap();
        let second = cache.insert(&template, &data, &WorkerKind::Human, "beta", None).unwrap();

        let mut excluding = HashSet::new();
        excluding.insert(first.clone());
        let remaining = cache.find_unused(&template, &data, &WorkerKind::Human, &excluding).unwrap().unwrap();
        assert_eq!(remaining.id, second);
        assert_eq!(remaining.answer, "beta");
    }

    #[test]
    fn cache_is_keyed_separately_per_worker_kind() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        let template = sample_template();
        let data = vec!["x".to_string()];

        cache.insert(&template, &data, &WorkerKind::Human, "human-answer", None).unwrap();
        let ai_result = cache.find_unused(&template, &data, &WorkerKind::ai("openai"), &HashSet::new()).unwrap();
        assert!(ai_result.is_none());
    }

    #[test]
    fn cache_survives_reloading_from_a_fresh_handle() {
        let dir = tempfile::tempdir().unwrap();
        let template = sample_template();
        let data = vec!["x".to_string()];

        let id = {
            let cache = FileCache::new(dir.path());
            cache.insert(&template, &data, &WorkerKind::Human, "hello", None).unwrap()
        };

        let cache = FileCache::new(dir.path());
        let found = cache.find_unused(&template, &data, &WorkerKind::Human, &HashSet::new()).unwrap().unwrap();
        assert_eq!(found.id, id);
    }

    #[test]
    fn insert_data_binds_consistently_with_cache_keys() {
        let template = sample_template();
        let data = vec!["x".to_string()];
        assert!(insert_data(&template, &data).is_ok());
    }
}
