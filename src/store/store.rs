use super::error::{Result, StoreError};
use super::keys;
use super::models::{Task, TaskResult};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const TASKS_PARTITION: &str = "tasks";
const RESULTS_PARTITION: &str = "results";
const RESULT_INDEX_PARTITION: &str = "result_index";

/// Persistent ledger of tasks and their per-item results
#[derive(Clone)]
pub struct TaskStore {
    keyspace: Keyspace,
    tasks: PartitionHandle,
    results: PartitionHandle,
    result_index: PartitionHandle,
    /// Serializes read-modify-write updates. Task flags are mutated from
    /// both the supervisor and the interrupt coordinator; without the
    /// lock one of the two writes can be lost.
    write_lock: Arc<Mutex<()>>,
}

impl TaskStore {
    /// Open (or create) the ledger at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = fjall::Config::new(path).open()?;
        let tasks =
            keyspace.open_partition(TASKS_PARTITION, PartitionCreateOptions::default())?;
        let results =
            keyspace.open_partition(RESULTS_PARTITION, PartitionCreateOptions::default())?;
        let result_index = keyspace
            .open_partition(RESULT_INDEX_PARTITION, PartitionCreateOptions::default())?;

        Ok(Self {
            keyspace,
            tasks,
            results,
            result_index,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Flush all partitions to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    // --- tasks ---

    pub fn insert_task(&self, task: &Task) -> Result<()> {
        let value = serde_json::to_vec(task)?;
        self.tasks.insert(keys::task_key(task.id), value)?;
        Ok(())
    }

    pub fn get_task(&self, id: Uuid) -> Result<Task> {
        match self.tasks.get(keys::task_key(id))? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Err(StoreError::TaskNotFound(id)),
        }
    }

    /// Read-modify-write a task, atomically with respect to other
    /// updates. Returns the updated record.
    pub fn update_task<F>(&self, id: Uuid, mutate: F) -> Result<Task>
    where
        F: FnOnce(&mut Task),
    {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut task = self.get_task(id)?;
        mutate(&mut task);
        self.insert_task(&task)?;
        Ok(task)
    }

    /// All tasks, in no particular order
    pub fn all_tasks(&self) -> Result<Vec<Task>> {
        let mut tasks = Vec::new();
        for entry in self.tasks.prefix(keys::TASK_PREFIX) {
            let (_, value) = entry?;
            tasks.push(serde_json::from_slice(&value)?);
        }
        Ok(tasks)
    }

    /// Oldest task (by `queued_at`) satisfying the predicate, if any.
    /// Drives the scheduler loops' queue semantics.
    pub fn next_eligible<P>(&self, pred: P) -> Result<Option<Task>>
    where
        P: Fn(&Task) -> bool,
    {
        let mut best: Option<Task> = None;
        for entry in self.tasks.prefix(keys::TASK_PREFIX) {
            let (_, value) = entry?;
            let task: Task = serde_json::from_slice(&value)?;
            if !pred(&task) {
                continue;
            }
            match &best {
                Some(current) if current.queued_at <= task.queued_at => {}
                _ => best = Some(task),
            }
        }
        Ok(best)
    }

    // --- results ---

    pub fn insert_result(&self, result: &TaskResult) -> Result<()> {
        let key = keys::result_key(result.task_id, result.index);
        let value = serde_json::to_vec(result)?;
        self.results.insert(&key, value)?;
        self.result_index
            .insert(keys::result_id_key(result.id), key.as_bytes())?;
        Ok(())
    }

    pub fn get_result(&self, id: Uuid) -> Result<TaskResult> {
        let key = self
            .result_index
            .get(keys::result_id_key(id))?
            .ok_or(StoreError::ResultNotFound(id))?;
        match self.results.get(&key)? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Err(StoreError::ResultNotFound(id)),
        }
    }

    /// Read-modify-write a result, atomically with respect to other
    /// updates. Returns the updated record.
    pub fn update_result<F>(&self, id: Uuid, mutate: F) -> Result<TaskResult>
    where
        F: FnOnce(&mut TaskResult),
    {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut result = self.get_result(id)?;
        mutate(&mut result);
        self.insert_result(&result)?;
        Ok(result)
    }

    /// All results of a task, ordered by index
    pub fn results_for_task(&self, task_id: Uuid) -> Result<Vec<TaskResult>> {
        let mut out = Vec::new();
        for entry in self.results.prefix(keys::result_scan_prefix(task_id)) {
            let (_, value) = entry?;
            out.push(serde_json::from_slice(&value)?);
        }
        Ok(out)
    }

    pub fn find_result_by_index(&self, task_id: Uuid, index: u32) -> Result<Option<TaskResult>> {
        match self.results.get(keys::result_key(task_id, index))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn find_result_by_item_id(
        &self,
        task_id: Uuid,
        item_id: &str,
    ) -> Result<Option<TaskResult>> {
        for entry in self.results.prefix(keys::result_scan_prefix(task_id)) {
            let (_, value) = entry?;
            let result: TaskResult = serde_json::from_slice(&value)?;
            if result.item_id.as_deref() == Some(item_id) {
                return Ok(Some(result));
            }
        }
        Ok(None)
    }

    /// Remove a task and every result it owns
    pub fn delete_task_cascade(&self, task_id: Uuid) -> Result<()> {
        let results = self.results_for_task(task_id)?;
        for result in results {
            self.result_index.remove(keys::result_id_key(result.id))?;
            self.results
                .remove(keys::result_key(task_id, result.index))?;
        }
        self.tasks.remove(keys::task_key(task_id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::{AudioFormat, QualityTier, VideoFormat};
    use chrono::Duration;
    use tempfile::TempDir;

    fn test_store() -> (TaskStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn make_task(url: &str) -> Task {
        Task::new(
            "local".into(),
            url.into(),
            AudioFormat::None,
            VideoFormat::Mp4,
            QualityTier::Best,
        )
    }

    #[test]
    fn test_task_roundtrip() {
        let (store, _dir) = test_store();
        let task = make_task("https://example.com/a");
        store.insert_task(&task).unwrap();

        let loaded = store.get_task(task.id).unwrap();
        assert_eq!(loaded.id, task.id);
        assert_eq!(loaded.url, task.url);
        assert!(!loaded.metadata_gathered);
    }

    #[test]
    fn test_get_missing_task() {
        let (store, _dir) = test_store();
        let id = Uuid::new_v4();
        assert!(matches!(
            store.get_task(id),
            Err(StoreError::TaskNotFound(missing)) if missing == id
        ));
    }

    #[test]
    fn test_update_task_flags() {
        let (store, _dir) = test_store();
        let task = make_task("https://example.com/a");
        store.insert_task(&task).unwrap();

        let updated = store
            .update_task(task.id, |t| t.metadata_gathered = true)
            .unwrap();
        assert!(updated.metadata_gathered);

        let reloaded = store.get_task(task.id).unwrap();
        assert!(reloaded.metadata_gathered);
    }

    #[test]
    fn test_next_eligible_picks_oldest() {
        let (store, _dir) = test_store();

        let mut newer = make_task("https://example.com/new");
        let mut older = make_task("https://example.com/old");
        older.queued_at = newer.queued_at - Duration::seconds(60);

        store.insert_task(&newer).unwrap();
        store.insert_task(&older).unwrap();

        let picked = store
            .next_eligible(Task::needs_metadata)
            .unwrap()
            .unwrap();
        assert_eq!(picked.id, older.id);

        // Once the older task moved past metadata it stops matching.
        older.metadata_gathered = true;
        store.insert_task(&older).unwrap();
        let picked = store
            .next_eligible(Task::needs_metadata)
            .unwrap()
            .unwrap();
        assert_eq!(picked.id, newer.id);

        // And nothing matches once both are done.
        newer.interrupted = true;
        store.insert_task(&newer).unwrap();
        assert!(store
            .next_eligible(Task::needs_metadata)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_results_ordered_by_index() {
        let (store, _dir) = test_store();
        let task = make_task("https://example.com/playlist");
        store.insert_task(&task).unwrap();

        // Insert out of order, including an index past two digits.
        for index in [3u32, 1, 12, 2] {
            store.insert_result(&TaskResult::new(task.id, index)).unwrap();
        }

        let results = store.results_for_task(task.id).unwrap();
        let indices: Vec<u32> = results.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 12]);
    }

    #[test]
    fn test_result_lookup_by_id_and_item_id() {
        let (store, _dir) = test_store();
        let task = make_task("https://example.com/playlist");
        store.insert_task(&task).unwrap();

        let mut result = TaskResult::new(task.id, 1);
        result.item_id = Some("abc123".into());
        store.insert_result(&result).unwrap();

        let by_id = store.get_result(result.id).unwrap();
        assert_eq!(by_id.index, 1);

        let by_item = store
            .find_result_by_item_id(task.id, "abc123")
            .unwrap()
            .unwrap();
        assert_eq!(by_item.id, result.id);

        assert!(store
            .find_result_by_item_id(task.id, "unknown")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_delete_task_cascade() {
        let (store, _dir) = test_store();
        let task = make_task("https://example.com/playlist");
        store.insert_task(&task).unwrap();

        let result = TaskResult::new(task.id, 1);
        store.insert_result(&result).unwrap();

        store.delete_task_cascade(task.id).unwrap();

        assert!(matches!(
            store.get_task(task.id),
            Err(StoreError::TaskNotFound(_))
        ));
        assert!(store.results_for_task(task.id).unwrap().is_empty());
        assert!(matches!(
            store.get_result(result.id),
            Err(StoreError::ResultNotFound(_))
        ));
    }

    #[test]
    fn test_concurrent_flag_updates_are_not_lost() {
        let (store, _dir) = test_store();

        // A cancel landing while the supervisor settles the task writes
        // a different flag from another thread; both must survive.
        for _ in 0..50 {
            let task = make_task("https://example.com/a");
            store.insert_task(&task).unwrap();

            let interrupter = store.clone();
            let finisher = store.clone();
            let id = task.id;

            let t1 = std::thread::spawn(move || {
                interrupter.update_task(id, |t| t.interrupted = true).unwrap();
            });
            let t2 = std::thread::spawn(move || {
                finisher.update_task(id, |t| t.downloaded = true).unwrap();
            });
            t1.join().unwrap();
            t2.join().unwrap();

            let settled = store.get_task(id).unwrap();
            assert!(settled.interrupted && settled.downloaded);
        }
    }

    #[test]
    fn test_reopen_preserves_data() {
        let dir = TempDir::new().unwrap();
        let task = make_task("https://example.com/a");
        {
            let store = TaskStore::open(dir.path()).unwrap();
            store.insert_task(&task).unwrap();
            store.persist().unwrap();
        }
        let store = TaskStore::open(dir.path()).unwrap();
        assert_eq!(store.get_task(task.id).unwrap().url, task.url);
    }
}
