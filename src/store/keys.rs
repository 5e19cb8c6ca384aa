//! Key encoding for the ledger partitions
//!
//! - `tasks` partition:        `task:{uuid}` -> Task (JSON)
//! - `results` partition:      `res:{task_uuid}:{index:06}` -> TaskResult (JSON)
//! - `result_index` partition: `rid:{result_uuid}` -> results key
//!
//! The zero-padded index keeps a prefix scan over `res:{task_uuid}:`
//! lexicographically ordered by playlist position.

use uuid::Uuid;

pub const TASK_PREFIX: &str = "task:";
pub const RESULT_PREFIX: &str = "res:";
pub const RESULT_ID_PREFIX: &str = "rid:";

pub fn task_key(id: Uuid) -> String {
    format!("{TASK_PREFIX}{id}")
}

pub fn result_key(task_id: Uuid, index: u32) -> String {
    format!("{RESULT_PREFIX}{task_id}:{index:06}")
}

pub fn result_scan_prefix(task_id: Uuid) -> String {
    format!("{RESULT_PREFIX}{task_id}:")
}

pub fn result_id_key(result_id: Uuid) -> String {
    format!("{RESULT_ID_PREFIX}{result_id}")
}
