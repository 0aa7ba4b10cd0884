//! User corrections and their replayable log.
//!
//! Every change a user makes to glyph classification goes through a
//! [`Task`]. Performing a task validates it, updates the glyph nest and
//! computes its [`Impact`]: the first stage to re-run and the scope it needs.
//! The [`TaskLog`] keeps the performed tasks in order; it serializes to JSON
//! and can be replayed on a fresh pipeline of the same sheet.

pub mod impact;
pub mod task;

pub use impact::Impact;
pub use task::{CommandRejected, Task, TaskRecord};

use crate::pipeline::Pipeline;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskLog {
    records: Vec<TaskRecord>,
}

impl TaskLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, record: TaskRecord) -> &TaskRecord {
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    pub fn next_seq(&self) -> usize {
        self.records.len() + 1
    }

    pub fn records(&self) -> &[TaskRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| format!("Failed to serialize task log: {e}"))
    }

    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("Failed to parse task log: {e}"))
    }

    /// Perform every recorded task on `pipeline`, in order.
    ///
    /// The pipeline must have loaded the same glyphs the log was recorded
    /// on; compound glyph ids are then reproduced as well. Returns the
    /// number of tasks applied.
    pub fn replay(&self, pipeline: &mut Pipeline) -> Result<usize, CommandRejected> {
        for record in &self.records {
            let applied = pipeline.apply(record.task.clone())?;
            if applied.compound != record.compound {
                return Err(CommandRejected::new(format!(
                    "task {} produced compound {:?}, log says {:?}",
                    record.seq, applied.compound, record.compound
                )));
            }
        }
        Ok(self.records.len())
    }
}
