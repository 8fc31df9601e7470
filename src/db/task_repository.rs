use crate::db::user_repository::from_micros;
use crate::db::Database;
use crate::errors::AppError;
use crate::models::task::{NewTask, Task, TaskPatch};
use bincode::{Decode, Encode};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{CompareAndSwapError, Transactional, Tree};
use std::str;
use tracing::{info, warn};
use uuid::Uuid;

/// `{owner}/{task id}` -> task. The owner is part of every lookup key.
const TASKS_TREE: &str = "tasks";
/// `{owner}/{sequence, big endian}` -> task id, for newest-first listing.
const TASK_ORDER_TREE: &str = "task_order";

const NOT_FOUND: &str = "Task not found";

#[derive(Debug, Encode, Decode)]
struct StoredTask {
    id: String,
    user_id: String,
    title: String,
    description: String,
    completed: bool,
    seq: u64,
    created_at: i64,
    updated_at: i64,
}

impl StoredTask {
    fn from_task(task: &Task, seq: u64) -> Self {
        StoredTask {
            id: task.id.clone(),
            user_id: task.user_id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            completed: task.completed,
            seq,
            created_at: task.created_at.timestamp_micros(),
            updated_at: task.updated_at.timestamp_micros(),
        }
    }
}

impl From<StoredTask> for Task {
    fn from(stored: StoredTask) -> Self {
        Task {
            id: stored.id,
            title: stored.title,
            description: stored.description,
            completed: stored.completed,
            user_id: stored.user_id,
            created_at: from_micros(stored.created_at),
            updated_at: from_micros(stored.updated_at),
        }
    }
}

pub struct TaskRepository {
    db: Database,
}

impl TaskRepository {
    pub fn new(db: Database) -> Self {
        TaskRepository { db }
    }

    fn tree(&self, name: &str) -> Result<Tree, AppError> {
        Ok(self.db.db.open_tree(name)?)
    }

    /// All tasks of `owner`, newest first.
    pub async fn list(&self, owner: &str) -> Result<Vec<Task>, AppError> {
        let tasks_tree = self.tree(TASKS_TREE)?;
        let order_tree = self.tree(TASK_ORDER_TREE)?;

        let mut tasks = Vec::new();
        for entry in order_tree.scan_prefix(owner_prefix(owner)).rev() {
            let (_, task_id) = entry?;
            let task_id = str::from_utf8(&task_id)
                .map_err(|e| AppError::Internal(format!("Invalid task ID in order index: {}", e)))?;

            // A delete in progress may have removed the task before its order entry.
            if let Some(data) = tasks_tree.get(task_key(owner, task_id))? {
                tasks.push(Task::from(decode(&data)?));
            }
        }

        Ok(tasks)
    }

    pub async fn create(&self, owner: &str, input: NewTask) -> Result<Task, AppError> {
        let input = input.normalized();
        let violations = input.validate();
        if !violations.is_empty() {
            return Err(AppError::Validation(violations));
        }

        let tasks_tree = self.tree(TASKS_TREE)?;
        let order_tree = self.tree(TASK_ORDER_TREE)?;

        let now = now_micros();
        let task = Task {
            id: Uuid::new_v4().to_string(),
            title: input.title.unwrap_or_default(),
            description: input.description.unwrap_or_default(),
            completed: false,
            user_id: owner.to_string(),
            created_at: now,
            updated_at: now,
        };
        let seq = self.db.db.generate_id()?;
        let key = task_key(owner, &task.id);
        let stored = encode(&StoredTask::from_task(&task, seq))?;
        let order = order_key(owner, seq);

        (&tasks_tree, &order_tree)
            .transaction(|(tasks, order_index)| {
                tasks.insert(key.as_slice(), stored.as_slice())?;
                order_index.insert(order.as_slice(), task.id.as_bytes())?;
                Ok::<_, ConflictableTransactionError<AppError>>(())
            })
            .map_err(transaction_error)?;

        info!(user_id = %owner, task_id = %task.id, "Task created in database");

        Ok(task)
    }

    pub async fn find(&self, owner: &str, id: &str) -> Result<Option<Task>, AppError> {
        if Uuid::parse_str(id).is_err() {
            return Ok(None);
        }

        let tasks_tree = self.tree(TASKS_TREE)?;
        match tasks_tree.get(task_key(owner, id))? {
            Some(data) => Ok(Some(Task::from(decode(&data)?))),
            None => Ok(None),
        }
    }

    /// Applies `patch` to the owner's task. Concurrent writers resolve last-write-wins.
    pub async fn update(&self, owner: &str, id: &str, patch: TaskPatch) -> Result<Task, AppError> {
        if Uuid::parse_str(id).is_err() {
            return Err(AppError::NotFound(NOT_FOUND.to_string()));
        }

        let tasks_tree = self.tree(TASKS_TREE)?;
        let key = task_key(owner, id);

        // Another owner's task is indistinguishable from a missing one, whatever the patch.
        if !tasks_tree.contains_key(&key)? {
            return Err(AppError::NotFound(NOT_FOUND.to_string()));
        }

        let patch = patch.normalized();
        let violations = patch.validate();
        if !violations.is_empty() {
            return Err(AppError::Validation(violations));
        }

        loop {
            let current = tasks_tree
                .get(&key)?
                .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
            let stored = decode(&current)?;
            let seq = stored.seq;

            let mut task = Task::from(stored);
            patch.apply_to(&mut task);
            task.updated_at = now_micros();
            let updated = encode(&StoredTask::from_task(&task, seq))?;

            match tasks_tree.compare_and_swap(&key, Some(&current), Some(updated))? {
                Ok(()) => {
                    info!(user_id = %owner, task_id = %id, "Task updated in database");
                    return Ok(task);
                }
                Err(CompareAndSwapError { current: None, .. }) => {
                    warn!(user_id = %owner, task_id = %id, "Task deleted during update");
                    return Err(AppError::NotFound(NOT_FOUND.to_string()));
                }
                // Someone else wrote in between; reapply on top of their version.
                Err(_) => continue,
            }
        }
    }

    pub async fn delete(&self, owner: &str, id: &str) -> Result<(), AppError> {
        if Uuid::parse_str(id).is_err() {
            return Err(AppError::NotFound(NOT_FOUND.to_string()));
        }

        let tasks_tree = self.tree(TASKS_TREE)?;
        let order_tree = self.tree(TASK_ORDER_TREE)?;

        let key = task_key(owner, id);

        (&tasks_tree, &order_tree)
            .transaction(|(tasks, order_index)| {
                let removed = tasks.remove(key.as_slice())?.ok_or_else(|| {
                    ConflictableTransactionError::Abort(AppError::NotFound(NOT_FOUND.to_string()))
                })?;
                let stored = decode(&removed).map_err(ConflictableTransactionError::Abort)?;
                order_index.remove(order_key(owner, stored.seq))?;
                Ok::<_, ConflictableTransactionError<AppError>>(())
            })
            .map_err(transaction_error)?;

        info!(user_id = %owner, task_id = %id, "Task deleted from database");

        Ok(())
    }
}

// Stored timestamps have microsecond precision; returned tasks match what is stored.
fn now_micros() -> chrono::DateTime<chrono::Utc> {
    from_micros(chrono::Utc::now().timestamp_micros())
}

fn transaction_error(err: TransactionError<AppError>) -> AppError {
    match err {
        TransactionError::Abort(err) => err,
        TransactionError::Storage(err) => AppError::Storage(err),
    }
}

fn owner_prefix(owner: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(owner.len() + 1);
    prefix.extend_from_slice(owner.as_bytes());
    prefix.push(b'/');
    prefix
}

fn task_key(owner: &str, task_id: &str) -> Vec<u8> {
    let mut key = owner_prefix(owner);
    key.extend_from_slice(task_id.as_bytes());
    key
}

fn order_key(owner: &str, seq: u64) -> Vec<u8> {
    let mut key = owner_prefix(owner);
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

fn encode(stored: &StoredTask) -> Result<Vec<u8>, AppError> {
    bincode::encode_to_vec(stored, bincode::config::standard())
        .map_err(|e| AppError::Internal(format!("Failed to encode task: {}", e)))
}

fn decode(data: &[u8]) -> Result<StoredTask, AppError> {
    let (stored, _): (StoredTask, usize) =
        bincode::decode_from_slice(data, bincode::config::standard())
            .map_err(|e| AppError::Internal(format!("Failed to decode task: {}", e)))?;
    Ok(stored)
}
