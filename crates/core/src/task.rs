//! Task list types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One item on the user's task list.
///
/// `priority` is a positive integer; among a user's incomplete tasks the
/// priorities always form the contiguous sequence `1..=N`. Completed tasks
/// keep their last priority but no longer participate in reordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Short imperative summary
    pub title: String,
    /// Optional longer description
    pub description: Option<String>,
    /// Position among incomplete tasks, 1-based
    pub priority: i32,
    /// Completion flag
    pub is_completed: bool,
    /// When the task was completed
    pub completed_at: Option<DateTime<Utc>>,
    /// Optional due date
    pub due_date: Option<NaiveDate>,
    /// Session the agent extracted this task from, if any
    pub source_session_id: Option<String>,
    /// Row creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new incomplete task.
    #[must_use]
    pub fn new(
        id: String,
        user_id: String,
        title: String,
        description: Option<String>,
        priority: i32,
        due_date: Option<NaiveDate>,
        source_session_id: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            title,
            description,
            priority,
            is_completed: false,
            completed_at: None,
            due_date,
            source_session_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One `(task, new priority)` pair in a reorder request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOrdering {
    pub task_id: String,
    pub new_priority: i32,
}

/// Check that `orderings` is a bijection between `incomplete_ids` and `1..=N`.
///
/// Returns a human-readable reason when the check fails. The caller rejects
/// the reorder with a conflict in that case; nothing is applied.
pub fn validate_reorder(
    incomplete_ids: &[String],
    orderings: &[TaskOrdering],
) -> Result<(), String> {
    let n = incomplete_ids.len();
    if orderings.len() != n {
        return Err(format!(
            "reorder must cover all {n} incomplete tasks, got {} entries",
            orderings.len()
        ));
    }

    let mut seen_ids = std::collections::HashSet::with_capacity(n);
    let mut seen_priorities = std::collections::HashSet::with_capacity(n);
    for ordering in orderings {
        if !incomplete_ids.iter().any(|id| id == &ordering.task_id) {
            return Err(format!("unknown or completed task: {}", ordering.task_id));
        }
        if !seen_ids.insert(ordering.task_id.as_str()) {
            return Err(format!("duplicate task in reorder: {}", ordering.task_id));
        }
        let priority = ordering.new_priority;
        if priority < 1 || priority as usize > n {
            return Err(format!("priority {priority} outside 1..={n}"));
        }
        if !seen_priorities.insert(priority) {
            return Err(format!("duplicate priority in reorder: {priority}"));
        }
    }
    Ok(())
}
