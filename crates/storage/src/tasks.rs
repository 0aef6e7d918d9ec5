//! Task rows and priority maintenance.
//!
//! Invariant: among a user's incomplete tasks, priorities form the contiguous
//! sequence `1..=N` with no duplicates (partial unique index). Completed tasks
//! keep their last priority but sit outside the constraint and the compaction
//! domain. Callers serialize mutations with `lock_user_tasks`.

use chrono::Utc;
use quill_core::{validate_reorder, Task, TaskOrdering};
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::error::StorageError;
use crate::store::{assert_user_scope, Tx};

const TASK_COLUMNS: &str = "id, user_id, title, description, priority, is_completed,
     completed_at, due_date, source_session_id, created_at, updated_at";

/// Gap used to park priorities out of the live range during renumbering.
/// Single-statement updates check uniqueness per row, so shifts go through
/// this parking range first.
const PRIORITY_PARK_OFFSET: i32 = 1_000_000;

fn row_to_task(row: &PgRow) -> Result<Task, StorageError> {
    Ok(Task {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        priority: row.try_get("priority")?,
        is_completed: row.try_get("is_completed")?,
        completed_at: row.try_get("completed_at")?,
        due_date: row.try_get("due_date")?,
        source_session_id: row.try_get("source_session_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl Tx {
    /// Insert a task. `requested_priority` is clamped to `1..=N+1`; absent, the
    /// task lands at the end of the incomplete list. Peers at or below the
    /// requested slot shift down by one.
    pub async fn insert_task(
        &mut self,
        user_id: &str,
        title: &str,
        description: Option<&str>,
        requested_priority: Option<i32>,
        due_date: Option<chrono::NaiveDate>,
        source_session_id: Option<&str>,
    ) -> Result<Task, StorageError> {
        assert_user_scope(user_id);
        let count = self.count_incomplete_tasks(user_id).await?;
        let end = count + 1;
        let priority = requested_priority.map_or(end, |p| p.clamp(1, end));

        if priority < end {
            // Park then shift so the unique index never sees a transient clash.
            sqlx::query(
                "UPDATE tasks SET priority = priority + $1
                 WHERE user_id = $2 AND NOT is_completed AND priority >= $3",
            )
            .bind(PRIORITY_PARK_OFFSET)
            .bind(user_id)
            .bind(priority)
            .execute(self.conn())
            .await?;
            sqlx::query(
                "UPDATE tasks SET priority = priority - $1 + 1, updated_at = NOW()
                 WHERE user_id = $2 AND NOT is_completed AND priority > $1",
            )
            .bind(PRIORITY_PARK_OFFSET)
            .bind(user_id)
            .execute(self.conn())
            .await?;
        }

        let task = Task::new(
            quill_core::new_id(),
            user_id.to_owned(),
            title.to_owned(),
            description.map(ToOwned::to_owned),
            priority,
            due_date,
            source_session_id.map(ToOwned::to_owned),
        );
        sqlx::query(&format!(
            "INSERT INTO tasks ({TASK_COLUMNS}) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)"
        ))
        .bind(&task.id)
        .bind(&task.user_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.priority)
        .bind(task.is_completed)
        .bind(task.completed_at)
        .bind(task.due_date)
        .bind(&task.source_session_id)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(self.conn())
        .await?;
        Ok(task)
    }

    /// One task, scoped to its owner.
    pub async fn get_task_for_user(
        &mut self,
        user_id: &str,
        task_id: &str,
    ) -> Result<Option<Task>, StorageError> {
        assert_user_scope(user_id);
        let row = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND user_id = $2"
        ))
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(self.conn())
        .await?;
        row.map(|r| row_to_task(&r)).transpose()
    }

    /// Canonical listing order: incomplete by priority, then completed by
    /// completion time descending.
    pub async fn list_tasks(
        &mut self,
        user_id: &str,
        include_completed: bool,
    ) -> Result<Vec<Task>, StorageError> {
        assert_user_scope(user_id);
        let sql = if include_completed {
            format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = $1
                 ORDER BY is_completed ASC, priority ASC, created_at ASC"
            )
        } else {
            format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = $1 AND NOT is_completed
                 ORDER BY priority ASC, created_at ASC"
            )
        };
        let rows = sqlx::query(&sql).bind(user_id).fetch_all(self.conn()).await?;
        rows.iter().map(row_to_task).collect()
    }

    /// Update mutable task fields. `None` leaves a field untouched.
    pub async fn update_task(
        &mut self,
        user_id: &str,
        task_id: &str,
        title: Option<&str>,
        description: Option<&str>,
        due_date: Option<chrono::NaiveDate>,
    ) -> Result<Task, StorageError> {
        assert_user_scope(user_id);
        let result = sqlx::query(
            "UPDATE tasks SET
               title = COALESCE($1, title),
               description = COALESCE($2, description),
               due_date = COALESCE($3, due_date),
               updated_at = NOW()
             WHERE id = $4 AND user_id = $5",
        )
        .bind(title)
        .bind(description)
        .bind(due_date)
        .bind(task_id)
        .bind(user_id)
        .execute(self.conn())
        .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("task", task_id));
        }
        self.get_task_for_user(user_id, task_id)
            .await?
            .ok_or_else(|| StorageError::not_found("task", task_id))
    }

    /// Mark a task completed and recompact the remaining incomplete tasks.
    /// The completed task keeps its priority value.
    pub async fn complete_task(
        &mut self,
        user_id: &str,
        task_id: &str,
    ) -> Result<Task, StorageError> {
        assert_user_scope(user_id);
        let task = self
            .get_task_for_user(user_id, task_id)
            .await?
            .ok_or_else(|| StorageError::not_found("task", task_id))?;
        if task.is_completed {
            return Err(StorageError::Conflict(format!("task already completed: {task_id}")));
        }

        sqlx::query(
            "UPDATE tasks SET is_completed = TRUE, completed_at = $1, updated_at = NOW()
             WHERE id = $2 AND user_id = $3",
        )
        .bind(Utc::now())
        .bind(task_id)
        .bind(user_id)
        .execute(self.conn())
        .await?;

        self.recompact_task_priorities(user_id).await?;
        self.get_task_for_user(user_id, task_id)
            .await?
            .ok_or_else(|| StorageError::not_found("task", task_id))
    }

    /// Delete a task and recompact. Returns whether a row was deleted.
    pub async fn delete_task(&mut self, user_id: &str, task_id: &str) -> Result<bool, StorageError> {
        assert_user_scope(user_id);
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(task_id)
            .bind(user_id)
            .execute(self.conn())
            .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        self.recompact_task_priorities(user_id).await?;
        Ok(true)
    }

    /// Apply a full reordering of the user's incomplete tasks.
    ///
    /// `orderings` must be a bijection between the incomplete task ids and
    /// `1..=N`; anything else is rejected with `Conflict` and nothing changes.
    pub async fn reorder_tasks(
        &mut self,
        user_id: &str,
        orderings: &[TaskOrdering],
    ) -> Result<(), StorageError> {
        assert_user_scope(user_id);
        let incomplete_ids = self.incomplete_task_ids(user_id).await?;
        validate_reorder(&incomplete_ids, orderings).map_err(StorageError::Conflict)?;

        sqlx::query(
            "UPDATE tasks SET priority = priority + $1
             WHERE user_id = $2 AND NOT is_completed",
        )
        .bind(PRIORITY_PARK_OFFSET)
        .bind(user_id)
        .execute(self.conn())
        .await?;

        for ordering in orderings {
            sqlx::query(
                "UPDATE tasks SET priority = $1, updated_at = NOW()
                 WHERE id = $2 AND user_id = $3",
            )
            .bind(ordering.new_priority)
            .bind(&ordering.task_id)
            .bind(user_id)
            .execute(self.conn())
            .await?;
        }
        Ok(())
    }

    /// Renumber incomplete tasks to `1..=N`, preserving their relative order.
    pub async fn recompact_task_priorities(&mut self, user_id: &str) -> Result<(), StorageError> {
        assert_user_scope(user_id);
        sqlx::query(
            "UPDATE tasks SET priority = priority + $1
             WHERE user_id = $2 AND NOT is_completed",
        )
        .bind(PRIORITY_PARK_OFFSET)
        .bind(user_id)
        .execute(self.conn())
        .await?;

        sqlx::query(
            "UPDATE tasks t SET priority = ranked.rn, updated_at = NOW()
             FROM (
                 SELECT id, ROW_NUMBER() OVER (ORDER BY priority ASC, created_at ASC) AS rn
                 FROM tasks WHERE user_id = $1 AND NOT is_completed
             ) ranked
             WHERE t.id = ranked.id",
        )
        .bind(user_id)
        .execute(self.conn())
        .await?;
        Ok(())
    }

    /// Ids of the user's incomplete tasks in priority order.
    pub async fn incomplete_task_ids(&mut self, user_id: &str) -> Result<Vec<String>, StorageError> {
        assert_user_scope(user_id);
        let rows = sqlx::query(
            "SELECT id FROM tasks WHERE user_id = $1 AND NOT is_completed ORDER BY priority ASC",
        )
        .bind(user_id)
        .fetch_all(self.conn())
        .await?;
        rows.iter().map(|r| r.try_get("id").map_err(Into::into)).collect()
    }

    async fn count_incomplete_tasks(&mut self, user_id: &str) -> Result<i32, StorageError> {
        let row =
            sqlx::query("SELECT COUNT(*) AS n FROM tasks WHERE user_id = $1 AND NOT is_completed")
                .bind(user_id)
                .fetch_one(self.conn())
                .await?;
        let n: i64 = row.try_get("n")?;
        Ok(i32::try_from(n).unwrap_or(i32::MAX))
    }
}
