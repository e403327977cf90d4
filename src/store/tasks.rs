use super::types::{Task, TaskStatus};
use super::{Store, StoreResult, limit_i64, new_id, now_rfc3339};
use crate::error::StoreError;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

const TASK_COLUMNS: &str = "id, goal, status, plan_json, result_summary, created_at, updated_at";

fn map_task_row(row: &SqliteRow) -> StoreResult<Task> {
    let status_raw: String = row.try_get("status")?;
    let plan_raw: String = row.try_get("plan_json")?;
    Ok(Task {
        id: row.try_get("id")?,
        goal: row.try_get("goal")?,
        status: TaskStatus::from_db(&status_raw)?,
        plan: serde_json::from_str(&plan_raw)?,
        result_summary: row.try_get("result_summary")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// `'a', 'b'` list for an `IN (...)` clause. Values come from
/// [`TaskStatus::as_db`], never from user input.
fn status_list(statuses: &[TaskStatus]) -> String {
    statuses
        .iter()
        .map(|s| format!("'{}'", s.as_db()))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Store {
    /// Insert a new task in `planning`.
    pub async fn create_task(&self, goal: &str, plan: &[String]) -> StoreResult<Task> {
        let id = new_id();
        let timestamp = now_rfc3339();
        let plan_json = serde_json::to_string(plan)?;

        sqlx::query(
            "INSERT INTO tasks (id, goal, status, plan_json, result_summary, created_at, updated_at)
             VALUES ($1, $2, 'planning', $3, NULL, $4, $4)",
        )
        .bind(&id)
        .bind(goal)
        .bind(&plan_json)
        .bind(&timestamp)
        .execute(&self.pool)
        .await?;

        Ok(Task {
            id,
            goal: goal.to_string(),
            status: TaskStatus::Planning,
            plan: plan.to_vec(),
            result_summary: None,
            created_at: timestamp.clone(),
            updated_at: timestamp,
        })
    }

    pub async fn get_task(&self, id: &str) -> StoreResult<Option<Task>> {
        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_task_row).transpose()
    }

    /// Most recently updated first.
    pub async fn list_tasks(
        &self,
        limit: usize,
        status: Option<TaskStatus>,
    ) -> StoreResult<Vec<Task>> {
        let rows = if let Some(status) = status {
            sqlx::query(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE status = $1
                 ORDER BY updated_at DESC LIMIT $2"
            ))
            .bind(status.as_db())
            .bind(limit_i64(limit))
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks ORDER BY updated_at DESC LIMIT $1"
            ))
            .bind(limit_i64(limit))
            .fetch_all(&self.pool)
            .await?
        };
        rows.iter().map(map_task_row).collect()
    }

    pub async fn count_open_tasks(&self) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM tasks WHERE status IN ({})",
            status_list(&TaskStatus::OPEN)
        ))
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Atomically pick the task among `eligible` with the oldest `updated_at`
    /// and flip it to `executing`. Statuses that cannot precede `executing`
    /// are ignored.
    pub async fn claim_next_task(&self, eligible: &[TaskStatus]) -> StoreResult<Option<Task>> {
        let eligible: Vec<TaskStatus> = eligible
            .iter()
            .copied()
            .filter(|s| s.can_transition_to(TaskStatus::Executing))
            .collect();
        if eligible.is_empty() {
            return Ok(None);
        }

        let list = status_list(&eligible);
        let row = sqlx::query(&format!(
            "UPDATE tasks SET status = 'executing', updated_at = $1
             WHERE id = (
                 SELECT id FROM tasks WHERE status IN ({list})
                 ORDER BY updated_at ASC, rowid ASC LIMIT 1
             )
             AND status IN ({list})
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(now_rfc3339())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_task_row).transpose()
    }

    /// Move a task along the status graph. The update only applies when the
    /// stored status is a legal predecessor of `to`.
    pub async fn transition_task(
        &self,
        id: &str,
        to: TaskStatus,
        result_summary: Option<&str>,
    ) -> StoreResult<Task> {
        let predecessors = to.predecessors();
        if !predecessors.is_empty() {
            let row = sqlx::query(&format!(
                "UPDATE tasks
                 SET status = $1,
                     result_summary = COALESCE($2, result_summary),
                     updated_at = $3
                 WHERE id = $4 AND status IN ({})
                 RETURNING {TASK_COLUMNS}",
                status_list(predecessors)
            ))
            .bind(to.as_db())
            .bind(result_summary)
            .bind(now_rfc3339())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(row) = row {
                return map_task_row(&row);
            }
        }

        match self.get_task(id).await? {
            None => Err(StoreError::NotFound {
                kind: "task",
                id: id.to_string(),
            }),
            Some(task) => Err(StoreError::InvalidTransition {
                id: id.to_string(),
                from: task.status.to_string(),
                to: to.to_string(),
            }),
        }
    }
}
