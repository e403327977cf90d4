use super::types::{SystemStats, TaskStatus};
use super::{Store, StoreResult};
use chrono::Utc;

impl Store {
    pub async fn system_stats(&self) -> StoreResult<SystemStats> {
        let (memories, timeline_events, approvals_pending, approvals_total): (i64, i64, i64, i64) =
            sqlx::query_as(
                "SELECT
                     (SELECT COUNT(*) FROM memories),
                     (SELECT COUNT(*) FROM timeline_events),
                     (SELECT COUNT(*) FROM approvals WHERE status = 'pending'),
                     (SELECT COUNT(*) FROM approvals)",
            )
            .fetch_one(&self.pool)
            .await?;

        let task_counts: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM tasks GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut stats = SystemStats {
            memories,
            timeline_events,
            approvals_pending,
            approvals_total,
            cost_today_cents: self.daily_cost(Utc::now().date_naive()).await?,
            ..SystemStats::default()
        };

        for (status, count) in task_counts {
            match TaskStatus::from_db(&status)? {
                TaskStatus::Planning => stats.tasks_planning = count,
                TaskStatus::Executing => stats.tasks_executing = count,
                TaskStatus::Paused => stats.tasks_paused = count,
                TaskStatus::Completed => stats.tasks_completed = count,
                TaskStatus::Failed => stats.tasks_failed = count,
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryKind, NewMemory, TimelineEventType};
    use serde_json::json;

    #[tokio::test]
    async fn counts_every_table() {
        let store = Store::in_memory().await.unwrap();
        store.create_task("a", &[]).await.unwrap();
        store.create_task("b", &[]).await.unwrap();
        store
            .claim_next_task(&[TaskStatus::Planning])
            .await
            .unwrap();
        store
            .add_memory(&NewMemory::new(MemoryKind::Fact, "x"))
            .await
            .unwrap();
        store
            .append_event(TimelineEventType::System, "boot", json!({}))
            .await
            .unwrap();

        let stats = store.system_stats().await.unwrap();
        assert_eq!(stats.memories, 1);
        assert_eq!(stats.timeline_events, 1);
        assert_eq!(stats.tasks_planning, 1);
        assert_eq!(stats.tasks_executing, 1);
        assert_eq!(stats.tasks_open(), 2);
        assert_eq!(stats.approvals_pending, 0);
    }
}
