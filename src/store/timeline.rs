use super::types::{TimelineEvent, TimelineEventType};
use super::{Store, StoreResult, limit_i64, new_id, now_rfc3339};
use serde_json::Value;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

fn map_event_row(row: &SqliteRow) -> StoreResult<TimelineEvent> {
    let type_raw: String = row.try_get("type")?;
    let payload_raw: String = row.try_get("payload_json")?;
    Ok(TimelineEvent {
        id: row.try_get("id")?,
        timestamp: row.try_get("timestamp")?,
        event_type: TimelineEventType::from_db(&type_raw)?,
        summary: row.try_get("summary")?,
        payload: serde_json::from_str(&payload_raw)?,
    })
}

impl Store {
    /// Append to the audit log. Events are never updated or deleted.
    pub async fn append_event(
        &self,
        event_type: TimelineEventType,
        summary: &str,
        payload: Value,
    ) -> StoreResult<TimelineEvent> {
        let id = new_id();
        let timestamp = now_rfc3339();
        let payload_json = serde_json::to_string(&payload)?;

        sqlx::query(
            "INSERT INTO timeline_events (id, timestamp, type, summary, payload_json)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&id)
        .bind(&timestamp)
        .bind(event_type.as_db())
        .bind(summary)
        .bind(&payload_json)
        .execute(&self.pool)
        .await?;

        Ok(TimelineEvent {
            id,
            timestamp,
            event_type,
            summary: summary.to_string(),
            payload,
        })
    }

    /// Newest first.
    pub async fn timeline(
        &self,
        limit: usize,
        event_type: Option<TimelineEventType>,
    ) -> StoreResult<Vec<TimelineEvent>> {
        let rows = if let Some(event_type) = event_type {
            sqlx::query(
                "SELECT id, timestamp, type, summary, payload_json FROM timeline_events
                 WHERE type = $1 ORDER BY timestamp DESC, rowid DESC LIMIT $2",
            )
            .bind(event_type.as_db())
            .bind(limit_i64(limit))
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT id, timestamp, type, summary, payload_json FROM timeline_events
                 ORDER BY timestamp DESC, rowid DESC LIMIT $1",
            )
            .bind(limit_i64(limit))
            .fetch_all(&self.pool)
            .await?
        };
        rows.iter().map(map_event_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn newest_first_with_type_filter() {
        let store = Store::in_memory().await.unwrap();
        store
            .append_event(TimelineEventType::System, "boot", json!({"key": "value"}))
            .await
            .unwrap();
        store
            .append_event(TimelineEventType::Error, "boom", json!({}))
            .await
            .unwrap();
        store
            .append_event(TimelineEventType::System, "later", json!({}))
            .await
            .unwrap();

        let all = store.timeline(10, None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].summary, "later");
        assert_eq!(all[2].payload["key"], "value");

        let errors = store
            .timeline(10, Some(TimelineEventType::Error))
            .await
            .unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].summary, "boom");

        assert_eq!(store.timeline(1, None).await.unwrap().len(), 1);
    }
}
