use super::types::{CalendarEvent, CalendarEventInput, CalendarStatus};
use super::{Store, StoreResult, limit_i64, new_id, now_rfc3339};
use crate::error::StoreError;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

const CALENDAR_COLUMNS: &str =
    "id, title, starts_at, ends_at, type, status, notes, created_at, updated_at";

fn map_calendar_row(row: &SqliteRow) -> StoreResult<CalendarEvent> {
    let status_raw: String = row.try_get("status")?;
    Ok(CalendarEvent {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        starts_at: row.try_get("starts_at")?,
        ends_at: row.try_get("ends_at")?,
        event_type: row.try_get("type")?,
        status: CalendarStatus::from_db(&status_raw)?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl Store {
    /// Insert, or overwrite every field but `created_at` when the id exists.
    pub async fn upsert_calendar_event(
        &self,
        input: &CalendarEventInput,
    ) -> StoreResult<CalendarEvent> {
        let id = input.id.clone().unwrap_or_else(new_id);
        let timestamp = now_rfc3339();

        let row = sqlx::query(&format!(
            "INSERT INTO calendar_events
                 (id, title, starts_at, ends_at, type, status, notes, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 starts_at = excluded.starts_at,
                 ends_at = excluded.ends_at,
                 type = excluded.type,
                 status = excluded.status,
                 notes = excluded.notes,
                 updated_at = excluded.updated_at
             RETURNING {CALENDAR_COLUMNS}"
        ))
        .bind(&id)
        .bind(&input.title)
        .bind(&input.starts_at)
        .bind(input.ends_at.as_deref())
        .bind(input.event_type.as_deref().unwrap_or("task"))
        .bind(input.status.as_db())
        .bind(input.notes.as_deref())
        .bind(&timestamp)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => map_calendar_row(&row),
            None => Err(StoreError::NotFound {
                kind: "calendar event",
                id,
            }),
        }
    }

    /// Soonest first.
    pub async fn calendar_events(&self, limit: usize) -> StoreResult<Vec<CalendarEvent>> {
        let rows = sqlx::query(&format!(
            "SELECT {CALENDAR_COLUMNS} FROM calendar_events ORDER BY starts_at ASC LIMIT $1"
        ))
        .bind(limit_i64(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(map_calendar_row).collect()
    }
}
