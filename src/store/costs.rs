use super::types::CostRecord;
use super::{Store, StoreResult, now_rfc3339};
use chrono::NaiveDate;

/// Ledger key for a calendar day.
pub(crate) fn date_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

impl Store {
    pub async fn record_cost(&self, record: &CostRecord) -> StoreResult<()> {
        #[allow(clippy::cast_possible_wrap)]
        let (input, output) = (record.input_tokens as i64, record.output_tokens as i64);
        sqlx::query(
            "INSERT INTO cost_tracking (date, model, input_tokens, output_tokens, cost_cents, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&record.date)
        .bind(&record.model)
        .bind(input)
        .bind(output)
        .bind(record.cost_cents.max(0.0))
        .bind(now_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Sum of recorded cost for one day, in cents.
    pub async fn daily_cost(&self, day: NaiveDate) -> StoreResult<f64> {
        let (total,): (f64,) = sqlx::query_as(
            "SELECT CAST(COALESCE(SUM(cost_cents), 0) AS REAL) FROM cost_tracking WHERE date = $1",
        )
        .bind(date_key(day))
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    /// `(date, total_cents)` for each day on or after `since`, oldest first.
    pub async fn recent_costs(&self, since: NaiveDate) -> StoreResult<Vec<(String, f64)>> {
        let rows: Vec<(String, f64)> = sqlx::query_as(
            "SELECT date, CAST(COALESCE(SUM(cost_cents), 0) AS REAL)
             FROM cost_tracking WHERE date >= $1
             GROUP BY date ORDER BY date ASC",
        )
        .bind(date_key(since))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
