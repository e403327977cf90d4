use super::types::{Approval, ApprovalRequest, ApprovalStatus};
use super::{Store, StoreResult, limit_i64, new_id, now_rfc3339};
use crate::error::StoreError;
use crate::security::RiskLevel;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

const APPROVAL_COLUMNS: &str =
    "id, status, tool, args_json, risk_level, reason, requested_at, resolved_at, resolved_by";

fn map_approval_row(row: &SqliteRow) -> StoreResult<Approval> {
    let status_raw: String = row.try_get("status")?;
    let args_raw: String = row.try_get("args_json")?;
    let risk_raw: i64 = row.try_get("risk_level")?;
    let risk_level = u8::try_from(risk_raw)
        .ok()
        .and_then(|v| RiskLevel::try_from(v).ok())
        .ok_or_else(|| StoreError::Decode {
            column: "approvals.risk_level",
            value: risk_raw.to_string(),
        })?;

    Ok(Approval {
        id: row.try_get("id")?,
        status: ApprovalStatus::from_db(&status_raw)?,
        request: ApprovalRequest {
            tool: row.try_get("tool")?,
            args: serde_json::from_str(&args_raw)?,
            risk_level,
            reason: row.try_get("reason")?,
        },
        requested_at: row.try_get("requested_at")?,
        resolved_at: row.try_get("resolved_at")?,
        resolved_by: row.try_get("resolved_by")?,
    })
}

impl Store {
    pub async fn create_approval(&self, request: &ApprovalRequest) -> StoreResult<Approval> {
        let id = new_id();
        let requested_at = now_rfc3339();
        let args_json = serde_json::to_string(&request.args)?;

        sqlx::query(
            "INSERT INTO approvals (id, status, tool, args_json, risk_level, reason, requested_at)
             VALUES ($1, 'pending', $2, $3, $4, $5, $6)",
        )
        .bind(&id)
        .bind(&request.tool)
        .bind(&args_json)
        .bind(i64::from(request.risk_level.as_u8()))
        .bind(&request.reason)
        .bind(&requested_at)
        .execute(&self.pool)
        .await?;

        Ok(Approval {
            id,
            status: ApprovalStatus::Pending,
            request: request.clone(),
            requested_at,
            resolved_at: None,
            resolved_by: None,
        })
    }

    pub async fn get_approval(&self, id: &str) -> StoreResult<Option<Approval>> {
        let row = sqlx::query(&format!(
            "SELECT {APPROVAL_COLUMNS} FROM approvals WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(map_approval_row).transpose()
    }

    /// Newest first.
    pub async fn list_approvals(
        &self,
        status: Option<ApprovalStatus>,
        limit: usize,
    ) -> StoreResult<Vec<Approval>> {
        let rows = if let Some(status) = status {
            sqlx::query(&format!(
                "SELECT {APPROVAL_COLUMNS} FROM approvals WHERE status = $1
                 ORDER BY requested_at DESC LIMIT $2"
            ))
            .bind(status.as_db())
            .bind(limit_i64(limit))
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(&format!(
                "SELECT {APPROVAL_COLUMNS} FROM approvals ORDER BY requested_at DESC LIMIT $1"
            ))
            .bind(limit_i64(limit))
            .fetch_all(&self.pool)
            .await?
        };
        rows.iter().map(map_approval_row).collect()
    }

    pub async fn pending_approvals(&self) -> StoreResult<Vec<Approval>> {
        self.list_approvals(Some(ApprovalStatus::Pending), 100).await
    }

    pub async fn count_pending_approvals(&self) -> StoreResult<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM approvals WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Resolve a pending approval. Returns the updated row only if this call
    /// performed the resolution; `None` means the id is unknown or someone
    /// else resolved it first.
    pub async fn resolve_approval(
        &self,
        id: &str,
        status: ApprovalStatus,
        resolved_by: &str,
    ) -> StoreResult<Option<Approval>> {
        if status == ApprovalStatus::Pending {
            return Err(StoreError::InvalidTransition {
                id: id.to_string(),
                from: "pending".into(),
                to: "pending".into(),
            });
        }

        let row = sqlx::query(&format!(
            "UPDATE approvals SET status = $1, resolved_at = $2, resolved_by = $3
             WHERE id = $4 AND status = 'pending'
             RETURNING {APPROVAL_COLUMNS}"
        ))
        .bind(status.as_db())
        .bind(now_rfc3339())
        .bind(resolved_by)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(map_approval_row).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> ApprovalRequest {
        ApprovalRequest {
            tool: "shell".into(),
            args: json!({"command": "npm install"})
                .as_object()
                .cloned()
                .unwrap(),
            risk_level: RiskLevel::Medium,
            reason: "Package install".into(),
        }
    }

    #[tokio::test]
    async fn create_round_trips_request() {
        let store = Store::in_memory().await.unwrap();
        let approval = store.create_approval(&request()).await.unwrap();
        assert_eq!(approval.status, ApprovalStatus::Pending);

        let loaded = store.get_approval(&approval.id).await.unwrap().unwrap();
        assert_eq!(loaded.request, request());
        assert_eq!(store.count_pending_approvals().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn resolution_happens_at_most_once() {
        let store = Store::in_memory().await.unwrap();
        let approval = store.create_approval(&request()).await.unwrap();

        let first = store
            .resolve_approval(&approval.id, ApprovalStatus::Approved, "user")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.status, ApprovalStatus::Approved);
        assert_eq!(first.resolved_by.as_deref(), Some("user"));

        let second = store
            .resolve_approval(&approval.id, ApprovalStatus::Denied, "user")
            .await
            .unwrap();
        assert!(second.is_none());

        let stored = store.get_approval(&approval.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ApprovalStatus::Approved);
        assert!(store.pending_approvals().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_id_resolves_to_none() {
        let store = Store::in_memory().await.unwrap();
        let result = store
            .resolve_approval("missing", ApprovalStatus::Denied, "user")
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
