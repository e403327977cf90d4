use super::types::{Memory, MemoryKind, NewMemory};
use super::{Store, StoreResult, limit_i64, new_id, now_rfc3339};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

const MEMORY_COLUMNS: &str = "m.id AS id, m.type AS type, m.text AS text, m.tags AS tags, \
m.importance AS importance, m.source AS source, m.created_at AS created_at, \
m.updated_at AS updated_at";
const MAX_FTS_TOKENS: usize = 8;

fn map_memory_row(row: &SqliteRow) -> StoreResult<Memory> {
    let kind_raw: String = row.try_get("type")?;
    let tags_raw: String = row.try_get("tags")?;
    let importance: i64 = row.try_get("importance")?;
    Ok(Memory {
        id: row.try_get("id")?,
        kind: MemoryKind::from_db(&kind_raw)?,
        text: row.try_get("text")?,
        tags: serde_json::from_str(&tags_raw)?,
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        importance: importance.clamp(0, 10) as u8,
        source: row.try_get("source")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Prefix-match FTS5 expression built only from `[A-Za-z0-9_-]`, so user
/// punctuation can never be parsed as query syntax. Empty when nothing
/// survives.
fn build_fts_query(input: &str) -> String {
    input
        .split_whitespace()
        .map(|token| {
            token
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
                .collect::<String>()
        })
        .filter(|token| !token.is_empty())
        .take(MAX_FTS_TOKENS)
        .map(|token| format!("\"{token}\"*"))
        .collect::<Vec<_>>()
        .join(" AND ")
}

impl Store {
    pub async fn add_memory(&self, memory: &NewMemory) -> StoreResult<Memory> {
        let id = new_id();
        let timestamp = now_rfc3339();
        let tags_json = serde_json::to_string(&memory.tags)?;
        let importance = memory.importance.min(10);

        sqlx::query(
            "INSERT INTO memories (id, type, text, tags, importance, source, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7)",
        )
        .bind(&id)
        .bind(memory.kind.as_db())
        .bind(&memory.text)
        .bind(&tags_json)
        .bind(i64::from(importance))
        .bind(memory.source.as_deref())
        .bind(&timestamp)
        .execute(&self.pool)
        .await?;

        Ok(Memory {
            id,
            kind: memory.kind,
            text: memory.text.clone(),
            tags: memory.tags.clone(),
            importance,
            source: memory.source.clone(),
            created_at: timestamp.clone(),
            updated_at: timestamp,
        })
    }

    /// Relevance search: full-text index first, substring match when the
    /// query has no indexable tokens, the index rejects it, or it finds
    /// nothing. Results are ordered by importance.
    pub async fn search_memories(&self, query: &str, limit: usize) -> StoreResult<Vec<Memory>> {
        let trimmed = query.trim();
        if trimmed.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let fts_query = build_fts_query(trimmed);
        if !fts_query.is_empty() {
            let result = sqlx::query(&format!(
                "SELECT {MEMORY_COLUMNS} FROM memories m
                 JOIN memories_fts f ON m.rowid = f.rowid
                 WHERE memories_fts MATCH $1
                 ORDER BY m.importance DESC, m.updated_at DESC LIMIT $2"
            ))
            .bind(&fts_query)
            .bind(limit_i64(limit))
            .fetch_all(&self.pool)
            .await;

            match result {
                Ok(rows) if !rows.is_empty() => {
                    return rows.iter().map(map_memory_row).collect();
                }
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!(
                        query = trimmed,
                        error = %error,
                        "FTS search failed, falling back to LIKE search"
                    );
                }
            }
        }

        let like = format!("%{trimmed}%");
        let rows = sqlx::query(&format!(
            "SELECT {MEMORY_COLUMNS} FROM memories m
             WHERE m.text LIKE $1 OR m.tags LIKE $1
             ORDER BY m.importance DESC, m.updated_at DESC LIMIT $2"
        ))
        .bind(&like)
        .bind(limit_i64(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(map_memory_row).collect()
    }

    pub async fn memories_by_kind(&self, kind: MemoryKind, limit: usize) -> StoreResult<Vec<Memory>> {
        let rows = sqlx::query(&format!(
            "SELECT {MEMORY_COLUMNS} FROM memories m WHERE m.type = $1
             ORDER BY m.importance DESC, m.updated_at DESC LIMIT $2"
        ))
        .bind(kind.as_db())
        .bind(limit_i64(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(map_memory_row).collect()
    }

    pub async fn delete_memory(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM memories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fts_query_strips_punctuation_and_caps_tokens() {
        assert_eq!(build_fts_query(".env files"), "\"env\"* AND \"files\"*");
        assert_eq!(build_fts_query("!!! ???"), "");
        let many = "a b c d e f g h i j";
        assert_eq!(build_fts_query(many).matches(" AND ").count(), 7);
    }

    #[tokio::test]
    async fn keyword_search_ranks_by_importance() {
        let store = Store::in_memory().await.unwrap();
        store
            .add_memory(
                &NewMemory::new(MemoryKind::Fact, "Deploys go out from Minneapolis")
                    .with_importance(3),
            )
            .await
            .unwrap();
        store
            .add_memory(
                &NewMemory::new(MemoryKind::Fact, "The team lives in Minneapolis")
                    .with_tags(vec!["personal".into(), "location".into()])
                    .with_importance(8),
            )
            .await
            .unwrap();
        store
            .add_memory(&NewMemory::new(MemoryKind::Project, "Site uses Next.js"))
            .await
            .unwrap();

        let results = store.search_memories("minneapolis", 5).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].importance, 8);
        assert_eq!(results[0].tags, vec!["personal", "location"]);
    }

    #[tokio::test]
    async fn dotted_query_matches_through_index() {
        let store = Store::in_memory().await.unwrap();
        store
            .add_memory(&NewMemory::new(
                MemoryKind::Learning,
                "Keep .env files out of source control",
            ))
            .await
            .unwrap();

        let results = store.search_memories(".env", 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].text.contains(".env"));
    }

    #[tokio::test]
    async fn punctuation_only_query_uses_fallback() {
        let store = Store::in_memory().await.unwrap();
        store
            .add_memory(&NewMemory::new(MemoryKind::Decision, "Ship it !!! no matter what"))
            .await
            .unwrap();

        let results = store.search_memories("!!!", 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(store.search_memories("   ", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleted_memories_leave_the_index() {
        let store = Store::in_memory().await.unwrap();
        let memory = store
            .add_memory(&NewMemory::new(MemoryKind::Contact, "Alex handles invoices"))
            .await
            .unwrap();
        assert!(store.delete_memory(&memory.id).await.unwrap());
        assert!(store.search_memories("invoices", 5).await.unwrap().is_empty());
        assert!(
            store
                .memories_by_kind(MemoryKind::Contact, 5)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
