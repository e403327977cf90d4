use anyhow::Context;
use chrono::NaiveDate;
use std::path::Path;

/// Create today's daily-memory and second-brain index files under the
/// workspace. Existing files are left untouched.
pub async fn ensure_daily_archive(workspace: &Path, date: NaiveDate) -> anyhow::Result<()> {
    let day = date.format("%Y-%m-%d").to_string();

    write_if_absent(
        &workspace.join("memory/daily").join(&day).join("SUMMARY.md"),
        &format!(
            "# Daily Memory - {day}\n\n## Completed\n-\n\n## In Progress\n-\n\n## Learnings\n-\n"
        ),
    )
    .await?;

    write_if_absent(
        &workspace.join("data/second-brain").join(&day).join("INDEX.md"),
        &format!(
            "# Second Brain - {day}\n\n\
             - Signals: data/pipeline/signals/\n\
             - Products: data/pipeline/products/\n\
             - Launch: data/pipeline/launch/\n\
             - Revenue: data/pipeline/revenue/\n\
             - Integrations: data/pipeline/integrations/\n"
        ),
    )
    .await
}

async fn write_if_absent(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("create {}", parent.display()))?;
    }
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Ok(());
    }
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn creates_both_files_once() {
        let tmp = TempDir::new().unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();

        ensure_daily_archive(tmp.path(), date).await.unwrap();

        let summary = tmp.path().join("memory/daily/2026-03-09/SUMMARY.md");
        let index = tmp.path().join("data/second-brain/2026-03-09/INDEX.md");
        assert!(
            std::fs::read_to_string(&summary)
                .unwrap()
                .starts_with("# Daily Memory - 2026-03-09\n\n## Completed\n-\n")
        );
        let index_text = std::fs::read_to_string(&index).unwrap();
        assert!(index_text.contains("- Signals: data/pipeline/signals/\n- Products:"));
        assert!(index_text.ends_with("- Integrations: data/pipeline/integrations/\n"));

        std::fs::write(&summary, "edited by hand").unwrap();
        ensure_daily_archive(tmp.path(), date).await.unwrap();
        assert_eq!(std::fs::read_to_string(&summary).unwrap(), "edited by hand");
    }
}
