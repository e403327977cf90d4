use crate::utils::paths::{is_within_workspace, normalize_in_workspace};
use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::{Duration, SystemTime};

pub const MISSING_OUTPUT_PATHS: &str =
    "Missing OUTPUT_PATHS block or no file-like paths found in response.";

static OUTPUT_PATHS_HEADER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^output_paths\s*:").ok());
static SUMMARY_HEADER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^summary\s*:").ok());

fn matches(pattern: &LazyLock<Option<Regex>>, line: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(line))
}

// ── OUTPUT_PATHS protocol ────────────────────────────────────────────────────

/// Path-like entries of the first `OUTPUT_PATHS:` block, in order, without
/// duplicates. The block ends at a `SUMMARY:` line.
pub fn extract_output_paths(response: &str) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    let mut in_block = false;

    for raw in response.lines() {
        let line = raw.trim();
        if !in_block {
            in_block = matches(&OUTPUT_PATHS_HEADER, line);
            continue;
        }
        if line.is_empty() {
            continue;
        }
        if matches(&SUMMARY_HEADER, line) {
            break;
        }

        let cleaned = line
            .strip_prefix(['-', '*'])
            .map_or(line, str::trim_start);
        let cleaned = cleaned.strip_prefix('`').unwrap_or(cleaned);
        let cleaned = cleaned.strip_suffix('`').unwrap_or(cleaned).trim();
        let path_like =
            cleaned.starts_with('/') || cleaned.starts_with("./") || cleaned.starts_with("../");
        if path_like && !paths.iter().any(|seen| seen == cleaned) {
            paths.push(cleaned.to_string());
        }
    }

    paths
}

/// Check declared outputs against the workspace: each must be inside it,
/// exist as a regular file and have been modified no earlier than
/// `started - skew`. Returns the accepted paths, or the failure reason.
pub fn verify_output_paths(
    workspace: &Path,
    response: &str,
    started: SystemTime,
    skew: Duration,
) -> Result<Vec<PathBuf>, String> {
    let declared: Vec<PathBuf> = extract_output_paths(response)
        .iter()
        .map(|raw| normalize_in_workspace(workspace, raw))
        .collect();
    if declared.is_empty() {
        return Err(MISSING_OUTPUT_PATHS.to_string());
    }

    let fresh_after = started.checked_sub(skew).unwrap_or(SystemTime::UNIX_EPOCH);
    let accepted: Vec<PathBuf> = declared
        .iter()
        .filter(|path| is_fresh_file(workspace, path, fresh_after))
        .cloned()
        .collect();

    if accepted.is_empty() {
        let listed: Vec<String> = declared
            .iter()
            .map(|path| path.display().to_string())
            .collect();
        return Err(format!(
            "Declared output paths do not exist: {}",
            listed.join(", ")
        ));
    }
    Ok(accepted)
}

fn is_fresh_file(workspace: &Path, path: &Path, fresh_after: SystemTime) -> bool {
    if !is_within_workspace(workspace, path) {
        return false;
    }
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    metadata.is_file()
        && metadata
            .modified()
            .is_ok_and(|modified| modified >= fresh_after)
}

// ── Inline write recovery ────────────────────────────────────────────────────

/// A `filesystem.write` call the model printed instead of invoking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineWrite {
    pub path: String,
    pub content: String,
}

fn strip_code_fences(input: &str) -> &str {
    let text = input.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    let rest = rest.strip_suffix('\n').unwrap_or(rest);
    rest.trim()
}

/// Accepts `{"tool":"filesystem","args":{"action":"write",..}}` and
/// `{"tool":"filesystem.write","args":{..}}`, optionally fenced.
pub fn extract_inline_write(response: &str) -> Option<InlineWrite> {
    let candidate = strip_code_fences(response);
    if !candidate.starts_with('{') {
        return None;
    }
    let parsed: Value = serde_json::from_str(candidate).ok()?;
    let tool = parsed
        .get("tool")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_lowercase();
    let args = parsed.get("args").and_then(Value::as_object);

    let (tool_name, suffix) = tool.split_once('.').unwrap_or((tool.as_str(), ""));
    let action = args
        .and_then(|args| args.get("action"))
        .and_then(Value::as_str)
        .map_or_else(|| suffix.to_string(), str::to_lowercase);
    if tool_name != "filesystem" || action != "write" {
        return None;
    }

    let args = args?;
    let path = args.get("path").and_then(Value::as_str)?;
    let content = args.get("content").and_then(Value::as_str)?;
    if path.is_empty() || content.is_empty() {
        return None;
    }
    Some(InlineWrite {
        path: path.to_string(),
        content: content.to_string(),
    })
}

/// Perform an inline write found in `response` and return the rewritten
/// `OUTPUT_PATHS` answer. `None` when there is nothing to recover or the
/// write could not be done safely.
pub async fn recover_inline_write(
    workspace: &Path,
    response: &str,
    task_id: &str,
) -> Option<String> {
    let write = extract_inline_write(response)?;
    let path = normalize_in_workspace(workspace, &write.path);
    if !is_within_workspace(workspace, &path) {
        tracing::warn!(task_id, path = %path.display(), "inline write outside workspace ignored");
        return None;
    }

    if let Some(parent) = path.parent()
        && let Err(error) = tokio::fs::create_dir_all(parent).await
    {
        tracing::warn!(task_id, %error, "inline write: cannot create parent directory");
        return None;
    }
    if let Err(error) = tokio::fs::write(&path, &write.content).await {
        tracing::warn!(task_id, %error, "inline write failed");
        return None;
    }

    tracing::info!(task_id, path = %path.display(), "recovered inline filesystem write");
    Some(format!(
        "OUTPUT_PATHS:\n- {}\nSUMMARY:\nRecovered inline filesystem write format and created artifact for task {task_id}.",
        path.display()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn output_block_is_parsed_until_summary() {
        let response = "Done.\n  output_paths:\n- `/ws/a.md`\n\n* ./b.md\nnot a path\n- /ws/a.md\n- ../c.md\nSUMMARY:\n- /ws/ignored.md";
        assert_eq!(
            extract_output_paths(response),
            vec!["/ws/a.md", "./b.md", "../c.md"]
        );
        assert!(extract_output_paths("SUMMARY:\nnothing").is_empty());
    }

    #[test]
    fn fresh_file_is_accepted() {
        let tmp = TempDir::new().unwrap();
        let started = SystemTime::now();
        let file = tmp.path().join("data/out.md");
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, "# out").unwrap();

        let response = "OUTPUT_PATHS:\n- ./data/out.md\nSUMMARY:\nwrote it";
        let accepted =
            verify_output_paths(tmp.path(), response, started, Duration::from_secs(5)).unwrap();
        assert_eq!(accepted, vec![file]);
    }

    #[test]
    fn missing_block_and_missing_files_have_reasons() {
        let tmp = TempDir::new().unwrap();
        let started = SystemTime::now();

        let err = verify_output_paths(tmp.path(), "all done", started, Duration::ZERO)
            .unwrap_err();
        assert_eq!(err, MISSING_OUTPUT_PATHS);

        let err = verify_output_paths(
            tmp.path(),
            "OUTPUT_PATHS:\n- ./nope.md\nSUMMARY:\nx",
            started,
            Duration::ZERO,
        )
        .unwrap_err();
        let expected = tmp.path().join("nope.md");
        assert_eq!(
            err,
            format!("Declared output paths do not exist: {}", expected.display())
        );
    }

    #[test]
    fn stale_directories_and_outside_files_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("old.md"), "old").unwrap();
        std::fs::create_dir_all(tmp.path().join("dir")).unwrap();
        let foreign = outside.path().join("x.md");
        std::fs::write(&foreign, "x").unwrap();

        let later = SystemTime::now() + Duration::from_secs(3600);
        let response = format!(
            "OUTPUT_PATHS:\n- ./old.md\n- ./dir\n- {}\nSUMMARY:\n.",
            foreign.display()
        );
        assert!(
            verify_output_paths(tmp.path(), &response, later, Duration::from_secs(5)).is_err()
        );
        let now_ish = SystemTime::now() + Duration::from_secs(60);
        let accepted =
            verify_output_paths(tmp.path(), &response, now_ish, Duration::from_secs(120))
                .unwrap();
        assert_eq!(accepted, vec![tmp.path().join("old.md")]);
    }

    #[test]
    fn inline_write_shapes() {
        let plain = r#"{"tool":"filesystem","args":{"action":"write","path":"./a.md","content":"hi"}}"#;
        assert_eq!(
            extract_inline_write(plain),
            Some(InlineWrite {
                path: "./a.md".into(),
                content: "hi".into(),
            })
        );

        let fenced = "```json\n{\"tool\":\"filesystem.write\",\"args\":{\"path\":\"b.md\",\"content\":\"x\"}}\n```";
        assert_eq!(extract_inline_write(fenced).unwrap().path, "b.md");

        assert!(extract_inline_write(r#"{"tool":"filesystem","args":{"action":"read","path":"a"}}"#).is_none());
        assert!(extract_inline_write(r#"{"tool":"shell","args":{"action":"write","path":"a","content":"b"}}"#).is_none());
        assert!(extract_inline_write(r#"{"tool":"filesystem.write","args":{"path":"a","content":""}}"#).is_none());
        assert!(extract_inline_write("OUTPUT_PATHS:\n- /a").is_none());
    }

    #[tokio::test]
    async fn recovery_writes_inside_workspace_only() {
        let tmp = TempDir::new().unwrap();
        let response = r#"{"tool":"filesystem","args":{"action":"write","path":"/workspace/data/notes.md","content":"notes"}}"#;

        let rewritten = recover_inline_write(tmp.path(), response, "t-9").await.unwrap();
        let target = tmp.path().join("data/notes.md");
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "notes");
        assert_eq!(
            rewritten,
            format!(
                "OUTPUT_PATHS:\n- {}\nSUMMARY:\nRecovered inline filesystem write format and created artifact for task t-9.",
                target.display()
            )
        );

        let escape = r#"{"tool":"filesystem","args":{"action":"write","path":"../../escape.md","content":"x"}}"#;
        assert!(recover_inline_write(tmp.path(), escape, "t-9").await.is_none());
    }
}
