use super::traits::Tool;
use super::types::{ParamKind, ToolArgs, ToolParameter, ToolResult};
use crate::security::RiskLevel;
use crate::utils::paths::{is_within_workspace, lexical_normalize, normalize_in_workspace};
use anyhow::Context;
use serde_json::Value;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

/// Read output beyond this many characters is truncated.
const MAX_READ_CHARS: usize = 8000;

/// Workspace-scoped file operations.
pub struct FilesystemTool {
    workspace_dir: PathBuf,
}

impl FilesystemTool {
    pub fn new(workspace_dir: impl Into<PathBuf>) -> Self {
        Self {
            workspace_dir: workspace_dir.into(),
        }
    }

    fn resolve(&self, raw: &str) -> anyhow::Result<PathBuf> {
        let path = normalize_in_workspace(&self.workspace_dir, raw);
        if !is_within_workspace(&self.workspace_dir, &path) {
            anyhow::bail!("path escapes workspace: {raw}");
        }
        Ok(path)
    }

    async fn run(&self, action: &str, args: &ToolArgs) -> anyhow::Result<ToolResult> {
        let raw_path = str_arg(args, "path").unwrap_or_default();
        if raw_path.trim().is_empty() {
            return Ok(ToolResult::failed("path must not be empty"));
        }
        let path = self.resolve(raw_path)?;
        if matches!(action, "delete" | "move") && path == lexical_normalize(&self.workspace_dir)
        {
            return Ok(ToolResult::failed(format!("refusing to {action} the workspace root")));
        }

        match action {
            "read" => {
                let data = tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?;
                Ok(ToolResult::ok(data).truncate_output(MAX_READ_CHARS))
            }
            "write" => {
                let content = str_arg(args, "content").unwrap_or_default();
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&path, content)
                    .await
                    .with_context(|| format!("failed to write {}", path.display()))?;
                Ok(ToolResult::ok(format!(
                    "Written {} bytes to {}",
                    content.len(),
                    path.display()
                )))
            }
            "list" => {
                let mut entries = tokio::fs::read_dir(&path)
                    .await
                    .with_context(|| format!("failed to list {}", path.display()))?;
                let mut lines = Vec::new();
                while let Some(entry) = entries.next_entry().await? {
                    let marker = if entry.file_type().await?.is_dir() {
                        "[dir] "
                    } else {
                        "[file]"
                    };
                    lines.push(format!("{marker} {}", entry.file_name().to_string_lossy()));
                }
                lines.sort();
                Ok(ToolResult::ok(lines.join("\n")))
            }
            "mkdir" => {
                tokio::fs::create_dir_all(&path).await?;
                Ok(ToolResult::ok(format!("Created directory: {}", path.display())))
            }
            "move" | "copy" => {
                let Some(destination) = str_arg(args, "destination") else {
                    return Ok(ToolResult::failed(format!(
                        "destination is required for {action}"
                    )));
                };
                let destination = self.resolve(destination)?;
                if let Some(parent) = destination.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                if action == "move" {
                    tokio::fs::rename(&path, &destination).await?;
                    Ok(ToolResult::ok(format!(
                        "Moved {} -> {}",
                        path.display(),
                        destination.display()
                    )))
                } else {
                    tokio::fs::copy(&path, &destination).await?;
                    Ok(ToolResult::ok(format!(
                        "Copied {} -> {}",
                        path.display(),
                        destination.display()
                    )))
                }
            }
            "delete" => {
                let meta = tokio::fs::metadata(&path).await?;
                if meta.is_dir() {
                    tokio::fs::remove_dir_all(&path).await?;
                    Ok(ToolResult::ok(format!("Deleted directory: {}", path.display())))
                } else {
                    tokio::fs::remove_file(&path).await?;
                    Ok(ToolResult::ok(format!("Deleted file: {}", path.display())))
                }
            }
            "exists" => {
                let exists = tokio::fs::try_exists(&path).await.unwrap_or(false);
                Ok(ToolResult::ok(exists.to_string()))
            }
            "stat" => stat(&path).await,
            other => Ok(ToolResult::failed(format!("Unknown action: {other}"))),
        }
    }
}

async fn stat(path: &Path) -> anyhow::Result<ToolResult> {
    let meta = tokio::fs::metadata(path).await?;
    let modified = meta
        .modified()
        .ok()
        .map(chrono::DateTime::<chrono::Utc>::from)
        .map(|ts| ts.to_rfc3339());
    let body = serde_json::json!({
        "size": meta.len(),
        "is_file": meta.is_file(),
        "is_dir": meta.is_dir(),
        "modified": modified,
    });
    Ok(ToolResult::ok(serde_json::to_string_pretty(&body)?))
}

fn str_arg<'a>(args: &'a ToolArgs, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

impl Tool for FilesystemTool {
    fn name(&self) -> &str {
        "filesystem"
    }

    fn description(&self) -> &str {
        "Read, write, list, move, copy, delete and inspect files inside the workspace"
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![
            ToolParameter::required(
                "action",
                ParamKind::String,
                "One of: read, write, list, mkdir, move, copy, delete, exists, stat",
            ),
            ToolParameter::required(
                "path",
                ParamKind::String,
                "Target path (relative paths resolve against the workspace)",
            ),
            ToolParameter::optional("content", ParamKind::String, "Content for write"),
            ToolParameter::optional(
                "destination",
                ParamKind::String,
                "Destination path for move/copy",
            ),
        ]
    }

    fn risk_level(&self) -> RiskLevel {
        RiskLevel::Low
    }

    fn execute<'a>(
        &'a self,
        args: &'a ToolArgs,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ToolResult>> + Send + 'a>> {
        Box::pin(async move {
            let action = str_arg(args, "action")
                .ok_or_else(|| anyhow::anyhow!("Missing 'action' parameter"))?
                .to_ascii_lowercase();
            self.run(&action, args).await
        })
    }
}
