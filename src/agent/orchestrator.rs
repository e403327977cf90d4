use super::conversation::ConversationWindow;
use super::outcome::{ApprovalOutcome, Channel, FailureKind, TurnOutcome};
use crate::config::{AgentConfig, Config};
use crate::error::{ForgeError, ForgeResult};
use crate::llm::{BudgetTracker, ChatMessage, ChatOptions, ModelRouter, TaskClass, ToolCall};
use crate::security::{PolicyDecision, PolicyEngine};
use crate::skills::SkillRegistry;
use crate::store::{
    Approval, ApprovalRequest, ApprovalStatus, Memory, Store, StoreResult, TimelineEvent,
    TimelineEventType,
};
use crate::tools::{ToolArgs, ToolRegistry, ToolResult, default_registry};
use crate::utils::text::{clip, prefix_chars};
use serde_json::{Value, json};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;

// ── Constants ────────────────────────────────────────────────────────────────

const TURN_TEMPERATURE: f64 = 0.7;
const MAX_TOOL_ERROR_OUTPUT: usize = 1500;
const MAX_SKILL_PROMPT_LENGTH: usize = 1000;
const TIMELINE_OUTPUT_CHARS: usize = 500;
const SUMMARY_PREVIEW_CHARS: usize = 100;

const DEFAULT_SYSTEM_PROMPT: &str = "\
You are Forgeclaw, an autonomous operator agent running on the user's own machine.

## Operating Rules
1. Create an action plan before executing multi-step tasks.
2. Store important facts, decisions and learnings with the memory tool.
3. Risky actions go through approval; wait for it instead of working around it.
4. Never expose API keys or secrets in output.
5. Prefer building things over explaining things.
6. You have local filesystem and shell access through tools. If a tool fails, report the exact error and the next fix.";

// ── Turn handler seam ────────────────────────────────────────────────────────

/// Anything that can take a message and produce a turn outcome. The
/// scheduler drives tasks through this.
pub trait TurnHandler: Send + Sync {
    fn handle<'a>(
        &'a self,
        text: &'a str,
        channel: Channel,
    ) -> Pin<Box<dyn Future<Output = TurnOutcome> + Send + 'a>>;
}

// ── Orchestrator ─────────────────────────────────────────────────────────────

/// Drives conversation turns: context assembly, model call, policy-gated
/// sequential tool execution, and approval resolution.
pub struct Orchestrator {
    store: Store,
    router: Arc<ModelRouter>,
    tools: Arc<ToolRegistry>,
    policy: PolicyEngine,
    skills: SkillRegistry,
    config: AgentConfig,
    window: Mutex<ConversationWindow>,
}

impl Orchestrator {
    pub fn new(
        store: Store,
        router: Arc<ModelRouter>,
        tools: Arc<ToolRegistry>,
        policy: PolicyEngine,
        skills: SkillRegistry,
        config: AgentConfig,
    ) -> Self {
        let window = ConversationWindow::new(config.window_max_entries, config.window_keep_entries);
        Self {
            store,
            router,
            tools,
            policy,
            skills,
            config,
            window: Mutex::new(window),
        }
    }

    /// Wire every component from configuration: budget, model router with
    /// the HTTP providers, shipped tools, compiled policy rules and skills.
    pub async fn from_config(config: &Config, store: Store) -> anyhow::Result<Self> {
        let budget = Arc::new(BudgetTracker::new(store.clone(), &config.budget).await?);
        let router = Arc::new(ModelRouter::from_config(config, budget));
        let tools = Arc::new(default_registry(config, &store));
        let policy = PolicyEngine::new(&config.policy)?;
        let skills = SkillRegistry::load(&config.workspace_dir, &config.agent.skill_dirs);

        tracing::info!(
            tools = tools.tool_names().len(),
            rules = policy.rule_count(),
            skills = skills.len(),
            "orchestrator initialized"
        );
        Ok(Self::new(
            store,
            router,
            tools,
            policy,
            skills,
            config.agent.clone(),
        ))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn router(&self) -> &ModelRouter {
        &self.router
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn skills(&self) -> &SkillRegistry {
        &self.skills
    }

    /// Run one turn. Every error raised inside the turn ends here: it is
    /// recorded as an `error` timeline event and returned as
    /// [`TurnOutcome::Failed`]. The window is trimmed only between turns.
    pub async fn process_message(&self, text: &str, channel: Channel) -> TurnOutcome {
        let mut window = self.window.lock().await;
        let outcome = match self.run_turn(&mut window, text, channel).await {
            Ok(outcome) => outcome,
            Err(error) => self.turn_failed(error, channel).await,
        };
        window.trim();
        outcome
    }

    async fn run_turn(
        &self,
        window: &mut ConversationWindow,
        text: &str,
        channel: Channel,
    ) -> ForgeResult<TurnOutcome> {
        window.push(ChatMessage::user(text));
        self.store
            .append_event(
                TimelineEventType::Message,
                &format!(
                    "User message via {channel}: {}",
                    prefix_chars(text, SUMMARY_PREVIEW_CHARS)
                ),
                json!({ "channel": channel, "message": text }),
            )
            .await?;

        let base_prompt = self.system_prompt();
        let memories = self
            .store
            .search_memories(text, self.config.memory_context_limit as usize)
            .await?;
        let system_prompt = format!(
            "{base_prompt}{}{}",
            memory_context(&memories),
            self.skills_context(text)
        );

        let specs = self.tools.specs();
        let response = self
            .router
            .chat(
                window.messages(),
                ChatOptions {
                    task: TaskClass::Default,
                    tools: Some(&specs),
                    system_prompt: Some(&system_prompt),
                    temperature: Some(TURN_TEMPERATURE),
                    ..ChatOptions::default()
                },
            )
            .await?;

        if response.tool_calls.is_empty() {
            window.push(ChatMessage::assistant(response.content.clone()));
            return Ok(TurnOutcome::Answer(response.content));
        }

        for call in &response.tool_calls {
            if let Some(outcome) = self.run_tool_call(window, call).await? {
                return Ok(outcome);
            }
        }

        let final_response = self
            .router
            .chat(
                window.messages(),
                ChatOptions {
                    task: TaskClass::Default,
                    system_prompt: Some(&base_prompt),
                    temperature: Some(TURN_TEMPERATURE),
                    ..ChatOptions::default()
                },
            )
            .await?;
        window.push(ChatMessage::assistant(final_response.content.clone()));
        Ok(TurnOutcome::Answer(final_response.content))
    }

    /// Execute one requested call. `Some` ends the turn early.
    async fn run_tool_call(
        &self,
        window: &mut ConversationWindow,
        call: &ToolCall,
    ) -> ForgeResult<Option<TurnOutcome>> {
        let args = match parse_tool_args(&call.arguments) {
            Ok(args) => args,
            Err(error) => {
                tracing::warn!(
                    tool = %call.name,
                    arguments = %call.arguments,
                    %error,
                    "invalid tool call JSON"
                );
                return Ok(Some(TurnOutcome::failed(
                    FailureKind::Parse,
                    format!("Tool call parsing failed for `{}`: {error}", call.name),
                )));
            }
        };

        let Some(tool) = self.tools.get(&call.name) else {
            tracing::warn!(tool = %call.name, "unknown tool called");
            return Ok(None);
        };

        let verdict = self.policy.evaluate(&call.name, &args, tool.risk_level())?;
        match verdict.decision {
            PolicyDecision::RequireApproval => {
                let approval = self
                    .store
                    .create_approval(&ApprovalRequest {
                        tool: call.name.clone(),
                        args: args.clone(),
                        risk_level: tool.risk_level(),
                        reason: verdict.reason.clone(),
                    })
                    .await?;
                tracing::info!(approval_id = %approval.id, tool = %call.name, "approval requested");
                return Ok(Some(TurnOutcome::ApprovalRequired {
                    message: approval_message(&call.name, &args, &verdict.reason, &approval.id),
                    approval_id: approval.id,
                }));
            }
            PolicyDecision::Warn => {
                tracing::warn!(tool = %call.name, reason = %verdict.reason, "policy warning");
            }
            PolicyDecision::Allow => {}
        }

        let result = self.tools.execute(&call.name, &args).await;
        self.record_tool_call(&call.name, &args, &result, None)
            .await?;

        if !result.success {
            return Ok(Some(TurnOutcome::failed(
                FailureKind::Tool,
                tool_failure_message(&call.name, &result),
            )));
        }

        let mut content = format!("Tool {} result: {}", call.name, result.output);
        if let Some(error) = &result.error {
            content.push_str(&format!("\nError: {error}"));
        }
        window.push(ChatMessage::tool(content));
        Ok(None)
    }

    async fn turn_failed(&self, error: ForgeError, channel: Channel) -> TurnOutcome {
        let kind = match &error {
            ForgeError::PolicyDenied(_) => FailureKind::Denied,
            ForgeError::CostLimit(_) => FailureKind::Budget,
            _ => FailureKind::Error,
        };
        let message = error.to_string();
        tracing::error!(%channel, %kind, error = %message, "turn failed");

        if let Err(log_error) = self
            .store
            .append_event(
                TimelineEventType::Error,
                &format!("Turn failed: {}", prefix_chars(&message, SUMMARY_PREVIEW_CHARS)),
                json!({ "kind": kind, "channel": channel, "error": message }),
            )
            .await
        {
            tracing::warn!(error = %log_error, "failed to record turn error");
        }
        TurnOutcome::failed(kind, message)
    }

    fn system_prompt(&self) -> String {
        let base = self
            .config
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);
        let today = chrono::Local::now().format("%A, %B %-d, %Y");
        format!("{base}\n\nToday is {today}.")
    }

    fn skills_context(&self, text: &str) -> String {
        let selected = self.skills.select(text, self.config.skill_limit);
        if selected.is_empty() {
            return String::new();
        }
        let sections: Vec<String> = selected
            .iter()
            .map(|skill| {
                format!(
                    "- {}:\n{}",
                    skill.name,
                    clip(&skill.prompt, MAX_SKILL_PROMPT_LENGTH)
                )
            })
            .collect();
        format!("\n\nActive skill modules:\n{}", sections.join("\n\n"))
    }

    async fn record_tool_call(
        &self,
        tool: &str,
        args: &ToolArgs,
        result: &ToolResult,
        approval_id: Option<&str>,
    ) -> StoreResult<()> {
        let args_json = Value::Object(args.clone()).to_string();
        let summary = format!(
            "{tool}({}) → {}",
            prefix_chars(&args_json, SUMMARY_PREVIEW_CHARS),
            if result.success { "success" } else { "failed" }
        );
        let mut payload = json!({
            "tool": tool,
            "args": args,
            "result": {
                "success": result.success,
                "output": prefix_chars(&result.output, TIMELINE_OUTPUT_CHARS),
                "error": result.error.as_deref().unwrap_or_default(),
            },
        });
        if let (Some(id), Some(object)) = (approval_id, payload.as_object_mut()) {
            object.insert("source".into(), json!("approval"));
            object.insert("approval_id".into(), json!(id));
        }

        self.store
            .append_event(TimelineEventType::ToolCall, &summary, payload)
            .await?;
        Ok(())
    }

    // ── Approvals ───────────────────────────────────────────────────────

    /// Approve a pending request and run the recorded call, bypassing
    /// policy. Resolving twice never runs the tool twice.
    pub async fn approve_action(&self, id: &str) -> ForgeResult<ApprovalOutcome> {
        let approval = match self.resolve(id, ApprovalStatus::Approved).await? {
            Ok(approval) => approval,
            Err(outcome) => return Ok(outcome),
        };
        self.store
            .append_event(
                TimelineEventType::Approval,
                &format!("Approval granted for {id}"),
                json!({ "id": id, "status": ApprovalStatus::Approved }),
            )
            .await?;
        tracing::info!(approval_id = id, "action approved");

        self.execute_approved(&approval).await
    }

    pub async fn deny_action(&self, id: &str) -> ForgeResult<ApprovalOutcome> {
        if let Err(outcome) = self.resolve(id, ApprovalStatus::Denied).await? {
            return Ok(outcome);
        }
        self.store
            .append_event(
                TimelineEventType::Approval,
                &format!("Approval denied for {id}"),
                json!({ "id": id, "status": ApprovalStatus::Denied }),
            )
            .await?;
        tracing::info!(approval_id = id, "action denied");
        Ok(ApprovalOutcome::Denied { id: id.to_string() })
    }

    /// `Ok(Err(_))` carries the informational outcome when the approval is
    /// unknown or already resolved.
    async fn resolve(
        &self,
        id: &str,
        status: ApprovalStatus,
    ) -> StoreResult<Result<Approval, ApprovalOutcome>> {
        let Some(existing) = self.store.get_approval(id).await? else {
            return Ok(Err(ApprovalOutcome::NotFound { id: id.to_string() }));
        };
        if existing.status != ApprovalStatus::Pending {
            return Ok(Err(ApprovalOutcome::AlreadyResolved {
                id: id.to_string(),
                status: existing.status,
            }));
        }

        if let Some(resolved) = self.store.resolve_approval(id, status, "user").await? {
            return Ok(Ok(resolved));
        }

        // Lost the race to another resolver.
        Ok(Err(match self.store.get_approval(id).await? {
            Some(current) => ApprovalOutcome::AlreadyResolved {
                id: id.to_string(),
                status: current.status,
            },
            None => ApprovalOutcome::NotFound { id: id.to_string() },
        }))
    }

    async fn execute_approved(&self, approval: &Approval) -> ForgeResult<ApprovalOutcome> {
        let tool = approval.request.tool.clone();
        if self.tools.get(&tool).is_none() {
            return Ok(ApprovalOutcome::ToolMissing {
                id: approval.id.clone(),
                tool,
            });
        }

        let result = self.tools.execute(&tool, &approval.request.args).await;
        self.record_tool_call(&tool, &approval.request.args, &result, Some(&approval.id))
            .await?;

        if !result.success {
            return Ok(ApprovalOutcome::ExecutionFailed {
                id: approval.id.clone(),
                tool,
                reason: result
                    .error
                    .unwrap_or_else(|| "Unknown error".to_string()),
                output: clip(&result.output, MAX_TOOL_ERROR_OUTPUT),
            });
        }

        let output = if result.output.is_empty() {
            "Done."
        } else {
            result.output.as_str()
        };
        Ok(ApprovalOutcome::Executed {
            tool,
            output: clip(output, MAX_TOOL_ERROR_OUTPUT),
        })
    }

    // ── Read APIs ───────────────────────────────────────────────────────

    pub async fn pending_approvals(&self) -> StoreResult<Vec<Approval>> {
        self.store.pending_approvals().await
    }

    pub async fn timeline(&self, limit: usize) -> StoreResult<Vec<TimelineEvent>> {
        self.store.timeline(limit, None).await
    }
}

impl TurnHandler for Orchestrator {
    fn handle<'a>(
        &'a self,
        text: &'a str,
        channel: Channel,
    ) -> Pin<Box<dyn Future<Output = TurnOutcome> + Send + 'a>> {
        Box::pin(self.process_message(text, channel))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Empty or whitespace-only arguments mean "no arguments".
fn parse_tool_args(raw: &str) -> Result<ToolArgs, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(ToolArgs::new());
    }
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(ToolArgs::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

fn memory_context(memories: &[Memory]) -> String {
    if memories.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = memories
        .iter()
        .map(|memory| format!("- [{}] {}", memory.kind, memory.text))
        .collect();
    format!("\n\nRelevant memories:\n{}", lines.join("\n"))
}

fn approval_message(tool: &str, args: &ToolArgs, reason: &str, approval_id: &str) -> String {
    let args_pretty =
        serde_json::to_string_pretty(args).unwrap_or_else(|_| Value::Object(args.clone()).to_string());
    format!(
        "**Approval Required**\n\nAction: `{tool}`\nArgs: `{args_pretty}`\nReason: {reason}\n\nApproval ID: `{approval_id}`\nUse `/approve {approval_id}` or `/deny {approval_id}`"
    )
}

fn tool_failure_message(tool: &str, result: &ToolResult) -> String {
    let mut message = format!(
        "{tool} failed\nReason: {}",
        result.error.as_deref().unwrap_or("Unknown error")
    );
    let detail = clip(&result.output, MAX_TOOL_ERROR_OUTPUT);
    if !detail.is_empty() {
        message.push_str(&format!("\n\nOutput:\n{detail}"));
    }
    message
}
