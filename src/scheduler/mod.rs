//! Autonomous task loop: seeds goals from configured tracks, claims them one
//! at a time, hands each to the orchestrator and validates the declared
//! artifacts before closing the task.

pub mod archive;
pub mod artifacts;
pub mod instruction;
pub mod tracks;

use crate::agent::{Channel, TurnHandler, TurnOutcome};
use crate::config::SchedulerConfig;
use crate::store::{Store, Task, TaskStatus, TimelineEventType};
use crate::utils::paths::normalize_in_workspace;
use crate::utils::text::clip;
use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use instruction::{TaskBrief, build_instruction};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};
use tokio::time::{self, MissedTickBehavior};

const MAX_RESULT_SUMMARY: usize = 1200;
const MAX_EVENT_RESPONSE: usize = 500;

/// What one call to [`Scheduler::tick`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Another tick was still running.
    pub skipped: bool,
    pub seeded: usize,
    pub executed: usize,
    /// Set when the tick aborted; already logged and recorded.
    pub error: Option<String>,
}

/// Clears the running flag on every exit path.
struct TickGuard<'a>(&'a AtomicBool);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Scheduler {
    store: Store,
    handler: Arc<dyn TurnHandler>,
    config: SchedulerConfig,
    workspace: PathBuf,
    running: AtomicBool,
    seed_counter: AtomicUsize,
}

impl Scheduler {
    pub fn new(
        store: Store,
        handler: Arc<dyn TurnHandler>,
        config: SchedulerConfig,
        workspace: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            handler,
            config,
            workspace: workspace.into(),
            running: AtomicBool::new(false),
            seed_counter: AtomicUsize::new(0),
        }
    }

    /// Tick immediately, then every `tick_seconds`, forever. Returns at once
    /// when the scheduler is disabled.
    pub async fn run(&self) {
        if !self.config.enabled {
            tracing::warn!("autonomy scheduler disabled via config");
            return;
        }

        let track_names: Vec<&str> = self
            .config
            .tracks
            .iter()
            .map(|track| track.name.as_str())
            .collect();
        tracing::info!(
            phase = self.config.phase,
            tick_seconds = self.config.tick_seconds,
            max_open_tasks = self.config.max_open_tasks,
            max_tasks_run_per_tick = self.config.max_tasks_run_per_tick,
            tracks = ?track_names,
            "scheduler started"
        );

        let mut interval = time::interval(Duration::from_secs(self.config.tick_seconds));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let report = self.tick().await;
            tracing::debug!(?report, "scheduler tick finished");
        }
    }

    /// One pass: daily archive, seeding, then sequential execution. Never
    /// fails; errors are logged and recorded on the timeline.
    pub async fn tick(&self) -> TickReport {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("scheduler tick already running; skipping");
            return TickReport {
                skipped: true,
                ..TickReport::default()
            };
        }
        let _guard = TickGuard(&self.running);

        let mut report = TickReport::default();
        if let Err(error) = self.run_tick(&mut report).await {
            let message = format!("{error:#}");
            tracing::error!(error = %message, "scheduler tick failed");
            if let Err(log_error) = self
                .store
                .append_event(
                    TimelineEventType::Error,
                    "Scheduler tick failed",
                    json!({ "error": message }),
                )
                .await
            {
                tracing::warn!(error = %log_error, "failed to record scheduler error");
            }
            report.error = Some(message);
        }
        report
    }

    async fn run_tick(&self, report: &mut TickReport) -> anyhow::Result<()> {
        archive::ensure_daily_archive(&self.workspace, Utc::now().date_naive()).await?;
        report.seeded = self.seed_tasks().await?;

        let eligible: &[TaskStatus] = if self.store.count_pending_approvals().await? > 0 {
            &[TaskStatus::Planning]
        } else {
            &[TaskStatus::Planning, TaskStatus::Paused]
        };

        while report.executed < self.config.max_tasks_run_per_tick as usize {
            let Some(task) = self.store.claim_next_task(eligible).await? else {
                break;
            };
            self.execute_task(&task).await?;
            report.executed += 1;

            if self.store.count_pending_approvals().await? > 0 {
                break;
            }
        }
        Ok(())
    }

    // ── Seeding ─────────────────────────────────────────────────────────

    async fn seed_tasks(&self) -> anyhow::Result<usize> {
        if self.store.count_pending_approvals().await? > 0 || self.config.tracks.is_empty() {
            return Ok(0);
        }

        let max_open = i64::from(self.config.max_open_tasks);
        let mut created = 0;
        while created < self.config.max_tasks_seed_per_tick as usize
            && self.store.count_open_tasks().await? < max_open
        {
            let seq = self.seed_counter.fetch_add(1, Ordering::SeqCst) + 1;
            let track = &self.config.tracks[(seq - 1) % self.config.tracks.len()];
            let template = tracks::template_for(track, seq);
            let output_dir = normalize_in_workspace(&self.workspace, &track.output_dir);
            tokio::fs::create_dir_all(&output_dir)
                .await
                .with_context(|| format!("create output directory {}", output_dir.display()))?;

            let goal = format!("[{}] {template}", track.name);
            let task = self
                .store
                .create_task(&goal, &tracks::seed_plan(track, &output_dir))
                .await?;
            self.store
                .append_event(
                    TimelineEventType::PlanCreated,
                    &format!("Scheduler seeded task {}", task.id),
                    json!({
                        "task_id": task.id,
                        "goal": task.goal,
                        "track": track.name,
                        "output_dir": output_dir.display().to_string(),
                    }),
                )
                .await?;
            tracing::info!(task_id = %task.id, track = %track.name, "task seeded");
            created += 1;
        }
        Ok(created)
    }

    // ── Execution ───────────────────────────────────────────────────────

    async fn execute_task(&self, task: &Task) -> anyhow::Result<()> {
        let started = SystemTime::now();
        let track_name = tracks::parse_track_name(&task.goal);
        let track = tracks::find_track(&self.config.tracks, track_name);
        let objective = track.map_or(tracks::FALLBACK_OBJECTIVE, |t| t.objective.as_str());
        let output_dir = normalize_in_workspace(
            &self.workspace,
            track.map_or(tracks::FALLBACK_OUTPUT_DIR, |t| t.output_dir.as_str()),
        );
        let preferred_skills = track.map(|t| t.required_skills.as_slice()).unwrap_or_default();
        let time = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        let instruction = build_instruction(&TaskBrief {
            phase: self.config.phase,
            time: &time,
            task_id: &task.id,
            track: track_name,
            objective,
            goal: &task.goal,
            output_dir: &output_dir,
            preferred_skills,
        });

        tracing::info!(task_id = %task.id, track = track_name, "executing task");
        let outcome = match self.handler.handle(&instruction, Channel::Scheduler).await {
            TurnOutcome::Answer(text) => {
                let recovered =
                    artifacts::recover_inline_write(&self.workspace, &text, &task.id).await;
                TurnOutcome::Answer(recovered.unwrap_or(text))
            }
            other => other,
        };

        match outcome {
            TurnOutcome::ApprovalRequired { message, .. } => {
                self.finish(task, TaskStatus::Paused, &message).await?;
                self.store
                    .append_event(
                        TimelineEventType::PlanStep,
                        &format!("Task {} paused for approval", task.id),
                        json!({ "task_id": task.id, "status": TaskStatus::Paused }),
                    )
                    .await?;
            }
            TurnOutcome::Failed { kind, message } => {
                self.finish(task, TaskStatus::Failed, &message).await?;
                self.store
                    .append_event(
                        TimelineEventType::Error,
                        &format!("Task {} failed", task.id),
                        json!({
                            "task_id": task.id,
                            "kind": kind,
                            "response": clip(&message, MAX_EVENT_RESPONSE),
                        }),
                    )
                    .await?;
            }
            TurnOutcome::Answer(text) if self.config.enforce_file_outputs => {
                self.complete_with_artifacts(task, &text, started).await?;
            }
            TurnOutcome::Answer(text) => {
                self.finish(task, TaskStatus::Completed, &text).await?;
                self.store
                    .append_event(
                        TimelineEventType::PlanStep,
                        &format!("Task {} completed", task.id),
                        json!({ "task_id": task.id, "status": TaskStatus::Completed }),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    async fn complete_with_artifacts(
        &self,
        task: &Task,
        response: &str,
        started: SystemTime,
    ) -> anyhow::Result<()> {
        let skew = Duration::from_millis(self.config.clock_skew_tolerance_ms);
        match artifacts::verify_output_paths(&self.workspace, response, started, skew) {
            Ok(paths) => {
                let listed: Vec<String> = paths
                    .iter()
                    .map(|path| format!("- {}", path.display()))
                    .collect();
                let summary = format!(
                    "{response}\n\nVerified output paths:\n{}",
                    listed.join("\n")
                );
                self.finish(task, TaskStatus::Completed, &summary).await?;
                let output_paths: Vec<String> = paths
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect();
                self.store
                    .append_event(
                        TimelineEventType::PlanStep,
                        &format!("Task {} completed", task.id),
                        json!({
                            "task_id": task.id,
                            "status": TaskStatus::Completed,
                            "output_paths": output_paths,
                        }),
                    )
                    .await?;
            }
            Err(reason) => {
                tracing::warn!(task_id = %task.id, %reason, "task failed output validation");
                let summary =
                    format!("Task failed validation\nReason: {reason}\n\nRaw response:\n{response}");
                self.finish(task, TaskStatus::Failed, &summary).await?;
                self.store
                    .append_event(
                        TimelineEventType::Error,
                        &format!("Task {} failed output validation", task.id),
                        json!({ "task_id": task.id, "reason": reason }),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    async fn finish(&self, task: &Task, status: TaskStatus, summary: &str) -> anyhow::Result<()> {
        self.store
            .transition_task(&task.id, status, Some(&clip(summary, MAX_RESULT_SUMMARY)))
            .await
            .with_context(|| format!("record task {} as {status}", task.id))?;
        tracing::info!(task_id = %task.id, %status, "task status recorded");
        Ok(())
    }
}
