use super::{Commands, MemoryCommands};
use anyhow::{Context, Result};
use forgeclaw::agent::{Channel, Orchestrator, TurnOutcome};
use forgeclaw::store::{NewMemory, Store};
use forgeclaw::utils::text::prefix_chars;
use forgeclaw::{Config, Scheduler};
use std::sync::Arc;

const PREVIEW_CHARS: usize = 120;

pub async fn dispatch(command: Commands, config: Config) -> Result<()> {
    let store = Store::open(&config.database_path)
        .await
        .with_context(|| format!("open store at {}", config.database_path.display()))?;

    match command {
        Commands::Run => {
            let scheduler = scheduler(&config, store).await?;
            tokio::select! {
                () = scheduler.run() => {}
                result = tokio::signal::ctrl_c() => {
                    result.context("listen for Ctrl-C")?;
                    tracing::info!("shutdown requested");
                }
            }
            Ok(())
        }
        Commands::Tick => {
            let report = scheduler(&config, store).await?.tick().await;
            println!(
                "seeded {} task(s), executed {}",
                report.seeded, report.executed
            );
            if let Some(error) = report.error {
                anyhow::bail!("tick failed: {error}");
            }
            Ok(())
        }
        Commands::Chat { message } => {
            let orchestrator = Orchestrator::from_config(&config, store).await?;
            let outcome = orchestrator.process_message(&message, Channel::Cli).await;
            println!("{outcome}");
            if let TurnOutcome::Failed { kind, .. } = outcome {
                anyhow::bail!("turn failed ({kind})");
            }
            Ok(())
        }
        Commands::Approve { id } => {
            let orchestrator = Orchestrator::from_config(&config, store).await?;
            println!("{}", orchestrator.approve_action(&id).await?);
            Ok(())
        }
        Commands::Deny { id } => {
            let orchestrator = Orchestrator::from_config(&config, store).await?;
            println!("{}", orchestrator.deny_action(&id).await?);
            Ok(())
        }
        Commands::Approvals => {
            let pending = store.pending_approvals().await?;
            if pending.is_empty() {
                println!("No pending approvals.");
            }
            for approval in pending {
                println!(
                    "{}  {}  risk {}  {}  (requested {})",
                    approval.id,
                    approval.request.tool,
                    approval.request.risk_level,
                    approval.request.reason,
                    approval.requested_at
                );
            }
            Ok(())
        }
        Commands::Timeline { limit, event_type } => {
            for event in store.timeline(limit, event_type).await? {
                println!(
                    "{}  {:<12} {}",
                    event.timestamp,
                    event.event_type,
                    prefix_chars(&event.summary, PREVIEW_CHARS)
                );
            }
            Ok(())
        }
        Commands::Tasks { limit, status } => {
            for task in store.list_tasks(limit, status).await? {
                println!(
                    "{}  {:<10} {}",
                    task.id,
                    task.status,
                    prefix_chars(&task.goal, PREVIEW_CHARS)
                );
            }
            Ok(())
        }
        Commands::Memory { memory_command } => memory(&store, memory_command).await,
        Commands::Stats => {
            let stats = store.system_stats().await?;
            println!("Memories:          {}", stats.memories);
            println!("Timeline events:   {}", stats.timeline_events);
            println!(
                "Approvals:         {} pending / {} total",
                stats.approvals_pending, stats.approvals_total
            );
            println!(
                "Tasks:             {} open ({} planning, {} executing, {} paused)",
                stats.tasks_open(),
                stats.tasks_planning,
                stats.tasks_executing,
                stats.tasks_paused
            );
            println!(
                "                   {} completed, {} failed",
                stats.tasks_completed, stats.tasks_failed
            );
            println!(
                "Spend today:       ${:.2} of ${:.2}",
                stats.cost_today_cents / 100.0,
                config.budget.max_cost_per_day
            );
            Ok(())
        }
    }
}

async fn memory(store: &Store, command: MemoryCommands) -> Result<()> {
    match command {
        MemoryCommands::Add {
            text,
            kind,
            importance,
            tags,
        } => {
            let memory = store
                .add_memory(
                    &NewMemory::new(kind, text)
                        .with_tags(tags)
                        .with_importance(importance),
                )
                .await?;
            println!("Stored memory {} ({})", memory.id, memory.kind);
        }
        MemoryCommands::Search { query, limit } => {
            let found = store.search_memories(&query, limit).await?;
            if found.is_empty() {
                println!("No memories match \"{query}\".");
            }
            for memory in found {
                println!("[{}] {}  ({})", memory.kind, memory.text, memory.id);
            }
        }
    }
    Ok(())
}

async fn scheduler(config: &Config, store: Store) -> Result<Scheduler> {
    let orchestrator = Arc::new(Orchestrator::from_config(config, store.clone()).await?);
    Ok(Scheduler::new(
        store,
        orchestrator,
        config.scheduler.clone(),
        config.workspace_dir.clone(),
    ))
}
