use std::path::Path;

/// Everything the orchestrator is told about one scheduled task.
#[derive(Debug, Clone, Copy)]
pub struct TaskBrief<'a> {
    pub phase: u8,
    pub time: &'a str,
    pub task_id: &'a str,
    pub track: &'a str,
    pub objective: &'a str,
    pub goal: &'a str,
    pub output_dir: &'a Path,
    pub preferred_skills: &'a [String],
}

/// Render the execution prompt, ending with the `OUTPUT_PATHS:` /
/// `SUMMARY:` response protocol the scheduler later validates.
pub fn build_instruction(brief: &TaskBrief<'_>) -> String {
    let output_dir = brief.output_dir.display();
    let skills = if brief.preferred_skills.is_empty() {
        String::new()
    } else {
        format!("Preferred Skills: {}", brief.preferred_skills.join(", "))
    };

    let lines = [
        format!("AUTONOMY EXECUTION MODE - PHASE {}", brief.phase),
        format!("Time: {}", brief.time),
        format!("Task ID: {}", brief.task_id),
        format!("Track: {}", brief.track),
        format!("Track Objective: {}", brief.objective),
        format!("Goal: {}", brief.goal),
        format!("Output Dir: {output_dir}"),
        skills,
        String::new(),
        "Execution requirements:".into(),
        "- You MUST produce at least one real local file using filesystem.write.".into(),
        format!("- Save artifacts in or under: {output_dir}"),
        "- If building software, include executable shell commands and integration notes.".into(),
        "- Use risk-aware behavior for approvals (posting, payments, destructive actions must remain approval-gated).".into(),
        "- Before final answer, verify each output file exists with filesystem.exists.".into(),
        "- Final response format exactly:".into(),
        "  OUTPUT_PATHS:".into(),
        format!("  - {output_dir}/..."),
        "- Never output placeholder paths; output only real verified paths.".into(),
        "  SUMMARY:".into(),
        "  <concise what was produced and why it matters>".into(),
    ];

    lines
        .into_iter()
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
