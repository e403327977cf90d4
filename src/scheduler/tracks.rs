use crate::config::TrackConfig;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Track name used when a goal carries no `[Track]` tag.
pub const FALLBACK_TRACK: &str = "Operator";
pub const FALLBACK_OBJECTIVE: &str = "Ship meaningful progress with concrete outputs.";
pub const FALLBACK_OUTPUT_DIR: &str = "data/artifacts";
pub const FALLBACK_TEMPLATE: &str = "Create one concrete artifact and log exactly what changed.";
const DEFAULT_PREFERRED_SKILLS: &str = "code-builder, content-engine, web-researcher";

static TRACK_TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^\[([^\]]+)\]").ok());

/// `"[Builder] Ship a page"` → `"Builder"`.
pub fn parse_track_name(goal: &str) -> &str {
    TRACK_TAG
        .as_ref()
        .and_then(|pattern| pattern.captures(goal))
        .and_then(|captures| captures.get(1))
        .map_or(FALLBACK_TRACK, |name| name.as_str())
}

pub fn find_track<'a>(tracks: &'a [TrackConfig], name: &str) -> Option<&'a TrackConfig> {
    tracks.iter().find(|track| track.name == name)
}

/// Template for the `seq`-th seeded task (1-based) on `track`.
pub fn template_for(track: &TrackConfig, seq: usize) -> &str {
    if track.task_templates.is_empty() {
        return FALLBACK_TEMPLATE;
    }
    let index = seq.saturating_sub(1) % track.task_templates.len();
    &track.task_templates[index]
}

/// Plan steps stored on a freshly seeded task.
pub fn seed_plan(track: &TrackConfig, output_dir: &Path) -> Vec<String> {
    let skills = if track.required_skills.is_empty() {
        DEFAULT_PREFERRED_SKILLS.to_string()
    } else {
        track.required_skills.join(", ")
    };
    vec![
        format!("Track objective: {}", track.objective),
        format!("Output directory: {}", output_dir.display()),
        format!("Preferred skills: {skills}"),
        "Create at least one concrete artifact and verify it exists on disk.".to_string(),
    ]
}
