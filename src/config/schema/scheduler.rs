use serde::{Deserialize, Serialize};

/// A named category of autonomous work with a pool of goal templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackConfig {
    pub name: String,
    pub objective: String,
    pub task_templates: Vec<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

pub(crate) fn default_output_dir() -> String {
    "data/artifacts".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Autonomy phase announced in every task instruction.
    #[serde(default = "default_phase")]
    pub phase: u8,
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
    #[serde(default = "default_max_open_tasks")]
    pub max_open_tasks: u32,
    #[serde(default = "default_max_tasks_seed_per_tick")]
    pub max_tasks_seed_per_tick: u32,
    #[serde(default = "default_max_tasks_run_per_tick")]
    pub max_tasks_run_per_tick: u32,
    #[serde(default = "default_true")]
    pub enforce_file_outputs: bool,
    /// Artifacts modified up to this long before execution start still count
    /// as fresh.
    #[serde(default = "default_clock_skew_tolerance_ms")]
    pub clock_skew_tolerance_ms: u64,
    #[serde(default = "default_tracks")]
    pub tracks: Vec<TrackConfig>,
}

fn default_true() -> bool {
    true
}

fn default_phase() -> u8 {
    4
}

fn default_tick_seconds() -> u64 {
    90
}

fn default_max_open_tasks() -> u32 {
    12
}

fn default_max_tasks_seed_per_tick() -> u32 {
    3
}

fn default_max_tasks_run_per_tick() -> u32 {
    3
}

fn default_clock_skew_tolerance_ms() -> u64 {
    5000
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            phase: default_phase(),
            tick_seconds: default_tick_seconds(),
            max_open_tasks: default_max_open_tasks(),
            max_tasks_seed_per_tick: default_max_tasks_seed_per_tick(),
            max_tasks_run_per_tick: default_max_tasks_run_per_tick(),
            enforce_file_outputs: true,
            clock_skew_tolerance_ms: default_clock_skew_tolerance_ms(),
            tracks: default_tracks(),
        }
    }
}

impl SchedulerConfig {
    pub fn clamp_limits(&mut self) {
        self.tick_seconds = self.tick_seconds.clamp(15, 3600);
        self.max_open_tasks = self.max_open_tasks.clamp(1, 50);
        self.max_tasks_seed_per_tick = self.max_tasks_seed_per_tick.clamp(1, 8);
        self.max_tasks_run_per_tick = self.max_tasks_run_per_tick.clamp(1, 10);
        self.tracks.retain(|track| {
            let usable = !track.name.trim().is_empty() && !track.task_templates.is_empty();
            if !usable {
                tracing::warn!(track = %track.name, "dropping track without name or templates");
            }
            usable
        });
        if self.tracks.is_empty() {
            self.tracks = default_tracks();
        }
    }
}

fn track(name: &str, objective: &str, templates: &[&str]) -> TrackConfig {
    TrackConfig {
        name: name.into(),
        objective: objective.into(),
        task_templates: templates.iter().map(|t| (*t).to_string()).collect(),
        required_skills: Vec::new(),
        output_dir: default_output_dir(),
    }
}

pub fn default_tracks() -> Vec<TrackConfig> {
    vec![
        track(
            "Scout",
            "Find one concrete demand signal and turn it into an execution-ready opportunity.",
            &[
                "Identify one high-intent problem worth solving this week and capture proof links.",
                "Find one audience pain point and propose one high-leverage content angle with evidence.",
            ],
        ),
        track(
            "Builder",
            "Ship one tangible asset in the workspace that can be used or sold.",
            &[
                "Create one usable asset tied to current opportunities and log exact output paths.",
                "Improve one existing asset for higher conversion or clarity and log exact changes.",
            ],
        ),
        track(
            "Publisher",
            "Create one distribution artifact that drives traffic, trust, or leads.",
            &["Draft one high-value distribution artifact tied to shipped work with explicit CTA."],
        ),
        track(
            "Closer",
            "Move one opportunity toward revenue with explicit next actions.",
            &["Draft one concise offer and CTA sequence for the highest-leverage lead."],
        ),
    ]
}
