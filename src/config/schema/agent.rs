use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Overrides the built-in system prompt when set.
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default = "default_memory_context_limit")]
    pub memory_context_limit: u32,
    #[serde(default = "default_skill_limit")]
    pub skill_limit: usize,
    /// Window is trimmed once it grows past this many entries...
    #[serde(default = "default_window_max_entries")]
    pub window_max_entries: usize,
    /// ...down to this many.
    #[serde(default = "default_window_keep_entries")]
    pub window_keep_entries: usize,
    /// Skill directories, relative to the workspace unless absolute.
    #[serde(default = "default_skill_dirs")]
    pub skill_dirs: Vec<String>,
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    #[serde(default = "default_shell_timeout_secs")]
    pub shell_timeout_secs: u64,
}

fn default_memory_context_limit() -> u32 {
    5
}

fn default_skill_limit() -> usize {
    3
}

fn default_window_max_entries() -> usize {
    50
}

fn default_window_keep_entries() -> usize {
    20
}

fn default_skill_dirs() -> Vec<String> {
    vec![
        "data/skills-installed".into(),
        "skills".into(),
        "skills-registry".into(),
    ]
}

fn default_tool_timeout_secs() -> u64 {
    120
}

fn default_shell_timeout_secs() -> u64 {
    30
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            memory_context_limit: default_memory_context_limit(),
            skill_limit: default_skill_limit(),
            window_max_entries: default_window_max_entries(),
            window_keep_entries: default_window_keep_entries(),
            skill_dirs: default_skill_dirs(),
            tool_timeout_secs: default_tool_timeout_secs(),
            shell_timeout_secs: default_shell_timeout_secs(),
        }
    }
}
