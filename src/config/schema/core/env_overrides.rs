use super::Config;
use std::path::PathBuf;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("OPENROUTER_API_KEY")
            && !key.is_empty()
        {
            self.openrouter_api_key = Some(key);
        }

        if let Ok(key) = std::env::var("GROQ_API_KEY")
            && !key.is_empty()
        {
            self.groq_api_key = Some(key);
        }

        if let Ok(workspace) = std::env::var("FORGECLAW_WORKSPACE")
            && !workspace.is_empty()
        {
            self.workspace_dir = PathBuf::from(shellexpand::tilde(&workspace).into_owned());
        }

        if let Ok(raw) = std::env::var("FORGECLAW_MAX_COST_PER_DAY")
            && let Ok(dollars) = raw.parse::<f64>()
            && dollars > 0.0
        {
            self.budget.max_cost_per_day = dollars;
        }
    }
}
