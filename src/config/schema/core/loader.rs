use super::Config;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::{Path, PathBuf};

impl Config {
    /// Load `~/.forgeclaw/config.toml`, writing defaults on first run.
    ///
    /// `FORGECLAW_CONFIG` or an explicit path overrides the location; the
    /// workspace and database then live next to that file.
    pub fn load_or_init(explicit_path: Option<&Path>) -> Result<Self> {
        let config_path = match explicit_path {
            Some(path) => expand_path(path),
            None => match std::env::var("FORGECLAW_CONFIG") {
                Ok(raw) if !raw.trim().is_empty() => expand_path(Path::new(raw.trim())),
                _ => {
                    let home = UserDirs::new()
                        .map(|u| u.home_dir().to_path_buf())
                        .context("Could not find home directory")?;
                    home.join(".forgeclaw").join("config.toml")
                }
            },
        };
        let forgeclaw_dir = config_path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        if !forgeclaw_dir.exists() {
            fs::create_dir_all(&forgeclaw_dir).context("Failed to create .forgeclaw directory")?;
        }

        let mut config = if config_path.exists() {
            let contents =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            toml::from_str::<Config>(&contents).context("Failed to parse config file")?
        } else {
            let config = Self::default();
            let toml_str =
                toml::to_string_pretty(&config).context("Failed to serialize config")?;
            fs::write(&config_path, toml_str).context("Failed to write config file")?;
            tracing::info!(path = %config_path.display(), "wrote default config");
            config
        };

        config.config_path.clone_from(&config_path);
        config.workspace_dir = forgeclaw_dir.join("workspace");
        config.database_path = forgeclaw_dir.join("forgeclaw.db");
        config.apply_env_overrides();

        fs::create_dir_all(&config.workspace_dir)
            .context("Failed to create workspace directory")?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }
}

fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
}
