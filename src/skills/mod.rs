use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// A capability prompt injected into the system prompt when its triggers
/// appear in a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skill {
    pub name: String,
    /// Lowercased keywords.
    pub triggers: Vec<String>,
    pub prompt: String,
}

/// Optional `skill.toml` next to `prompt.md`.
#[derive(Debug, Default, Deserialize)]
struct SkillManifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    triggers: Vec<String>,
}

/// Skills discovered at startup. Never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct SkillRegistry {
    skills: Vec<Skill>,
}

impl SkillRegistry {
    /// Scan each directory in `dirs` (relative to `workspace` unless
    /// absolute). Missing directories are skipped; the first skill with a
    /// given name (case-insensitive) wins.
    pub fn load(workspace: &Path, dirs: &[String]) -> Self {
        let mut skills = Vec::new();
        let mut seen = HashSet::new();

        for dir in dirs {
            let root = workspace.join(dir);
            for skill in load_skills_from_directory(&root) {
                if seen.insert(skill.name.to_lowercase()) {
                    skills.push(skill);
                }
            }
        }

        tracing::info!(skills = skills.len(), "skill registry loaded");
        Self { skills }
    }

    pub fn from_skills(skills: Vec<Skill>) -> Self {
        Self { skills }
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.skills.iter().map(|skill| skill.name.as_str()).collect()
    }

    /// Keyword match against `message`: +1 per contained trigger, +2 when the
    /// skill name itself appears. Highest score first, ties keep load order.
    pub fn select(&self, message: &str, limit: usize) -> Vec<&Skill> {
        let message = message.to_lowercase();
        let mut scored: Vec<(usize, &Skill)> = self
            .skills
            .iter()
            .filter_map(|skill| {
                let mut score = skill
                    .triggers
                    .iter()
                    .filter(|trigger| !trigger.is_empty() && message.contains(trigger.as_str()))
                    .count();
                if message.contains(&skill.name.to_lowercase()) {
                    score += 2;
                }
                (score > 0).then_some((score, skill))
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, skill)| skill)
            .collect()
    }
}

fn load_skills_from_directory(root: &Path) -> Vec<Skill> {
    let mut skills = Vec::new();

    let Ok(entries) = std::fs::read_dir(root) else {
        return skills;
    };

    let mut paths: Vec<_> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    paths.sort();

    for path in paths {
        if let Some(skill) = load_skill(&path) {
            skills.push(skill);
        }
    }

    skills
}

fn load_skill(dir: &Path) -> Option<Skill> {
    let dir_name = dir.file_name()?.to_string_lossy().into_owned();
    let prompt = std::fs::read_to_string(dir.join("prompt.md")).ok()?;
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return None;
    }

    let manifest = read_manifest(dir, &dir_name);
    let name = manifest
        .name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| dir_name.clone());
    let triggers = if manifest.triggers.is_empty() {
        vec![dir_name.to_lowercase()]
    } else {
        manifest
            .triggers
            .iter()
            .map(|trigger| trigger.to_lowercase())
            .collect()
    };

    Some(Skill {
        name,
        triggers,
        prompt: prompt.to_string(),
    })
}

fn read_manifest(dir: &Path, dir_name: &str) -> SkillManifest {
    let path = dir.join("skill.toml");
    let Ok(raw) = std::fs::read_to_string(&path) else {
        return SkillManifest::default();
    };
    match toml::from_str(&raw) {
        Ok(manifest) => manifest,
        Err(error) => {
            tracing::warn!(skill = dir_name, %error, "failed to parse skill manifest; using defaults");
            SkillManifest::default()
        }
    }
}
