//! 节目配置：角色表、基础发言池与话题列表，启动时从 JSON 文件加载。

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::orchestrator::traits::CharacterRegistry;
use crate::orchestrator::types::Character;

#[derive(Debug, Clone, Deserialize)]
pub struct ShowConfig {
    pub characters: Vec<Character>,
    /// 缺省时全部角色都在基础池中。
    #[serde(default)]
    pub base_pool: Option<Vec<String>>,
    pub topics: Vec<String>,
}

impl ShowConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read show file {}", path.display()))?;
        let show: ShowConfig = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse show file {}", path.display()))?;
        show.validate()?;

        info!(
            target: "character_registry",
            path = %path.display(),
            characters = show.characters.len(),
            topics = show.topics.len(),
            "show file loaded"
        );
        Ok(show)
    }

    pub fn validate(&self) -> Result<()> {
        if self.characters.is_empty() {
            bail!("show file must define at least one character");
        }

        let mut names = HashSet::new();
        for character in &self.characters {
            if character.name.trim().is_empty() {
                bail!("character names cannot be empty");
            }
            if !names.insert(character.name.as_str()) {
                bail!("duplicate character name {}", character.name);
            }
        }

        if let Some(pool) = &self.base_pool {
            if pool.is_empty() {
                bail!("base pool cannot be empty");
            }
            if let Some(missing) = pool.iter().find(|name| !names.contains(name.as_str())) {
                return Err(anyhow!("base pool references unknown character {missing}"));
            }
        }

        if self.topics.iter().all(|topic| topic.trim().is_empty()) {
            bail!("show file must define at least one topic");
        }
        Ok(())
    }

    pub fn registry(&self) -> StaticCharacterRegistry {
        let base = self
            .base_pool
            .clone()
            .unwrap_or_else(|| self.characters.iter().map(|c| c.name.clone()).collect());
        StaticCharacterRegistry::new(self.characters.clone(), base)
    }
}

/// 只读角色表；基础池保持配置中的顺序。
#[derive(Debug, Clone)]
pub struct StaticCharacterRegistry {
    characters: Vec<Character>,
    base: Vec<String>,
}

impl StaticCharacterRegistry {
    pub fn new(characters: Vec<Character>, base: Vec<String>) -> Self {
        Self { characters, base }
    }
}

impl CharacterRegistry for StaticCharacterRegistry {
    fn list_base(&self) -> Vec<Character> {
        self.base
            .iter()
            .filter_map(|name| self.lookup(name))
            .collect()
    }

    fn lookup(&self, name: &str) -> Option<Character> {
        self.characters
            .iter()
            .find(|character| character.name == name)
            .cloned()
    }
}
