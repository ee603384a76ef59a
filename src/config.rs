//! Ambient configuration (§10): where the six rule/input files and two
//! output files live on disk. Deserializable from TOML so it can be
//! hand-edited like the teacher's own `.rumdl.toml`; every field has a
//! sensible default under a conventional `data/` directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RadarError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    pub companies_file: PathBuf,
    pub quotes_file: PathBuf,
    pub mentions_file: PathBuf,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_alias_rules_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_block_rules_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_company_rules_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dailybrief_alias_rules_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dailybrief_posts_file: Option<PathBuf>,

    pub entity_resolution_report_file: PathBuf,
    pub dailybrief_story_mentions_file: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            companies_file: PathBuf::from("data/companies.json"),
            quotes_file: PathBuf::from("data/quotes.json"),
            mentions_file: PathBuf::from("data/mentions.json"),
            entity_alias_rules_file: Some(PathBuf::from("data/entity_alias_rules.json")),
            entity_block_rules_file: Some(PathBuf::from("data/entity_block_rules.json")),
            non_company_rules_file: Some(PathBuf::from("data/non_company_rules.json")),
            dailybrief_alias_rules_file: Some(PathBuf::from("data/dailybrief_alias_rules.json")),
            dailybrief_posts_file: Some(PathBuf::from("data/dailybrief_posts.json")),
            entity_resolution_report_file: PathBuf::from("data/entity_resolution_report.json"),
            dailybrief_story_mentions_file: PathBuf::from("data/dailybrief_story_mentions.json"),
        }
    }
}

impl PipelineConfig {
    /// Parse a `PipelineConfig` from a TOML source string, then validate
    /// it. Never touches the filesystem.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a `PipelineConfig` from a TOML file on disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| RadarError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&raw)
    }

    fn validate(&self) -> Result<()> {
        for (label, path) in [
            ("companies_file", &self.companies_file),
            ("quotes_file", &self.quotes_file),
            ("mentions_file", &self.mentions_file),
            ("entity_resolution_report_file", &self.entity_resolution_report_file),
            ("dailybrief_story_mentions_file", &self.dailybrief_story_mentions_file),
        ] {
            if path.as_os_str().is_empty() {
                return Err(RadarError::InvalidConfig(format!("{label} must not be empty")));
            }
        }
        Ok(())
    }
}
