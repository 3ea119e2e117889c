//! Settings and rollout target files
//!
//! Both files are JSON. Settings are shared by every execution context;
//! the targets file lists the profiles and regions a rollout covers.

use anyhow::{Context, Result};
use config_recorder_common::RecorderSettings;
use garde::Validate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Load and validate a settings file
pub fn load_settings(path: &Path) -> Result<RecorderSettings> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {}", path.display()))?;

    let settings: RecorderSettings = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse settings file {}", path.display()))?;

    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid settings in {}: {}", path.display(), e))?;

    Ok(settings)
}

/// Command-line overrides applied on top of the settings file
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub enabled: Option<bool>,
}

impl SettingsOverrides {
    pub fn apply(&self, mut settings: RecorderSettings) -> RecorderSettings {
        if let Some(enabled) = self.enabled {
            settings.enabled = enabled;
        }
        settings
    }
}

/// One AWS profile and the regions to roll out to with it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Shared-config profile (default credential chain when absent)
    #[serde(default)]
    #[garde(skip)]
    pub profile: Option<String>,

    #[garde(length(min = 1), inner(length(min = 1)))]
    pub regions: Vec<String>,
}

/// Contents of a rollout targets file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RolloutTargets {
    #[garde(length(min = 1), dive)]
    pub targets: Vec<TargetConfig>,
}

impl RolloutTargets {
    /// Every (profile, region) pair, in file order
    pub fn pairs(&self) -> impl Iterator<Item = (Option<&str>, &str)> {
        self.targets.iter().flat_map(|target| {
            target
                .regions
                .iter()
                .map(move |region| (target.profile.as_deref(), region.as_str()))
        })
    }
}

/// Load and validate a rollout targets file
pub fn load_targets(path: &Path) -> Result<RolloutTargets> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read targets file {}", path.display()))?;

    let targets: RolloutTargets = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse targets file {}", path.display()))?;

    targets
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid targets in {}: {}", path.display(), e))?;

    Ok(targets)
}
