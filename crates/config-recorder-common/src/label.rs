//! Naming and tagging provider
//!
//! Every resource in a plan is named and tagged through [`Naming`]. The
//! built-in [`Label`] joins its non-empty parts with a delimiter:
//!
//! | Part | Example |
//! |------|---------|
//! | `namespace` | `eg` |
//! | `environment` | `ue1` |
//! | `stage` | `prod` |
//! | `name` | `config` |
//! | `attributes` | `aggregator` |
//!
//! giving `eg-ue1-prod-config-aggregator`.

use crate::defaults::default_delimiter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag key carrying the resolved resource name
pub const TAG_NAME: &str = "Name";

/// Produces qualified resource names and the tags shared by every resource
pub trait Naming {
    /// Name for a resource, qualified with extra attributes
    fn resolve_name(&self, attributes: &[&str]) -> String;

    /// Tags applied to every resource
    fn resolve_tags(&self) -> BTreeMap<String, String>;
}

/// Label inputs from the settings file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Label {
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Default for Label {
    fn default() -> Self {
        Self {
            namespace: None,
            environment: None,
            stage: None,
            name: Some("config".to_string()),
            attributes: Vec::new(),
            delimiter: default_delimiter(),
            tags: BTreeMap::new(),
        }
    }
}

impl Naming for Label {
    fn resolve_name(&self, attributes: &[&str]) -> String {
        [&self.namespace, &self.environment, &self.stage, &self.name]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .chain(self.attributes.iter().map(String::as_str))
            .chain(attributes.iter().copied())
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(&self.delimiter)
            .to_lowercase()
    }

    fn resolve_tags(&self) -> BTreeMap<String, String> {
        let mut tags = self.tags.clone();
        tags.insert(TAG_NAME.to_string(), self.resolve_name(&[]));
        tags
    }
}

/// Merge rule-specific tags over shared tags; rule values win on collision
pub fn merge_tags(
    shared: &BTreeMap<String, String>,
    specific: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = shared.clone();
    merged.extend(specific.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label() -> Label {
        Label {
            namespace: Some("eg".to_string()),
            environment: Some("ue1".to_string()),
            stage: Some("Prod".to_string()),
            name: Some("config".to_string()),
            attributes: vec![],
            delimiter: "-".to_string(),
            tags: BTreeMap::from([("team".to_string(), "security".to_string())]),
        }
    }

    #[test]
    fn test_resolve_name() {
        assert_eq!(label().resolve_name(&[]), "eg-ue1-prod-config");
        assert_eq!(
            label().resolve_name(&["aggregator"]),
            "eg-ue1-prod-config-aggregator"
        );
    }

    #[test]
    fn test_resolve_name_skips_empty_parts() {
        let label = Label {
            environment: Some(String::new()),
            stage: None,
            ..label()
        };
        assert_eq!(label.resolve_name(&[""]), "eg-config");
    }

    #[test]
    fn test_resolve_tags_includes_name() {
        let tags = label().resolve_tags();
        assert_eq!(tags["Name"], "eg-ue1-prod-config");
        assert_eq!(tags["team"], "security");
    }

    #[test]
    fn test_merge_tags_specific_wins() {
        let shared = BTreeMap::from([
            ("team".to_string(), "security".to_string()),
            ("env".to_string(), "prod".to_string()),
        ]);
        let specific = BTreeMap::from([("team".to_string(), "compliance".to_string())]);
        let merged = merge_tags(&shared, &specific);
        assert_eq!(merged["team"], "compliance");
        assert_eq!(merged["env"], "prod");
        assert_eq!(merged.len(), 2);
    }
}
