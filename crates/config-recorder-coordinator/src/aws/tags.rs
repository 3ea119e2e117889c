//! Tag conversion for the AWS APIs
//!
//! Plans carry tags as a `BTreeMap`. Every created resource additionally
//! gets the tool tag so provisioned resources can be found later.
//!
//! ## Tag Schema
//!
//! | Tag Key | Description |
//! |---------|-------------|
//! | `Name` | Resolved resource name (from the label) |
//! | `config-recorder:tool` | Static identifier ("config-recorder") |
//! | label tags | Operator-supplied tags, rule tags merged over them |

use anyhow::Result;
use std::collections::BTreeMap;

/// Tag key for tool identification - all provisioned resources have this
pub const TAG_TOOL: &str = "config-recorder:tool";

/// Tag value for tool identification
pub const TAG_TOOL_VALUE: &str = "config-recorder";

/// Plan tags plus the tool tag; plan values win on collision
pub fn with_tool_tag(tags: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut all = BTreeMap::from([(TAG_TOOL.to_string(), TAG_TOOL_VALUE.to_string())]);
    all.extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
    all
}

/// Build IAM tags.
pub fn iam_tags(tags: &BTreeMap<String, String>) -> Result<Vec<aws_sdk_iam::types::Tag>> {
    with_tool_tag(tags)
        .into_iter()
        .map(|(key, value)| {
            aws_sdk_iam::types::Tag::builder()
                .key(key)
                .value(value)
                .build()
                .map_err(|e| anyhow::anyhow!("Failed to build IAM tag: {}", e))
        })
        .collect()
}

/// Build SNS tags.
pub fn sns_tags(tags: &BTreeMap<String, String>) -> Result<Vec<aws_sdk_sns::types::Tag>> {
    with_tool_tag(tags)
        .into_iter()
        .map(|(key, value)| {
            aws_sdk_sns::types::Tag::builder()
                .key(key)
                .value(value)
                .build()
                .map_err(|e| anyhow::anyhow!("Failed to build SNS tag: {}", e))
        })
        .collect()
}

/// Build AWS Config tags.
pub fn config_tags(tags: &BTreeMap<String, String>) -> Vec<aws_sdk_config::types::Tag> {
    with_tool_tag(tags)
        .into_iter()
        .map(|(key, value)| {
            aws_sdk_config::types::Tag::builder()
                .key(key)
                .value(value)
                .build()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_tags() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("Name".to_string(), "config".to_string()),
            ("team".to_string(), "security".to_string()),
        ])
    }

    #[test]
    fn test_tool_tag_added() {
        let tags = with_tool_tag(&plan_tags());
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[TAG_TOOL], TAG_TOOL_VALUE);
        assert_eq!(tags["team"], "security");
    }

    #[test]
    fn test_plan_tags_win() {
        let mut tags = plan_tags();
        tags.insert(TAG_TOOL.to_string(), "custom".to_string());
        assert_eq!(with_tool_tag(&tags)[TAG_TOOL], "custom");
    }

    #[test]
    fn test_sdk_tags() {
        let iam = iam_tags(&plan_tags()).unwrap();
        assert_eq!(iam.len(), 3);
        assert!(iam.iter().any(|t| t.key() == "Name" && t.value() == "config"));

        let sns = sns_tags(&plan_tags()).unwrap();
        assert_eq!(sns.len(), 3);

        let config = config_tags(&plan_tags());
        assert!(
            config
                .iter()
                .any(|t| t.key() == Some(TAG_TOOL) && t.value() == Some(TAG_TOOL_VALUE))
        );
    }
}
