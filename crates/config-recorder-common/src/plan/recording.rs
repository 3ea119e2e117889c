//! Recorder, delivery channel, recorder status and managed rules

use super::iam::RoleBinding;
use super::spec::*;
use super::ResourcePlan;
use crate::error::ValidationError;
use crate::facts::{Facts, ManagedRule};
use crate::label::{Naming, merge_tags};
use crate::topology::DerivedFacts;

/// Nodes emitted by [`plan_recording`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingNodes {
    pub recorder: NodeId,
    pub delivery_channel: NodeId,
    pub recorder_status: NodeId,
    pub rules: Vec<NodeId>,
}

/// Checks that must pass before any node is planned
///
/// A created role carries the S3 delivery policy, so its bucket ARN must be
/// a real S3 ARN in the context's partition.
pub(crate) fn validate(facts: &Facts, derived: &DerivedFacts) -> Result<(), ValidationError> {
    if facts.enabled && facts.s3_bucket_id.trim().is_empty() {
        return Err(ValidationError::EmptyBucketId);
    }

    if derived.create_iam_role_effective {
        let bucket_arn = facts.s3_bucket_arn.trim();
        if bucket_arn.is_empty() {
            return Err(ValidationError::EmptyBucketArn);
        }
        let prefix = format!("arn:{}:s3:::", facts.context.partition);
        if !bucket_arn.starts_with(&prefix) || bucket_arn.len() == prefix.len() {
            return Err(ValidationError::InvalidBucketArn {
                value: bucket_arn.to_string(),
                partition: facts.context.partition.clone(),
            });
        }
    }
    Ok(())
}

/// Plan the findings topic and resolve where notifications go
///
/// A supplied topic ARN wins over a created topic. The topic itself is
/// created whenever topic creation is effective.
pub fn plan_notification(
    facts: &Facts,
    derived: &DerivedFacts,
    naming: &impl Naming,
    plan: &mut ResourcePlan,
) -> Option<ArnRef> {
    let topic = derived.create_sns_topic_effective.then(|| {
        plan.add(
            ResourceSpec::Topic(TopicSpec {
                name: naming.resolve_name(&[]),
                subscribers: facts.subscribers.clone(),
                kms_master_key_id: facts.sns_encryption_key_id.clone(),
                tags: naming.resolve_tags(),
            }),
            &[],
        )
    });

    if !derived.notifications_enabled {
        return None;
    }

    match (&facts.supplied_notification_arn, topic) {
        (Some(arn), _) => Some(ArnRef::Literal(arn.clone())),
        (None, Some(node)) => Some(ArnRef::Output(node)),
        (None, None) => None,
    }
}

/// Plan the recorder chain and one rule per enabled managed rule
///
/// Returns `None` when the recorder is disabled. Expects facts that already
/// passed [`plan`](super::plan)'s validation.
pub fn plan_recording(
    facts: &Facts,
    derived: &DerivedFacts,
    naming: &impl Naming,
    role: &RoleBinding,
    notification: Option<ArnRef>,
    plan: &mut ResourcePlan,
) -> Option<RecordingNodes> {
    if !facts.enabled {
        return None;
    }

    let name = naming.resolve_name(&[]);
    let tags = naming.resolve_tags();

    let recorder = plan.add(
        ResourceSpec::Recorder(RecorderSpec {
            name: name.clone(),
            role_arn: role.arn.clone(),
            all_supported: true,
            include_global_resource_types: derived.is_global_recorder_region,
            recording_mode: facts.recording_mode.clone(),
        }),
        &role.prerequisites,
    );

    let mut channel_deps = vec![recorder];
    channel_deps.extend(role.arn.node());
    channel_deps.extend(notification.as_ref().and_then(ArnRef::node));

    let delivery_channel = plan.add(
        ResourceSpec::DeliveryChannel(DeliveryChannelSpec {
            name: name.clone(),
            s3_bucket_name: facts.s3_bucket_id.clone(),
            s3_key_prefix: Some(facts.s3_key_prefix.trim())
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            sns_topic_arn: notification,
        }),
        &channel_deps,
    );

    let recorder_status = plan.add(
        ResourceSpec::RecorderStatus(RecorderStatusSpec {
            recorder_name: name,
            is_enabled: true,
        }),
        &[delivery_channel],
    );

    let rules = facts
        .managed_rules
        .iter()
        .filter(|(_, rule)| rule.enabled)
        .map(|(rule_name, rule)| {
            plan.add(
                ResourceSpec::ManagedRule(rule_spec(rule_name, rule, &tags)),
                &[recorder_status],
            )
        })
        .collect();

    Some(RecordingNodes {
        recorder,
        delivery_channel,
        recorder_status,
        rules,
    })
}

fn rule_spec(
    name: &str,
    rule: &ManagedRule,
    shared_tags: &std::collections::BTreeMap<String, String>,
) -> RuleSpec {
    RuleSpec {
        name: name.to_string(),
        description: rule.description.clone(),
        source_identifier: rule.identifier.trim().to_string(),
        input_parameters: encode_parameters(&rule.input_parameters),
        tags: merge_tags(shared_tags, &rule.tags),
    }
}

/// JSON-encode rule parameters; null and empty objects/arrays encode to nothing
fn encode_parameters(params: &serde_json::Value) -> Option<String> {
    let empty = match params {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        serde_json::Value::String(s) => s.is_empty(),
        _ => false,
    };
    (!empty).then(|| params.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_parameters() {
        assert_eq!(encode_parameters(&json!(null)), None);
        assert_eq!(encode_parameters(&json!({})), None);
        assert_eq!(encode_parameters(&json!([])), None);
        assert_eq!(
            encode_parameters(&json!({"maxAccessKeyAge": "90"})).as_deref(),
            Some(r#"{"maxAccessKeyAge":"90"}"#)
        );
    }

    #[test]
    fn test_rule_spec_merges_tags() {
        let shared = std::collections::BTreeMap::from([
            ("Name".to_string(), "config".to_string()),
            ("team".to_string(), "security".to_string()),
        ]);
        let rule = ManagedRule {
            description: "Keys rotated".to_string(),
            identifier: "ACCESS_KEYS_ROTATED".to_string(),
            input_parameters: json!({"maxAccessKeyAge": "90"}),
            tags: std::collections::BTreeMap::from([(
                "team".to_string(),
                "iam".to_string(),
            )]),
            enabled: true,
        };
        let spec = rule_spec("access-keys-rotated", &rule, &shared);
        assert_eq!(spec.name, "access-keys-rotated");
        assert_eq!(spec.source_identifier, "ACCESS_KEYS_ROTATED");
        assert_eq!(spec.tags["team"], "iam");
        assert_eq!(spec.tags["Name"], "config");
    }
}
