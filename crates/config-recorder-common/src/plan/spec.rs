//! Resource specs, one per plan node
//!
//! Specs are inert descriptions. Anything a spec needs from an earlier node
//! (a role ARN, a topic ARN) is an [`ArnRef`] resolved by the materializer
//! once that node has been created.

use crate::account::AccountId;
use crate::facts::{RecordingMode, SubscriberSpec};
use crate::policy;
use crate::resource_kind::ResourceKind;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Index of a node in a [`ResourcePlan`](super::ResourcePlan)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Reference to an ARN: known up front, or produced by an earlier node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "value", rename_all = "snake_case")]
pub enum ArnRef {
    Literal(String),
    Output(NodeId),
}

impl ArnRef {
    /// Node that must be created before this reference can be resolved
    pub fn node(&self) -> Option<NodeId> {
        match self {
            ArnRef::Literal(_) => None,
            ArnRef::Output(id) => Some(*id),
        }
    }
}

/// What a created resource handed back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedResource {
    pub arn: String,
    pub name: String,
}

/// Outputs of nodes created so far in a materialization run
#[derive(Debug, Clone, Default)]
pub struct PlanOutputs {
    created: HashMap<NodeId, CreatedResource>,
}

impl PlanOutputs {
    pub fn record(&mut self, node: NodeId, created: CreatedResource) {
        self.created.insert(node, created);
    }

    pub fn get(&self, node: NodeId) -> Option<&CreatedResource> {
        self.created.get(&node)
    }

    /// Resolve a reference, `None` if it points at a node not created yet
    pub fn resolve(&self, arn: &ArnRef) -> Option<String> {
        match arn {
            ArnRef::Literal(value) => Some(value.clone()),
            ArnRef::Output(id) => self.created.get(id).map(|c| c.arn.clone()),
        }
    }
}

/// SNS topic receiving findings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicSpec {
    pub name: String,
    pub subscribers: Vec<SubscriberSpec>,
    pub kms_master_key_id: Option<String>,
    pub tags: BTreeMap<String, String>,
}

/// Inline policy document attached to the recorder role
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "document", rename_all = "snake_case")]
pub enum PolicyDocument {
    S3Delivery { bucket_arn: String },
    SnsPublish { topic_arn: ArnRef },
}

impl PolicyDocument {
    /// Name of the inline policy holding this document
    pub fn policy_name(&self) -> &'static str {
        match self {
            PolicyDocument::S3Delivery { .. } => "config-s3-delivery",
            PolicyDocument::SnsPublish { .. } => "config-sns-publish",
        }
    }

    /// Render the JSON document, `None` while a referenced ARN is unresolved
    pub fn render(&self, outputs: &PlanOutputs) -> Option<String> {
        match self {
            PolicyDocument::S3Delivery { bucket_arn } => {
                Some(policy::s3_delivery_policy(bucket_arn))
            }
            PolicyDocument::SnsPublish { topic_arn } => outputs
                .resolve(topic_arn)
                .map(|arn| policy::sns_publish_policy(&arn)),
        }
    }
}

/// Recorder IAM role
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IamRoleSpec {
    pub name: String,
    /// Use `name` verbatim instead of as a prefix
    pub use_fullname: bool,
    /// Service principals trusted to assume the role
    pub principals: Vec<String>,
    pub policy_documents: Vec<PolicyDocument>,
    pub tags: BTreeMap<String, String>,
}

/// Managed policy attached to the created role
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RolePolicyAttachmentSpec {
    /// Node of the created role
    pub role: NodeId,
    pub policy_arn: String,
}

/// Configuration recorder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecorderSpec {
    pub name: String,
    pub role_arn: ArnRef,
    /// Always true: every supported resource type is recorded
    pub all_supported: bool,
    pub include_global_resource_types: bool,
    pub recording_mode: Option<RecordingMode>,
}

/// Delivery channel routing snapshots to S3 and, optionally, SNS
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryChannelSpec {
    pub name: String,
    pub s3_bucket_name: String,
    pub s3_key_prefix: Option<String>,
    pub sns_topic_arn: Option<ArnRef>,
}

/// Starts the recorder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecorderStatusSpec {
    pub recorder_name: String,
    pub is_enabled: bool,
}

/// AWS managed Config rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSpec {
    pub name: String,
    pub description: String,
    pub source_identifier: String,
    /// JSON-encoded parameters, absent when the rule has none
    pub input_parameters: Option<String>,
    pub tags: BTreeMap<String, String>,
}

/// Where an aggregator pulls recorded data from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AggregatorMode {
    AccountMode {
        account_ids: Vec<AccountId>,
        all_regions: bool,
    },
    OrganizationMode {
        all_regions: bool,
        role_arn: ArnRef,
    },
}

/// Configuration aggregator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatorSpec {
    pub name: String,
    pub mode: AggregatorMode,
    pub tags: BTreeMap<String, String>,
}

/// Which side of an aggregation an authorization serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuthorizationSide {
    /// Grants this account/region's data to the central account
    Child,
    /// Grants this account/region's data to this account's own aggregator
    Central,
}

/// Aggregate authorization grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateAuthorizationSpec {
    pub side: AuthorizationSide,
    /// Account allowed to aggregate this context's data
    pub account_id: AccountId,
    /// Region of the authorized aggregator
    pub region: String,
    pub tags: BTreeMap<String, String>,
}

/// One node of a resource plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceSpec {
    Topic(TopicSpec),
    IamRole(IamRoleSpec),
    RolePolicyAttachment(RolePolicyAttachmentSpec),
    Recorder(RecorderSpec),
    DeliveryChannel(DeliveryChannelSpec),
    RecorderStatus(RecorderStatusSpec),
    ManagedRule(RuleSpec),
    Aggregator(AggregatorSpec),
    AggregateAuthorization(AggregateAuthorizationSpec),
}

impl ResourceSpec {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceSpec::Topic(_) => ResourceKind::Topic,
            ResourceSpec::IamRole(_) => ResourceKind::IamRole,
            ResourceSpec::RolePolicyAttachment(_) => ResourceKind::RolePolicyAttachment,
            ResourceSpec::Recorder(_) => ResourceKind::Recorder,
            ResourceSpec::DeliveryChannel(_) => ResourceKind::DeliveryChannel,
            ResourceSpec::RecorderStatus(_) => ResourceKind::RecorderStatus,
            ResourceSpec::ManagedRule(_) => ResourceKind::ManagedRule,
            ResourceSpec::Aggregator(_) => ResourceKind::Aggregator,
            ResourceSpec::AggregateAuthorization(_) => ResourceKind::AggregateAuthorization,
        }
    }

    /// Human-readable identifier used in logs and errors
    pub fn display_name(&self) -> String {
        match self {
            ResourceSpec::Topic(s) => s.name.clone(),
            ResourceSpec::IamRole(s) => s.name.clone(),
            ResourceSpec::RolePolicyAttachment(s) => s.policy_arn.clone(),
            ResourceSpec::Recorder(s) => s.name.clone(),
            ResourceSpec::DeliveryChannel(s) => s.name.clone(),
            ResourceSpec::RecorderStatus(s) => s.recorder_name.clone(),
            ResourceSpec::ManagedRule(s) => s.name.clone(),
            ResourceSpec::Aggregator(s) => s.name.clone(),
            ResourceSpec::AggregateAuthorization(s) => {
                format!("{}:{}/{}", s.side, s.account_id, s.region)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arn_ref_resolution() {
        let mut outputs = PlanOutputs::default();
        let topic = ArnRef::Output(NodeId(0));
        assert_eq!(outputs.resolve(&topic), None);

        outputs.record(
            NodeId(0),
            CreatedResource {
                arn: "arn:aws:sns:us-east-1:111111111111:findings".to_string(),
                name: "findings".to_string(),
            },
        );
        assert_eq!(
            outputs.resolve(&topic).as_deref(),
            Some("arn:aws:sns:us-east-1:111111111111:findings")
        );
        assert_eq!(
            outputs.resolve(&ArnRef::Literal("arn:x".to_string())).as_deref(),
            Some("arn:x")
        );
    }

    #[test]
    fn test_sns_document_waits_for_topic() {
        let doc = PolicyDocument::SnsPublish {
            topic_arn: ArnRef::Output(NodeId(3)),
        };
        assert!(doc.render(&PlanOutputs::default()).is_none());

        let doc = PolicyDocument::S3Delivery {
            bucket_arn: "arn:aws:s3:::b".to_string(),
        };
        assert!(doc.render(&PlanOutputs::default()).unwrap().contains("s3:PutObject"));
    }

    #[test]
    fn test_spec_serializes_with_kind_tag() {
        let spec = ResourceSpec::RecorderStatus(RecorderStatusSpec {
            recorder_name: "config".to_string(),
            is_enabled: true,
        });
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["kind"], "recorder_status");
        assert_eq!(json["recorder_name"], "config");
    }
}
