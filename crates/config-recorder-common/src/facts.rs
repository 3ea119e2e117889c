//! Settings surface and resolved planning facts
//!
//! [`RecorderSettings`] is what operators write (JSON, snake_case keys).
//! [`Facts`] is the validated, immutable snapshot a planning run works on:
//! settings plus the identity of the execution context.

use crate::account::AccountId;
use crate::defaults::{default_partition, default_true};
use crate::error::{ConfigurationError, PlanError, ValidationError};
use crate::label::Label;
use garde::Validate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// SNS subscription attached to a created findings topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SubscriberSpec {
    /// Subscription protocol (e.g., "email", "sqs", "https")
    #[garde(length(min = 1))]
    pub protocol: String,

    /// Protocol-specific endpoint
    #[garde(length(min = 1))]
    pub endpoint: String,

    /// Whether the endpoint confirms subscriptions on its own
    #[serde(default)]
    #[garde(skip)]
    pub endpoint_auto_confirms: bool,

    /// Deliver the raw message instead of the SNS JSON envelope
    #[serde(default)]
    #[garde(skip)]
    pub raw_message_delivery: bool,
}

/// AWS managed Config rule to attach to the recorder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagedRule {
    #[serde(default)]
    pub description: String,

    /// Source identifier of the managed rule (e.g., "S3_BUCKET_PUBLIC_READ_PROHIBITED")
    pub identifier: String,

    /// Rule parameters, serialized to JSON when non-empty
    #[serde(default)]
    pub input_parameters: serde_json::Value,

    /// Rule-specific tags, merged over the label tags
    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    /// Disabled rules are kept in settings but not planned
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// How often the recorder records configuration changes
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordingFrequency {
    #[default]
    Continuous,
    Daily,
}

/// Recording frequency override for a set of resource types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RecordingModeOverride {
    #[serde(default)]
    #[garde(skip)]
    pub description: Option<String>,

    #[garde(length(min = 1))]
    pub resource_types: Vec<String>,

    #[garde(skip)]
    pub recording_frequency: RecordingFrequency,
}

/// Recording mode of the configuration recorder
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RecordingMode {
    #[serde(default)]
    #[garde(skip)]
    pub recording_frequency: RecordingFrequency,

    #[serde(default)]
    #[garde(dive)]
    pub overrides: Vec<RecordingModeOverride>,
}

/// Operator-facing settings, one per deployment
///
/// Every execution context (account × region) of a deployment shares these
/// settings; the context identity is supplied separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RecorderSettings {
    /// Master switch
    #[serde(default = "default_true")]
    #[garde(skip)]
    pub enabled: bool,

    /// Regions that never take part in aggregation
    #[serde(default)]
    #[garde(skip)]
    pub disabled_aggregation_regions: Vec<String>,

    /// Region that records global resources and hosts the aggregator
    #[serde(default)]
    #[garde(skip)]
    pub global_resource_collector_region: String,

    /// Account acting as aggregation sink (absent = single-account mode)
    #[serde(default)]
    #[garde(skip)]
    pub central_resource_collector_account: Option<String>,

    /// Accounts aggregated by the central account (ignored in organization mode)
    #[serde(default)]
    #[garde(skip)]
    pub child_resource_collector_accounts: Option<Vec<String>>,

    /// Aggregate over the whole organization instead of an account list
    #[serde(default)]
    #[garde(skip)]
    pub enable_organization_aggregation: bool,

    /// Create the recorder role instead of using `iam_role_arn`
    #[serde(default)]
    #[garde(skip)]
    pub create_iam_role: bool,

    /// Existing recorder role
    #[serde(default)]
    #[garde(skip)]
    pub iam_role_arn: Option<String>,

    /// Create an SNS topic for findings
    #[serde(default)]
    #[garde(skip)]
    pub create_sns_topic: bool,

    /// Existing SNS topic for findings (wins over a created topic)
    #[serde(default)]
    #[garde(skip)]
    pub findings_notification_arn: Option<String>,

    /// KMS key for the created topic
    #[serde(default)]
    #[garde(skip)]
    pub sns_encryption_key_id: Option<String>,

    /// Subscriptions for the created topic
    #[serde(default)]
    #[garde(dive)]
    pub subscribers: Vec<SubscriberSpec>,

    /// Managed rules keyed by rule name
    #[serde(default)]
    #[garde(skip)]
    pub managed_rules: BTreeMap<String, ManagedRule>,

    /// Delivery bucket name
    #[serde(default)]
    #[garde(skip)]
    pub s3_bucket_id: String,

    /// Delivery bucket ARN
    #[serde(default)]
    #[garde(skip)]
    pub s3_bucket_arn: String,

    /// Key prefix for delivered snapshots (empty = bucket root)
    #[serde(default)]
    #[garde(skip)]
    pub s3_key_prefix: String,

    /// Recording frequency and per-type overrides
    #[serde(default)]
    #[garde(dive)]
    pub recording_mode: Option<RecordingMode>,

    /// Naming and tagging inputs
    #[serde(default)]
    #[garde(skip)]
    pub label: Label,
}

/// Identity of one execution context
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ExecutionContext {
    pub account_id: AccountId,
    pub region: String,
    pub partition: String,
}

impl ExecutionContext {
    pub fn new(account_id: AccountId, region: impl Into<String>) -> Self {
        Self {
            account_id,
            region: region.into(),
            partition: default_partition(),
        }
    }

    /// Use a non-default partition (e.g., "aws-us-gov", "aws-cn")
    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = partition.into();
        self
    }
}

impl std::fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.account_id, self.region)
    }
}

/// Validated, immutable inputs of one planning run
#[derive(Debug, Clone, PartialEq)]
pub struct Facts {
    pub enabled: bool,
    pub context: ExecutionContext,
    pub global_recorder_region: String,
    pub central_account_id: Option<AccountId>,
    pub child_account_ids: Vec<AccountId>,
    pub disabled_aggregation_regions: BTreeSet<String>,
    pub organization_aggregation_enabled: bool,
    pub create_iam_role: bool,
    pub supplied_role_arn: Option<String>,
    pub create_sns_topic: bool,
    pub supplied_notification_arn: Option<String>,
    pub sns_encryption_key_id: Option<String>,
    pub subscribers: Vec<SubscriberSpec>,
    pub managed_rules: BTreeMap<String, ManagedRule>,
    pub s3_bucket_id: String,
    pub s3_bucket_arn: String,
    pub s3_key_prefix: String,
    pub recording_mode: Option<RecordingMode>,
    pub label: Label,
}

impl Facts {
    /// Validate settings and bind them to an execution context
    pub fn resolve(settings: &RecorderSettings, context: ExecutionContext) -> Result<Self, PlanError> {
        settings
            .validate()
            .map_err(|report| ValidationError::Settings(report.to_string()))?;

        if context.region.trim().is_empty() {
            return Err(ValidationError::EmptyRegion.into());
        }

        let central_account_id = settings
            .central_resource_collector_account
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_account("central_resource_collector_account", s))
            .transpose()?;

        let child_account_ids = settings
            .child_resource_collector_accounts
            .iter()
            .flatten()
            .map(|s| parse_account("child_resource_collector_accounts", s))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some((name, _)) = settings
            .managed_rules
            .iter()
            .find(|(_, rule)| rule.identifier.trim().is_empty())
        {
            return Err(ValidationError::EmptyRuleIdentifier { rule: name.clone() }.into());
        }

        let disabled_aggregation_regions: BTreeSet<String> =
            settings.disabled_aggregation_regions.iter().cloned().collect();

        let aggregation_inputs = !disabled_aggregation_regions.contains(&context.region)
            || central_account_id.is_some()
            || !child_account_ids.is_empty()
            || settings.enable_organization_aggregation;
        if settings.enabled
            && aggregation_inputs
            && settings.global_resource_collector_region.trim().is_empty()
        {
            return Err(ConfigurationError::MissingGlobalRecorderRegion.into());
        }

        Ok(Self {
            enabled: settings.enabled,
            context,
            global_recorder_region: settings.global_resource_collector_region.trim().to_string(),
            central_account_id,
            child_account_ids,
            disabled_aggregation_regions,
            organization_aggregation_enabled: settings.enable_organization_aggregation,
            create_iam_role: settings.create_iam_role,
            supplied_role_arn: non_empty(&settings.iam_role_arn),
            create_sns_topic: settings.create_sns_topic,
            supplied_notification_arn: non_empty(&settings.findings_notification_arn),
            sns_encryption_key_id: non_empty(&settings.sns_encryption_key_id),
            subscribers: settings.subscribers.clone(),
            managed_rules: settings.managed_rules.clone(),
            s3_bucket_id: settings.s3_bucket_id.clone(),
            s3_bucket_arn: settings.s3_bucket_arn.clone(),
            s3_key_prefix: settings.s3_key_prefix.clone(),
            recording_mode: settings.recording_mode.clone(),
            label: settings.label.clone(),
        })
    }
}

fn parse_account(field: &'static str, value: &str) -> Result<AccountId, ValidationError> {
    AccountId::parse(value).ok_or_else(|| ValidationError::InvalidAccountId {
        field,
        value: value.to_string(),
    })
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
