//! Test fixtures shared by unit tests and by the coordinator's tests
//!
//! Enabled for other crates through the `testing` feature.

use crate::account::AccountId;
use crate::facts::{ExecutionContext, Facts, RecorderSettings};
use crate::label::Label;
use std::collections::{BTreeMap, BTreeSet};

/// Build an execution context, panicking on a malformed account ID
pub fn context(account_id: &str, region: &str) -> ExecutionContext {
    ExecutionContext::new(
        AccountId::parse(account_id).expect("test account IDs are 12 digits"),
        region,
    )
}

/// Enabled settings with a created role, no topic, no rules, global region us-east-1
pub fn base_settings() -> RecorderSettings {
    RecorderSettings {
        enabled: true,
        disabled_aggregation_regions: Vec::new(),
        global_resource_collector_region: "us-east-1".to_string(),
        central_resource_collector_account: None,
        child_resource_collector_accounts: None,
        enable_organization_aggregation: false,
        create_iam_role: true,
        iam_role_arn: None,
        create_sns_topic: false,
        findings_notification_arn: None,
        sns_encryption_key_id: None,
        subscribers: Vec::new(),
        managed_rules: BTreeMap::new(),
        s3_bucket_id: "audit-bucket".to_string(),
        s3_bucket_arn: "arn:aws:s3:::audit-bucket".to_string(),
        s3_key_prefix: String::new(),
        recording_mode: None,
        label: Label::default(),
    }
}

/// Facts equivalent to [`base_settings`] bound to `context`
pub fn base_facts(context: ExecutionContext) -> Facts {
    Facts {
        enabled: true,
        context,
        global_recorder_region: "us-east-1".to_string(),
        central_account_id: None,
        child_account_ids: Vec::new(),
        disabled_aggregation_regions: BTreeSet::new(),
        organization_aggregation_enabled: false,
        create_iam_role: true,
        supplied_role_arn: None,
        create_sns_topic: false,
        supplied_notification_arn: None,
        sns_encryption_key_id: None,
        subscribers: Vec::new(),
        managed_rules: BTreeMap::new(),
        s3_bucket_id: "audit-bucket".to_string(),
        s3_bucket_arn: "arn:aws:s3:::audit-bucket".to_string(),
        s3_key_prefix: String::new(),
        recording_mode: None,
        label: Label::default(),
    }
}
