//! Shared utilities for AWS integration tests
//!
//! Provides region detection, unique run IDs and a settings fixture.

// Each test binary uses a different subset
#![allow(dead_code)]

use chrono::Utc;
use config_recorder_common::RecorderSettings;
use config_recorder_coordinator::aws::partition_for_region;

/// Get the AWS region for tests.
///
/// Checks environment variables in order:
/// 1. AWS_REGION
/// 2. AWS_DEFAULT_REGION
/// 3. Falls back to us-east-2
pub fn get_test_region() -> String {
    std::env::var("AWS_REGION")
        .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
        .unwrap_or_else(|_| "us-east-2".to_string())
}

/// Generate a unique run ID for test resources.
///
/// Format: `test-{timestamp}` where timestamp is Unix seconds.
pub fn test_run_id() -> String {
    format!("test-{}", Utc::now().timestamp())
}

/// Settings that plan a recorder with a created role and topic
pub fn test_settings(run_id: &str) -> RecorderSettings {
    let partition = partition_for_region(&get_test_region());
    serde_json::from_value(serde_json::json!({
        "global_resource_collector_region": get_test_region(),
        "create_iam_role": true,
        "create_sns_topic": true,
        "s3_bucket_id": format!("config-recorder-{run_id}"),
        "s3_bucket_arn": format!("arn:{partition}:s3:::config-recorder-{run_id}"),
        "label": { "namespace": "it", "stage": run_id }
    }))
    .expect("test settings should deserialize")
}
