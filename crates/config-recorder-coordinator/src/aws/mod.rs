//! AWS client modules for the coordinator
//!
//! This module provides wrappers around AWS SDK clients for:
//! - AWS Config: Recorders, delivery channels, rules, aggregation
//! - IAM: Recorder role and policy attachments
//! - SNS: Findings topic and subscriptions
//! - STS: Account ID lookup

pub mod account;
pub mod config_service;
pub mod context;
pub mod error;
pub mod iam;
pub mod sns;
pub mod tags;

pub use account::{IdentityProvider, StsIdentity, partition_for_region, resolve_context};
pub use config_service::{AuditOperations, ConfigServiceClient};
pub use context::{AwsContext, FromAwsContext};
pub use iam::{IamClient, InlinePolicy, RoleOperations};
pub use sns::{SnsClient, TopicOperations};

// Error handling
pub use error::{AwsError, classify_anyhow_error, classify_aws_error};
