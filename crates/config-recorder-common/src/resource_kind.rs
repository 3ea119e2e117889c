//! Resource kinds and creation ordering
//!
//! The plan graph carries the exact dependencies. The creation rank here is
//! the coarse order those dependencies imply and is what orchestration
//! layers and log output use to describe a plan.

use serde::Serialize;

/// Types of AWS resources a plan can contain
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    strum::Display,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResourceKind {
    /// SNS topic for findings
    Topic,
    /// Recorder IAM role (inline policies included)
    IamRole,
    /// Managed policy attached to the recorder role
    RolePolicyAttachment,
    /// Configuration recorder
    Recorder,
    /// Delivery channel (needs a recorder)
    DeliveryChannel,
    /// Recorder started (needs a delivery channel)
    RecorderStatus,
    /// Managed Config rule (needs a running recorder)
    ManagedRule,
    /// Configuration aggregator
    Aggregator,
    /// Aggregate authorization grant
    AggregateAuthorization,
}

impl ResourceKind {
    /// Get creation rank (lower number = create first)
    ///
    /// - 0: SNS topic (referenced by the role's publish policy)
    /// - 1: IAM role
    /// - 2: Role policy attachments
    /// - 3: Recorder
    /// - 4: Delivery channel
    /// - 5: Recorder status
    /// - 6: Managed rules, aggregator, authorizations
    pub fn creation_rank(self) -> u8 {
        match self {
            ResourceKind::Topic => 0,
            ResourceKind::IamRole => 1,
            ResourceKind::RolePolicyAttachment => 2,
            ResourceKind::Recorder => 3,
            ResourceKind::DeliveryChannel => 4,
            ResourceKind::RecorderStatus => 5,
            ResourceKind::ManagedRule
            | ResourceKind::Aggregator
            | ResourceKind::AggregateAuthorization => 6,
        }
    }
}
