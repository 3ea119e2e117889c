//! config-recorder-common - Planning core for AWS Config recorders
//!
//! This crate decides, for one execution context (account × region), which
//! AWS Config resources to create and in what order. It has no AWS SDK
//! dependencies: every collaborator is reached through the coordinator.
//!
//! ## Modules
//!
//! - [`account`]: Validated AWS account identifiers
//! - [`defaults`]: Service principals, managed policy names, label defaults
//! - [`error`]: Configuration and validation errors raised while planning
//! - [`facts`]: Settings surface and resolved planning facts
//! - [`label`]: Naming and tagging provider
//! - [`plan`]: Resource specs, the plan graph and the planners
//! - [`policy`]: IAM policy documents for the recorder role
//! - [`resource_kind`]: The resource kinds a plan can contain
//! - [`rollout`]: Cross-context phase ordering
//! - [`topology`]: Derived facts (central account, global region, ...)

pub mod account;
pub mod defaults;
pub mod error;
pub mod facts;
pub mod label;
pub mod plan;
pub mod policy;
pub mod resource_kind;
pub mod rollout;
pub mod topology;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use account::AccountId;
pub use error::{ConfigurationError, PlanError, ValidationError};
pub use facts::{ExecutionContext, Facts, RecorderSettings};
pub use label::{Label, Naming};
pub use plan::{ArnRef, NodeId, ResourcePlan, ResourceSpec, plan};
pub use resource_kind::ResourceKind;
pub use rollout::{RolloutPhase, order_contexts, split_phases};
pub use topology::DerivedFacts;
