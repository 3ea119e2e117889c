//! config-recorder-coordinator - Applies AWS Config recorder plans
//!
//! This crate binds the planning core to AWS: it resolves each execution
//! context's identity, materializes plans through the IAM, SNS and AWS
//! Config APIs, and sequences multi-context rollouts.

pub mod aws;
pub mod config;
pub mod materializer;
pub mod rollout;
