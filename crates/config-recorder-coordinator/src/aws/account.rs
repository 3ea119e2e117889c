//! Execution context identity
//!
//! The planner needs to know which account and region it runs in. Both come
//! from the loaded AWS configuration: the region is configured, the account
//! is looked up once per run through STS.

use crate::aws::context::{AwsContext, FromAwsContext};
use anyhow::{Context, Result};
use config_recorder_common::{AccountId, ExecutionContext};
use tokio::sync::OnceCell;
use tracing::info;

/// Source of the current account and region
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
#[cfg_attr(test, mockall::automock)]
pub trait IdentityProvider: Send + Sync {
    /// Account the credentials belong to
    async fn current_account_id(&self) -> Result<AccountId>;

    /// Region clients are configured for
    fn current_region(&self) -> String;
}

/// STS-backed identity, caching the account ID after the first lookup
pub struct StsIdentity {
    client: aws_sdk_sts::Client,
    region: String,
    account_id: OnceCell<AccountId>,
}

impl FromAwsContext for StsIdentity {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.sts_client(),
            region: ctx.region().to_string(),
            account_id: OnceCell::new(),
        }
    }
}

impl IdentityProvider for StsIdentity {
    async fn current_account_id(&self) -> Result<AccountId> {
        self.account_id
            .get_or_try_init(|| fetch_account_id(&self.client))
            .await
            .cloned()
    }

    fn current_region(&self) -> String {
        self.region.clone()
    }
}

/// Fetch the current AWS account ID via STS GetCallerIdentity
///
/// This operation requires no special permissions - it always succeeds if
/// credentials are valid.
async fn fetch_account_id(client: &aws_sdk_sts::Client) -> Result<AccountId> {
    let identity = client
        .get_caller_identity()
        .send()
        .await
        .context("Failed to get AWS caller identity - check credentials")?;

    let account = identity
        .account()
        .context("No account ID returned from STS GetCallerIdentity")?;

    let account_id = AccountId::parse(account)
        .with_context(|| format!("STS returned a malformed account ID: {account}"))?;

    info!(account_id = %account_id, "AWS account validated");

    Ok(account_id)
}

/// Partition a region belongs to
pub fn partition_for_region(region: &str) -> &'static str {
    if region.starts_with("cn-") {
        "aws-cn"
    } else if region.starts_with("us-gov-") {
        "aws-us-gov"
    } else if region.starts_with("us-iso-") {
        "aws-iso"
    } else if region.starts_with("us-isob-") {
        "aws-iso-b"
    } else {
        "aws"
    }
}

/// Build the execution context of an identity provider
pub async fn resolve_context(identity: &impl IdentityProvider) -> Result<ExecutionContext> {
    let account_id = identity.current_account_id().await?;
    let region = identity.current_region();
    let partition = partition_for_region(&region);
    Ok(ExecutionContext::new(account_id, region).with_partition(partition))
}
