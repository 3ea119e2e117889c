//! IAM role management for the configuration recorder

use crate::aws::context::{AwsContext, FromAwsContext};
use crate::aws::error::classify_anyhow_error;
use crate::aws::tags;
use anyhow::{Context, Result};
use aws_sdk_iam::Client;
use chrono::Utc;
use config_recorder_common::plan::{CreatedResource, IamRoleSpec};
use config_recorder_common::policy::assume_role_policy;
use tracing::{debug, info};

/// IAM role names are limited to 64 characters
const MAX_ROLE_NAME_LEN: usize = 64;

/// Inline policy rendered for a role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlinePolicy {
    pub name: String,
    pub document: String,
}

/// IAM client for the recorder role
pub struct IamClient {
    client: Client,
}

impl FromAwsContext for IamClient {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.iam_client(),
        }
    }
}

impl IamClient {
    /// Create the recorder role and put its inline policies
    ///
    /// An existing role with the same name is reused: its trust policy, tags
    /// and inline policies are overwritten, so re-running converges.
    pub async fn create_role(
        &self,
        spec: &IamRoleSpec,
        inline_policies: &[InlinePolicy],
    ) -> Result<CreatedResource> {
        let role_name = role_name(spec);
        let trust_policy = assume_role_policy(&spec.principals);
        let role_tags = tags::iam_tags(&spec.tags)?;
        info!(role_name = %role_name, "Creating IAM role for recorder");

        let created = self
            .client
            .create_role()
            .role_name(&role_name)
            .assume_role_policy_document(&trust_policy)
            .description("AWS Config recorder role")
            .set_tags(Some(role_tags.clone()))
            .send()
            .await
            .context("Failed to create IAM role");

        let arn = match created {
            Ok(resp) => resp
                .role()
                .map(|role| role.arn().to_string())
                .context("No role returned from CreateRole")?,
            Err(e) if classify_anyhow_error(&e).is_already_exists() => {
                debug!(role_name = %role_name, "IAM role exists, reusing");
                self.converge_existing_role(&role_name, &trust_policy, role_tags)
                    .await?
            }
            Err(e) => return Err(e),
        };

        debug!(role_name = %role_name, arn = %arn, "IAM role ready");

        for policy in inline_policies {
            self.client
                .put_role_policy()
                .role_name(&role_name)
                .policy_name(&policy.name)
                .policy_document(&policy.document)
                .send()
                .await
                .with_context(|| format!("Failed to put inline policy {}", policy.name))?;

            debug!(role_name = %role_name, policy = %policy.name, "Inline policy attached");
        }

        info!(role_name = %role_name, "IAM role created");

        Ok(CreatedResource {
            arn,
            name: role_name,
        })
    }

    /// Bring a same-named role in line with the spec, returning its ARN
    async fn converge_existing_role(
        &self,
        role_name: &str,
        trust_policy: &str,
        role_tags: Vec<aws_sdk_iam::types::Tag>,
    ) -> Result<String> {
        let arn = self
            .client
            .get_role()
            .role_name(role_name)
            .send()
            .await
            .context("Failed to look up existing IAM role")?
            .role()
            .map(|role| role.arn().to_string())
            .context("No role returned from GetRole")?;

        self.client
            .update_assume_role_policy()
            .role_name(role_name)
            .policy_document(trust_policy)
            .send()
            .await
            .context("Failed to update trust policy of existing IAM role")?;

        self.client
            .tag_role()
            .role_name(role_name)
            .set_tags(Some(role_tags))
            .send()
            .await
            .context("Failed to tag existing IAM role")?;

        debug!(role_name = %role_name, "Existing IAM role trust policy and tags updated");
        Ok(arn)
    }

    /// Attach a managed policy to a role
    pub async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()> {
        self.client
            .attach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .with_context(|| format!("Failed to attach {policy_arn} to {role_name}"))?;

        debug!(role_name = %role_name, policy_arn = %policy_arn, "Managed policy attached");
        Ok(())
    }
}

/// Role name: verbatim, or the name as a prefix with a timestamp suffix
fn role_name(spec: &IamRoleSpec) -> String {
    let name = if spec.use_fullname {
        spec.name.clone()
    } else {
        format!("{}-{}", spec.name, Utc::now().format("%Y%m%d%H%M%S"))
    };
    name.chars().take(MAX_ROLE_NAME_LEN).collect()
}

/// Trait for IAM operations.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
#[cfg_attr(test, mockall::automock)]
pub trait RoleOperations: Send + Sync {
    /// Create (or reuse) a role with the given inline policies
    async fn create_role(
        &self,
        spec: &IamRoleSpec,
        inline_policies: Vec<InlinePolicy>,
    ) -> Result<CreatedResource>;

    /// Attach a managed policy to a role
    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()>;
}

impl RoleOperations for IamClient {
    async fn create_role(
        &self,
        spec: &IamRoleSpec,
        inline_policies: Vec<InlinePolicy>,
    ) -> Result<CreatedResource> {
        IamClient::create_role(self, spec, &inline_policies).await
    }

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()> {
        IamClient::attach_role_policy(self, role_name, policy_arn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn spec(name: &str, use_fullname: bool) -> IamRoleSpec {
        IamRoleSpec {
            name: name.to_string(),
            use_fullname,
            principals: vec!["config.amazonaws.com".to_string()],
            policy_documents: vec![],
            tags: BTreeMap::new(),
        }
    }

    #[test]
    fn test_role_name_verbatim() {
        assert_eq!(role_name(&spec("eg-prod-config", true)), "eg-prod-config");
    }

    #[test]
    fn test_role_name_prefix() {
        let name = role_name(&spec("eg-prod-config", false));
        assert!(name.starts_with("eg-prod-config-"));
        assert_eq!(name.len(), "eg-prod-config-".len() + 14);
    }

    #[test]
    fn test_role_name_truncated() {
        let long = "x".repeat(80);
        assert_eq!(role_name(&spec(&long, true)).len(), MAX_ROLE_NAME_LEN);
    }
}
