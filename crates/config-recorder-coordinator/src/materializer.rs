//! Plan materialization
//!
//! Walks a [`ResourcePlan`] in creation order and calls the matching
//! collaborator for each node. Outputs of earlier nodes (role ARN and name,
//! topic ARN) are threaded into later calls through [`PlanOutputs`].
//!
//! The first failure stops the context. Resources created before it are
//! left in place: every call is an upsert, so re-running converges.

use crate::aws::error::classify_anyhow_error;
use crate::aws::iam::{InlinePolicy, RoleOperations};
use crate::aws::sns::TopicOperations;
use crate::aws::config_service::AuditOperations;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use config_recorder_common::plan::{
    AggregatorMode, ArnRef, CreatedResource, NodeId, PlanOutputs, ResourcePlan, ResourceSpec,
};
use config_recorder_common::{ExecutionContext, PlanError, ResourceKind};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

/// A collaborator call failed; the rest of the context was not attempted
#[derive(Debug, Error)]
#[error("Failed to create {kind} '{resource}' in {context}")]
pub struct MaterializationError {
    pub context: ExecutionContext,
    pub kind: ResourceKind,
    pub resource: String,
    /// Resources created in this context before the failure
    pub completed: Vec<AppliedResource>,
    #[source]
    pub source: anyhow::Error,
}

impl MaterializationError {
    /// Operator hint derived from the AWS error code, if one is known
    pub fn suggestion(&self) -> Option<String> {
        classify_anyhow_error(&self.source).suggestion()
    }
}

/// Why a context could not be applied
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Materialization(#[from] MaterializationError),
}

impl ApplyError {
    pub fn suggestion(&self) -> Option<String> {
        match self {
            ApplyError::Plan(_) => None,
            ApplyError::Materialization(e) => e.suggestion(),
        }
    }
}

/// One created (or updated) resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedResource {
    pub id: NodeId,
    pub kind: ResourceKind,
    pub name: String,
    pub arn: Option<String>,
}

/// Outcome of a successful materialization
#[derive(Debug, Clone, Serialize)]
pub struct MaterializeReport {
    pub context: ExecutionContext,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub resources: Vec<AppliedResource>,
}

/// Executes plans against the collaborator interfaces
pub struct Materializer<'a, T, R, A> {
    topics: &'a T,
    roles: &'a R,
    audit: &'a A,
}

impl<'a, T, R, A> Materializer<'a, T, R, A>
where
    T: TopicOperations,
    R: RoleOperations,
    A: AuditOperations,
{
    pub fn new(topics: &'a T, roles: &'a R, audit: &'a A) -> Self {
        Self {
            topics,
            roles,
            audit,
        }
    }

    /// Create every node of `plan` in dependency order
    #[instrument(skip_all, fields(context = %plan.context(), resources = plan.len()))]
    pub async fn apply(&self, plan: &ResourcePlan) -> Result<MaterializeReport, ApplyError> {
        let order = plan.ordered().map_err(PlanError::from)?;
        let started_at = Utc::now();
        let mut outputs = PlanOutputs::default();
        let mut completed: Vec<AppliedResource> = Vec::with_capacity(order.len());

        info!("Materializing plan");

        for id in order {
            let spec = plan.spec(id);
            debug!(kind = %spec.kind(), name = %spec.display_name(), "Creating resource");

            match self.create(spec, &outputs).await {
                Ok(created) => {
                    completed.push(AppliedResource {
                        id,
                        kind: spec.kind(),
                        name: spec.display_name(),
                        arn: created.as_ref().map(|c| c.arn.clone()),
                    });
                    if let Some(created) = created {
                        outputs.record(id, created);
                    }
                }
                Err(source) => {
                    error!(
                        kind = %spec.kind(),
                        name = %spec.display_name(),
                        completed = completed.len(),
                        error = %source,
                        "Materialization failed, skipping the rest of this context"
                    );
                    return Err(MaterializationError {
                        context: plan.context().clone(),
                        kind: spec.kind(),
                        resource: spec.display_name(),
                        completed,
                        source,
                    }
                    .into());
                }
            }
        }

        info!(created = completed.len(), "Plan materialized");

        Ok(MaterializeReport {
            context: plan.context().clone(),
            started_at,
            finished_at: Utc::now(),
            resources: completed,
        })
    }

    async fn create(
        &self,
        spec: &ResourceSpec,
        outputs: &PlanOutputs,
    ) -> Result<Option<CreatedResource>> {
        match spec {
            ResourceSpec::Topic(topic) => self.topics.create_topic(topic).await.map(Some),

            ResourceSpec::IamRole(role) => {
                let inline_policies = role
                    .policy_documents
                    .iter()
                    .map(|doc| {
                        Ok(InlinePolicy {
                            name: doc.policy_name().to_string(),
                            document: doc
                                .render(outputs)
                                .context("Policy document references an ARN not created yet")?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                self.roles.create_role(role, inline_policies).await.map(Some)
            }

            ResourceSpec::RolePolicyAttachment(attachment) => {
                let role = outputs
                    .get(attachment.role)
                    .context("Policy attachment precedes its role")?;
                self.roles
                    .attach_role_policy(&role.name, &attachment.policy_arn)
                    .await?;
                Ok(None)
            }

            ResourceSpec::Recorder(recorder) => {
                let role_arn = resolve(outputs, &recorder.role_arn)?;
                self.audit
                    .put_configuration_recorder(recorder, &role_arn)
                    .await?;
                Ok(None)
            }

            ResourceSpec::DeliveryChannel(channel) => {
                let topic_arn = channel
                    .sns_topic_arn
                    .as_ref()
                    .map(|arn| resolve(outputs, arn))
                    .transpose()?;
                self.audit.put_delivery_channel(channel, topic_arn).await?;
                Ok(None)
            }

            ResourceSpec::RecorderStatus(status) => {
                self.audit
                    .set_recorder_status(&status.recorder_name, status.is_enabled)
                    .await?;
                Ok(None)
            }

            ResourceSpec::ManagedRule(rule) => {
                self.audit.put_config_rule(rule).await?;
                Ok(None)
            }

            ResourceSpec::Aggregator(aggregator) => {
                let role_arn = match &aggregator.mode {
                    AggregatorMode::OrganizationMode { role_arn, .. } => {
                        Some(resolve(outputs, role_arn)?)
                    }
                    AggregatorMode::AccountMode { .. } => None,
                };
                let arn = self
                    .audit
                    .put_configuration_aggregator(aggregator, role_arn)
                    .await?;
                Ok(Some(CreatedResource {
                    arn,
                    name: aggregator.name.clone(),
                }))
            }

            ResourceSpec::AggregateAuthorization(authorization) => {
                let arn = self
                    .audit
                    .put_aggregation_authorization(authorization)
                    .await?;
                Ok(Some(CreatedResource {
                    arn,
                    name: spec.display_name(),
                }))
            }
        }
    }
}

fn resolve(outputs: &PlanOutputs, arn: &ArnRef) -> Result<String> {
    outputs
        .resolve(arn)
        .with_context(|| format!("Unresolved ARN reference {arn:?}"))
}
