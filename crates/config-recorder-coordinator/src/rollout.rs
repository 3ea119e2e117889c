//! Multi-context rollout
//!
//! A rollout covers several execution contexts (profile × region). Identity
//! lookups run concurrently, every context is planned before anything is
//! created, and plans are applied phase by phase: contributing contexts
//! first, aggregating contexts only once every contributor succeeded.

use crate::aws::account::{StsIdentity, resolve_context};
use crate::aws::config_service::ConfigServiceClient;
use crate::aws::context::{AwsContext, FromAwsContext};
use crate::aws::iam::IamClient;
use crate::aws::sns::SnsClient;
use crate::config::RolloutTargets;
use crate::materializer::{ApplyError, MaterializeReport, Materializer};
use anyhow::{Context, Result};
use config_recorder_common::{
    ExecutionContext, Facts, RecorderSettings, ResourcePlan, RolloutPhase, plan, split_phases,
};
use futures::StreamExt;
use futures::future::join_all;
use futures::stream::FuturesUnordered;
use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;
use thiserror::Error;
use tracing::{error, info};

/// A planned context and the AWS configuration to apply it with
#[derive(Debug, Clone)]
pub struct PlannedContext<C = AwsContext> {
    pub plan: ResourcePlan,
    pub aws: C,
}

impl<C> AsRef<ResourcePlan> for PlannedContext<C> {
    fn as_ref(&self) -> &ResourcePlan {
        &self.plan
    }
}

/// Contexts applied in one phase
#[derive(Debug, Clone, Serialize)]
pub struct PhaseReport {
    pub phase: RolloutPhase,
    pub contexts: Vec<MaterializeReport>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RolloutReport {
    pub phases: Vec<PhaseReport>,
}

/// A context that failed to apply
#[derive(Debug)]
pub struct ContextFailure {
    pub context: ExecutionContext,
    pub error: ApplyError,
}

/// A phase had failures; later phases were not started
#[derive(Debug, Error)]
#[error("{} context(s) failed in the {phase} phase", failures.len())]
pub struct RolloutError {
    pub phase: RolloutPhase,
    pub failures: Vec<ContextFailure>,
    /// Everything applied before and during the failed phase
    pub report: RolloutReport,
}

/// Load AWS configuration and identity for every target pair concurrently
pub async fn resolve_targets(targets: &RolloutTargets) -> Result<Vec<(ExecutionContext, AwsContext)>> {
    let lookups = targets.pairs().map(|(profile, region)| async move {
        let aws = AwsContext::with_profile(region, profile).await;
        let identity = StsIdentity::from_context(&aws);
        let context = resolve_context(&identity).await.with_context(|| {
            format!(
                "Failed to resolve identity for region {region} (profile {})",
                profile.unwrap_or("default")
            )
        })?;
        Ok::<_, anyhow::Error>((context, aws))
    });

    let resolved = join_all(lookups)
        .await
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    let mut seen = HashSet::new();
    for (context, _) in &resolved {
        if !seen.insert(context.clone()) {
            anyhow::bail!("Execution context {context} is listed more than once in the targets");
        }
    }

    Ok(resolved)
}

/// Plan every context; any planning error aborts before anything is created
pub fn plan_contexts<C>(
    settings: &RecorderSettings,
    targets: Vec<(ExecutionContext, C)>,
) -> Result<Vec<PlannedContext<C>>> {
    targets
        .into_iter()
        .map(|(context, aws)| {
            let label = context.to_string();
            let facts = Facts::resolve(settings, context)
                .with_context(|| format!("Invalid settings for {label}"))?;
            let plan = plan(&facts, &facts.label)
                .with_context(|| format!("Planning failed for {label}"))?;
            info!(context = %label, resources = plan.len(), phase = %plan.phase(), "Context planned");
            Ok(PlannedContext { plan, aws })
        })
        .collect()
}

/// Apply one context with clients built from its AWS configuration
pub async fn apply_context(
    aws: &AwsContext,
    plan: &ResourcePlan,
) -> Result<MaterializeReport, ApplyError> {
    let sns = SnsClient::from_context(aws);
    let iam = IamClient::from_context(aws);
    let config = ConfigServiceClient::from_context(aws);
    Materializer::new(&sns, &iam, &config).apply(plan).await
}

/// Apply contexts phase by phase, concurrently within a phase
///
/// Every context of a phase runs to completion even if another one fails;
/// the next phase starts only when the whole phase succeeded.
pub async fn apply_phased<P, F, Fut>(items: Vec<P>, apply: F) -> Result<RolloutReport, RolloutError>
where
    P: AsRef<ResourcePlan>,
    F: Fn(P) -> Fut,
    Fut: Future<Output = Result<MaterializeReport, ApplyError>>,
{
    let mut report = RolloutReport::default();

    for (phase, items) in split_phases(items) {
        info!(phase = %phase, contexts = items.len(), "Applying rollout phase");

        let mut pending: FuturesUnordered<_> = items
            .into_iter()
            .map(|item| {
                let context = item.as_ref().context().clone();
                let applying = apply(item);
                async move { (context, applying.await) }
            })
            .collect();

        let mut applied = Vec::new();
        let mut failures = Vec::new();
        while let Some((context, result)) = pending.next().await {
            match result {
                Ok(context_report) => applied.push(context_report),
                Err(error) => {
                    error!(context = %context, error = %error, "Context failed");
                    failures.push(ContextFailure { context, error });
                }
            }
        }

        report.phases.push(PhaseReport {
            phase,
            contexts: applied,
        });

        if !failures.is_empty() {
            return Err(RolloutError {
                phase,
                failures,
                report,
            });
        }
    }

    Ok(report)
}

/// Resolve, plan and apply every target
pub async fn run_rollout(
    settings: &RecorderSettings,
    targets: &RolloutTargets,
) -> Result<RolloutReport, anyhow::Error> {
    let resolved = resolve_targets(targets).await?;
    let planned = plan_contexts(settings, resolved)?;

    let report = apply_phased(planned, |planned| async move {
        apply_context(&planned.aws, &planned.plan).await
    })
    .await?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materializer::MaterializationError;
    use chrono::Utc;
    use config_recorder_common::testing::{base_facts, base_settings, context};
    use config_recorder_common::{AccountId, ResourceKind};
    use std::sync::{Arc, Mutex};

    fn plan_for(account: &str, region: &str) -> ResourcePlan {
        let mut facts = base_facts(context(account, region));
        facts.central_account_id = AccountId::parse("111111111111");
        plan(&facts, &facts.label).unwrap()
    }

    fn report_for(plan: &ResourcePlan) -> MaterializeReport {
        MaterializeReport {
            context: plan.context().clone(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            resources: vec![],
        }
    }

    fn failure_for(plan: &ResourcePlan) -> ApplyError {
        MaterializationError {
            context: plan.context().clone(),
            kind: ResourceKind::Recorder,
            resource: "config".to_string(),
            completed: vec![],
            source: anyhow::anyhow!("AccessDeniedException"),
        }
        .into()
    }

    #[tokio::test]
    async fn test_contributors_applied_before_aggregators() {
        let plans = vec![
            plan_for("111111111111", "us-east-1"),
            plan_for("222222222222", "us-east-1"),
            plan_for("333333333333", "eu-west-1"),
        ];
        let applied = Arc::new(Mutex::new(Vec::new()));

        let report = apply_phased(plans, |plan| {
            let applied = applied.clone();
            async move {
                applied.lock().unwrap().push(plan.phase());
                Ok(report_for(&plan))
            }
        })
        .await
        .unwrap();

        assert_eq!(
            *applied.lock().unwrap(),
            vec![
                RolloutPhase::Contributor,
                RolloutPhase::Contributor,
                RolloutPhase::Aggregating
            ]
        );
        assert_eq!(report.phases.len(), 2);
        assert_eq!(report.phases[0].contexts.len(), 2);
        assert_eq!(report.phases[1].phase, RolloutPhase::Aggregating);
    }

    #[tokio::test]
    async fn test_contributor_failure_blocks_aggregators() {
        let plans = vec![
            plan_for("111111111111", "us-east-1"),
            plan_for("222222222222", "us-east-1"),
            plan_for("333333333333", "eu-west-1"),
        ];
        let applied = Arc::new(Mutex::new(Vec::new()));

        let err = apply_phased(plans, |plan| {
            let applied = applied.clone();
            async move {
                applied.lock().unwrap().push(plan.context().clone());
                if plan.context().account_id.as_str() == "222222222222" {
                    Err(failure_for(&plan))
                } else {
                    Ok(report_for(&plan))
                }
            }
        })
        .await
        .unwrap_err();

        // The other contributor still ran; the aggregating context never did
        let applied = applied.lock().unwrap();
        assert_eq!(applied.len(), 2);
        assert!(applied.iter().all(|c| c.account_id.as_str() != "111111111111"));

        assert_eq!(err.phase, RolloutPhase::Contributor);
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].context.account_id.as_str(), "222222222222");
        assert_eq!(err.report.phases[0].contexts.len(), 1);
        assert_eq!(err.to_string(), "1 context(s) failed in the contributor phase");
    }

    #[tokio::test]
    async fn test_no_plans() {
        let report = apply_phased(Vec::<ResourcePlan>::new(), |plan| async move {
            Ok(report_for(&plan))
        })
        .await
        .unwrap();
        assert!(report.phases.is_empty());
    }

    #[test]
    fn test_plan_contexts() {
        let mut settings = base_settings();
        settings.central_resource_collector_account = Some("111111111111".to_string());

        let planned = plan_contexts(
            &settings,
            vec![
                (context("111111111111", "us-east-1"), "central"),
                (context("222222222222", "us-east-1"), "child"),
            ],
        )
        .unwrap();
        assert_eq!(planned.len(), 2);
        assert_eq!(planned[0].aws, "central");
        assert_eq!(planned[0].plan.phase(), RolloutPhase::Aggregating);
        assert_eq!(planned[1].plan.phase(), RolloutPhase::Contributor);
    }

    #[test]
    fn test_plan_contexts_fails_fast() {
        let mut settings = base_settings();
        settings.create_iam_role = false;

        let err = plan_contexts(
            &settings,
            vec![
                (context("111111111111", "us-east-1"), ()),
                (context("222222222222", "us-east-1"), ()),
            ],
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Planning failed for 111111111111/us-east-1"
        );
    }
}
