//! Cross-context rollout ordering
//!
//! An aggregator only sees data from accounts/regions that have already
//! granted it an aggregate authorization. Planning never looks across
//! contexts, so the ordering lives here: every contributing context is
//! applied before any context that hosts an aggregator.

use crate::plan::ResourcePlan;
use crate::resource_kind::ResourceKind;
use serde::Serialize;

/// Phase of a multi-context rollout a plan belongs to
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RolloutPhase {
    /// Grants authorizations (and records), hosts no aggregator
    Contributor,
    /// Hosts an aggregator; applied after every contributor
    Aggregating,
}

impl RolloutPhase {
    pub fn of(plan: &ResourcePlan) -> Self {
        if plan.count(ResourceKind::Aggregator) > 0 {
            RolloutPhase::Aggregating
        } else {
            RolloutPhase::Contributor
        }
    }
}

/// Order plans so every contributor precedes every aggregating context
///
/// The sort is stable: plans keep their relative order within a phase.
/// Accepts anything carrying a plan, so callers can keep per-context state
/// (clients, credentials) alongside it.
pub fn order_contexts<P: AsRef<ResourcePlan>>(mut plans: Vec<P>) -> Vec<P> {
    plans.sort_by_key(|p| p.as_ref().phase());
    plans
}

/// Group ordered plans into phases, contributors first, empty phases omitted
pub fn split_phases<P: AsRef<ResourcePlan>>(plans: Vec<P>) -> Vec<(RolloutPhase, Vec<P>)> {
    let mut phases: Vec<(RolloutPhase, Vec<P>)> = Vec::new();
    for plan in order_contexts(plans) {
        let phase = plan.as_ref().phase();
        match phases.last_mut() {
            Some((last, group)) if *last == phase => group.push(plan),
            _ => phases.push((phase, vec![plan])),
        }
    }
    phases
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountId;
    use crate::plan::plan;
    use crate::testing::{base_facts, context};

    fn plan_for(account: &str, region: &str) -> ResourcePlan {
        let mut facts = base_facts(context(account, region));
        facts.central_account_id = AccountId::parse("111111111111");
        plan(&facts, &facts.label).unwrap()
    }

    #[test]
    fn test_phase_of_plans() {
        assert_eq!(
            plan_for("111111111111", "us-east-1").phase(),
            RolloutPhase::Aggregating
        );
        assert_eq!(
            plan_for("222222222222", "us-east-1").phase(),
            RolloutPhase::Contributor
        );
        assert_eq!(
            plan_for("111111111111", "eu-west-1").phase(),
            RolloutPhase::Contributor
        );
    }

    #[test]
    fn test_contributors_first() {
        let ordered = order_contexts(vec![
            plan_for("111111111111", "us-east-1"),
            plan_for("222222222222", "us-east-1"),
            plan_for("111111111111", "eu-west-1"),
        ]);
        let phases: Vec<RolloutPhase> = ordered.iter().map(ResourcePlan::phase).collect();
        assert_eq!(
            phases,
            vec![
                RolloutPhase::Contributor,
                RolloutPhase::Contributor,
                RolloutPhase::Aggregating
            ]
        );
        // Stable within a phase
        assert_eq!(ordered[0].context().account_id.as_str(), "222222222222");
        assert_eq!(ordered[1].context().region, "eu-west-1");
    }

    #[test]
    fn test_split_phases() {
        let phases = split_phases(vec![
            plan_for("111111111111", "us-east-1"),
            plan_for("222222222222", "eu-west-1"),
        ]);
        assert_eq!(phases.len(), 2);
        assert_eq!(phases[0].0, RolloutPhase::Contributor);
        assert_eq!(phases[1].0, RolloutPhase::Aggregating);

        let only_contributors = split_phases(vec![plan_for("222222222222", "eu-west-1")]);
        assert_eq!(only_contributors.len(), 1);
    }
}
