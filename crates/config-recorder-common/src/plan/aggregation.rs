//! Aggregator topology planning
//!
//! Each execution context decides on its own whether it hosts an aggregator
//! and which authorization it grants:
//!
//! | Central account set | Context | Aggregator | Authorization |
//! |---------------------|---------|------------|---------------|
//! | no  | global region | account mode, children | Central (self) |
//! | no  | other region  | none | Central (self) |
//! | yes | central account, global region | account mode, children | Child (to central) |
//! | yes | any other | none | Child (to central) |
//!
//! Organization mode replaces the central-account check: every context in
//! the global region hosts an organization-mode aggregator.
//!
//! Authorizations from contributing contexts must exist before the central
//! aggregator can see their data. That ordering spans contexts and is left
//! to the rollout driver; see [`crate::rollout`].

use super::iam::RoleBinding;
use super::spec::*;
use super::ResourcePlan;
use crate::defaults::AGGREGATOR_ATTRIBUTE;
use crate::facts::Facts;
use crate::label::Naming;
use crate::topology::DerivedFacts;

/// Nodes emitted by [`plan_aggregation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregationNodes {
    pub aggregator: Option<NodeId>,
    pub authorization: Option<NodeId>,
}

pub fn plan_aggregation(
    facts: &Facts,
    derived: &DerivedFacts,
    naming: &impl Naming,
    role: &RoleBinding,
    plan: &mut ResourcePlan,
) -> AggregationNodes {
    let tags = naming.resolve_tags();
    let mut nodes = AggregationNodes::default();

    if derived.should_create_aggregator(facts.organization_aggregation_enabled) {
        let (mode, deps) = if facts.organization_aggregation_enabled {
            (
                AggregatorMode::OrganizationMode {
                    all_regions: true,
                    role_arn: role.arn.clone(),
                },
                role.prerequisites.clone(),
            )
        } else {
            (
                AggregatorMode::AccountMode {
                    account_ids: facts.child_account_ids.clone(),
                    all_regions: true,
                },
                Vec::new(),
            )
        };

        nodes.aggregator = Some(plan.add(
            ResourceSpec::Aggregator(AggregatorSpec {
                name: naming.resolve_name(&[AGGREGATOR_ATTRIBUTE]),
                mode,
                tags: tags.clone(),
            }),
            &deps,
        ));
    }

    if derived.aggregation_enabled_here {
        let (side, account_id) = match &facts.central_account_id {
            Some(central) => (AuthorizationSide::Child, central.clone()),
            None => (AuthorizationSide::Central, facts.context.account_id.clone()),
        };

        nodes.authorization = Some(plan.add(
            ResourceSpec::AggregateAuthorization(AggregateAuthorizationSpec {
                side,
                account_id,
                region: facts.global_recorder_region.clone(),
                tags,
            }),
            &[],
        ));
    }

    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountId;
    use crate::testing::{base_facts, context};

    fn aggregate(facts: &Facts) -> (ResourcePlan, AggregationNodes) {
        let derived = DerivedFacts::classify(facts);
        let mut plan = ResourcePlan::new(facts.context.clone());
        let role = RoleBinding {
            arn: ArnRef::Literal("arn:aws:iam::111111111111:role/config".to_string()),
            role: None,
            attachments: vec![],
            prerequisites: vec![],
        };
        let nodes = plan_aggregation(facts, &derived, &facts.label, &role, &mut plan);
        (plan, nodes)
    }

    #[test]
    fn test_central_account_hosts_account_mode_aggregator() {
        let mut facts = base_facts(context("111111111111", "us-east-1"));
        facts.central_account_id = AccountId::parse("111111111111");
        facts.child_account_ids = vec![
            AccountId::parse("222222222222").unwrap(),
            AccountId::parse("333333333333").unwrap(),
        ];

        let (plan, nodes) = aggregate(&facts);
        let ResourceSpec::Aggregator(spec) = plan.spec(nodes.aggregator.unwrap()) else {
            panic!("expected aggregator");
        };
        assert_eq!(spec.name, "config-aggregator");
        assert_eq!(
            spec.mode,
            AggregatorMode::AccountMode {
                account_ids: facts.child_account_ids.clone(),
                all_regions: true,
            }
        );

        // The central account still authorizes itself as a child of the central account
        let ResourceSpec::AggregateAuthorization(auth) = plan.spec(nodes.authorization.unwrap())
        else {
            panic!("expected authorization");
        };
        assert_eq!(auth.side, AuthorizationSide::Child);
        assert_eq!(auth.account_id.as_str(), "111111111111");
    }

    #[test]
    fn test_organization_mode_uses_role() {
        let mut facts = base_facts(context("222222222222", "us-east-1"));
        facts.organization_aggregation_enabled = true;
        facts.central_account_id = AccountId::parse("111111111111");

        let (plan, nodes) = aggregate(&facts);
        let ResourceSpec::Aggregator(spec) = plan.spec(nodes.aggregator.unwrap()) else {
            panic!("expected aggregator");
        };
        assert_eq!(
            spec.mode,
            AggregatorMode::OrganizationMode {
                all_regions: true,
                role_arn: ArnRef::Literal("arn:aws:iam::111111111111:role/config".to_string()),
            }
        );
    }

    #[test]
    fn test_non_global_region_only_authorizes() {
        let facts = base_facts(context("222222222222", "eu-central-1"));
        let (plan, nodes) = aggregate(&facts);
        assert!(nodes.aggregator.is_none());

        let ResourceSpec::AggregateAuthorization(auth) = plan.spec(nodes.authorization.unwrap())
        else {
            panic!("expected authorization");
        };
        assert_eq!(auth.side, AuthorizationSide::Central);
        assert_eq!(auth.account_id.as_str(), "222222222222");
        assert_eq!(auth.region, "us-east-1");
    }

    #[test]
    fn test_disabled_region_emits_nothing() {
        let mut facts = base_facts(context("222222222222", "us-east-1"));
        facts.disabled_aggregation_regions.insert("us-east-1".to_string());
        let (plan, nodes) = aggregate(&facts);
        assert!(plan.is_empty());
        assert_eq!(nodes, AggregationNodes::default());
    }
}
