//! Recorder IAM role planning

use super::spec::*;
use super::ResourcePlan;
use crate::defaults::{
    CONFIG_ORGANIZATIONS_POLICY, CONFIG_ROLE_POLICY, CONFIG_SERVICE_PRINCIPAL, managed_policy_arn,
};
use crate::error::ConfigurationError;
use crate::facts::Facts;
use crate::label::Naming;
use crate::topology::DerivedFacts;

/// The role every recorder-side node runs as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleBinding {
    /// ARN handed to the recorder and an organization-mode aggregator
    pub arn: ArnRef,
    /// Created role node, if the role is created here
    pub role: Option<NodeId>,
    /// Managed policy attachment nodes of the created role
    pub attachments: Vec<NodeId>,
    /// Nodes that must exist before the role is usable
    pub prerequisites: Vec<NodeId>,
}

impl RoleBinding {
    fn supplied(arn: &str) -> Self {
        Self {
            arn: ArnRef::Literal(arn.to_string()),
            role: None,
            attachments: Vec::new(),
            prerequisites: Vec::new(),
        }
    }
}

/// Plan the recorder role, or fall back to the supplied one
///
/// A created role gets the S3 delivery document, plus the SNS publish
/// document when notifications are in use, and the AWS managed Config
/// policy (and the organizations policy in organization mode).
pub fn plan_iam_role(
    facts: &Facts,
    derived: &DerivedFacts,
    naming: &impl Naming,
    notification: Option<&ArnRef>,
    plan: &mut ResourcePlan,
) -> Result<RoleBinding, ConfigurationError> {
    if !derived.create_iam_role_effective {
        return facts
            .supplied_role_arn
            .as_deref()
            .map(RoleBinding::supplied)
            .ok_or(ConfigurationError::MissingRoleReference);
    }

    let mut policy_documents = vec![PolicyDocument::S3Delivery {
        bucket_arn: facts.s3_bucket_arn.clone(),
    }];
    if let Some(topic_arn) = notification {
        policy_documents.push(PolicyDocument::SnsPublish {
            topic_arn: topic_arn.clone(),
        });
    }

    let role_deps: Vec<NodeId> = notification.and_then(ArnRef::node).into_iter().collect();
    let role = plan.add(
        ResourceSpec::IamRole(IamRoleSpec {
            name: naming.resolve_name(&[]),
            use_fullname: true,
            principals: vec![CONFIG_SERVICE_PRINCIPAL.to_string()],
            policy_documents,
            tags: naming.resolve_tags(),
        }),
        &role_deps,
    );

    let partition = &facts.context.partition;
    let mut policies = vec![managed_policy_arn(partition, CONFIG_ROLE_POLICY)];
    if facts.organization_aggregation_enabled {
        policies.push(managed_policy_arn(partition, CONFIG_ORGANIZATIONS_POLICY));
    }

    let attachments: Vec<NodeId> = policies
        .into_iter()
        .map(|policy_arn| {
            plan.add(
                ResourceSpec::RolePolicyAttachment(RolePolicyAttachmentSpec { role, policy_arn }),
                &[role],
            )
        })
        .collect();

    let mut prerequisites = vec![role];
    prerequisites.extend(&attachments);

    Ok(RoleBinding {
        arn: ArnRef::Output(role),
        role: Some(role),
        attachments,
        prerequisites,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{base_facts, context};

    fn iam_plan(facts: &Facts, notification: Option<&ArnRef>) -> (ResourcePlan, RoleBinding) {
        let derived = DerivedFacts::classify(facts);
        let mut plan = ResourcePlan::new(facts.context.clone());
        let binding =
            plan_iam_role(facts, &derived, &facts.label, notification, &mut plan).unwrap();
        (plan, binding)
    }

    fn role_spec(plan: &ResourcePlan, binding: &RoleBinding) -> IamRoleSpec {
        match plan.spec(binding.role.unwrap()) {
            ResourceSpec::IamRole(spec) => spec.clone(),
            other => panic!("expected role, got {other:?}"),
        }
    }

    #[test]
    fn test_supplied_role() {
        let mut facts = base_facts(context("222222222222", "us-east-1"));
        facts.create_iam_role = false;
        facts.supplied_role_arn = Some("arn:aws:iam::222222222222:role/config".to_string());

        let (plan, binding) = iam_plan(&facts, None);
        assert!(plan.is_empty());
        assert_eq!(
            binding.arn,
            ArnRef::Literal("arn:aws:iam::222222222222:role/config".to_string())
        );
        assert!(binding.prerequisites.is_empty());
    }

    #[test]
    fn test_missing_role_reference() {
        let mut facts = base_facts(context("222222222222", "us-east-1"));
        facts.create_iam_role = false;
        facts.supplied_role_arn = None;

        let derived = DerivedFacts::classify(&facts);
        let mut plan = ResourcePlan::new(facts.context.clone());
        let err = plan_iam_role(&facts, &derived, &facts.label, None, &mut plan).unwrap_err();
        assert_eq!(err, ConfigurationError::MissingRoleReference);
    }

    #[test]
    fn test_created_role_without_notifications() {
        let facts = base_facts(context("222222222222", "us-east-1"));
        let (plan, binding) = iam_plan(&facts, None);

        let spec = role_spec(&plan, &binding);
        assert_eq!(spec.policy_documents.len(), 1);
        assert!(spec.use_fullname);
        assert_eq!(spec.principals, vec!["config.amazonaws.com".to_string()]);
        assert_eq!(binding.attachments.len(), 1);
        assert_eq!(binding.arn, ArnRef::Output(binding.role.unwrap()));
    }

    #[test]
    fn test_created_role_with_supplied_topic() {
        let facts = base_facts(context("222222222222", "us-east-1"));
        let topic = ArnRef::Literal("arn:aws:sns:us-east-1:222222222222:findings".to_string());
        let (plan, binding) = iam_plan(&facts, Some(&topic));

        let spec = role_spec(&plan, &binding);
        assert_eq!(spec.policy_documents.len(), 2);
        assert_eq!(
            spec.policy_documents[1],
            PolicyDocument::SnsPublish { topic_arn: topic }
        );
        assert!(plan.dependencies(binding.role.unwrap()).is_empty());
    }

    #[test]
    fn test_organization_policy_attached() {
        let mut facts = base_facts(context("222222222222", "us-east-1"));
        facts.organization_aggregation_enabled = true;
        let (plan, binding) = iam_plan(&facts, None);

        let arns: Vec<String> = binding
            .attachments
            .iter()
            .map(|id| match plan.spec(*id) {
                ResourceSpec::RolePolicyAttachment(a) => a.policy_arn.clone(),
                other => panic!("expected attachment, got {other:?}"),
            })
            .collect();
        assert_eq!(
            arns,
            vec![
                "arn:aws:iam::aws:policy/service-role/AWS_ConfigRole".to_string(),
                "arn:aws:iam::aws:policy/service-role/AWSConfigRoleForOrganizations".to_string(),
            ]
        );
    }
}
