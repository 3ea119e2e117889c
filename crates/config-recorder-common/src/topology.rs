//! Topology classification
//!
//! Pure functions of [`Facts`] deciding what role the current execution
//! context plays. Total over every combination of inputs.

use crate::facts::Facts;
use serde::Serialize;

/// Facts derived once per planning run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DerivedFacts {
    /// Enabled, and the current region is not excluded from aggregation
    pub aggregation_enabled_here: bool,
    /// The current account is the configured central account
    pub is_central_account: bool,
    /// No central account is configured; each account aggregates itself
    pub is_single_account: bool,
    /// The current region is the global recorder region
    pub is_global_recorder_region: bool,
    pub create_iam_role_effective: bool,
    pub create_sns_topic_effective: bool,
    /// A created or supplied topic receives findings
    pub notifications_enabled: bool,
}

impl DerivedFacts {
    pub fn classify(facts: &Facts) -> Self {
        let create_sns_topic_effective = facts.enabled && facts.create_sns_topic;

        Self {
            aggregation_enabled_here: facts.enabled
                && !facts
                    .disabled_aggregation_regions
                    .contains(&facts.context.region),
            is_central_account: is_central_account(facts),
            is_single_account: facts.central_account_id.is_none(),
            is_global_recorder_region: facts.global_recorder_region == facts.context.region,
            create_iam_role_effective: facts.enabled && facts.create_iam_role,
            create_sns_topic_effective,
            notifications_enabled: facts.enabled
                && (create_sns_topic_effective || facts.supplied_notification_arn.is_some()),
        }
    }

    /// Whether this context hosts a configuration aggregator
    ///
    /// In single-account mode the global recorder region is the account's own
    /// sink, so it aggregates without being named central.
    pub fn should_create_aggregator(&self, organization_aggregation_enabled: bool) -> bool {
        self.aggregation_enabled_here
            && self.is_global_recorder_region
            && (self.is_central_account || self.is_single_account || organization_aggregation_enabled)
    }
}

// No central account means no context is central, whatever the identity holds.
fn is_central_account(facts: &Facts) -> bool {
    match &facts.central_account_id {
        Some(central) => *central == facts.context.account_id,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountId;
    use crate::testing::{base_facts, context};

    #[test]
    fn test_disabled_region_turns_off_aggregation() {
        let mut facts = base_facts(context("222222222222", "eu-west-1"));
        assert!(DerivedFacts::classify(&facts).aggregation_enabled_here);

        facts.disabled_aggregation_regions.insert("eu-west-1".to_string());
        assert!(!DerivedFacts::classify(&facts).aggregation_enabled_here);
    }

    #[test]
    fn test_disabled_master_switch() {
        let mut facts = base_facts(context("222222222222", "us-east-1"));
        facts.enabled = false;
        facts.create_iam_role = true;
        facts.create_sns_topic = true;
        facts.supplied_notification_arn = Some("arn:aws:sns:us-east-1:222222222222:t".to_string());

        let derived = DerivedFacts::classify(&facts);
        assert!(!derived.aggregation_enabled_here);
        assert!(!derived.create_iam_role_effective);
        assert!(!derived.create_sns_topic_effective);
        assert!(!derived.notifications_enabled);
    }

    #[test]
    fn test_central_account_absent_is_never_central() {
        let facts = base_facts(context("222222222222", "us-east-1"));
        assert!(facts.central_account_id.is_none());
        let derived = DerivedFacts::classify(&facts);
        assert!(!derived.is_central_account);
        assert!(derived.is_single_account);
    }

    #[test]
    fn test_central_account_match() {
        let mut facts = base_facts(context("111111111111", "us-east-1"));
        facts.central_account_id = AccountId::parse("111111111111");
        assert!(DerivedFacts::classify(&facts).is_central_account);

        facts.central_account_id = AccountId::parse("999999999999");
        assert!(!DerivedFacts::classify(&facts).is_central_account);
    }

    #[test]
    fn test_global_region() {
        let facts = base_facts(context("222222222222", "us-east-1"));
        assert!(DerivedFacts::classify(&facts).is_global_recorder_region);

        let facts = base_facts(context("222222222222", "us-west-2"));
        assert!(!DerivedFacts::classify(&facts).is_global_recorder_region);
    }

    #[test]
    fn test_notifications_from_supplied_topic() {
        let mut facts = base_facts(context("222222222222", "us-east-1"));
        assert!(!DerivedFacts::classify(&facts).notifications_enabled);

        facts.supplied_notification_arn = Some("arn:aws:sns:us-east-1:222222222222:t".to_string());
        let derived = DerivedFacts::classify(&facts);
        assert!(derived.notifications_enabled);
        assert!(!derived.create_sns_topic_effective);
    }

    #[test]
    fn test_should_create_aggregator_lattice() {
        for bits in 0u8..32 {
            let derived = DerivedFacts {
                aggregation_enabled_here: bits & 1 != 0,
                is_global_recorder_region: bits & 2 != 0,
                is_central_account: bits & 4 != 0,
                is_single_account: bits & 16 != 0,
                create_iam_role_effective: false,
                create_sns_topic_effective: false,
                notifications_enabled: false,
            };
            let org = bits & 8 != 0;
            let expected = derived.aggregation_enabled_here
                && derived.is_global_recorder_region
                && (derived.is_central_account || derived.is_single_account || org);
            assert_eq!(derived.should_create_aggregator(org), expected, "bits={bits:05b}");
        }
    }
}
