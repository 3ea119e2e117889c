//! Fixed values used when planning recorder resources
//!
//! These are part of the security contract with the AWS Config service and
//! are not configurable.

/// Service principal that assumes the recorder role
pub const CONFIG_SERVICE_PRINCIPAL: &str = "config.amazonaws.com";

/// AWS managed policy granting AWS Config read access to recorded resources
pub const CONFIG_ROLE_POLICY: &str = "service-role/AWS_ConfigRole";

/// AWS managed policy letting AWS Config read an organization's accounts
pub const CONFIG_ORGANIZATIONS_POLICY: &str = "service-role/AWSConfigRoleForOrganizations";

/// Canned ACL AWS Config must set on every delivered object
pub const BUCKET_OWNER_FULL_CONTROL: &str = "bucket-owner-full-control";

/// Partition used when none is configured
pub const DEFAULT_PARTITION: &str = "aws";

/// Label delimiter used when none is configured
pub const DEFAULT_DELIMITER: &str = "-";

/// Label attribute appended to the aggregator name
pub const AGGREGATOR_ATTRIBUTE: &str = "aggregator";

/// Build the ARN of an AWS managed IAM policy in the given partition
pub fn managed_policy_arn(partition: &str, policy: &str) -> String {
    format!("arn:{partition}:iam::aws:policy/{policy}")
}

// Serde default functions for struct field defaults

/// Returns `true`
pub fn default_true() -> bool {
    true
}

/// Returns the default partition
pub fn default_partition() -> String {
    DEFAULT_PARTITION.to_string()
}

/// Returns the default label delimiter
pub fn default_delimiter() -> String {
    DEFAULT_DELIMITER.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_managed_policy_arn() {
        assert_eq!(
            managed_policy_arn("aws", CONFIG_ROLE_POLICY),
            "arn:aws:iam::aws:policy/service-role/AWS_ConfigRole"
        );
        assert_eq!(
            managed_policy_arn("aws-us-gov", CONFIG_ORGANIZATIONS_POLICY),
            "arn:aws-us-gov:iam::aws:policy/service-role/AWSConfigRoleForOrganizations"
        );
    }
}
