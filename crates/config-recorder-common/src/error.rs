//! Planning errors
//!
//! Planning fails fast: any of these is reported before the first
//! collaborator call for the context, so there are no partial plans.

use thiserror::Error;

/// A mandatory reference or setting is missing
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// No role to hand to the recorder
    #[error("iam_role_arn must be set when create_iam_role is false")]
    MissingRoleReference,

    /// Aggregation is in play but there is no home region
    #[error("global_resource_collector_region must be set when aggregation is enabled")]
    MissingGlobalRecorderRegion,
}

/// A field is malformed or empty
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Field does not hold a 12-digit account ID
    #[error("{field} must be a 12-digit AWS account ID, got: {value:?}")]
    InvalidAccountId { field: &'static str, value: String },

    /// Managed rule without a source identifier
    #[error("managed rule '{rule}' has an empty identifier")]
    EmptyRuleIdentifier { rule: String },

    /// Delivery channel has no target
    #[error("s3_bucket_id cannot be empty when the recorder is enabled")]
    EmptyBucketId,

    /// A created role has no bucket to grant delivery to
    #[error("s3_bucket_arn cannot be empty when create_iam_role is true")]
    EmptyBucketArn,

    /// Bucket ARN is not an S3 ARN of the context's partition
    #[error("s3_bucket_arn must be an S3 bucket ARN in partition {partition}, got: {value:?}")]
    InvalidBucketArn { value: String, partition: String },

    /// Current region could not be determined
    #[error("current region cannot be empty")]
    EmptyRegion,

    /// Structural validation of the settings failed
    #[error("invalid settings: {0}")]
    Settings(String),

    /// The plan graph is not a DAG
    #[error("resource plan contains a dependency cycle at {0}")]
    DependencyCycle(String),
}

/// Any error raised while resolving facts or building a plan
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl PlanError {
    /// Whether this is a configuration (missing reference) error
    pub fn is_configuration(&self) -> bool {
        matches!(self, PlanError::Configuration(_))
    }

    /// Whether this is a validation (malformed field) error
    pub fn is_validation(&self) -> bool {
        matches!(self, PlanError::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ValidationError::EmptyRuleIdentifier {
                rule: "s3-public-read".to_string()
            }
            .to_string(),
            "managed rule 's3-public-read' has an empty identifier"
        );
        assert_eq!(
            PlanError::from(ConfigurationError::MissingRoleReference).to_string(),
            "configuration error: iam_role_arn must be set when create_iam_role is false"
        );
    }

    #[test]
    fn test_category_checks() {
        let err = PlanError::from(ValidationError::EmptyBucketId);
        assert!(err.is_validation());
        assert!(!err.is_configuration());

        let err = PlanError::from(ConfigurationError::MissingGlobalRecorderRegion);
        assert!(err.is_configuration());
    }
}
