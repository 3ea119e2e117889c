//! AWS error classification and handling
//!
//! Provides typed errors for AWS SDK operations using the `.code()` method
//! instead of string matching on Debug format. The classification feeds the
//! operator suggestions printed with materialization failures.

use thiserror::Error;

/// AWS error categories relevant to recorder provisioning
#[derive(Debug, Error)]
pub enum AwsError {
    /// Resource was not found
    #[error("Resource not found: {message}")]
    NotFound { message: String },

    /// Resource already exists (safe to ignore in create operations)
    #[error("Resource already exists")]
    AlreadyExists,

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    Throttled,

    /// Caller lacks permission for the operation
    #[error("Access denied: {message}")]
    AccessDenied { message: String },

    /// AWS Config rejected the recorder role
    #[error("Recorder role rejected: {message}")]
    InvalidRole { message: String },

    /// Delivery bucket or topic unusable by AWS Config
    #[error("Delivery target rejected: {message}")]
    DeliveryTarget { message: String },

    /// Organization aggregation prerequisites missing
    #[error("Organization aggregation unavailable: {message}")]
    Organization { message: String },

    /// A per-region service limit was hit
    #[error("Service limit reached: {message}")]
    LimitExceeded { message: String },

    /// Generic AWS SDK error with code and message
    #[error("AWS error: {message}")]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl AwsError {
    /// Check if this is an "already exists" error
    pub fn is_already_exists(&self) -> bool {
        matches!(self, AwsError::AlreadyExists)
    }

    /// Get a user-friendly suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        let text = match self {
            AwsError::Throttled => {
                "AWS API rate limit hit. Re-run the command; every call is an upsert."
            }
            AwsError::AccessDenied { .. } => {
                "Check that the caller may manage AWS Config, IAM roles and SNS topics in this account."
            }
            AwsError::InvalidRole { .. } => {
                "The recorder role must trust config.amazonaws.com and carry AWS_ConfigRole. \
                 A just-created role may need a few seconds to propagate; re-run the command."
            }
            AwsError::DeliveryTarget { .. } => {
                "Check that the delivery bucket exists and its policy lets the recorder role \
                 call s3:GetBucketAcl and s3:PutObject with bucket-owner-full-control."
            }
            AwsError::Organization { .. } => {
                "Organization aggregation needs all-features AWS Organizations and a role with \
                 AWSConfigRoleForOrganizations, applied from the management or a delegated admin account."
            }
            AwsError::LimitExceeded { .. } => {
                "Only one recorder and one delivery channel exist per region. \
                 Rename to the existing ones or request a limit increase for rules."
            }
            AwsError::Sdk { code: Some(c), .. } => return suggestion_for_code(c),
            _ => return None,
        };
        Some(text.to_string())
    }
}

/// Known AWS error codes for "not found" conditions
const NOT_FOUND_CODES: &[&str] = &[
    "NoSuchEntity",
    "NotFound",
    "NoSuchConfigurationRecorderException",
    "NoAvailableConfigurationRecorderException",
    "NoSuchDeliveryChannelException",
    "NoAvailableDeliveryChannelException",
    "NoSuchConfigRuleException",
];

/// Known AWS error codes for "already exists" conditions
const ALREADY_EXISTS_CODES: &[&str] = &["EntityAlreadyExists"];

/// Known AWS error codes for throttling/rate limiting
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "TooManyRequestsException",
    "RequestLimitExceeded",
];

const ACCESS_DENIED_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "AuthorizationError",
    "InsufficientPermissionsException",
    "KMSAccessDenied",
];

const INVALID_ROLE_CODES: &[&str] = &["InvalidRoleException"];

const DELIVERY_TARGET_CODES: &[&str] = &[
    "InsufficientDeliveryPolicyException",
    "NoSuchBucketException",
    "InvalidS3KeyPrefixException",
    "InvalidS3KmsKeyArnException",
    "InvalidSNSTopicARNException",
    "InvalidDeliveryChannelNameException",
];

const ORGANIZATION_CODES: &[&str] = &[
    "OrganizationAccessDeniedException",
    "NoAvailableOrganizationException",
    "OrganizationAllFeaturesNotEnabledException",
];

const LIMIT_CODES: &[&str] = &[
    "MaxNumberOfConfigurationRecordersExceededException",
    "MaxNumberOfDeliveryChannelsExceededException",
    "MaxNumberOfConfigRulesExceededException",
    "LimitExceeded",
    "LimitExceededException",
];

/// Classify an AWS SDK error using the error code.
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> AwsError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => AwsError::NotFound { message },
        Some(c) if ALREADY_EXISTS_CODES.contains(&c) => AwsError::AlreadyExists,
        Some(c) if THROTTLING_CODES.contains(&c) => AwsError::Throttled,
        Some(c) if ACCESS_DENIED_CODES.contains(&c) => AwsError::AccessDenied { message },
        Some(c) if INVALID_ROLE_CODES.contains(&c) => AwsError::InvalidRole { message },
        Some(c) if DELIVERY_TARGET_CODES.contains(&c) => AwsError::DeliveryTarget { message },
        Some(c) if ORGANIZATION_CODES.contains(&c) => AwsError::Organization { message },
        Some(c) if LIMIT_CODES.contains(&c) => AwsError::LimitExceeded { message },
        _ => AwsError::Sdk {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Return early with the classification of `$cause` if it is one of `$err`
macro_rules! classify_sdk_errors {
    ($cause:expr, $($err:ty),+ $(,)?) => {
        $(
            if let Some(e) = $cause.downcast_ref::<$err>() {
                let meta = ProvideErrorMetadata::meta(e);
                return classify_aws_error(meta.code(), meta.message());
            }
        )+
    };
}

/// Classify an error from an anyhow::Error by extracting the AWS error code.
///
/// Walks the error chain using `ProvideErrorMetadata` to extract `.code()` and
/// `.message()` from the SDK errors of every operation the coordinator calls.
/// Falls back to string matching on the Debug representation if no typed
/// error is found.
pub fn classify_anyhow_error(error: &anyhow::Error) -> AwsError {
    use aws_sdk_config::error::{ProvideErrorMetadata, SdkError};
    use aws_sdk_config::operation as config;
    use aws_sdk_iam::operation as iam;
    use aws_sdk_sns::operation as sns;
    use aws_sdk_sts::operation as sts;

    for cause in error.chain() {
        classify_sdk_errors!(
            cause,
            SdkError<config::put_configuration_recorder::PutConfigurationRecorderError>,
            SdkError<config::put_delivery_channel::PutDeliveryChannelError>,
            SdkError<config::start_configuration_recorder::StartConfigurationRecorderError>,
            SdkError<config::stop_configuration_recorder::StopConfigurationRecorderError>,
            SdkError<config::put_config_rule::PutConfigRuleError>,
            SdkError<config::put_configuration_aggregator::PutConfigurationAggregatorError>,
            SdkError<config::put_aggregation_authorization::PutAggregationAuthorizationError>,
            SdkError<iam::create_role::CreateRoleError>,
            SdkError<iam::get_role::GetRoleError>,
            SdkError<iam::update_assume_role_policy::UpdateAssumeRolePolicyError>,
            SdkError<iam::tag_role::TagRoleError>,
            SdkError<iam::put_role_policy::PutRolePolicyError>,
            SdkError<iam::attach_role_policy::AttachRolePolicyError>,
            SdkError<sns::create_topic::CreateTopicError>,
            SdkError<sns::subscribe::SubscribeError>,
            SdkError<sts::get_caller_identity::GetCallerIdentityError>,
        );
    }

    // Fallback: extract error code from debug string representation
    let debug_str = format!("{:?}", error);
    if let Some(code) = extract_error_code(&debug_str) {
        return classify_aws_error(Some(&code), Some(&error.to_string()));
    }

    AwsError::Sdk {
        code: None,
        message: error.to_string(),
    }
}

/// Extract an AWS error code from a debug string representation
fn extract_error_code(debug_str: &str) -> Option<String> {
    let known = [
        NOT_FOUND_CODES,
        ALREADY_EXISTS_CODES,
        THROTTLING_CODES,
        ACCESS_DENIED_CODES,
        INVALID_ROLE_CODES,
        DELIVERY_TARGET_CODES,
        ORGANIZATION_CODES,
        LIMIT_CODES,
    ];

    // Longest match first so "AccessDeniedException" wins over "AccessDenied"
    let mut codes: Vec<&str> = known.into_iter().flatten().copied().collect();
    codes.sort_by_key(|c| std::cmp::Reverse(c.len()));
    if let Some(code) = codes.into_iter().find(|c| debug_str.contains(c)) {
        return Some(code.to_string());
    }

    // Try to extract any code from `code: Some("...")` pattern
    if let Some(start) = debug_str.find("code: Some(\"") {
        let rest = &debug_str[start + 12..];
        if let Some(end) = rest.find('"') {
            return Some(rest[..end].to_string());
        }
    }

    None
}

/// Error code to user-friendly suggestion mapping for unclassified codes
const SUGGESTIONS: &[(&str, &str)] = &[
    (
        "InvalidParameterValueException",
        "A recorder or rule parameter was rejected. Check managed rule input_parameters.",
    ),
    (
        "InvalidRecordingGroupException",
        "Check recording_mode overrides: resource types must be valid AWS Config types.",
    ),
    (
        "ResourceInUseException",
        "Another operation on this resource is in progress. Wait and re-run the command.",
    ),
    (
        "MalformedPolicyDocument",
        "An inline policy document was rejected. Check s3_bucket_arn and the topic ARN.",
    ),
    (
        "ExpiredToken",
        "AWS credentials expired. Refresh the session for the selected profile.",
    ),
    (
        "InvalidClientTokenId",
        "AWS credentials are invalid for this partition or region.",
    ),
];

/// Get a user-friendly suggestion for a known error code.
fn suggestion_for_code(code: &str) -> Option<String> {
    SUGGESTIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, s)| (*s).to_string())
}
