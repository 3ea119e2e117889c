//! IAM policy documents for the recorder role

use crate::defaults::BUCKET_OWNER_FULL_CONTROL;

/// Trust policy letting service principals assume the role
pub fn assume_role_policy(service_principals: &[String]) -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Effect": "Allow",
                "Principal": {
                    "Service": service_principals
                },
                "Action": "sts:AssumeRole"
            }
        ]
    })
    .to_string()
}

/// Generate the S3 delivery policy for the recorder role
///
/// AWS Config needs:
/// - `s3:GetBucketAcl` on the bucket to check delivery permissions
/// - `s3:PutObject` on the bucket contents, only with the
///   `bucket-owner-full-control` canned ACL
pub fn s3_delivery_policy(bucket_arn: &str) -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Sid": "AWSConfigBucketPermissionsCheck",
                "Effect": "Allow",
                "Action": ["s3:GetBucketAcl"],
                "Resource": [bucket_arn]
            },
            {
                "Sid": "AWSConfigBucketDelivery",
                "Effect": "Allow",
                "Action": ["s3:PutObject"],
                "Resource": [format!("{bucket_arn}/*")],
                "Condition": {
                    "StringLike": {
                        "s3:x-amz-acl": BUCKET_OWNER_FULL_CONTROL
                    }
                }
            }
        ]
    })
    .to_string()
}

/// Generate the SNS publish policy for the recorder role
pub fn sns_publish_policy(topic_arn: &str) -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Sid": "AWSConfigSNSPublish",
                "Effect": "Allow",
                "Action": ["sns:Publish"],
                "Resource": [topic_arn]
            }
        ]
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_s3_delivery_policy_contract() {
        let doc: Value =
            serde_json::from_str(&s3_delivery_policy("arn:aws:s3:::audit-bucket")).unwrap();
        let statements = doc["Statement"].as_array().unwrap();
        assert_eq!(statements.len(), 2);

        assert_eq!(statements[0]["Action"][0], "s3:GetBucketAcl");
        assert_eq!(statements[0]["Resource"][0], "arn:aws:s3:::audit-bucket");

        assert_eq!(statements[1]["Action"][0], "s3:PutObject");
        assert_eq!(statements[1]["Resource"][0], "arn:aws:s3:::audit-bucket/*");
        assert_eq!(
            statements[1]["Condition"]["StringLike"]["s3:x-amz-acl"],
            "bucket-owner-full-control"
        );
    }

    #[test]
    fn test_sns_publish_policy() {
        let doc: Value =
            serde_json::from_str(&sns_publish_policy("arn:aws:sns:us-east-1:111111111111:f"))
                .unwrap();
        assert_eq!(doc["Statement"][0]["Action"][0], "sns:Publish");
        assert_eq!(
            doc["Statement"][0]["Resource"][0],
            "arn:aws:sns:us-east-1:111111111111:f"
        );
    }

    #[test]
    fn test_assume_role_policy() {
        let doc: Value = serde_json::from_str(&assume_role_policy(&["config.amazonaws.com".to_string()])).unwrap();
        assert_eq!(
            doc["Statement"][0]["Principal"]["Service"][0],
            "config.amazonaws.com"
        );
        assert_eq!(doc["Statement"][0]["Action"], "sts:AssumeRole");
    }
}
