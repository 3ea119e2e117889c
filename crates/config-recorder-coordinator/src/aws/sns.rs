//! SNS findings topic management

use crate::aws::context::{AwsContext, FromAwsContext};
use crate::aws::tags;
use anyhow::{Context, Result};
use aws_sdk_sns::Client;
use config_recorder_common::facts::SubscriberSpec;
use config_recorder_common::plan::{CreatedResource, TopicSpec};
use std::collections::HashMap;
use tracing::{debug, info};

/// Topic attribute holding the KMS key for server-side encryption
const ATTR_KMS_MASTER_KEY_ID: &str = "KmsMasterKeyId";

/// Subscription attribute for raw message delivery
const ATTR_RAW_MESSAGE_DELIVERY: &str = "RawMessageDelivery";

/// SNS client for the findings topic
pub struct SnsClient {
    client: Client,
}

impl FromAwsContext for SnsClient {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.sns_client(),
        }
    }
}

impl SnsClient {
    /// Create the topic (idempotent by name) and subscribe every subscriber
    pub async fn create_topic(&self, spec: &TopicSpec) -> Result<CreatedResource> {
        info!(topic = %spec.name, "Creating SNS topic");

        let attributes = spec
            .kms_master_key_id
            .as_ref()
            .map(|key| HashMap::from([(ATTR_KMS_MASTER_KEY_ID.to_string(), key.clone())]));

        let resp = self
            .client
            .create_topic()
            .name(&spec.name)
            .set_attributes(attributes)
            .set_tags(Some(tags::sns_tags(&spec.tags)?))
            .send()
            .await
            .context("Failed to create SNS topic")?;

        let topic_arn = resp
            .topic_arn()
            .context("No topic ARN returned from CreateTopic")?
            .to_string();

        for subscriber in &spec.subscribers {
            self.subscribe(&topic_arn, subscriber).await?;
        }

        info!(topic = %spec.name, arn = %topic_arn, subscribers = spec.subscribers.len(), "SNS topic ready");

        Ok(CreatedResource {
            arn: topic_arn,
            name: spec.name.clone(),
        })
    }

    async fn subscribe(&self, topic_arn: &str, subscriber: &SubscriberSpec) -> Result<()> {
        let attributes = subscriber.raw_message_delivery.then(|| {
            HashMap::from([(ATTR_RAW_MESSAGE_DELIVERY.to_string(), "true".to_string())])
        });

        let resp = self
            .client
            .subscribe()
            .topic_arn(topic_arn)
            .protocol(&subscriber.protocol)
            .endpoint(&subscriber.endpoint)
            .set_attributes(attributes)
            .return_subscription_arn(true)
            .send()
            .await
            .with_context(|| {
                format!(
                    "Failed to subscribe {} endpoint {}",
                    subscriber.protocol, subscriber.endpoint
                )
            })?;

        if subscriber.endpoint_auto_confirms {
            debug!(
                protocol = %subscriber.protocol,
                subscription = ?resp.subscription_arn(),
                "Subscription created"
            );
        } else {
            info!(
                protocol = %subscriber.protocol,
                endpoint = %subscriber.endpoint,
                "Subscription pending confirmation by the endpoint owner"
            );
        }

        Ok(())
    }
}

/// Trait for SNS operations.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
#[cfg_attr(test, mockall::automock)]
pub trait TopicOperations: Send + Sync {
    /// Create the findings topic with its subscriptions
    async fn create_topic(&self, spec: &TopicSpec) -> Result<CreatedResource>;
}

impl TopicOperations for SnsClient {
    async fn create_topic(&self, spec: &TopicSpec) -> Result<CreatedResource> {
        SnsClient::create_topic(self, spec).await
    }
}
