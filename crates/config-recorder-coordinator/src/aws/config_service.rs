//! AWS Config operations
//!
//! Every call here is an upsert: putting a recorder, channel, rule,
//! aggregator or authorization that already exists updates it in place.

use crate::aws::context::{AwsContext, FromAwsContext};
use crate::aws::tags;
use anyhow::{Context, Result};
use aws_sdk_config::Client;
use aws_sdk_config::types::{
    AccountAggregationSource, ConfigRule, ConfigurationRecorder, DeliveryChannel,
    OrganizationAggregationSource, Owner, RecordingFrequency, RecordingGroup, RecordingMode,
    RecordingModeOverride, Source,
};
use config_recorder_common::facts;
use config_recorder_common::plan::{
    AggregateAuthorizationSpec, AggregatorMode, AggregatorSpec, DeliveryChannelSpec, RecorderSpec,
    RuleSpec,
};
use tracing::{debug, info};

/// AWS Config client
pub struct ConfigServiceClient {
    client: Client,
}

impl FromAwsContext for ConfigServiceClient {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.config_client(),
        }
    }
}

impl ConfigServiceClient {
    pub async fn put_configuration_recorder(&self, spec: &RecorderSpec, role_arn: &str) -> Result<()> {
        let group = RecordingGroup::builder()
            .all_supported(spec.all_supported)
            .include_global_resource_types(spec.include_global_resource_types)
            .build();

        let mut recorder = ConfigurationRecorder::builder()
            .name(&spec.name)
            .role_arn(role_arn)
            .recording_group(group);
        if let Some(mode) = &spec.recording_mode {
            recorder = recorder.recording_mode(recording_mode(mode)?);
        }

        self.client
            .put_configuration_recorder()
            .configuration_recorder(recorder.build())
            .send()
            .await
            .context("Failed to put configuration recorder")?;

        info!(
            recorder = %spec.name,
            global_resources = spec.include_global_resource_types,
            "Configuration recorder ready"
        );
        Ok(())
    }

    pub async fn put_delivery_channel(
        &self,
        spec: &DeliveryChannelSpec,
        sns_topic_arn: Option<&str>,
    ) -> Result<()> {
        let channel = DeliveryChannel::builder()
            .name(&spec.name)
            .s3_bucket_name(&spec.s3_bucket_name)
            .set_s3_key_prefix(spec.s3_key_prefix.clone())
            .set_sns_topic_arn(sns_topic_arn.map(str::to_string))
            .build();

        self.client
            .put_delivery_channel()
            .delivery_channel(channel)
            .send()
            .await
            .context("Failed to put delivery channel")?;

        info!(
            channel = %spec.name,
            bucket = %spec.s3_bucket_name,
            notifications = sns_topic_arn.is_some(),
            "Delivery channel ready"
        );
        Ok(())
    }

    /// Start or stop a recorder
    pub async fn set_recorder_status(&self, recorder_name: &str, enabled: bool) -> Result<()> {
        if enabled {
            self.client
                .start_configuration_recorder()
                .configuration_recorder_name(recorder_name)
                .send()
                .await
                .context("Failed to start configuration recorder")?;
        } else {
            self.client
                .stop_configuration_recorder()
                .configuration_recorder_name(recorder_name)
                .send()
                .await
                .context("Failed to stop configuration recorder")?;
        }

        info!(recorder = %recorder_name, enabled, "Recorder status set");
        Ok(())
    }

    pub async fn put_config_rule(&self, spec: &RuleSpec) -> Result<()> {
        let source = Source::builder()
            .owner(Owner::Aws)
            .source_identifier(&spec.source_identifier)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build rule source: {}", e))?;

        let rule = ConfigRule::builder()
            .config_rule_name(&spec.name)
            .set_description(Some(spec.description.clone()).filter(|d| !d.is_empty()))
            .source(source)
            .set_input_parameters(spec.input_parameters.clone())
            .build();

        self.client
            .put_config_rule()
            .config_rule(rule)
            .set_tags(Some(tags::config_tags(&spec.tags)))
            .send()
            .await
            .with_context(|| format!("Failed to put config rule {}", spec.name))?;

        debug!(rule = %spec.name, source = %spec.source_identifier, "Config rule ready");
        Ok(())
    }

    /// Put an aggregator, returning its ARN
    ///
    /// `role_arn` is required in organization mode and ignored otherwise.
    pub async fn put_configuration_aggregator(
        &self,
        spec: &AggregatorSpec,
        role_arn: Option<&str>,
    ) -> Result<String> {
        let mut request = self
            .client
            .put_configuration_aggregator()
            .configuration_aggregator_name(&spec.name)
            .set_tags(Some(tags::config_tags(&spec.tags)));

        request = match &spec.mode {
            AggregatorMode::AccountMode {
                account_ids,
                all_regions,
            } => request.account_aggregation_sources(
                AccountAggregationSource::builder()
                    .set_account_ids(Some(
                        account_ids.iter().map(|id| id.to_string()).collect(),
                    ))
                    .all_aws_regions(*all_regions)
                    .build()
                    .map_err(|e| anyhow::anyhow!("Failed to build account source: {}", e))?,
            ),
            AggregatorMode::OrganizationMode { all_regions, .. } => {
                let role_arn =
                    role_arn.context("Organization aggregator requires a role ARN")?;
                request.organization_aggregation_source(
                    OrganizationAggregationSource::builder()
                        .role_arn(role_arn)
                        .all_aws_regions(*all_regions)
                        .build()
                        .map_err(|e| {
                            anyhow::anyhow!("Failed to build organization source: {}", e)
                        })?,
                )
            }
        };

        let resp = request
            .send()
            .await
            .context("Failed to put configuration aggregator")?;

        let arn = resp
            .configuration_aggregator()
            .and_then(|a| a.configuration_aggregator_arn())
            .context("No aggregator ARN returned from PutConfigurationAggregator")?
            .to_string();

        info!(aggregator = %spec.name, arn = %arn, "Configuration aggregator ready");
        Ok(arn)
    }

    /// Authorize an aggregator account/region, returning the authorization ARN
    pub async fn put_aggregation_authorization(
        &self,
        spec: &AggregateAuthorizationSpec,
    ) -> Result<String> {
        let resp = self
            .client
            .put_aggregation_authorization()
            .authorized_account_id(spec.account_id.as_str())
            .authorized_aws_region(&spec.region)
            .set_tags(Some(tags::config_tags(&spec.tags)))
            .send()
            .await
            .context("Failed to put aggregation authorization")?;

        let arn = resp
            .aggregation_authorization()
            .and_then(|a| a.aggregation_authorization_arn())
            .context("No authorization ARN returned from PutAggregationAuthorization")?
            .to_string();

        info!(
            side = %spec.side,
            authorized_account = %spec.account_id,
            authorized_region = %spec.region,
            "Aggregation authorization ready"
        );
        Ok(arn)
    }
}

fn recording_frequency(frequency: facts::RecordingFrequency) -> RecordingFrequency {
    RecordingFrequency::from(frequency.as_ref())
}

fn recording_mode(mode: &facts::RecordingMode) -> Result<RecordingMode> {
    let overrides = mode
        .overrides
        .iter()
        .map(|o| {
            RecordingModeOverride::builder()
                .set_description(o.description.clone())
                .set_resource_types(Some(
                    o.resource_types
                        .iter()
                        .map(|t| aws_sdk_config::types::ResourceType::from(t.as_str()))
                        .collect(),
                ))
                .recording_frequency(recording_frequency(o.recording_frequency))
                .build()
                .map_err(|e| anyhow::anyhow!("Failed to build recording mode override: {}", e))
        })
        .collect::<Result<Vec<_>>>()?;

    RecordingMode::builder()
        .recording_frequency(recording_frequency(mode.recording_frequency))
        .set_recording_mode_overrides(Some(overrides))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build recording mode: {}", e))
}

/// Trait for AWS Config operations.
///
/// Note: optional ARNs are `Option<String>` instead of `Option<&str>` to work
/// around mockall lifetime limitations.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
#[cfg_attr(test, mockall::automock)]
pub trait AuditOperations: Send + Sync {
    async fn put_configuration_recorder(&self, spec: &RecorderSpec, role_arn: &str) -> Result<()>;

    async fn put_delivery_channel(
        &self,
        spec: &DeliveryChannelSpec,
        sns_topic_arn: Option<String>,
    ) -> Result<()>;

    async fn set_recorder_status(&self, recorder_name: &str, enabled: bool) -> Result<()>;

    async fn put_config_rule(&self, spec: &RuleSpec) -> Result<()>;

    /// Returns the aggregator ARN
    async fn put_configuration_aggregator(
        &self,
        spec: &AggregatorSpec,
        role_arn: Option<String>,
    ) -> Result<String>;

    /// Returns the authorization ARN
    async fn put_aggregation_authorization(
        &self,
        spec: &AggregateAuthorizationSpec,
    ) -> Result<String>;
}

impl AuditOperations for ConfigServiceClient {
    async fn put_configuration_recorder(&self, spec: &RecorderSpec, role_arn: &str) -> Result<()> {
        ConfigServiceClient::put_configuration_recorder(self, spec, role_arn).await
    }

    async fn put_delivery_channel(
        &self,
        spec: &DeliveryChannelSpec,
        sns_topic_arn: Option<String>,
    ) -> Result<()> {
        ConfigServiceClient::put_delivery_channel(self, spec, sns_topic_arn.as_deref()).await
    }

    async fn set_recorder_status(&self, recorder_name: &str, enabled: bool) -> Result<()> {
        ConfigServiceClient::set_recorder_status(self, recorder_name, enabled).await
    }

    async fn put_config_rule(&self, spec: &RuleSpec) -> Result<()> {
        ConfigServiceClient::put_config_rule(self, spec).await
    }

    async fn put_configuration_aggregator(
        &self,
        spec: &AggregatorSpec,
        role_arn: Option<String>,
    ) -> Result<String> {
        ConfigServiceClient::put_configuration_aggregator(self, spec, role_arn.as_deref()).await
    }

    async fn put_aggregation_authorization(
        &self,
        spec: &AggregateAuthorizationSpec,
    ) -> Result<String> {
        ConfigServiceClient::put_aggregation_authorization(self, spec).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_mode_conversion() {
        let mode = facts::RecordingMode {
            recording_frequency: facts::RecordingFrequency::Daily,
            overrides: vec![facts::RecordingModeOverride {
                description: Some("EC2 continuously".to_string()),
                resource_types: vec!["AWS::EC2::Instance".to_string()],
                recording_frequency: facts::RecordingFrequency::Continuous,
            }],
        };

        let converted = recording_mode(&mode).unwrap();
        assert_eq!(converted.recording_frequency(), &RecordingFrequency::Daily);

        let overrides = converted.recording_mode_overrides();
        assert_eq!(overrides.len(), 1);
        assert_eq!(
            overrides[0].recording_frequency(),
            &RecordingFrequency::Continuous
        );
        assert_eq!(overrides[0].resource_types()[0].as_str(), "AWS::EC2::Instance");
    }
}
