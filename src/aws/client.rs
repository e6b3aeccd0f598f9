use aws_config::BehaviorVersion;
use aws_sdk_ec2::Client as Ec2Client;
use aws_sdk_servicequotas::Client as QuotasClient;
use aws_sdk_sts::Client as StsClient;
use tracing::debug;

use crate::config::Settings;
use crate::{Ec2ToolsError, Result};

/// AWS client wrapper holding all service clients.
///
/// Constructed once at process start and passed into every component that
/// needs it; there are no ambient module-level clients.
#[derive(Clone)]
pub struct AwsClients {
    pub ec2: Ec2Client,
    pub quotas: QuotasClient,
    pub region: String,
    pub account_id: String,
}

impl AwsClients {
    /// Create new AWS clients, using the region from settings if configured
    pub async fn new(settings: &Settings) -> Result<Self> {
        if let Some(ref region) = settings.region {
            return Self::with_region(region).await;
        }

        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::from_config(config).await
    }

    /// Create new AWS clients with a specific region
    pub async fn with_region(region: &str) -> Result<Self> {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        Self::from_config(config).await
    }

    async fn from_config(config: aws_config::SdkConfig) -> Result<Self> {
        let region = config
            .region()
            .map(|r| r.to_string())
            .ok_or(Ec2ToolsError::AwsCredentials)?;

        let ec2 = Ec2Client::new(&config);
        let quotas = QuotasClient::new(&config);
        let sts = StsClient::new(&config);

        // Verify credentials by getting caller identity
        let identity = sts
            .get_caller_identity()
            .send()
            .await
            .map_err(|_| Ec2ToolsError::AwsCredentials)?;

        let account_id = identity
            .account()
            .ok_or(Ec2ToolsError::AwsCredentials)?
            .to_string();

        debug!(region = %region, account_id = %account_id, "AWS clients ready");

        Ok(Self {
            ec2,
            quotas,
            region,
            account_id,
        })
    }
}
