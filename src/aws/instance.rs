//! Instance records and lazily-bound instance handles.

use aws_sdk_ec2::error::ProvideErrorMetadata;
use aws_sdk_ec2::types::Instance;
use aws_sdk_ec2::Client as Ec2Client;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Ec2ToolsError, Result};

/// Instance lifecycle state names as reported by the API.
pub mod states {
    pub const PENDING: &str = "pending";
    pub const RUNNING: &str = "running";
    pub const STOPPING: &str = "stopping";
    pub const STOPPED: &str = "stopped";
    pub const SHUTTING_DOWN: &str = "shutting-down";
    pub const TERMINATED: &str = "terminated";
}

/// A key/value tag. Keys are not guaranteed unique on a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPair {
    pub key: String,
    pub value: String,
}

/// A point-in-time view of one instance, mapped field-by-field from the
/// describe response. Nothing here is cached across invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceDetail {
    pub instance_id: String,
    pub image_id: Option<String>,
    pub instance_type: Option<String>,
    pub key_name: Option<String>,
    pub launch_time: Option<DateTime<Utc>>,
    pub architecture: Option<String>,
    pub private_dns_name: Option<String>,
    pub private_ip_address: Option<String>,
    pub public_dns_name: Option<String>,
    pub public_ip_address: Option<String>,
    pub state: Option<String>,
    pub subnet_id: Option<String>,
    pub vpc_id: Option<String>,
    pub tags: Vec<TagPair>,
}

impl InstanceDetail {
    pub fn from_sdk(instance: &Instance) -> Self {
        Self {
            instance_id: instance.instance_id().unwrap_or_default().to_string(),
            image_id: non_empty(instance.image_id()),
            instance_type: instance.instance_type().map(|t| t.as_str().to_string()),
            key_name: non_empty(instance.key_name()),
            launch_time: instance
                .launch_time()
                .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos())),
            architecture: instance.architecture().map(|a| a.as_str().to_string()),
            private_dns_name: non_empty(instance.private_dns_name()),
            private_ip_address: non_empty(instance.private_ip_address()),
            public_dns_name: non_empty(instance.public_dns_name()),
            public_ip_address: non_empty(instance.public_ip_address()),
            state: instance
                .state()
                .and_then(|s| s.name())
                .map(|n| n.as_str().to_string()),
            subnet_id: non_empty(instance.subnet_id()),
            vpc_id: non_empty(instance.vpc_id()),
            tags: instance
                .tags()
                .iter()
                .filter_map(|t| {
                    Some(TagPair {
                        key: t.key()?.to_string(),
                        value: t.value().unwrap_or_default().to_string(),
                    })
                })
                .collect(),
        }
    }

    /// Values of all tags with the given key (keys are not unique).
    pub fn tag_values(&self, key: &str) -> Vec<&str> {
        self.tags
            .iter()
            .filter(|t| t.key == key)
            .map(|t| t.value.as_str())
            .collect()
    }

    /// The instance name from its `Name` tag, or an empty string when the
    /// tag is absent or appears more than once.
    pub fn name(&self) -> String {
        let names = self.tag_values("Name");
        if names.len() == 1 {
            names[0].to_string()
        } else {
            String::new()
        }
    }

    /// Whether the instance is reachable or about to be: running or pending.
    pub fn is_active(&self) -> bool {
        matches!(
            self.state.as_deref(),
            Some(states::RUNNING) | Some(states::PENDING)
        )
    }
}

/// A lightweight reference to an instance by ID. Attributes are fetched on
/// demand; the handle itself holds no remote state.
#[derive(Clone)]
pub struct InstanceHandle {
    id: String,
    client: Ec2Client,
}

impl InstanceHandle {
    pub fn new(client: &Ec2Client, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            client: client.clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Fetch the current view of this instance.
    pub async fn detail(&self) -> Result<InstanceDetail> {
        let response = self
            .client
            .describe_instances()
            .instance_ids(&self.id)
            .send()
            .await
            .map_err(|err| {
                let service_err = err.into_service_error();
                if service_err
                    .code()
                    .is_some_and(|c| c.starts_with("InvalidInstanceID"))
                {
                    Ec2ToolsError::InstanceNotFound(self.id.clone())
                } else {
                    Ec2ToolsError::ec2(service_err)
                }
            })?;

        response
            .reservations()
            .iter()
            .flat_map(|r| r.instances())
            .next()
            .map(InstanceDetail::from_sdk)
            .ok_or_else(|| Ec2ToolsError::InstanceNotFound(self.id.clone()))
    }

    /// Fetch only the current lifecycle state.
    pub async fn state(&self) -> Result<String> {
        let detail = self.detail().await?;
        detail
            .state
            .ok_or_else(|| Ec2ToolsError::Ec2(format!("No state reported for {}", self.id)))
    }

    pub async fn start(&self) -> Result<()> {
        debug!(instance_id = %self.id, "Starting instance");
        self.client
            .start_instances()
            .instance_ids(&self.id)
            .send()
            .await
            .map_err(Ec2ToolsError::ec2)?;
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        debug!(instance_id = %self.id, "Stopping instance");
        self.client
            .stop_instances()
            .instance_ids(&self.id)
            .send()
            .await
            .map_err(Ec2ToolsError::ec2)?;
        Ok(())
    }

    pub async fn terminate(&self) -> Result<()> {
        debug!(instance_id = %self.id, "Terminating instance");
        self.client
            .terminate_instances()
            .instance_ids(&self.id)
            .send()
            .await
            .map_err(Ec2ToolsError::ec2)?;
        Ok(())
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.is_empty()).map(|s| s.to_string())
}
