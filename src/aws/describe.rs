//! User-friendly wrappers around the EC2 describe calls.
//!
//! Each resource category gets a `describe_*` operation returning the raw
//! records (after the response envelope is unwrapped) narrowed by a JMESPath
//! expression, and a `get_*` operation returning one lazily-bound handle per
//! matching ID. Valid filter names are the ones the corresponding
//! `aws ec2 describe-*` command documents for its `--filters` option.

use aws_sdk_ec2::error::ProvideErrorMetadata;
use aws_sdk_ec2::types::{Filter, InstanceType};
use aws_sdk_ec2::Client as Ec2Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::aws::filters::Filters;
use crate::aws::instance::{InstanceDetail, InstanceHandle, TagPair};
use crate::query;
use crate::{Ec2ToolsError, Result};

/// Identity path: every record in the unwrapped response.
pub const ALL: &str = "[*]";

fn build_filters(filters: Option<&Filters>) -> Result<Option<Vec<Filter>>> {
    filters
        .filter(|f| !f.is_empty())
        .map(Filters::build)
        .transpose()
}

fn sdk_tags(tags: &[aws_sdk_ec2::types::Tag]) -> Vec<TagPair> {
    tags.iter()
        .filter_map(|t| {
            Some(TagPair {
                key: t.key()?.to_string(),
                value: t.value().unwrap_or_default().to_string(),
            })
        })
        .collect()
}

fn select<T: Serialize>(records: Vec<T>, path: &str) -> Result<Value> {
    query::search(&serde_json::to_value(records)?, path)
}

fn ids_from(selected: Value, expr: &str) -> Result<Vec<String>> {
    let mut ids: Vec<String> = serde_json::from_value(selected).map_err(|e| {
        Ec2ToolsError::Query(format!("expression '{}' did not select IDs: {}", expr, e))
    })?;
    ids.retain(|id| !id.is_empty());
    Ok(ids)
}

// ---------------------------------------------------------------------------
// Tags

/// One entry of the account's tag index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagDetail {
    pub resource_id: String,
    pub resource_type: Option<String>,
    pub key: String,
    pub value: String,
}

pub async fn describe_tags(
    client: &Ec2Client,
    path: &str,
    filters: Option<&Filters>,
) -> Result<Value> {
    let response = client
        .describe_tags()
        .set_filters(build_filters(filters)?)
        .send()
        .await
        .map_err(Ec2ToolsError::ec2)?;

    let records: Vec<TagDetail> = response
        .tags()
        .iter()
        .map(|t| TagDetail {
            resource_id: t.resource_id().unwrap_or_default().to_string(),
            resource_type: t.resource_type().map(|r| r.as_str().to_string()),
            key: t.key().unwrap_or_default().to_string(),
            value: t.value().unwrap_or_default().to_string(),
        })
        .collect();

    select(records, path)
}

// ---------------------------------------------------------------------------
// Instances

pub(crate) async fn fetch_instances(
    client: &Ec2Client,
    instance_ids: Option<&[String]>,
    filters: Option<&Filters>,
) -> Result<Vec<InstanceDetail>> {
    let response = client
        .describe_instances()
        .set_instance_ids(instance_ids.map(<[String]>::to_vec))
        .set_filters(build_filters(filters)?)
        .send()
        .await
        .map_err(Ec2ToolsError::ec2)?;

    let details: Vec<InstanceDetail> = response
        .reservations()
        .iter()
        .flat_map(|r| r.instances())
        .map(InstanceDetail::from_sdk)
        .collect();

    debug!(count = details.len(), "Described instances");
    Ok(details)
}

pub async fn describe_instances(
    client: &Ec2Client,
    instance_ids: Option<&[String]>,
    path: &str,
    filters: Option<&Filters>,
) -> Result<Value> {
    select(fetch_instances(client, instance_ids, filters).await?, path)
}

pub async fn get_instances(
    client: &Ec2Client,
    instance_ids: Option<&[String]>,
    filters: Option<&Filters>,
) -> Result<Vec<InstanceHandle>> {
    let expr = "[*].instance_id";
    let selected = describe_instances(client, instance_ids, expr, filters).await?;
    Ok(ids_from(selected, expr)?
        .into_iter()
        .map(|id| InstanceHandle::new(client, id))
        .collect())
}

/// Shared instance lookup policy: a pattern is first matched against the
/// `Name` tag index (wildcards are applied server-side); only when nothing
/// matches is it retried as a literal instance-id filter. A pattern matching
/// neither yields an empty vec, never an error. Without a pattern, all
/// instances are returned.
pub async fn find_instance_details(
    client: &Ec2Client,
    pattern: Option<&str>,
) -> Result<Vec<InstanceDetail>> {
    let Some(pattern) = pattern else {
        return fetch_instances(client, None, None).await;
    };

    let tag_filters = Filters::new()
        .push("resource_type", "instance")
        .push("key", "Name")
        .push("value", pattern);
    let expr = "[*].resource_id";
    let mut ids = ids_from(
        describe_tags(client, expr, Some(&tag_filters)).await?,
        expr,
    )?;
    ids.sort();
    ids.dedup();

    if ids.is_empty() {
        // The instance-id filter form returns an empty set for an unknown
        // ID, where the InstanceIds request parameter would error out.
        let id_filters = Filters::new().push("instance_id", pattern);
        return fetch_instances(client, None, Some(&id_filters)).await;
    }

    fetch_instances(client, Some(&ids), None).await
}

pub async fn find_instances(
    client: &Ec2Client,
    pattern: Option<&str>,
) -> Result<Vec<InstanceHandle>> {
    Ok(find_instance_details(client, pattern)
        .await?
        .into_iter()
        .map(|d| InstanceHandle::new(client, d.instance_id))
        .collect())
}

// ---------------------------------------------------------------------------
// Volumes

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeDetail {
    pub volume_id: String,
    pub size_gib: Option<i32>,
    pub state: Option<String>,
    pub volume_type: Option<String>,
    pub availability_zone: Option<String>,
    pub attached_instance_ids: Vec<String>,
    pub tags: Vec<TagPair>,
}

#[derive(Clone)]
pub struct VolumeHandle {
    id: String,
    client: Ec2Client,
}

impl VolumeHandle {
    pub fn new(client: &Ec2Client, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            client: client.clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn detail(&self) -> Result<VolumeDetail> {
        let ids = vec![self.id.clone()];
        fetch_volumes(&self.client, Some(&ids), None)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Ec2ToolsError::ResourceNotFound(self.id.clone()))
    }
}

async fn fetch_volumes(
    client: &Ec2Client,
    volume_ids: Option<&[String]>,
    filters: Option<&Filters>,
) -> Result<Vec<VolumeDetail>> {
    let response = client
        .describe_volumes()
        .set_volume_ids(volume_ids.map(<[String]>::to_vec))
        .set_filters(build_filters(filters)?)
        .send()
        .await
        .map_err(Ec2ToolsError::ec2)?;

    Ok(response
        .volumes()
        .iter()
        .map(|v| VolumeDetail {
            volume_id: v.volume_id().unwrap_or_default().to_string(),
            size_gib: v.size(),
            state: v.state().map(|s| s.as_str().to_string()),
            volume_type: v.volume_type().map(|t| t.as_str().to_string()),
            availability_zone: v.availability_zone().map(String::from),
            attached_instance_ids: v
                .attachments()
                .iter()
                .filter_map(|a| a.instance_id().map(String::from))
                .collect(),
            tags: sdk_tags(v.tags()),
        })
        .collect())
}

pub async fn describe_volumes(
    client: &Ec2Client,
    volume_ids: Option<&[String]>,
    path: &str,
    filters: Option<&Filters>,
) -> Result<Value> {
    select(fetch_volumes(client, volume_ids, filters).await?, path)
}

pub async fn get_volumes(
    client: &Ec2Client,
    volume_ids: Option<&[String]>,
    filters: Option<&Filters>,
) -> Result<Vec<VolumeHandle>> {
    let expr = "[*].volume_id";
    let selected = describe_volumes(client, volume_ids, expr, filters).await?;
    Ok(ids_from(selected, expr)?
        .into_iter()
        .map(|id| VolumeHandle::new(client, id))
        .collect())
}

// ---------------------------------------------------------------------------
// Key pairs

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyPairDetail {
    pub key_pair_id: String,
    pub key_name: Option<String>,
    pub key_fingerprint: Option<String>,
    pub tags: Vec<TagPair>,
}

#[derive(Clone)]
pub struct KeyPairHandle {
    id: String,
    client: Ec2Client,
}

impl KeyPairHandle {
    pub fn new(client: &Ec2Client, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            client: client.clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn detail(&self) -> Result<KeyPairDetail> {
        let ids = vec![self.id.clone()];
        fetch_key_pairs(&self.client, Some(&ids), None)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Ec2ToolsError::ResourceNotFound(self.id.clone()))
    }
}

async fn fetch_key_pairs(
    client: &Ec2Client,
    key_pair_ids: Option<&[String]>,
    filters: Option<&Filters>,
) -> Result<Vec<KeyPairDetail>> {
    let response = client
        .describe_key_pairs()
        .set_key_pair_ids(key_pair_ids.map(<[String]>::to_vec))
        .set_filters(build_filters(filters)?)
        .send()
        .await
        .map_err(Ec2ToolsError::ec2)?;

    Ok(response
        .key_pairs()
        .iter()
        .map(|k| KeyPairDetail {
            key_pair_id: k.key_pair_id().unwrap_or_default().to_string(),
            key_name: k.key_name().map(String::from),
            key_fingerprint: k.key_fingerprint().map(String::from),
            tags: sdk_tags(k.tags()),
        })
        .collect())
}

pub async fn describe_key_pairs(
    client: &Ec2Client,
    key_pair_ids: Option<&[String]>,
    path: &str,
    filters: Option<&Filters>,
) -> Result<Value> {
    select(fetch_key_pairs(client, key_pair_ids, filters).await?, path)
}

pub async fn get_key_pairs(
    client: &Ec2Client,
    key_pair_ids: Option<&[String]>,
    filters: Option<&Filters>,
) -> Result<Vec<KeyPairHandle>> {
    let expr = "[*].key_pair_id";
    let selected = describe_key_pairs(client, key_pair_ids, expr, filters).await?;
    Ok(ids_from(selected, expr)?
        .into_iter()
        .map(|id| KeyPairHandle::new(client, id))
        .collect())
}

// ---------------------------------------------------------------------------
// Security groups

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityGroupDetail {
    pub group_id: String,
    pub group_name: Option<String>,
    pub description: Option<String>,
    pub vpc_id: Option<String>,
    pub tags: Vec<TagPair>,
}

#[derive(Clone)]
pub struct SecurityGroupHandle {
    id: String,
    client: Ec2Client,
}

impl SecurityGroupHandle {
    pub fn new(client: &Ec2Client, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            client: client.clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn detail(&self) -> Result<SecurityGroupDetail> {
        let ids = vec![self.id.clone()];
        fetch_security_groups(&self.client, Some(&ids), None)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Ec2ToolsError::ResourceNotFound(self.id.clone()))
    }
}

async fn fetch_security_groups(
    client: &Ec2Client,
    group_ids: Option<&[String]>,
    filters: Option<&Filters>,
) -> Result<Vec<SecurityGroupDetail>> {
    let response = client
        .describe_security_groups()
        .set_group_ids(group_ids.map(<[String]>::to_vec))
        .set_filters(build_filters(filters)?)
        .send()
        .await
        .map_err(Ec2ToolsError::ec2)?;

    Ok(response
        .security_groups()
        .iter()
        .map(|g| SecurityGroupDetail {
            group_id: g.group_id().unwrap_or_default().to_string(),
            group_name: g.group_name().map(String::from),
            description: g.description().map(String::from),
            vpc_id: g.vpc_id().map(String::from),
            tags: sdk_tags(g.tags()),
        })
        .collect())
}

pub async fn describe_security_groups(
    client: &Ec2Client,
    group_ids: Option<&[String]>,
    path: &str,
    filters: Option<&Filters>,
) -> Result<Value> {
    select(fetch_security_groups(client, group_ids, filters).await?, path)
}

pub async fn get_security_groups(
    client: &Ec2Client,
    group_ids: Option<&[String]>,
    filters: Option<&Filters>,
) -> Result<Vec<SecurityGroupHandle>> {
    let expr = "[*].group_id";
    let selected = describe_security_groups(client, group_ids, expr, filters).await?;
    Ok(ids_from(selected, expr)?
        .into_iter()
        .map(|id| SecurityGroupHandle::new(client, id))
        .collect())
}

// ---------------------------------------------------------------------------
// Images

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageDetail {
    pub image_id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub state: Option<String>,
    pub architecture: Option<String>,
    pub owner_id: Option<String>,
    pub creation_date: Option<String>,
}

#[derive(Clone)]
pub struct ImageHandle {
    id: String,
    client: Ec2Client,
}

impl ImageHandle {
    pub fn new(client: &Ec2Client, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            client: client.clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn detail(&self) -> Result<ImageDetail> {
        let ids = vec![self.id.clone()];
        fetch_images(&self.client, Some(&ids), None, None, None)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Ec2ToolsError::ResourceNotFound(self.id.clone()))
    }
}

pub(crate) async fn fetch_images(
    client: &Ec2Client,
    image_ids: Option<&[String]>,
    owners: Option<&[String]>,
    executable_users: Option<&[String]>,
    filters: Option<&Filters>,
) -> Result<Vec<ImageDetail>> {
    let response = client
        .describe_images()
        .set_image_ids(image_ids.map(<[String]>::to_vec))
        .set_owners(owners.map(<[String]>::to_vec))
        .set_executable_users(executable_users.map(<[String]>::to_vec))
        .set_filters(build_filters(filters)?)
        .send()
        .await
        .map_err(Ec2ToolsError::ec2)?;

    Ok(response
        .images()
        .iter()
        .map(|i| ImageDetail {
            image_id: i.image_id().unwrap_or_default().to_string(),
            name: i.name().map(String::from),
            description: i.description().map(String::from),
            state: i.state().map(|s| s.as_str().to_string()),
            architecture: i.architecture().map(|a| a.as_str().to_string()),
            owner_id: i.owner_id().map(String::from),
            creation_date: i.creation_date().map(String::from),
        })
        .collect())
}

pub async fn describe_images(
    client: &Ec2Client,
    image_ids: Option<&[String]>,
    owners: Option<&[String]>,
    executable_users: Option<&[String]>,
    path: &str,
    filters: Option<&Filters>,
) -> Result<Value> {
    select(
        fetch_images(client, image_ids, owners, executable_users, filters).await?,
        path,
    )
}

pub async fn get_images(
    client: &Ec2Client,
    image_ids: Option<&[String]>,
    owners: Option<&[String]>,
    executable_users: Option<&[String]>,
    filters: Option<&Filters>,
) -> Result<Vec<ImageHandle>> {
    let expr = "[*].image_id";
    let selected =
        describe_images(client, image_ids, owners, executable_users, expr, filters).await?;
    Ok(ids_from(selected, expr)?
        .into_iter()
        .map(|id| ImageHandle::new(client, id))
        .collect())
}

// ---------------------------------------------------------------------------
// Instance types (describe-only: there is no instance-type resource handle)

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceTypeDetail {
    pub instance_type: String,
    pub default_vcpus: Option<i32>,
    pub memory_mib: Option<i64>,
    pub free_tier_eligible: Option<bool>,
    pub current_generation: Option<bool>,
    pub supported_architectures: Vec<String>,
}

fn map_instance_type(info: &aws_sdk_ec2::types::InstanceTypeInfo) -> InstanceTypeDetail {
    InstanceTypeDetail {
        instance_type: info
            .instance_type()
            .map(|t| t.as_str().to_string())
            .unwrap_or_default(),
        default_vcpus: info.v_cpu_info().and_then(|v| v.default_v_cpus()),
        memory_mib: info.memory_info().and_then(|m| m.size_in_mib()),
        free_tier_eligible: info.free_tier_eligible(),
        current_generation: info.current_generation(),
        supported_architectures: info
            .processor_info()
            .map(|p| {
                p.supported_architectures()
                    .iter()
                    .map(|a| a.as_str().to_string())
                    .collect()
            })
            .unwrap_or_default(),
    }
}

pub async fn describe_instance_types(
    client: &Ec2Client,
    instance_types: Option<&[String]>,
    path: &str,
    filters: Option<&Filters>,
) -> Result<Value> {
    let response = client
        .describe_instance_types()
        .set_instance_types(
            instance_types.map(|names| names.iter().map(|n| InstanceType::from(n.as_str())).collect()),
        )
        .set_filters(build_filters(filters)?)
        .send()
        .await
        .map_err(Ec2ToolsError::ec2)?;

    let records: Vec<InstanceTypeDetail> = response
        .instance_types()
        .iter()
        .map(map_instance_type)
        .collect();

    select(records, path)
}

/// Look up a single instance type by name. An unknown name fails with a
/// not-found error that enumerates the instance types offered in the
/// configured region.
pub async fn lookup_instance_type(client: &Ec2Client, name: &str) -> Result<InstanceTypeDetail> {
    let response = client
        .describe_instance_types()
        .instance_types(InstanceType::from(name))
        .send()
        .await;

    match response {
        Ok(output) => match output.instance_types().first() {
            Some(info) => Ok(map_instance_type(info)),
            None => not_found_instance_type(client, name).await,
        },
        Err(err) => {
            let service_err = err.into_service_error();
            if service_err
                .code()
                .is_some_and(|c| c.starts_with("InvalidInstanceType"))
            {
                not_found_instance_type(client, name).await
            } else {
                Err(Ec2ToolsError::ec2(service_err))
            }
        }
    }
}

async fn not_found_instance_type(client: &Ec2Client, name: &str) -> Result<InstanceTypeDetail> {
    Err(Ec2ToolsError::InstanceTypeNotFound {
        requested: name.to_string(),
        valid: offered_instance_types(client).await?,
    })
}

/// All instance type names offered in the configured region, sorted.
pub async fn offered_instance_types(client: &Ec2Client) -> Result<Vec<String>> {
    let offerings: Vec<_> = client
        .describe_instance_type_offerings()
        .into_paginator()
        .items()
        .send()
        .collect::<std::result::Result<Vec<_>, _>>()
        .await
        .map_err(Ec2ToolsError::ec2)?;

    let mut names: Vec<String> = offerings
        .iter()
        .filter_map(|o| o.instance_type().map(|t| t.as_str().to_string()))
        .collect();
    names.sort();
    names.dedup();
    Ok(names)
}
