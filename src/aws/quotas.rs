//! Service-quota lookups.

use aws_sdk_servicequotas::Client as QuotasClient;
use serde::{Deserialize, Serialize};

use crate::{Ec2ToolsError, Result};

/// Service code for EC2 quotas (running instances, spot limits, ...).
pub const EC2_SERVICE_CODE: &str = "ec2";

/// A provider-imposed numeric ceiling on one resource category. Read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaInfo {
    pub quota_name: String,
    pub quota_code: String,
    pub service_code: String,
    pub value: Option<f64>,
}

/// List every quota for a service (paginated).
pub async fn list_service_quotas(
    client: &QuotasClient,
    service_code: &str,
) -> Result<Vec<QuotaInfo>> {
    let quotas: Vec<_> = client
        .list_service_quotas()
        .service_code(service_code)
        .into_paginator()
        .items()
        .send()
        .collect::<std::result::Result<Vec<_>, _>>()
        .await
        .map_err(Ec2ToolsError::service_quotas)?;

    Ok(quotas
        .iter()
        .map(|q| QuotaInfo {
            quota_name: q.quota_name().unwrap_or_default().to_string(),
            quota_code: q.quota_code().unwrap_or_default().to_string(),
            service_code: q.service_code().unwrap_or_default().to_string(),
            value: q.value(),
        })
        .collect())
}

/// Look up one quota by name or by code (exactly one of the two).
///
/// Supplying both, or neither, is rejected before any remote call. A lookup
/// miss fails with a not-found error enumerating every valid quota name for
/// the service.
pub async fn get_service_quota(
    client: &QuotasClient,
    service_code: &str,
    quota_name: Option<&str>,
    quota_code: Option<&str>,
) -> Result<QuotaInfo> {
    validate_quota_query(quota_name, quota_code)?;

    let quotas = list_service_quotas(client, service_code).await?;
    select_quota(&quotas, quota_name, quota_code)
}

fn validate_quota_query(quota_name: Option<&str>, quota_code: Option<&str>) -> Result<()> {
    match (quota_name, quota_code) {
        (Some(_), Some(_)) => Err(Ec2ToolsError::AmbiguousArguments(
            "specify either a quota name or a quota code, not both".to_string(),
        )),
        (None, None) => Err(Ec2ToolsError::AmbiguousArguments(
            "a quota name or a quota code is required".to_string(),
        )),
        _ => Ok(()),
    }
}

fn select_quota(
    quotas: &[QuotaInfo],
    quota_name: Option<&str>,
    quota_code: Option<&str>,
) -> Result<QuotaInfo> {
    let found = quotas.iter().find(|q| match (quota_name, quota_code) {
        (Some(name), _) => q.quota_name == name,
        (_, Some(code)) => q.quota_code == code,
        _ => false,
    });

    found.cloned().ok_or_else(|| {
        let mut valid: Vec<String> = quotas.iter().map(|q| q.quota_name.clone()).collect();
        valid.sort();
        Ec2ToolsError::QuotaNotFound {
            requested: quota_name
                .or(quota_code)
                .unwrap_or_default()
                .to_string(),
            valid,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quota(name: &str, code: &str, value: f64) -> QuotaInfo {
        QuotaInfo {
            quota_name: name.to_string(),
            quota_code: code.to_string(),
            service_code: EC2_SERVICE_CODE.to_string(),
            value: Some(value),
        }
    }

    #[test]
    fn test_name_and_code_together_is_ambiguous() {
        let err = validate_quota_query(Some("Running On-Demand"), Some("L-1216C47A")).unwrap_err();
        assert!(matches!(err, Ec2ToolsError::AmbiguousArguments(_)));
    }

    #[test]
    fn test_neither_name_nor_code_is_ambiguous() {
        assert!(matches!(
            validate_quota_query(None, None).unwrap_err(),
            Ec2ToolsError::AmbiguousArguments(_)
        ));
    }

    #[test]
    fn test_select_by_name() {
        let quotas = vec![quota("Running instances", "L-1", 64.0), quota("Spot", "L-2", 8.0)];
        let found = select_quota(&quotas, Some("Spot"), None).unwrap();
        assert_eq!(found.quota_code, "L-2");
    }

    #[test]
    fn test_select_by_code() {
        let quotas = vec![quota("Running instances", "L-1", 64.0)];
        let found = select_quota(&quotas, None, Some("L-1")).unwrap();
        assert_eq!(found.quota_name, "Running instances");
    }

    #[test]
    fn test_miss_enumerates_valid_names() {
        let quotas = vec![quota("Spot", "L-2", 8.0), quota("Running instances", "L-1", 64.0)];
        let err = select_quota(&quotas, Some("Nope"), None).unwrap_err();
        match err {
            Ec2ToolsError::QuotaNotFound { requested, valid } => {
                assert_eq!(requested, "Nope");
                assert_eq!(valid, vec!["Running instances".to_string(), "Spot".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        // The rendered message carries the alternatives for interactive use.
        let err = select_quota(&quotas, Some("Nope"), None).unwrap_err();
        assert!(err.to_string().contains("Running instances"));
    }
}
