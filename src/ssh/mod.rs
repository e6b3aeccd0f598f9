//! Keep SSH client configuration in sync with live instance data.

mod config_file;

pub use config_file::SshConfigFile;

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use crate::aws::describe::ImageDetail;
use crate::aws::instance::InstanceDetail;
use crate::{Ec2ToolsError, Result};

/// One `Host` stanza: alias, hostname, optional login user and identity file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEntry {
    pub alias: String,
    pub hostname: String,
    pub user: Option<String>,
    pub identity_file: Option<PathBuf>,
}

/// Ordered (image pattern, login username) table. Patterns are matched
/// against the start of the image description, then the image name.
pub struct UsernamePatterns {
    entries: Vec<(Regex, String)>,
}

impl UsernamePatterns {
    pub fn from_table(table: &[(String, String)]) -> Result<Self> {
        let entries = table
            .iter()
            .map(|(pattern, username)| {
                Regex::new(pattern)
                    .map(|re| (re, username.clone()))
                    .map_err(|e| {
                        Ec2ToolsError::Config(format!("Invalid username pattern '{pattern}': {e}"))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { entries })
    }

    /// Infer the login username for an image, or None when nothing matches.
    pub fn username_for(&self, image: &ImageDetail) -> Option<String> {
        image
            .description
            .as_deref()
            .and_then(|text| self.username_for_text(text))
            .or_else(|| {
                image
                    .name
                    .as_deref()
                    .and_then(|text| self.username_for_text(text))
            })
    }

    fn username_for_text(&self, text: &str) -> Option<String> {
        self.entries
            .iter()
            .find(|(re, _)| re.find(text).is_some_and(|m| m.start() == 0))
            .map(|(_, username)| username.clone())
    }
}

/// The alias under which an instance appears in the config: its name, or its
/// public IP when the name is empty or contains whitespace (SSH host aliases
/// cannot contain spaces). None when neither is available.
pub fn host_alias(detail: &InstanceDetail) -> Option<String> {
    let name = detail.name();
    if !name.is_empty() && !name.contains(char::is_whitespace) {
        return Some(name);
    }
    detail.public_ip_address.clone()
}

/// The stanza to insert for an instance, or None when it has no usable
/// alias or address.
pub fn host_entry(
    detail: &InstanceDetail,
    image: Option<&ImageDetail>,
    pem_dir: &Path,
    patterns: &UsernamePatterns,
) -> Option<HostEntry> {
    let alias = host_alias(detail)?;
    let hostname = detail
        .public_dns_name
        .clone()
        .or_else(|| detail.public_ip_address.clone())?;

    Some(HostEntry {
        alias,
        hostname,
        user: image.and_then(|i| patterns.username_for(i)),
        identity_file: detail
            .key_name
            .as_ref()
            .map(|key| pem_dir.join(format!("{key}.pem"))),
    })
}

/// Apply the host entries for the given instances to a parsed config.
///
/// Every instance's stale stanza is removed; a fresh stanza is inserted only
/// for running or pending instances, so stopped and terminated machines drop
/// out of the config instead of keeping a dead address.
pub fn apply_host_entries(
    config: &mut SshConfigFile,
    instances: &[(InstanceDetail, Option<ImageDetail>)],
    pem_dir: &Path,
    patterns: &UsernamePatterns,
) {
    for (detail, image) in instances {
        let Some(alias) = host_alias(detail) else {
            debug!(instance_id = %detail.instance_id, "No usable host alias; skipping");
            continue;
        };

        config.remove_host(&alias);

        if !detail.is_active() {
            debug!(instance_id = %detail.instance_id, alias = %alias, "Instance not running; entry dropped");
            continue;
        }

        if let Some(entry) = host_entry(detail, image.as_ref(), pem_dir, patterns) {
            config.add_host(&entry);
        }
    }
}

/// Update an SSH config file to reflect the given instances.
///
/// Reads `config_path` (a missing file is an error), applies the entries and
/// writes the result to `new_config_path`, or back in place when no target
/// is given. Running twice with unchanged instance data writes a
/// byte-identical file.
pub fn update_ssh_config(
    config_path: &Path,
    instances: &[(InstanceDetail, Option<ImageDetail>)],
    pem_dir: &Path,
    new_config_path: Option<&Path>,
    patterns: &UsernamePatterns,
) -> Result<()> {
    let mut config = SshConfigFile::load(config_path)?;
    apply_host_entries(&mut config, instances, pem_dir, patterns);
    config.write(new_config_path.unwrap_or(config_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::instance::{states, TagPair};

    fn detail(id: &str, name: &str, state: &str) -> InstanceDetail {
        InstanceDetail {
            instance_id: id.to_string(),
            image_id: Some("ami-1".to_string()),
            instance_type: Some("t2.micro".to_string()),
            key_name: Some("main".to_string()),
            launch_time: None,
            architecture: None,
            private_dns_name: None,
            private_ip_address: None,
            public_dns_name: Some(format!("{id}.compute.amazonaws.com")),
            public_ip_address: Some("203.0.113.7".to_string()),
            state: Some(state.to_string()),
            subnet_id: None,
            vpc_id: None,
            tags: if name.is_empty() {
                vec![]
            } else {
                vec![TagPair {
                    key: "Name".to_string(),
                    value: name.to_string(),
                }]
            },
        }
    }

    fn amazon_linux_image() -> ImageDetail {
        ImageDetail {
            image_id: "ami-1".to_string(),
            name: Some("amzn2-ami-hvm-x86_64".to_string()),
            description: Some("Amazon Linux 2 AMI".to_string()),
            state: Some("available".to_string()),
            architecture: None,
            owner_id: None,
            creation_date: None,
        }
    }

    fn patterns() -> UsernamePatterns {
        UsernamePatterns::from_table(&[("^Amazon Linux.*".to_string(), "ec2-user".to_string())])
            .unwrap()
    }

    #[test]
    fn test_username_matches_description_prefix() {
        let username = patterns().username_for(&amazon_linux_image());
        assert_eq!(username.as_deref(), Some("ec2-user"));
    }

    #[test]
    fn test_username_falls_back_to_image_name() {
        let mut image = amazon_linux_image();
        image.description = Some("A custom build".to_string());
        image.name = Some("Amazon Linux spin".to_string());
        assert_eq!(patterns().username_for(&image).as_deref(), Some("ec2-user"));
    }

    #[test]
    fn test_username_requires_match_at_start() {
        let mut image = amazon_linux_image();
        image.description = Some("Based on Amazon Linux".to_string());
        image.name = None;
        assert_eq!(patterns().username_for(&image), None);
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err =
            UsernamePatterns::from_table(&[("(".to_string(), "x".to_string())]).unwrap_err();
        assert!(matches!(err, Ec2ToolsError::Config(_)));
    }

    #[test]
    fn test_alias_prefers_name() {
        assert_eq!(
            host_alias(&detail("i-1", "web", states::RUNNING)).as_deref(),
            Some("web")
        );
    }

    #[test]
    fn test_alias_falls_back_to_public_ip_for_empty_or_spaced_names() {
        assert_eq!(
            host_alias(&detail("i-1", "", states::RUNNING)).as_deref(),
            Some("203.0.113.7")
        );
        assert_eq!(
            host_alias(&detail("i-1", "my server", states::RUNNING)).as_deref(),
            Some("203.0.113.7")
        );
    }

    #[test]
    fn test_host_entry_fields() {
        let image = amazon_linux_image();
        let entry = host_entry(
            &detail("i-1", "web", states::RUNNING),
            Some(&image),
            Path::new("/keys"),
            &patterns(),
        )
        .unwrap();

        assert_eq!(entry.alias, "web");
        assert_eq!(entry.hostname, "i-1.compute.amazonaws.com");
        assert_eq!(entry.user.as_deref(), Some("ec2-user"));
        assert_eq!(entry.identity_file.as_deref(), Some(Path::new("/keys/main.pem")));
    }

    #[test]
    fn test_update_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config");
        std::fs::write(&config_path, "Host bastion\n  HostName b.example.com\n").unwrap();

        let instances = vec![(detail("i-1", "web", states::RUNNING), Some(amazon_linux_image()))];

        update_ssh_config(&config_path, &instances, Path::new("/keys"), None, &patterns())
            .unwrap();
        let first = std::fs::read(&config_path).unwrap();

        update_ssh_config(&config_path, &instances, Path::new("/keys"), None, &patterns())
            .unwrap();
        let second = std::fs::read(&config_path).unwrap();

        assert_eq!(first, second);
        let rendered = String::from_utf8(second).unwrap();
        assert!(rendered.contains("Host bastion"));
        assert!(rendered.contains("Host web"));
    }

    #[test]
    fn test_stopped_instance_entry_removed_and_not_reinserted() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config");
        std::fs::write(
            &config_path,
            "Host web\n  HostName stale.example.com\n\nHost bastion\n  HostName b.example.com\n",
        )
        .unwrap();

        let instances = vec![(detail("i-1", "web", states::STOPPED), Some(amazon_linux_image()))];

        update_ssh_config(&config_path, &instances, Path::new("/keys"), None, &patterns())
            .unwrap();

        let rendered = std::fs::read_to_string(&config_path).unwrap();
        assert!(!rendered.contains("Host web"));
        assert!(!rendered.contains("stale.example.com"));
        assert!(rendered.contains("Host bastion"));
    }

    #[test]
    fn test_terminated_instance_entry_not_inserted() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config");
        std::fs::write(&config_path, "").unwrap();

        let instances = vec![(
            detail("i-1", "web", states::TERMINATED),
            Some(amazon_linux_image()),
        )];

        update_ssh_config(&config_path, &instances, Path::new("/keys"), None, &patterns())
            .unwrap();

        assert_eq!(std::fs::read_to_string(&config_path).unwrap(), "");
    }

    #[test]
    fn test_missing_source_config_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = update_ssh_config(
            &dir.path().join("missing"),
            &[],
            Path::new("/keys"),
            None,
            &patterns(),
        )
        .unwrap_err();
        assert!(matches!(err, Ec2ToolsError::SshConfigNotFound(_)));
    }

    #[test]
    fn test_writes_to_alternate_target_path() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("config");
        let target = dir.path().join("config.new");
        std::fs::write(&source, "Host bastion\n  HostName b.example.com\n").unwrap();

        let instances = vec![(detail("i-1", "web", states::RUNNING), Some(amazon_linux_image()))];
        update_ssh_config(&source, &instances, Path::new("/keys"), Some(&target), &patterns())
            .unwrap();

        // Source untouched, target has both stanzas.
        assert_eq!(
            std::fs::read_to_string(&source).unwrap(),
            "Host bastion\n  HostName b.example.com\n"
        );
        let rendered = std::fs::read_to_string(&target).unwrap();
        assert!(rendered.contains("Host bastion"));
        assert!(rendered.contains("Host web"));
    }
}
