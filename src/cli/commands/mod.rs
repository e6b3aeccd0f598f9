pub mod list;
pub mod start;
pub mod stop;
pub mod terminate;

use std::collections::HashMap;

use aws_sdk_ec2::Client as Ec2Client;

use crate::aws::client::AwsClients;
use crate::aws::describe::{fetch_images, fetch_instances, find_instance_details, ImageDetail};
use crate::aws::filters::Filters;
use crate::aws::instance::InstanceDetail;
use crate::cli::prompt::Prompt;
use crate::config::Settings;
use crate::ssh::{self, UsernamePatterns};
use crate::Result;

fn table_line(
    row: &str,
    instance_id: &str,
    name: &str,
    image_id: &str,
    image_name: &str,
    state: &str,
) -> String {
    let image_name: String = image_name.chars().take(30).collect();
    format!("{row:<3} {instance_id:<22}  {name:<20}  {image_id:<22}  {image_name:<30}  {state:<10}")
}

/// Print the numbered instance table: row index, ID, name, image ID, image
/// name (truncated to 30 chars) and state.
pub(crate) fn print_instances(details: &[InstanceDetail], images: &HashMap<String, ImageDetail>) {
    let header = table_line("", "ID", "Name", "Image ID", "Image Name", "State");
    println!("{header}");
    println!("{}", "-".repeat(header.len()));

    for (row, detail) in details.iter().enumerate() {
        let name = match detail.name() {
            name if name.is_empty() => "(unnamed)".to_string(),
            name => name,
        };
        let image_id = detail.image_id.as_deref().unwrap_or("");
        let image_name = detail
            .image_id
            .as_deref()
            .and_then(|id| images.get(id))
            .and_then(|image| image.name.as_deref())
            .unwrap_or("");
        let state = detail.state.as_deref().unwrap_or("");

        println!(
            "{}",
            table_line(
                &row.to_string(),
                &detail.instance_id,
                &name,
                image_id,
                image_name,
                state,
            )
        );
    }
}

/// Batch-fetch the images referenced by the given instances, keyed by image
/// ID. Deregistered images simply don't appear.
pub(crate) async fn image_map(
    client: &Ec2Client,
    details: &[InstanceDetail],
) -> Result<HashMap<String, ImageDetail>> {
    let mut ids: Vec<String> = details.iter().filter_map(|d| d.image_id.clone()).collect();
    ids.sort();
    ids.dedup();

    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let filters = Filters::new().push("image_id", ids);
    let images = fetch_images(client, None, None, None, Some(&filters)).await?;
    Ok(images.into_iter().map(|i| (i.image_id.clone(), i)).collect())
}

pub(crate) enum IndexSelection {
    Row(usize),
    OutOfRange,
    NotANumber,
}

/// Parse an interactive row selection against the printed table.
///
/// Keeps the historical bound `idx > 0 && idx < len`: row 0 is printed but
/// never selectable. The tests pin this down; see DESIGN.md before changing
/// the lower bound.
pub(crate) fn select_index(input: &str, len: usize) -> IndexSelection {
    let Ok(idx) = input.trim().parse::<i64>() else {
        return IndexSelection::NotANumber;
    };

    if idx > 0 && (idx as usize) < len {
        IndexSelection::Row(idx as usize)
    } else {
        IndexSelection::OutOfRange
    }
}

/// Reduce a printed list to the selected instance. Non-numeric input is
/// reported on the spot and yields an empty selection rather than an error.
pub(crate) fn pick_by_index(all: &[InstanceDetail], input: &str) -> Vec<InstanceDetail> {
    match select_index(input, all.len()) {
        IndexSelection::Row(idx) => vec![all[idx].clone()],
        IndexSelection::OutOfRange => Vec::new(),
        IndexSelection::NotANumber => {
            println!("Index should be a number from 0 to {}", all.len().saturating_sub(1));
            Vec::new()
        }
    }
}

/// Shared instance-resolution policy for start/stop/terminate: a pattern is
/// looked up by tag name first, then as a literal ID; without a pattern the
/// instance table is printed and one row is picked interactively.
pub(crate) async fn resolve_instances(
    client: &Ec2Client,
    pattern: Option<&str>,
    prompt: &dyn Prompt,
) -> Result<Vec<InstanceDetail>> {
    if pattern.is_some() {
        return find_instance_details(client, pattern).await;
    }

    let all = find_instance_details(client, None).await?;
    if all.is_empty() {
        return Ok(Vec::new());
    }

    let images = image_map(client, &all).await?;
    print_instances(&all, &images);
    println!("Select instance number from list (0 to {}):", all.len() - 1);

    let input = prompt.read_line("Instance number")?;
    Ok(pick_by_index(&all, &input))
}

/// Re-fetch the given instances and synchronize the configured SSH config
/// file with their current addresses.
pub(crate) async fn sync_ssh_config(
    clients: &AwsClients,
    instance_ids: &[String],
    settings: &Settings,
) -> Result<()> {
    let ids = instance_ids.to_vec();
    let details = fetch_instances(&clients.ec2, Some(&ids), None).await?;
    let images = image_map(&clients.ec2, &details).await?;

    let instances: Vec<(InstanceDetail, Option<ImageDetail>)> = details
        .into_iter()
        .map(|detail| {
            let image = detail
                .image_id
                .as_deref()
                .and_then(|id| images.get(id))
                .cloned();
            (detail, image)
        })
        .collect();

    let patterns = UsernamePatterns::from_table(&settings.username_patterns)?;
    ssh::update_ssh_config(
        &settings.ssh_config_path,
        &instances,
        &settings.pem_dir,
        None,
        &patterns,
    )?;

    println!("Updated {}", settings.ssh_config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::instance::{states, TagPair};

    fn detail(id: &str, name: &str) -> InstanceDetail {
        InstanceDetail {
            instance_id: id.to_string(),
            image_id: None,
            instance_type: None,
            key_name: None,
            launch_time: None,
            architecture: None,
            private_dns_name: None,
            private_ip_address: None,
            public_dns_name: None,
            public_ip_address: None,
            state: Some(states::STOPPED.to_string()),
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

    #[test]
    fn test_index_one_selects_second_row() {
        let all = vec![detail("i-1", "web"), detail("i-2", "")];
        let picked = pick_by_index(&all, "1");
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].instance_id, "i-2");
    }

    #[test]
    fn test_index_zero_is_rejected() {
        // Historical bound: row 0 is printed but never selectable.
        let all = vec![detail("i-1", "web"), detail("i-2", "")];
        assert!(pick_by_index(&all, "0").is_empty());
    }

    #[test]
    fn test_out_of_range_and_negative_indices_yield_empty_selection() {
        let all = vec![detail("i-1", "web"), detail("i-2", "")];
        assert!(pick_by_index(&all, "2").is_empty());
        assert!(pick_by_index(&all, "-1").is_empty());
    }

    #[test]
    fn test_non_numeric_input_yields_empty_selection() {
        let all = vec![detail("i-1", "web"), detail("i-2", "")];
        assert!(pick_by_index(&all, "abc").is_empty());
        assert!(pick_by_index(&all, "").is_empty());
    }

    #[test]
    fn test_whitespace_around_index_is_accepted() {
        let all = vec![detail("i-1", "web"), detail("i-2", "")];
        assert_eq!(pick_by_index(&all, " 1 ")[0].instance_id, "i-2");
    }

    #[test]
    fn test_table_line_truncates_image_name() {
        let line = table_line(
            "0",
            "i-1",
            "web",
            "ami-1",
            "a-very-long-image-name-that-goes-on-and-on",
            "running",
        );
        assert!(line.contains("a-very-long-image-name-that-go"));
        assert!(!line.contains("that-goes-on"));
    }
}
