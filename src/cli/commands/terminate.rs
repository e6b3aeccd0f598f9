use crate::aws::client::AwsClients;
use crate::aws::instance::InstanceHandle;
use crate::cli::commands::{resolve_instances, sync_ssh_config};
use crate::cli::prompt::Prompt;
use crate::config::Settings;
use crate::{Ec2ToolsError, Result};

pub async fn execute(
    clients: &AwsClients,
    settings: &Settings,
    prompt: &dyn Prompt,
    pattern: Option<String>,
    update_ssh_config: bool,
) -> Result<()> {
    let details = resolve_instances(&clients.ec2, pattern.as_deref(), prompt).await?;
    if details.is_empty() {
        println!("No matching instances.");
        return Ok(());
    }

    let plural = if details.len() == 1 { "" } else { "s" };
    let confirmed = prompt.confirm(&format!(
        "Really terminate {} instance{}? (hit y to confirm)",
        details.len(),
        plural
    ))?;
    if !confirmed {
        println!("No instances terminated.");
        return Ok(());
    }

    let mut terminated: Vec<String> = Vec::new();
    let mut failed = 0usize;
    for detail in &details {
        let handle = InstanceHandle::new(&clients.ec2, detail.instance_id.clone());
        match handle.terminate().await {
            Ok(()) => {
                println!("Terminating {}", detail.instance_id);
                terminated.push(detail.instance_id.clone());
            }
            Err(e) => {
                failed += 1;
                eprintln!("Failed to terminate {}: {}", detail.instance_id, e);
            }
        }
    }

    if update_ssh_config && !terminated.is_empty() {
        sync_ssh_config(clients, &terminated, settings).await?;
    }

    if failed > 0 {
        return Err(Ec2ToolsError::Other(format!(
            "{failed} of {} instances failed to terminate",
            details.len()
        )));
    }
    Ok(())
}
