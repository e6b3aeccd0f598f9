use crate::aws::client::AwsClients;
use crate::aws::instance::{states, InstanceHandle};
use crate::aws::wait::{wait_for_state, Ec2StatePoller};
use crate::cli::commands::{resolve_instances, sync_ssh_config};
use crate::cli::prompt::Prompt;
use crate::config::Settings;
use crate::{Ec2ToolsError, Result};

pub async fn execute(
    clients: &AwsClients,
    settings: &Settings,
    prompt: &dyn Prompt,
    pattern: Option<String>,
    wait: bool,
    update_ssh_config: bool,
) -> Result<()> {
    let details = resolve_instances(&clients.ec2, pattern.as_deref(), prompt).await?;
    if details.is_empty() {
        println!("No matching instances.");
        return Ok(());
    }

    let mut stopped: Vec<String> = Vec::new();
    let mut failed = 0usize;
    for detail in &details {
        let handle = InstanceHandle::new(&clients.ec2, detail.instance_id.clone());
        match handle.stop().await {
            Ok(()) => {
                println!("Stopping {}", detail.instance_id);
                stopped.push(detail.instance_id.clone());
            }
            Err(e) => {
                failed += 1;
                eprintln!("Failed to stop {}: {}", detail.instance_id, e);
            }
        }
    }

    if wait && !stopped.is_empty() {
        let mut poller = Ec2StatePoller::new(&clients.ec2, stopped.clone());
        wait_for_state(&mut poller, states::STOPPED, &settings.wait_options(true)).await?;
    }

    // Stopped instances drop out of the SSH config rather than keeping a
    // stale address.
    if update_ssh_config && !stopped.is_empty() {
        sync_ssh_config(clients, &stopped, settings).await?;
    }

    if failed > 0 {
        return Err(Ec2ToolsError::Other(format!(
            "{failed} of {} instances failed to stop",
            details.len()
        )));
    }
    Ok(())
}
