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

    // Each instance is its own call; one failure must not hide the others.
    let mut started: Vec<String> = Vec::new();
    let mut failed = 0usize;
    for detail in &details {
        let handle = InstanceHandle::new(&clients.ec2, detail.instance_id.clone());
        match handle.start().await {
            Ok(()) => {
                println!("Starting {}", detail.instance_id);
                started.push(detail.instance_id.clone());
            }
            Err(e) => {
                failed += 1;
                eprintln!("Failed to start {}: {}", detail.instance_id, e);
            }
        }
    }

    if wait && !started.is_empty() {
        let mut poller = Ec2StatePoller::new(&clients.ec2, started.clone());
        wait_for_state(&mut poller, states::RUNNING, &settings.wait_options(true)).await?;
    }

    if update_ssh_config && !started.is_empty() {
        sync_ssh_config(clients, &started, settings).await?;
    }

    if failed > 0 {
        return Err(Ec2ToolsError::Other(format!(
            "{failed} of {} instances failed to start",
            details.len()
        )));
    }
    Ok(())
}
