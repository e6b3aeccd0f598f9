//! Fixed-interval polling until instances reach a target state.

use std::collections::HashMap;
use std::time::Duration;

use aws_sdk_ec2::Client as Ec2Client;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use crate::{Ec2ToolsError, Result};

/// Source of the current lifecycle states for a fixed set of instances.
///
/// The wait loop talks to this trait so it can be driven without a remote
/// API; the production implementation batches all instances into a single
/// describe call per poll.
#[allow(async_fn_in_trait)]
pub trait StatePoller {
    async fn poll(&mut self) -> Result<Vec<String>>;
}

/// Polls instance state through the EC2 API.
pub struct Ec2StatePoller<'a> {
    client: &'a Ec2Client,
    instance_ids: Vec<String>,
}

impl<'a> Ec2StatePoller<'a> {
    pub fn new(client: &'a Ec2Client, instance_ids: Vec<String>) -> Self {
        Self {
            client,
            instance_ids,
        }
    }
}

impl StatePoller for Ec2StatePoller<'_> {
    async fn poll(&mut self) -> Result<Vec<String>> {
        let response = self
            .client
            .describe_instances()
            .set_instance_ids(Some(self.instance_ids.clone()))
            .send()
            .await
            .map_err(Ec2ToolsError::ec2)?;

        let mut states: HashMap<String, String> = HashMap::new();
        for instance in response.reservations().iter().flat_map(|r| r.instances()) {
            if let (Some(id), Some(state)) = (
                instance.instance_id(),
                instance.state().and_then(|s| s.name()),
            ) {
                states.insert(id.to_string(), state.as_str().to_string());
            }
        }

        self.instance_ids
            .iter()
            .map(|id| {
                states
                    .get(id)
                    .cloned()
                    .ok_or_else(|| Ec2ToolsError::InstanceNotFound(id.clone()))
            })
            .collect()
    }
}

/// Options for the wait loop.
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Seconds before giving up (elapsed one-interval ticks)
    pub timeout_secs: u64,
    /// Sleep between polls. One second by default; anything shorter risks
    /// API throttling.
    pub poll_interval: Duration,
    /// Maintain a single overwritten status line while waiting
    pub verbose: bool,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            poll_interval: Duration::from_secs(1),
            verbose: false,
        }
    }
}

/// Wait until every polled instance reports `target_state`.
///
/// Returns immediately when all states already match. Otherwise the loop
/// re-polls once per interval; with `timeout_secs = T` it polls at ticks
/// `0..=T` and fails once tick `T` still has a non-matching state.
pub async fn wait_for_state<P: StatePoller>(
    poller: &mut P,
    target_state: &str,
    options: &WaitOptions,
) -> Result<()> {
    let status = options.verbose.then(make_status_line);

    let mut ticks: u64 = 0;
    loop {
        let states = poller.poll().await?;
        debug!(?states, target = %target_state, ticks, "Polled instance states");

        if states.iter().all(|s| s == target_state) {
            if let Some(status) = &status {
                status.finish_with_message("Done.");
            }
            return Ok(());
        }

        if let Some(status) = &status {
            status.set_message(format!("{} [{} s]", states.join(", "), ticks));
        }

        if ticks >= options.timeout_secs {
            if let Some(status) = &status {
                status.abandon();
            }
            return Err(Ec2ToolsError::Timeout {
                timeout_secs: options.timeout_secs,
            });
        }

        tokio::time::sleep(options.poll_interval).await;
        ticks += 1;
    }
}

fn make_status_line() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template("{msg}").unwrap());
    bar
}
