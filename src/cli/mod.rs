//! Command-line dispatcher.

pub mod commands;
mod prompt;

pub use prompt::{Prompt, TermPrompt};

use clap::{Parser, Subcommand};

use crate::aws::client::AwsClients;
use crate::config::Settings;
use crate::Result;

#[derive(Parser)]
#[command(name = "ec2")]
#[command(about = "Perform basic EC2 operations.")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List instances, optionally matching a name pattern
    List {
        /// Instance name pattern
        pattern: Option<String>,
    },

    /// Start instance(s) by ID or name
    Start {
        /// Instance ID or name
        instance: Option<String>,

        /// Wait to return to the shell until the instances are running
        #[arg(long)]
        wait: bool,

        /// Update the SSH config with the fresh instance addresses
        #[arg(long)]
        update_ssh_config: bool,
    },

    /// Stop instance(s) by ID or name
    Stop {
        /// Instance ID or name
        instance: Option<String>,

        /// Wait to return to the shell until the instances are stopped
        #[arg(long)]
        wait: bool,

        /// Drop the stopped instances from the SSH config
        #[arg(long)]
        update_ssh_config: bool,
    },

    /// Terminate instance(s) by ID or name, after confirmation
    Terminate {
        /// Instance ID or name
        instance: Option<String>,

        /// Drop the terminated instances from the SSH config
        #[arg(long)]
        update_ssh_config: bool,
    },
}

/// Parse arguments, run the selected subcommand once and return.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load()?;
    let clients = AwsClients::new(&settings).await?;
    let prompt = TermPrompt;

    match cli.command {
        Commands::List { pattern } => commands::list::execute(&clients, pattern).await,
        Commands::Start {
            instance,
            wait,
            update_ssh_config,
        } => {
            commands::start::execute(&clients, &settings, &prompt, instance, wait, update_ssh_config)
                .await
        }
        Commands::Stop {
            instance,
            wait,
            update_ssh_config,
        } => {
            commands::stop::execute(&clients, &settings, &prompt, instance, wait, update_ssh_config)
                .await
        }
        Commands::Terminate {
            instance,
            update_ssh_config,
        } => {
            commands::terminate::execute(&clients, &settings, &prompt, instance, update_ssh_config)
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["ec2", "list", "web*"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::List { pattern: Some(ref p) } if p == "web*"
        ));

        let cli = Cli::try_parse_from(["ec2", "start", "i-123", "--wait"]).unwrap();
        match cli.command {
            Commands::Start {
                instance,
                wait,
                update_ssh_config,
            } => {
                assert_eq!(instance.as_deref(), Some("i-123"));
                assert!(wait);
                assert!(!update_ssh_config);
            }
            _ => panic!("expected start"),
        }

        let cli = Cli::try_parse_from(["ec2", "stop", "--update-ssh-config"]).unwrap();
        match cli.command {
            Commands::Stop {
                instance,
                wait,
                update_ssh_config,
            } => {
                assert_eq!(instance, None);
                assert!(!wait);
                assert!(update_ssh_config);
            }
            _ => panic!("expected stop"),
        }
    }

    #[test]
    fn test_terminate_has_no_wait_flag() {
        assert!(Cli::try_parse_from(["ec2", "terminate", "--wait"]).is_err());
    }

    #[test]
    fn test_unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["ec2", "launch"]).is_err());
    }
}
