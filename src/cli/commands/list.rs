use crate::aws::client::AwsClients;
use crate::aws::describe::find_instance_details;
use crate::cli::commands::{image_map, print_instances};
use crate::Result;

pub async fn execute(clients: &AwsClients, pattern: Option<String>) -> Result<()> {
    let details = find_instance_details(&clients.ec2, pattern.as_deref()).await?;
    let images = image_map(&clients.ec2, &details).await?;
    print_instances(&details, &images);
    Ok(())
}
