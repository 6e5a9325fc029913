//! EC2 instance, network and security group management.

mod image;
mod instance;
mod network;
mod security_group;
mod types;

pub use image::newest_available_image;
pub use network::NetworkTarget;
pub use security_group::{SECURITY_GROUP_NAME, web_ingress_permissions};
pub use types::{InstanceLaunchSpec, InstanceSummary};

use crate::aws::context::AwsContext;

/// EC2 client owning the compute-side operations.
pub struct Ec2Client {
    pub(crate) client: aws_sdk_ec2::Client,
}

impl Ec2Client {
    /// Create an EC2 client from a pre-loaded AWS context.
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.ec2_client(),
        }
    }
}
