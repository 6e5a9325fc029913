//! Instance launch, tagging and listing.

use super::types::{InstanceLaunchSpec, InstanceSummary};
use super::Ec2Client;
use crate::aws::error::{classify_sdk, OpsError};
use aws_sdk_ec2::types::{
    InstanceNetworkInterfaceSpecification, InstanceType, Reservation, Tag,
};
use base64::Engine;
use chrono::{DateTime, Utc};
use tracing::info;

impl Ec2Client {
    /// Launch exactly one instance with a public address on the resolved
    /// subnet, carrying the bootstrap payload.
    ///
    /// The Name tag is applied afterwards by [`Ec2Client::tag_instance`]; the
    /// two calls are not atomic.
    pub async fn run_web_instance(&self, spec: &InstanceLaunchSpec) -> Result<String, OpsError> {
        let user_data_b64 =
            base64::engine::general_purpose::STANDARD.encode(spec.user_data.as_bytes());

        let interface = InstanceNetworkInterfaceSpecification::builder()
            .device_index(0)
            .subnet_id(&spec.subnet_id)
            .associate_public_ip_address(true)
            .groups(&spec.security_group_id)
            .build();

        let mut request = self
            .client
            .run_instances()
            .image_id(&spec.image_id)
            .instance_type(InstanceType::from(spec.instance_type.as_str()))
            .min_count(1)
            .max_count(1)
            .network_interfaces(interface)
            .user_data(user_data_b64);

        if let Some(key_name) = &spec.key_name {
            request = request.key_name(key_name);
        }

        let response = request.send().await.map_err(classify_sdk)?;

        let instance_id = response
            .instances()
            .first()
            .and_then(|i| i.instance_id())
            .ok_or_else(|| OpsError::not_found("instance", "run_instances returned no instance"))?
            .to_string();

        info!(
            instance_id = %instance_id,
            instance_type = %spec.instance_type,
            image_id = %spec.image_id,
            "Instance launched"
        );

        Ok(instance_id)
    }

    /// Apply the Name tag to a launched instance.
    pub async fn tag_instance(&self, instance_id: &str, name: &str) -> Result<(), OpsError> {
        self.client
            .create_tags()
            .resources(instance_id)
            .tags(Tag::builder().key("Name").value(name).build())
            .send()
            .await
            .map_err(classify_sdk)?;

        Ok(())
    }

    /// Enumerate every instance in the region, one record per instance.
    ///
    /// Re-enumerates from scratch on each call; pagination runs to completion
    /// within the call.
    pub async fn list_instances(&self) -> Result<Vec<InstanceSummary>, OpsError> {
        let mut out = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self.client.describe_instances();
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }

            let response = request.send().await.map_err(classify_sdk)?;
            out.extend(flatten_reservations(response.reservations()));

            next_token = response.next_token().map(|t| t.to_string());
            if next_token.is_none() {
                break;
            }
        }

        Ok(out)
    }
}

/// Flatten reservations into one summary per instance, extracting the Name
/// tag when present.
pub(crate) fn flatten_reservations(reservations: &[Reservation]) -> Vec<InstanceSummary> {
    let mut out = Vec::new();
    for reservation in reservations {
        for instance in reservation.instances() {
            let Some(instance_id) = instance.instance_id() else {
                continue;
            };

            let name = instance
                .tags()
                .iter()
                .find(|t| t.key() == Some("Name"))
                .and_then(|t| t.value())
                .map(|v| v.to_string());

            out.push(InstanceSummary {
                instance_id: instance_id.to_string(),
                instance_type: instance.instance_type().map(|t| t.as_str().to_string()),
                state: instance
                    .state()
                    .and_then(|s| s.name())
                    .map(|n| n.as_str().to_string()),
                public_ip: instance.public_ip_address().map(|ip| ip.to_string()),
                private_ip: instance.private_ip_address().map(|ip| ip.to_string()),
                name,
                launch_time: instance.launch_time().and_then(to_chrono),
                availability_zone: instance
                    .placement()
                    .and_then(|p| p.availability_zone())
                    .map(|az| az.to_string()),
            });
        }
    }
    out
}

fn to_chrono(dt: &aws_sdk_ec2::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}
