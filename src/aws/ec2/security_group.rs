//! Idempotent security group reconciliation.

use super::Ec2Client;
use crate::aws::error::{classify_sdk, OpsError};
use aws_sdk_ec2::types::{Filter, IpPermission, IpRange};
use tracing::{debug, info};

/// Fixed name of the managed security group, scoped per VPC.
pub const SECURITY_GROUP_NAME: &str = "infra-tool-sg";

const SECURITY_GROUP_DESCRIPTION: &str = "Managed by Infra Tool";

/// Inbound TCP ports opened to the world for a web instance.
const INGRESS_PORTS: [i32; 2] = [22, 80];

/// Ingress rule set applied during reconciliation: TCP 22 and TCP 80 from
/// anywhere. The reconciler only ever widens; it never narrows existing rules.
pub fn web_ingress_permissions() -> Vec<IpPermission> {
    INGRESS_PORTS
        .iter()
        .map(|port| {
            IpPermission::builder()
                .ip_protocol("tcp")
                .from_port(*port)
                .to_port(*port)
                .ip_ranges(IpRange::builder().cidr_ip("0.0.0.0/0").build())
                .build()
        })
        .collect()
}

/// Collapse a duplicate-rule conflict into success.
///
/// Re-authorizing an ingress rule that already exists must be a no-op, not an
/// error, so reconciliation stays idempotent.
pub(crate) fn swallow_ingress_conflict(result: Result<(), OpsError>) -> Result<(), OpsError> {
    match result {
        Err(err) if err.is_conflict() => {
            debug!("Ingress rules already present, nothing to do");
            Ok(())
        }
        other => other,
    }
}

impl Ec2Client {
    /// Ensure the managed security group exists on `vpc_id` and permits
    /// inbound TCP 22 and 80 from anywhere. Returns the group id.
    ///
    /// Lookup-before-create keeps at most one group with the managed name per
    /// VPC; a duplicate-rule response from the ingress call is success.
    pub async fn ensure_web_ingress(&self, vpc_id: &str) -> Result<String, OpsError> {
        let group_id = match self.find_security_group(vpc_id).await? {
            Some(id) => {
                debug!(sg_id = %id, vpc_id = %vpc_id, "Reusing existing security group");
                id
            }
            None => {
                let created = self
                    .client
                    .create_security_group()
                    .group_name(SECURITY_GROUP_NAME)
                    .description(SECURITY_GROUP_DESCRIPTION)
                    .vpc_id(vpc_id)
                    .send()
                    .await
                    .map_err(classify_sdk)?;

                let id = created
                    .group_id()
                    .ok_or_else(|| {
                        OpsError::not_found("security group", "create returned no group id")
                    })?
                    .to_string();
                info!(sg_id = %id, vpc_id = %vpc_id, "Created security group");
                id
            }
        };

        let authorize = self
            .client
            .authorize_security_group_ingress()
            .group_id(&group_id)
            .set_ip_permissions(Some(web_ingress_permissions()))
            .send()
            .await
            .map(|_| ())
            .map_err(classify_sdk);

        swallow_ingress_conflict(authorize)?;

        Ok(group_id)
    }

    async fn find_security_group(&self, vpc_id: &str) -> Result<Option<String>, OpsError> {
        let response = self
            .client
            .describe_security_groups()
            .filters(
                Filter::builder()
                    .name("group-name")
                    .values(SECURITY_GROUP_NAME)
                    .build(),
            )
            .filters(Filter::builder().name("vpc-id").values(vpc_id).build())
            .send()
            .await
            .map_err(classify_sdk)?;

        Ok(response
            .security_groups()
            .first()
            .and_then(|sg| sg.group_id())
            .map(|id| id.to_string()))
    }
}
