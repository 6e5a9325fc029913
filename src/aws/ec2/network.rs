//! Default VPC and subnet discovery.

use super::Ec2Client;
use crate::aws::error::{classify_sdk, OpsError};
use aws_sdk_ec2::types::{Filter, Subnet};
use tracing::debug;

/// The network an instance will be placed into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkTarget {
    pub vpc_id: String,
    pub subnet_id: String,
}

impl Ec2Client {
    /// Discover the account's default VPC and a usable subnet within it.
    ///
    /// Prefers a subnet marked default-for-its-AZ; when none qualifies, any
    /// subnet in the VPC is acceptable, with the lexicographically smallest
    /// subnet id winning so repeated calls stay deterministic.
    pub async fn default_network(&self) -> Result<NetworkTarget, OpsError> {
        let vpcs = self
            .client
            .describe_vpcs()
            .filters(Filter::builder().name("isDefault").values("true").build())
            .send()
            .await
            .map_err(classify_sdk)?;

        let vpc_id = vpcs
            .vpcs()
            .first()
            .and_then(|v| v.vpc_id())
            .ok_or_else(|| OpsError::not_found("default VPC", "no default VPC in this region"))?
            .to_string();

        let mut subnets = self.subnets_in_vpc(&vpc_id, true).await?;
        if subnets.is_empty() {
            subnets = self.subnets_in_vpc(&vpc_id, false).await?;
        }

        let subnet_id = pick_subnet(&subnets).ok_or_else(|| {
            OpsError::not_found("subnet", format!("VPC {vpc_id} has no subnets"))
        })?;

        debug!(vpc_id = %vpc_id, subnet_id = %subnet_id, "Resolved default network");

        Ok(NetworkTarget { vpc_id, subnet_id })
    }

    async fn subnets_in_vpc(
        &self,
        vpc_id: &str,
        default_for_az_only: bool,
    ) -> Result<Vec<Subnet>, OpsError> {
        let mut request = self
            .client
            .describe_subnets()
            .filters(Filter::builder().name("vpc-id").values(vpc_id).build());

        if default_for_az_only {
            request = request.filters(
                Filter::builder()
                    .name("default-for-az")
                    .values("true")
                    .build(),
            );
        }

        let response = request.send().await.map_err(classify_sdk)?;
        Ok(response.subnets().to_vec())
    }
}

/// Pick the lexicographically smallest subnet id from a candidate list.
///
/// The backend does not guarantee a stable ordering, so the tie-break keeps
/// provisioning deterministic across calls.
pub(crate) fn pick_subnet(subnets: &[Subnet]) -> Option<String> {
    subnets
        .iter()
        .filter_map(|s| s.subnet_id())
        .min()
        .map(|id| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subnet(id: &str) -> Subnet {
        Subnet::builder().subnet_id(id).build()
    }

    #[test]
    fn pick_subnet_empty_is_none() {
        assert_eq!(pick_subnet(&[]), None);
    }

    #[test]
    fn pick_subnet_is_deterministic() {
        let candidates = vec![
            subnet("subnet-0c"),
            subnet("subnet-0a"),
            subnet("subnet-0b"),
        ];
        assert_eq!(pick_subnet(&candidates).as_deref(), Some("subnet-0a"));

        let reordered = vec![
            subnet("subnet-0b"),
            subnet("subnet-0c"),
            subnet("subnet-0a"),
        ];
        assert_eq!(pick_subnet(&reordered).as_deref(), Some("subnet-0a"));
    }

    #[test]
    fn pick_subnet_skips_entries_without_ids() {
        let candidates = vec![Subnet::builder().build(), subnet("subnet-1")];
        assert_eq!(pick_subnet(&candidates).as_deref(), Some("subnet-1"));
    }
}
