//! EC2 provisioning workflow.
//!
//! Orchestrates image resolution, network discovery, security group
//! reconciliation, instance creation and tagging, in that strict order.
//! There is no rollback on partial failure: the network and security group
//! are idempotent and reusable across launches, so only the non-idempotent
//! instance-creation step runs last. Failed launches report which reusable
//! resources were already established.

use crate::aws::ec2::{Ec2Client, InstanceLaunchSpec, NetworkTarget};
use crate::aws::error::OpsError;
use crate::aws::ssm::{SsmClient, LATEST_AL2023_PARAMETER};
use crate::user_data;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

/// Default sizing class for launched instances.
pub const DEFAULT_INSTANCE_TYPE: &str = "t3.micro";

/// Default Name tag for launched instances.
pub const DEFAULT_INSTANCE_NAME: &str = "infra-tool-ec2";

/// Caller-facing launch parameters.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub instance_type: String,
    pub name: String,
    /// Optional key pair; not validated locally.
    pub key_name: Option<String>,
    /// Caller-supplied image id; skips resolution when present.
    pub image_id: Option<String>,
}

impl Default for LaunchRequest {
    fn default() -> Self {
        Self {
            instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
            name: DEFAULT_INSTANCE_NAME.to_string(),
            key_name: None,
            image_id: None,
        }
    }
}

/// A successfully provisioned instance.
#[derive(Debug, Clone, Serialize)]
pub struct LaunchOutcome {
    #[serde(rename = "instanceId")]
    pub instance_id: String,
    pub name: String,
    #[serde(rename = "imageId")]
    pub image_id: String,
    #[serde(rename = "vpcId")]
    pub vpc_id: String,
    #[serde(rename = "subnetId")]
    pub subnet_id: String,
    #[serde(rename = "securityGroupId")]
    pub security_group_id: String,
}

/// Reusable resources already in place when a launch failed. These are not
/// rolled back; the security group in particular is shared across launches.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EstablishedResources {
    #[serde(rename = "imageId")]
    pub image_id: Option<String>,
    #[serde(rename = "vpcId")]
    pub vpc_id: Option<String>,
    #[serde(rename = "subnetId")]
    pub subnet_id: Option<String>,
    #[serde(rename = "securityGroupId")]
    pub security_group_id: Option<String>,
    /// Set when the instance was created but tagging failed.
    #[serde(rename = "instanceId")]
    pub instance_id: Option<String>,
}

/// Step of the workflow a failure occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStage {
    ImageResolution,
    NetworkDiscovery,
    IngressReconciliation,
    InstanceCreation,
    Tagging,
}

impl std::fmt::Display for LaunchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stage = match self {
            Self::ImageResolution => "image resolution",
            Self::NetworkDiscovery => "network discovery",
            Self::IngressReconciliation => "ingress reconciliation",
            Self::InstanceCreation => "instance creation",
            Self::Tagging => "tagging",
        };
        f.write_str(stage)
    }
}

/// A failed launch, with the underlying cause preserved verbatim and the
/// resources that had already been established.
#[derive(Debug, Error)]
#[error("launch failed during {stage}: {source}")]
pub struct LaunchError {
    pub stage: LaunchStage,
    pub established: EstablishedResources,
    #[source]
    pub source: OpsError,
}

/// Remote operations the launch workflow depends on.
///
/// Implemented by the real AWS clients and mocked in tests, so the ordering
/// and failure behavior of the workflow can be exercised without AWS.
#[allow(async_fn_in_trait)]
#[cfg_attr(test, mockall::automock)]
pub trait ProvisionOps: Send + Sync {
    /// Resolve the latest bootable image id.
    async fn latest_image_id(&self) -> Result<String, OpsError>;

    /// Discover the default VPC and a usable subnet.
    async fn default_network(&self) -> Result<NetworkTarget, OpsError>;

    /// Ensure the managed ingress policy exists on the VPC; returns its id.
    async fn ensure_web_ingress(&self, vpc_id: &str) -> Result<String, OpsError>;

    /// Create exactly one instance; returns the assigned instance id.
    async fn run_instance(&self, spec: InstanceLaunchSpec) -> Result<String, OpsError>;

    /// Apply the Name tag to a created instance.
    async fn tag_instance(&self, instance_id: &str, name: &str) -> Result<(), OpsError>;
}

/// Launch one public web instance.
///
/// Steps run strictly in order with no compensation on failure; see the
/// module docs for the rationale.
pub async fn launch<O: ProvisionOps>(
    ops: &O,
    request: &LaunchRequest,
) -> Result<LaunchOutcome, LaunchError> {
    let mut established = EstablishedResources::default();

    let image_id = match &request.image_id {
        Some(id) => id.clone(),
        None => ops.latest_image_id().await.map_err(|source| LaunchError {
            stage: LaunchStage::ImageResolution,
            established: established.clone(),
            source,
        })?,
    };
    established.image_id = Some(image_id.clone());

    let network = ops.default_network().await.map_err(|source| LaunchError {
        stage: LaunchStage::NetworkDiscovery,
        established: established.clone(),
        source,
    })?;
    established.vpc_id = Some(network.vpc_id.clone());
    established.subnet_id = Some(network.subnet_id.clone());

    let security_group_id =
        ops.ensure_web_ingress(&network.vpc_id)
            .await
            .map_err(|source| LaunchError {
                stage: LaunchStage::IngressReconciliation,
                established: established.clone(),
                source,
            })?;
    established.security_group_id = Some(security_group_id.clone());

    let spec = InstanceLaunchSpec {
        image_id: image_id.clone(),
        instance_type: request.instance_type.clone(),
        subnet_id: network.subnet_id.clone(),
        security_group_id: security_group_id.clone(),
        key_name: request.key_name.clone(),
        user_data: user_data::nginx_cloud_config(),
    };

    let instance_id = ops.run_instance(spec).await.map_err(|source| LaunchError {
        stage: LaunchStage::InstanceCreation,
        established: established.clone(),
        source,
    })?;
    established.instance_id = Some(instance_id.clone());

    if let Err(source) = ops.tag_instance(&instance_id, &request.name).await {
        warn!(instance_id = %instance_id, error = %source, "Instance created but tagging failed");
        return Err(LaunchError {
            stage: LaunchStage::Tagging,
            established,
            source,
        });
    }

    info!(
        instance_id = %instance_id,
        name = %request.name,
        instance_type = %request.instance_type,
        "Instance provisioned"
    );

    Ok(LaunchOutcome {
        instance_id,
        name: request.name.clone(),
        image_id,
        vpc_id: network.vpc_id,
        subnet_id: network.subnet_id,
        security_group_id,
    })
}

/// AWS-backed implementation of [`ProvisionOps`].
pub struct AwsProvisionOps {
    ec2: Ec2Client,
    ssm: SsmClient,
}

impl AwsProvisionOps {
    pub fn new(ec2: Ec2Client, ssm: SsmClient) -> Self {
        Self { ec2, ssm }
    }
}

impl ProvisionOps for AwsProvisionOps {
    /// Prefer the managed "latest" pointer; fall back to an image search when
    /// the parameter read fails for any reason.
    async fn latest_image_id(&self) -> Result<String, OpsError> {
        match self.ssm.get_parameter(LATEST_AL2023_PARAMETER).await {
            Ok(image_id) => Ok(image_id),
            Err(err) => {
                warn!(error = %err, "Latest-image parameter unavailable, searching images");
                self.ec2.find_latest_image().await
            }
        }
    }

    async fn default_network(&self) -> Result<NetworkTarget, OpsError> {
        self.ec2.default_network().await
    }

    async fn ensure_web_ingress(&self, vpc_id: &str) -> Result<String, OpsError> {
        self.ec2.ensure_web_ingress(vpc_id).await
    }

    async fn run_instance(&self, spec: InstanceLaunchSpec) -> Result<String, OpsError> {
        self.ec2.run_web_instance(&spec).await
    }

    async fn tag_instance(&self, instance_id: &str, name: &str) -> Result<(), OpsError> {
        self.ec2.tag_instance(instance_id, name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use mockall::Sequence;

    fn network() -> NetworkTarget {
        NetworkTarget {
            vpc_id: "vpc-1".to_string(),
            subnet_id: "subnet-1".to_string(),
        }
    }

    #[tokio::test]
    async fn launch_runs_steps_in_order_and_tags_the_instance() {
        let mut ops = MockProvisionOps::new();
        let mut seq = Sequence::new();

        ops.expect_latest_image_id()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok("ami-123".to_string()));
        ops.expect_default_network()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(network()));
        ops.expect_ensure_web_ingress()
            .with(eq("vpc-1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("sg-1".to_string()));
        ops.expect_run_instance()
            .withf(|spec| {
                spec.image_id == "ami-123"
                    && spec.subnet_id == "subnet-1"
                    && spec.security_group_id == "sg-1"
                    && spec.instance_type == "t3.micro"
                    && spec.user_data.starts_with("#cloud-config")
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("i-42".to_string()));
        ops.expect_tag_instance()
            .with(eq("i-42"), eq("web-1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let request = LaunchRequest {
            name: "web-1".to_string(),
            ..LaunchRequest::default()
        };
        let outcome = launch(&ops, &request).await.unwrap();

        assert_eq!(outcome.instance_id, "i-42");
        assert_eq!(outcome.image_id, "ami-123");
        assert_eq!(outcome.security_group_id, "sg-1");
        assert_eq!(outcome.name, "web-1");
    }

    #[tokio::test]
    async fn caller_supplied_image_skips_resolution() {
        let mut ops = MockProvisionOps::new();

        ops.expect_latest_image_id().never();
        ops.expect_default_network().returning(|| Ok(network()));
        ops.expect_ensure_web_ingress()
            .returning(|_| Ok("sg-1".to_string()));
        ops.expect_run_instance()
            .withf(|spec| spec.image_id == "ami-custom")
            .returning(|_| Ok("i-1".to_string()));
        ops.expect_tag_instance().returning(|_, _| Ok(()));

        let request = LaunchRequest {
            image_id: Some("ami-custom".to_string()),
            ..LaunchRequest::default()
        };
        let outcome = launch(&ops, &request).await.unwrap();
        assert_eq!(outcome.image_id, "ami-custom");
    }

    #[tokio::test]
    async fn ingress_failure_reports_established_network() {
        let mut ops = MockProvisionOps::new();

        ops.expect_latest_image_id()
            .returning(|| Ok("ami-123".to_string()));
        ops.expect_default_network().returning(|| Ok(network()));
        ops.expect_ensure_web_ingress().returning(|_| {
            Err(OpsError::Api {
                code: None,
                message: "boom".to_string(),
            })
        });
        ops.expect_run_instance().never();
        ops.expect_tag_instance().never();

        let err = launch(&ops, &LaunchRequest::default()).await.unwrap_err();
        assert_eq!(err.stage, LaunchStage::IngressReconciliation);
        assert_eq!(err.established.image_id.as_deref(), Some("ami-123"));
        assert_eq!(err.established.vpc_id.as_deref(), Some("vpc-1"));
        assert_eq!(err.established.subnet_id.as_deref(), Some("subnet-1"));
        assert!(err.established.security_group_id.is_none());
        assert!(err.established.instance_id.is_none());
    }

    #[tokio::test]
    async fn tagging_failure_still_reports_the_instance_id() {
        let mut ops = MockProvisionOps::new();

        ops.expect_latest_image_id()
            .returning(|| Ok("ami-123".to_string()));
        ops.expect_default_network().returning(|| Ok(network()));
        ops.expect_ensure_web_ingress()
            .returning(|_| Ok("sg-1".to_string()));
        ops.expect_run_instance().returning(|_| Ok("i-9".to_string()));
        ops.expect_tag_instance().returning(|_, _| {
            Err(OpsError::Api {
                code: None,
                message: "tag failed".to_string(),
            })
        });

        let err = launch(&ops, &LaunchRequest::default()).await.unwrap_err();
        assert_eq!(err.stage, LaunchStage::Tagging);
        assert_eq!(err.established.instance_id.as_deref(), Some("i-9"));
        assert_eq!(err.established.security_group_id.as_deref(), Some("sg-1"));
    }

    #[tokio::test]
    async fn network_failure_stops_the_workflow() {
        let mut ops = MockProvisionOps::new();

        ops.expect_latest_image_id()
            .returning(|| Ok("ami-123".to_string()));
        ops.expect_default_network().returning(|| {
            Err(OpsError::not_found(
                "default VPC",
                "no default VPC in this region",
            ))
        });
        ops.expect_ensure_web_ingress().never();
        ops.expect_run_instance().never();

        let err = launch(&ops, &LaunchRequest::default()).await.unwrap_err();
        assert_eq!(err.stage, LaunchStage::NetworkDiscovery);
        assert!(err.source.is_not_found());
    }
}
