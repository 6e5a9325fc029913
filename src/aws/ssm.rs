//! Managed-parameter reads (SSM Parameter Store).

use crate::aws::context::AwsContext;
use crate::aws::error::{classify_sdk, OpsError};
use tracing::debug;

/// Well-known pointer to the latest AL2023 kernel-default x86_64 image.
pub const LATEST_AL2023_PARAMETER: &str =
    "/aws/service/ami-amazon-linux-latest/al2023-ami-kernel-default-x86_64";

/// SSM client for parameter reads.
pub struct SsmClient {
    client: aws_sdk_ssm::Client,
}

impl SsmClient {
    /// Create an SSM client from a pre-loaded AWS context.
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.ssm_client(),
        }
    }

    /// Read a single parameter value.
    pub async fn get_parameter(&self, name: &str) -> Result<String, OpsError> {
        let response = self
            .client
            .get_parameter()
            .name(name)
            .send()
            .await
            .map_err(classify_sdk)?;

        let value = response
            .parameter()
            .and_then(|p| p.value())
            .ok_or_else(|| OpsError::not_found("parameter", name.to_string()))?
            .to_string();

        debug!(parameter = %name, "Read managed parameter");
        Ok(value)
    }
}
