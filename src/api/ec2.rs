//! EC2 instance handlers.

use super::error::ApiError;
use super::AppState;
use crate::aws::ec2::InstanceSummary;
use crate::provision::{self, LaunchRequest, DEFAULT_INSTANCE_NAME, DEFAULT_INSTANCE_TYPE};
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct LaunchBody {
    instance_type: Option<String>,
    name: Option<String>,
    key_name: Option<String>,
    ami_id: Option<String>,
}

impl From<LaunchBody> for LaunchRequest {
    fn from(body: LaunchBody) -> Self {
        Self {
            instance_type: body
                .instance_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_INSTANCE_TYPE.to_string()),
            name: body
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| DEFAULT_INSTANCE_NAME.to_string()),
            key_name: body.key_name.filter(|k| !k.is_empty()),
            image_id: body.ami_id.filter(|a| !a.is_empty()),
        }
    }
}

pub async fn list_instances(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<InstanceSummary>>, ApiError> {
    let instances = state.ec2.list_instances().await?;
    Ok(Json(instances))
}

pub async fn launch_instance(
    State(state): State<Arc<AppState>>,
    body: Option<Json<LaunchBody>>,
) -> Result<Json<Value>, ApiError> {
    let request = LaunchRequest::from(body.map(|Json(b)| b).unwrap_or_default());
    let outcome = provision::launch(&state.provisioner, &request).await?;

    Ok(Json(json!({
        "ok": true,
        "instanceId": outcome.instance_id,
        "name": outcome.name,
        "imageId": outcome.image_id,
        "vpcId": outcome.vpc_id,
        "subnetId": outcome.subnet_id,
        "securityGroupId": outcome.security_group_id,
    })))
}
