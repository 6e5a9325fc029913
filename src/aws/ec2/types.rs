//! EC2 request and summary types.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Everything `run_instances` needs for a single public web instance.
#[derive(Debug, Clone)]
pub struct InstanceLaunchSpec {
    /// Machine image id, already resolved.
    pub image_id: String,
    /// EC2 sizing class (e.g. "t3.micro").
    pub instance_type: String,
    /// Subnet the primary network interface attaches to.
    pub subnet_id: String,
    /// Security group applied to the primary interface.
    pub security_group_id: String,
    /// Optional key pair name; validity is not checked locally.
    pub key_name: Option<String>,
    /// Bootstrap payload, plain text (encoded before the API call).
    pub user_data: String,
}

/// One row of the instance listing, shaped for the JSON boundary.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceSummary {
    #[serde(rename = "instanceId")]
    pub instance_id: String,
    #[serde(rename = "type")]
    pub instance_type: Option<String>,
    pub state: Option<String>,
    #[serde(rename = "publicIp")]
    pub public_ip: Option<String>,
    #[serde(rename = "privateIp")]
    pub private_ip: Option<String>,
    /// Value of the "Name" tag, null when absent.
    pub name: Option<String>,
    #[serde(rename = "launchTime")]
    pub launch_time: Option<DateTime<Utc>>,
    #[serde(rename = "az")]
    pub availability_zone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_serializes_with_api_field_names() {
        let summary = InstanceSummary {
            instance_id: "i-0abc".to_string(),
            instance_type: Some("t3.micro".to_string()),
            state: Some("running".to_string()),
            public_ip: Some("203.0.113.10".to_string()),
            private_ip: Some("10.0.0.5".to_string()),
            name: None,
            launch_time: None,
            availability_zone: Some("eu-west-3a".to_string()),
        };

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["instanceId"], "i-0abc");
        assert_eq!(value["type"], "t3.micro");
        assert_eq!(value["publicIp"], "203.0.113.10");
        assert_eq!(value["az"], "eu-west-3a");
        assert!(value["name"].is_null());
    }
}
