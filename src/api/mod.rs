//! JSON HTTP boundary.
//!
//! Thin marshaling layer between HTTP bodies and the core components; all
//! orchestration and failure semantics live below in [`crate::aws`] and
//! [`crate::provision`].

mod ec2;
mod error;
mod s3;

pub use error::ApiError;

use crate::aws::ec2::Ec2Client;
use crate::aws::s3::S3Client;
use crate::provision::AwsProvisionOps;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use std::sync::Arc;

/// Shared clients handed to every handler.
pub struct AppState {
    pub s3: S3Client,
    pub ec2: Ec2Client,
    pub provisioner: AwsProvisionOps,
    /// Region the server was started with; the default for new buckets.
    pub region: String,
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/api/s3", get(s3::list_buckets).post(s3::create_bucket))
        .route("/api/s3/upload", post(s3::upload_object))
        .route("/api/s3/{bucket}", delete(s3::delete_bucket))
        .route("/api/ec2", get(ec2::list_instances))
        .route("/api/ec2/launch", post(ec2::launch_instance))
        .with_state(state)
}

async fn index() -> &'static str {
    "infra-helper API\n\n\
     GET    /api/health        - liveness probe\n\
     GET    /api/s3            - list buckets\n\
     POST   /api/s3            - create bucket {bucket_name, region}\n\
     POST   /api/s3/upload     - upload object (multipart: bucket, prefix, file)\n\
     DELETE /api/s3/{bucket}   - empty and delete bucket\n\
     GET    /api/ec2           - list instances\n\
     POST   /api/ec2/launch    - launch instance {instance_type, key_name, ami_id, name}\n"
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}
