//! S3 bucket lifecycle: region-aware creation, listing, upload and
//! versioned-aware empty-then-delete.

use crate::aws::context::AwsContext;
use crate::aws::error::{classify_sdk, OpsError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, Delete, ObjectIdentifier,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

/// One row of the bucket listing, shaped for the JSON boundary.
#[derive(Debug, Clone, Serialize)]
pub struct BucketSummary {
    pub name: String,
    #[serde(rename = "creationDate")]
    pub creation_date: Option<DateTime<Utc>>,
    /// Resolved region, `"unknown"` when the lookup failed for this bucket.
    pub region: String,
}

/// S3 client owning the bucket lifecycle operations.
pub struct S3Client {
    client: aws_sdk_s3::Client,
}

impl S3Client {
    /// Create an S3 client from a pre-loaded AWS context.
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.s3_client(),
        }
    }

    /// Create a bucket in `region`.
    ///
    /// us-east-1 is the provider's historical default: a bucket targeting it
    /// must omit the location constraint, every other region must pass one.
    pub async fn create_bucket(&self, name: &str, region: &str) -> Result<(), OpsError> {
        info!(bucket = %name, region = %region, "Creating bucket");

        let mut request = self.client.create_bucket().bucket(name);
        if let Some(config) = location_constraint(region) {
            request = request.create_bucket_configuration(config);
        }

        request.send().await.map_err(classify_sdk)?;
        Ok(())
    }

    /// Enumerate all buckets with their resolved region.
    ///
    /// A failed region lookup degrades that bucket to region `"unknown"`
    /// instead of failing the whole listing.
    pub async fn list_buckets(&self) -> Result<Vec<BucketSummary>, OpsError> {
        let response = self.client.list_buckets().send().await.map_err(classify_sdk)?;

        let mut out = Vec::new();
        for bucket in response.buckets() {
            let Some(name) = bucket.name() else {
                continue;
            };

            let region = match self.bucket_region(name).await {
                Ok(region) => region,
                Err(err) => {
                    warn!(bucket = %name, error = %err, "Region lookup failed");
                    "unknown".to_string()
                }
            };

            out.push(BucketSummary {
                name: name.to_string(),
                creation_date: bucket
                    .creation_date()
                    .and_then(|dt| DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())),
                region,
            });
        }

        Ok(out)
    }

    /// Resolve the region a bucket lives in. An absent or empty location
    /// constraint means us-east-1.
    pub async fn bucket_region(&self, name: &str) -> Result<String, OpsError> {
        let response = self
            .client
            .get_bucket_location()
            .bucket(name)
            .send()
            .await
            .map_err(classify_sdk)?;

        Ok(match response.location_constraint().map(|c| c.as_str()) {
            None | Some("") => "us-east-1".to_string(),
            Some(region) => region.to_string(),
        })
    }

    /// Upload an object and return its virtual-hosted URL.
    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<String, OpsError> {
        debug!(bucket = %bucket, key = %key, size = body.len(), "Uploading object");

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(classify_sdk)?;

        Ok(format!("https://{bucket}.s3.amazonaws.com/{key}"))
    }

    /// Empty a bucket, then delete it. See [`empty_then_delete`].
    pub async fn delete_bucket(&self, name: &str) -> Result<(), OpsError> {
        empty_then_delete(self, name).await
    }

    /// Delete every object version and delete marker, in paginated batches.
    async fn delete_all_versions(&self, bucket: &str) -> Result<(), OpsError> {
        let mut key_marker: Option<String> = None;
        let mut version_marker: Option<String> = None;

        loop {
            let mut request = self.client.list_object_versions().bucket(bucket);
            if let Some(marker) = &key_marker {
                request = request.key_marker(marker);
            }
            if let Some(marker) = &version_marker {
                request = request.version_id_marker(marker);
            }

            let response = request.send().await.map_err(classify_sdk)?;

            let mut targets = Vec::new();
            for version in response.versions() {
                if let (Some(key), Some(id)) = (version.key(), version.version_id()) {
                    targets.push(ObjectIdentifier::builder().key(key).version_id(id).build()?);
                }
            }
            for marker in response.delete_markers() {
                if let (Some(key), Some(id)) = (marker.key(), marker.version_id()) {
                    targets.push(ObjectIdentifier::builder().key(key).version_id(id).build()?);
                }
            }

            if !targets.is_empty() {
                debug!(bucket = %bucket, count = targets.len(), "Deleting object versions");
                self.delete_batch(bucket, targets).await?;
            }

            if response.is_truncated() == Some(true) {
                key_marker = response.next_key_marker().map(|s| s.to_string());
                version_marker = response.next_version_id_marker().map(|s| s.to_string());
            } else {
                break;
            }
        }

        Ok(())
    }

    /// Delete every current object, in paginated batches.
    async fn delete_all_objects(&self, bucket: &str) -> Result<(), OpsError> {
        let mut continuation: Option<String> = None;

        loop {
            let mut request = self.client.list_objects_v2().bucket(bucket);
            if let Some(token) = &continuation {
                request = request.continuation_token(token);
            }

            let response = request.send().await.map_err(classify_sdk)?;

            let mut targets = Vec::new();
            for object in response.contents() {
                if let Some(key) = object.key() {
                    targets.push(ObjectIdentifier::builder().key(key).build()?);
                }
            }

            if !targets.is_empty() {
                debug!(bucket = %bucket, count = targets.len(), "Deleting objects");
                self.delete_batch(bucket, targets).await?;
            }

            if response.is_truncated() == Some(true) {
                continuation = response.next_continuation_token().map(|s| s.to_string());
            } else {
                break;
            }
        }

        Ok(())
    }

    async fn delete_batch(
        &self,
        bucket: &str,
        targets: Vec<ObjectIdentifier>,
    ) -> Result<(), OpsError> {
        self.client
            .delete_objects()
            .bucket(bucket)
            .delete(Delete::builder().set_objects(Some(targets)).build()?)
            .send()
            .await
            .map_err(classify_sdk)?;
        Ok(())
    }
}

/// Remote operations the bucket deletion flow depends on.
///
/// Implemented by the real S3 client and mocked in tests, so the two-phase
/// failure behavior can be exercised without AWS.
#[allow(async_fn_in_trait)]
#[cfg_attr(test, mockall::automock)]
pub trait BucketOps: Send + Sync {
    /// Delete every object version and delete marker in the bucket.
    async fn sweep_versions(&self, bucket: &str) -> Result<(), OpsError>;

    /// Delete every current object in the bucket.
    async fn sweep_objects(&self, bucket: &str) -> Result<(), OpsError>;

    /// Delete the (now empty) bucket itself.
    async fn remove_bucket(&self, bucket: &str) -> Result<(), OpsError>;
}

impl BucketOps for S3Client {
    async fn sweep_versions(&self, bucket: &str) -> Result<(), OpsError> {
        self.delete_all_versions(bucket).await
    }

    async fn sweep_objects(&self, bucket: &str) -> Result<(), OpsError> {
        self.delete_all_objects(bucket).await
    }

    async fn remove_bucket(&self, bucket: &str) -> Result<(), OpsError> {
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(classify_sdk)?;
        Ok(())
    }
}

/// Empty a bucket, then delete it.
///
/// The backend refuses to delete a non-empty bucket, so deletion is
/// two-phase: object versions and delete markers first (best-effort, a no-op
/// for unversioned buckets), then current objects, then the bucket itself.
/// Version-sweep failures are logged and suppressed; object-sweep and delete
/// failures propagate, so deleting an already-deleted bucket surfaces the
/// backend's not-found error unchanged.
pub async fn empty_then_delete<O: BucketOps>(ops: &O, name: &str) -> Result<(), OpsError> {
    info!(bucket = %name, "Emptying and deleting bucket");

    if let Err(err) = ops.sweep_versions(name).await {
        // The current-object sweep below catches whatever is left.
        warn!(bucket = %name, error = %err, "Version sweep failed, continuing");
    }

    ops.sweep_objects(name).await?;
    ops.remove_bucket(name).await?;

    info!(bucket = %name, "Bucket deleted");
    Ok(())
}

/// Location constraint for bucket creation; `None` for us-east-1, where the
/// backend rejects an explicit constraint.
pub fn location_constraint(region: &str) -> Option<CreateBucketConfiguration> {
    if region == "us-east-1" {
        return None;
    }

    Some(
        CreateBucketConfiguration::builder()
            .location_constraint(BucketLocationConstraint::from(region))
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use mockall::Sequence;

    #[tokio::test]
    async fn delete_runs_both_sweeps_before_the_bucket_call() {
        let mut ops = MockBucketOps::new();
        let mut seq = Sequence::new();

        ops.expect_sweep_versions()
            .with(eq("b1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        ops.expect_sweep_objects()
            .with(eq("b1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        ops.expect_remove_bucket()
            .with(eq("b1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        assert!(empty_then_delete(&ops, "b1").await.is_ok());
    }

    #[tokio::test]
    async fn version_sweep_failure_is_swallowed() {
        let mut ops = MockBucketOps::new();

        ops.expect_sweep_versions().returning(|_| {
            Err(OpsError::Api {
                code: None,
                message: "versioning query failed".to_string(),
            })
        });
        ops.expect_sweep_objects().times(1).returning(|_| Ok(()));
        ops.expect_remove_bucket().times(1).returning(|_| Ok(()));

        assert!(empty_then_delete(&ops, "b1").await.is_ok());
    }

    #[tokio::test]
    async fn object_sweep_failure_propagates_and_stops_the_flow() {
        let mut ops = MockBucketOps::new();

        ops.expect_sweep_versions().returning(|_| Ok(()));
        ops.expect_sweep_objects()
            .returning(|_| Err(OpsError::not_found("bucket", "no such bucket")));
        ops.expect_remove_bucket().never();

        let err = empty_then_delete(&ops, "gone").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn deleting_a_deleted_bucket_surfaces_not_found() {
        let mut ops = MockBucketOps::new();

        ops.expect_sweep_versions().returning(|_| Ok(()));
        ops.expect_sweep_objects().returning(|_| Ok(()));
        ops.expect_remove_bucket()
            .returning(|_| Err(OpsError::not_found("bucket", "no such bucket")));

        let err = empty_then_delete(&ops, "gone").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn us_east_1_omits_the_location_constraint() {
        assert!(location_constraint("us-east-1").is_none());
    }

    #[test]
    fn other_regions_carry_an_explicit_constraint() {
        for region in ["eu-west-3", "us-east-2", "ap-southeast-1"] {
            let config = location_constraint(region).expect("constraint expected");
            assert_eq!(
                config.location_constraint().map(|c| c.as_str()),
                Some(region)
            );
        }
    }

    #[test]
    fn bucket_summary_serializes_with_api_field_names() {
        let summary = BucketSummary {
            name: "test-x".to_string(),
            creation_date: DateTime::from_timestamp(1_700_000_000, 0),
            region: "eu-west-3".to_string(),
        };

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["name"], "test-x");
        assert_eq!(value["region"], "eu-west-3");
        assert!(value["creationDate"].is_string());
    }

    #[tokio::test]
    #[ignore = "requires AWS credentials"]
    async fn created_bucket_appears_in_listing_with_region() {
        let ctx = crate::aws::AwsContext::new("eu-west-3").await;
        let s3 = S3Client::from_context(&ctx);
        let name = format!("infra-helper-it-{}", std::process::id());

        s3.create_bucket(&name, "eu-west-3").await.unwrap();
        let listing = s3.list_buckets().await.unwrap();
        let entry = listing.iter().find(|b| b.name == name).unwrap();
        assert_eq!(entry.region, "eu-west-3");

        s3.delete_bucket(&name).await.unwrap();
    }
}
