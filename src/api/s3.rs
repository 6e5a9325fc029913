//! S3 bucket handlers.

use super::error::ApiError;
use super::AppState;
use crate::aws::s3::BucketSummary;
use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct CreateBucketBody {
    bucket_name: Option<String>,
    region: Option<String>,
}

pub async fn list_buckets(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BucketSummary>>, ApiError> {
    let buckets = state.s3.list_buckets().await?;
    Ok(Json(buckets))
}

pub async fn create_bucket(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBucketBody>,
) -> Result<Json<Value>, ApiError> {
    let name = body
        .bucket_name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::BadRequest("bucket_name required".to_string()))?;
    let region = body
        .region
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| state.region.clone());

    state.s3.create_bucket(&name, &region).await?;
    Ok(Json(json!({ "ok": true, "bucket": name, "region": region })))
}

pub async fn delete_bucket(
    State(state): State<Arc<AppState>>,
    Path(bucket): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.s3.delete_bucket(&bucket).await?;
    Ok(Json(json!({ "ok": true, "bucket": bucket })))
}

pub async fn upload_object(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut bucket: Option<String> = None;
    let mut prefix = String::new();
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        match field.name() {
            Some("bucket") => {
                bucket = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(e.to_string()))?,
                );
            }
            Some("prefix") => {
                prefix = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                file = Some((filename, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let bucket =
        bucket.ok_or_else(|| ApiError::BadRequest("bucket and file are required".to_string()))?;
    let (filename, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("bucket and file are required".to_string()))?;

    let key = object_key(prefix.trim(), &filename);
    let url = state.s3.put_object(&bucket, &key, bytes).await?;

    Ok(Json(json!({ "ok": true, "bucket": bucket, "key": key, "url": url })))
}

/// Build the object key from an optional prefix and a sanitized filename.
fn object_key(prefix: &str, filename: &str) -> String {
    let safe = sanitize_key(filename);
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        safe
    } else {
        format!("{prefix}/{safe}")
    }
}

/// Replace characters outside `[A-Za-z0-9_\-. /]` (and other alphanumerics)
/// with underscores.
fn sanitize_key(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ' ' | '/') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_key_keeps_safe_characters() {
        assert_eq!(sanitize_key("report-2024.06.pdf"), "report-2024.06.pdf");
        assert_eq!(sanitize_key("dir/file name.txt"), "dir/file name.txt");
    }

    #[test]
    fn sanitize_key_replaces_unsafe_characters() {
        assert_eq!(sanitize_key("a<b>c:d.txt"), "a_b_c_d.txt");
        assert_eq!(sanitize_key("sh$ell`x"), "sh_ell_x");
    }

    #[test]
    fn object_key_joins_trimmed_prefix() {
        assert_eq!(object_key("docs/", "a.txt"), "docs/a.txt");
        assert_eq!(object_key("/docs/2024/", "a.txt"), "docs/2024/a.txt");
        assert_eq!(object_key("", "a.txt"), "a.txt");
    }
}
