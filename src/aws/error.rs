//! AWS error classification.
//!
//! Maps AWS SDK errors into a small typed taxonomy using the `.code()`
//! metadata instead of string matching, so callers branch on kind rather
//! than message content. Messages are preserved verbatim for the boundary.

use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use thiserror::Error;

/// Error taxonomy for remote operations.
#[derive(Debug, Error)]
pub enum OpsError {
    /// A referenced resource (network, subnet, image, bucket, ...) is missing.
    #[error("{resource} not found: {message}")]
    NotFound {
        resource: &'static str,
        message: String,
    },

    /// The resource already exists (duplicate ingress rule, duplicate group).
    /// Idempotent callers treat this as success.
    #[error("resource already exists: {message}")]
    Conflict { message: String },

    /// The backend is unreachable or credentials/region are misconfigured.
    #[error("AWS unavailable: {message}")]
    Unavailable { message: String },

    /// The caller supplied a missing or malformed field.
    #[error("invalid request: {message}")]
    InvalidInput { message: String },

    /// Any other backend failure, message passed through unmodified.
    #[error("AWS error: {message}")]
    Api {
        code: Option<String>,
        message: String,
    },
}

impl OpsError {
    /// Build a not-found error with a resource label.
    pub fn not_found(resource: &'static str, message: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Known AWS error codes for "not found" conditions.
const NOT_FOUND_CODES: &[&str] = &[
    "InvalidInstanceID.NotFound",
    "InvalidGroup.NotFound",
    "InvalidPermission.NotFound",
    "InvalidVpcID.NotFound",
    "InvalidSubnetID.NotFound",
    "InvalidAMIID.NotFound",
    "NoSuchBucket",
    "NoSuchKey",
    "ParameterNotFound",
];

/// Known AWS error codes for "already exists" conditions.
const CONFLICT_CODES: &[&str] = &[
    "InvalidPermission.Duplicate",
    "InvalidGroup.Duplicate",
    "BucketAlreadyOwnedByYou",
    "BucketAlreadyExists",
];

/// Known AWS error codes for credential and auth misconfiguration.
const UNAVAILABLE_CODES: &[&str] = &[
    "AuthFailure",
    "UnauthorizedOperation",
    "ExpiredToken",
    "RequestExpired",
    "InvalidClientTokenId",
    "SignatureDoesNotMatch",
];

/// Classify a raw AWS error code and message.
pub fn classify_code(code: Option<&str>, message: Option<&str>) -> OpsError {
    let message = message.unwrap_or("unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => OpsError::NotFound {
            resource: "resource",
            message,
        },
        Some(c) if CONFLICT_CODES.contains(&c) => OpsError::Conflict { message },
        Some(c) if UNAVAILABLE_CODES.contains(&c) => OpsError::Unavailable { message },
        _ => OpsError::Api {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Classify an AWS SDK operation error.
///
/// Transport-level failures (connection refused, timeouts) become
/// [`OpsError::Unavailable`]; service errors are classified by code.
pub fn classify_sdk<E>(err: SdkError<E>) -> OpsError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match &err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => OpsError::Unavailable {
            message: DisplayErrorContext(&err).to_string(),
        },
        _ => {
            let code = err.code().map(|s| s.to_string());
            let message = match err.message() {
                Some(m) => m.to_string(),
                None => DisplayErrorContext(&err).to_string(),
            };
            classify_code(code.as_deref(), Some(&message))
        }
    }
}

impl From<aws_sdk_s3::error::BuildError> for OpsError {
    fn from(value: aws_sdk_s3::error::BuildError) -> Self {
        Self::InvalidInput {
            message: value.to_string(),
        }
    }
}
