//! Server configuration resolved from flags and environment.

/// Region used when neither `AWS_REGION` nor `AWS_DEFAULT_REGION` is set.
pub const FALLBACK_REGION: &str = "eu-west-3";

/// Default TCP port for the HTTP API.
pub const DEFAULT_PORT: u16 = 8000;

/// Resolve the default region the same way the AWS CLI does: `AWS_REGION`
/// first, then `AWS_DEFAULT_REGION`, then the built-in fallback.
pub fn default_region() -> String {
    std::env::var("AWS_REGION")
        .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
        .unwrap_or_else(|_| FALLBACK_REGION.to_string())
}
