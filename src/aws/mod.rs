//! AWS service clients and shared plumbing.

pub mod context;
pub mod ec2;
pub mod error;
pub mod s3;
pub mod ssm;

pub use context::AwsContext;
pub use error::OpsError;
